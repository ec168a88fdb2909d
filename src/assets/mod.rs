//! Asset loading: byte sources, glTF and image decoding, `srcset`
//! selection and asynchronous scheduling.

pub mod image;
pub mod io;
pub mod loader;
pub mod model;
pub mod srcset;

pub use image::DecodedImage;
pub use io::{AssetBase, AssetFetcher, AssetReader, MemoryFetcher, resolve_relative};
pub use loader::{AssetLoader, GeometryPayload, Liveness, LoadEvent};
pub use model::{ExternalRefs, ModelData, ModelNode, ModelPrimitive};
