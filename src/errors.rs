//! Error Types
//!
//! This module defines the error types used throughout the viewer.
//!
//! # Overview
//!
//! The main error type [`VitrineError`] covers every failure mode:
//! - GPU and rendering-context initialization failures (fatal, surfaced to the caller)
//! - Asset fetching and decoding errors (contained at the device boundary)
//! - Pipeline calls made before setup completed (treated as silent no-ops)
//!
//! # Propagation
//!
//! Only [`Viewer::mount`](crate::viewer::Viewer::mount) and backend creation
//! return errors that the embedding application is expected to handle. Asset
//! failures are logged and folded into the device state machine; they never
//! abort the viewer.
//!
//! ```rust,ignore
//! use vitrine::errors::{Result, VitrineError};
//!
//! fn fetch() -> Result<Vec<u8>> {
//!     Err(VitrineError::MissingSource)
//! }
//! ```

use thiserror::Error;

/// The main error type for the viewer.
#[derive(Error, Debug)]
pub enum VitrineError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create or configure the presentation surface.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(String),

    /// Window system error.
    #[error("Window system error: {0}")]
    WindowError(#[from] raw_window_handle::HandleError),

    /// Event loop error (winit).
    #[cfg(feature = "winit")]
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] winit::error::EventLoopError),

    /// The background runtime that runs asset loads could not start.
    #[error("Failed to start the asset runtime: {0}")]
    RuntimeStartFailed(String),

    /// A render or shadow operation ran before setup completed.
    ///
    /// Callers treat this as a no-op; it is never surfaced to the user.
    #[error("Render pipeline used before initialization")]
    UninitializedPipeline,

    // ========================================================================
    // Asset Errors
    // ========================================================================
    /// The asset descriptor carries no source URL.
    #[error("Asset descriptor has no source URL")]
    MissingSource,

    /// An embedded data URI is not valid base64.
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// Fetching or decoding an asset failed.
    #[error("Failed to fetch asset '{uri}': {reason}")]
    AssetFetch {
        /// The URI that was requested
        uri: String,
        /// Human-readable failure description
        reason: String,
    },

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status}")]
    HttpResponse {
        /// HTTP status code
        status: u16,
    },

    /// URL parsing error.
    #[cfg(feature = "http")]
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// glTF parsing or loading error.
    #[error("glTF error: {0}")]
    Gltf(String),

    /// Embedded texture uses a pixel format the viewer cannot upload.
    #[error("Unsupported texture format: {0}")]
    UnsupportedTexture(String),

    // ========================================================================
    // I/O & Configuration Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Async & Threading Errors
    // ========================================================================
    /// A background load task failed to complete.
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl VitrineError {
    /// Builds an [`AssetFetch`](Self::AssetFetch) error for `uri`.
    pub fn fetch(uri: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::AssetFetch {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors that must abort viewer setup.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AdapterRequestFailed(_)
                | Self::DeviceCreateFailed(_)
                | Self::SurfaceCreateFailed(_)
                | Self::WindowError(_)
                | Self::RuntimeStartFailed(_)
        ) || self.is_event_loop_error()
    }

    #[cfg(feature = "winit")]
    fn is_event_loop_error(&self) -> bool {
        matches!(self, Self::EventLoopError(_))
    }

    #[cfg(not(feature = "winit"))]
    fn is_event_loop_error(&self) -> bool {
        false
    }
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for VitrineError {
    fn from(err: image::ImageError) -> Self {
        VitrineError::ImageDecode(err.to_string())
    }
}

impl From<gltf::Error> for VitrineError {
    fn from(err: gltf::Error) -> Self {
        VitrineError::Gltf(err.to_string())
    }
}

impl From<tokio::task::JoinError> for VitrineError {
    fn from(err: tokio::task::JoinError) -> Self {
        VitrineError::TaskJoin(err.to_string())
    }
}

/// Alias for `Result<T, VitrineError>`.
pub type Result<T> = std::result::Result<T, VitrineError>;
