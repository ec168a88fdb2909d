//! Asynchronous load scheduling
//!
//! Loads run on the shared asset runtime and never touch the scene. Their
//! results travel back over a channel as [`LoadEvent`]s, which the render
//! thread drains and applies. Each loader carries a [`Liveness`] token:
//! once the owning viewer is torn down, finished loads are dropped instead
//! of delivered.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::runtime::Handle;

use super::image::DecodedImage;
use super::io::{AssetFetcher, asset_runtime, resolve_relative};
use super::model::{ExternalRefs, ModelData};
use crate::device::DeviceId;
use crate::errors::Result;

/// Geometry and placeholder, fetched together.
#[derive(Debug, Clone)]
pub struct GeometryPayload {
    pub model: Arc<ModelData>,
    pub placeholder: Option<Arc<DecodedImage>>,
}

/// A finished load, addressed to its device.
#[derive(Debug)]
pub enum LoadEvent {
    Geometry {
        device: DeviceId,
        result: Result<GeometryPayload>,
    },
    FullRes {
        device: DeviceId,
        result: Result<Arc<DecodedImage>>,
    },
}

impl LoadEvent {
    #[must_use]
    pub fn device(&self) -> DeviceId {
        match self {
            Self::Geometry { device, .. } | Self::FullRes { device, .. } => *device,
        }
    }
}

/// Cleared when the owner is torn down.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl Liveness {
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Schedules fetch + decode work and collects the results.
pub struct AssetLoader {
    runtime: Handle,
    fetcher: Arc<dyn AssetFetcher>,
    tx: flume::Sender<LoadEvent>,
    rx: flume::Receiver<LoadEvent>,
    liveness: Liveness,
    in_flight: Arc<AtomicUsize>,
}

impl AssetLoader {
    /// Fails only if the shared asset runtime cannot be started.
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Result<Self> {
        let runtime = asset_runtime()?.handle().clone();
        let (tx, rx) = flume::unbounded();
        Ok(Self {
            runtime,
            fetcher,
            tx,
            rx,
            liveness: Liveness::default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    #[inline]
    #[must_use]
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Loads still running.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetches the model and (optionally) the placeholder concurrently.
    pub fn request_geometry(&self, device: DeviceId, model_uri: String, placeholder_uri: Option<String>) {
        let fetcher = self.fetcher.clone();
        self.spawn(async move {
            let model = async {
                let bytes = fetcher.fetch(&model_uri).await?;
                let resources = fetch_external(fetcher.as_ref(), &model_uri, &bytes).await?;
                decode_blocking(move || ModelData::from_gltf_with_resources(&model_uri, &bytes, &resources)).await
            };
            let placeholder = async {
                match placeholder_uri {
                    Some(uri) => {
                        let bytes = fetcher.fetch(&uri).await?;
                        decode_blocking(move || DecodedImage::decode(uri, &bytes)).await.map(Some)
                    }
                    None => Ok(None),
                }
            };
            let result = futures::try_join!(model, placeholder).map(|(model, placeholder)| GeometryPayload {
                model: Arc::new(model),
                placeholder: placeholder.map(Arc::new),
            });
            LoadEvent::Geometry { device, result }
        });
    }

    /// Fetches and decodes the full-resolution screen image.
    pub fn request_full_res(&self, device: DeviceId, uri: String) {
        let fetcher = self.fetcher.clone();
        self.spawn(async move {
            let result = async {
                let bytes = fetcher.fetch(&uri).await?;
                decode_blocking(move || DecodedImage::decode(uri, &bytes)).await
            }
            .await
            .map(Arc::new);
            LoadEvent::FullRes { device, result }
        });
    }

    fn spawn(&self, task: impl Future<Output = LoadEvent> + Send + 'static) {
        let tx = self.tx.clone();
        let liveness = self.liveness.clone();
        let in_flight = self.in_flight.clone();
        in_flight.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(async move {
            let event = task.await;
            if liveness.is_alive() {
                let _ = tx.send(event);
            } else {
                log::debug!("Discarding load for {:?}: viewer torn down", event.device());
            }
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }

    /// Next finished load, if any.
    #[must_use]
    pub fn try_recv(&self) -> Option<LoadEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next finished load.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Stops delivery; in-flight loads finish and are discarded.
    pub fn shutdown(&self) {
        self.liveness.revoke();
        while self.rx.try_recv().is_ok() {}
    }
}

/// Fetches the buffers and images a multi-file `.gltf` refers to, keyed by
/// the URI as written in the document. Missing buffers fail the load;
/// missing images are left out.
async fn fetch_external(
    fetcher: &dyn AssetFetcher,
    model_uri: &str,
    bytes: &[u8],
) -> Result<FxHashMap<String, Vec<u8>>> {
    let refs = ExternalRefs::scan(bytes)?;
    let mut resources = FxHashMap::default();
    if refs.is_empty() {
        return Ok(resources);
    }

    let buffers = futures::future::try_join_all(refs.buffers.iter().map(|uri| {
        let resolved = resolve_relative(model_uri, uri);
        async move { fetcher.fetch(&resolved).await.map(|data| (uri.clone(), data)) }
    }))
    .await?;
    resources.extend(buffers);

    let images = futures::future::join_all(refs.images.iter().map(|uri| {
        let resolved = resolve_relative(model_uri, uri);
        async move { (uri.clone(), fetcher.fetch(&resolved).await) }
    }))
    .await;
    for (uri, result) in images {
        match result {
            Ok(data) => {
                resources.insert(uri, data);
            }
            Err(err) => log::warn!("'{model_uri}': image '{uri}' unavailable: {err}"),
        }
    }
    Ok(resources)
}

async fn decode_blocking<T: Send + 'static>(job: impl FnOnce() -> Result<T> + Send + 'static) -> Result<T> {
    tokio::task::spawn_blocking(job).await?
}
