//! Asset byte sources
//!
//! [`AssetFetcher`] is the seam between load scheduling and where bytes
//! come from. [`AssetReader`] resolves URIs against a local directory or a
//! base URL; [`MemoryFetcher`] serves bundled bytes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::runtime::Runtime;

use crate::errors::{Result, VitrineError};

/// Shared runtime for every asset load.
///
/// Built on first use. A failed build is remembered and reported to every
/// later caller.
pub(crate) fn asset_runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .thread_name("vitrine-assets")
                .enable_all()
                .build()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|reason| VitrineError::RuntimeStartFailed(reason.clone()))
}

/// Asynchronous byte source.
pub trait AssetFetcher: Send + Sync + 'static {
    fn fetch(&self, uri: &str) -> BoxFuture<'static, Result<Vec<u8>>>;
}

#[inline]
fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Resolves `uri` as written inside the document at `base_uri`.
///
/// Remote and absolute URIs are returned unchanged; relative ones replace
/// the last path segment of `base_uri`.
#[must_use]
pub fn resolve_relative(base_uri: &str, uri: &str) -> String {
    if is_remote(uri) || uri.starts_with('/') {
        return uri.to_owned();
    }
    match base_uri.rfind('/') {
        Some(slash) => format!("{}{uri}", &base_uri[..=slash]),
        None => uri.to_owned(),
    }
}

// ============================================================================
// File / HTTP reader
// ============================================================================

/// Where relative URIs are resolved.
#[derive(Debug, Clone)]
pub enum AssetBase {
    Directory(PathBuf),
    #[cfg(feature = "http")]
    Url(url::Url),
}

/// Reads local files and (with `http`) remote URLs.
#[derive(Debug, Clone)]
pub struct AssetReader {
    base: AssetBase,
}

impl Default for AssetReader {
    fn default() -> Self {
        Self::from_directory(".")
    }
}

impl AssetReader {
    /// Resolves relative URIs against `path` (or its parent if it is a file).
    pub fn from_directory(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self {
            base: AssetBase::Directory(root),
        }
    }

    /// Picks a directory or URL base from a source string.
    pub fn from_source(source: &str) -> Result<Self> {
        if is_remote(source) {
            #[cfg(feature = "http")]
            {
                let mut url = url::Url::parse(source)?;
                if !url.path().ends_with('/')
                    && let Ok(mut segments) = url.path_segments_mut()
                {
                    segments.pop();
                    segments.push("");
                }
                Ok(Self {
                    base: AssetBase::Url(url),
                })
            }
            #[cfg(not(feature = "http"))]
            {
                Err(VitrineError::fetch(source, "the `http` feature is disabled"))
            }
        } else {
            Ok(Self::from_directory(source))
        }
    }

    #[inline]
    #[must_use]
    pub fn base(&self) -> &AssetBase {
        &self.base
    }
}

impl AssetFetcher for AssetReader {
    fn fetch(&self, uri: &str) -> BoxFuture<'static, Result<Vec<u8>>> {
        let uri = uri.to_owned();
        let base = self.base.clone();
        Box::pin(async move {
            if is_remote(&uri) {
                return read_http(&uri).await;
            }
            match base {
                AssetBase::Directory(root) => {
                    let path = root.join(&uri);
                    tokio::fs::read(&path)
                        .await
                        .map_err(|e| VitrineError::fetch(path.display().to_string(), e))
                }
                #[cfg(feature = "http")]
                AssetBase::Url(root) => {
                    let url = root.join(&uri)?;
                    read_http(url.as_str()).await
                }
            }
        })
    }
}

#[cfg(feature = "http")]
async fn read_http(uri: &str) -> Result<Vec<u8>> {
    let response = ehttp::fetch_async(ehttp::Request::get(uri))
        .await
        .map_err(|e| VitrineError::fetch(uri, e))?;
    if !response.ok {
        return Err(VitrineError::HttpResponse {
            status: response.status,
        });
    }
    Ok(response.bytes)
}

#[cfg(not(feature = "http"))]
async fn read_http(uri: &str) -> Result<Vec<u8>> {
    Err(VitrineError::fetch(uri, "the `http` feature is disabled"))
}

// ============================================================================
// In-memory source
// ============================================================================

/// Serves bytes registered up front; unknown URIs fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    entries: Arc<RwLock<FxHashMap<String, Arc<[u8]>>>>,
}

impl MemoryFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.entries.write().insert(uri.into(), bytes.into());
    }

    #[must_use]
    pub fn with(self, uri: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn remove(&self, uri: &str) -> bool {
        self.entries.write().remove(uri).is_some()
    }

    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.entries.read().contains_key(uri)
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, uri: &str) -> BoxFuture<'static, Result<Vec<u8>>> {
        let result = self
            .entries
            .read()
            .get(uri)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| VitrineError::fetch(uri, "not found"));
        Box::pin(async move { result })
    }
}
