//! Opens a window and shows the models listed in a JSON config.
//!
//! ```text
//! cargo run -p showcase -- demo_apps/showcase/models.json
//! ```
//!
//! Asset URLs are resolved relative to the config file's directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use vitrine::App;
use vitrine::assets::AssetReader;
use vitrine::config::ViewerConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("demo_apps/showcase/models.json"), PathBuf::from);
    let config = ViewerConfig::load(&path).with_context(|| format!("reading {}", path.display()))?;
    let base = path.parent().map(PathBuf::from).unwrap_or_default();

    log::info!("Showing {} model(s) from {}", config.models.len(), path.display());

    App::new(config)
        .with_fetcher(Arc::new(AssetReader::from_directory(base)))
        .run()?;
    Ok(())
}
