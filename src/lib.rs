pub mod config;
pub mod safety;

use std::path::Path;

use tracing_subscriber::EnvFilter;

use safety::{ReferenceData, ReferenceError};

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Reference tables from `dir`, else from the configured data directory,
/// else the bundled copy.
pub fn load_reference(dir: Option<&Path>) -> Result<ReferenceData, ReferenceError> {
    match dir.map(Path::to_path_buf).or_else(config::reference_data_dir) {
        Some(dir) => ReferenceData::load(&dir),
        None => {
            tracing::debug!("Using bundled reference data");
            ReferenceData::bundled()
        }
    }
}
