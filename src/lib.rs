//! Attachment upload pipeline for gestion records: validate a batch of staged
//! files, then post them concurrently to the attachment endpoint and report
//! one outcome per file.

pub mod config;
pub mod error;
pub mod upload;
pub mod utils;

pub use config::UploaderConfig;
pub use error::{TransportError, UploadError, UploadResult};

/// Installs the `tracing` subscriber used by the binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
