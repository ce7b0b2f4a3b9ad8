use meadow_noise::NoiseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeadowError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("surface has zero area but {requested} instances were requested")]
    DegenerateSurface { requested: usize },
    #[error("unsupported mode: {0}")]
    UnsupportedNoiseMode(String),
    #[error("cannot allocate {width}x{height} trail target: {reason}")]
    ResourceAllocation { width: u32, height: u32, reason: String },
    #[error("failed to load config {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Noise(#[from] NoiseError),
}

pub type Result<T> = std::result::Result<T, MeadowError>;
