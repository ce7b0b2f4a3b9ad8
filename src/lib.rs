pub mod config;
pub mod controller;
pub mod error;
pub mod field;
pub mod rendering;
pub mod session;
pub mod trail;
pub mod wind;

pub use config::MeadowConfig;
pub use error::{MeadowError, Result};
pub use session::{FrameStats, MeadowSession};
