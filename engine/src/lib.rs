pub mod api;
pub mod cache;
pub mod context;
pub mod sampling;

pub use api::*;
pub use cache::{CacheKey, NoiseCache, DEFAULT_CAPACITY};
pub use context::NoiseContext;
pub use sampling::SeededField;
