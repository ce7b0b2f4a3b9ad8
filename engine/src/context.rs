use crate::api::*;
use crate::cache::NoiseCache;
use crate::sampling::SeededField;
use std::sync::Arc;

/// Seed plus the noise state derived from it.
///
/// Built once per session and handed to every component that samples noise,
/// so independent sessions (and tests) never share cache contents.
pub struct NoiseContext {
    seed: Seed,
    field: Arc<SeededField>,
    cache: NoiseCache,
}

impl NoiseContext {
    pub fn new(seed: Seed, cache_capacity: usize) -> Result<Self, NoiseError> {
        let field = Arc::new(SeededField::new(seed));
        let cache = NoiseCache::new(field.clone(), NoiseKind::Simplex, cache_capacity)?;
        Ok(Self { seed, field, cache })
    }

    pub fn seed(&self) -> Seed { self.seed }

    /// Uncached access for time-varying lookups.
    pub fn field(&self) -> &dyn NoiseField { self.field.as_ref() }

    pub fn cache(&self) -> &NoiseCache { &self.cache }

    /// Cached simplex value at `position * scale`.
    pub fn cached(&self, position: [f32; 3], scale: f32) -> f32 {
        self.cache.evaluate(position, scale)
    }
}
