use crate::api::*;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lattice spacing used to quantize `position * scale` into a cache key.
pub const QUANTUM: f64 = 1e-4;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Quantized sample position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(pub i64, pub i64, pub i64);

impl CacheKey {
    /// `None` when any scaled component is not finite.
    pub fn quantize(position: [f32; 3], scale: f32) -> Option<Self> {
        let mut q = [0i64; 3];
        for (slot, c) in q.iter_mut().zip(position) {
            let v = c as f64 * scale as f64;
            if !v.is_finite() { return None; }
            *slot = (v / QUANTUM).round() as i64;
        }
        Some(CacheKey(q[0], q[1], q[2]))
    }

    /// The lattice point the key stands for.
    pub fn point(&self) -> [f32; 3] {
        [
            (self.0 as f64 * QUANTUM) as f32,
            (self.1 as f64 * QUANTUM) as f32,
            (self.2 as f64 * QUANTUM) as f32,
        ]
    }
}

#[derive(Default)]
struct LruState {
    values: HashMap<CacheKey, (f32, u64)>,
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
}

impl LruState {
    fn touch(&mut self, key: CacheKey) -> Option<f32> {
        self.tick += 1;
        let tick = self.tick;
        let (value, stamp) = self.values.get_mut(&key)?;
        self.recency.remove(stamp);
        *stamp = tick;
        self.recency.insert(tick, key);
        Some(*value)
    }

    fn insert(&mut self, key: CacheKey, value: f32, capacity: usize) {
        if self.touch(key).is_some() { return; }
        while self.values.len() >= capacity {
            match self.recency.pop_first() {
                Some((_, oldest)) => { self.values.remove(&oldest); }
                None => break,
            }
        }
        self.tick += 1;
        self.values.insert(key, (value, self.tick));
        self.recency.insert(self.tick, key);
    }
}

/// Memoizes one noise channel keyed by quantized `position * scale`.
///
/// The underlying function is evaluated at the lattice point of the key, so a
/// value depends on its key only and never on insertion or eviction order.
/// Safe to share between worker threads.
pub struct NoiseCache {
    field: Arc<dyn NoiseField>,
    kind: NoiseKind,
    capacity: usize,
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl NoiseCache {
    pub fn new(field: Arc<dyn NoiseField>, kind: NoiseKind, capacity: usize) -> Result<Self, NoiseError> {
        if capacity == 0 { return Err(NoiseError::CacheCapacity(capacity)); }
        Ok(Self { field, kind, capacity, state: Mutex::new(LruState::default()), hits: AtomicU64::new(0), misses: AtomicU64::new(0) })
    }

    pub fn evaluate(&self, position: [f32; 3], scale: f32) -> f32 {
        let Some(key) = CacheKey::quantize(position, scale) else {
            return f32::NAN;
        };
        if let Some(v) = self.state.lock().touch(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return v;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        // evaluated outside the lock; a racing miss on the same key computes the same value
        let value = self.field.sample(self.kind, key.point());
        self.state.lock().insert(key, value, self.capacity);
        value
    }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn len(&self) -> usize { self.state.lock().values.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
    pub fn hits(&self) -> u64 { self.hits.load(Ordering::Relaxed) }
    pub fn misses(&self) -> u64 { self.misses.load(Ordering::Relaxed) }

    pub fn contains(&self, position: [f32; 3], scale: f32) -> bool {
        CacheKey::quantize(position, scale)
            .map(|k| self.state.lock().values.contains_key(&k))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SeededField;

    fn cache(capacity: usize) -> NoiseCache {
        NoiseCache::new(Arc::new(SeededField::new(Seed(1))), NoiseKind::Simplex, capacity).unwrap()
    }

    #[test]
    fn repeated_lookup_returns_same_value() {
        let c = cache(16);
        let a = c.evaluate([0.12, 0.5, -0.3], 5.0);
        let b = c.evaluate([0.12, 0.5, -0.3], 5.0);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(c.hits(), 1);
        assert_eq!(c.misses(), 1);
    }

    #[test]
    fn cached_value_matches_direct_call() {
        let field = SeededField::new(Seed(1));
        let c = cache(16);
        let p = [0.3, -0.7, 0.1];
        let direct = field.simplex3([p[0] * 5.0, p[1] * 5.0, p[2] * 5.0]);
        assert!((c.evaluate(p, 5.0) - direct).abs() < 1e-2);
    }

    #[test]
    fn occupancy_never_exceeds_capacity() {
        let c = cache(8);
        for i in 0..50 {
            c.evaluate([i as f32, 0.0, 0.0], 1.0);
            assert!(c.len() <= 8);
        }
        assert_eq!(c.len(), 8);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let c = cache(3);
        let a = [1.0, 0.0, 0.0];
        let b = [2.0, 0.0, 0.0];
        let d = [3.0, 0.0, 0.0];
        c.evaluate(a, 1.0);
        c.evaluate(b, 1.0);
        c.evaluate(d, 1.0);
        // refresh a, leaving b as the oldest
        c.evaluate(a, 1.0);
        c.evaluate([4.0, 0.0, 0.0], 1.0);
        assert!(c.contains(a, 1.0));
        assert!(!c.contains(b, 1.0));
        assert!(c.contains(d, 1.0));
    }

    #[test]
    fn nan_is_not_cached() {
        let c = cache(4);
        assert!(c.evaluate([f32::NAN, 0.0, 0.0], 1.0).is_nan());
        assert!(c.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let field: Arc<dyn NoiseField> = Arc::new(SeededField::new(Seed(1)));
        assert!(matches!(NoiseCache::new(field, NoiseKind::Perlin, 0), Err(NoiseError::CacheCapacity(0))));
    }
}
