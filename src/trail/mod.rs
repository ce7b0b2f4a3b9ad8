//! Interaction trail: a decaying mask of recent pointer contact, kept in two
//! buffers that swap roles every frame.

pub mod buffer;
pub mod pointer;
pub mod projection;

use bevy::prelude::*;
use rayon::prelude::*;

pub use buffer::{ReadTexture, TrailBuffer, WriteTarget};
pub use pointer::{PointerInput, PointerState};
pub use projection::{uv_distance, EqualAreaSphere, Equirectangular, SurfaceProjection};

use crate::config::TrailConfig;
use crate::error::Result;

/// Intensity written inside a stamp.
const STAMP_VALUE: f32 = 1.0;
/// Fraction of `mouse_power` used as the stamp radius in texture space.
const STAMP_RADIUS_FACTOR: f32 = 0.1;

pub struct InteractionTrail {
    front: TrailBuffer,
    back: TrailBuffer,
    config: TrailConfig,
    frames: u64,
}

impl InteractionTrail {
    /// Allocates both targets. Failure here is fatal to the session.
    pub fn new(width: u32, height: u32, config: TrailConfig) -> Result<Self> {
        config.validate()?;
        let front = TrailBuffer::allocate(width, height, config.max_dimension, config.floor)?;
        let back = TrailBuffer::allocate(width, height, config.max_dimension, config.floor)?;
        info!("Allocated {}x{} interaction trail", width, height);
        Ok(Self { front, back, config, frames: 0 })
    }

    /// Reallocates both targets at a new size; the trail restarts empty.
    /// An allocation error is fatal to the session, as in [`InteractionTrail::new`].
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let front = TrailBuffer::allocate(width, height, self.config.max_dimension, self.config.floor)?;
        let back = TrailBuffer::allocate(width, height, self.config.max_dimension, self.config.floor)?;
        self.front = front;
        self.back = back;
        Ok(())
    }

    pub fn config(&self) -> &TrailConfig { &self.config }
    pub fn frames(&self) -> u64 { self.frames }

    pub fn stamp_radius(&self) -> f32 {
        STAMP_RADIUS_FACTOR * self.config.mouse_power
    }

    /// The texture produced by the last tick.
    pub fn read(&self) -> ReadTexture<'_> {
        ReadTexture::new(&self.front)
    }

    /// Runs one frame: decay the previous front into the back target, stamp
    /// the pointer contact when the pulse is active, then swap.
    pub fn tick(&mut self, pointer: &PointerState, pulse_progress: f32) -> ReadTexture<'_> {
        let radius = self.stamp_radius();
        {
            let source = ReadTexture::new(&self.front);
            let mut target = WriteTarget::new(&mut self.back);
            decay_pass(source, &mut target, self.config.fade_rate, self.config.floor);
            if pulse_progress > 0.0 {
                if let Some((_, uv)) = pointer.contact().filter(|(_, uv)| uv.is_finite()) {
                    stamp_pass(&mut target, uv, radius);
                }
            }
        }
        std::mem::swap(&mut self.front, &mut self.back);
        self.frames += 1;
        ReadTexture::new(&self.front)
    }
}

/// Moves every texel of `source` toward `floor` by `fade_rate` and writes the
/// result to `target`. Never raises a texel that is at or above the floor.
pub fn decay_pass(source: ReadTexture<'_>, target: &mut WriteTarget<'_>, fade_rate: f32, floor: f32) {
    let keep = 1.0 - fade_rate;
    target
        .texels_mut()
        .par_iter_mut()
        .zip(source.buffer().texels().par_iter())
        .for_each(|(dst, &src)| {
            let faded = (floor + (src - floor) * keep).clamp(0.0, 1.0);
            *dst = if src >= floor { faded.min(src) } else { faded };
        });
}

/// Writes a disc of full intensity centred at `center`, wrapping across the
/// `u` seam.
pub fn stamp_pass(target: &mut WriteTarget<'_>, center: Vec2, radius: f32) {
    let (w, h) = (target.width(), target.height());
    let row_lo = (((center.y - radius) * h as f32).floor().max(0.0)) as u32;
    let row_hi = (((center.y + radius) * h as f32).ceil().max(0.0) as u32).min(h);
    if row_lo >= row_hi {
        return;
    }
    let inv = Vec2::new(1.0 / w as f32, 1.0 / h as f32);
    target.texels_mut()[(row_lo * w) as usize..(row_hi * w) as usize]
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(r, row)| {
            let y = row_lo + r as u32;
            for (x, texel) in row.iter_mut().enumerate() {
                let uv = Vec2::new((x as f32 + 0.5) * inv.x, (y as f32 + 0.5) * inv.y);
                if uv_distance(uv, center) < radius {
                    *texel = STAMP_VALUE;
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeadowError;

    fn trail() -> InteractionTrail {
        InteractionTrail::new(64, 64, TrailConfig::default()).unwrap()
    }

    fn active_pointer() -> PointerState {
        PointerState::hit(Vec3::X, Vec2::new(0.5, 0.5))
    }

    #[test]
    fn stamp_needs_active_pulse() {
        let mut t = trail();
        let idle = t.tick(&active_pointer(), 0.0);
        assert!(idle.buffer().texels().iter().all(|&v| v == 0.0));

        let live = t.tick(&active_pointer(), 0.5);
        assert!((live.sample(Vec2::new(0.5, 0.5)) - 1.0).abs() < 1e-6);
        assert!(live.sample(Vec2::new(0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn absent_pointer_does_not_stamp() {
        let mut t = trail();
        let tex = t.tick(&PointerState::ABSENT, 1.0);
        assert!(tex.buffer().texels().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn trail_fades_without_input() {
        let mut t = trail();
        t.tick(&active_pointer(), 1.0);
        let mut previous: Vec<f32> = t.read().buffer().texels().to_vec();
        for _ in 0..200 {
            let now = t.tick(&PointerState::ABSENT, 0.0).buffer().texels().to_vec();
            assert!(now.iter().zip(&previous).all(|(n, p)| n <= p));
            previous = now;
        }
        assert!(previous.iter().all(|&v| v < 1e-3));
    }

    #[test]
    fn fade_converges_to_floor() {
        let config = TrailConfig { floor: 0.2, fade_rate: 0.1, ..Default::default() };
        let mut t = InteractionTrail::new(16, 16, config).unwrap();
        t.tick(&active_pointer(), 1.0);
        for _ in 0..300 {
            t.tick(&PointerState::ABSENT, 0.0);
        }
        assert!(t.read().buffer().texels().iter().all(|&v| (v - 0.2).abs() < 1e-3));
    }

    #[test]
    fn stamp_wraps_across_seam() {
        let mut t = trail();
        let tex = t.tick(&PointerState::hit(Vec3::X, Vec2::new(0.995, 0.5)), 1.0);
        assert!(tex.sample(Vec2::new(0.01, 0.5)) > 0.5);
    }

    #[test]
    fn resize_beyond_limit_is_an_allocation_error() {
        let mut t = trail();
        assert!(matches!(
            t.resize(100_000, 10),
            Err(MeadowError::ResourceAllocation { width: 100_000, height: 10, .. })
        ));
        t.resize(32, 16).unwrap();
        assert_eq!(t.read().buffer().height(), 16);
    }
}
