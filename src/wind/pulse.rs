use bevy::prelude::*;

use crate::config::PulseConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulsePhase {
    Idle,
    Rising { elapsed: f32 },
    Falling { elapsed: f32 },
}

/// Drives a scalar 0 -> 1 -> 0 after each accepted trigger: ease-out on the
/// way up, ease-in on the way down. Only one pulse runs at a time.
#[derive(Debug, Clone)]
pub struct InteractionPulse {
    config: PulseConfig,
    phase: PulsePhase,
    progress: f32,
    since_trigger: f32,
}

impl InteractionPulse {
    pub fn new(config: PulseConfig) -> Self {
        Self { config, phase: PulsePhase::Idle, progress: 0.0, since_trigger: f32::INFINITY }
    }

    /// Starts a pulse if none is running and the rate limit has elapsed.
    /// Returns whether the trigger was accepted; dropped triggers are not queued.
    pub fn trigger(&mut self) -> bool {
        if self.phase != PulsePhase::Idle || self.since_trigger < self.config.interval {
            debug!("Dropped pulse trigger in {:?}", self.phase);
            return false;
        }
        self.phase = PulsePhase::Rising { elapsed: 0.0 };
        self.since_trigger = 0.0;
        true
    }

    /// Advances the running pulse by `dt` seconds and returns the new progress.
    pub fn tick(&mut self, dt: f32) -> f32 {
        if !dt.is_finite() || dt <= 0.0 {
            return self.progress;
        }
        self.since_trigger += dt;

        self.phase = match self.phase {
            PulsePhase::Idle => PulsePhase::Idle,
            PulsePhase::Rising { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed < self.config.rise {
                    PulsePhase::Rising { elapsed }
                } else {
                    // carry the overshoot into the fall
                    let over = elapsed - self.config.rise;
                    if over < self.config.fall { PulsePhase::Falling { elapsed: over } } else { PulsePhase::Idle }
                }
            }
            PulsePhase::Falling { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed < self.config.fall { PulsePhase::Falling { elapsed } } else { PulsePhase::Idle }
            }
        };

        self.progress = match self.phase {
            PulsePhase::Idle => 0.0,
            PulsePhase::Rising { elapsed } => ease_out(elapsed / self.config.rise),
            PulsePhase::Falling { elapsed } => 1.0 - ease_in(elapsed / self.config.fall),
        };
        self.progress
    }

    pub fn progress(&self) -> f32 { self.progress }
    pub fn phase(&self) -> PulsePhase { self.phase }
    pub fn is_idle(&self) -> bool { self.phase == PulsePhase::Idle }
}

/// Quadratic ease-out.
#[inline]
fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in.
#[inline]
fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse() -> InteractionPulse {
        InteractionPulse::new(PulseConfig::default())
    }

    #[test]
    fn idle_stays_at_zero() {
        let mut p = pulse();
        for _ in 0..10 {
            assert_eq!(p.tick(0.3), 0.0);
        }
        assert!(p.is_idle());
    }

    #[test]
    fn rises_then_falls() {
        let mut p = pulse();
        assert!(p.trigger());
        assert!((p.tick(0.5) - 0.75).abs() < 1e-6);
        assert!((p.tick(0.5) - 1.0).abs() < 1e-6);
        assert!(matches!(p.phase(), PulsePhase::Falling { .. }));
        assert!((p.tick(0.5) - 0.75).abs() < 1e-6);
        assert_eq!(p.tick(0.5), 0.0);
        assert!(p.is_idle());
    }

    #[test]
    fn trigger_while_running_is_dropped() {
        let mut p = pulse();
        assert!(p.trigger());
        p.tick(0.4);
        let before = p.phase();
        assert!(!p.trigger());
        assert_eq!(p.phase(), before);
    }

    #[test]
    fn rate_limit_applies_after_idle() {
        let config = PulseConfig { rise: 0.1, fall: 0.1, interval: 1.0 };
        let mut p = InteractionPulse::new(config);
        assert!(p.trigger());
        p.tick(0.3);
        assert!(p.is_idle());
        assert!(!p.trigger());
        p.tick(0.8);
        assert!(p.trigger());
    }

    #[test]
    fn large_step_lands_in_idle() {
        let mut p = pulse();
        p.trigger();
        assert_eq!(p.tick(10.0), 0.0);
        assert!(p.is_idle());
    }

    #[test]
    fn progress_stays_in_unit_range() {
        let mut p = pulse();
        p.trigger();
        for _ in 0..200 {
            let v = p.tick(0.013);
            assert!((0.0..=1.0).contains(&v));
        }
        assert_eq!(p.tick(f32::NAN), p.progress());
    }
}
