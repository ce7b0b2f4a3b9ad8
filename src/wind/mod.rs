//! Wind layer: per-vertex sway, the interaction pulse that gates it, and the
//! colour layers it is blended against.

pub mod deformer;
pub mod pulse;
pub mod shading;

use serde::Serialize;
use std::str::FromStr;

pub use deformer::{displace, FieldFrame, WindDeformer};
pub use pulse::{InteractionPulse, PulsePhase};
pub use shading::{BlendMode, DepthLayer, LayerStack};

use crate::error::{MeadowError, Result};

/// Which noise channels drive the sway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseMode {
    /// Perlin on one axis, simplex on the other.
    #[default]
    Classic,
    /// The horizontal components of curl noise.
    Curl,
}

impl NoiseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NoiseMode::Classic => "classic",
            NoiseMode::Curl => "curl",
        }
    }
}

impl FromStr for NoiseMode {
    type Err = MeadowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" | "perlin" => Ok(NoiseMode::Classic),
            "curl" => Ok(NoiseMode::Curl),
            other => Err(MeadowError::UnsupportedNoiseMode(other.to_string())),
        }
    }
}

/// How trail intensity acts on the sway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailGate {
    /// Contact pulls blades back toward rest.
    #[default]
    Suppress,
    /// Blades only sway where there was contact.
    Excite,
}

impl TrailGate {
    pub fn as_str(self) -> &'static str {
        match self {
            TrailGate::Suppress => "suppress",
            TrailGate::Excite => "excite",
        }
    }
}

impl FromStr for TrailGate {
    type Err = MeadowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suppress" => Ok(TrailGate::Suppress),
            "excite" => Ok(TrailGate::Excite),
            other => Err(MeadowError::Configuration(format!("unknown trail gate {other:?}"))),
        }
    }
}

/// Read from RON through [`crate::config`], which resolves the mode names with `FromStr`.
#[derive(Debug, Clone, Serialize)]
pub struct WindConfig {
    pub noise_scale: f32,
    /// Sway amplitude at the blade tip.
    pub noise_strength: f32,
    pub length: f32,
    pub sway: f32,
    /// Blend of the contact tint against the depth layer.
    pub mode: BlendMode,
    pub noise: NoiseMode,
    pub gate: TrailGate,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            noise_scale: 0.1,
            noise_strength: 2.0,
            length: 1.0,
            sway: 0.6,
            mode: BlendMode::Multiply,
            noise: NoiseMode::Classic,
            gate: TrailGate::Suppress,
        }
    }
}

impl WindConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [self.noise_scale, self.noise_strength, self.length, self.sway];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(MeadowError::Configuration(format!("non-finite wind parameter in {finite:?}")));
        }
        if self.length < 0.0 {
            return Err(MeadowError::Configuration(format!("length {}", self.length)));
        }
        Ok(())
    }
}

/// Hermite step; 0 below `edge0`, 1 above `edge1`. NaN stays NaN.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
