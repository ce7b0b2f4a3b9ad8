use bevy::prelude::*;
use serde::Serialize;
use std::str::FromStr;

use crate::config::{parse_hex_color, ShadingConfig};
use crate::error::{MeadowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    Normal,
    #[default]
    Multiply,
    Add,
    Subtract,
    Screen,
    Lighten,
    Darken,
}

impl BlendMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Add => "add",
            BlendMode::Subtract => "subtract",
            BlendMode::Screen => "screen",
            BlendMode::Lighten => "lighten",
            BlendMode::Darken => "darken",
        }
    }

    /// Composites `layer` over `base`, per channel.
    pub fn blend(self, base: Vec3, layer: Vec3) -> Vec3 {
        let out = match self {
            BlendMode::Normal => layer,
            BlendMode::Multiply => base * layer,
            BlendMode::Add => base + layer,
            BlendMode::Subtract => base - layer,
            BlendMode::Screen => Vec3::ONE - (Vec3::ONE - base) * (Vec3::ONE - layer),
            BlendMode::Lighten => base.max(layer),
            BlendMode::Darken => base.min(layer),
        };
        out.clamp(Vec3::ZERO, Vec3::ONE)
    }
}

impl FromStr for BlendMode {
    type Err = MeadowError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "normal" => BlendMode::Normal,
            "multiply" => BlendMode::Multiply,
            "add" => BlendMode::Add,
            "subtract" => BlendMode::Subtract,
            "screen" => BlendMode::Screen,
            "lighten" => BlendMode::Lighten,
            "darken" => BlendMode::Darken,
            other => return Err(MeadowError::Configuration(format!("unknown blend mode {other:?}"))),
        })
    }
}

/// Colour gradient over distance from `origin`.
#[derive(Debug, Clone, Copy)]
pub struct DepthLayer {
    pub color_a: Vec3,
    pub color_b: Vec3,
    pub near: f32,
    pub far: f32,
    pub origin: Vec3,
}

impl DepthLayer {
    pub fn color_at(&self, world: Vec3) -> Vec3 {
        let t = ((world - self.origin).length() - self.near) / (self.far - self.near);
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        self.color_a.lerp(self.color_b, t)
    }
}

/// Depth gradient with the contact tint composited on top where the wind is gated.
#[derive(Debug, Clone, Copy)]
pub struct LayerStack {
    pub depth: DepthLayer,
    pub tint: Vec3,
    pub mode: BlendMode,
}

impl LayerStack {
    /// Colours are given as sRGB hex and stored linear.
    pub fn from_config(config: &ShadingConfig, mode: BlendMode) -> Result<Self> {
        config.validate()?;
        let linear = |hex: &str| -> Result<Vec3> {
            let [r, g, b] = parse_hex_color(hex)?;
            let [r, g, b, _] = Color::rgb(r, g, b).as_linear_rgba_f32();
            Ok(Vec3::new(r, g, b))
        };
        Ok(Self {
            depth: DepthLayer {
                color_a: linear(&config.color_a)?,
                color_b: linear(&config.color_b)?,
                near: config.near,
                far: config.far,
                origin: Vec3::ZERO,
            },
            tint: linear(&config.contact_tint)?,
            mode,
        })
    }

    /// Vertex colour at `world`; `gate` is the trail gate of the owning instance.
    pub fn shade(&self, world: Vec3, gate: f32) -> [f32; 4] {
        let base = self.depth.color_at(world);
        let gate = if gate.is_finite() { gate.clamp(0.0, 1.0) } else { 0.0 };
        let c = base.lerp(self.mode.blend(base, self.tint), gate);
        [c.x, c.y, c.z, 1.0]
    }
}
