use bevy::prelude::*;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_4;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MeadowError, Result};
use crate::wind::WindConfig;

pub const DEFAULT_CONFIG_PATH: &str = "meadow.ron";
pub const CONFIG_ENV: &str = "MEADOW_CONFIG";
pub const MAX_INSTANCES: usize = 1_000_000;

/// Session configuration, read from a RON file.
#[derive(Resource, Debug, Clone, Default, Serialize)]
pub struct MeadowConfig {
    pub field: FieldConfig,
    pub placement: PlacementConfig,
    pub wind: WindConfig,
    pub shading: ShadingConfig,
    pub trail: TrailConfig,
    pub pulse: PulseConfig,
    pub noise: NoiseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub count: usize,
    pub seed: u64,
    pub surface_radius: f32,
    pub sphere_sectors: u32,
    pub sphere_stacks: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self { count: 16_000, seed: 1, surface_radius: 1.0, sphere_sectors: 64, sphere_stacks: 32 }
    }
}

/// Per-instance transform generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub noise_scale: f32,
    pub base_scale: f32,
    pub scale_band: (f32, f32),
    pub normal_offset: f32,
    /// Half-width of the random rotation added on each axis, in radians.
    pub jitter: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { noise_scale: 5.0, base_scale: 0.1, scale_band: (0.3, 1.0), normal_offset: 0.01, jitter: FRAC_PI_4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub color_a: String,
    pub color_b: String,
    pub near: f32,
    pub far: f32,
    /// Tint blended in where the trail gates the wind.
    pub contact_tint: String,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            color_a: "#221600".into(),
            color_b: "#ade266".into(),
            near: 0.14,
            far: 1.52,
            contact_tint: "#c8d890".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Stamp radius is `0.1 * mouse_power` in texture space.
    pub mouse_power: f32,
    pub fade_rate: f32,
    pub floor: f32,
    /// `None` follows the viewport size.
    pub resolution: Option<(u32, u32)>,
    pub max_dimension: u32,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self { mouse_power: 0.5, fade_rate: 0.05, floor: 0.0, resolution: Some((512, 512)), max_dimension: 8192 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub rise: f32,
    pub fall: f32,
    pub interval: f32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self { rise: 1.0, fall: 1.0, interval: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub seed: u64,
    pub cache_capacity: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { seed: 1, cache_capacity: meadow_noise::DEFAULT_CAPACITY }
    }
}

/// File layout of [`MeadowConfig`]. Mode names stay raw until
/// [`RawConfig::resolve`] so unknown ones surface as typed errors.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    field: FieldConfig,
    placement: PlacementConfig,
    wind: WindSection,
    shading: ShadingConfig,
    trail: TrailConfig,
    pulse: PulseConfig,
    noise: NoiseConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WindSection {
    noise_scale: f32,
    noise_strength: f32,
    length: f32,
    sway: f32,
    mode: Name,
    noise: Name,
    gate: Name,
}

impl Default for WindSection {
    fn default() -> Self {
        let w = WindConfig::default();
        Self {
            noise_scale: w.noise_scale,
            noise_strength: w.noise_strength,
            length: w.length,
            sway: w.sway,
            mode: Name(w.mode.as_str().into()),
            noise: Name(w.noise.as_str().into()),
            gate: Name(w.gate.as_str().into()),
        }
    }
}

/// A bare RON identifier such as `curl`.
#[derive(Debug, Clone)]
struct Name(String);

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NameVisitor;

        impl<'de> Visitor<'de> for NameVisitor {
            type Value = Name;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mode name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Name, E> {
                Ok(Name(v.to_string()))
            }
        }

        deserializer.deserialize_identifier(NameVisitor)
    }
}

impl RawConfig {
    fn resolve(self) -> Result<MeadowConfig> {
        let w = self.wind;
        let wind = WindConfig {
            noise_scale: w.noise_scale,
            noise_strength: w.noise_strength,
            length: w.length,
            sway: w.sway,
            mode: w.mode.0.parse()?,
            noise: w.noise.0.parse()?,
            gate: w.gate.0.parse()?,
        };
        Ok(MeadowConfig {
            field: self.field,
            placement: self.placement,
            wind,
            shading: self.shading,
            trail: self.trail,
            pulse: self.pulse,
            noise: self.noise,
        })
    }
}

fn check(ok: bool, what: impl FnOnce() -> String) -> Result<()> {
    if ok { Ok(()) } else { Err(MeadowError::Configuration(what())) }
}

impl FieldConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.count <= MAX_INSTANCES, || format!("count {} exceeds {}", self.count, MAX_INSTANCES))?;
        check(self.surface_radius.is_finite() && self.surface_radius > 0.0, || format!("surface_radius {}", self.surface_radius))?;
        check(self.sphere_sectors >= 3 && self.sphere_stacks >= 2, || {
            format!("sphere tessellation {}x{} is too coarse", self.sphere_sectors, self.sphere_stacks)
        })
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.scale_band;
        check(lo.is_finite() && hi.is_finite() && 0.0 < lo && lo <= hi, || format!("scale_band {:?}", self.scale_band))?;
        check(self.base_scale.is_finite() && self.base_scale > 0.0, || format!("base_scale {}", self.base_scale))?;
        check(self.noise_scale.is_finite(), || format!("noise_scale {}", self.noise_scale))?;
        check(self.normal_offset.is_finite(), || format!("normal_offset {}", self.normal_offset))?;
        check(self.jitter.is_finite() && self.jitter >= 0.0, || format!("jitter {}", self.jitter))
    }
}

impl ShadingConfig {
    pub fn validate(&self) -> Result<()> {
        parse_hex_color(&self.color_a)?;
        parse_hex_color(&self.color_b)?;
        parse_hex_color(&self.contact_tint)?;
        check(self.near.is_finite() && self.far.is_finite() && self.near < self.far, || {
            format!("depth range {}..{}", self.near, self.far)
        })
    }
}

impl TrailConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.mouse_power.is_finite() && self.mouse_power > 0.0, || format!("mouse_power {}", self.mouse_power))?;
        check((0.0..=1.0).contains(&self.fade_rate), || format!("fade_rate {}", self.fade_rate))?;
        check((0.0..=1.0).contains(&self.floor), || format!("floor {}", self.floor))?;
        check(self.max_dimension > 0, || "max_dimension must be positive".into())
    }
}

impl PulseConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.rise > 0.0 && self.fall > 0.0, || format!("pulse durations {} / {}", self.rise, self.fall))?;
        check(self.interval.is_finite() && self.interval >= 0.0, || format!("interval {}", self.interval))
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.cache_capacity > 0, || "cache_capacity must be at least 1".into())
    }
}

impl MeadowConfig {
    pub fn validate(&self) -> Result<()> {
        self.field.validate()?;
        self.placement.validate()?;
        self.wind.validate()?;
        self.shading.validate()?;
        self.trail.validate()?;
        self.pulse.validate()?;
        self.noise.validate()
    }

    pub fn from_ron(text: &str, path: &Path) -> Result<Self> {
        let file: RawConfig = ron::from_str(text)
            .map_err(|e| MeadowError::ConfigFile { path: path.to_path_buf(), source: Box::new(e) })?;
        let config = file.resolve()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| MeadowError::ConfigFile { path: path.to_path_buf(), source: Box::new(e) })?;
        Self::from_ron(&text, path)
    }

    /// Reads `$MEADOW_CONFIG` or `meadow.ron`, falling back to defaults.
    pub fn load_or_default() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            warn!("Config {:?} not found, using defaults", path);
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                error!("{e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn to_ron(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }
}

/// Parses `#rrggbb` into sRGB components in [0, 1].
pub fn parse_hex_color(s: &str) -> Result<[f32; 3]> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || MeadowError::Configuration(format!("bad colour {s:?}"));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(bad());
    }
    let mut rgb = [0.0; 3];
    for (i, slot) in rgb.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| bad())?;
        *slot = byte as f32 / 255.0;
    }
    Ok(rgb)
}
