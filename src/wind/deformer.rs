use bevy::prelude::*;
use meadow_noise::NoiseContext;
use rayon::prelude::*;
use std::f32::consts::PI;
use std::sync::Arc;

use super::shading::LayerStack;
use super::{smoothstep, NoiseMode, TrailGate, WindConfig};
use crate::field::PlacementTransform;
use crate::trail::{ReadTexture, SurfaceProjection};

/// Height is scaled by this before squaring, so the tip of a unit blade
/// sways at about half the configured strength.
const HEIGHT_FALLOFF: f32 = 0.7;
/// Noise drifts at this fraction of `sway` per second.
const DRIFT: f32 = 0.5;

/// World-space vertex positions and colours for one frame of the field,
/// laid out instance-major.
#[derive(Debug, Clone, Default)]
pub struct FieldFrame {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
}

impl FieldFrame {
    pub fn resize(&mut self, vertices: usize) {
        self.positions.resize(vertices, [0.0; 3]);
        self.colors.resize(vertices, [0.0, 0.0, 0.0, 1.0]);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
}

pub struct WindDeformer {
    noise: Arc<NoiseContext>,
    projection: Arc<dyn SurfaceProjection>,
}

impl WindDeformer {
    pub fn new(noise: Arc<NoiseContext>, projection: Arc<dyn SurfaceProjection>) -> Self {
        Self { noise, projection }
    }

    pub fn projection(&self) -> &dyn SurfaceProjection { self.projection.as_ref() }

    /// Two noise channels at the instance, each smoothed into [0, 1].
    ///
    /// Evaluated uncached: the lookup point moves with time.
    pub fn wind_noise(&self, instance_position: Vec3, time: f32, config: &WindConfig) -> Vec2 {
        let p = (instance_position * config.noise_scale + Vec3::splat(time * DRIFT * config.sway)).to_array();
        let field = self.noise.field();
        let raw = match config.noise {
            NoiseMode::Classic => Vec2::new(field.perlin3(p), field.simplex3(p)),
            NoiseMode::Curl => {
                let [x, y, _] = field.curl3(p);
                Vec2::new(x, y)
            }
        };
        Vec2::new(smoothstep(-1.0, 1.0, raw.x), smoothstep(-1.0, 1.0, raw.y))
    }

    /// Trail intensity under the instance, scaled by the pulse and smoothed.
    pub fn gate(&self, instance_position: Vec3, trail: ReadTexture<'_>, pulse: f32) -> f32 {
        let Some(uv) = self.projection.project(instance_position) else {
            return 0.0;
        };
        let g = smoothstep(0.0, 1.0, trail.sample(uv) * pulse.clamp(0.0, 1.0));
        if g.is_finite() { g } else { 0.0 }
    }

    pub fn deform(
        &self,
        vertex: Vec3,
        instance_position: Vec3,
        time: f32,
        trail: ReadTexture<'_>,
        pulse: f32,
        config: &WindConfig,
    ) -> Vec3 {
        let noise = self.wind_noise(instance_position, time, config);
        let gate = self.gate(instance_position, trail, pulse);
        displace(vertex, noise, time, gate, config).0
    }

    /// Deforms every blade vertex of every instance into `frame` and colours
    /// it with `layers`. Returns how many vertices fell back to rest.
    #[allow(clippy::too_many_arguments)]
    pub fn deform_field(
        &self,
        blade: &[Vec3],
        instances: &[PlacementTransform],
        time: f32,
        trail: ReadTexture<'_>,
        pulse: f32,
        config: &WindConfig,
        layers: &LayerStack,
        frame: &mut FieldFrame,
    ) -> usize {
        let stride = blade.len();
        frame.resize(instances.len() * stride);
        if stride == 0 {
            return 0;
        }

        frame
            .positions
            .par_chunks_mut(stride)
            .zip(frame.colors.par_chunks_mut(stride))
            .zip(instances.par_iter())
            .map(|((positions, colors), instance)| {
                let noise = self.wind_noise(instance.position, time, config);
                let gate = self.gate(instance.position, trail, pulse);
                let mut degenerate = 0;
                for ((out, color), &vertex) in positions.iter_mut().zip(colors.iter_mut()).zip(blade) {
                    let (local, fell_back) = displace(vertex, noise, time, gate, config);
                    degenerate += fell_back as usize;
                    let world = instance.apply(local);
                    *out = world.to_array();
                    *color = layers.shade(world, gate);
                }
                degenerate
            })
            .sum()
    }
}

/// Sways one blade-space vertex. `noise` holds the two smoothed channels and
/// `gate` the trail weight in [0, 1].
///
/// The offset grows with the square of the vertex height, so a vertex at
/// height 0 never moves. A non-finite result is replaced by the rest
/// position and reported through the second value.
pub fn displace(vertex: Vec3, noise: Vec2, time: f32, gate: f32, config: &WindConfig) -> (Vec3, bool) {
    let weight = (vertex.y * HEIGHT_FALLOFF).powi(2) * config.noise_strength;
    let swing_x = (time + noise.x * PI).sin() * weight;
    let swing_z = (time + noise.y * PI).cos() * weight;
    let displaced = vertex + Vec3::new(swing_x, 0.0, swing_z);

    let w = gate.clamp(0.0, 1.0);
    let mixed = match config.gate {
        TrailGate::Suppress => displaced.lerp(vertex, w),
        TrailGate::Excite => vertex.lerp(displaced, w),
    };
    let out = mixed * config.length;
    if out.is_finite() {
        return (out, false);
    }
    let rest = vertex * config.length;
    (if rest.is_finite() { rest } else { Vec3::ZERO }, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::{EqualAreaSphere, TrailBuffer};
    use meadow_noise::Seed;

    fn deformer() -> WindDeformer {
        let noise = Arc::new(NoiseContext::new(Seed(1), 16).unwrap());
        WindDeformer::new(noise, Arc::new(EqualAreaSphere::new(Vec3::ZERO)))
    }

    fn buffer(fill: f32) -> TrailBuffer {
        TrailBuffer::allocate(16, 16, 64, fill).unwrap()
    }

    #[test]
    fn base_vertex_is_pinned() {
        let d = deformer();
        let trail = buffer(0.0);
        let config = WindConfig { length: 1.5, ..Default::default() };
        let base = Vec3::new(0.03, 0.0, -0.01);
        for i in 0..50 {
            let time = i as f32 * 0.37;
            let out = d.deform(base, Vec3::new(0.0, 1.0, 0.0), time, ReadTexture::new(&trail), 0.7, &config);
            assert!((out - base * 1.5).length() < 1e-6);
        }
    }

    #[test]
    fn tip_sways_when_not_gated() {
        let d = deformer();
        let trail = buffer(0.0);
        let config = WindConfig::default();
        let tip = Vec3::new(0.0, 1.0, 0.0);
        let a = d.deform(tip, Vec3::X, 0.0, ReadTexture::new(&trail), 0.0, &config);
        assert!(Vec2::new(a.x, a.z).length() > 1e-3);
        assert_eq!(a.y, 1.0);
    }

    #[test]
    fn full_trail_suppresses_sway() {
        let d = deformer();
        let trail = buffer(1.0);
        let tip = Vec3::new(0.0, 1.0, 0.0);
        let config = WindConfig::default();
        let out = d.deform(tip, Vec3::X, 2.0, ReadTexture::new(&trail), 1.0, &config);
        assert!((out - tip).length() < 1e-6);
    }

    #[test]
    fn excite_mode_rests_while_idle() {
        let d = deformer();
        let trail = buffer(1.0);
        let tip = Vec3::new(0.0, 1.0, 0.0);
        let config = WindConfig { gate: TrailGate::Excite, ..Default::default() };
        let out = d.deform(tip, Vec3::Z, 3.0, ReadTexture::new(&trail), 0.0, &config);
        assert!((out - tip).length() < 1e-6);
    }

    #[test]
    fn non_finite_input_falls_back_to_rest() {
        let config = WindConfig::default();
        let vertex = Vec3::new(0.0, 0.5, 0.0);
        let (out, fell_back) = displace(vertex, Vec2::new(f32::NAN, 0.2), 1.0, 0.0, &config);
        assert!(fell_back);
        assert_eq!(out, vertex);
    }

    #[test]
    fn noise_channels_are_smoothed() {
        let d = deformer();
        for mode in [NoiseMode::Classic, NoiseMode::Curl] {
            let config = WindConfig { noise: mode, ..Default::default() };
            for i in 0..20 {
                let n = d.wind_noise(Vec3::new(i as f32, 0.5, -1.0), i as f32 * 0.1, &config);
                assert!((0.0..=1.0).contains(&n.x) && (0.0..=1.0).contains(&n.y), "{n:?}");
            }
        }
    }

    #[test]
    fn field_frame_covers_every_vertex() {
        let d = deformer();
        let trail = buffer(0.0);
        let blade = [Vec3::ZERO, Vec3::new(0.0, 0.5, 0.0), Vec3::Y];
        let instances: Vec<PlacementTransform> = (0..4)
            .map(|i| PlacementTransform {
                position: Vec3::new(i as f32, 1.0, 0.0),
                orientation: Quat::IDENTITY,
                scale: 0.1,
                index: i,
            })
            .collect();
        let layers = LayerStack::from_config(&Default::default(), Default::default()).unwrap();
        let mut frame = FieldFrame::default();
        let bad = d.deform_field(&blade, &instances, 1.0, ReadTexture::new(&trail), 0.0, &WindConfig::default(), &layers, &mut frame);
        assert_eq!(bad, 0);
        assert_eq!(frame.vertex_count(), 12);
        // base vertices sit on their instance position
        for (i, instance) in instances.iter().enumerate() {
            assert_eq!(frame.positions[i * 3], instance.position.to_array());
        }
        assert!(frame.colors.iter().all(|c| c[3] == 1.0));
    }
}
