use bevy::prelude::*;
use meadow_noise::{NoiseContext, Seed};
use std::sync::Arc;

use crate::config::MeadowConfig;
use crate::error::Result;
use crate::field::{BladeGeometry, InstanceSet, SurfaceSampler, TriangleMesh};
use crate::trail::{EqualAreaSphere, InteractionTrail, PointerInput, SurfaceProjection};
use crate::wind::{FieldFrame, InteractionPulse, LayerStack, WindConfig, WindDeformer};

/// Summary of one [`MeadowSession::advance`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub instances: usize,
    pub vertices: usize,
    pub degenerate: usize,
    pub progress: f32,
}

/// One vegetation field over one host surface, with its trail and pulse.
///
/// `advance` runs the frame in order: pointer snapshot, pulse tick, trail
/// pass, then deformation of the whole field into [`MeadowSession::frame`].
#[derive(Resource)]
pub struct MeadowSession {
    config: MeadowConfig,
    noise: Arc<NoiseContext>,
    surface: TriangleMesh,
    sampler: SurfaceSampler,
    instances: InstanceSet,
    blade: BladeGeometry,
    trail: InteractionTrail,
    pulse: InteractionPulse,
    pointer: PointerInput,
    deformer: WindDeformer,
    layers: LayerStack,
    frame: FieldFrame,
    time: f32,
}

impl MeadowSession {
    /// Session over a sphere of `field.surface_radius` centred on the origin.
    /// `viewport` sizes the trail when no fixed resolution is configured.
    pub fn new(config: MeadowConfig, viewport: (u32, u32)) -> Result<Self> {
        config.validate()?;
        let f = &config.field;
        let surface = TriangleMesh::uv_sphere(f.surface_radius, f.sphere_sectors, f.sphere_stacks);
        Self::with_surface(config, surface, Arc::new(EqualAreaSphere::new(Vec3::ZERO)), viewport)
    }

    /// Session over an arbitrary surface with its own trail projection.
    pub fn with_surface(
        config: MeadowConfig,
        surface: TriangleMesh,
        projection: Arc<dyn SurfaceProjection>,
        viewport: (u32, u32),
    ) -> Result<Self> {
        config.validate()?;
        let noise = Arc::new(NoiseContext::new(Seed(config.noise.seed), config.noise.cache_capacity)?);
        let sampler = SurfaceSampler::new(noise.clone(), config.placement.clone());

        let instances = InstanceSet::new();
        instances.reconfigure(&sampler, &surface, config.field.count, config.field.seed)?;

        let (width, height) = config.trail.resolution.unwrap_or(viewport);
        let trail = InteractionTrail::new(width, height, config.trail.clone())?;
        let layers = LayerStack::from_config(&config.shading, config.wind.mode)?;

        Ok(Self {
            pulse: InteractionPulse::new(config.pulse.clone()),
            deformer: WindDeformer::new(noise.clone(), projection),
            blade: BladeGeometry::grass(),
            pointer: PointerInput::new(),
            frame: FieldFrame::default(),
            time: 0.0,
            config,
            noise,
            surface,
            sampler,
            instances,
            trail,
            layers,
        })
    }

    /// Records a pointer ray hit on the surface and fires the pulse.
    /// Returns whether the pulse accepted the trigger.
    pub fn pointer_hit(&mut self, world: Vec3) -> bool {
        match self.deformer.projection().project(world) {
            Some(uv) => self.pointer.on_pointer_move(world, uv),
            None => {
                self.pointer.on_pointer_leave();
                return false;
            }
        }
        self.pulse.trigger()
    }

    pub fn pointer_left(&mut self) {
        self.pointer.on_pointer_leave();
    }

    pub fn advance(&mut self, dt: f32) -> FrameStats {
        if dt.is_finite() && dt > 0.0 {
            self.time += dt;
        }
        let pointer = self.pointer.snapshot();
        let progress = self.pulse.tick(dt);
        let texture = self.trail.tick(&pointer, progress);

        let instances = self.instances.snapshot();
        let degenerate = self.deformer.deform_field(
            &self.blade.positions,
            &instances,
            self.time,
            texture,
            progress,
            &self.config.wind,
            &self.layers,
            &mut self.frame,
        );
        if degenerate > 0 {
            warn!("{} vertices produced non-finite displacement and were held at rest", degenerate);
        }
        FrameStats { instances: instances.len(), vertices: self.frame.vertex_count(), degenerate, progress }
    }

    /// Rebuilds the layout. On error the previous layout stays live.
    pub fn reconfigure(&mut self, count: usize, seed: u64) -> Result<usize> {
        match self.instances.reconfigure(&self.sampler, &self.surface, count, seed) {
            Ok(built) => {
                self.config.field.count = count;
                self.config.field.seed = seed;
                Ok(built)
            }
            Err(e) => {
                error!("Rejected field reconfiguration: {e}");
                Err(e)
            }
        }
    }

    pub fn set_wind(&mut self, wind: WindConfig) -> Result<()> {
        wind.validate()?;
        self.layers = LayerStack::from_config(&self.config.shading, wind.mode)?;
        self.config.wind = wind;
        Ok(())
    }

    /// Follows the viewport size unless the trail has a fixed resolution.
    pub fn resize_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        if self.config.trail.resolution.is_some() {
            return Ok(());
        }
        self.trail.resize(width, height)
    }

    pub fn config(&self) -> &MeadowConfig { &self.config }
    pub fn noise(&self) -> &NoiseContext { &self.noise }
    pub fn surface(&self) -> &TriangleMesh { &self.surface }
    pub fn instances(&self) -> &InstanceSet { &self.instances }
    pub fn blade(&self) -> &BladeGeometry { &self.blade }
    pub fn trail(&self) -> &InteractionTrail { &self.trail }
    pub fn pulse(&self) -> &InteractionPulse { &self.pulse }
    pub fn frame(&self) -> &FieldFrame { &self.frame }
    pub fn time(&self) -> f32 { self.time }

    /// Handle for input dispatch running outside the frame loop.
    pub fn pointer(&self) -> PointerInput { self.pointer.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> MeadowConfig {
        let mut c = MeadowConfig::default();
        c.field.count = 200;
        c.field.sphere_sectors = 16;
        c.field.sphere_stacks = 8;
        c.trail.resolution = Some((64, 64));
        c
    }

    #[test]
    fn frame_holds_every_blade_vertex() {
        let mut s = MeadowSession::new(small(), (800, 600)).unwrap();
        let stats = s.advance(1.0 / 60.0);
        assert_eq!(stats.instances, 200);
        assert_eq!(stats.vertices, 200 * s.blade().vertex_count());
        assert_eq!(stats.degenerate, 0);
        assert_eq!(stats.progress, 0.0);
    }

    #[test]
    fn pointer_hit_stamps_the_trail() {
        let mut s = MeadowSession::new(small(), (800, 600)).unwrap();
        assert!(s.pointer_hit(Vec3::X));
        let stats = s.advance(0.1);
        assert!(stats.progress > 0.0);
        let uv = EqualAreaSphere::new(Vec3::ZERO).project(Vec3::X).unwrap();
        assert!(s.trail().read().sample(uv) > 0.9);

        // still inside the pulse: a second hit is dropped
        assert!(!s.pointer_hit(Vec3::Y));
    }

    #[test]
    fn rejected_reconfigure_keeps_layout() {
        let mut s = MeadowSession::new(small(), (800, 600)).unwrap();
        let before = s.instances().snapshot();
        assert!(s.reconfigure(crate::config::MAX_INSTANCES + 1, 3).is_err());
        assert_eq!(s.instances().snapshot().as_ref(), before.as_ref());
        assert_eq!(s.config().field.count, 200);

        assert_eq!(s.reconfigure(50, 3).unwrap(), 50);
        assert_eq!(s.instances().count(), 50);
    }

    #[test]
    fn trail_follows_viewport_when_unsized() {
        let mut c = small();
        c.trail.resolution = None;
        let mut s = MeadowSession::new(c, (320, 200)).unwrap();
        assert_eq!(s.trail().read().buffer().width(), 320);
        s.resize_viewport(100, 50).unwrap();
        assert_eq!(s.trail().read().buffer().height(), 50);
        assert!(s.resize_viewport(0, 50).is_err());
    }

    #[test]
    fn oversized_trail_is_fatal() {
        let mut c = small();
        c.trail.resolution = Some((20_000, 20_000));
        assert!(MeadowSession::new(c, (1, 1)).is_err());
    }
}
