use bevy::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

/// Latest pointer contact with the interactive surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub world_position: Option<Vec3>,
    pub surface_uv: Option<Vec2>,
}

impl PointerState {
    pub const ABSENT: Self = Self { world_position: None, surface_uv: None };

    pub fn hit(world_position: Vec3, surface_uv: Vec2) -> Self {
        Self { world_position: Some(world_position), surface_uv: Some(surface_uv) }
    }

    /// Contact point in texture space, only when both fields are known.
    pub fn contact(&self) -> Option<(Vec3, Vec2)> {
        Some((self.world_position?, self.surface_uv?))
    }
}

/// Pointer state shared between input dispatch and the frame loop.
///
/// Both fields are written together under one lock and read back with
/// [`PointerInput::snapshot`], so a frame never sees a position from one
/// event paired with the coordinate of another.
#[derive(Debug, Clone, Default)]
pub struct PointerInput {
    state: Arc<Mutex<PointerState>>,
}

impl PointerInput {
    pub fn new() -> Self { Self::default() }

    pub fn on_pointer_move(&self, world_position: Vec3, surface_uv: Vec2) {
        *self.state.lock() = PointerState::hit(world_position, surface_uv);
    }

    pub fn on_pointer_leave(&self) {
        *self.state.lock() = PointerState::ABSENT;
    }

    pub fn snapshot(&self) -> PointerState {
        *self.state.lock()
    }
}
