use bevy::input::mouse::{MouseButton, MouseMotion, MouseWheel};
use bevy::input::Input;
use bevy::prelude::*;
use bevy::window::{CursorLeft, CursorMoved, PrimaryWindow};

use crate::config::MAX_INSTANCES;
use crate::rendering::ReconfigureField;
use crate::session::MeadowSession;

pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera).add_systems(
            Update,
            (handle_orbit, handle_pointer, handle_field_keys).run_if(resource_exists::<MeadowSession>()),
        );
    }
}

/// Camera circling the origin, always looking at it.
#[derive(Component)]
pub struct OrbitCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            distance: 3.0,
            yaw: 0.0,
            pitch: 0.3,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            min_distance: 1.3,
            max_distance: 12.0,
        }
    }
}

impl OrbitCamera {
    pub fn transform(&self) -> Transform {
        let offset = Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0) * Vec3::Z * self.distance;
        Transform::from_translation(offset).looking_at(Vec3::ZERO, Vec3::Y)
    }
}

fn spawn_camera(mut commands: Commands) {
    let orbit = OrbitCamera::default();
    commands.spawn((
        Camera3dBundle {
            transform: orbit.transform(),
            ..default()
        },
        orbit,
    ));
}

fn handle_orbit(
    mouse_buttons: Res<Input<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut mouse_wheel: EventReader<MouseWheel>,
    mut cameras: Query<(&mut OrbitCamera, &mut Transform)>,
) {
    let dragging = mouse_buttons.pressed(MouseButton::Right);
    let delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let scroll: f32 = mouse_wheel.read().map(|w| w.y).sum();
    if (!dragging || delta == Vec2::ZERO) && scroll == 0.0 {
        return;
    }

    for (mut orbit, mut transform) in cameras.iter_mut() {
        if dragging {
            orbit.yaw -= delta.x * orbit.sensitivity;
            orbit.pitch = (orbit.pitch + delta.y * orbit.sensitivity).clamp(-1.54, 1.54);
        }
        let zoom = 1.0 - scroll * orbit.zoom_speed;
        orbit.distance = (orbit.distance * zoom).clamp(orbit.min_distance, orbit.max_distance);
        *transform = orbit.transform();
    }
}

/// Casts the cursor into the scene and reports hits on the host sphere.
fn handle_pointer(
    mut moved: EventReader<CursorMoved>,
    mut left: EventReader<CursorLeft>,
    primary_window: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    mut session: ResMut<MeadowSession>,
) {
    if left.read().last().is_some() {
        session.pointer_left();
    }
    if moved.read().last().is_none() {
        return;
    }

    let Ok(window) = primary_window.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        session.pointer_left();
        return;
    };
    let Ok((camera, camera_transform)) = cameras.get_single() else {
        return;
    };
    let Some(ray) = camera.viewport_to_world(camera_transform, cursor) else {
        return;
    };

    let radius = session.config().field.surface_radius;
    match ray_sphere(ray.origin, ray.direction, Vec3::ZERO, radius) {
        Some(hit) => {
            session.pointer_hit(hit);
        }
        None => session.pointer_left(),
    }
}

fn handle_field_keys(
    keyboard: Res<Input<KeyCode>>,
    session: Res<MeadowSession>,
    mut requests: EventWriter<ReconfigureField>,
) {
    let field = &session.config().field;
    let request = if keyboard.just_pressed(KeyCode::R) {
        Some(ReconfigureField { count: field.count, seed: field.seed.wrapping_add(1) })
    } else if keyboard.just_pressed(KeyCode::Up) {
        Some(ReconfigureField { count: (field.count.max(1) * 2).min(MAX_INSTANCES), seed: field.seed })
    } else if keyboard.just_pressed(KeyCode::Down) {
        Some(ReconfigureField { count: field.count / 2, seed: field.seed })
    } else {
        None
    };
    if let Some(request) = request {
        info!("Requesting {} blades with seed {}", request.count, request.seed);
        requests.send(request);
    }
}

/// Nearest intersection of a ray with a sphere in front of the origin.
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<Vec3> {
    let dir = direction.try_normalize()?;
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t = if -b - root >= 0.0 { -b - root } else { -b + root };
    if t < 0.0 {
        return None;
    }
    Some(origin + dir * t)
}
