use bevy::app::AppExit;
use bevy::prelude::*;
use bevy::render::view::NoFrustumCulling;
use bevy::window::{PrimaryWindow, WindowResized};

pub mod field_mesh;

use field_mesh::*;
use crate::config::MeadowConfig;
use crate::session::MeadowSession;

/// File the trail read texture is written to on `P`.
pub const TRAIL_SNAPSHOT_PATH: &str = "trail.png";

/// Request to rebuild the field layout.
#[derive(Event, Debug, Clone, Copy)]
pub struct ReconfigureField {
    pub count: usize,
    pub seed: u64,
}

pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ReconfigureField>()
            .add_systems(Startup, (setup_session, apply_deferred, spawn_scene).chain())
            .add_systems(
                Update,
                (apply_reconfigure, follow_viewport, update_field_mesh, save_trail_snapshot)
                    .chain()
                    .run_if(resource_exists::<MeadowSession>()),
            );
    }
}

fn setup_session(
    mut commands: Commands,
    config: Res<MeadowConfig>,
    primary_window: Query<&Window, With<PrimaryWindow>>,
    mut exit: EventWriter<AppExit>,
) {
    let viewport = primary_window
        .get_single()
        .map(|w| (w.width().max(1.0) as u32, w.height().max(1.0) as u32))
        .unwrap_or((1280, 720));

    match MeadowSession::new(config.clone(), viewport) {
        Ok(session) => {
            info!(
                "Meadow session ready: {} instances, trail {}x{}",
                session.instances().count(),
                session.trail().read().buffer().width(),
                session.trail().read().buffer().height()
            );
            commands.insert_resource(session);
        }
        Err(e) => {
            error!("Failed to start meadow session: {e}");
            exit.send(AppExit);
        }
    }
}

fn spawn_scene(
    mut commands: Commands,
    session: Option<Res<MeadowSession>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(session) = session else {
        return;
    };

    // blades are unlit; these only shade the host sphere
    commands.insert_resource(AmbientLight {
        color: Color::rgb(0.55, 0.6, 0.7),
        brightness: 0.5,
    });
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            color: Color::rgb(1.0, 0.97, 0.9),
            illuminance: 6000.0,
            ..default()
        },
        transform: Transform::from_xyz(2.0, 4.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    let ground = session.config().shading.color_a.as_str();
    let ground = Color::hex(ground).unwrap_or(Color::rgb(0.13, 0.09, 0.0));
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(FieldMeshBuilder::for_surface(session.surface()).build()),
            material: materials.add(StandardMaterial { base_color: ground, perceptual_roughness: 1.0, ..default() }),
            ..default()
        },
        HostSurface,
    ));

    let instances = session.instances().snapshot();
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(FieldMeshBuilder::for_field(session.blade(), &instances).build()),
            material: materials.add(StandardMaterial {
                base_color: Color::WHITE,
                unlit: true,
                double_sided: true,
                cull_mode: None,
                ..default()
            }),
            ..default()
        },
        // aabb only covers the rest pose
        NoFrustumCulling,
        FieldMesh { generation: session.instances().generation() },
    ));
}

fn apply_reconfigure(mut events: EventReader<ReconfigureField>, mut session: ResMut<MeadowSession>) {
    // only the latest request matters
    if let Some(request) = events.read().last() {
        if let Ok(built) = session.reconfigure(request.count, request.seed) {
            info!("Field now has {} blades (seed {})", built, request.seed);
        }
    }
}

fn follow_viewport(
    mut resized: EventReader<WindowResized>,
    mut session: ResMut<MeadowSession>,
    mut exit: EventWriter<AppExit>,
) {
    // a minimised window reports 0x0; the trail keeps its size until it is restored
    let Some(event) = resized
        .read()
        .filter(|e| e.width.round() >= 1.0 && e.height.round() >= 1.0)
        .last()
    else {
        return;
    };
    let (w, h) = (event.width.round() as u32, event.height.round() as u32);
    if let Err(e) = session.resize_viewport(w, h) {
        error!("Failed to resize interaction trail: {e}");
        exit.send(AppExit);
    }
}

fn update_field_mesh(
    time: Res<Time>,
    mut session: ResMut<MeadowSession>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut fields: Query<(&Handle<Mesh>, &mut FieldMesh)>,
) {
    let stats = session.advance(time.delta_seconds());

    for (handle, mut field) in fields.iter_mut() {
        let Some(mesh) = meshes.get_mut(handle) else {
            continue;
        };
        let generation = session.instances().generation();
        if field.generation != generation {
            let instances = session.instances().snapshot();
            *mesh = FieldMeshBuilder::for_field(session.blade(), &instances).build();
            field.generation = generation;
            debug!("Rebuilt field mesh for generation {}", generation);
        }
        write_frame(mesh, session.frame());
    }

    if stats.progress > 0.0 {
        debug!("Pulse progress {:.3}", stats.progress);
    }
}

fn save_trail_snapshot(keyboard: Res<Input<KeyCode>>, session: Res<MeadowSession>) {
    if !keyboard.just_pressed(KeyCode::P) {
        return;
    }
    match session.trail().read().buffer().to_gray_image().save(TRAIL_SNAPSHOT_PATH) {
        Ok(()) => info!("Saved trail to {}", TRAIL_SNAPSHOT_PATH),
        Err(e) => error!("Failed to save trail: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_following_viewport() -> App {
        let mut config = MeadowConfig::default();
        config.field.count = 50;
        config.field.sphere_sectors = 8;
        config.field.sphere_stacks = 4;
        config.trail.resolution = None;

        let mut app = App::new();
        app.add_event::<WindowResized>()
            .add_event::<AppExit>()
            .insert_resource(MeadowSession::new(config, (64, 48)).unwrap())
            .add_systems(Update, follow_viewport);
        app
    }

    fn resize(app: &mut App, width: f32, height: f32) {
        app.world.send_event(WindowResized { window: Entity::PLACEHOLDER, width, height });
        app.update();
    }

    fn trail_size(app: &App) -> (u32, u32) {
        let buffer = app.world.resource::<MeadowSession>().trail().read().buffer();
        (buffer.width(), buffer.height())
    }

    fn exit_requested(app: &App) -> bool {
        !app.world.resource::<Events<AppExit>>().is_empty()
    }

    #[test]
    fn scene_has_sphere_field_and_one_light() {
        let mut app = app_following_viewport();
        app.init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .add_systems(Startup, spawn_scene);
        app.update();

        let world = &mut app.world;
        assert_eq!(world.query::<&DirectionalLight>().iter(world).count(), 1);
        assert_eq!(world.query::<&HostSurface>().iter(world).count(), 1);
        assert_eq!(world.query::<&FieldMesh>().iter(world).count(), 1);
        assert!(world.get_resource::<AmbientLight>().is_some());
    }

    #[test]
    fn trail_tracks_window_size() {
        let mut app = app_following_viewport();
        resize(&mut app, 320.0, 200.0);
        assert_eq!(trail_size(&app), (320, 200));
        assert!(!exit_requested(&app));
    }

    #[test]
    fn minimised_window_keeps_the_trail() {
        let mut app = app_following_viewport();
        resize(&mut app, 0.0, 0.0);
        assert_eq!(trail_size(&app), (64, 48));
        assert!(!exit_requested(&app));
    }

    #[test]
    fn failed_trail_resize_exits() {
        let mut app = app_following_viewport();
        resize(&mut app, 9000.0, 9000.0);
        assert!(exit_requested(&app));
    }
}
