use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};
use bevy::prelude::*;

use meadow::config::MeadowConfig;
use meadow::controller::ControllerPlugin;
use meadow::rendering::RenderingPlugin;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::rgb(0.05, 0.06, 0.08)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Meadow".into(),
                resolution: (1280.0, 720.0).into(),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(LogDiagnosticsPlugin::default())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // config is read after LogPlugin is up so fallbacks are reported
        .add_systems(PreStartup, load_config)
        .add_plugins(RenderingPlugin)
        .add_plugins(ControllerPlugin)
        .run();
}

fn load_config(mut commands: Commands) {
    commands.insert_resource(MeadowConfig::load_or_default());
}
