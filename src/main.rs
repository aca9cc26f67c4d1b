use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::diagnostic::{EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;

mod game;
mod input;
mod player;
mod ui;
mod world;

use game::GamePlugin;
use input::InputPlugin;
use player::PlayerPlugin;
use ui::UiPlugin;
use world::WorldPlugin;

#[derive(Component)]
pub struct MainCamera;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb_u8(100, 149, 237)))
        .insert_resource(Msaa::Sample4)
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(EntityCountDiagnosticsPlugin)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "castle64".into(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((GamePlugin, WorldPlugin, PlayerPlugin, InputPlugin, UiPlugin))
        .add_systems(Startup, setup_camera)
        .run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3dBundle {
            camera: Camera {
                hdr: true,
                ..default()
            },
            tonemapping: Tonemapping::TonyMcMapface,
            transform: world::menu_camera(),
            ..default()
        },
        BloomSettings::default(),
        MainCamera,
    ));
}
