use bevy::diagnostic::{DiagnosticsStore, EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};

use crate::game::{
    Banner, CurrentCourse, Hud, MenuItem, MenuRoot, MenuSelection, Mode, ScoreState, Tuning,
};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .add_systems(Startup, (spawn_hud, spawn_menu_ui))
            .add_systems(
                Update,
                (
                    update_hud,
                    update_menu_cursor.run_if(in_state(Mode::Menu)),
                    overlay_windows,
                ),
            );
    }
}

#[derive(Component)]
struct StarText;

#[derive(Component)]
struct CoinText;

#[derive(Component)]
struct LivesText;

#[derive(Component)]
struct MenuItemText(usize);

#[derive(Component)]
struct MenuCursor;

const MENU_ITEM_TOP: f32 = 45.0;
const MENU_ITEM_STEP: f32 = 7.0;

fn gold() -> Color {
    Color::srgb_u8(255, 219, 88)
}

fn spawn_hud(mut commands: Commands, score: Res<ScoreState>) {
    commands
        .spawn((
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    ..default()
                },
                visibility: Visibility::Hidden,
                ..default()
            },
            Hud,
        ))
        .with_children(|parent| {
            parent.spawn((
                TextBundle::from_section(
                    format!("* x {}", score.stars),
                    TextStyle {
                        font_size: 28.0,
                        color: gold(),
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    right: Val::Px(20.0),
                    ..default()
                }),
                StarText,
            ));
            parent.spawn((
                TextBundle::from_section(
                    format!("$ x {}", score.coins),
                    TextStyle {
                        font_size: 28.0,
                        color: gold(),
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    top: Val::Px(44.0),
                    right: Val::Px(20.0),
                    ..default()
                }),
                CoinText,
            ));
            parent.spawn((
                TextBundle::from_section(
                    format!("MARIO x {}", score.lives),
                    TextStyle {
                        font_size: 28.0,
                        color: Color::srgb_u8(230, 0, 18),
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    left: Val::Px(20.0),
                    ..default()
                }),
                LivesText,
            ));

            let mut banner = TextBundle::from_section(
                "",
                TextStyle {
                    font_size: 42.0,
                    color: Color::WHITE,
                    ..default()
                },
            )
            .with_text_justify(JustifyText::Center)
            .with_style(Style {
                position_type: PositionType::Absolute,
                top: Val::Px(90.0),
                width: Val::Percent(100.0),
                ..default()
            });
            banner.visibility = Visibility::Hidden;
            parent.spawn((banner, Banner));
        });
}

fn spawn_menu_ui(mut commands: Commands) {
    commands
        .spawn((
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    ..default()
                },
                ..default()
            },
            MenuRoot,
        ))
        .with_children(|parent| {
            parent.spawn(
                TextBundle::from_section(
                    "ULTRA MARIO 64",
                    TextStyle {
                        font_size: 64.0,
                        color: Color::srgb_u8(230, 0, 18),
                        ..default()
                    },
                )
                .with_text_justify(JustifyText::Center)
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    top: Val::Percent(12.0),
                    width: Val::Percent(100.0),
                    ..default()
                }),
            );

            for (index, item) in MenuItem::ALL.iter().enumerate() {
                parent.spawn((
                    TextBundle::from_section(
                        item.label(),
                        TextStyle {
                            font_size: 32.0,
                            color: Color::WHITE,
                            ..default()
                        },
                    )
                    .with_text_justify(JustifyText::Center)
                    .with_style(Style {
                        position_type: PositionType::Absolute,
                        top: Val::Percent(MENU_ITEM_TOP + index as f32 * MENU_ITEM_STEP),
                        width: Val::Percent(100.0),
                        ..default()
                    }),
                    MenuItemText(index),
                ));
            }

            parent.spawn((
                TextBundle::from_section(
                    ">",
                    TextStyle {
                        font_size: 32.0,
                        color: gold(),
                        ..default()
                    },
                )
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    top: Val::Percent(MENU_ITEM_TOP),
                    left: Val::Percent(38.0),
                    ..default()
                }),
                MenuCursor,
            ));

            parent.spawn(
                TextBundle::from_section(
                    "Arrows to choose, Enter to confirm",
                    TextStyle {
                        font_size: 18.0,
                        color: Color::srgba(1.0, 1.0, 1.0, 0.7),
                        ..default()
                    },
                )
                .with_text_justify(JustifyText::Center)
                .with_style(Style {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(40.0),
                    width: Val::Percent(100.0),
                    ..default()
                }),
            );
        });
}

fn update_hud(
    score: Res<ScoreState>,
    mut texts: ParamSet<(
        Query<&mut Text, With<StarText>>,
        Query<&mut Text, With<CoinText>>,
        Query<&mut Text, With<LivesText>>,
    )>,
) {
    if !score.is_changed() {
        return;
    }
    if let Ok(mut text) = texts.p0().get_single_mut() {
        text.sections[0].value = format!("* x {}", score.stars);
    }
    if let Ok(mut text) = texts.p1().get_single_mut() {
        text.sections[0].value = format!("$ x {}", score.coins);
    }
    if let Ok(mut text) = texts.p2().get_single_mut() {
        text.sections[0].value = format!("MARIO x {}", score.lives);
    }
}

fn update_menu_cursor(
    time: Res<Time>,
    selection: Res<MenuSelection>,
    mut cursor_q: Query<&mut Style, With<MenuCursor>>,
    mut items_q: Query<(&MenuItemText, &mut Text)>,
) {
    for mut style in &mut cursor_q {
        style.top = Val::Percent(MENU_ITEM_TOP + selection.0 as f32 * MENU_ITEM_STEP);
        style.left = Val::Percent(38.0 + (time.elapsed_seconds() * 3.0).sin() * 0.4);
    }
    for (item, mut text) in &mut items_q {
        text.sections[0].style.color = if item.0 == selection.0 {
            gold()
        } else {
            Color::WHITE
        };
    }
}

fn overlay_windows(
    mut contexts: EguiContexts,
    tuning: Res<Tuning>,
    diagnostics: Res<DiagnosticsStore>,
    state: Res<State<Mode>>,
    current: Res<CurrentCourse>,
    score: Res<ScoreState>,
) {
    let ctx = contexts.ctx_mut();

    if tuning.show_help {
        egui::Window::new("Help")
            .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("WASD / arrows: move, Shift: run and long jump");
                ui.label("Space: jump, three quick jumps for a high one");
                ui.label("Ctrl in the air: ground pound");
                ui.label("E: enter a painting or the exit portal");
                ui.label("Esc: back to the menu");
                ui.label("F1: diagnostics, F2: log report, F3: stars, H: help");
            });
    }

    if tuning.show_diagnostics {
        egui::Window::new("Diagnostics")
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
            .resizable(false)
            .show(ctx, |ui| {
                let fps = diagnostics
                    .get(&FrameTimeDiagnosticsPlugin::FPS)
                    .and_then(|d| d.smoothed())
                    .unwrap_or(0.0);
                let entities = diagnostics
                    .get(&EntityCountDiagnosticsPlugin::ENTITY_COUNT)
                    .and_then(|d| d.value())
                    .unwrap_or(0.0);
                ui.label(format!("FPS: {fps:.1}"));
                ui.label(format!("Entities: {entities:.0}"));
                ui.label(format!("Mode: {:?}", state.get()));
                ui.label(format!(
                    "Course: {}",
                    current.0.map(|id| id.title()).unwrap_or("-")
                ));
                ui.label(format!("Stars: {}  Coins: {}", score.stars, score.coins));
            });
    }
}
