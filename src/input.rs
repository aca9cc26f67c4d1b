use bevy::app::AppExit;
use bevy::prelude::*;

use crate::game::{CurrentCourse, MenuItem, MenuSelection, Mode, ScoreState, Tuning};
use crate::player::Player;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                (menu_navigate, menu_confirm).run_if(in_state(Mode::Menu)),
                (debug_star_grant, debug_report)
                    .run_if(in_state(Mode::Hub).or_else(in_state(Mode::Level))),
                help_toggle,
                diagnostics_toggle,
            ),
        );
    }
}

fn menu_navigate(mut selection: ResMut<MenuSelection>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::ArrowDown) {
        selection.0 = (selection.0 + 1).min(MenuItem::ALL.len() - 1);
    }
    if keys.just_pressed(KeyCode::ArrowUp) {
        selection.0 = selection.0.saturating_sub(1);
    }
}

fn menu_confirm(
    selection: Res<MenuSelection>,
    keys: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<Mode>>,
    mut exit: EventWriter<AppExit>,
) {
    if !keys.just_pressed(KeyCode::Enter) {
        return;
    }
    match MenuItem::ALL[selection.0] {
        MenuItem::StartGame => {
            info!("starting game");
            next_state.set(Mode::Hub);
        }
        MenuItem::Continue => {
            // No save data exists; behaves as a fresh start.
            info!("no save data, starting new game");
            next_state.set(Mode::Hub);
        }
        MenuItem::Exit => {
            exit.send(AppExit::Success);
        }
    }
}

fn debug_star_grant(keys: Res<ButtonInput<KeyCode>>, mut score: ResMut<ScoreState>) {
    if keys.just_pressed(KeyCode::F3) {
        score.stars += 10;
        info!(stars = score.stars, "debug star grant");
    }
}

fn debug_report(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<Mode>>,
    current: Res<CurrentCourse>,
    score: Res<ScoreState>,
    players: Query<&Transform, With<Player>>,
) {
    if !keys.just_pressed(KeyCode::F2) {
        return;
    }
    let position = players
        .get_single()
        .map(|t| t.translation)
        .unwrap_or(Vec3::ZERO);
    info!(
        mode = ?state.get(),
        course = current.0.map(|id| id.title()).unwrap_or("-"),
        stars = score.stars,
        coins = score.coins,
        position = ?position,
        "debug report"
    );
}

fn help_toggle(mut tuning: ResMut<Tuning>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyH) {
        tuning.show_help = !tuning.show_help;
    }
}

fn diagnostics_toggle(mut tuning: ResMut<Tuning>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::F1) {
        tuning.show_diagnostics = !tuning.show_diagnostics;
    }
}
