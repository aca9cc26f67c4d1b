//! Kinematic player controller: ground-plane movement, the jump streak,
//! long jump, ground pound, and the follow camera.

use bevy::prelude::*;

use crate::game::{Mode, Tuning};
use crate::MainCamera;

const GROUND_Y: f32 = 1.0;
const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 5.0, 9.0);

#[derive(Component)]
pub struct Player {
    pub vel_y: f32,
    pub grounded: bool,
    pub jump_streak: u32,
    pub last_jump: f32,
    pub pending_boost: bool,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            vel_y: 0.0,
            grounded: true,
            jump_streak: 0,
            last_jump: f32::NEG_INFINITY,
            pending_boost: false,
        }
    }
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_player).add_systems(
            Update,
            (jump_input, player_move, camera_follow)
                .run_if(in_state(Mode::Hub).or_else(in_state(Mode::Level))),
        );
    }
}

fn spawn_player(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    tuning: Res<Tuning>,
) {
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Capsule3d::new(0.5, 1.0)),
            material: materials.add(Color::srgb_u8(230, 0, 18)),
            transform: Transform::from_translation(tuning.hub_spawn),
            visibility: Visibility::Hidden,
            ..default()
        },
        Player::default(),
    ));
}

/// Registers one jump input at time `now`. Rapid inputs build a streak; the
/// third completes it, arming a boost that the next grounded takeoff spends.
/// A completed streak yields exactly one boosted jump, and the input that
/// follows it starts a fresh streak at 1.
pub(crate) fn register_jump(player: &mut Player, tuning: &Tuning, now: f32, long_jump: bool) {
    if now - player.last_jump < tuning.streak_window {
        player.jump_streak += 1;
    } else {
        player.jump_streak = 1;
    }
    player.last_jump = now;
    if player.jump_streak >= 3 {
        player.pending_boost = true;
        player.jump_streak = 0;
        info!("triple jump");
    }
    if player.grounded {
        let height = if player.pending_boost {
            player.pending_boost = false;
            tuning.boosted_jump_height
        } else if long_jump {
            tuning.long_jump_height
        } else {
            tuning.jump_height
        };
        player.vel_y = (2.0 * tuning.gravity * height).sqrt();
        player.grounded = false;
    }
}

fn jump_input(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    tuning: Res<Tuning>,
    mut players: Query<&mut Player>,
) {
    if !keys.just_pressed(KeyCode::Space) {
        return;
    }
    let Ok(mut player) = players.get_single_mut() else {
        return;
    };
    let long_jump = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
    register_jump(&mut player, &tuning, time.elapsed_seconds(), long_jump);
}

fn player_move(
    time: Res<Time>,
    tuning: Res<Tuning>,
    keys: Res<ButtonInput<KeyCode>>,
    mut players: Query<(&mut Transform, &mut Player)>,
) {
    let dt = time.delta_seconds();
    let Ok((mut transform, mut player)) = players.get_single_mut() else {
        return;
    };

    let mut dir = Vec3::ZERO;
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        dir.z -= 1.0;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        dir.z += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        dir.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        dir.x += 1.0;
    }
    if dir != Vec3::ZERO {
        let speed = if keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight) {
            tuning.run_speed
        } else {
            tuning.move_speed
        };
        transform.translation += dir.normalize() * speed * dt;
    }

    // Ground pound
    if keys.just_pressed(KeyCode::ControlLeft) && !player.grounded {
        player.vel_y = -tuning.pound_speed;
    }

    player.vel_y -= tuning.gravity * dt;
    transform.translation.y += player.vel_y * dt;
    if transform.translation.y <= GROUND_Y {
        transform.translation.y = GROUND_Y;
        player.vel_y = 0.0;
        player.grounded = true;
    }
}

fn camera_follow(
    time: Res<Time>,
    mut cameras: Query<&mut Transform, (With<MainCamera>, Without<Player>)>,
    players: Query<&Transform, With<Player>>,
) {
    let Ok(mut cam) = cameras.get_single_mut() else {
        return;
    };
    let Ok(player) = players.get_single() else {
        return;
    };
    let target = player.translation + CAMERA_OFFSET;
    let lerp_factor = (1.0 - (-4.0 * time.delta_seconds()).exp()).clamp(0.0, 1.0);
    cam.translation = cam.translation.lerp(target, lerp_factor);
    let focus = player.translation + Vec3::Y * 1.5;
    cam.look_at(focus, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jump_speed(height: f32, tuning: &Tuning) -> f32 {
        (2.0 * tuning.gravity * height).sqrt()
    }

    fn land(player: &mut Player) {
        player.grounded = true;
        player.vel_y = 0.0;
    }

    #[test]
    fn third_rapid_jump_is_boosted_exactly_once() {
        let tuning = Tuning::default();
        let mut player = Player::default();

        register_jump(&mut player, &tuning, 0.0, false);
        assert_eq!(player.jump_streak, 1);
        assert_eq!(player.vel_y, jump_speed(tuning.jump_height, &tuning));

        land(&mut player);
        register_jump(&mut player, &tuning, 0.2, false);
        assert_eq!(player.jump_streak, 2);
        assert_eq!(player.vel_y, jump_speed(tuning.jump_height, &tuning));

        land(&mut player);
        register_jump(&mut player, &tuning, 0.4, false);
        assert_eq!(player.jump_streak, 0);
        assert!(!player.pending_boost);
        assert_eq!(
            player.vel_y,
            jump_speed(tuning.boosted_jump_height, &tuning)
        );

        // The input after a completed streak starts over at 1, unboosted.
        land(&mut player);
        register_jump(&mut player, &tuning, 0.6, false);
        assert_eq!(player.jump_streak, 1);
        assert_eq!(player.vel_y, jump_speed(tuning.jump_height, &tuning));
    }

    #[test]
    fn slow_inputs_never_build_a_streak() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        for i in 0..5 {
            land(&mut player);
            register_jump(&mut player, &tuning, i as f32 * 0.6, false);
            assert_eq!(player.jump_streak, 1);
            assert_eq!(player.vel_y, jump_speed(tuning.jump_height, &tuning));
        }
    }

    #[test]
    fn airborne_streak_completion_arms_the_next_takeoff() {
        let tuning = Tuning::default();
        let mut player = Player::default();

        register_jump(&mut player, &tuning, 0.0, false);
        // Still airborne for the next two inputs.
        register_jump(&mut player, &tuning, 0.2, false);
        register_jump(&mut player, &tuning, 0.4, false);
        assert!(player.pending_boost);

        land(&mut player);
        register_jump(&mut player, &tuning, 2.0, false);
        assert!(!player.pending_boost);
        assert_eq!(
            player.vel_y,
            jump_speed(tuning.boosted_jump_height, &tuning)
        );
    }

    #[test]
    fn long_jump_uses_the_higher_arc() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        register_jump(&mut player, &tuning, 0.0, true);
        assert_eq!(player.vel_y, jump_speed(tuning.long_jump_height, &tuning));
    }
}
