//! Scene-graph construction: menu backdrop, the castle hub, the five
//! courses, and the cosmetic animation systems. No game decisions here.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::game::{
    Area, Collectible, CollectibleKind, CourseEntry, CourseId, HubZones, Mode, Owner, Tuning,
    Zone, ZonePoint,
};

/// Rng for procedural placement. Tests pre-insert a seeded one.
#[derive(Resource)]
pub struct WorldRng(pub StdRng);

impl Default for WorldRng {
    fn default() -> Self {
        Self(StdRng::from_entropy())
    }
}

#[derive(Component)]
pub struct HubRoot;

#[derive(Component)]
pub struct MenuHead;

/// Spinning coin.
#[derive(Component)]
pub struct Spin;

#[derive(Component)]
pub struct StarSpin {
    pub base_y: f32,
    pub phase: f32,
}

/// Scale pulse that runs over a painting after it is touched.
#[derive(Component, Default)]
pub struct PaintingRipple {
    pub active: bool,
    pub t: f32,
}

impl PaintingRipple {
    pub fn start(&mut self) {
        self.active = true;
        self.t = 0.0;
    }
}

const PAINTING_SIZE: Vec3 = Vec3::new(3.0, 4.0, 0.2);

pub fn menu_camera() -> Transform {
    Transform::from_xyz(0.0, 1.4, 5.0).looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
}

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldRng>()
            .add_systems(Startup, (spawn_lighting, spawn_menu_backdrop, spawn_hub))
            .add_systems(
                Update,
                (
                    spin_collectibles,
                    ripple_paintings,
                    menu_head_look.run_if(in_state(Mode::Menu)),
                ),
            );
    }
}

fn spawn_lighting(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
    });
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 9_000.0,
            shadows_enabled: false,
            ..default()
        },
        transform: Transform::from_xyz(30.0, 50.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}

// Stylized head that watches the pointer behind the title menu.
fn spawn_menu_backdrop(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands
        .spawn((
            SpatialBundle::from_transform(Transform::from_xyz(0.0, 1.0, 0.0)),
            MenuHead,
        ))
        .with_children(|parent| {
            parent.spawn(PbrBundle {
                mesh: meshes.add(Sphere::new(0.75)),
                material: materials.add(Color::srgb_u8(242, 195, 162)),
                ..default()
            });
            // Cap
            parent.spawn(PbrBundle {
                mesh: meshes.add(Sphere::new(0.45)),
                material: materials.add(Color::srgb_u8(230, 0, 18)),
                transform: Transform::from_xyz(0.0, 0.55, 0.0)
                    .with_scale(Vec3::new(1.5, 0.8, 1.5)),
                ..default()
            });
            // Brim
            parent.spawn(PbrBundle {
                mesh: meshes.add(Cylinder::new(0.55, 0.08)),
                material: materials.add(Color::srgb_u8(230, 0, 18)),
                transform: Transform::from_xyz(0.0, 0.45, 0.55),
                ..default()
            });
        });
}

const PAINTINGS: [(&str, CourseId, Vec3, (u8, u8, u8), f32); 5] = [
    (
        "bob_omb",
        CourseId::BobOmb,
        Vec3::new(-10.0, 3.0, -19.5),
        (34, 177, 76),
        0.0,
    ),
    (
        "whomps",
        CourseId::Whomps,
        Vec3::new(10.0, 3.0, -19.5),
        (139, 69, 19),
        0.0,
    ),
    (
        "cool_cool",
        CourseId::CoolCool,
        Vec3::new(-15.0, 3.0, -25.0),
        (235, 245, 255),
        FRAC_PI_2,
    ),
    (
        "jolly_roger",
        CourseId::JollyRoger,
        Vec3::new(15.0, 3.0, -25.0),
        (64, 164, 223),
        -FRAC_PI_2,
    ),
    (
        "bowser1",
        CourseId::Bowser,
        Vec3::new(0.0, 8.0, -29.5),
        (160, 30, 30),
        0.0,
    ),
];

const TREES: [(f32, f32); 10] = [
    (-30.0, 10.0),
    (30.0, 10.0),
    (-25.0, 25.0),
    (25.0, 25.0),
    (-40.0, -10.0),
    (40.0, -10.0),
    (-20.0, 40.0),
    (20.0, 40.0),
    (-45.0, 20.0),
    (45.0, 20.0),
];

const HUB_COINS: [Vec3; 5] = [
    Vec3::new(5.0, 1.0, 5.0),
    Vec3::new(-5.0, 1.0, 5.0),
    Vec3::new(0.0, 1.0, 10.0),
    Vec3::new(10.0, 1.0, -5.0),
    Vec3::new(-10.0, 1.0, -5.0),
];

fn spawn_hub(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    tuning: Res<Tuning>,
    mut zones: ResMut<HubZones>,
) {
    let wall = materials.add(Color::srgb_u8(245, 245, 220));
    let roof = materials.add(Color::srgb_u8(220, 60, 60));
    let grass = materials.add(Color::srgb_u8(34, 177, 76));
    let stone = materials.add(Color::srgb_u8(180, 180, 160));
    let water = materials.add(Color::srgb_u8(64, 164, 223));

    let root = commands
        .spawn((
            SpatialBundle {
                visibility: Visibility::Hidden,
                ..default()
            },
            HubRoot,
        ))
        .id();

    let mut built = Vec::new();

    commands.entity(root).with_children(|parent| {
        // Grounds: grass plate, moat, path, bridge
        for (size, pos, mat) in [
            (Vec3::new(200.0, 0.5, 200.0), Vec3::new(0.0, -0.25, 0.0), &grass),
            (Vec3::new(60.0, 0.1, 60.0), Vec3::new(0.0, -0.05, -30.0), &water),
            (Vec3::new(10.0, 0.2, 40.0), Vec3::new(0.0, 0.1, 0.0), &stone),
            (Vec3::new(8.0, 0.3, 20.0), Vec3::new(0.0, 0.15, -10.0), &stone),
            (Vec3::new(20.0, 25.0, 18.0), Vec3::new(0.0, 12.5, -30.0), &wall),
        ] {
            parent.spawn(PbrBundle {
                mesh: meshes.add(Cuboid::new(size.x, size.y, size.z)),
                material: mat.clone(),
                transform: Transform::from_translation(pos),
                ..default()
            });
        }

        // Entrance door
        parent.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::new(4.0, 6.0, 0.5)),
            material: materials.add(Color::srgb_u8(40, 30, 20)),
            transform: Transform::from_xyz(0.0, 3.0, -20.5),
            ..default()
        });

        // Towers with cone roofs
        for (x, radius, height, roof_r, roof_h) in [
            (0.0, 4.0, 35.0, 5.0, 8.0),
            (-15.0, 3.0, 28.0, 3.5, 6.0),
            (15.0, 3.0, 28.0, 3.5, 6.0),
        ] {
            parent.spawn(PbrBundle {
                mesh: meshes.add(Cylinder::new(radius, height)),
                material: wall.clone(),
                transform: Transform::from_xyz(x, height / 2.0, -30.0),
                ..default()
            });
            parent.spawn(PbrBundle {
                mesh: meshes.add(Cone {
                    radius: roof_r,
                    height: roof_h,
                }),
                material: roof.clone(),
                transform: Transform::from_xyz(x, height + roof_h / 2.0, -30.0),
                ..default()
            });
        }

        // Window grid on the front wall
        let glass = materials.add(Color::srgb_u8(100, 150, 200));
        for i in 0..3 {
            for j in 0..2 {
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cuboid::new(1.5, 2.0, 0.2)),
                    material: glass.clone(),
                    transform: Transform::from_xyz(
                        -5.0 + i as f32 * 5.0,
                        8.0 + j as f32 * 6.0,
                        -20.8,
                    ),
                    ..default()
                });
            }
        }

        // Trees
        let trunk = materials.add(Color::srgb_u8(101, 67, 33));
        let leaves = materials.add(Color::srgb_u8(34, 139, 34));
        for (x, z) in TREES {
            parent.spawn(PbrBundle {
                mesh: meshes.add(Cylinder::new(0.5, 5.0)),
                material: trunk.clone(),
                transform: Transform::from_xyz(x, 2.5, z),
                ..default()
            });
            parent.spawn(PbrBundle {
                mesh: meshes.add(Sphere::new(2.5)),
                material: leaves.clone(),
                transform: Transform::from_xyz(x, 6.0, z),
                ..default()
            });
        }

        // Background hills
        for i in 0..5 {
            let i = i as f32;
            parent.spawn(PbrBundle {
                mesh: meshes.add(Sphere::new(1.0)),
                material: grass.clone(),
                transform: Transform::from_xyz(-60.0 + i * 30.0, -5.0, -80.0 - i * 10.0)
                    .with_scale(Vec3::new(20.0 + i * 3.0, 10.0 + i * 2.0, 20.0 + i * 3.0)),
                ..default()
            });
        }

        // Course paintings, in the order the zones are declared
        for (label, course, position, (r, g, b), yaw) in PAINTINGS {
            let entity = parent
                .spawn((
                    PbrBundle {
                        mesh: meshes.add(Cuboid::new(
                            PAINTING_SIZE.x,
                            PAINTING_SIZE.y,
                            PAINTING_SIZE.z,
                        )),
                        material: materials.add(Color::srgb_u8(r, g, b)),
                        transform: Transform::from_translation(position)
                            .with_rotation(Quat::from_rotation_y(yaw)),
                        ..default()
                    },
                    PaintingRipple::default(),
                ))
                .id();
            built.push(Zone {
                label,
                course,
                position,
                radius: tuning.painting_radius,
                painting: Some(entity),
            });
        }

        // Coins scattered on the grounds
        let gold = materials.add(Color::srgb_u8(255, 215, 0));
        for position in HUB_COINS {
            parent.spawn((
                PbrBundle {
                    mesh: meshes.add(Cylinder::new(0.4, 0.1)),
                    material: gold.clone(),
                    transform: Transform::from_translation(position)
                        .with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
                    ..default()
                },
                Collectible {
                    kind: CollectibleKind::Coin,
                    collected: false,
                },
                Owner(Area::Hub),
                Spin,
            ));
        }
    });

    zones.0 = built;
    info!(zones = zones.0.len(), "castle grounds ready");
}

/// Builds one course subtree and returns its root and exit trigger. Called
/// lazily on first entry; the result is cached for the whole session.
pub fn spawn_course(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    rng: &mut StdRng,
    tuning: &Tuning,
    id: CourseId,
) -> CourseEntry {
    let ground_color = match id {
        CourseId::BobOmb => Color::srgb_u8(96, 160, 60),
        CourseId::Whomps => Color::srgb_u8(150, 150, 150),
        CourseId::CoolCool => Color::srgb_u8(235, 245, 255),
        CourseId::JollyRoger => Color::srgba(0.0, 0.39, 0.78, 0.6),
        CourseId::Bowser => Color::srgb_u8(40, 40, 50),
    };

    let root = commands.spawn(SpatialBundle::default()).id();

    commands.entity(root).with_children(|parent| {
        parent.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::new(60.0, 1.0, 60.0)),
            material: materials.add(ground_color),
            transform: Transform::from_xyz(0.0, -0.5, 0.0),
            ..default()
        });

        match id {
            CourseId::BobOmb => {
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cone {
                        radius: 7.5,
                        height: 20.0,
                    }),
                    material: materials.add(Color::srgb_u8(139, 90, 43)),
                    transform: Transform::from_xyz(0.0, 10.0, 0.0),
                    ..default()
                });
                let black = materials.add(Color::srgb_u8(20, 20, 20));
                for (x, z) in [(15.0, 15.0), (-15.0, 15.0), (15.0, -15.0), (-15.0, -15.0)] {
                    parent.spawn(PbrBundle {
                        mesh: meshes.add(Cylinder::new(1.0, 3.0)),
                        material: black.clone(),
                        transform: Transform::from_xyz(x, 1.5, z),
                        ..default()
                    });
                }
                for _ in 0..5 {
                    parent.spawn(PbrBundle {
                        mesh: meshes.add(Sphere::new(0.5)),
                        material: black.clone(),
                        transform: Transform::from_xyz(
                            rng.gen_range(-20.0..20.0),
                            0.5,
                            rng.gen_range(-20.0..20.0),
                        ),
                        ..default()
                    });
                }
            }
            CourseId::Whomps => {
                let gray = materials.add(Color::srgb_u8(120, 120, 130));
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cuboid::new(20.0, 15.0, 20.0)),
                    material: gray.clone(),
                    transform: Transform::from_xyz(0.0, 7.5, 0.0),
                    ..default()
                });
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cylinder::new(2.5, 25.0)),
                    material: gray,
                    transform: Transform::from_xyz(0.0, 12.5, -15.0),
                    ..default()
                });
            }
            CourseId::CoolCool => {
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cone {
                        radius: 10.0,
                        height: 30.0,
                    }),
                    material: materials.add(Color::WHITE),
                    transform: Transform::from_xyz(0.0, 15.0, 0.0),
                    ..default()
                });
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cuboid::new(5.0, 4.0, 5.0)),
                    material: materials.add(Color::srgb_u8(101, 67, 33)),
                    transform: Transform::from_xyz(0.0, 25.0, 0.0),
                    ..default()
                });
            }
            CourseId::JollyRoger => {
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cuboid::new(10.0, 5.0, 20.0)),
                    material: materials.add(Color::srgb_u8(110, 70, 35)),
                    transform: Transform::from_xyz(0.0, 2.0, 0.0)
                        .with_rotation(Quat::from_rotation_z(PI / 12.0)),
                    ..default()
                });
            }
            CourseId::Bowser => {
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Cylinder::new(7.5, 0.5)),
                    material: materials.add(Color::srgb_u8(90, 90, 100)),
                    transform: Transform::from_xyz(0.0, 0.25, 0.0),
                    ..default()
                });
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Sphere::new(1.0)),
                    material: materials.add(Color::srgb_u8(200, 150, 0)),
                    transform: Transform::from_xyz(0.0, 2.0, -8.0)
                        .with_scale(Vec3::new(1.5, 2.0, 1.5)),
                    ..default()
                });
                parent.spawn(PbrBundle {
                    mesh: meshes.add(Sphere::new(1.2)),
                    material: materials.add(Color::srgb_u8(30, 140, 30)),
                    transform: Transform::from_xyz(0.0, 2.2, -9.0),
                    ..default()
                });
            }
        }

        // Floating platforms
        let platform = materials.add(Color::srgb_u8(160, 110, 60));
        for _ in 0..5 {
            parent.spawn(PbrBundle {
                mesh: meshes.add(Cuboid::new(5.0, 1.0, 5.0)),
                material: platform.clone(),
                transform: Transform::from_xyz(
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(1.0..8.0),
                    rng.gen_range(-20.0..20.0),
                ),
                ..default()
            });
        }

        // Stars; emissive so they read through the bloom pass
        let star_mat = materials.add(StandardMaterial {
            base_color: Color::srgb_u8(255, 219, 88),
            emissive: LinearRgba::rgb(3.0, 2.6, 1.0),
            ..default()
        });
        for _ in 0..3 {
            let position = Vec3::new(
                rng.gen_range(-20.0..20.0),
                rng.gen_range(2.0..10.0),
                rng.gen_range(-20.0..20.0),
            );
            parent.spawn((
                PbrBundle {
                    mesh: meshes.add(Sphere::new(0.5)),
                    material: star_mat.clone(),
                    transform: Transform::from_translation(position),
                    ..default()
                },
                Collectible {
                    kind: CollectibleKind::Star,
                    collected: false,
                },
                Owner(Area::Course(id)),
                StarSpin {
                    base_y: position.y,
                    phase: rng.gen_range(0.0..TAU),
                },
            ));
        }

        // Exit portal back to the castle
        parent.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::new(2.0, 3.0, 0.5)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgba(1.0, 1.0, 0.2, 0.5),
                alpha_mode: AlphaMode::Blend,
                ..default()
            }),
            transform: Transform::from_xyz(0.0, 1.5, 25.0),
            ..default()
        });
    });

    info!(course = id.title(), "course built");
    CourseEntry {
        root,
        exit: ZonePoint {
            position: Vec3::new(0.0, 1.5, 25.0),
            radius: tuning.exit_radius,
        },
    }
}

fn spin_collectibles(
    time: Res<Time>,
    mut coins: Query<&mut Transform, (With<Spin>, Without<StarSpin>)>,
    mut stars: Query<(&mut Transform, &StarSpin)>,
) {
    let dt = time.delta_seconds();
    let t = time.elapsed_seconds();
    for mut transform in &mut coins {
        transform.rotate_y(2.0 * dt);
    }
    for (mut transform, spin) in &mut stars {
        transform.rotate_y(1.8 * dt);
        transform.translation.y = spin.base_y + (t * 2.0 + spin.phase).sin() * 0.25;
    }
}

fn ripple_paintings(time: Res<Time>, mut paintings: Query<(&mut Transform, &mut PaintingRipple)>) {
    let dt = time.delta_seconds();
    for (mut transform, mut ripple) in &mut paintings {
        if !ripple.active {
            continue;
        }
        ripple.t += dt * 5.0;
        if ripple.t >= TAU {
            ripple.active = false;
            transform.scale = Vec3::ONE;
            continue;
        }
        let pulse = (ripple.t * 3.0).sin() * 0.06 * (1.0 - ripple.t / TAU);
        transform.scale = Vec3::new(1.0 + pulse, 1.0 - pulse, 1.0);
    }
}

fn menu_head_look(
    windows: Query<&Window>,
    mut heads: Query<&mut Transform, With<MenuHead>>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let nx = cursor.x / window.width() - 0.5;
    let ny = cursor.y / window.height() - 0.5;
    for mut transform in &mut heads {
        transform.rotation = Quat::from_euler(EulerRot::YXZ, nx * 1.0, ny * 0.5, 0.0);
    }
}
