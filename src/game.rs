//! Mode controller: menu/hub/level state machine, proximity triggers,
//! course caching, collectibles, and the deferred one-shot action queue.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::world::{self, HubRoot, PaintingRipple, WorldRng};
use crate::player::Player;
use crate::MainCamera;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Menu,
    Hub,
    Level,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CourseId {
    BobOmb,
    Whomps,
    CoolCool,
    JollyRoger,
    Bowser,
}

impl CourseId {
    pub const ALL: [CourseId; 5] = [
        CourseId::BobOmb,
        CourseId::Whomps,
        CourseId::CoolCool,
        CourseId::JollyRoger,
        CourseId::Bowser,
    ];

    pub fn title(self) -> &'static str {
        match self {
            CourseId::BobOmb => "Bob-omb Battlefield",
            CourseId::Whomps => "Whomp's Fortress",
            CourseId::CoolCool => "Cool Cool Mountain",
            CourseId::JollyRoger => "Jolly Roger Bay",
            CourseId::Bowser => "Bowser's Dark World",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuItem {
    StartGame,
    Continue,
    Exit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [MenuItem::StartGame, MenuItem::Continue, MenuItem::Exit];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::StartGame => "START GAME",
            MenuItem::Continue => "CONTINUE",
            MenuItem::Exit => "EXIT",
        }
    }
}

#[derive(Resource, Default)]
pub struct MenuSelection(pub usize);

/// Stars/coins/lives. Lives are display-only; nothing in the castle kills you.
#[derive(Resource)]
pub struct ScoreState {
    pub stars: u32,
    pub coins: u32,
    pub lives: u32,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            stars: 0,
            coins: 0,
            lives: 4,
        }
    }
}

/// Which course is active. `Some` exactly while the mode is `Level`.
#[derive(Resource, Default)]
pub struct CurrentCourse(pub Option<CourseId>);

/// Gameplay constants. The source material disagrees with itself on most of
/// these, so they live in one place instead of being scattered as literals.
#[derive(Resource, Clone)]
pub struct Tuning {
    pub painting_radius: f32,
    pub exit_radius: f32,
    pub collect_radius: f32,
    pub enter_delay: f32,
    pub banner_secs: f32,
    pub move_speed: f32,
    pub run_speed: f32,
    pub jump_height: f32,
    pub boosted_jump_height: f32,
    pub long_jump_height: f32,
    pub streak_window: f32,
    pub gravity: f32,
    pub pound_speed: f32,
    pub hub_spawn: Vec3,
    pub course_spawn: Vec3,
    pub show_help: bool,
    pub show_diagnostics: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            painting_radius: 3.0,
            exit_radius: 2.0,
            collect_radius: 2.0,
            enter_delay: 0.5,
            banner_secs: 3.0,
            move_speed: 8.0,
            run_speed: 12.0,
            jump_height: 2.0,
            boosted_jump_height: 4.0,
            long_jump_height: 5.0,
            streak_window: 0.5,
            gravity: 20.0,
            pound_speed: 20.0,
            hub_spawn: Vec3::new(0.0, 1.0, 0.0),
            course_spawn: Vec3::new(0.0, 2.0, 0.0),
            show_help: false,
            show_diagnostics: false,
        }
    }
}

/// A painting in the hub that leads into a course.
#[derive(Clone)]
pub struct Zone {
    pub label: &'static str,
    pub course: CourseId,
    pub position: Vec3,
    pub radius: f32,
    pub painting: Option<Entity>,
}

/// A bare trigger point (course exit portals).
#[derive(Clone, Copy)]
pub struct ZonePoint {
    pub position: Vec3,
    pub radius: f32,
}

/// Hub paintings in declaration order. Kept in a Vec rather than queried so
/// the first-match-wins tie-break is stable.
#[derive(Resource, Default)]
pub struct HubZones(pub Vec<Zone>);

pub fn first_zone_in_range(zones: &[Zone], position: Vec3) -> Option<&Zone> {
    zones
        .iter()
        .find(|z| position.distance(z.position) < z.radius)
}

#[derive(Clone, Copy)]
pub struct CourseEntry {
    pub root: Entity,
    pub exit: ZonePoint,
}

/// Lazily built courses, cached for the whole session. Nothing is ever
/// despawned; a left course is only hidden and reused on re-entry.
#[derive(Resource, Default)]
pub struct CourseRegistry {
    pub entries: HashMap<CourseId, CourseEntry>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Hub,
    Course(CourseId),
}

#[derive(Component)]
pub struct Owner(pub Area);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollectibleKind {
    Star,
    Coin,
}

#[derive(Component)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub collected: bool,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DeferredAction {
    EnterCourse(CourseId),
    HideBanner,
}

impl DeferredAction {
    fn same_tag(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (DeferredAction::EnterCourse(_), DeferredAction::EnterCourse(_))
                | (DeferredAction::HideBanner, DeferredAction::HideBanner)
        )
    }
}

/// One-shot actions keyed by (deadline, tag), drained once per tick.
#[derive(Resource, Default)]
pub struct DeferredQueue(pub Vec<(f32, DeferredAction)>);

impl DeferredQueue {
    /// Re-scheduling a pending tag moves its deadline instead of duplicating it.
    pub fn schedule(&mut self, deadline: f32, action: DeferredAction) {
        self.0.retain(|(_, a)| !a.same_tag(&action));
        self.0.push((deadline, action));
    }

    pub fn drop_course_entries(&mut self) {
        self.0
            .retain(|(_, a)| !matches!(a, DeferredAction::EnterCourse(_)));
    }
}

#[derive(Event, Clone, Copy)]
pub struct EnterCourse(pub CourseId);

#[derive(Event, Default)]
pub struct ExitCourse;

#[derive(Event, Clone, Copy)]
pub struct ShowBanner(pub &'static str);

#[derive(Event, Default, Clone, Copy)]
pub struct HideBanner;

// UI anchors toggled by the mode controller; spawned by the ui module.
#[derive(Component)]
pub struct Hud;

#[derive(Component)]
pub struct MenuRoot;

#[derive(Component)]
pub struct Banner;

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<Mode>()
            .init_resource::<ScoreState>()
            .init_resource::<Tuning>()
            .init_resource::<CurrentCourse>()
            .init_resource::<CourseRegistry>()
            .init_resource::<HubZones>()
            .init_resource::<DeferredQueue>()
            .init_resource::<MenuSelection>()
            .add_event::<EnterCourse>()
            .add_event::<ExitCourse>()
            .add_event::<ShowBanner>()
            .add_event::<HideBanner>()
            .add_systems(
                Update,
                (
                    hub_interact.run_if(in_state(Mode::Hub)),
                    level_exit_interact.run_if(in_state(Mode::Level)),
                    cancel_to_menu
                        .run_if(in_state(Mode::Hub).or_else(in_state(Mode::Level))),
                    drain_deferred,
                    apply_enter_course,
                    apply_exit_course,
                    collect_pickups
                        .run_if(in_state(Mode::Hub).or_else(in_state(Mode::Level))),
                    show_banner_text,
                    hide_banner_text,
                )
                    .chain(),
            )
            .add_systems(OnEnter(Mode::Menu), enter_menu)
            .add_systems(OnExit(Mode::Menu), leave_menu)
            .add_systems(OnEnter(Mode::Hub), enter_hub);
    }
}

// Interact near a painting queues the course entry behind the ripple delay.
// Out of range it is a no-op; overlapping zones resolve first-declared-wins.
fn hub_interact(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    tuning: Res<Tuning>,
    zones: Res<HubZones>,
    mut queue: ResMut<DeferredQueue>,
    player_q: Query<&Transform, With<Player>>,
    mut paintings: Query<&mut PaintingRipple>,
) {
    if !keys.just_pressed(KeyCode::KeyE) {
        return;
    }
    let Ok(player) = player_q.get_single() else {
        return;
    };
    let Some(zone) = first_zone_in_range(&zones.0, player.translation) else {
        return;
    };
    if let Some(entity) = zone.painting {
        if let Ok(mut ripple) = paintings.get_mut(entity) {
            ripple.start();
        }
    }
    queue.schedule(
        time.elapsed_seconds() + tuning.enter_delay,
        DeferredAction::EnterCourse(zone.course),
    );
    info!(course = zone.label, "painting touched");
}

fn level_exit_interact(
    keys: Res<ButtonInput<KeyCode>>,
    current: Res<CurrentCourse>,
    registry: Res<CourseRegistry>,
    player_q: Query<&Transform, With<Player>>,
    mut exits: EventWriter<ExitCourse>,
) {
    if !keys.just_pressed(KeyCode::KeyE) {
        return;
    }
    let Some(id) = current.0 else {
        return;
    };
    let Some(entry) = registry.entries.get(&id) else {
        return;
    };
    let Ok(player) = player_q.get_single() else {
        return;
    };
    if player.translation.distance(entry.exit.position) < entry.exit.radius {
        exits.send(ExitCourse);
    }
}

// Escape backs all the way out. Leaving a level applies the level->hub side
// effects first (course hidden but retained, player back at the hub spawn),
// then the menu takes over.
fn cancel_to_menu(
    keys: Res<ButtonInput<KeyCode>>,
    tuning: Res<Tuning>,
    registry: Res<CourseRegistry>,
    mut current: ResMut<CurrentCourse>,
    mut queue: ResMut<DeferredQueue>,
    mut next_state: ResMut<NextState<Mode>>,
    mut vis_q: Query<&mut Visibility>,
    mut player_q: Query<&mut Transform, With<Player>>,
) {
    if !keys.just_pressed(KeyCode::Escape) {
        return;
    }
    if let Some(id) = current.0.take() {
        if let Some(entry) = registry.entries.get(&id) {
            if let Ok(mut vis) = vis_q.get_mut(entry.root) {
                *vis = Visibility::Hidden;
            }
        }
        if let Ok(mut transform) = player_q.get_single_mut() {
            transform.translation = tuning.hub_spawn;
        }
    }
    queue.drop_course_entries();
    next_state.set(Mode::Menu);
    info!("returned to menu");
}

fn drain_deferred(
    time: Res<Time>,
    state: Res<State<Mode>>,
    mut queue: ResMut<DeferredQueue>,
    mut enters: EventWriter<EnterCourse>,
    mut hides: EventWriter<HideBanner>,
) {
    let now = time.elapsed_seconds();
    let mut due = Vec::new();
    queue.0.retain(|&(deadline, action)| {
        if deadline <= now {
            due.push(action);
            false
        } else {
            true
        }
    });
    for action in due {
        match action {
            // A queued entry is stale once the player has left the hub.
            DeferredAction::EnterCourse(id) => {
                if *state.get() == Mode::Hub {
                    enters.send(EnterCourse(id));
                }
            }
            DeferredAction::HideBanner => {
                hides.send(HideBanner);
            }
        }
    }
}

fn apply_enter_course(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut rng: ResMut<WorldRng>,
    mut events: EventReader<EnterCourse>,
    mut registry: ResMut<CourseRegistry>,
    mut current: ResMut<CurrentCourse>,
    mut next_state: ResMut<NextState<Mode>>,
    mut banners: EventWriter<ShowBanner>,
    mut queue: ResMut<DeferredQueue>,
    time: Res<Time>,
    tuning: Res<Tuning>,
    mut vis_q: Query<&mut Visibility>,
    hub_q: Query<Entity, With<HubRoot>>,
    mut player_q: Query<&mut Transform, With<Player>>,
) {
    let Some(&EnterCourse(id)) = events.read().next() else {
        return;
    };
    events.clear();

    if let Ok(hub) = hub_q.get_single() {
        if let Ok(mut vis) = vis_q.get_mut(hub) {
            *vis = Visibility::Hidden;
        }
    }

    // Reuse the cached course if the player has been here before; a fresh
    // spawn comes up visible on its own.
    if let Some(entry) = registry.entries.get(&id) {
        if let Ok(mut vis) = vis_q.get_mut(entry.root) {
            *vis = Visibility::Visible;
        }
    } else {
        let entry = world::spawn_course(
            &mut commands,
            &mut meshes,
            &mut materials,
            &mut rng.0,
            &tuning,
            id,
        );
        registry.entries.insert(id, entry);
    }

    if let Ok(mut transform) = player_q.get_single_mut() {
        transform.translation = tuning.course_spawn;
    }
    current.0 = Some(id);
    next_state.set(Mode::Level);
    banners.send(ShowBanner(id.title()));
    queue.schedule(
        time.elapsed_seconds() + tuning.banner_secs,
        DeferredAction::HideBanner,
    );
    info!(course = id.title(), "entered course");
}

fn apply_exit_course(
    mut events: EventReader<ExitCourse>,
    registry: Res<CourseRegistry>,
    mut current: ResMut<CurrentCourse>,
    mut next_state: ResMut<NextState<Mode>>,
    mut vis_q: Query<&mut Visibility>,
) {
    if events.read().next().is_none() {
        return;
    }
    events.clear();
    if let Some(id) = current.0.take() {
        if let Some(entry) = registry.entries.get(&id) {
            if let Ok(mut vis) = vis_q.get_mut(entry.root) {
                *vis = Visibility::Hidden;
            }
        }
        info!(course = id.title(), "returned to castle");
    }
    next_state.set(Mode::Hub);
}

fn collect_pickups(
    state: Res<State<Mode>>,
    current: Res<CurrentCourse>,
    tuning: Res<Tuning>,
    mut score: ResMut<ScoreState>,
    player_q: Query<&Transform, With<Player>>,
    mut items: Query<(&mut Collectible, &Owner, &Transform, &mut Visibility)>,
) {
    let area = match state.get() {
        Mode::Hub => Area::Hub,
        Mode::Level => match current.0 {
            Some(id) => Area::Course(id),
            None => return,
        },
        Mode::Menu => return,
    };
    let Ok(player) = player_q.get_single() else {
        return;
    };
    for (mut item, owner, transform, mut vis) in &mut items {
        if item.collected || owner.0 != area {
            continue;
        }
        if transform.translation.distance(player.translation) < tuning.collect_radius {
            item.collected = true;
            *vis = Visibility::Hidden;
            match item.kind {
                CollectibleKind::Star => {
                    score.stars += 1;
                    info!(stars = score.stars, "star collected");
                }
                CollectibleKind::Coin => {
                    score.coins += 1;
                }
            }
        }
    }
}

fn show_banner_text(
    mut events: EventReader<ShowBanner>,
    mut banner_q: Query<(&mut Text, &mut Visibility), With<Banner>>,
) {
    let Some(&ShowBanner(title)) = events.read().last() else {
        return;
    };
    for (mut text, mut vis) in &mut banner_q {
        if let Some(section) = text.sections.first_mut() {
            section.value = title.to_string();
        }
        *vis = Visibility::Visible;
    }
}

fn hide_banner_text(
    mut events: EventReader<HideBanner>,
    mut banner_q: Query<&mut Visibility, With<Banner>>,
) {
    if events.read().next().is_none() {
        return;
    }
    events.clear();
    for mut vis in &mut banner_q {
        *vis = Visibility::Hidden;
    }
}

// HUD and player control both follow the mode: on while anywhere but the menu.
fn enter_menu(
    mut vis_q: Query<&mut Visibility>,
    menu_q: Query<Entity, Or<(With<MenuRoot>, With<world::MenuHead>)>>,
    hud_q: Query<Entity, With<Hud>>,
    hub_q: Query<Entity, With<HubRoot>>,
    player_q: Query<Entity, With<Player>>,
    mut cam_q: Query<&mut Transform, With<MainCamera>>,
) {
    for entity in &menu_q {
        if let Ok(mut vis) = vis_q.get_mut(entity) {
            *vis = Visibility::Visible;
        }
    }
    for entity in hud_q.iter().chain(hub_q.iter()).chain(player_q.iter()) {
        if let Ok(mut vis) = vis_q.get_mut(entity) {
            *vis = Visibility::Hidden;
        }
    }
    if let Ok(mut cam) = cam_q.get_single_mut() {
        *cam = world::menu_camera();
    }
}

fn leave_menu(
    mut vis_q: Query<&mut Visibility>,
    menu_q: Query<Entity, Or<(With<MenuRoot>, With<world::MenuHead>)>>,
    hud_q: Query<Entity, With<Hud>>,
    player_q: Query<Entity, With<Player>>,
) {
    for entity in &menu_q {
        if let Ok(mut vis) = vis_q.get_mut(entity) {
            *vis = Visibility::Hidden;
        }
    }
    for entity in hud_q.iter().chain(player_q.iter()) {
        if let Ok(mut vis) = vis_q.get_mut(entity) {
            *vis = Visibility::Visible;
        }
    }
}

fn enter_hub(
    tuning: Res<Tuning>,
    mut vis_q: Query<&mut Visibility>,
    hub_q: Query<Entity, With<HubRoot>>,
    mut player_q: Query<&mut Transform, With<Player>>,
) {
    if let Ok(hub) = hub_q.get_single() {
        if let Ok(mut vis) = vis_q.get_mut(hub) {
            *vis = Visibility::Visible;
        }
    }
    if let Ok(mut transform) = player_q.get_single_mut() {
        transform.translation = tuning.hub_spawn;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputPlugin;
    use crate::player::PlayerPlugin;
    use crate::world::WorldPlugin;
    use bevy::app::AppExit;
    use bevy::state::app::StatesPlugin;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .init_resource::<Time>()
            .init_resource::<ButtonInput<KeyCode>>()
            .insert_resource(Assets::<Mesh>::default())
            .insert_resource(Assets::<StandardMaterial>::default())
            .insert_resource(WorldRng(StdRng::seed_from_u64(64)))
            .add_plugins((GamePlugin, WorldPlugin, PlayerPlugin, InputPlugin));
        // Stand-ins for what the ui module spawns (it needs a window).
        app.world_mut().spawn((
            SpatialBundle {
                visibility: Visibility::Hidden,
                ..default()
            },
            Hud,
        ));
        app.world_mut().spawn((SpatialBundle::default(), MenuRoot));
        app.world_mut().spawn((
            TextBundle::from_section("", TextStyle::default()),
            Banner,
        ));
        app.update();
        app
    }

    // Moves the clock without producing a frame delta, so positions set by
    // hand stay put while deadlines elapse.
    fn advance(app: &mut App, secs: f32) {
        let mut time = app.world_mut().resource_mut::<Time>();
        time.advance_by(Duration::from_secs_f32(secs));
        time.advance_by(Duration::ZERO);
        app.update();
    }

    fn tap(app: &mut App, key: KeyCode) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::ZERO);
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(key);
        app.update();
        let mut input = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        input.release(key);
        input.clear();
    }

    fn mode(app: &App) -> Mode {
        *app.world().resource::<State<Mode>>().get()
    }

    fn single<F: bevy::ecs::query::QueryFilter>(app: &mut App) -> Entity {
        let mut query = app.world_mut().query_filtered::<Entity, F>();
        query.single(app.world())
    }

    fn visibility(app: &App, entity: Entity) -> Visibility {
        *app.world().get::<Visibility>(entity).unwrap()
    }

    fn place_player(app: &mut App, position: Vec3) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::ZERO);
        let mut query = app.world_mut().query_filtered::<&mut Transform, With<Player>>();
        query.single_mut(app.world_mut()).translation = position;
    }

    fn start_game(app: &mut App) {
        tap(app, KeyCode::Enter);
        app.update();
        assert_eq!(mode(app), Mode::Hub);
    }

    fn enter_bob_omb(app: &mut App) {
        // Zone at (-10, 3, -19.5), radius 3: this spot is 2.5 away.
        place_player(app, Vec3::new(-10.0, 3.0, -17.0));
        tap(app, KeyCode::KeyE);
        advance(app, 0.6);
        app.update();
        assert_eq!(mode(app), Mode::Level);
    }

    #[test]
    fn first_match_wins_over_declaration_order() {
        let zones = vec![
            Zone {
                label: "a",
                course: CourseId::BobOmb,
                position: Vec3::ZERO,
                radius: 3.0,
                painting: None,
            },
            Zone {
                label: "b",
                course: CourseId::Whomps,
                position: Vec3::ZERO,
                radius: 3.0,
                painting: None,
            },
        ];
        let hit = first_zone_in_range(&zones, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(hit.course, CourseId::BobOmb);
        assert!(first_zone_in_range(&zones, Vec3::new(9.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn rescheduling_a_pending_tag_replaces_it() {
        let mut queue = DeferredQueue::default();
        queue.schedule(1.0, DeferredAction::EnterCourse(CourseId::BobOmb));
        queue.schedule(2.0, DeferredAction::EnterCourse(CourseId::Whomps));
        queue.schedule(3.0, DeferredAction::HideBanner);
        assert_eq!(queue.0.len(), 2);
        assert_eq!(
            queue.0[0],
            (2.0, DeferredAction::EnterCourse(CourseId::Whomps))
        );
        queue.drop_course_entries();
        assert_eq!(queue.0.len(), 1);
    }

    #[test]
    fn hub_zones_follow_declaration_order() {
        let mut app = test_app();
        let zones = app.world().resource::<HubZones>();
        let order: Vec<CourseId> = zones.0.iter().map(|z| z.course).collect();
        assert_eq!(order, CourseId::ALL.to_vec());
        assert!(zones.0.iter().all(|z| z.radius == 3.0));
    }

    #[test]
    fn confirm_on_start_leaves_the_menu() {
        let mut app = test_app();
        assert_eq!(mode(&app), Mode::Menu);
        start_game(&mut app);

        let hud = single::<With<Hud>>(&mut app);
        let player = single::<With<Player>>(&mut app);
        assert_eq!(visibility(&app, hud), Visibility::Visible);
        assert_eq!(visibility(&app, player), Visibility::Visible);

        let tuning = app.world().resource::<Tuning>().clone();
        let mut query = app
            .world_mut()
            .query_filtered::<&Transform, With<Player>>();
        assert_eq!(query.single(app.world()).translation, tuning.hub_spawn);
    }

    #[test]
    fn hud_and_controls_track_the_mode() {
        let mut app = test_app();
        let hud = single::<With<Hud>>(&mut app);
        let player = single::<With<Player>>(&mut app);

        let check = |app: &App, expected: Mode| {
            assert_eq!(mode(app), expected);
            let on = expected != Mode::Menu;
            let want = if on {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
            assert_eq!(visibility(app, hud), want);
            assert_eq!(visibility(app, player), want);
        };

        check(&app, Mode::Menu);
        start_game(&mut app);
        check(&app, Mode::Hub);
        enter_bob_omb(&mut app);
        check(&app, Mode::Level);

        // Back out through the exit portal, then all the way to the menu.
        place_player(&mut app, Vec3::new(0.0, 1.5, 25.0));
        tap(&mut app, KeyCode::KeyE);
        app.update();
        check(&app, Mode::Hub);
        tap(&mut app, KeyCode::Escape);
        app.update();
        check(&app, Mode::Menu);
    }

    #[test]
    fn entering_a_course_shows_the_banner_then_hides_it() {
        let mut app = test_app();
        start_game(&mut app);
        enter_bob_omb(&mut app);

        assert_eq!(
            app.world().resource::<CurrentCourse>().0,
            Some(CourseId::BobOmb)
        );
        let tuning = app.world().resource::<Tuning>().clone();
        let mut player_q = app
            .world_mut()
            .query_filtered::<&Transform, With<Player>>();
        assert_eq!(
            player_q.single(app.world()).translation,
            tuning.course_spawn
        );

        let banner = single::<With<Banner>>(&mut app);
        assert_eq!(visibility(&app, banner), Visibility::Visible);
        assert_eq!(
            app.world().get::<Text>(banner).unwrap().sections[0].value,
            "Bob-omb Battlefield"
        );

        advance(&mut app, 3.1);
        assert_eq!(visibility(&app, banner), Visibility::Hidden);
    }

    #[test]
    fn reentering_a_course_reuses_the_cached_instance() {
        let mut app = test_app();
        start_game(&mut app);
        enter_bob_omb(&mut app);

        let first = app.world().resource::<CourseRegistry>().entries[&CourseId::BobOmb].root;

        place_player(&mut app, Vec3::new(0.0, 1.5, 25.0));
        tap(&mut app, KeyCode::KeyE);
        app.update();
        assert_eq!(mode(&app), Mode::Hub);
        assert_eq!(visibility(&app, first), Visibility::Hidden);

        enter_bob_omb(&mut app);
        let registry = app.world().resource::<CourseRegistry>();
        assert_eq!(registry.entries.len(), 1);
        assert_eq!(registry.entries[&CourseId::BobOmb].root, first);
        assert_eq!(visibility(&app, first), Visibility::Visible);
    }

    #[test]
    fn star_pickup_is_idempotent() {
        let mut app = test_app();
        start_game(&mut app);
        enter_bob_omb(&mut app);

        app.world_mut().resource_mut::<ScoreState>().stars = 2;

        // Keep one star live so the pickup delta is exact; placement is random
        // and two stars could land within pickup range of each other.
        let star_pos = {
            let mut stars = app
                .world_mut()
                .query::<(&mut Collectible, &Owner, &Transform)>();
            let mut target = None;
            for (mut item, owner, transform) in stars.iter_mut(app.world_mut()) {
                if item.kind != CollectibleKind::Star
                    || owner.0 != Area::Course(CourseId::BobOmb)
                {
                    continue;
                }
                if target.is_none() {
                    target = Some(transform.translation);
                } else {
                    item.collected = true;
                }
            }
            target.unwrap()
        };

        place_player(&mut app, star_pos);
        app.update();
        assert_eq!(app.world().resource::<ScoreState>().stars, 3);

        // Walk away and come back: the star stays collected.
        place_player(&mut app, Vec3::new(25.0, 1.0, 25.0));
        app.update();
        place_player(&mut app, star_pos);
        app.update();
        assert_eq!(app.world().resource::<ScoreState>().stars, 3);
    }

    #[test]
    fn hub_coins_count_up() {
        let mut app = test_app();
        start_game(&mut app);
        place_player(&mut app, Vec3::new(5.0, 1.0, 5.0));
        app.update();
        assert_eq!(app.world().resource::<ScoreState>().coins, 1);
    }

    #[test]
    fn overlapping_zones_trigger_the_first_declared() {
        let mut app = test_app();
        start_game(&mut app);

        let spot = Vec3::new(3.0, 1.0, 3.0);
        app.world_mut().insert_resource(HubZones(vec![
            Zone {
                label: "first",
                course: CourseId::CoolCool,
                position: spot,
                radius: 3.0,
                painting: None,
            },
            Zone {
                label: "second",
                course: CourseId::JollyRoger,
                position: spot,
                radius: 3.0,
                painting: None,
            },
        ]));

        place_player(&mut app, spot);
        tap(&mut app, KeyCode::KeyE);
        advance(&mut app, 0.6);
        app.update();
        assert_eq!(mode(&app), Mode::Level);
        assert_eq!(
            app.world().resource::<CurrentCourse>().0,
            Some(CourseId::CoolCool)
        );
    }

    #[test]
    fn interact_out_of_range_is_a_noop() {
        let mut app = test_app();
        start_game(&mut app);
        place_player(&mut app, Vec3::new(50.0, 1.0, 50.0));
        tap(&mut app, KeyCode::KeyE);
        advance(&mut app, 1.0);
        assert_eq!(mode(&app), Mode::Hub);
        assert!(app.world().resource::<CourseRegistry>().entries.is_empty());
        assert!(app.world().resource::<DeferredQueue>().0.is_empty());
    }

    #[test]
    fn cancel_from_a_level_retains_the_course() {
        let mut app = test_app();
        start_game(&mut app);
        enter_bob_omb(&mut app);
        let root = app.world().resource::<CourseRegistry>().entries[&CourseId::BobOmb].root;

        tap(&mut app, KeyCode::Escape);
        app.update();
        assert_eq!(mode(&app), Mode::Menu);
        assert_eq!(app.world().resource::<CurrentCourse>().0, None);
        assert_eq!(visibility(&app, root), Visibility::Hidden);
        // Still cached for the next visit.
        assert!(app.world().get_entity(root).is_some());
    }

    #[test]
    fn cancel_drops_a_pending_course_entry() {
        let mut app = test_app();
        start_game(&mut app);
        place_player(&mut app, Vec3::new(-10.0, 3.0, -17.0));
        tap(&mut app, KeyCode::KeyE);
        tap(&mut app, KeyCode::Escape);
        advance(&mut app, 1.0);
        app.update();
        assert_eq!(mode(&app), Mode::Menu);
        assert!(app.world().resource::<CourseRegistry>().entries.is_empty());
    }

    #[test]
    fn menu_cursor_clamps_at_both_ends() {
        let mut app = test_app();
        for _ in 0..5 {
            tap(&mut app, KeyCode::ArrowDown);
        }
        assert_eq!(
            app.world().resource::<MenuSelection>().0,
            MenuItem::ALL.len() - 1
        );
        for _ in 0..7 {
            tap(&mut app, KeyCode::ArrowUp);
        }
        assert_eq!(app.world().resource::<MenuSelection>().0, 0);
    }

    #[test]
    fn exit_item_requests_app_exit() {
        let mut app = test_app();
        tap(&mut app, KeyCode::ArrowDown);
        tap(&mut app, KeyCode::ArrowDown);
        tap(&mut app, KeyCode::Enter);
        assert!(!app.world().resource::<Events<AppExit>>().is_empty());
        assert_eq!(mode(&app), Mode::Menu);
    }

    #[test]
    fn debug_star_grant_is_unconditional() {
        let mut app = test_app();
        start_game(&mut app);
        tap(&mut app, KeyCode::F3);
        assert_eq!(app.world().resource::<ScoreState>().stars, 10);
    }
}
