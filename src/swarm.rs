use bevy::app::AppExit;
use bevy::prelude::*;
use bevy::window::WindowCloseRequested;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod network; // untrained feed-forward network
pub mod sprites; // image loading with a drawn fallback
pub mod unit; // the steered units

use super::*;
use sprites::*;
use unit::*;

// The functions in this file are the bevy "systems" that make up a session:
//  startup:   seed_simulation, then spawn_camera, spawn_target, spawn_units
//  per frame: capture_clicks -> retarget -> steer_units -> place_units / place_target
//             resolve_sprites -> apply_appearance
//             forward_close_requests -> shut_down
// The simulation itself lives in screen space (origin in the top-left corner, y down),
// placement systems translate it into bevy's world space (origin in the center, y up).

/// The point every unit steers toward, in screen pixels.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub x: i32,
    pub y: i32,
}

impl Default for Target {
    fn default() -> Self {
        Target {
            x: (WIDTH / 2.0) as i32,
            y: (HEIGHT / 2.0) as i32,
        }
    }
}

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Running,
    Stopped,
}

/// Random source shared by unit placement and network construction.
#[derive(Resource)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        SimRng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        let seed: u64 = rand::thread_rng().gen();
        info!("Seeding the simulation with {seed}");
        Self::seeded(seed)
    }
}

pub fn seed_simulation(mut commands: Commands) {
    commands.insert_resource(SimRng::from_entropy());
}

/// Primary button press at a screen-space position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerPressed {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitRequested;

#[derive(Component)]
pub struct TargetMarker;

/// Cursor position as bevy reports it (origin bottom-left, y up) to screen space.
pub fn cursor_to_screen(cursor: Vec2, window_height: f32) -> PointerPressed {
    PointerPressed {
        x: cursor.x as i32,
        y: (window_height - cursor.y) as i32,
    }
}

/// Screen-space rectangle (top-left corner + size) to the world-space position of its center.
pub fn screen_to_world(x: f32, y: f32, size: Vec2) -> Vec2 {
    Vec2::new(
        x + size.x / 2.0 - WIDTH / 2.0,
        HEIGHT / 2.0 - (y + size.y / 2.0),
    )
}

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

pub fn spawn_target(mut commands: Commands, asset_server: Res<AssetServer>) {
    let image: Handle<Image> = asset_server.load(TARGET_IMAGE);
    commands.spawn((
        SpriteBundle::default(),
        SpriteSource::Loading(image),
        TARGET_FOOTPRINT,
        TargetMarker,
        Name::new("target"),
    ));
}

pub fn spawn_units(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut rng: ResMut<SimRng>,
    mut state: ResMut<SessionState>,
) {
    for order in 0..UNIT_COUNT {
        let unit = Unit::random(order, &mut rng.0);
        let image: Handle<Image> = asset_server.load(UNIT_IMAGE);
        commands.spawn((
            SpriteBundle::default(),
            SpriteSource::Loading(image),
            UNIT_FOOTPRINT,
            unit,
            Name::new(format!("unit {order}")),
        ));
    }
    info!("Spawned {UNIT_COUNT} units");
    *state = SessionState::Running;
}

// Turns left clicks into screen-space pointer events.
pub fn capture_clicks(
    buttons: Res<Input<MouseButton>>,
    windows: Res<Windows>,
    mut presses: EventWriter<PointerPressed>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    if let Some(window) = windows.get_primary() {
        if let Some(cursor) = window.cursor_position() {
            presses.send(cursor_to_screen(cursor, window.height()));
        }
    }
}

// Last press of the frame wins.
pub fn retarget(mut presses: EventReader<PointerPressed>, mut target: ResMut<Target>) {
    for press in presses.iter() {
        *target = Target {
            x: press.x,
            y: press.y,
        };
        debug!("Target moved to ({}, {})", press.x, press.y);
    }
}

pub fn steer_units(
    target: Res<Target>,
    state: Res<SessionState>,
    mut units: Query<&mut Unit>,
) {
    if *state != SessionState::Running {
        return;
    }
    let target = *target;
    let mut units: Vec<Mut<Unit>> = units.iter_mut().collect();
    units.sort_by_key(|unit| unit.order);
    for mut unit in units {
        unit.update(target);
    }
}

pub fn place_units(mut units: Query<(&Unit, &mut Transform)>) {
    for (unit, mut transform) in units.iter_mut() {
        let center = screen_to_world(
            unit.rect.x as f32,
            unit.rect.y as f32,
            Vec2::new(unit.rect.w as f32, unit.rect.h as f32),
        );
        // Units are drawn over the target, in collection order
        transform.translation = center.extend(1.0 + unit.order as f32 * 0.001);
    }
}

pub fn place_target(
    target: Res<Target>,
    mut markers: Query<(&SpriteSource, &Footprint, &mut Transform), With<TargetMarker>>,
) {
    for (source, footprint, mut transform) in markers.iter_mut() {
        let size = footprint.current_size(source);
        let center = screen_to_world(
            target.x as f32 - size.x / 2.0,
            target.y as f32 - size.y / 2.0,
            size,
        );
        transform.translation = center.extend(0.0);
    }
}

pub fn forward_close_requests(
    mut closes: EventReader<WindowCloseRequested>,
    mut quits: EventWriter<QuitRequested>,
) {
    if closes.iter().count() > 0 {
        quits.send(QuitRequested);
    }
}

// Releases the units' sprites, then the target's, then lets bevy drop the renderer and
// the window on exit.
pub fn shut_down(
    mut commands: Commands,
    mut quits: EventReader<QuitRequested>,
    mut state: ResMut<SessionState>,
    units: Query<(Entity, &Unit)>,
    markers: Query<Entity, With<TargetMarker>>,
    mut exit: EventWriter<AppExit>,
) {
    let requested = quits.iter().count() > 0;
    if !requested || *state == SessionState::Stopped {
        return;
    }
    *state = SessionState::Stopped;

    let mut doomed: Vec<(Entity, usize)> = units.iter().map(|(e, unit)| (e, unit.order)).collect();
    doomed.sort_by_key(|&(_, order)| order);
    info!("Shutting down, releasing {} units", doomed.len());
    for (entity, _) in doomed {
        commands.entity(entity).despawn();
    }
    for marker in markers.iter() {
        commands.entity(marker).despawn();
    }
    info!("Teardown complete, released the units and the target");
    exit.send(AppExit);
}

// Fixed delay after each frame, caps the loop near 60 frames per second.
pub fn pace_frame() {
    std::thread::sleep(FRAME_DELAY);
}

/// The per-frame simulation: retarget, step every unit once, place the sprites.
/// Runs on one thread in its own stage after `CoreStage::Update`.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_stage_after(CoreStage::Update, SIMULATION, SystemStage::single_threaded())
            .add_system_to_stage(SIMULATION, retarget)
            .add_system_to_stage(SIMULATION, steer_units.after(retarget))
            .add_system_to_stage(SIMULATION, place_units.after(steer_units))
            .add_system_to_stage(SIMULATION, place_target.after(retarget));
    }
}

// Press X to print every unit's network as JSON.
pub fn output_network_state(keys: Res<Input<KeyCode>>, units: Query<&Unit>) {
    if !keys.just_pressed(DUMP_KEY) {
        return;
    }
    let mut units: Vec<&Unit> = units.iter().collect();
    units.sort_by_key(|unit| unit.order);
    for unit in units {
        match serde_json::to_string(unit.brain()) {
            Ok(json) => info!("unit {}: {}", unit.order, json),
            Err(err) => warn!("Could not serialize the network of unit {}: {err}", unit.order),
        }
    }
}
