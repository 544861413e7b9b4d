mod swarm;
use swarm::*;
use swarm::sprites::*;
use bevy::prelude::*;
use std::time::Duration;

// Window / playfield size in pixels
pub const WIDTH: f32 = 800.0;
pub const HEIGHT: f32 = 600.0;
pub const TITLE: &str = "Neural Net Wars";

// Units and their networks
pub const UNIT_COUNT: usize = 5;
pub const UNIT_TOPOLOGY: [usize; 3] = [4, 6, 2];
pub const UNIT_SIZE: Vec2 = Vec2::new(40.0, 40.0);
pub const UNIT_START_SPEED: f32 = 2.0;
// Network inputs are divided by these, outputs are multiplied back
pub const DISTANCE_SCALE: f32 = 800.0;
pub const SPEED_SCALE: f32 = 5.0;

// Target marker
pub const TARGET_SIZE: Vec2 = Vec2::new(40.0, 40.0);
pub const TARGET_MARKER_SIZE: Vec2 = Vec2::new(10.0, 10.0);

// Colors
pub const BACKGROUND_COLOR: Color = Color::BLACK;
pub const FALLBACK_UNIT_COLOR: Color = Color::GREEN;
pub const FALLBACK_TARGET_COLOR: Color = Color::RED;

pub const UNIT_FOOTPRINT: Footprint = Footprint {
    textured: UNIT_SIZE,
    fallback: UNIT_SIZE,
    fallback_color: FALLBACK_UNIT_COLOR,
};
pub const TARGET_FOOTPRINT: Footprint = Footprint {
    textured: TARGET_SIZE,
    fallback: TARGET_MARKER_SIZE,
    fallback_color: FALLBACK_TARGET_COLOR,
};

// Images, relative to the assets/ folder
pub const UNIT_IMAGE: &str = "cat_unit.bmp";
pub const TARGET_IMAGE: &str = "cat_target.bmp";

// Sleep after every frame (~60 frames per second)
pub const FRAME_DELAY: Duration = Duration::from_millis(16);

// Prints every unit's network as JSON
pub const DUMP_KEY: KeyCode = KeyCode::X;

// Stage holding the simulation itself, run on one thread after CoreStage::Update
pub const SIMULATION: &str = "Simulation";

fn main() {
    App::new()
        .insert_resource(ClearColor(BACKGROUND_COLOR))
        .init_resource::<SessionState>()
        .init_resource::<Target>()
        .add_event::<PointerPressed>()
        .add_event::<QuitRequested>()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            window: WindowDescriptor {
                width: WIDTH,
                height: HEIGHT,
                title: TITLE.to_string(),
                resizable: false,
                present_mode: bevy::window::PresentMode::Fifo,
                ..default()
            },
            // Closing is handled by shut_down so the sprites go before the window
            close_when_requested: false,
            ..default()
        }))
        .add_startup_system_to_stage(StartupStage::PreStartup, seed_simulation)
        .add_startup_system(spawn_camera)
        .add_startup_system(spawn_target)
        .add_startup_system(spawn_units)
        .add_system(capture_clicks)
        .add_system(resolve_sprites)
        .add_system(apply_appearance.after(resolve_sprites))
        .add_system(output_network_state)
        .add_system(forward_close_requests.before(shut_down))
        .add_system(shut_down)
        .add_plugin(SimulationPlugin)
        .add_system_to_stage(CoreStage::Last, pace_frame)
        .run();
}

// Note:

// Clicks are turned into PointerPressed events during Update and applied to the target at
// the start of the Simulation stage, so every unit steps toward the newest target.
// Every frame steps each unit exactly once. The step is not scaled by elapsed time, so
// units appear slower when the game can't keep up with vsync plus FRAME_DELAY.
