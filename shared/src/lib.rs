pub mod codec;
pub mod delay;
pub mod physics;
pub mod protocol;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Game area dimensions
pub const GAME_WIDTH: f32 = 800.0;
pub const GAME_HEIGHT: f32 = 600.0;

// Player configuration
pub const PLAYER_RADIUS: f32 = 15.0;
pub const PLAYER_SPEED: f32 = 200.0;
pub const SPAWN_EDGE_MARGIN: f32 = 50.0;

// Coin configuration
pub const COIN_RADIUS: f32 = 10.0;
pub const COIN_SPAWN_INTERVAL: f32 = 3.0;
pub const COIN_SPAWN_MARGIN: f32 = 10.0;
pub const COIN_PLAYER_BUFFER: f32 = 50.0;
pub const COIN_SPAWN_ATTEMPTS: u32 = 50;
pub const MAX_COINS: usize = 5;
pub const INITIAL_COINS: usize = 3;

// Network configuration
pub const NETWORK_DELAY_MS: u64 = 200;
pub const SERVER_TICK_RATE: u32 = 60;
pub const STATE_BROADCAST_RATE: u32 = 20;
pub const INPUT_SEND_RATE: u32 = 20;

// Interpolation configuration
pub const INTERPOLATION_DELAY: f64 = 0.1;
pub const POSITION_BUFFER_SIZE: usize = 20;

// Prediction / reconciliation configuration
pub const DRIFT_TOLERANCE: f32 = 100.0;
pub const SNAP_THRESHOLD: f32 = 150.0;
pub const RECONCILIATION_FACTOR: f32 = 0.05;

// Game rules
pub const GAME_DURATION: f32 = 60.0;
pub const WINNING_SCORE: u32 = 10;

/// Seconds since the unix epoch as a float, the timestamp unit used on the
/// wire and in the delay queues.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs_f64()
}
