//! Movement and collision math shared by the authoritative server and the
//! client-side predictor.
//!
//! The predictor must integrate input exactly the way the server does or the
//! two drift apart even without latency, so both call into this module rather
//! than keeping private copies of the formulas.

use crate::{GAME_HEIGHT, GAME_WIDTH, PLAYER_RADIUS};

/// Advances a position by one step of input-driven movement.
///
/// The input vector is normalized to unit length so diagonal movement is not
/// faster than axis-aligned movement, then scaled by `speed * dt` and clamped
/// to the world bounds inset by the player radius. A zero input vector leaves
/// the position unchanged.
pub fn step_position(x: f32, y: f32, dx: i8, dy: i8, speed: f32, dt: f32) -> (f32, f32) {
    if dx == 0 && dy == 0 {
        return (x, y);
    }

    let (dx, dy) = (dx as f32, dy as f32);
    let magnitude = (dx * dx + dy * dy).sqrt();

    let new_x = x + dx / magnitude * speed * dt;
    let new_y = y + dy / magnitude * speed * dt;

    (
        new_x.clamp(PLAYER_RADIUS, GAME_WIDTH - PLAYER_RADIUS),
        new_y.clamp(PLAYER_RADIUS, GAME_HEIGHT - PLAYER_RADIUS),
    )
}

/// Circle-circle overlap test used for coin pickups.
pub fn circles_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt() < r1 + r2
}

/// Euclidean distance between two points.
pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}
