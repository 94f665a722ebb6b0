//! Client-side prediction and reconciliation for the local player.
//!
//! The local player's movement is integrated immediately with the same
//! physics the server runs, so the game feels responsive despite the round
//! trip through both artificial delay queues. Authoritative positions arrive
//! roughly one round trip stale, which makes some divergence between the
//! prediction and the server *expected*: at 200ms each way and 200 px/s, up
//! to ~80 px of gap is explained by latency alone. Corrections are therefore
//! asymmetric — small gaps are trusted entirely, moderate gaps are nudged by
//! a fraction of only the excess beyond the tolerance, and only a large gap
//! (teleport or genuine desync) snaps the prediction outright. Fighting the
//! expected gap every frame would drag the local player toward a stale
//! position and jitter.

use shared::physics::{distance, step_position};
use shared::{DRIFT_TOLERANCE, PLAYER_SPEED, RECONCILIATION_FACTOR, SNAP_THRESHOLD};

#[derive(Debug)]
pub struct LocalPredictor {
    x: f32,
    y: f32,
    server_x: f32,
    server_y: f32,
    dx: i8,
    dy: i8,
    drift_tolerance: f32,
    snap_threshold: f32,
    correction_factor: f32,
}

impl LocalPredictor {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            server_x: 0.0,
            server_y: 0.0,
            dx: 0,
            dy: 0,
            drift_tolerance: DRIFT_TOLERANCE,
            snap_threshold: SNAP_THRESHOLD,
            correction_factor: RECONCILIATION_FACTOR,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn last_server_position(&self) -> (f32, f32) {
        (self.server_x, self.server_y)
    }

    pub fn set_input(&mut self, dx: i8, dy: i8) {
        self.dx = dx.clamp(-1, 1);
        self.dy = dy.clamp(-1, 1);
    }

    /// Integrates the current input for one frame, exactly the way the
    /// server's movement step does.
    pub fn update(&mut self, dt: f32) -> (f32, f32) {
        let (x, y) = step_position(self.x, self.y, self.dx, self.dy, PLAYER_SPEED, dt);
        self.x = x;
        self.y = y;
        (x, y)
    }

    /// Reconciles the prediction against a delayed authoritative position.
    pub fn apply_server_correction(&mut self, server_x: f32, server_y: f32) {
        self.server_x = server_x;
        self.server_y = server_y;

        let dx = server_x - self.x;
        let dy = server_y - self.y;
        let dist = distance(server_x, server_y, self.x, self.y);

        if dist > self.snap_threshold {
            // Way off the server's reality: discard the prediction.
            self.x = server_x;
            self.y = server_y;
        } else if dist > self.drift_tolerance {
            // Correct only the excess beyond what latency explains.
            let correction_strength = (dist - self.drift_tolerance) / dist;
            self.x += dx * correction_strength * self.correction_factor;
            self.y += dy * correction_strength * self.correction_factor;
        }
        // Within tolerance: trust the prediction completely.
    }

    /// Places the predicted and last-known-server positions together, so the
    /// first assignment causes no correction jump.
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.server_x = x;
        self.server_y = y;
    }
}

impl Default for LocalPredictor {
    fn default() -> Self {
        Self::new()
    }
}
