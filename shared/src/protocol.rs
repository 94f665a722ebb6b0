//! Wire protocol shared by server and client.
//!
//! Every connection message carries exactly one [`Message`]. The enum is the
//! whole protocol surface: clients only ever send `Input`, everything else
//! flows server to client. Unknown or out-of-place messages are logged and
//! dropped by whoever receives them, never treated as fatal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed palette assigned by player identity.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PlayerColor {
    Blue,
    Red,
    Gray,
}

impl PlayerColor {
    /// Color for a given player id: 1 is blue, 2 is red, anything else gray.
    pub fn for_player(id: u32) -> Self {
        match id {
            1 => PlayerColor::Blue,
            2 => PlayerColor::Red,
            _ => PlayerColor::Gray,
        }
    }
}

/// Lifecycle of a game session. Transitions only ever move forward.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Waiting,
    Playing,
    Ended,
}

/// A player as broadcast to clients. Positions are rounded to two decimals
/// before they reach the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub score: u32,
    pub color: PlayerColor,
}

/// A coin as broadcast to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CoinState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Message {
    /// Client -> server: current input direction, each axis in {-1, 0, 1}.
    Input { dx: i8, dy: i8 },

    /// Server -> client: identity assignment on successful registration.
    Assign {
        player_id: u32,
        color: PlayerColor,
        x: f32,
        y: f32,
    },
    /// Server -> client: registered but the game has not started yet.
    Waiting { message: String },
    /// Server -> client: both slots filled, simulation is running.
    GameStart { timestamp: f64 },
    /// Server -> client: periodic full snapshot of the world.
    State {
        timestamp: f64,
        game_state: GamePhase,
        players: Vec<PlayerState>,
        coins: Vec<CoinState>,
        game_time: f32,
        winner: Option<u32>,
    },
    /// Server -> client: a coin was collected this tick.
    CoinCollected {
        player_id: u32,
        coin_id: u32,
        new_score: u32,
    },
    /// Server -> client: the other player's connection went away.
    PlayerDisconnected { player_id: u32 },
    /// Server -> client: terminal result with final scores.
    GameOver {
        winner: Option<u32>,
        final_scores: HashMap<u32, u32>,
    },
    /// Server -> client: request rejected (e.g. game full).
    Error { message: String },
}

/// Rounds a coordinate to two decimals for broadcast.
pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
