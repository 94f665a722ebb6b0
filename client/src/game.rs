//! Client-side game state: routes server messages into the predictor and
//! the remote entity interpolators, and exposes a per-frame view for
//! whatever front end drives the loop.

use crate::interpolation::{EntityManager, RemoteView};
use crate::network::ClientSession;
use crate::prediction::LocalPredictor;
use log::{info, warn};
use shared::protocol::{CoinState, GamePhase, Message, PlayerColor};
use std::collections::HashMap;

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone)]
pub struct FrameView {
    pub player_id: Option<u32>,
    pub local_position: (f32, f32),
    pub local_color: PlayerColor,
    pub local_score: u32,
    pub remote_players: HashMap<u32, RemoteView>,
    pub coins: Vec<CoinState>,
    pub game_time: f32,
    pub waiting: bool,
    pub started: bool,
    pub over: bool,
    pub winner: Option<u32>,
}

/// Client view of the match, fed by delayed server messages.
///
/// The local player is dead-reckoned by the predictor and corrected from
/// authoritative state; every other player is shown through its interpolation
/// buffer. Coins and the clock are taken verbatim from the latest snapshot.
pub struct ClientGame {
    player_id: Option<u32>,
    color: PlayerColor,
    waiting: bool,
    started: bool,
    over: bool,
    winner: Option<u32>,
    final_scores: HashMap<u32, u32>,
    predictor: LocalPredictor,
    entities: EntityManager,
    coins: Vec<CoinState>,
    game_time: f32,
    local_score: u32,
    last_input: (i8, i8),
}

impl Default for ClientGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientGame {
    pub fn new() -> Self {
        Self {
            player_id: None,
            color: PlayerColor::Gray,
            waiting: false,
            started: false,
            over: false,
            winner: None,
            final_scores: HashMap::new(),
            predictor: LocalPredictor::new(),
            entities: EntityManager::new(),
            coins: Vec::new(),
            game_time: 0.0,
            local_score: 0,
            last_input: (0, 0),
        }
    }

    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn final_scores(&self) -> &HashMap<u32, u32> {
        &self.final_scores
    }

    /// Applies one server message to the client state.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Assign {
                player_id,
                color,
                x,
                y,
            } => {
                info!("Assigned player {} at ({:.0}, {:.0})", player_id, x, y);
                self.player_id = Some(player_id);
                self.color = color;
                self.predictor.set_position(x, y);
            }
            Message::Waiting { message } => {
                info!("{}", message);
                self.waiting = true;
            }
            Message::GameStart { timestamp } => {
                info!("Game started (server time {:.2})", timestamp);
                self.waiting = false;
                self.started = true;
            }
            Message::State {
                timestamp,
                game_state,
                players,
                coins,
                game_time,
                winner,
            } => {
                if game_state == GamePhase::Playing {
                    self.waiting = false;
                    self.started = true;
                }
                self.winner = winner;
                self.game_time = game_time;
                self.coins = coins;
                for player in players {
                    if Some(player.id) == self.player_id {
                        self.predictor.apply_server_correction(player.x, player.y);
                        self.local_score = player.score;
                    } else {
                        self.entities.update_entity(
                            player.id,
                            timestamp,
                            player.x,
                            player.y,
                            player.score,
                            player.color,
                        );
                    }
                }
            }
            Message::CoinCollected {
                player_id,
                coin_id,
                new_score,
            } => {
                info!(
                    "Player {} collected coin {} (score {})",
                    player_id, coin_id, new_score
                );
                if Some(player_id) == self.player_id {
                    self.local_score = new_score;
                }
            }
            Message::PlayerDisconnected { player_id } => {
                info!("Player {} disconnected", player_id);
                self.entities.remove_entity(player_id);
            }
            Message::GameOver {
                winner,
                final_scores,
            } => {
                info!("Game over, winner: {:?}", winner);
                self.over = true;
                self.started = false;
                self.winner = winner;
                self.final_scores = final_scores;
            }
            Message::Error { message } => {
                warn!("Server error: {}", message);
            }
            Message::Input { .. } => {
                warn!("Ignoring input message sent by server");
            }
        }
    }

    /// Advances local prediction by `dt` and sends the current input,
    /// forcing an immediate send when the direction changed.
    pub fn update(&mut self, dx: i8, dy: i8, dt: f32, session: &mut ClientSession) {
        let direction_changed = (dx, dy) != self.last_input;
        self.last_input = (dx, dy);
        if self.started && !self.over {
            session.send_input(dx, dy, direction_changed);
            self.predictor.set_input(dx, dy);
            self.predictor.update(dt);
        }
    }

    /// Builds the render view for wall-clock time `now`.
    pub fn frame(&mut self, now: f64) -> FrameView {
        FrameView {
            player_id: self.player_id,
            local_position: self.predictor.position(),
            local_color: self.color,
            local_score: self.local_score,
            remote_players: self.entities.interpolated_positions(now),
            coins: self.coins.clone(),
            game_time: self.game_time,
            waiting: self.waiting,
            started: self.started,
            over: self.over,
            winner: self.winner,
        }
    }
}
