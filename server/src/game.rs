//! Authoritative game simulation: players, coins, scoring, win conditions.
//!
//! This is the single source of truth. Clients only ever send input
//! directions; everything they render comes back out of [`GameState`]
//! snapshots. All time is injected through `tick` deltas so the simulation
//! never reads the wall clock and tests can drive it deterministically.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::physics::{circles_overlap, step_position};
use shared::protocol::{round2, CoinState, GamePhase, Message, PlayerColor, PlayerState};
use shared::{
    COIN_PLAYER_BUFFER, COIN_RADIUS, COIN_SPAWN_ATTEMPTS, COIN_SPAWN_INTERVAL, COIN_SPAWN_MARGIN,
    GAME_DURATION, GAME_HEIGHT, GAME_WIDTH, INITIAL_COINS, MAX_COINS, PLAYER_RADIUS, PLAYER_SPEED,
    SPAWN_EDGE_MARGIN, WINNING_SCORE,
};
use std::collections::BTreeMap;

/// A player as the simulation owns it, input vector included.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub score: u32,
    pub color: PlayerColor,
    pub dx: i8,
    pub dy: i8,
}

#[derive(Debug, Clone)]
pub struct Coin {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Events produced by one tick, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    CoinCollected {
        player_id: u32,
        coin_id: u32,
        new_score: u32,
    },
}

pub struct GameState {
    // BTreeMaps so iteration order (and therefore tie-breaking and
    // first-collector resolution) is deterministic.
    players: BTreeMap<u32, Player>,
    coins: BTreeMap<u32, Coin>,
    phase: GamePhase,
    next_coin_id: u32,
    elapsed: f32,
    spawn_timer: f32,
    winner: Option<u32>,
    rng: StdRng,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Seeded constructor for deterministic tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            players: BTreeMap::new(),
            coins: BTreeMap::new(),
            phase: GamePhase::Waiting,
            next_coin_id: 1,
            elapsed: 0.0,
            spawn_timer: 0.0,
            winner: None,
            rng,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn winner(&self) -> Option<u32> {
        self.winner
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Remaining game time, `None` once ended.
    pub fn remaining_time(&self) -> Option<f32> {
        match self.phase {
            GamePhase::Playing => Some((GAME_DURATION - self.elapsed).max(0.0)),
            _ => None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn final_scores(&self) -> BTreeMap<u32, u32> {
        self.players.iter().map(|(id, p)| (*id, p.score)).collect()
    }

    /// Adds a player at a random spawn position away from the edges.
    ///
    /// Adding an id that is already present is an idempotent no-op: the
    /// existing player is returned untouched. Registration and disconnect
    /// messages can race through the delay queues, so a duplicate add is not
    /// an error.
    pub fn add_player(&mut self, id: u32) -> &Player {
        if !self.players.contains_key(&id) {
            let min = PLAYER_RADIUS + SPAWN_EDGE_MARGIN;
            let x = self.rng.gen_range(min..=GAME_WIDTH - min);
            let y = self.rng.gen_range(min..=GAME_HEIGHT - min);
            let player = Player {
                id,
                x,
                y,
                score: 0,
                color: PlayerColor::for_player(id),
                dx: 0,
                dy: 0,
            };
            info!("Added player {} at ({:.1}, {:.1})", id, x, y);
            self.players.insert(id, player);
        }
        &self.players[&id]
    }

    /// Removes a player. The game keeps its current phase regardless.
    pub fn remove_player(&mut self, id: u32) {
        if self.players.remove(&id).is_some() {
            info!("Removed player {}", id);
        }
    }

    /// Updates a player's input direction, clamping each axis to {-1, 0, 1}.
    /// Unknown ids are ignored: inputs routinely arrive after a disconnect.
    pub fn set_input(&mut self, id: u32, dx: i8, dy: i8) {
        if let Some(player) = self.players.get_mut(&id) {
            player.dx = dx.clamp(-1, 1);
            player.dy = dy.clamp(-1, 1);
        }
    }

    /// True when two players are registered and the game has not started.
    pub fn can_start(&self) -> bool {
        self.players.len() >= 2 && self.phase == GamePhase::Waiting
    }

    /// Transitions Waiting -> Playing and seeds the board with coins.
    pub fn start(&mut self) {
        if self.phase != GamePhase::Waiting {
            return;
        }
        self.phase = GamePhase::Playing;
        self.elapsed = 0.0;
        self.spawn_timer = 0.0;
        for _ in 0..INITIAL_COINS {
            self.spawn_coin();
        }
        info!("Game started with {} players", self.players.len());
    }

    /// Advances the simulation by `dt` seconds and returns the events that
    /// occurred. Does nothing unless the game is in the Playing phase.
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        if self.phase != GamePhase::Playing {
            return Vec::new();
        }

        let mut events = Vec::new();
        self.elapsed += dt;
        self.spawn_timer += dt;

        if self.elapsed >= GAME_DURATION {
            self.end_game(None);
            return events;
        }

        for player in self.players.values_mut() {
            let (x, y) = step_position(player.x, player.y, player.dx, player.dy, PLAYER_SPEED, dt);
            player.x = x;
            player.y = y;
        }

        // Collision pass. A coin goes to the first overlapping player in
        // iteration order and only once. A score reaching the threshold
        // decides the winner, but the rest of the pass still completes so
        // simultaneous pickups this tick are not lost; the winner is locked
        // to the first player that crossed the line.
        let mut collected = Vec::new();
        let mut score_winner = None;
        for (coin_id, coin) in &self.coins {
            for player in self.players.values_mut() {
                if circles_overlap(player.x, player.y, PLAYER_RADIUS, coin.x, coin.y, COIN_RADIUS) {
                    player.score += 1;
                    collected.push(*coin_id);
                    events.push(GameEvent::CoinCollected {
                        player_id: player.id,
                        coin_id: *coin_id,
                        new_score: player.score,
                    });
                    if player.score >= WINNING_SCORE && score_winner.is_none() {
                        score_winner = Some(player.id);
                    }
                    break;
                }
            }
        }

        for coin_id in &collected {
            self.coins.remove(coin_id);
        }

        if let Some(winner_id) = score_winner {
            self.end_game(Some(winner_id));
            return events;
        }

        if self.coins.len() < MAX_COINS && self.spawn_timer >= COIN_SPAWN_INTERVAL {
            self.spawn_coin();
            self.spawn_timer = 0.0;
        }

        events
    }

    fn end_game(&mut self, winner_id: Option<u32>) {
        self.phase = GamePhase::Ended;
        self.winner = winner_id.or_else(|| {
            // Highest score wins; iteration order breaks ties toward the
            // first-encountered (lowest) id.
            let mut best: Option<(u32, u32)> = None;
            for player in self.players.values() {
                if best.map_or(true, |(_, score)| player.score > score) {
                    best = Some((player.id, player.score));
                }
            }
            best.map(|(id, _)| id)
        });
        info!("Game ended, winner: {:?}", self.winner);
    }

    /// Spawns one coin at a random spot away from all players, retrying a
    /// bounded number of times before giving up on the distance check.
    fn spawn_coin(&mut self) -> Option<u32> {
        if self.coins.len() >= MAX_COINS {
            return None;
        }

        let min_x = COIN_RADIUS + COIN_SPAWN_MARGIN;
        let max_x = GAME_WIDTH - COIN_RADIUS - COIN_SPAWN_MARGIN;
        let min_y = COIN_RADIUS + COIN_SPAWN_MARGIN;
        let max_y = GAME_HEIGHT - COIN_RADIUS - COIN_SPAWN_MARGIN;

        for _ in 0..COIN_SPAWN_ATTEMPTS {
            let x = self.rng.gen_range(min_x..=max_x);
            let y = self.rng.gen_range(min_y..=max_y);
            let clear = self.players.values().all(|p| {
                !circles_overlap(p.x, p.y, PLAYER_RADIUS + COIN_PLAYER_BUFFER, x, y, COIN_RADIUS)
            });
            if clear {
                return Some(self.insert_coin(x, y));
            }
        }

        // Crowded board: spawn unchecked rather than starving the game.
        let x = self.rng.gen_range(min_x..=max_x);
        let y = self.rng.gen_range(min_y..=max_y);
        Some(self.insert_coin(x, y))
    }

    /// Places a coin at an exact position. Used by scripted scenarios and
    /// tests; normal play spawns through the randomized path.
    pub fn spawn_coin_at(&mut self, x: f32, y: f32) -> u32 {
        self.insert_coin(x, y)
    }

    fn insert_coin(&mut self, x: f32, y: f32) -> u32 {
        let id = self.next_coin_id;
        self.next_coin_id += 1;
        self.coins.insert(id, Coin { id, x, y });
        id
    }

    /// Immutable view of the whole world for broadcast. Safe in any phase.
    pub fn snapshot(&self, timestamp: f64) -> Message {
        Message::State {
            timestamp,
            game_state: self.phase,
            players: self
                .players
                .values()
                .map(|p| PlayerState {
                    id: p.id,
                    x: round2(p.x),
                    y: round2(p.y),
                    score: p.score,
                    color: p.color,
                })
                .collect(),
            coins: self
                .coins
                .values()
                .map(|c| CoinState {
                    id: c.id,
                    x: round2(c.x),
                    y: round2(c.y),
                })
                .collect(),
            game_time: self.elapsed,
            winner: self.winner,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
