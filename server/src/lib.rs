//! # Coin Collector Server Library
//!
//! Authoritative server for the two-player coin-collecting game. The server
//! owns the only writable copy of the world; clients submit input directions
//! and render whatever the server tells them happened.
//!
//! ## Architecture
//!
//! ### Single authoritative tick loop
//! A fixed-rate (default 60 Hz) loop drives every mutation of the simulation.
//! Connection I/O runs in separate tokio tasks, but those tasks only ever
//! touch the loop through queues, so there are no concurrent writers to game
//! state and no locks around it.
//!
//! ### Artificial latency
//! Both directions of traffic pass through [`shared::delay::DelayQueue`]s:
//! client inputs wait the configured delay before the simulation sees them,
//! and broadcasts wait the same delay before reaching the sockets. This makes
//! the prediction, reconciliation, and interpolation machinery on the client
//! side observable on a local network.
//!
//! ### Two-slot sessions
//! Exactly two players are admitted. Identities come from a sorted free list,
//! so a disconnecting player's id is reassigned to the next connection in
//! ascending order. The game starts the moment the second player registers
//! and keeps running if one of them leaves.
//!
//! ## Module Organization
//!
//! - [`game`] — the simulation: movement, coin spawning, collision and
//!   scoring rules, win conditions, snapshots.
//! - [`registry`] — connection-to-identity mapping and message fan-out.
//! - [`network`] — TCP admission, per-connection reader/writer tasks, and the
//!   tick loop tying everything together.

pub mod game;
pub mod network;
pub mod registry;
