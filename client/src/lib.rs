//! Game client library.
//!
//! Connects to the authoritative server over TCP and keeps a playable local
//! view of the match despite the artificial round-trip latency:
//!
//! - [`network`]: background connection with a receive-side delay queue and
//!   throttled input sending
//! - [`prediction`]: immediate local movement with drift correction against
//!   authoritative positions
//! - [`interpolation`]: time-delayed smoothing of remote player positions
//! - [`game`]: message routing and the per-frame view handed to a front end

pub mod game;
pub mod interpolation;
pub mod network;
pub mod prediction;
