//! # Authoritative RTS Command Server
//!
//! This library implements the authority of the multiplayer simulation: the
//! single participant whose writes to unit and cursor state are the source
//! of truth. Clients submit pointer samples and movement/respawn commands;
//! the server validates them, advances the fixed-tick simulation, and
//! broadcasts snapshots that every participant conforms to.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Authority-owned arenas mapping unit ids and player ids to their entity
//! state. O(1) lookup backs command resolution and group math; registration
//! is synchronous with spawn/despawn so ids never dangle.
//!
//! ### Game Module (`game`)
//! The authoritative game state: player join/leave spawning, command
//! application with existence/ownership/staleness filtering, formation-
//! preserving group movement, the per-tick unit advance and the cursor echo.
//!
//! ### Client Manager Module (`client_manager`)
//! Connected-player roster: capacity enforcement, address-to-player
//! resolution, latest-pointer-sample bookkeeping and timeout sweeping.
//!
//! ### Network Module (`network`)
//! UDP transport plumbing and the tick loop. Receiver/sender/timeout tasks
//! move packets over channels; the single loop task owns all simulation
//! state, so every write to replicated state happens on one task per tick
//! with no overlapping steps.
//!
//! ## Design Notes
//!
//! All command validation failures are silent by design: the channel is
//! fire-and-forget, the issuer cannot distinguish "rejected" from "not yet
//! arrived", and every rejectable condition (unknown id, foreign unit,
//! stale tick, empty group, missing input sample) is safe to ignore. The
//! strict monotonic command-tick check in `shared::unit` is the sole
//! ordering guarantee for commands arriving over the unordered transport.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::SimConfig;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(33), // 30Hz tick
//!         16,
//!         SimConfig::default(),
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
pub mod registry;
