//! # Participant Client Library
//!
//! The non-authority side of the simulation. A client never writes truth:
//! it forwards pointer samples and commands to the server, renders whatever
//! the latest snapshot says, and optionally masks latency by running the
//! shared movement rules on a disposable prediction copy of its own units.
//!
//! ## Module Organization
//!
//! - `game`: replicated state, selection, prediction shadow and the
//!   state-change events the external renderer consumes.
//! - `input`: the pointer-source seam, cursor sample packets and monotonic
//!   command tick allocation.
//! - `network`: connection lifecycle and the async main loop.
//!
//! Rendering, widget handling and drag-box selection geometry are external
//! collaborators; this crate exposes read-only state accessors and the two
//! command entry points (`send_move`, `send_respawn`) for them to drive.

pub mod game;
pub mod input;
pub mod network;
