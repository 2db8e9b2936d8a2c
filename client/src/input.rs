//! Pointer sampling and command tick allocation.
//!
//! Rendering and real input devices live outside this crate; the pointer
//! arrives through the [`PointerSource`] seam. This module turns those raw
//! positions into rate-limited `CursorInput` packets and hands out the
//! monotonic ticks that stamp every outgoing command.

use shared::{Packet, Vec3};
use std::time::{Duration, Instant};

/// Where the pointer position comes from each frame. The UI layer (or a
/// script, for headless runs) implements this.
pub trait PointerSource {
    /// Current pointer position in world space, or `None` if the pointer is
    /// unavailable this frame.
    fn sample_pointer(&mut self) -> Option<Vec3>;
}

/// Allocates strictly increasing command ticks.
///
/// Every `MoveUnits`/`RequestRespawn` this client issues is stamped from
/// here, so two local commands can never tie and the server's strict
/// admission check keeps the newest one regardless of arrival order.
#[derive(Debug)]
pub struct CommandClock {
    next_tick: u32,
}

impl CommandClock {
    pub fn new() -> Self {
        Self { next_tick: 1 }
    }

    pub fn next(&mut self) -> u32 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }
}

impl Default for CommandClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `CursorInput` packets from sampled pointer positions.
pub struct InputManager {
    next_sample_tick: u32,
    current_position: Vec3,
    last_input_sent: Instant,
    send_interval: Duration,
}

impl InputManager {
    pub fn new(send_interval: Duration) -> Self {
        Self {
            next_sample_tick: 1,
            current_position: Vec3::default(),
            last_input_sent: Instant::now(),
            send_interval,
        }
    }

    /// Returns a packet when the pointer moved or the keep-alive interval
    /// elapsed. The sample stream is lossy; the server keeps only the
    /// newest sample per tick anyway.
    pub fn update(&mut self, pointer: Vec3) -> Option<Packet> {
        let moved = pointer != self.current_position;
        let time_to_send = self.last_input_sent.elapsed() >= self.send_interval;

        if !moved && !time_to_send {
            return None;
        }

        self.current_position = pointer;
        self.last_input_sent = Instant::now();

        let tick = self.next_sample_tick;
        self.next_sample_tick += 1;

        Some(Packet::CursorInput {
            tick,
            position: pointer,
        })
    }

    pub fn current_position(&self) -> Vec3 {
        self.current_position
    }
}
