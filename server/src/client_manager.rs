//! Connected-player management and per-tick input sampling.
//!
//! This module tracks which players are connected, resolves incoming
//! packets to player ids by network address, and holds each player's most
//! recent pointer sample between ticks. Unlike the reliable command path,
//! pointer input is lossy by design: the tick loop takes whatever latest
//! sample exists per player and silently skips players that sent none,
//! which is the expected behavior under packet loss.

use log::info;
use shared::{PlayerId, Vec3};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A pointer position sampled by a client, stamped with the client's own
/// monotonic tick so late arrivals cannot roll the cursor backwards.
#[derive(Debug, Clone, Copy)]
pub struct CursorSample {
    pub tick: u32,
    pub position: Vec3,
}

/// A connected player and its transport bookkeeping.
#[derive(Debug)]
pub struct Client {
    /// Unique player identifier assigned by the server.
    pub id: PlayerId,
    /// Network address for response routing.
    pub addr: SocketAddr,
    /// Last time any packet arrived from this player.
    pub last_seen: Instant,
    /// Most recent pointer sample not yet consumed by the tick loop.
    latest_sample: Option<CursorSample>,
    /// Highest sample tick ever observed, for out-of-order rejection.
    last_sample_tick: u32,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            latest_sample: None,
            last_sample_tick: 0,
        }
    }

    /// Stores a pointer sample if it is newer than anything seen so far.
    /// Older or duplicate samples are dropped; the cursor only moves
    /// forward in the player's own time.
    pub fn add_sample(&mut self, sample: CursorSample) {
        self.last_seen = Instant::now();
        if sample.tick > self.last_sample_tick {
            self.last_sample_tick = sample.tick;
            self.latest_sample = Some(sample);
        }
    }

    /// Marks non-input traffic (commands, keep-alives) as activity.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Central roster of connected players.
///
/// Enforces the capacity limit, assigns player ids, and provides the
/// address-to-player resolution that pins every command to the player who
/// actually sent it.
pub struct ClientManager {
    clients: HashMap<PlayerId, Client>,
    next_client_id: PlayerId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new player. Returns `None` at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a player. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Resolves the player connected from `addr`, if any. This is the only
    /// way a packet gets attributed to a player.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn add_sample(&mut self, client_id: PlayerId, sample: CursorSample) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.add_sample(sample);
            true
        } else {
            false
        }
    }

    pub fn touch(&mut self, client_id: PlayerId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
        }
    }

    /// Drains the latest pointer sample of every player that submitted one
    /// since the last tick. Players without a sample simply do not appear.
    pub fn take_samples(&mut self) -> Vec<(PlayerId, Vec3)> {
        self.clients
            .iter_mut()
            .filter_map(|(id, client)| {
                client
                    .latest_sample
                    .take()
                    .map(|sample| (*id, sample.position))
            })
            .collect()
    }

    /// Removes and returns players that have gone silent past the timeout.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<PlayerId> {
        let timed_out: Vec<PlayerId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// All (player, address) pairs for broadcast distribution.
    pub fn get_client_addrs(&self) -> Vec<(PlayerId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
