//! Server network layer and the tick-synchronized simulation loop.
//!
//! The loop owns all authoritative state. Network tasks only move packets:
//! a receiver task funnels datagrams into the main loop over a channel, a
//! sender task drains the outgoing queue, and a timeout sweeper reports
//! silent clients. Commands received between ticks are queued and applied
//! at the start of the next tick step, before movement advances; the
//! per-unit command tick (not arrival time) is the only ordering guarantee.

use crate::client_manager::{ClientManager, CursorSample};
use crate::game::{Command, GameState};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PlayerId, SimConfig, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Clients silent for this long are disconnected by the sweeper task.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Cap on the measured tick delta. A stalled loop (debugger, scheduler
/// hiccup) otherwise produces one huge step that units cannot move through
/// sanely.
const MAX_TICK_DELTA: f32 = 1.0 / 20.0;

/// Session lifecycle of the authoritative loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotRunning,
    Connecting,
    Running,
    ShuttingDown,
}

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: PlayerId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

/// Main server coordinating networking and the authoritative simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_duration: Duration,
    phase: SessionPhase,

    /// Commands received since the last tick, paired with their resolved
    /// issuer, waiting for the next tick step.
    pending_commands: Vec<(PlayerId, Command)>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        config: SimConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::new(config),
            tick_duration,
            phase: SessionPhase::NotRunning,
            pending_commands: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Spawns the task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 4096];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps for timed-out clients
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(CLIENT_TIMEOUT)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Attributes incoming packets and either queues commands for the next
    /// tick or updates connection state immediately.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                    return;
                }

                // A reconnect from the same address replaces the old session
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.game_state.remove_player(&existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                if let Some(client_id) = client_id {
                    self.game_state.add_player(client_id);
                    let response = Packet::Connected { client_id };
                    self.send_packet(&response, addr).await;

                    // Post-join sync: the new client gets the full existing
                    // state right away instead of waiting for the next
                    // broadcast, driven by the join event itself.
                    let sync = self.build_snapshot();
                    self.send_packet(&sync, addr).await;
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                }
            }

            Packet::CursorInput { tick, position } => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.add_sample(client_id, CursorSample { tick, position });
                }
            }

            Packet::MoveUnits {
                tick,
                target,
                unit_ids,
            } => {
                if let Some(client_id) = self.resolve_command_issuer(addr).await {
                    self.pending_commands.push((
                        client_id,
                        Command::MoveUnits {
                            tick,
                            target,
                            unit_ids,
                        },
                    ));
                }
            }

            Packet::RequestRespawn { tick } => {
                if let Some(client_id) = self.resolve_command_issuer(addr).await {
                    self.pending_commands
                        .push((client_id, Command::RequestRespawn { tick }));
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.game_state.remove_player(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Resolves the issuing player of a command packet. Commands from
    /// unknown addresses are dropped; there is nobody to answer to.
    async fn resolve_command_issuer(&self, addr: SocketAddr) -> Option<PlayerId> {
        let client_id = {
            let clients = self.clients.read().await;
            clients.find_client_by_addr(addr)
        };

        match client_id {
            Some(client_id) => {
                let mut clients = self.clients.write().await;
                clients.touch(client_id);
                Some(client_id)
            }
            None => {
                debug!("Dropping command from unconnected address {}", addr);
                None
            }
        }
    }

    /// One authoritative tick: apply queued commands, echo the latest
    /// cursor samples, advance every unit, broadcast the result.
    async fn tick(&mut self, dt: f32) {
        let commands = std::mem::take(&mut self.pending_commands);
        for (issuer, command) in commands {
            self.game_state.apply_command(issuer, command);
        }

        let samples = {
            let mut clients = self.clients.write().await;
            clients.take_samples()
        };
        for (client_id, position) in samples {
            self.game_state.set_cursor(client_id, position);
        }

        self.game_state.step(dt);
        self.broadcast_snapshot().await;
    }

    fn build_snapshot(&self) -> Packet {
        let (units, cursors) = self.game_state.snapshot();

        // Take the timestamp as close to transmission as possible
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let timestamp_safe = (timestamp.min(u64::MAX as u128)) as u64;

        Packet::Snapshot {
            tick: self.game_state.tick,
            timestamp: timestamp_safe,
            units,
            cursors,
        }
    }

    async fn broadcast_snapshot(&mut self) {
        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };

        if client_count == 0 {
            return;
        }

        let packet = self.build_snapshot();
        self.broadcast_packet(&packet).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.phase = SessionPhase::Connecting;
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        self.phase = SessionPhase::Running;
        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.game_state.remove_player(&client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            self.phase = SessionPhase::ShuttingDown;
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let mut dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    if dt > MAX_TICK_DELTA {
                        warn!(
                            "Large tick delta detected ({:.3}s), capping to {:.3}s",
                            dt, MAX_TICK_DELTA
                        );
                        dt = MAX_TICK_DELTA;
                    }

                    self.tick(dt).await;

                    // Periodic health logging
                    if self.game_state.tick % 150 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        if client_count > 0 {
                            debug!(
                                "Tick {}: {} clients, {} units, {:.1}Hz",
                                self.game_state.tick,
                                client_count,
                                self.game_state.units().len(),
                                1.0 / dt
                            );
                        }
                    }
                },
            }
        }

        self.phase = SessionPhase::NotRunning;
        Ok(())
    }
}
