//! Client connection handling and the participant-side main loop.

use crate::game::ClientGameState;
use crate::input::{CommandClock, InputManager, PointerSource};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{Packet, PlayerId, SimConfig, Vec3, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::interval;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<PlayerId>,
    connected: bool,

    game_state: ClientGameState,
    input_manager: InputManager,
    command_clock: CommandClock,

    /// When set, the run loop periodically orders every owned unit to the
    /// current pointer position. Used by the headless binary to exercise
    /// the command path without a UI.
    auto_command_interval: Option<Duration>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        config: SimConfig,
        auto_command_interval: Option<Duration>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            game_state: ClientGameState::new(config),
            input_manager: InputManager::new(Duration::from_millis(16)),
            command_clock: CommandClock::new(),
            auto_command_interval,
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn game_state_mut(&mut self) -> &mut ClientGameState {
        &mut self.game_state
    }

    pub fn client_id(&self) -> Option<PlayerId> {
        self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::Snapshot {
                tick,
                timestamp: _,
                units,
                cursors,
            } => {
                self.game_state
                    .apply_snapshot(tick, units, cursors, self.client_id);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Orders the currently selected units to `target`: the prediction
    /// shadow is seeded immediately, the authoritative command goes out on
    /// the wire. An empty selection sends nothing.
    pub async fn send_move(&mut self, target: Vec3) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }

        let tick = self.command_clock.next();
        let unit_ids = self.game_state.plan_local_move(tick, target);
        if unit_ids.is_empty() {
            return Ok(());
        }

        let packet = Packet::MoveUnits {
            tick,
            target,
            unit_ids,
        };
        self.send_packet(&packet).await?;
        Ok(())
    }

    pub async fn send_respawn(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }

        let tick = self.command_clock.next();
        self.send_packet(&Packet::RequestRespawn { tick }).await?;
        Ok(())
    }

    /// Selects all units the local player owns. The headless binary uses
    /// this in place of a drag-box; a UI would drive the selection methods
    /// on the game state directly.
    pub fn select_all_owned(&mut self) {
        if let Some(local) = self.client_id {
            let ids: Vec<_> = self
                .game_state
                .confirmed_units()
                .filter(|u| u.owner == local)
                .map(|u| u.id)
                .collect();
            for id in ids {
                self.game_state.select(id, local);
            }
        }
    }

    /// Main client loop: receive snapshots, forward pointer samples, run
    /// prediction between snapshots.
    pub async fn run<P: PointerSource>(
        &mut self,
        mut pointer: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut input_interval = interval(Duration::from_millis(16));
        let mut prediction_interval = interval(Duration::from_millis(16));
        let mut auto_command_interval =
            interval(self.auto_command_interval.unwrap_or(Duration::from_secs(3600)));

        let mut buffer = [0u8; 4096];
        let mut last_prediction = Instant::now();

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet).await;
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = input_interval.tick() => {
                    if self.connected {
                        if let Some(position) = pointer.sample_pointer() {
                            if let Some(packet) = self.input_manager.update(position) {
                                if let Err(e) = self.send_packet(&packet).await {
                                    error!("Error sending input: {}", e);
                                }
                            }
                        }
                    }
                },

                _ = prediction_interval.tick() => {
                    // Step by measured elapsed time, not the nominal
                    // interval; the two drift apart under load.
                    let now = Instant::now();
                    let dt = now.duration_since(last_prediction).as_secs_f32();
                    last_prediction = now;
                    self.game_state.update_prediction(dt);
                },

                _ = auto_command_interval.tick(), if self.auto_command_interval.is_some() => {
                    if self.connected {
                        self.select_all_owned();
                        let target = self.input_manager.current_position();
                        if let Err(e) = self.send_move(target).await {
                            error!("Error sending move command: {}", e);
                        }
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down client");
                    break;
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
