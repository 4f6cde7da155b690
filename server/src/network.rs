//! Server network layer: receive loop, simulation tick and state broadcast

use log::{debug, error, info, warn};
use shared::world::spawn_player;
use shared::{Message, Moves, Player, PlayerSnapshot, ProtocolError, World};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

use crate::session::Registry;

/// Per-player mutations queued by message handlers and drained at the
/// start of each simulation tick, so the tick never races field writes.
#[derive(Debug)]
pub enum WorldCommand {
    Moves {
        player_id: String,
        moves: Moves,
    },
    Refresh {
        player_id: String,
        snapshot: PlayerSnapshot,
    },
    Fire {
        player_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Simulation tick period; the world advances by the measured
    /// wall-clock delta each tick.
    pub tick_interval: Duration,
    /// Full-state broadcast period, independent of the simulation tick.
    pub broadcast_interval: Duration,
    /// Sessions silent for longer than this are evicted.
    pub session_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 1234,
            tick_interval: Duration::from_millis(16),
            broadcast_interval: Duration::from_millis(50),
            session_timeout: Duration::from_secs(30),
        }
    }
}

/// The authoritative server: one socket, one world, one session registry.
///
/// `run` drives the receive loop on the calling task and spawns three
/// companions: the simulation loop, the broadcast loop and the session
/// reaper. All of them share the world and registry behind read/write
/// locks; per-player writes funnel through the command channel instead of
/// touching players directly.
pub struct Server {
    socket: Arc<UdpSocket>,
    world: Arc<RwLock<World>>,
    registry: Arc<RwLock<Registry>>,
    command_tx: mpsc::UnboundedSender<WorldCommand>,
    command_rx: mpsc::UnboundedReceiver<WorldCommand>,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let address = format!("{}:{}", config.host, config.port);
        let socket = Arc::new(UdpSocket::bind(&address).await?);
        info!("listening on {}", socket.local_addr()?);

        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            world: Arc::new(RwLock::new(World::new())),
            registry: Arc::new(RwLock::new(Registry::new())),
            command_tx,
            command_rx,
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs the server until the process ends.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_simulation_loop();
        self.spawn_broadcast_loop();
        self.spawn_session_reaper();

        let mut buffer = [0u8; 2048];
        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => match std::str::from_utf8(&buffer[..len]) {
                    Ok(text) => self.handle_datagram(text, addr).await,
                    Err(_) => warn!("dropping non-utf8 datagram from {}", addr),
                },
                Err(err) => {
                    error!("error receiving datagram: {}", err);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Advances the world on a fixed tick, applying queued commands first.
    fn spawn_simulation_loop(&mut self) {
        let world = Arc::clone(&self.world);
        let mut command_rx =
            std::mem::replace(&mut self.command_rx, mpsc::unbounded_channel().1);
        let tick_interval = self.config.tick_interval;

        tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_tick = Instant::now();

            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f32();
                last_tick = now;

                let mut world = world.write().await;
                while let Ok(command) = command_rx.try_recv() {
                    apply_command(&mut world, command);
                }
                world.update(dt);
            }
        });
    }

    /// Sends every player's snapshot to every session, full state each
    /// time. A lost datagram is healed by the next round.
    fn spawn_broadcast_loop(&self) {
        let socket = Arc::clone(&self.socket);
        let world = Arc::clone(&self.world);
        let registry = Arc::clone(&self.registry);
        let broadcast_interval = self.config.broadcast_interval;

        tokio::spawn(async move {
            let mut ticker = interval(broadcast_interval);

            loop {
                ticker.tick().await;

                let snapshots: Vec<PlayerSnapshot> =
                    { world.read().await.players().map(Player::snapshot).collect() };
                if snapshots.is_empty() {
                    continue;
                }

                let addrs = { registry.read().await.addrs() };
                for addr in addrs {
                    for snapshot in &snapshots {
                        send_message(&socket, &Message::RefreshPlayer(snapshot.clone()), addr)
                            .await;
                    }
                }
            }
        });
    }

    /// Evicts sessions that went silent, removing their players and
    /// telling everyone else.
    fn spawn_session_reaper(&self) {
        let socket = Arc::clone(&self.socket);
        let world = Arc::clone(&self.world);
        let registry = Arc::clone(&self.registry);
        let session_timeout = self.config.session_timeout;

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));

            loop {
                ticker.tick().await;

                let reaped = { registry.write().await.reap_idle(session_timeout) };
                for session in reaped {
                    info!("session {} timed out", session.addr);
                    let removed =
                        { world.write().await.remove_player(&session.player_id) };
                    if let Some(player) = removed {
                        let snapshot = player.snapshot();
                        let addrs = { registry.read().await.addrs() };
                        for peer in addrs {
                            send_message(&socket, &Message::Exit(Some(snapshot.clone())), peer)
                                .await;
                        }
                    }
                }
            }
        });
    }

    async fn handle_datagram(&self, text: &str, addr: SocketAddr) {
        let message = match Message::decode(text) {
            Ok(message) => message,
            Err(ProtocolError::UnknownKind(kind)) => {
                debug!("ignoring unknown message kind `{}` from {}", kind, addr);
                return;
            }
            Err(err) => {
                warn!("dropping malformed datagram from {}: {}", addr, err);
                return;
            }
        };

        let kind = message.kind();
        match message {
            Message::Hello => self.handle_hello(addr).await,
            Message::Move(moves) => self.handle_moves(addr, moves).await,
            Message::RefreshPlayer(snapshot) => self.handle_refresh(addr, snapshot).await,
            Message::Fire(_) => self.handle_fire(addr).await,
            Message::Exit(_) => self.handle_exit(addr).await,
            Message::You(_) | Message::AddPlayer(_) => {
                warn!("unexpected {} from {}", kind, addr);
            }
        }
    }

    /// First contact: mint an identity, register it, and welcome the
    /// newcomer. A repeated handshake replaces the endpoint's previous
    /// player.
    async fn handle_hello(&self, addr: SocketAddr) {
        let stale = { self.registry.write().await.remove(addr) };
        if let Some(stale) = stale {
            self.world.write().await.remove_player(&stale.player_id);
        }

        let player = spawn_player("");
        let player_id = player.id().to_string();
        let snapshot = player.snapshot();
        {
            self.world.write().await.add_player(player);
            self.registry.write().await.insert(addr, player_id.clone());
        }
        info!("player {} connected from {}", player_id, addr);

        // Welcome traffic runs on its own task so a slow handshake never
        // stalls the receive loop.
        let socket = Arc::clone(&self.socket);
        let world = Arc::clone(&self.world);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            send_message(&socket, &Message::You(snapshot.clone()), addr).await;

            let roster: Vec<PlayerSnapshot> = {
                world
                    .read()
                    .await
                    .players()
                    .filter(|p| p.id() != player_id)
                    .map(Player::snapshot)
                    .collect()
            };
            for known in roster {
                send_message(&socket, &Message::AddPlayer(known), addr).await;
            }

            let peers = { registry.read().await.peers(addr) };
            for peer in peers {
                send_message(&socket, &Message::AddPlayer(snapshot.clone()), peer).await;
            }
        });
    }

    async fn handle_moves(&self, addr: SocketAddr, moves: Moves) {
        let player_id = match self.session_player(addr).await {
            Some(player_id) => player_id,
            None => {
                debug!("move from unknown endpoint {}", addr);
                return;
            }
        };
        self.queue(WorldCommand::Moves { player_id, moves });
    }

    async fn handle_refresh(&self, addr: SocketAddr, snapshot: PlayerSnapshot) {
        let player_id = match self.session_player(addr).await {
            Some(player_id) => player_id,
            None => {
                debug!("refresh from unknown endpoint {}", addr);
                return;
            }
        };
        if snapshot.position.is_none() {
            warn!("refresh without position from {}", addr);
            return;
        }
        self.queue(WorldCommand::Refresh {
            player_id,
            snapshot,
        });
    }

    /// Queues the shot and forwards it so client mirrors spawn the
    /// projectile as well.
    async fn handle_fire(&self, addr: SocketAddr) {
        let player_id = match self.session_player(addr).await {
            Some(player_id) => player_id,
            None => {
                debug!("fire from unknown endpoint {}", addr);
                return;
            }
        };
        self.queue(WorldCommand::Fire {
            player_id: player_id.clone(),
        });

        let snapshot = {
            self.world
                .read()
                .await
                .player(&player_id)
                .map(Player::snapshot)
        };
        if let Some(snapshot) = snapshot {
            let peers = { self.registry.read().await.peers(addr) };
            for peer in peers {
                send_message(&self.socket, &Message::Fire(Some(snapshot.clone())), peer).await;
            }
        }
    }

    async fn handle_exit(&self, addr: SocketAddr) {
        let session = { self.registry.write().await.remove(addr) };
        let session = match session {
            Some(session) => session,
            None => {
                debug!("exit from unknown endpoint {}", addr);
                return;
            }
        };
        let removed = { self.world.write().await.remove_player(&session.player_id) };
        if let Some(player) = removed {
            let snapshot = player.snapshot();
            let addrs = { self.registry.read().await.addrs() };
            for peer in addrs {
                send_message(&self.socket, &Message::Exit(Some(snapshot.clone())), peer).await;
            }
        }
    }

    /// Refreshes the session's activity stamp and resolves its player.
    async fn session_player(&self, addr: SocketAddr) -> Option<String> {
        let mut registry = self.registry.write().await;
        registry.touch(addr);
        registry.player_id(addr).map(str::to_string)
    }

    fn queue(&self, command: WorldCommand) {
        if let Err(err) = self.command_tx.send(command) {
            error!("failed to queue world command: {}", err);
        }
    }
}

fn apply_command(world: &mut World, command: WorldCommand) {
    match command {
        WorldCommand::Moves { player_id, moves } => {
            if let Some(player) = world.player_mut(&player_id) {
                player.refresh_moves(moves);
            }
        }
        WorldCommand::Refresh {
            player_id,
            snapshot,
        } => {
            if let Some(player) = world.player_mut(&player_id) {
                player.refresh(&snapshot);
            }
        }
        WorldCommand::Fire { player_id } => world.fire(&player_id),
    }
}

async fn send_message(socket: &UdpSocket, message: &Message, addr: SocketAddr) {
    let text = match message.encode() {
        Ok(text) => text,
        Err(err) => {
            error!("failed to encode {}: {}", message.kind(), err);
            return;
        }
    };
    if let Err(err) = socket.send_to(text.as_bytes(), addr).await {
        error!("failed to send {} to {}: {}", message.kind(), addr, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vector3;

    fn world_with_player() -> (World, String) {
        let mut world = World::new();
        let player = spawn_player("tester");
        let id = player.id().to_string();
        world.add_player(player);
        (world, id)
    }

    #[test]
    fn moves_command_replaces_intent_set() {
        let (mut world, id) = world_with_player();

        apply_command(
            &mut world,
            WorldCommand::Moves {
                player_id: id.clone(),
                moves: Moves {
                    move_forward: true,
                    ..Moves::default()
                },
            },
        );

        assert!(world.player(&id).unwrap().moves().move_forward);
    }

    #[test]
    fn refresh_command_overwrites_reported_state() {
        let (mut world, id) = world_with_player();

        let snapshot = PlayerSnapshot {
            id: id.clone(),
            name: "renamed".to_string(),
            position: Some(Vector3 {
                x: 1.0,
                y: 0.0,
                z: -1.0,
            }),
            ..PlayerSnapshot::default()
        };
        apply_command(
            &mut world,
            WorldCommand::Refresh {
                player_id: id.clone(),
                snapshot,
            },
        );

        let player = world.player(&id).unwrap();
        assert_eq!(player.name, "renamed");
        assert_eq!(player.position.x, 1.0);
        assert_eq!(player.position.z, -1.0);
    }

    #[test]
    fn fire_command_spawns_a_bullet() {
        let (mut world, id) = world_with_player();

        apply_command(&mut world, WorldCommand::Fire { player_id: id });

        assert_eq!(world.bullets().count(), 1);
    }

    #[test]
    fn commands_for_unknown_players_are_ignored() {
        let mut world = World::new();

        apply_command(
            &mut world,
            WorldCommand::Moves {
                player_id: "ghost".to_string(),
                moves: Moves::default(),
            },
        );
        apply_command(
            &mut world,
            WorldCommand::Fire {
                player_id: "ghost".to_string(),
            },
        );

        assert_eq!(world.players().count(), 0);
        assert_eq!(world.bullets().count(), 0);
    }

    #[tokio::test]
    async fn server_binds_an_ephemeral_port() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }
}
