//! Protocol client: a connected socket and the mirror world it keeps in
//! step with the server's snapshots.

use log::{debug, info, warn};
use shared::{EventListener, Message, Moves, Player, PlayerSnapshot, ProtocolError, World};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Client-side session. Connects once, submits intents upward and applies
/// every authoritative message to a local [`World`] mirror. The newest
/// received state is simply adopted; there is no prediction or smoothing.
pub struct Client {
    socket: UdpSocket,
    world: World,
    player_id: Option<String>,
    name: String,
}

impl Client {
    /// Binds an ephemeral socket and greets the server. The identity
    /// arrives asynchronously with the `you` reply.
    pub async fn connect(
        server_addr: &str,
        name: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(server_addr).await?;
        info!("connecting to {}", server_addr);

        let client = Client {
            socket,
            world: World::new(),
            player_id: None,
            name: name.to_string(),
        };
        client.send(&Message::Hello).await?;
        Ok(client)
    }

    /// Attaches the presentation listener to the mirror world.
    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.world.subscribe(listener);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    /// The player this client steers, once `you` has been applied.
    pub fn local_player_mut(&mut self) -> Option<&mut Player> {
        let id = self.player_id.clone()?;
        self.world.player_mut(&id)
    }

    /// Advances the mirror world between snapshots so projectiles keep
    /// flying at the local frame rate.
    pub fn tick(&mut self, dt: f32) {
        self.world.update(dt);
    }

    /// Sends the local player's current intent set.
    pub async fn send_moves(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(moves) = self.local_moves() {
            self.send(&Message::Move(moves)).await?;
        }
        Ok(())
    }

    /// Pushes the local player's full state, name included.
    pub async fn send_refresh(&self) -> Result<(), Box<dyn std::error::Error>> {
        let snapshot = self
            .player_id
            .as_deref()
            .and_then(|id| self.world.player(id))
            .map(Player::snapshot);
        if let Some(snapshot) = snapshot {
            self.send(&Message::RefreshPlayer(snapshot)).await?;
        }
        Ok(())
    }

    pub async fn send_fire(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.send(&Message::Fire(None)).await
    }

    pub async fn send_exit(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.send(&Message::Exit(None)).await
    }

    /// Receives one datagram and applies it to the mirror.
    pub async fn poll(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut buffer = [0u8; 2048];
        let len = self.socket.recv(&mut buffer).await?;
        let text = match std::str::from_utf8(&buffer[..len]) {
            Ok(text) => text,
            Err(_) => {
                warn!("dropping non-utf8 datagram");
                return Ok(());
            }
        };
        match Message::decode(text) {
            Ok(message) => self.apply(message),
            Err(ProtocolError::UnknownKind(kind)) => {
                debug!("ignoring unknown message kind `{}`", kind);
            }
            Err(err) => warn!("dropping malformed datagram: {}", err),
        }
        Ok(())
    }

    /// Applies one authoritative message to the mirror world.
    pub fn apply(&mut self, message: Message) {
        let kind = message.kind();
        match message {
            Message::You(snapshot) => self.handle_you(snapshot),
            Message::AddPlayer(snapshot) => self.handle_add_player(snapshot),
            Message::RefreshPlayer(snapshot) => self.handle_refresh(snapshot),
            Message::Fire(Some(snapshot)) => self.handle_fire(snapshot),
            Message::Exit(Some(snapshot)) => self.handle_exit(snapshot),
            Message::Fire(None) | Message::Exit(None) => {
                debug!("{} without snapshot from server", kind);
            }
            Message::Hello | Message::Move(_) => {
                debug!("unexpected {} from server", kind);
            }
        }
    }

    fn handle_you(&mut self, snapshot: PlayerSnapshot) {
        let Some(position) = snapshot.position else {
            warn!("you without position");
            return;
        };
        info!("assigned identity {}", snapshot.id);
        // The mirror keeps the locally chosen name; the next refresh
        // pushes it to the server.
        self.world
            .add_player(Player::new(&snapshot.id, &self.name, position.into()));
        self.player_id = Some(snapshot.id);
    }

    fn handle_add_player(&mut self, snapshot: PlayerSnapshot) {
        let Some(position) = snapshot.position else {
            warn!("add_player without position");
            return;
        };
        if self.player_id.as_deref() == Some(snapshot.id.as_str()) {
            return;
        }
        self.world
            .add_player(Player::new(&snapshot.id, &snapshot.name, position.into()));
    }

    fn handle_refresh(&mut self, snapshot: PlayerSnapshot) {
        if snapshot.position.is_none() {
            warn!("refresh_player without position");
            return;
        }
        if let Some(player) = self.world.player_mut(&snapshot.id) {
            player.refresh(&snapshot);
        } else {
            debug!("refresh for unknown player {}", snapshot.id);
        }
    }

    fn handle_fire(&mut self, snapshot: PlayerSnapshot) {
        if snapshot.position.is_none() {
            warn!("fire without position");
            return;
        }
        let id = snapshot.id.clone();
        if let Some(player) = self.world.player_mut(&id) {
            player.refresh(&snapshot);
            self.world.fire(&id);
        }
    }

    fn handle_exit(&mut self, snapshot: PlayerSnapshot) {
        if self.world.remove_player(&snapshot.id).is_none() {
            debug!("exit for unknown player {}", snapshot.id);
        }
    }

    fn local_moves(&self) -> Option<Moves> {
        self.player_id
            .as_deref()
            .and_then(|id| self.world.player(id))
            .map(|player| player.moves().clone())
    }

    async fn send(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        let text = message.encode()?;
        self.socket.send(text.as_bytes()).await?;
        Ok(())
    }
}
