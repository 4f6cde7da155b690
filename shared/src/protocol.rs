//! Wire protocol: line-framed text datagrams carrying JSON payloads.
//!
//! Every datagram is `<kind>\n<payload>`. The first line names the message
//! kind, the rest is a JSON object when the kind carries one. The transport
//! gives no delivery or ordering guarantees; peers re-send authoritative
//! state every broadcast tick instead of retrying.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::{Moves, Player};

/// JSON shape of a 3D vector on the wire.
///
/// The simulation uses `glam::Vec3` internally; this mirror exists so that
/// payloads serialize as `{"x":..,"y":..,"z":..}` objects rather than
/// arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Vector3 {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vector3> for Vec3 {
    fn from(v: Vector3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Full serialized copy of one player's observable state.
///
/// `position` stays optional: a snapshot without one is invalid for every
/// operation that applies it, and handlers must reject it without touching
/// the session's player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub position: Option<Vector3>,
    #[serde(default)]
    pub direction: Vector3,
    #[serde(default)]
    pub velocity: Vector3,
    #[serde(default)]
    pub up: Vector3,
    #[serde(default)]
    pub vertical_angle: f32,
    #[serde(default)]
    pub horizontal_angle: f32,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        player.snapshot()
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    #[error("missing payload for `{0}`")]
    MissingPayload(&'static str),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One framed datagram, either direction.
///
/// `hello` is the only message accepted from an endpoint that has not been
/// assigned an identity yet. `fire` and `exit` carry a snapshot only when
/// the server forwards them; clients send them bare.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello,
    You(PlayerSnapshot),
    AddPlayer(PlayerSnapshot),
    RefreshPlayer(PlayerSnapshot),
    Move(Moves),
    Fire(Option<PlayerSnapshot>),
    Exit(Option<PlayerSnapshot>),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello => "hello",
            Message::You(_) => "you",
            Message::AddPlayer(_) => "add_player",
            Message::RefreshPlayer(_) => "refresh_player",
            Message::Move(_) => "move",
            Message::Fire(_) => "fire",
            Message::Exit(_) => "exit",
        }
    }

    /// Renders the message as a framed datagram body.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let payload = match self {
            Message::Hello => None,
            Message::You(snapshot)
            | Message::AddPlayer(snapshot)
            | Message::RefreshPlayer(snapshot) => Some(serde_json::to_string(snapshot)?),
            Message::Move(moves) => Some(serde_json::to_string(moves)?),
            Message::Fire(snapshot) | Message::Exit(snapshot) => match snapshot {
                Some(snapshot) => Some(serde_json::to_string(snapshot)?),
                None => None,
            },
        };
        match payload {
            Some(payload) => Ok(format!("{}\n{}", self.kind(), payload)),
            None => Ok(format!("{}\n", self.kind())),
        }
    }

    /// Parses one framed datagram.
    ///
    /// A datagram without a line break is treated as a bare kind; the
    /// original client greets the server with an unframed `hello`.
    pub fn decode(raw: &str) -> Result<Message, ProtocolError> {
        let (kind, payload) = match raw.split_once('\n') {
            Some((kind, payload)) => (kind, payload.trim_end_matches('\n')),
            None => (raw, ""),
        };
        match kind {
            "hello" => Ok(Message::Hello),
            "you" => Ok(Message::You(Self::snapshot_payload("you", payload)?)),
            "add_player" => Ok(Message::AddPlayer(Self::snapshot_payload(
                "add_player",
                payload,
            )?)),
            "refresh_player" => Ok(Message::RefreshPlayer(Self::snapshot_payload(
                "refresh_player",
                payload,
            )?)),
            "move" => {
                if payload.is_empty() {
                    return Err(ProtocolError::MissingPayload("move"));
                }
                Ok(Message::Move(serde_json::from_str(payload)?))
            }
            "fire" => Ok(Message::Fire(Self::optional_snapshot(payload)?)),
            "exit" => Ok(Message::Exit(Self::optional_snapshot(payload)?)),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }

    fn snapshot_payload(
        kind: &'static str,
        payload: &str,
    ) -> Result<PlayerSnapshot, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::MissingPayload(kind));
        }
        Ok(serde_json::from_str(payload)?)
    }

    fn optional_snapshot(payload: &str) -> Result<Option<PlayerSnapshot>, ProtocolError> {
        if payload.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(payload)?))
    }
}
