//! Session registry binding transport endpoints to the players they control
//!
//! This module handles the server-side management of connected endpoints:
//! - Session creation on first contact and lookup on every datagram
//! - Activity tracking so silent endpoints can be reaped
//! - Roster queries used when announcing and broadcasting
//!
//! The registry never touches the world; callers remove the session's
//! player themselves so world mutations stay in one place.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Server-side binding between one transport endpoint and its player
///
/// A session is created the moment an unseen endpoint completes the
/// handshake and lives until the endpoint says goodbye or goes silent
/// longer than the configured timeout.
#[derive(Debug)]
pub struct Session {
    /// Endpoint the session's datagrams come from and replies go to
    pub addr: SocketAddr,
    /// Id of the player this endpoint controls
    pub player_id: String,
    /// Last time any datagram arrived from this endpoint
    pub last_seen: Instant,
}

impl Session {
    pub fn new(addr: SocketAddr, player_id: String) -> Self {
        Session {
            addr,
            player_id,
            last_seen: Instant::now(),
        }
    }

    /// Marks the session as recently active.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true when nothing has arrived within `timeout`.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All live sessions, keyed by endpoint
///
/// The registry is shared between the receive loop, the broadcast loop and
/// the reaper; callers wrap it in the server's read/write lock. Structural
/// changes (insert, remove) only happen from the receive loop and the
/// reaper.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SocketAddr, Session>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a session for a freshly handshaken endpoint.
    ///
    /// Returns the session it replaces, if the endpoint re-handshakes while
    /// an older session is still registered; the caller evicts the stale
    /// player.
    pub fn insert(&mut self, addr: SocketAddr, player_id: String) -> Option<Session> {
        info!("session {} opened for player {}", addr, player_id);
        self.sessions.insert(addr, Session::new(addr, player_id))
    }

    /// Removes a session, returning it so the caller can clean up its
    /// player. Returns None when the endpoint was never registered.
    pub fn remove(&mut self, addr: SocketAddr) -> Option<Session> {
        let session = self.sessions.remove(&addr);
        if let Some(session) = &session {
            info!("session {} closed for player {}", addr, session.player_id);
        }
        session
    }

    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.sessions.contains_key(&addr)
    }

    /// Player controlled by the given endpoint.
    pub fn player_id(&self, addr: SocketAddr) -> Option<&str> {
        self.sessions.get(&addr).map(|s| s.player_id.as_str())
    }

    /// Refreshes the activity timestamp for an endpoint.
    pub fn touch(&mut self, addr: SocketAddr) {
        if let Some(session) = self.sessions.get_mut(&addr) {
            session.touch();
        }
    }

    /// Every registered endpoint, for full-state broadcasts.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.sessions.keys().copied().collect()
    }

    /// Every registered endpoint except one, for announcements.
    pub fn peers(&self, exclude: SocketAddr) -> Vec<SocketAddr> {
        self.sessions
            .keys()
            .copied()
            .filter(|addr| *addr != exclude)
            .collect()
    }

    /// Removes and returns every session idle longer than `timeout`.
    pub fn reap_idle(&mut self, timeout: Duration) -> Vec<Session> {
        let idle: Vec<SocketAddr> = self
            .sessions
            .values()
            .filter(|s| s.is_idle(timeout))
            .map(|s| s.addr)
            .collect();

        idle.into_iter().filter_map(|addr| self.remove(addr)).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
