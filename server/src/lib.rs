//! # Arena Server Library
//!
//! Authoritative server for the arena game. It owns the canonical world,
//! advances it on a fixed simulation tick, and keeps every connected client
//! eventually consistent by re-broadcasting full player snapshots on an
//! independent, coarser timer.
//!
//! ## Architecture
//!
//! One receive loop reads datagrams sequentially and dispatches them by
//! message kind. Handshake replies run on their own spawned task so a slow
//! newcomer never stalls the loop. Three companion tasks share the world
//! and session registry behind read/write locks:
//!
//! - **Simulation loop**: ticks every ~16ms, drains the queued per-player
//!   commands (intents, refreshes, shots) and advances the world by the
//!   measured wall-clock delta.
//! - **Broadcast loop**: sends every player's snapshot to every session on
//!   the configured interval. Broadcasts are full state, so a lost or
//!   reordered datagram is healed by the next round.
//! - **Session reaper**: evicts endpoints that have gone silent past the
//!   configured timeout and tells the remaining sessions they left.
//!
//! Per-player field writes never race the tick: message handlers queue
//! them on a channel the simulation loop drains at the start of each tick.
//!
//! ## Module Organization
//!
//! - [`network`]: socket handling, message dispatch and the three loops
//! - [`session`]: endpoint-to-player session registry
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod network;
pub mod session;
