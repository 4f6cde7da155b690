//! # Arena Client Library
//!
//! Protocol client for the arena game. It connects once, submits movement
//! and fire intents, and applies the server's authoritative snapshots to a
//! local mirror world. Whatever arrived last is what gets shown; there is
//! no prediction, reconciliation or interpolation layer.
//!
//! Rendering is out of scope here: the [`events::ConsoleListener`] stands
//! where a scene graph would subscribe to the mirror world's lifecycle
//! events.

pub mod events;
pub mod network;
