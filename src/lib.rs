//! Shared jukebox backend library
//!
//! Coordinates a collaborative playback queue and a single playback state
//! across many connected listeners. Mutations are serialized through the
//! [`coordinator::Coordinator`], which pushes a full state snapshot to every
//! connected observer after each committed change.

pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod playback;
pub mod queue;
pub mod ratelimit;
pub mod snapshot;

pub use error::{Error, Result};
