//! Pong Game Server - authoritative two-player session server
//!
//! The library exposes the session core (rooms, physics, registry, wire
//! protocol) so integration tests can drive it without a network socket.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
