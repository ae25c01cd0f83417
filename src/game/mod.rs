//! Game simulation modules

pub mod physics;
pub mod room;
pub mod snapshot;

pub use room::{GameRoom, RoomCommand, RoomError, RoomHandle, RoomRegistry};
