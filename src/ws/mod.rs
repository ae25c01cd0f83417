//! WebSocket transport: connection gateway and wire protocol

pub mod handler;
pub mod protocol;
