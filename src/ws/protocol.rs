//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

/// One of the two fixed player positions within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    /// Slot index into per-room occupant/paddle arrays
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::Player1 => 0,
            PlayerSlot::Player2 => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerSlot::Player1),
            1 => Some(PlayerSlot::Player2),
            _ => None,
        }
    }

    /// The opposing slot
    pub fn other(self) -> Self {
        match self {
            PlayerSlot::Player1 => PlayerSlot::Player2,
            PlayerSlot::Player2 => PlayerSlot::Player1,
        }
    }
}

/// Paddle movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Ball state on the board. `speed` is the nominal magnitude used when
/// rescaling `dx` on paddle hits; it is not the norm of (dx, dy).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub radius: f32,
    pub speed: f32,
}

/// Paddle state on the board (x, width, height fixed; y mutable)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleState {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Both paddles, keyed by slot as the client expects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddles {
    pub player1: PaddleState,
    pub player2: PaddleState,
}

/// Match scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub player1: u32,
    pub player2: u32,
}

/// Joinable room entry for the lobby list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub players: usize,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Create a room; the sender joins as player1
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_name: String },

    /// Join an existing room by code
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        player_name: String,
    },

    /// Start the match; only effective once the room is full
    #[serde(rename_all = "camelCase")]
    StartGame { room_id: String },

    /// Directional paddle input; subject to per-connection throttling
    #[serde(rename_all = "camelCase")]
    PlayerInput {
        room_id: String,
        direction: Direction,
    },

    /// Toggle pause for a running match
    #[serde(rename_all = "camelCase")]
    PauseGame { room_id: String },

    /// Request the list of joinable rooms
    GetRooms,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Ack of room creation
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_id: String,
        player_number: PlayerSlot,
    },

    /// Ack of a successful join
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: String,
        player_number: PlayerSlot,
    },

    /// Sent to existing occupants when someone joins
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_name: String,
        player_number: PlayerSlot,
    },

    /// Occupancy reached two; the match can start
    RoomReady,

    /// Match transitioned to running
    GameStarted,

    /// Periodic simulation snapshot
    GameUpdate {
        ball: BallState,
        paddles: Paddles,
        timestamp: u64,
    },

    /// Sent only on a scoring tick
    ScoreUpdate { player1: u32, player2: u32 },

    /// Sent immediately on each accepted input, independent of snapshots
    #[serde(rename_all = "camelCase")]
    PaddleUpdate {
        player_number: PlayerSlot,
        y: f32,
        timestamp: u64,
    },

    /// New paused state after a pause toggle
    GamePaused { paused: bool },

    /// A departure left the room non-empty
    PlayerDisconnected,

    /// Join failed: room not found or room full
    JoinError { message: String },

    /// Response to a room-list request
    RoomsList { rooms: Vec<RoomSummary> },
}
