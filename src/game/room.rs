//! Room state machine, per-room actor task, and the room registry

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::{unix_millis, TICK_INTERVAL};
use crate::ws::protocol::{Direction, PlayerSlot, RoomSummary, ServerMsg};

use super::physics::{advance_ball, move_paddle, reset_ball, Board};
use super::snapshot;

/// Length of generated room codes
const ROOM_ID_LEN: usize = 6;

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Waiting for a second player (or for start)
    WaitingForPlayers,
    /// Match in progress
    Running,
    /// Match paused by a player
    Paused,
    /// Last occupant left; the room is being torn down
    Terminated,
}

/// Room-level join failures, surfaced to the requester as `join_error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,
    #[error("Room is full")]
    Full,
}

/// A connection bound to a player slot
#[derive(Debug, Clone)]
pub struct Occupant {
    pub conn_id: Uuid,
    pub player_name: String,
    /// Outbound channel to this occupant's connection writer
    pub sender: mpsc::Sender<ServerMsg>,
}

/// One room's mutable state (owned by the room task)
pub struct RoomState {
    pub id: String,
    pub phase: RoomPhase,
    /// Player-slot bindings, indexed by slot; slot1 fills before slot2
    occupants: [Option<Occupant>; 2],
    pub board: Board,
    rng: ChaCha8Rng,
}

impl RoomState {
    pub fn new(id: String, seed: u64) -> Self {
        Self {
            id,
            phase: RoomPhase::WaitingForPlayers,
            occupants: [None, None],
            board: Board::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupant_count() == 2
    }

    pub fn is_empty(&self) -> bool {
        self.occupant_count() == 0
    }

    /// Slot bound to a connection, if any
    pub fn slot_of(&self, conn_id: Uuid) -> Option<PlayerSlot> {
        self.occupants
            .iter()
            .position(|o| o.as_ref().is_some_and(|o| o.conn_id == conn_id))
            .and_then(PlayerSlot::from_index)
    }

    /// Bind a connection to the next free slot (slot1 before slot2)
    pub fn join(
        &mut self,
        conn_id: Uuid,
        player_name: String,
        sender: mpsc::Sender<ServerMsg>,
    ) -> Result<PlayerSlot, RoomError> {
        let index = self
            .occupants
            .iter()
            .position(|o| o.is_none())
            .ok_or(RoomError::Full)?;

        self.occupants[index] = Some(Occupant {
            conn_id,
            player_name,
            sender,
        });

        Ok(PlayerSlot::from_index(index).unwrap_or(PlayerSlot::Player1))
    }

    /// Unbind a connection. Any departure stops the match; the last departure
    /// terminates the room.
    pub fn leave(&mut self, conn_id: Uuid) -> Option<PlayerSlot> {
        let slot = self.slot_of(conn_id)?;
        self.occupants[slot.index()] = None;

        self.phase = if self.is_empty() {
            RoomPhase::Terminated
        } else {
            RoomPhase::WaitingForPlayers
        };

        Some(slot)
    }

    /// Start (or restart) the match. Requires both slots occupied.
    pub fn start(&mut self) -> bool {
        if !self.is_full() {
            return false;
        }

        self.phase = RoomPhase::Running;
        self.board.scores = Default::default();
        reset_ball(&mut self.board, &mut self.rng);
        true
    }

    /// Flip Paused <-> Running; no-op while waiting for players
    pub fn toggle_pause(&mut self) -> Option<bool> {
        match self.phase {
            RoomPhase::Running => {
                self.phase = RoomPhase::Paused;
                Some(true)
            }
            RoomPhase::Paused => {
                self.phase = RoomPhase::Running;
                Some(false)
            }
            _ => None,
        }
    }

    /// Apply a directional command to the sender's paddle. Only effective
    /// while the match is running; returns the slot and new paddle y.
    pub fn apply_input(&mut self, conn_id: Uuid, direction: Direction) -> Option<(PlayerSlot, f32)> {
        if self.phase != RoomPhase::Running {
            return None;
        }

        let slot = self.slot_of(conn_id)?;
        let paddle = self.board.paddle_mut(slot);
        move_paddle(paddle, direction);
        Some((slot, paddle.y))
    }

    /// Advance the simulation by one tick. The ball only moves while running.
    pub fn tick(&mut self) -> Option<PlayerSlot> {
        if self.phase != RoomPhase::Running {
            return None;
        }
        advance_ball(&mut self.board, &mut self.rng)
    }

    fn occupants(&self) -> impl Iterator<Item = &Occupant> {
        self.occupants.iter().flatten()
    }
}

/// Commands delivered to a room task from connection gateways
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        conn_id: Uuid,
        player_name: String,
        sender: mpsc::Sender<ServerMsg>,
        reply: oneshot::Sender<Result<PlayerSlot, RoomError>>,
    },
    Leave {
        conn_id: Uuid,
    },
    Start,
    TogglePause,
    Input {
        conn_id: Uuid,
        direction: Direction,
    },
}

/// Handle to a running room task
#[derive(Clone)]
pub struct RoomHandle {
    pub id: String,
    pub cmd_tx: mpsc::Sender<RoomCommand>,
    occupancy: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }
}

/// The authoritative room actor: consumes commands and drives the fixed-rate
/// simulation/broadcast loop once the match has started.
pub struct GameRoom {
    state: RoomState,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    occupancy: Arc<AtomicUsize>,
    /// Set on the first successful start; arms the broadcast interval
    broadcasting: bool,
}

impl GameRoom {
    pub fn new(id: String, seed: u64) -> (Self, RoomHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let occupancy = Arc::new(AtomicUsize::new(0));

        let handle = RoomHandle {
            id: id.clone(),
            cmd_tx,
            occupancy: occupancy.clone(),
        };

        let room = Self {
            state: RoomState::new(id, seed),
            cmd_rx,
            occupancy,
            broadcasting: false,
        };

        (room, handle)
    }

    /// Run the room until the last occupant leaves
    pub async fn run(mut self) {
        info!(room_id = %self.state.id, "Room created");

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                _ = ticker.tick(), if self.broadcasting => {
                    self.on_tick().await;
                }
            }

            if self.state.phase == RoomPhase::Terminated {
                break;
            }
        }

        info!(room_id = %self.state.id, "Room closed");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                conn_id,
                player_name,
                sender,
                reply,
            } => {
                let result = self.state.join(conn_id, player_name.clone(), sender);
                self.occupancy
                    .store(self.state.occupant_count(), Ordering::Relaxed);

                if let Ok(slot) = result {
                    info!(
                        room_id = %self.state.id,
                        conn_id = %conn_id,
                        slot = ?slot,
                        "Player joined room"
                    );

                    self.send_to_others(
                        conn_id,
                        ServerMsg::PlayerJoined {
                            player_name,
                            player_number: slot,
                        },
                    )
                    .await;

                    if self.state.is_full() {
                        self.broadcast(ServerMsg::RoomReady).await;
                    }
                }

                let _ = reply.send(result);
            }

            RoomCommand::Leave { conn_id } => {
                if let Some(slot) = self.state.leave(conn_id) {
                    self.occupancy
                        .store(self.state.occupant_count(), Ordering::Relaxed);

                    info!(
                        room_id = %self.state.id,
                        conn_id = %conn_id,
                        slot = ?slot,
                        "Player left room"
                    );

                    if !self.state.is_empty() {
                        self.broadcast(ServerMsg::PlayerDisconnected).await;
                    }
                }
            }

            RoomCommand::Start => {
                if self.state.start() {
                    self.broadcasting = true;
                    info!(room_id = %self.state.id, "Game started");
                    self.broadcast(ServerMsg::GameStarted).await;
                } else {
                    debug!(room_id = %self.state.id, "Start ignored, room not ready");
                }
            }

            RoomCommand::TogglePause => {
                if let Some(paused) = self.state.toggle_pause() {
                    self.broadcast(ServerMsg::GamePaused { paused }).await;
                }
            }

            RoomCommand::Input { conn_id, direction } => {
                if let Some((slot, y)) = self.state.apply_input(conn_id, direction) {
                    // Immediate paddle echo for responsiveness, decoupled
                    // from the snapshot cadence
                    self.broadcast(snapshot::paddle_update(slot, y, unix_millis()))
                        .await;
                }
            }
        }
    }

    /// One firing of the broadcast driver: tick physics, report any score,
    /// then always send the full snapshot (the ball just doesn't move while
    /// paused).
    async fn on_tick(&mut self) {
        if let Some(scorer) = self.state.tick() {
            debug!(room_id = %self.state.id, scorer = ?scorer, "Score");
            self.broadcast(snapshot::score_update(&self.state.board))
                .await;
        }

        self.broadcast(snapshot::game_update(&self.state.board, unix_millis()))
            .await;
    }

    /// Fan a message out to every occupant. A lagging connection's full
    /// buffer drops the message rather than stalling the room task.
    async fn broadcast(&self, msg: ServerMsg) {
        for occupant in self.state.occupants() {
            if occupant.sender.try_send(msg.clone()).is_err() {
                debug!(
                    room_id = %self.state.id,
                    conn_id = %occupant.conn_id,
                    "Dropped outbound message for lagging connection"
                );
            }
        }
    }

    async fn send_to_others(&self, except: Uuid, msg: ServerMsg) {
        for occupant in self.state.occupants() {
            if occupant.conn_id != except && occupant.sender.try_send(msg.clone()).is_err() {
                debug!(
                    room_id = %self.state.id,
                    conn_id = %occupant.conn_id,
                    "Dropped outbound message for lagging connection"
                );
            }
        }
    }
}

/// Registry of all active rooms. The room-id map is the only resource shared
/// across connections; each room's state is touched only by its own task.
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Create a room and spawn its task; the handle is registered before the
    /// creator's join command is sent.
    pub fn create(self: &Arc<Self>) -> RoomHandle {
        let id = self.generate_room_id();
        let (room, handle) = GameRoom::new(id.clone(), rand::random());

        self.rooms.insert(id.clone(), handle.clone());

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            room.run().await;
            registry.rooms.remove(&id);
            info!(room_id = %id, "Room removed from registry");
        });

        handle
    }

    pub fn get(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.get(id).map(|r| r.value().clone())
    }

    pub fn remove(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.remove(id).map(|(_, h)| h)
    }

    /// Rooms that can still accept a player
    pub fn joinable(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().occupancy() < 2)
            .map(|entry| RoomSummary {
                room_id: entry.key().clone(),
                players: entry.value().occupancy(),
            })
            .collect()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().occupancy()).sum()
    }

    /// Short random alphanumeric code, re-rolled on the (unlikely) collision
    /// with an active room.
    fn generate_room_id(&self) -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
        let mut rng = rand::thread_rng();

        loop {
            let id: String = (0..ROOM_ID_LEN)
                .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
