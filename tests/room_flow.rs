//! End-to-end room lifecycle scenarios, driven over the same channels the
//! WebSocket gateway uses.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use uuid::Uuid;

use pong_game_server::game::{RoomCommand, RoomError, RoomHandle, RoomRegistry};
use pong_game_server::ws::protocol::{PlayerSlot, ServerMsg};

const RECV_TIMEOUT: Duration = Duration::from_millis(500);

struct TestClient {
    conn_id: Uuid,
    tx: mpsc::Sender<ServerMsg>,
    rx: mpsc::Receiver<ServerMsg>,
}

impl TestClient {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            conn_id: Uuid::new_v4(),
            tx,
            rx,
        }
    }

    async fn join(&self, handle: &RoomHandle, name: &str) -> Result<PlayerSlot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .cmd_tx
            .send(RoomCommand::Join {
                conn_id: self.conn_id,
                player_name: name.to_string(),
                sender: self.tx.clone(),
                reply: reply_tx,
            })
            .await
            .expect("room task alive");
        reply_rx.await.expect("room task replies")
    }

    async fn recv(&mut self) -> ServerMsg {
        timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .expect("message within timeout")
            .expect("channel open")
    }

    /// Receive messages until one matches, skipping snapshots and other noise
    async fn recv_until(&mut self, pred: impl Fn(&ServerMsg) -> bool) -> ServerMsg {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .expect("expected message before deadline");
            let msg = timeout(remaining, self.rx.recv())
                .await
                .expect("message within timeout")
                .expect("channel open");
            if pred(&msg) {
                return msg;
            }
        }
    }
}

async fn full_started_room() -> (RoomHandle, TestClient, TestClient, Arc<RoomRegistry>) {
    let registry = Arc::new(RoomRegistry::new());
    let handle = registry.create();

    let mut ana = TestClient::new();
    let mut leo = TestClient::new();
    assert_eq!(ana.join(&handle, "Ana").await, Ok(PlayerSlot::Player1));
    assert_eq!(leo.join(&handle, "Leo").await, Ok(PlayerSlot::Player2));

    // Drain the join notifications
    ana.recv_until(|m| matches!(m, ServerMsg::RoomReady)).await;
    leo.recv_until(|m| matches!(m, ServerMsg::RoomReady)).await;

    handle.cmd_tx.send(RoomCommand::Start).await.unwrap();
    ana.recv_until(|m| matches!(m, ServerMsg::GameStarted))
        .await;
    leo.recv_until(|m| matches!(m, ServerMsg::GameStarted))
        .await;

    (handle, ana, leo, registry)
}

#[tokio::test]
async fn create_and_join_assign_slots_and_signal_ready() {
    let registry = Arc::new(RoomRegistry::new());
    let handle = registry.create();

    let mut ana = TestClient::new();
    assert_eq!(ana.join(&handle, "Ana").await, Ok(PlayerSlot::Player1));
    assert_eq!(handle.occupancy(), 1);

    let mut leo = TestClient::new();
    assert_eq!(leo.join(&handle, "Leo").await, Ok(PlayerSlot::Player2));
    assert_eq!(handle.occupancy(), 2);

    // The existing occupant hears about the newcomer, then both get ready
    match ana.recv().await {
        ServerMsg::PlayerJoined {
            player_name,
            player_number,
        } => {
            assert_eq!(player_name, "Leo");
            assert_eq!(player_number, PlayerSlot::Player2);
        }
        other => panic!("expected player_joined, got {other:?}"),
    }
    assert!(matches!(ana.recv().await, ServerMsg::RoomReady));
    assert!(matches!(leo.recv().await, ServerMsg::RoomReady));
}

#[tokio::test]
async fn third_join_fails_with_room_full() {
    let registry = Arc::new(RoomRegistry::new());
    let handle = registry.create();

    let ana = TestClient::new();
    let leo = TestClient::new();
    let eve = TestClient::new();
    ana.join(&handle, "Ana").await.unwrap();
    leo.join(&handle, "Leo").await.unwrap();

    assert_eq!(eve.join(&handle, "Eve").await, Err(RoomError::Full));
    assert_eq!(handle.occupancy(), 2);
}

#[tokio::test]
async fn start_begins_broadcasting_snapshots() {
    let (_handle, mut ana, _leo, _registry) = full_started_room().await;

    let msg = ana
        .recv_until(|m| matches!(m, ServerMsg::GameUpdate { .. }))
        .await;
    match msg {
        ServerMsg::GameUpdate {
            ball,
            paddles,
            timestamp,
        } => {
            // Fresh match: base speed, untouched paddles, no scoring yet
            assert_eq!(ball.speed, 4.0);
            assert_eq!(ball.radius, 8.0);
            assert_eq!(paddles.player1.y, 150.0);
            assert_eq!(paddles.player2.y, 150.0);
            assert!(timestamp > 0);
        }
        other => panic!("expected game_update, got {other:?}"),
    }
}

#[tokio::test]
async fn accepted_input_echoes_paddle_update() {
    let (handle, mut ana, _leo, _registry) = full_started_room().await;

    handle
        .cmd_tx
        .send(RoomCommand::Input {
            conn_id: ana.conn_id,
            direction: pong_game_server::ws::protocol::Direction::Up,
        })
        .await
        .unwrap();

    let msg = ana
        .recv_until(|m| matches!(m, ServerMsg::PaddleUpdate { .. }))
        .await;
    match msg {
        ServerMsg::PaddleUpdate {
            player_number, y, ..
        } => {
            assert_eq!(player_number, PlayerSlot::Player1);
            assert_eq!(y, 143.0);
        }
        other => panic!("expected paddle_update, got {other:?}"),
    }
}

#[tokio::test]
async fn pause_toggles_reach_both_occupants() {
    let (handle, mut ana, mut leo, _registry) = full_started_room().await;

    handle.cmd_tx.send(RoomCommand::TogglePause).await.unwrap();
    let msg = ana
        .recv_until(|m| matches!(m, ServerMsg::GamePaused { .. }))
        .await;
    assert!(matches!(msg, ServerMsg::GamePaused { paused: true }));
    let msg = leo
        .recv_until(|m| matches!(m, ServerMsg::GamePaused { .. }))
        .await;
    assert!(matches!(msg, ServerMsg::GamePaused { paused: true }));

    handle.cmd_tx.send(RoomCommand::TogglePause).await.unwrap();
    let msg = ana
        .recv_until(|m| matches!(m, ServerMsg::GamePaused { .. }))
        .await;
    assert!(matches!(msg, ServerMsg::GamePaused { paused: false }));
}

#[tokio::test]
async fn disconnects_notify_then_evict_the_room() {
    let (handle, ana, mut leo, registry) = full_started_room().await;
    let room_id = handle.id.clone();

    handle
        .cmd_tx
        .send(RoomCommand::Leave {
            conn_id: ana.conn_id,
        })
        .await
        .unwrap();

    leo.recv_until(|m| matches!(m, ServerMsg::PlayerDisconnected))
        .await;

    handle
        .cmd_tx
        .send(RoomCommand::Leave {
            conn_id: leo.conn_id,
        })
        .await
        .unwrap();

    // The room task exits and the registry entry disappears
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while registry.get(&room_id).is_some() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "room was not evicted"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(registry.joinable().iter().all(|r| r.room_id != room_id));
}

#[tokio::test]
async fn start_is_ignored_until_room_is_full() {
    let registry = Arc::new(RoomRegistry::new());
    let handle = registry.create();

    let mut ana = TestClient::new();
    ana.join(&handle, "Ana").await.unwrap();

    handle.cmd_tx.send(RoomCommand::Start).await.unwrap();

    // No game_started should arrive; give the task a moment to process
    tokio::time::sleep(Duration::from_millis(50)).await;
    let got = ana.rx.try_recv();
    assert!(
        !matches!(got, Ok(ServerMsg::GameStarted)),
        "start must be ignored while waiting for players"
    );
}
