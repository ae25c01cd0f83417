//! WebSocket connection gateway
//!
//! Maps each live connection to at most one (room, slot) binding, forwards
//! inbound messages to the room registry or the bound room task, and pumps
//! outbound messages from the per-connection channel to the socket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{RoomCommand, RoomError, RoomHandle};
use crate::util::rate_limit::InputGate;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Per-connection outbound channel; room tasks hold the sender end
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(64);

    // Writer task: outbound channel -> WebSocket
    let writer_conn_id = conn_id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    run_session(conn_id, state, out_tx, ws_stream).await;

    writer_handle.abort();
    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> registry / room task
async fn run_session(
    conn_id: Uuid,
    state: AppState,
    out_tx: mpsc::Sender<ServerMsg>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
) {
    let gate = InputGate::new();
    let mut binding: Option<RoomHandle> = None;

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => {
                    dispatch(conn_id, &state, &out_tx, &gate, &mut binding, msg).await;
                }
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Transport-level disconnect: leave the bound room so the remaining
    // occupant is notified and an empty room is torn down
    if let Some(handle) = binding {
        let _ = handle.cmd_tx.send(RoomCommand::Leave { conn_id }).await;
    }
}

/// Route one inbound message to the appropriate registry/room operation
async fn dispatch(
    conn_id: Uuid,
    state: &AppState,
    out_tx: &mpsc::Sender<ServerMsg>,
    gate: &InputGate,
    binding: &mut Option<RoomHandle>,
    msg: ClientMsg,
) {
    match msg {
        ClientMsg::CreateRoom { player_name } => {
            if binding.is_some() {
                warn!(conn_id = %conn_id, "Create ignored, connection already in a room");
                return;
            }

            let handle = state.registry.create();
            match join_room(conn_id, &handle, player_name, out_tx).await {
                Ok(slot) => {
                    let _ = out_tx
                        .send(ServerMsg::RoomCreated {
                            room_id: handle.id.clone(),
                            player_number: slot,
                        })
                        .await;
                    *binding = Some(handle);
                }
                Err(e) => {
                    let _ = out_tx
                        .send(ServerMsg::JoinError {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }

        ClientMsg::JoinRoom {
            room_id,
            player_name,
        } => {
            if binding.is_some() {
                warn!(conn_id = %conn_id, "Join ignored, connection already in a room");
                return;
            }

            let result = match state.registry.get(&room_id) {
                Some(handle) => join_room(conn_id, &handle, player_name, out_tx)
                    .await
                    .map(|slot| (handle, slot)),
                None => Err(RoomError::NotFound),
            };

            match result {
                Ok((handle, slot)) => {
                    let _ = out_tx
                        .send(ServerMsg::RoomJoined {
                            room_id: handle.id.clone(),
                            player_number: slot,
                        })
                        .await;
                    *binding = Some(handle);
                }
                Err(e) => {
                    let _ = out_tx
                        .send(ServerMsg::JoinError {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }

        ClientMsg::StartGame { room_id } => {
            if let Some(handle) = state.registry.get(&room_id) {
                let _ = handle.cmd_tx.send(RoomCommand::Start).await;
            }
        }

        ClientMsg::PlayerInput { room_id, direction } => {
            // Throttled per connection; excess commands are dropped silently
            if !gate.check_input() {
                debug!(conn_id = %conn_id, "Input throttled");
                return;
            }

            if let Some(handle) = state.registry.get(&room_id) {
                let _ = handle
                    .cmd_tx
                    .send(RoomCommand::Input { conn_id, direction })
                    .await;
            }
        }

        ClientMsg::PauseGame { room_id } => {
            if let Some(handle) = state.registry.get(&room_id) {
                let _ = handle.cmd_tx.send(RoomCommand::TogglePause).await;
            }
        }

        ClientMsg::GetRooms => {
            let _ = out_tx
                .send(ServerMsg::RoomsList {
                    rooms: state.registry.joinable(),
                })
                .await;
        }
    }
}

/// Send a join command to a room task and await its decision
async fn join_room(
    conn_id: Uuid,
    handle: &RoomHandle,
    player_name: String,
    out_tx: &mpsc::Sender<ServerMsg>,
) -> Result<crate::ws::protocol::PlayerSlot, RoomError> {
    let (reply_tx, reply_rx) = oneshot::channel();

    handle
        .cmd_tx
        .send(RoomCommand::Join {
            conn_id,
            player_name,
            sender: out_tx.clone(),
            reply: reply_tx,
        })
        .await
        .map_err(|_| RoomError::NotFound)?;

    reply_rx.await.map_err(|_| RoomError::NotFound)?
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
