//! Outbound message builders for simulation state

use crate::ws::protocol::{PlayerSlot, ServerMsg};

use super::physics::Board;

/// Full state snapshot, broadcast every tick while the driver is armed
pub fn game_update(board: &Board, timestamp: u64) -> ServerMsg {
    ServerMsg::GameUpdate {
        ball: board.ball,
        paddles: board.paddles,
        timestamp,
    }
}

/// Score message for a scoring tick
pub fn score_update(board: &Board) -> ServerMsg {
    ServerMsg::ScoreUpdate {
        player1: board.scores.player1,
        player2: board.scores.player2,
    }
}

/// Immediate paddle echo after an accepted input
pub fn paddle_update(slot: PlayerSlot, y: f32, timestamp: u64) -> ServerMsg {
    ServerMsg::PaddleUpdate {
        player_number: slot,
        y,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_update_carries_board_state() {
        let mut board = Board::new();
        board.ball.x = 123.0;
        board.paddles.player2.y = 88.0;

        match game_update(&board, 1000) {
            ServerMsg::GameUpdate {
                ball,
                paddles,
                timestamp,
            } => {
                assert_eq!(ball.x, 123.0);
                assert_eq!(paddles.player2.y, 88.0);
                assert_eq!(timestamp, 1000);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn score_update_carries_both_scores() {
        let mut board = Board::new();
        board.scores.player1 = 2;
        board.scores.player2 = 5;

        match score_update(&board) {
            ServerMsg::ScoreUpdate { player1, player2 } => {
                assert_eq!(player1, 2);
                assert_eq!(player2, 5);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
