//! Board physics: ball advancement, paddle movement, collision and scoring
//!
//! Pure functions over a [`Board`]; the only nondeterminism is the RNG used
//! for the diagonal direction after a ball reset.

use rand::Rng;

use crate::ws::protocol::{BallState, Direction, PaddleState, Paddles, PlayerSlot, Scores};

/// Logical board dimensions (server-authoritative)
pub const BOARD_WIDTH: f32 = 800.0;
pub const BOARD_HEIGHT: f32 = 400.0;

pub const BALL_RADIUS: f32 = 8.0;
pub const BALL_BASE_SPEED: f32 = 4.0;
/// Nominal speed gained on each paddle hit (no cap)
pub const BALL_SPEED_INCREMENT: f32 = 0.3;
/// Scales the hit-offset contribution to `dy` after a paddle hit
pub const BALL_SPIN_FACTOR: f32 = 0.5;

pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
/// Paddle movement per accepted input command
pub const PADDLE_SPEED: f32 = 7.0;
pub const PADDLE_LEFT_X: f32 = 20.0;
pub const PADDLE_RIGHT_X: f32 = 770.0;
pub const PADDLE_START_Y: f32 = 150.0;

/// The simulated playing field for one room
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub ball: BallState,
    pub paddles: Paddles,
    pub scores: Scores,
}

impl Board {
    pub fn new() -> Self {
        Self {
            ball: BallState {
                x: BOARD_WIDTH / 2.0,
                y: BOARD_HEIGHT / 2.0,
                dx: BALL_BASE_SPEED,
                dy: BALL_BASE_SPEED,
                radius: BALL_RADIUS,
                speed: BALL_BASE_SPEED,
            },
            paddles: Paddles {
                player1: PaddleState {
                    x: PADDLE_LEFT_X,
                    y: PADDLE_START_Y,
                    width: PADDLE_WIDTH,
                    height: PADDLE_HEIGHT,
                },
                player2: PaddleState {
                    x: PADDLE_RIGHT_X,
                    y: PADDLE_START_Y,
                    width: PADDLE_WIDTH,
                    height: PADDLE_HEIGHT,
                },
            },
            scores: Scores::default(),
        }
    }

    pub fn paddle(&self, slot: PlayerSlot) -> &PaddleState {
        match slot {
            PlayerSlot::Player1 => &self.paddles.player1,
            PlayerSlot::Player2 => &self.paddles.player2,
        }
    }

    pub fn paddle_mut(&mut self, slot: PlayerSlot) -> &mut PaddleState {
        match slot {
            PlayerSlot::Player1 => &mut self.paddles.player1,
            PlayerSlot::Player2 => &mut self.paddles.player2,
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the ball by one tick. Returns the scoring slot if this tick scored.
///
/// Wall reflection, the left paddle test, and the right paddle test are
/// independent checks and may fire in the same tick. At most one score event
/// occurs per tick; scoring resets the ball.
pub fn advance_ball(board: &mut Board, rng: &mut impl Rng) -> Option<PlayerSlot> {
    board.ball.x += board.ball.dx;
    board.ball.y += board.ball.dy;

    // Bounce off top and bottom walls
    if board.ball.y - board.ball.radius <= 0.0 || board.ball.y + board.ball.radius >= BOARD_HEIGHT {
        board.ball.dy = -board.ball.dy;
    }

    // Left paddle: ball moving left, leading edge inside the paddle x-band
    let p1 = board.paddles.player1;
    if board.ball.dx < 0.0
        && board.ball.x - board.ball.radius <= p1.x + p1.width
        && board.ball.x - board.ball.radius >= p1.x
        && board.ball.y >= p1.y
        && board.ball.y <= p1.y + p1.height
    {
        deflect(&mut board.ball, &p1);
    }

    // Right paddle: ball moving right, leading edge inside the paddle x-band
    let p2 = board.paddles.player2;
    if board.ball.dx > 0.0
        && board.ball.x + board.ball.radius >= p2.x
        && board.ball.x + board.ball.radius <= p2.x + p2.width
        && board.ball.y >= p2.y
        && board.ball.y <= p2.y + p2.height
    {
        deflect(&mut board.ball, &p2);
    }

    // Scoring: past the left edge the right player scores, and vice versa
    if board.ball.x < 0.0 {
        board.scores.player2 += 1;
        reset_ball(board, rng);
        Some(PlayerSlot::Player2)
    } else if board.ball.x > BOARD_WIDTH {
        board.scores.player1 += 1;
        reset_ball(board, rng);
        Some(PlayerSlot::Player1)
    } else {
        None
    }
}

/// Reverse the ball off a paddle, raising the nominal speed and angling `dy`
/// by the normalized hit offset. `dx` is rescaled to ±speed but `dy` is set
/// independently, so `speed` is not the velocity norm after angled hits.
fn deflect(ball: &mut BallState, paddle: &PaddleState) {
    ball.dx = -ball.dx;
    ball.speed += BALL_SPEED_INCREMENT;
    ball.dx = if ball.dx > 0.0 { ball.speed } else { -ball.speed };

    let hit_offset = (ball.y - (paddle.y + paddle.height / 2.0)) / (paddle.height / 2.0);
    ball.dy = hit_offset * ball.speed * BALL_SPIN_FACTOR;
}

/// Move a paddle one step in `direction`, clamped to the board
pub fn move_paddle(paddle: &mut PaddleState, direction: Direction) {
    match direction {
        Direction::Up => paddle.y = (paddle.y - PADDLE_SPEED).max(0.0),
        Direction::Down => paddle.y = (paddle.y + PADDLE_SPEED).min(BOARD_HEIGHT - PADDLE_HEIGHT),
    }
}

/// Recenter the ball with a fresh random diagonal direction and base speed.
/// Each axis sign is drawn independently. Scores are untouched.
pub fn reset_ball(board: &mut Board, rng: &mut impl Rng) {
    let dx_sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let dy_sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };

    board.ball = BallState {
        x: BOARD_WIDTH / 2.0,
        y: BOARD_HEIGHT / 2.0,
        dx: dx_sign * BALL_BASE_SPEED,
        dy: dy_sign * BALL_BASE_SPEED,
        radius: BALL_RADIUS,
        speed: BALL_BASE_SPEED,
    };
}
