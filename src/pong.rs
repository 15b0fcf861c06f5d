//! Two-player Pong for the wall, steered by the rotary encoders.
//!
//! The field spans the whole frame: lines along the top and bottom rows and a centre
//! line. Each player has a 5-pixel paddle on their edge of the wall. Missing the ball
//! scores a point for the other player; the first to [`WINNING_SCORE`] ends the match
//! and the scores start over.
//!
//! ```rust
//! use led_wall::frame::Frame2d;
//! use led_wall::pong::Pong;
//!
//! let mut pong = Pong::<48, 32>::new();
//! let mut frame = Frame2d::<48, 32>::new();
//! pong.update(0.02, 1, -1);
//! pong.draw(&mut frame);
//! assert_eq!(pong.scores(), [0, 0]);
//! ```

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{Point, Primitive};
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::Drawable;
use smart_leds::RGB8;

use crate::frame::{Align, Frame2d, rgb8_to_rgb888};

/// Field lines.
pub const COLOR_FIELD: RGB8 = RGB8::new(255, 255, 128);
/// The ball.
pub const COLOR_BALL: RGB8 = RGB8::new(255, 255, 64);
/// Both paddles.
pub const COLOR_PADDLE: RGB8 = RGB8::new(255, 255, 255);
/// Score digits.
pub const COLOR_SCORE: RGB8 = RGB8::new(48, 48, 48);

/// Points that end a match.
pub const WINNING_SCORE: u32 = 9;

/// Paddle travel per encoder detent, in pixels.
pub const PADDLE_SPEED: f32 = 0.25;

/// Pixels above and below a paddle's centre.
pub const PADDLE_HALF_LENGTH: f32 = 2.0;

/// Ball velocity at every serve, in pixels per second (x toward the right player).
pub const SERVE_VELOCITY: Vec2 = Vec2::new(20.0, 16.0);

// Deflection per pixel of distance from the paddle centre.
const DEFLECTION_DEGREES_PER_PIXEL: f32 = 5.0;

const SCORE_TOP: i32 = 2;

/// A position or velocity in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    /// Horizontal, increasing to the right.
    pub x: f32,
    /// Vertical, increasing downward.
    pub y: f32,
}

impl Vec2 {
    /// A new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rotate by `angle` radians.
    #[must_use]
    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = (libm::sinf(angle), libm::cosf(angle));
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

/// The two players, left first.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    /// Paddle on the left edge, steered by encoder 1.
    Left,
    /// Paddle on the right edge, steered by encoder 2.
    Right,
}

impl Side {
    const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// The ball, with where it was last frame for crossing tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    /// Position now.
    pub now: Vec2,
    /// Position before the latest update.
    pub prev: Vec2,
    /// Pixels per second.
    pub velocity: Vec2,
}

impl Ball {
    fn step(&mut self, dt_s: f32) {
        self.prev = self.now;
        self.now.x += self.velocity.x * dt_s;
        self.now.y += self.velocity.y * dt_s;
    }
}

/// A vertical paddle; `y` is its centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paddle {
    /// Column the paddle lives in.
    pub x: f32,
    /// Centre row.
    pub y: f32,
}

/// Bounce `ball` off `paddle` if it crossed the paddle's face this frame.
///
/// The face is one pixel in front of the paddle column. A hit within
/// [`PADDLE_HALF_LENGTH`] of the centre reverses `x` and turns the ball by 5° per
/// pixel of offset; the turn is skipped if it would send the ball back toward the
/// paddle. Returns `true` on a hit.
pub fn check_paddle_collision(ball: &mut Ball, paddle: &Paddle, side: Side) -> bool {
    let crossed = match side {
        Side::Left => ball.now.x < paddle.x + 1.0 && ball.prev.x >= paddle.x + 1.0,
        Side::Right => ball.now.x > paddle.x - 1.0 && ball.prev.x <= paddle.x - 1.0,
    };
    if !crossed {
        return false;
    }

    let offset_y = ball.now.y - paddle.y;
    if !(-PADDLE_HALF_LENGTH..=PADDLE_HALF_LENGTH).contains(&offset_y) {
        return false;
    }

    let reversed = Vec2::new(-ball.velocity.x, ball.velocity.y);
    let deflected = reversed.rotated((offset_y * DEFLECTION_DEGREES_PER_PIXEL).to_radians());
    let heads_back = match side {
        Side::Left => deflected.x <= 0.0,
        Side::Right => deflected.x >= 0.0,
    };
    ball.velocity = if heads_back { reversed } else { deflected };
    true
}

/// Game state for a `W × H` wall.
#[derive(Clone, Debug, PartialEq)]
pub struct Pong<const W: usize, const H: usize> {
    ball: Ball,
    paddles: [Paddle; 2],
    scores: [u32; 2],
}

impl<const W: usize, const H: usize> Pong<W, H> {
    const RIGHT: f32 = (W - 1) as f32;
    const BOTTOM: f32 = (H - 1) as f32;

    /// Ball at the centre heading right, paddles centred, 0:0.
    #[must_use]
    pub fn new() -> Self {
        const { assert!(W >= 8 && H >= 8, "field is too small to play on") };
        Self {
            ball: Self::serve(SERVE_VELOCITY),
            paddles: [
                Paddle {
                    x: 0.0,
                    y: Self::BOTTOM / 2.0,
                },
                Paddle {
                    x: Self::RIGHT,
                    y: Self::BOTTOM / 2.0,
                },
            ],
            scores: [0, 0],
        }
    }

    fn serve(velocity: Vec2) -> Ball {
        let centre = Vec2::new(Self::RIGHT / 2.0, Self::BOTTOM / 2.0);
        Ball {
            now: centre,
            prev: centre,
            velocity,
        }
    }

    /// Advance by `dt_s` seconds with the encoder deltas read this frame.
    pub fn update(&mut self, dt_s: f32, left_delta: i32, right_delta: i32) {
        self.move_paddle(Side::Left, left_delta);
        self.move_paddle(Side::Right, right_delta);

        self.ball.step(dt_s);
        if self.ball.now.y < 0.0 {
            self.ball.now.y = 0.0;
            self.ball.velocity.y = -self.ball.velocity.y;
        }
        if self.ball.now.y > Self::BOTTOM {
            self.ball.now.y = Self::BOTTOM;
            self.ball.velocity.y = -self.ball.velocity.y;
        }

        for side in [Side::Left, Side::Right] {
            check_paddle_collision(&mut self.ball, &self.paddles[side.index()], side);
        }

        if self.ball.now.x < 0.0 {
            self.point_to(Side::Right);
        } else if self.ball.now.x > Self::RIGHT {
            self.point_to(Side::Left);
        }
    }

    fn move_paddle(&mut self, side: Side, delta: i32) {
        let paddle = &mut self.paddles[side.index()];
        paddle.y = (paddle.y + delta as f32 * PADDLE_SPEED).clamp(0.0, Self::BOTTOM);
    }

    fn point_to(&mut self, scorer: Side) {
        self.scores[scorer.index()] += 1;
        info!("score {}:{}", self.scores[0], self.scores[1]);
        if self.scores.iter().any(|&score| score >= WINNING_SCORE) {
            info!("match over");
            self.scores = [0, 0];
        }
        // The player who conceded receives the serve.
        let toward_loser = match scorer {
            Side::Left => SERVE_VELOCITY,
            Side::Right => Vec2::new(-SERVE_VELOCITY.x, SERVE_VELOCITY.y),
        };
        self.ball = Self::serve(toward_loser);
    }

    /// Draw field, scores, ball and paddles on top of `frame`.
    pub fn draw(&self, frame: &mut Frame2d<W, H>) {
        let right = W as i32 - 1;
        let bottom = H as i32 - 1;
        let centre_x = right / 2;
        let field = PrimitiveStyle::with_stroke(rgb8_to_rgb888(COLOR_FIELD), 1);

        for line in [
            Line::new(Point::new(0, 0), Point::new(right, 0)),
            Line::new(Point::new(0, bottom), Point::new(right, bottom)),
            Line::new(Point::new(centre_x, 0), Point::new(centre_x, bottom)),
        ] {
            let Ok(()) = line.into_styled(field).draw(frame);
        }

        frame.draw_3x5_number(self.scores[0], centre_x - 1, SCORE_TOP, COLOR_SCORE, Align::Right);
        frame.draw_3x5_number(self.scores[1], centre_x + 1, SCORE_TOP, COLOR_SCORE, Align::Left);

        let paddle_style = PrimitiveStyle::<Rgb888>::with_stroke(rgb8_to_rgb888(COLOR_PADDLE), 1);
        for paddle in &self.paddles {
            let x = paddle.x as i32;
            let y = paddle.y as i32;
            let half = PADDLE_HALF_LENGTH as i32;
            let Ok(()) = Line::new(Point::new(x, y - half), Point::new(x, y + half))
                .into_styled(paddle_style)
                .draw(frame);
        }

        frame.set_pixel(self.ball.now.x as i32, self.ball.now.y as i32, COLOR_BALL);
    }

    /// Points so far, left first.
    #[must_use]
    pub const fn scores(&self) -> [u32; 2] {
        self.scores
    }

    /// The ball.
    #[must_use]
    pub const fn ball(&self) -> &Ball {
        &self.ball
    }

    /// Mutable ball, for setting up situations.
    pub const fn ball_mut(&mut self) -> &mut Ball {
        &mut self.ball
    }

    /// One player's paddle.
    #[must_use]
    pub const fn paddle(&self, side: Side) -> &Paddle {
        &self.paddles[side.index()]
    }
}

impl<const W: usize, const H: usize> Default for Pong<W, H> {
    fn default() -> Self {
        Self::new()
    }
}
