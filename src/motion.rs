//! Velocity integration for pointer and scroll motion
//!
//! Turns held digital directions into analog-feeling motion: velocity ramps
//! up while a direction is held, is capped on its Euclidean magnitude, and
//! decays by friction once released until the dead zone snaps it to zero.

use serde::Serialize;

/// Per-axis magnitude below which velocity snaps to exactly zero
pub const DEAD_ZONE: f64 = 0.1;

/// Four-way direction shared by pointer and scroll keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector in screen coordinates (y grows downwards)
    pub fn pointer_unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    /// Unit vector in wheel coordinates (positive = up / left)
    pub fn wheel_unit(self) -> (f64, f64) {
        let (x, y) = self.pointer_unit();
        (-x, -y)
    }
}

/// Two-axis velocity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Tunable physics for one kind of motion
///
/// Deserialized through the config's per-section overrides, so unset keys
/// keep the pointer or scroll defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionParams {
    /// Base speed; also the per-direction input magnitude
    pub max_speed: f64,
    /// Scales the speed cap
    pub speed_multiplier: f64,
    /// Fraction of the input added to velocity per tick
    pub acceleration: f64,
    /// Per-tick decay factor with no input, in (0, 1)
    pub friction: f64,
}

impl MotionParams {
    /// Cursor movement defaults
    pub fn pointer() -> Self {
        Self {
            max_speed: 4.0,
            speed_multiplier: 1.0,
            acceleration: 0.3,
            friction: 0.85,
        }
    }

    /// Wheel defaults
    pub fn scroll() -> Self {
        Self {
            max_speed: 30.0,
            ..Self::pointer()
        }
    }

    /// Upper bound on velocity magnitude
    pub fn speed_cap(&self) -> f64 {
        self.max_speed * self.speed_multiplier
    }

    /// Upper bound on the number of idle ticks needed to come to rest
    /// from `speed`.
    pub fn ticks_to_rest(&self, speed: f64) -> u32 {
        if speed < DEAD_ZONE {
            return 0;
        }
        ((DEAD_ZONE / speed).ln() / self.friction.ln()).ceil() as u32 + 1
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self::pointer()
    }
}

/// Sum the unit vectors of all held directions, scaled by `magnitude`.
///
/// Opposite directions cancel.
pub fn input_vector(
    held: impl IntoIterator<Item = Direction>,
    unit: fn(Direction) -> (f64, f64),
    magnitude: f64,
) -> Velocity {
    held.into_iter().fold(Velocity::ZERO, |acc, dir| {
        let (x, y) = unit(dir);
        Velocity::new(acc.x + x * magnitude, acc.y + y * magnitude)
    })
}

/// Advance velocity by one tick
pub fn integrate(input: Velocity, velocity: Velocity, params: &MotionParams) -> Velocity {
    let x = step_axis(input.x, velocity.x, params);
    let y = step_axis(input.y, velocity.y, params);
    let mut next = Velocity::new(x, y);

    // Rescale rather than clamp per axis so diagonals keep their direction
    let cap = params.speed_cap();
    let speed = next.magnitude();
    if speed > cap {
        let scale = cap / speed;
        next.x *= scale;
        next.y *= scale;
    }

    Velocity::new(snap(next.x), snap(next.y))
}

fn step_axis(input: f64, velocity: f64, params: &MotionParams) -> f64 {
    if input != 0.0 {
        velocity + input * params.acceleration
    } else {
        velocity * params.friction
    }
}

fn snap(v: f64) -> f64 {
    if v.abs() < DEAD_ZONE {
        0.0
    } else {
        v
    }
}
