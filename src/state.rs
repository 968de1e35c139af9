//! Mode, button and motion state shared by readers and timers.
//!
//! Everything here is plain data; `Controller` keeps one instance behind a
//! single lock. Button helpers return whether the sink must be told, so a
//! press or release is emitted at most once per transition.

use std::time::SystemTime;

use crate::motion::{input_vector, Direction, MotionParams, Velocity};

/// Long-press detector phase for the toggle key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TogglePhase {
    #[default]
    Idle,
    /// Toggle key is down since `at` (event timestamp)
    Pressed { at: SystemTime },
}

/// Held flags for the four directions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldDirections {
    pub fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn held(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|&d| self.is_held(d))
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Buttons that were down when pointer mode ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldButtons {
    pub left: bool,
    pub right: bool,
}

/// Complete controller state
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub pointer_mode: bool,
    pub moving: HeldDirections,
    pub scrolling: HeldDirections,
    pub left_held: bool,
    pub right_held: bool,
    pub drag_active: bool,
    pub toggle: TogglePhase,
    pub velocity: Velocity,
    pub scroll_velocity: Velocity,
    pub pointer: MotionParams,
    pub scroll: MotionParams,
    /// Set once on shutdown; nothing is driven afterwards
    pub halted: bool,
}

impl ControllerState {
    pub fn new(pointer: MotionParams, scroll: MotionParams) -> Self {
        Self {
            pointer_mode: false,
            moving: HeldDirections::default(),
            scrolling: HeldDirections::default(),
            left_held: false,
            right_held: false,
            drag_active: false,
            toggle: TogglePhase::Idle,
            velocity: Velocity::ZERO,
            scroll_velocity: Velocity::ZERO,
            pointer,
            scroll,
            halted: false,
        }
    }

    /// Returns true if a left press must be emitted
    pub fn press_left(&mut self) -> bool {
        !std::mem::replace(&mut self.left_held, true)
    }

    /// Returns true if a left release must be emitted
    pub fn release_left(&mut self) -> bool {
        std::mem::replace(&mut self.left_held, false)
    }

    /// Flip the drag toggle, returning its new value
    pub fn flip_drag(&mut self) -> bool {
        self.drag_active = !self.drag_active;
        self.drag_active
    }

    /// Drop out of pointer mode and clear every held flag and velocity.
    ///
    /// Returns the buttons that were held and now need a release.
    pub fn leave_pointer_mode(&mut self) -> HeldButtons {
        self.pointer_mode = false;
        self.drag_active = false;
        self.moving.clear();
        self.scrolling.clear();
        self.velocity = Velocity::ZERO;
        self.scroll_velocity = Velocity::ZERO;
        HeldButtons {
            left: std::mem::replace(&mut self.left_held, false),
            right: std::mem::replace(&mut self.right_held, false),
        }
    }

    pub fn speed_up(&mut self) -> f64 {
        self.pointer.max_speed += 1.0;
        self.pointer.max_speed
    }

    /// Lower the pointer speed, never below 1
    pub fn speed_down(&mut self) -> f64 {
        self.pointer.max_speed = (self.pointer.max_speed - 1.0).max(1.0);
        self.pointer.max_speed
    }

    /// Pointer input vector from the held direction keys
    pub fn pointer_input(&self) -> Velocity {
        input_vector(
            self.moving.held(),
            Direction::pointer_unit,
            self.pointer.max_speed,
        )
    }

    /// Wheel input vector from the held scroll keys
    pub fn scroll_input(&self) -> Velocity {
        input_vector(
            self.scrolling.held(),
            Direction::wheel_unit,
            self.scroll.max_speed,
        )
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(MotionParams::pointer(), MotionParams::scroll())
    }
}
