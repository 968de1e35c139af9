//! Event interpretation and motion output
//!
//! `Controller` owns the key map catalog, the shared state and both sinks.
//! Device readers call [`Controller::interpret`] for every physical event;
//! the dispatch timers call [`Controller::pointer_tick`] and
//! [`Controller::scroll_tick`]. State and the pointer sink share one lock, so
//! a drag-toggle press can never interleave with a motion tick.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{KeymapError, SinkError};
use crate::event::{key_value, Disposition, RawEvent};
use crate::keymap::{KeyAction, KeyMapCatalog, KeyboardType};
use crate::motion::{integrate, MotionParams, Velocity};
use crate::sink::{KeySink, PointerSink};
use crate::state::{ControllerState, HeldButtons, TogglePhase};

/// Hold time above which the toggle key switches pointer mode
pub const LONG_PRESS: Duration = Duration::from_millis(225);

/// Pause between the two halves of the mode-entry wiggle
pub const WIGGLE_PAUSE: Duration = Duration::from_millis(50);

/// Tunables fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerOptions {
    pub long_press: Duration,
    pub wiggle_pause: Duration,
    pub pointer: MotionParams,
    pub scroll: MotionParams,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            long_press: LONG_PRESS,
            wiggle_pause: WIGGLE_PAUSE,
            pointer: MotionParams::pointer(),
            scroll: MotionParams::scroll(),
        }
    }
}

struct Inner {
    state: ControllerState,
    pointer: Box<dyn PointerSink>,
}

impl Inner {
    fn release_buttons(&mut self, held: HeldButtons) {
        if held.left {
            report(self.pointer.left_release(), "left release");
        }
        if held.right {
            report(self.pointer.right_release(), "right release");
        }
    }

    fn exit_pointer_mode(&mut self) {
        let held = self.state.leave_pointer_mode();
        self.release_buttons(held);
    }

    fn press_left(&mut self) {
        if self.state.press_left() {
            report(self.pointer.left_press(), "left press");
        }
    }

    fn release_left(&mut self) {
        if self.state.release_left() {
            report(self.pointer.left_release(), "left release");
        }
    }
}

/// Keypad-to-mouse translator
pub struct Controller {
    catalog: KeyMapCatalog,
    long_press: Duration,
    wiggle_pause: Duration,
    inner: Mutex<Inner>,
    keys: Mutex<Box<dyn KeySink>>,
}

impl Controller {
    /// Build a controller. Fails if the catalog has no default mapping.
    pub fn new(
        catalog: KeyMapCatalog,
        options: ControllerOptions,
        pointer: Box<dyn PointerSink>,
        keys: Box<dyn KeySink>,
    ) -> Result<Self, KeymapError> {
        catalog.validate()?;
        Ok(Self {
            catalog,
            long_press: options.long_press,
            wiggle_pause: options.wiggle_pause,
            inner: Mutex::new(Inner {
                state: ControllerState::new(options.pointer, options.scroll),
                pointer,
            }),
            keys: Mutex::new(keys),
        })
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ControllerState {
        self.inner.lock().state.clone()
    }

    pub fn is_pointer_mode(&self) -> bool {
        self.inner.lock().state.pointer_mode
    }

    pub fn is_halted(&self) -> bool {
        self.inner.lock().state.halted
    }

    /// Decide what happens to one physical event and apply its side effects.
    ///
    /// May sleep for the wiggle pause when pointer mode is entered, so call
    /// it from a blocking context.
    pub fn interpret(&self, event: &RawEvent, kind: KeyboardType) -> Disposition {
        if !event.is_key() {
            return Disposition::PassThrough;
        }
        // validate() in new() guarantees a mapping
        let Some(mapping) = self.catalog.lookup(kind) else {
            return Disposition::PassThrough;
        };
        let action = mapping.action_for(event.code);

        let mut inner = self.inner.lock();
        if inner.state.halted {
            return Disposition::PassThrough;
        }

        match action {
            Some(KeyAction::Toggle) => return self.handle_toggle(inner, event),
            Some(KeyAction::Exit) if inner.state.pointer_mode => {
                info!("Exit key pressed, leaving pointer mode");
                inner.exit_pointer_mode();
                return Disposition::PassThrough;
            }
            _ => {}
        }

        if !inner.state.pointer_mode {
            return Disposition::PassThrough;
        }

        let pressed = event.value == key_value::PRESS;
        match action {
            None | Some(KeyAction::Exit) | Some(KeyAction::Toggle) => {
                return Disposition::PassThrough;
            }
            Some(KeyAction::Click) => {
                // While dragging the drag toggle owns the left button
                if !inner.state.drag_active {
                    match event.value {
                        key_value::PRESS => inner.press_left(),
                        key_value::RELEASE => inner.release_left(),
                        _ => {}
                    }
                }
            }
            Some(KeyAction::SpeedUp) if pressed => {
                let speed = inner.state.speed_up();
                info!("Pointer speed increased to {:.1}", speed);
            }
            Some(KeyAction::SpeedDown) if pressed => {
                let speed = inner.state.speed_down();
                info!("Pointer speed decreased to {:.1}", speed);
            }
            Some(KeyAction::Drag) if pressed => {
                if inner.state.flip_drag() {
                    info!("Drag mode activated");
                    inner.press_left();
                } else {
                    info!("Drag mode deactivated");
                    inner.release_left();
                }
            }
            Some(KeyAction::SpeedUp | KeyAction::SpeedDown | KeyAction::Drag) => {}
            Some(KeyAction::Move(direction)) => {
                inner.state.moving.set(direction, event.value != 0);
            }
            Some(KeyAction::Scroll(direction)) => {
                inner.state.scrolling.set(direction, event.value != 0);
            }
        }
        Disposition::Suppress
    }

    fn handle_toggle(
        &self,
        mut inner: parking_lot::MutexGuard<'_, Inner>,
        event: &RawEvent,
    ) -> Disposition {
        match (event.value, inner.state.toggle) {
            // A fresh press restarts the hold even if its release got lost
            (key_value::PRESS, _) => {
                inner.state.toggle = TogglePhase::Pressed { at: event.time };
                Disposition::Suppress
            }
            (key_value::RELEASE, TogglePhase::Pressed { at }) => {
                inner.state.toggle = TogglePhase::Idle;
                let held = event.elapsed_since(at);
                if held > self.long_press {
                    debug!("Long press detected ({:?})", held);
                    if inner.state.pointer_mode {
                        info!("Pointer mode off");
                        inner.exit_pointer_mode();
                    } else {
                        info!("Pointer mode on");
                        inner.state.pointer_mode = true;
                        inner.state.velocity = Velocity::ZERO;
                        inner.state.scroll_velocity = Velocity::ZERO;
                        self.wiggle(inner);
                    }
                    Disposition::Suppress
                } else {
                    drop(inner);
                    // The press was swallowed; replay it before the release goes out
                    report(self.keys.lock().key_down(event.code), "toggle key replay");
                    Disposition::PassThrough
                }
            }
            // Release without a press we saw (e.g. held across startup)
            (key_value::RELEASE, TogglePhase::Idle) => Disposition::PassThrough,
            // Auto-repeat
            _ => Disposition::Suppress,
        }
    }

    /// Nudge the cursor right and back so the mode change is visible
    fn wiggle<'a>(&'a self, mut inner: parking_lot::MutexGuard<'a, Inner>) {
        let amount = inner.state.pointer.max_speed as i32;
        report(inner.pointer.move_by(amount, 0), "wiggle");
        if !self.wiggle_pause.is_zero() {
            drop(inner);
            std::thread::sleep(self.wiggle_pause);
            inner = self.inner.lock();
        }
        if !inner.state.halted {
            report(inner.pointer.move_by(-amount, 0), "wiggle");
        }
    }

    /// Forward an event to the virtual keyboard unchanged
    pub fn forward(&self, event: &RawEvent) {
        report(self.keys.lock().send_raw(event), "pass-through");
    }

    /// One pointer-motion frame. Returns the new velocity if it moved.
    pub fn pointer_tick(&self) -> Option<Velocity> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state.halted {
            return None;
        }
        if !inner.state.pointer_mode {
            inner.state.velocity = Velocity::ZERO;
            return None;
        }

        let input = inner.state.pointer_input();
        let velocity = integrate(input, inner.state.velocity, &inner.state.pointer);
        inner.state.velocity = velocity;
        if velocity.is_zero() {
            return None;
        }

        let (dx, dy) = (velocity.x.round() as i32, velocity.y.round() as i32);
        if dx != 0 || dy != 0 {
            report(inner.pointer.move_by(dx, dy), "move");
        }
        Some(velocity)
    }

    /// One scroll frame. Returns the new wheel velocity if it scrolled.
    pub fn scroll_tick(&self) -> Option<Velocity> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state.halted {
            return None;
        }
        if !inner.state.pointer_mode {
            inner.state.scroll_velocity = Velocity::ZERO;
            return None;
        }

        let input = inner.state.scroll_input();
        let velocity = integrate(input, inner.state.scroll_velocity, &inner.state.scroll);
        inner.state.scroll_velocity = velocity;
        if velocity.is_zero() {
            return None;
        }

        let vertical = velocity.y.round() as i32;
        if vertical != 0 {
            report(inner.pointer.wheel(false, vertical), "wheel");
        }
        let horizontal = velocity.x.round() as i32;
        if horizontal != 0 {
            report(inner.pointer.wheel(true, horizontal), "horizontal wheel");
        }
        Some(velocity)
    }

    /// Release held buttons and stop driving output. Later calls do nothing.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if inner.state.halted {
            return;
        }
        inner.state.halted = true;
        inner.state.toggle = TogglePhase::Idle;
        inner.exit_pointer_mode();
        info!("Controller halted");
    }
}

fn report(result: Result<(), SinkError>, what: &str) {
    if let Err(e) = result {
        warn!("Virtual device {} failed: {}", what, e);
    }
}
