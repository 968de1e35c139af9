//! Raw input events and interpretation results

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Linux input event types (linux/input-event-codes.h)
pub mod ev {
    pub const SYN: u16 = 0x00;
    pub const KEY: u16 = 0x01;
    pub const REL: u16 = 0x02;
    pub const MSC: u16 = 0x04;
}

/// Key event values
pub mod key_value {
    pub const RELEASE: i32 = 0;
    pub const PRESS: i32 = 1;
    pub const REPEAT: i32 = 2;
}

/// One event as read from a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub time: SystemTime,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(time: SystemTime, kind: u16, code: u16, value: i32) -> Self {
        Self {
            time,
            kind,
            code,
            value,
        }
    }

    /// Key event stamped `offset` after the Unix epoch (for tests and replays)
    pub fn key_at(offset: Duration, code: u16, value: i32) -> Self {
        Self::new(UNIX_EPOCH + offset, ev::KEY, code, value)
    }

    pub fn is_key(&self) -> bool {
        self.kind == ev::KEY
    }

    /// Time since `earlier`, zero if the clock went backwards
    pub fn elapsed_since(&self, earlier: SystemTime) -> Duration {
        self.time.duration_since(earlier).unwrap_or(Duration::ZERO)
    }
}

impl From<evdev::InputEvent> for RawEvent {
    fn from(event: evdev::InputEvent) -> Self {
        Self {
            time: event.timestamp(),
            kind: event.event_type().0,
            code: event.code(),
            value: event.value(),
        }
    }
}

impl From<RawEvent> for evdev::InputEvent {
    fn from(event: RawEvent) -> Self {
        let since_epoch = event.time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let raw = libc::input_event {
            time: libc::timeval {
                tv_sec: since_epoch.as_secs() as libc::time_t,
                tv_usec: since_epoch.subsec_micros() as libc::suseconds_t,
            },
            type_: event.kind,
            code: event.code,
            value: event.value,
        };
        evdev::InputEvent::from(raw)
    }
}

/// What happens to a physical event after interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Consumed; only internal state changed
    Suppress,
    /// Forward the original event to the virtual keyboard unchanged
    PassThrough,
}
