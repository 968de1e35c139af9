//! Keypad-to-mouse translator
//!
//! Long-pressing a toggle key on a feature-phone keypad (or a compact laptop
//! keyboard) switches it into pointer mode: the directional keys then drive a
//! virtual mouse with accelerated, inertial motion, and other keys click,
//! drag and scroll. Outside pointer mode every key passes through unchanged
//! to a virtual keyboard.

pub mod config;
pub mod controller;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod keymap;
pub mod motion;
pub mod sink;
pub mod state;
pub mod uinput;

pub use config::{Config, TimingConfig};
pub use controller::{Controller, ControllerOptions, LONG_PRESS, WIGGLE_PAUSE};
pub use dispatch::{DispatchConfig, DispatchHandle, EventSource, ReaderExit};
pub use error::{ConfigError, DeviceError, Error, KeymapError, ReadError, SinkError};
pub use event::{Disposition, RawEvent};
pub use keymap::{classify, KeyMapCatalog, KeyMapping, KeyboardType};
pub use motion::{integrate, Direction, MotionParams, Velocity};
pub use sink::{KeySink, PointerSink};
