//! Virtual output sinks
//!
//! The controller drives a pointer sink (motion, buttons, wheel) and a key
//! sink (verbatim forwarding of passed-through events). The uinput-backed
//! implementations live in [`crate::uinput`]; [`testing`] has recording fakes.

use crate::error::SinkError;
use crate::event::RawEvent;

/// Virtual mouse
pub trait PointerSink: Send {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError>;
    fn left_press(&mut self) -> Result<(), SinkError>;
    fn left_release(&mut self) -> Result<(), SinkError>;
    fn right_press(&mut self) -> Result<(), SinkError>;
    fn right_release(&mut self) -> Result<(), SinkError>;
    fn wheel(&mut self, horizontal: bool, amount: i32) -> Result<(), SinkError>;
}

/// Virtual keyboard
pub trait KeySink: Send {
    /// Forward an event exactly as it was read
    fn send_raw(&mut self, event: &RawEvent) -> Result<(), SinkError>;
    /// Press a key that was swallowed earlier
    fn key_down(&mut self, code: u16) -> Result<(), SinkError>;
}

/// Recording sinks for tests and dry runs
pub mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// One call made on a [`RecordingPointer`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PointerCommand {
        Move(i32, i32),
        LeftPress,
        LeftRelease,
        RightPress,
        RightRelease,
        Wheel { horizontal: bool, amount: i32 },
    }

    /// Pointer sink that logs every call. Clones share the log.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingPointer {
        log: Arc<Mutex<Vec<PointerCommand>>>,
    }

    impl RecordingPointer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn commands(&self) -> Vec<PointerCommand> {
            self.log.lock().clone()
        }

        /// Horizontal/vertical deltas of every `Move`, in order
        pub fn moves(&self) -> Vec<(i32, i32)> {
            self.log
                .lock()
                .iter()
                .filter_map(|c| match *c {
                    PointerCommand::Move(dx, dy) => Some((dx, dy)),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, command: PointerCommand) -> usize {
            self.log.lock().iter().filter(|&&c| c == command).count()
        }

        pub fn clear(&self) {
            self.log.lock().clear();
        }

        fn push(&self, command: PointerCommand) -> Result<(), SinkError> {
            self.log.lock().push(command);
            Ok(())
        }
    }

    impl PointerSink for RecordingPointer {
        fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
            self.push(PointerCommand::Move(dx, dy))
        }

        fn left_press(&mut self) -> Result<(), SinkError> {
            self.push(PointerCommand::LeftPress)
        }

        fn left_release(&mut self) -> Result<(), SinkError> {
            self.push(PointerCommand::LeftRelease)
        }

        fn right_press(&mut self) -> Result<(), SinkError> {
            self.push(PointerCommand::RightPress)
        }

        fn right_release(&mut self) -> Result<(), SinkError> {
            self.push(PointerCommand::RightRelease)
        }

        fn wheel(&mut self, horizontal: bool, amount: i32) -> Result<(), SinkError> {
            self.push(PointerCommand::Wheel { horizontal, amount })
        }
    }

    /// One call made on a [`RecordingKeys`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum KeyCommand {
        Raw(RawEvent),
        Down(u16),
    }

    /// Key sink that logs every call. Clones share the log.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingKeys {
        log: Arc<Mutex<Vec<KeyCommand>>>,
    }

    impl RecordingKeys {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn commands(&self) -> Vec<KeyCommand> {
            self.log.lock().clone()
        }

        pub fn is_empty(&self) -> bool {
            self.log.lock().is_empty()
        }
    }

    impl KeySink for RecordingKeys {
        fn send_raw(&mut self, event: &RawEvent) -> Result<(), SinkError> {
            self.log.lock().push(KeyCommand::Raw(*event));
            Ok(())
        }

        fn key_down(&mut self, code: u16) -> Result<(), SinkError> {
            self.log.lock().push(KeyCommand::Down(code));
            Ok(())
        }
    }
}
