//! Virtual mouse and keyboard devices using evdev/uinput

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AttributeSet, EventType, InputEvent, Key, RelativeAxisType,
};

use crate::error::SinkError;
use crate::event::{key_value, RawEvent};
use crate::sink::{KeySink, PointerSink};

/// Relative-motion mouse with left/right buttons and both wheels
pub struct VirtualPointer {
    device: VirtualDevice,
}

impl VirtualPointer {
    pub fn new(name: &str) -> Result<Self, SinkError> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_LEFT);
        keys.insert(Key::BTN_RIGHT);

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(SinkError::CreateDevice)?
            .name(name)
            .with_keys(&keys)
            .map_err(SinkError::CreateDevice)?
            .with_relative_axes(&axes)
            .map_err(SinkError::CreateDevice)?
            .build()
            .map_err(SinkError::CreateDevice)?;

        Ok(Self { device })
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<(), SinkError> {
        self.device.emit(events).map_err(SinkError::EmitEvent)
    }

    fn button(&mut self, key: Key, value: i32) -> Result<(), SinkError> {
        self.emit(&[InputEvent::new(EventType::KEY, key.code(), value)])
    }
}

fn rel(axis: RelativeAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE, axis.0, value)
}

impl PointerSink for VirtualPointer {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(rel(RelativeAxisType::REL_X, dx));
        }
        if dy != 0 {
            events.push(rel(RelativeAxisType::REL_Y, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.emit(&events)
    }

    fn left_press(&mut self) -> Result<(), SinkError> {
        self.button(Key::BTN_LEFT, key_value::PRESS)
    }

    fn left_release(&mut self) -> Result<(), SinkError> {
        self.button(Key::BTN_LEFT, key_value::RELEASE)
    }

    fn right_press(&mut self) -> Result<(), SinkError> {
        self.button(Key::BTN_RIGHT, key_value::PRESS)
    }

    fn right_release(&mut self) -> Result<(), SinkError> {
        self.button(Key::BTN_RIGHT, key_value::RELEASE)
    }

    fn wheel(&mut self, horizontal: bool, amount: i32) -> Result<(), SinkError> {
        let axis = if horizontal {
            RelativeAxisType::REL_HWHEEL
        } else {
            RelativeAxisType::REL_WHEEL
        };
        self.emit(&[rel(axis, amount)])
    }
}

/// Keyboard that re-emits passed-through keypad events
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    /// Create a keyboard able to send every code in `codes`
    pub fn new(name: &str, codes: impl IntoIterator<Item = u16>) -> Result<Self, SinkError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in codes {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(SinkError::CreateDevice)?
            .name(name)
            .with_keys(&keys)
            .map_err(SinkError::CreateDevice)?
            .build()
            .map_err(SinkError::CreateDevice)?;

        Ok(Self { device })
    }

}

impl KeySink for VirtualKeyboard {
    fn send_raw(&mut self, event: &RawEvent) -> Result<(), SinkError> {
        self.device
            .emit(&[InputEvent::from(*event)])
            .map_err(SinkError::EmitEvent)
    }

    fn key_down(&mut self, code: u16) -> Result<(), SinkError> {
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, key_value::PRESS)])
            .map_err(SinkError::EmitEvent)
    }
}
