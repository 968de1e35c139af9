//! Key map catalog
//!
//! Each physical keyboard type gets one `KeyMapping`: the evdev key codes
//! that play the logical roles (toggle, click, arrows, ...) in pointer mode.
//! A code of `0` (`KEY_RESERVED`) marks a role as unbound.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeymapError;
use crate::motion::Direction;

/// Code value meaning "no key bound to this role"
pub const UNBOUND: u16 = 0;

/// Classification of a physical input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardType {
    /// Feature-phone keypad (mtk-kpd, matrix-keypad)
    Phone,
    /// Built-in laptop keyboard
    Laptop,
    /// External USB keyboard
    External,
}

impl KeyboardType {
    /// Type whose mapping is used when a device's own type has none
    pub const DEFAULT: KeyboardType = KeyboardType::Phone;

    pub const ALL: &'static [KeyboardType] = &[
        KeyboardType::Phone,
        KeyboardType::Laptop,
        KeyboardType::External,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyboardType::Phone => "phone",
            KeyboardType::Laptop => "laptop",
            KeyboardType::External => "external",
        }
    }
}

impl FromStr for KeyboardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyboardType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown keyboard type \"{s}\""))
    }
}

impl fmt::Display for KeyboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Determine the keyboard type from an evdev device name
pub fn classify(device_name: &str) -> KeyboardType {
    match device_name {
        "AT Translated Set 2 keyboard" => KeyboardType::Laptop,
        "USB-HID Keyboard" => KeyboardType::External,
        _ => KeyboardType::Phone,
    }
}

/// Logical role of a key in pointer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Exit,
    Toggle,
    Click,
    SpeedUp,
    SpeedDown,
    Drag,
    Move(Direction),
    Scroll(Direction),
}

/// Key codes for every logical role on one keyboard type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyMapping {
    pub exit: u16,
    pub toggle: u16,
    pub enter: u16,
    pub drag: u16,
    pub speed_up: u16,
    pub speed_down: u16,
    pub up: u16,
    pub down: u16,
    pub left: u16,
    pub right: u16,
    pub scroll_up: u16,
    pub scroll_down: u16,
    pub scroll_left: u16,
    pub scroll_right: u16,
}

impl KeyMapping {
    /// Feature-phone keypad layout
    pub fn phone() -> Self {
        Self {
            exit: 116, // end call
            toggle: 138, // star
            enter: 28, // OK
            drag: 48, // soft right
            speed_up: 114, // volume down
            speed_down: 115, // volume up
            up: 103,
            down: 108,
            left: 105,
            right: 106,
            scroll_up: 139, // soft left
            scroll_down: 231, // call
            scroll_left: UNBOUND,
            scroll_right: UNBOUND,
        }
    }

    /// Laptop keyboard layout
    pub fn laptop() -> Self {
        Self {
            exit: 1, // Esc
            toggle: 29, // left ctrl
            enter: 28,
            drag: 32, // D
            speed_up: 13, // =
            speed_down: 12, // -
            up: 103,
            down: 108,
            left: 105,
            right: 106,
            scroll_up: 17, // W
            scroll_down: 31, // S
            scroll_left: 30, // A
            scroll_right: 32, // D, shadowed by drag
        }
    }

    /// Resolve a key code to its pointer-mode role.
    ///
    /// When two roles share a code the earlier one in this order wins.
    pub fn action_for(&self, code: u16) -> Option<KeyAction> {
        if code == UNBOUND {
            return None;
        }
        let table = [
            (self.exit, KeyAction::Exit),
            (self.toggle, KeyAction::Toggle),
            (self.enter, KeyAction::Click),
            (self.speed_up, KeyAction::SpeedUp),
            (self.speed_down, KeyAction::SpeedDown),
            (self.drag, KeyAction::Drag),
            (self.up, KeyAction::Move(Direction::Up)),
            (self.down, KeyAction::Move(Direction::Down)),
            (self.left, KeyAction::Move(Direction::Left)),
            (self.right, KeyAction::Move(Direction::Right)),
            (self.scroll_up, KeyAction::Scroll(Direction::Up)),
            (self.scroll_down, KeyAction::Scroll(Direction::Down)),
            (self.scroll_right, KeyAction::Scroll(Direction::Right)),
            (self.scroll_left, KeyAction::Scroll(Direction::Left)),
        ];
        table
            .into_iter()
            .find(|&(bound, _)| bound == code)
            .map(|(_, action)| action)
    }

    /// All bound key codes, for building the virtual keyboard's capabilities
    pub fn bound_codes(&self) -> impl Iterator<Item = u16> {
        [
            self.exit,
            self.toggle,
            self.enter,
            self.drag,
            self.speed_up,
            self.speed_down,
            self.up,
            self.down,
            self.left,
            self.right,
            self.scroll_up,
            self.scroll_down,
            self.scroll_left,
            self.scroll_right,
        ]
        .into_iter()
        .filter(|&code| code != UNBOUND)
    }
}

/// Partial key mapping from the config file.
///
/// Unset fields keep the value of the mapping the patch is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMappingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggle: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enter: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drag: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_up: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_down: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_up: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_down: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_left: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_right: Option<u16>,
}

impl KeyMappingPatch {
    pub fn apply(&self, base: KeyMapping) -> KeyMapping {
        KeyMapping {
            exit: self.exit.unwrap_or(base.exit),
            toggle: self.toggle.unwrap_or(base.toggle),
            enter: self.enter.unwrap_or(base.enter),
            drag: self.drag.unwrap_or(base.drag),
            speed_up: self.speed_up.unwrap_or(base.speed_up),
            speed_down: self.speed_down.unwrap_or(base.speed_down),
            up: self.up.unwrap_or(base.up),
            down: self.down.unwrap_or(base.down),
            left: self.left.unwrap_or(base.left),
            right: self.right.unwrap_or(base.right),
            scroll_up: self.scroll_up.unwrap_or(base.scroll_up),
            scroll_down: self.scroll_down.unwrap_or(base.scroll_down),
            scroll_left: self.scroll_left.unwrap_or(base.scroll_left),
            scroll_right: self.scroll_right.unwrap_or(base.scroll_right),
        }
    }
}

/// Key mappings by keyboard type
#[derive(Debug, Clone, Default)]
pub struct KeyMapCatalog {
    mappings: BTreeMap<KeyboardType, KeyMapping>,
}

impl KeyMapCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in phone and laptop tables
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(KeyboardType::Phone, KeyMapping::phone());
        catalog.register(KeyboardType::Laptop, KeyMapping::laptop());
        catalog
    }

    /// Store a mapping, replacing any previous one for `kind`
    pub fn register(&mut self, kind: KeyboardType, mapping: KeyMapping) {
        self.mappings.insert(kind, mapping);
    }

    /// Mapping registered for `kind` exactly, without fallback
    pub fn get(&self, kind: KeyboardType) -> Option<&KeyMapping> {
        self.mappings.get(&kind)
    }

    /// Mapping for `kind`, falling back to the default type's mapping
    pub fn lookup(&self, kind: KeyboardType) -> Option<&KeyMapping> {
        self.mappings
            .get(&kind)
            .or_else(|| self.mappings.get(&KeyboardType::DEFAULT))
    }

    /// Check that every lookup will succeed
    pub fn validate(&self) -> Result<(), KeymapError> {
        if self.mappings.contains_key(&KeyboardType::DEFAULT) {
            Ok(())
        } else {
            Err(KeymapError::MissingDefault(KeyboardType::DEFAULT))
        }
    }

    /// Every code bound in any registered mapping
    pub fn all_bound_codes(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self
            .mappings
            .values()
            .flat_map(|m| m.bound_codes())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}
