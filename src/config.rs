//! Configuration file
//!
//! Everything is optional: a missing file or missing keys fall back to the
//! built-in defaults. Key map tables in `[keymaps.<type>]` are applied on top
//! of the built-in table for that type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::controller::ControllerOptions;
use crate::discovery::DEFAULT_DEVICE_NAMES;
use crate::dispatch::DispatchConfig;
use crate::error::ConfigError;
use crate::keymap::{KeyMapCatalog, KeyMappingPatch, KeyboardType};
use crate::motion::MotionParams;

/// Timing knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Toggle key hold time that switches pointer mode
    pub long_press_ms: u64,
    pub pointer_hz: u32,
    pub scroll_hz: u32,
    /// Integrate scroll only every n-th scroll tick
    pub scroll_divider: u32,
    pub wiggle_pause_ms: u64,
    pub max_consecutive_read_errors: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 225,
            pointer_hz: 60,
            scroll_hz: 10,
            scroll_divider: 1,
            wiggle_pause_ms: 50,
            max_consecutive_read_errors: 16,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Write logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// evdev names of the devices to take over
    #[serde(default = "default_device_names")]
    pub device_names: Vec<String>,
    #[serde(default = "default_pointer_name")]
    pub pointer_name: String,
    #[serde(default = "default_keyboard_name")]
    pub keyboard_name: String,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default = "MotionParams::pointer", deserialize_with = "pointer_params")]
    pub pointer: MotionParams,
    #[serde(default = "MotionParams::scroll", deserialize_with = "scroll_params")]
    pub scroll: MotionParams,
    /// Overrides keyed by keyboard type name ("phone", "laptop", "external")
    #[serde(default)]
    pub keymaps: BTreeMap<String, KeyMappingPatch>,
}

/// A `[pointer]` or `[scroll]` table; unset keys keep that section's defaults
#[derive(Debug, Default, Deserialize)]
struct MotionOverrides {
    max_speed: Option<f64>,
    speed_multiplier: Option<f64>,
    acceleration: Option<f64>,
    friction: Option<f64>,
}

impl MotionOverrides {
    fn apply(self, base: MotionParams) -> MotionParams {
        MotionParams {
            max_speed: self.max_speed.unwrap_or(base.max_speed),
            speed_multiplier: self.speed_multiplier.unwrap_or(base.speed_multiplier),
            acceleration: self.acceleration.unwrap_or(base.acceleration),
            friction: self.friction.unwrap_or(base.friction),
        }
    }
}

fn pointer_params<'de, D: Deserializer<'de>>(d: D) -> Result<MotionParams, D::Error> {
    Ok(MotionOverrides::deserialize(d)?.apply(MotionParams::pointer()))
}

fn scroll_params<'de, D: Deserializer<'de>>(d: D) -> Result<MotionParams, D::Error> {
    Ok(MotionOverrides::deserialize(d)?.apply(MotionParams::scroll()))
}

fn default_device_names() -> Vec<String> {
    DEFAULT_DEVICE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_pointer_name() -> String {
    "goFlipMouse".to_string()
}

fn default_keyboard_name() -> String {
    "goFlipKeyboard".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            device_names: default_device_names(),
            pointer_name: default_pointer_name(),
            keyboard_name: default_keyboard_name(),
            timing: TimingConfig::default(),
            pointer: MotionParams::pointer(),
            scroll: MotionParams::scroll(),
            keymaps: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flipmouse")
            .join("config.toml")
    }

    /// Load and validate a config file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.pointer_hz == 0 {
            return Err(invalid("timing.pointer_hz", "must be at least 1"));
        }
        if t.scroll_hz == 0 {
            return Err(invalid("timing.scroll_hz", "must be at least 1"));
        }
        if t.scroll_divider == 0 {
            return Err(invalid("timing.scroll_divider", "must be at least 1"));
        }
        if t.max_consecutive_read_errors == 0 {
            return Err(invalid(
                "timing.max_consecutive_read_errors",
                "must be at least 1",
            ));
        }
        validate_motion("pointer", &self.pointer)?;
        validate_motion("scroll", &self.scroll)?;
        for name in self.keymaps.keys() {
            name.parse::<KeyboardType>()
                .map_err(|reason| invalid("keymaps", &reason))?;
        }
        Ok(())
    }

    /// Built-in key maps with this config's overrides registered on top
    pub fn catalog(&self) -> Result<KeyMapCatalog, ConfigError> {
        let mut catalog = KeyMapCatalog::builtin();
        for (name, patch) in &self.keymaps {
            let kind: KeyboardType = name
                .parse()
                .map_err(|reason: String| invalid("keymaps", &reason))?;
            let base = catalog.get(kind).copied().unwrap_or_default();
            catalog.register(kind, patch.apply(base));
        }
        Ok(catalog)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            long_press: Duration::from_millis(self.timing.long_press_ms),
            wiggle_pause: Duration::from_millis(self.timing.wiggle_pause_ms),
            pointer: self.pointer,
            scroll: self.scroll,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            scroll_divider: self.timing.scroll_divider,
            max_consecutive_read_errors: self.timing.max_consecutive_read_errors,
            ..DispatchConfig::from_rates(self.timing.pointer_hz, self.timing.scroll_hz)
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn validate_motion(section: &'static str, params: &MotionParams) -> Result<(), ConfigError> {
    if !(params.friction > 0.0 && params.friction < 1.0) {
        return Err(invalid(section, "friction must be between 0 and 1"));
    }
    // Written so NaN fails every check
    if !(params.acceleration > 0.0 && params.acceleration.is_finite()) {
        return Err(invalid(section, "acceleration must be positive"));
    }
    if !(params.max_speed >= 1.0 && params.max_speed.is_finite()) {
        return Err(invalid(section, "max_speed must be at least 1"));
    }
    if !(params.speed_multiplier > 0.0 && params.speed_multiplier.is_finite()) {
        return Err(invalid(section, "speed_multiplier must be positive"));
    }
    Ok(())
}
