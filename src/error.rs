//! Error types

use std::path::PathBuf;

use thiserror::Error;

use crate::keymap::KeyboardType;

/// Errors loading or validating the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Key map catalog errors. Only raised at startup.
#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("No key mapping registered for the default keyboard type ({0})")]
    MissingDefault(KeyboardType),
}

/// Errors from a virtual mouse or keyboard sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),

    #[error("Failed to emit event: {0}")]
    EmitEvent(#[source] std::io::Error),
}

/// A failed read from a physical device
#[derive(Debug, Error)]
pub enum ReadError {
    /// The read failed but the device may still deliver events
    #[error("Transient read error: {0}")]
    Transient(#[source] std::io::Error),

    /// The device is gone; the reader should retire
    #[error("Device removed: {0}")]
    Terminal(#[source] std::io::Error),
}

impl ReadError {
    /// Classify an I/O error from the evdev read primitive
    pub fn from_io(err: std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENODEV) | Some(libc::EBADF) => ReadError::Terminal(err),
            _ => ReadError::Transient(err),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadError::Terminal(_))
    }
}

/// Errors finding or claiming physical devices
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No suitable input devices found (looked for: {0})")]
    NoDevices(String),

    #[error("Failed to grab {name}: {source}")]
    Grab {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level library error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Keymap(#[from] KeymapError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
