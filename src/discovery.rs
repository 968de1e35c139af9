//! Physical keypad discovery over evdev

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use evdev::Device;
use tracing::{debug, info};

use crate::dispatch::EventSource;
use crate::error::{DeviceError, ReadError};
use crate::event::RawEvent;
use crate::keymap::{classify, KeyboardType};

/// Device names picked up when the config does not list any
pub const DEFAULT_DEVICE_NAMES: &[&str] =
    &["mtk-kpd", "matrix-keypad", "AT Translated Set 2 keyboard"];

/// Summary of one evdev node, for `--list-devices`
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub kind: KeyboardType,
    pub wanted: bool,
}

/// Describe every evdev device on the system
pub fn list_devices(wanted: &[String]) -> Vec<DeviceInfo> {
    let mut devices: Vec<DeviceInfo> = evdev::enumerate()
        .map(|(path, dev)| {
            let name = dev.name().unwrap_or_default().to_string();
            DeviceInfo {
                kind: classify(&name),
                wanted: is_wanted(&name, wanted),
                path,
                name,
            }
        })
        .collect();
    devices.sort_by(|a, b| a.path.cmp(&b.path));
    devices
}

fn is_wanted(name: &str, wanted: &[String]) -> bool {
    wanted.iter().any(|w| w == name)
}

/// Open every device whose name is in `wanted`. Devices are not grabbed yet.
pub fn find_devices(wanted: &[String]) -> Result<Vec<EvdevSource>, DeviceError> {
    let mut found: Vec<EvdevSource> = evdev::enumerate()
        .filter_map(|(path, device)| {
            let name = device.name().unwrap_or_default().to_string();
            if !is_wanted(&name, wanted) {
                debug!("Skipping {} ({})", path.display(), name);
                return None;
            }
            let kind = classify(&name);
            info!("Found {} at {} ({})", name, path.display(), kind);
            Some(EvdevSource::new(path, name, kind, device))
        })
        .collect();

    if found.is_empty() {
        return Err(DeviceError::NoDevices(wanted.join(", ")));
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

/// Event source over an evdev character device
pub struct EvdevSource {
    path: PathBuf,
    name: String,
    kind: KeyboardType,
    device: Device,
    pending: VecDeque<RawEvent>,
}

impl EvdevSource {
    fn new(path: PathBuf, name: String, kind: KeyboardType, device: Device) -> Self {
        Self {
            path,
            name,
            kind,
            device,
            pending: VecDeque::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Claim exclusive access so the keys stop reaching other readers
    pub fn grab(&mut self) -> Result<(), DeviceError> {
        self.device.grab().map_err(|source| DeviceError::Grab {
            name: self.name.clone(),
            source,
        })
    }

    /// Key codes the device reports it can send
    pub fn supported_keys(&self) -> Vec<u16> {
        self.device
            .supported_keys()
            .map(|keys| keys.iter().map(|k| k.code()).collect())
            .unwrap_or_default()
    }
}

impl EventSource for EvdevSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn keyboard_type(&self) -> KeyboardType {
        self.kind
    }

    fn next_event(&mut self) -> Result<RawEvent, ReadError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            let batch = self.device.fetch_events().map_err(ReadError::from_io)?;
            self.pending.extend(batch.map(RawEvent::from));
        }
    }
}
