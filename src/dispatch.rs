//! Reader tasks and motion timers
//!
//! ```text
//! [device 0] --read--> \                          / --send_raw--> [virtual keyboard]
//! [device 1] --read-->  > Controller::interpret --
//! [device n] --read--> /        (shared state)    \
//!                                   ^  ^
//!               pointer timer 60 Hz |  | scroll timer 10 Hz --> [virtual mouse]
//! ```
//!
//! Each device gets a blocking reader on the tokio blocking pool. Events from
//! one device are handled in order; events from different devices interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::controller::Controller;
use crate::error::ReadError;
use crate::event::{Disposition, RawEvent};
use crate::keymap::KeyboardType;

/// A physical device delivering raw events
pub trait EventSource: Send + 'static {
    fn name(&self) -> &str;
    fn keyboard_type(&self) -> KeyboardType;
    /// Block until the next event arrives
    fn next_event(&mut self) -> Result<RawEvent, ReadError>;
}

/// Timer rates and reader limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub pointer_period: Duration,
    pub scroll_period: Duration,
    /// Integrate scroll only every n-th scroll tick
    pub scroll_divider: u32,
    /// Transient read failures in a row before a reader gives up
    pub max_consecutive_read_errors: u32,
}

impl DispatchConfig {
    pub fn from_rates(pointer_hz: u32, scroll_hz: u32) -> Self {
        Self {
            pointer_period: period(pointer_hz),
            scroll_period: period(scroll_hz),
            ..Self::default()
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pointer_period: period(60),
            scroll_period: period(10),
            scroll_divider: 1,
            max_consecutive_read_errors: 16,
        }
    }
}

fn period(hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(hz.max(1)))
}

/// Why a reader stopped
#[derive(Debug)]
pub enum ReaderExit {
    /// The device failed and was given up on
    Retired { device: String, error: ReadError },
    /// The controller was shut down
    Halted { device: String },
    /// The reader task panicked or was cancelled
    Aborted { reason: String },
}

/// Running dispatch: timers plus one reader per device
pub struct DispatchHandle {
    controller: Arc<Controller>,
    shutdown_tx: watch::Sender<bool>,
    timers: Vec<JoinHandle<()>>,
    readers: Vec<JoinHandle<ReaderExit>>,
}

/// Spawn readers for `sources` and start both motion timers.
///
/// Must be called from within a tokio runtime.
pub fn start(
    controller: Arc<Controller>,
    sources: Vec<Box<dyn EventSource>>,
    config: DispatchConfig,
) -> DispatchHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let readers = sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            info!(
                "Monitoring device {}: {} ({})",
                i,
                source.name(),
                source.keyboard_type()
            );
            let controller = Arc::clone(&controller);
            let max_errors = config.max_consecutive_read_errors;
            tokio::task::spawn_blocking(move || run_reader(&controller, source, max_errors))
        })
        .collect();

    let timers = vec![
        tokio::spawn(pointer_timer(
            Arc::clone(&controller),
            config.pointer_period,
            shutdown_rx.clone(),
        )),
        tokio::spawn(scroll_timer(
            Arc::clone(&controller),
            config.scroll_period,
            config.scroll_divider.max(1),
            shutdown_rx,
        )),
    ];

    DispatchHandle {
        controller,
        shutdown_tx,
        timers,
        readers,
    }
}

impl DispatchHandle {
    /// Wait until every reader has stopped
    pub async fn wait_readers(&mut self) -> Vec<ReaderExit> {
        let mut exits = Vec::with_capacity(self.readers.len());
        for handle in std::mem::take(&mut self.readers) {
            let exit = match handle.await {
                Ok(exit) => exit,
                Err(e) => ReaderExit::Aborted {
                    reason: e.to_string(),
                },
            };
            exits.push(exit);
        }
        exits
    }

    /// Release held buttons, stop the timers and leave blocked readers behind.
    ///
    /// Readers parked in a blocking read keep their blocking-pool thread
    /// until the device delivers again, so the runtime must not wait for
    /// them on exit (see `shutdown_background`).
    pub async fn shutdown(self) {
        self.controller.shutdown();
        let _ = self.shutdown_tx.send(true);
        for timer in self.timers {
            if let Err(e) = timer.await {
                warn!("Timer task ended abnormally: {}", e);
            }
        }
    }
}

/// Read, interpret and forward until the device dies or we are halted
fn run_reader(
    controller: &Controller,
    mut source: Box<dyn EventSource>,
    max_errors: u32,
) -> ReaderExit {
    let device = source.name().to_string();
    let kind = source.keyboard_type();
    let mut consecutive_errors = 0u32;

    loop {
        if controller.is_halted() {
            return ReaderExit::Halted { device };
        }

        let event = match source.next_event() {
            Ok(event) => {
                consecutive_errors = 0;
                event
            }
            Err(e) if e.is_terminal() => {
                warn!("{} removed, reader stopping: {}", device, e);
                return ReaderExit::Retired { device, error: e };
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!("Error reading from {}: {}", device, e);
                if consecutive_errors >= max_errors {
                    error!(
                        "{} failed {} reads in a row, giving up",
                        device, consecutive_errors
                    );
                    return ReaderExit::Retired { device, error: e };
                }
                continue;
            }
        };
        // Whatever arrives after shutdown belongs to nobody
        if controller.is_halted() {
            return ReaderExit::Halted { device };
        }

        match controller.interpret(&event, kind) {
            Disposition::PassThrough => controller.forward(&event),
            Disposition::Suppress => debug!(
                "Intercepted {} event: type {} code {} value {}",
                device, event.kind, event.code, event.value
            ),
        }
    }
}

async fn pointer_timer(
    controller: Arc<Controller>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                controller.pointer_tick();
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Pointer timer stopped");
}

async fn scroll_timer(
    controller: Arc<Controller>,
    period: Duration,
    divider: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick: u32 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick = tick.wrapping_add(1);
                if tick % divider == 0 {
                    controller.scroll_tick();
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Scroll timer stopped");
}
