//! Integration tests for the reader tasks and motion timers.

use std::collections::VecDeque;
use std::io;
use std::sync::{mpsc, Arc};
use std::time::{Duration, UNIX_EPOCH};

use flipmouse::dispatch::{self, DispatchConfig, EventSource, ReaderExit};
use flipmouse::event::ev;
use flipmouse::sink::testing::{KeyCommand, PointerCommand, RecordingKeys, RecordingPointer};
use flipmouse::{Controller, ControllerOptions, KeyMapCatalog, KeyboardType, RawEvent, ReadError};

const STAR: u16 = 138;
const LEFT: u16 = 105;
const SOFT_LEFT: u16 = 139;

/// Plays back a fixed script, then reports the device as gone
struct ScriptedSource {
    name: String,
    script: VecDeque<Result<RawEvent, ReadError>>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<RawEvent, ReadError>>) -> Box<dyn EventSource> {
        Box::new(Self {
            name: "scripted keypad".to_string(),
            script: script.into(),
        })
    }
}

impl EventSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn keyboard_type(&self) -> KeyboardType {
        KeyboardType::Phone
    }

    fn next_event(&mut self) -> Result<RawEvent, ReadError> {
        self.script.pop_front().unwrap_or_else(|| {
            Err(ReadError::Terminal(io::Error::new(
                io::ErrorKind::NotFound,
                "device removed",
            )))
        })
    }
}

/// Blocks in `next_event` until the test sends something
struct IdleSource {
    events: mpsc::Receiver<RawEvent>,
    reading: mpsc::Sender<()>,
}

impl IdleSource {
    fn new() -> (mpsc::Sender<RawEvent>, mpsc::Receiver<()>, Box<dyn EventSource>) {
        let (event_tx, events) = mpsc::channel();
        let (reading, reading_rx) = mpsc::channel();
        (event_tx, reading_rx, Box::new(Self { events, reading }))
    }
}

impl EventSource for IdleSource {
    fn name(&self) -> &str {
        "idle keypad"
    }

    fn keyboard_type(&self) -> KeyboardType {
        KeyboardType::Phone
    }

    fn next_event(&mut self) -> Result<RawEvent, ReadError> {
        let _ = self.reading.send(());
        self.events.recv().map_err(|_| {
            ReadError::Terminal(io::Error::new(io::ErrorKind::NotFound, "device removed"))
        })
    }
}

fn transient() -> ReadError {
    ReadError::Transient(io::Error::new(io::ErrorKind::Interrupted, "interrupted"))
}

fn key(ms: u64, code: u16, value: i32) -> RawEvent {
    RawEvent::key_at(Duration::from_millis(ms), code, value)
}

fn controller() -> (Arc<Controller>, RecordingPointer, RecordingKeys) {
    let pointer = RecordingPointer::new();
    let keys = RecordingKeys::new();
    let controller = Controller::new(
        KeyMapCatalog::builtin(),
        ControllerOptions {
            wiggle_pause: Duration::ZERO,
            ..Default::default()
        },
        Box::new(pointer.clone()),
        Box::new(keys.clone()),
    )
    .unwrap();
    (Arc::new(controller), pointer, keys)
}

fn enter_pointer_mode(controller: &Controller) {
    controller.interpret(&key(0, STAR, 1), KeyboardType::Phone);
    controller.interpret(&key(300, STAR, 0), KeyboardType::Phone);
    assert!(controller.is_pointer_mode());
}

#[tokio::test]
async fn reader_forwards_pass_through_in_order() {
    let (controller, _, keys) = controller();
    let up = key(100, STAR, 0);
    let syn = RawEvent::new(UNIX_EPOCH + Duration::from_millis(100), ev::SYN, 0, 0);
    let digit = key(200, 7, 1);
    let source = ScriptedSource::new(vec![Ok(key(0, STAR, 1)), Ok(up), Ok(syn), Ok(digit)]);

    let mut handle = dispatch::start(controller, vec![source], DispatchConfig::default());
    let exits = handle.wait_readers().await;

    assert_eq!(exits.len(), 1);
    assert!(matches!(
        &exits[0],
        ReaderExit::Retired { error, .. } if error.is_terminal()
    ));
    assert_eq!(
        keys.commands(),
        vec![
            KeyCommand::Down(STAR),
            KeyCommand::Raw(up),
            KeyCommand::Raw(syn),
            KeyCommand::Raw(digit),
        ]
    );
    handle.shutdown().await;
}

#[tokio::test]
async fn reader_survives_transient_errors() {
    let (controller, _, keys) = controller();
    let digit = key(0, 7, 1);
    let source = ScriptedSource::new(vec![Err(transient()), Err(transient()), Ok(digit)]);

    let mut handle = dispatch::start(controller, vec![source], DispatchConfig::default());
    handle.wait_readers().await;

    assert_eq!(keys.commands(), vec![KeyCommand::Raw(digit)]);
    handle.shutdown().await;
}

#[tokio::test]
async fn reader_retires_after_repeated_failures() {
    let (controller, _, keys) = controller();
    let mut script: Vec<_> = (0..3).map(|_| Err(transient())).collect();
    script.push(Ok(key(0, 7, 1)));
    let source = ScriptedSource::new(script);

    let config = DispatchConfig {
        max_consecutive_read_errors: 3,
        ..Default::default()
    };
    let mut handle = dispatch::start(controller, vec![source], config);
    let exits = handle.wait_readers().await;

    assert!(matches!(
        &exits[0],
        ReaderExit::Retired { error, .. } if !error.is_terminal()
    ));
    assert!(keys.is_empty());
    handle.shutdown().await;
}

#[tokio::test]
async fn one_failing_device_leaves_others_running() {
    let (controller, _, keys) = controller();
    let failing = ScriptedSource::new(vec![]);
    let digit = key(0, 7, 1);
    let healthy = ScriptedSource::new(vec![Ok(digit)]);

    let mut handle = dispatch::start(controller, vec![failing, healthy], DispatchConfig::default());
    let exits = handle.wait_readers().await;

    assert_eq!(exits.len(), 2);
    assert_eq!(keys.commands(), vec![KeyCommand::Raw(digit)]);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pointer_timer_moves_while_direction_held() {
    let (controller, pointer, _) = controller();
    enter_pointer_mode(&controller);
    controller.interpret(&key(400, LEFT, 1), KeyboardType::Phone);
    pointer.clear();

    let handle = dispatch::start(Arc::clone(&controller), vec![], DispatchConfig::default());
    tokio::time::sleep(Duration::from_millis(500)).await;

    let moves = pointer.moves();
    assert!(moves.len() >= 25, "only {} moves", moves.len());
    assert!(moves.iter().all(|&(dx, dy)| dx < 0 && dy == 0));

    handle.shutdown().await;
    let after_shutdown = pointer.commands().len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(pointer.commands().len(), after_shutdown);
    assert!(!controller.is_pointer_mode());
}

#[tokio::test(start_paused = true)]
async fn timers_idle_outside_pointer_mode() {
    let (controller, pointer, _) = controller();
    let handle = dispatch::start(Arc::clone(&controller), vec![], DispatchConfig::default());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(pointer.commands().is_empty());
    handle.shutdown().await;
}

async fn wheel_events_in(divider: u32) -> usize {
    let (controller, pointer, _) = controller();
    enter_pointer_mode(&controller);
    controller.interpret(&key(400, SOFT_LEFT, 1), KeyboardType::Phone);
    pointer.clear();

    let config = DispatchConfig {
        scroll_divider: divider,
        ..Default::default()
    };
    let handle = dispatch::start(Arc::clone(&controller), vec![], config);
    tokio::time::sleep(Duration::from_millis(950)).await;
    handle.shutdown().await;

    pointer
        .commands()
        .iter()
        .filter(|c| matches!(c, PointerCommand::Wheel { horizontal: false, .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn scroll_divider_thins_scroll_ticks() {
    let every_tick = wheel_events_in(1).await;
    let every_other = wheel_events_in(2).await;
    assert!((9..=11).contains(&every_tick), "{every_tick}");
    assert!((4..=6).contains(&every_other), "{every_other}");
}

#[tokio::test]
async fn shutdown_returns_while_reader_is_blocked() {
    let (controller, pointer, keys) = controller();
    enter_pointer_mode(&controller);
    pointer.clear();
    controller.interpret(&key(400, 28, 1), KeyboardType::Phone);

    let (event_tx, reading_rx, source) = IdleSource::new();
    let handle = dispatch::start(Arc::clone(&controller), vec![source], DispatchConfig::default());
    reading_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("reader never started reading");

    tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("shutdown waited on a blocked reader");
    assert!(controller.is_halted());
    assert_eq!(pointer.count(PointerCommand::LeftRelease), 1);

    // A key arriving after shutdown wakes the reader but is not forwarded
    event_tx.send(key(1_000, 7, 1)).unwrap();
    drop(event_tx);
    tokio::task::spawn_blocking(move || while reading_rx.recv().is_ok() {})
        .await
        .unwrap();
    assert!(keys.is_empty());
}
