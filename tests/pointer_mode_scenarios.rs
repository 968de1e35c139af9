//! End-to-end scenarios for the interpreter and motion ticks.
//!
//! These drive `Controller` through its public API with recording sinks,
//! feeding timestamped key events the way a device reader would and calling
//! the tick functions the way the 60 Hz timer would.

use std::time::Duration;

use flipmouse::event::{ev, key_value};
use flipmouse::sink::testing::{KeyCommand, PointerCommand, RecordingKeys, RecordingPointer};
use flipmouse::{
    Controller, ControllerOptions, Disposition, KeyMapCatalog, KeyMapping, KeyboardType,
    MotionParams, RawEvent, Velocity,
};

const STAR: u16 = 138;
const LEFT: u16 = 105;
const OK: u16 = 28;

struct Rig {
    controller: Controller,
    pointer: RecordingPointer,
    keys: RecordingKeys,
}

fn rig() -> Rig {
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
    Rig {
        controller,
        pointer,
        keys,
    }
}

/// Interpret like a reader does: forward on pass-through
fn feed(rig: &Rig, event: RawEvent, kind: KeyboardType) -> Disposition {
    let disposition = rig.controller.interpret(&event, kind);
    if disposition == Disposition::PassThrough {
        rig.controller.forward(&event);
    }
    disposition
}

fn key(ms: u64, code: u16, value: i32) -> RawEvent {
    RawEvent::key_at(Duration::from_millis(ms), code, value)
}

// ── Scenario 1: long press enters pointer mode ──

#[test]
fn long_press_enters_pointer_mode() {
    let rig = rig();
    assert_eq!(feed(&rig, key(0, STAR, 1), KeyboardType::Phone), Disposition::Suppress);
    assert_eq!(feed(&rig, key(300, STAR, 0), KeyboardType::Phone), Disposition::Suppress);

    assert!(rig.controller.is_pointer_mode());
    // One wiggle: out and back
    assert_eq!(rig.pointer.moves(), vec![(4, 0), (-4, 0)]);
    assert!(rig.keys.is_empty());
}

// ── Scenario 2: short press is an ordinary key press ──

#[test]
fn short_press_reaches_application_as_down_then_up() {
    let rig = rig();
    let down = key(0, STAR, 1);
    let up = key(100, STAR, 0);
    assert_eq!(feed(&rig, down, KeyboardType::Phone), Disposition::Suppress);
    assert_eq!(feed(&rig, up, KeyboardType::Phone), Disposition::PassThrough);

    assert!(!rig.controller.is_pointer_mode());
    assert_eq!(rig.keys.commands(), vec![KeyCommand::Down(STAR), KeyCommand::Raw(up)]);
    assert!(rig.pointer.commands().is_empty());
}

// ── Scenario 3: held direction ramps, saturates and glides to a stop ──

#[test]
fn held_direction_follows_velocity_curve() {
    let rig = rig();
    feed(&rig, key(0, STAR, 1), KeyboardType::Phone);
    feed(&rig, key(300, STAR, 0), KeyboardType::Phone);
    rig.pointer.clear();

    let params = MotionParams::pointer();
    let step = params.max_speed * params.acceleration;

    feed(&rig, key(1_000, LEFT, 1), KeyboardType::Phone);
    // 500 ms at 60 Hz
    let mut expected = 0.0f64;
    for _ in 0..30 {
        expected = (expected - step).max(-params.speed_cap());
        let v = rig.controller.pointer_tick().expect("moving while held");
        assert!((v.x - expected).abs() < 1e-9, "{} != {}", v.x, expected);
        assert_eq!(v.y, 0.0);
    }
    let held_moves = rig.pointer.moves();
    assert_eq!(held_moves.len(), 30);
    assert_eq!(&held_moves[..4], [(-1, 0), (-2, 0), (-4, 0), (-4, 0)]);
    assert!(held_moves[3..].iter().all(|&m| m == (-4, 0)));

    feed(&rig, key(1_500, LEFT, 0), KeyboardType::Phone);
    rig.pointer.clear();

    let bound = params.ticks_to_rest(params.speed_cap());
    let mut glide = 0;
    while let Some(v) = rig.controller.pointer_tick() {
        expected *= params.friction;
        assert!((v.x - expected).abs() < 1e-9);
        glide += 1;
        assert!(glide <= bound);
    }
    assert_eq!(rig.controller.snapshot().velocity, Velocity::ZERO);

    // Magnitudes never grow while gliding
    let glide_moves = rig.pointer.moves();
    assert!(!glide_moves.is_empty());
    assert!(glide_moves.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(glide_moves.iter().all(|&(dx, _)| dx <= 0));

    // Fully stopped: further ticks emit nothing
    rig.pointer.clear();
    for _ in 0..10 {
        assert_eq!(rig.controller.pointer_tick(), None);
    }
    assert!(rig.pointer.commands().is_empty());
}

// ── Scenario 4: unmapped keys in pointer mode ──

#[test]
fn unmapped_key_passes_through_untouched() {
    let rig = rig();
    feed(&rig, key(0, STAR, 1), KeyboardType::Phone);
    feed(&rig, key(300, STAR, 0), KeyboardType::Phone);
    rig.pointer.clear();

    let before = rig.controller.snapshot();
    let digit = key(400, 7, 1);
    assert_eq!(feed(&rig, digit, KeyboardType::Phone), Disposition::PassThrough);
    let after = rig.controller.snapshot();

    assert_eq!(before.moving, after.moving);
    assert_eq!(before.scrolling, after.scrolling);
    assert_eq!(before.left_held, after.left_held);
    assert_eq!(before.drag_active, after.drag_active);
    assert_eq!(before.toggle, after.toggle);
    assert_eq!(rig.keys.commands(), vec![KeyCommand::Raw(digit)]);
    assert!(rig.pointer.commands().is_empty());
}

// ── Per-type key maps ──

#[test]
fn laptop_keyboard_uses_its_own_mapping() {
    let rig = rig();
    let laptop = KeyMapping::laptop();
    feed(&rig, key(0, laptop.toggle, 1), KeyboardType::Laptop);
    feed(&rig, key(400, laptop.toggle, 0), KeyboardType::Laptop);
    assert!(rig.controller.is_pointer_mode());

    // Phone toggle means nothing special on the laptop map
    assert_eq!(
        feed(&rig, key(500, STAR, 1), KeyboardType::Laptop),
        Disposition::PassThrough
    );

    // W scrolls up, Esc exits and still reaches the application
    feed(&rig, key(600, laptop.scroll_up, 1), KeyboardType::Laptop);
    assert!(rig.controller.snapshot().scrolling.up);
    assert_eq!(
        feed(&rig, key(700, laptop.exit, 1), KeyboardType::Laptop),
        Disposition::PassThrough
    );
    assert!(!rig.controller.is_pointer_mode());
    assert!(!rig.controller.snapshot().scrolling.any());
}

#[test]
fn unknown_keyboard_type_uses_default_mapping() {
    let rig = rig();
    feed(&rig, key(0, STAR, 1), KeyboardType::External);
    feed(&rig, key(300, STAR, 0), KeyboardType::External);
    assert!(rig.controller.is_pointer_mode());
}

#[test]
fn shared_state_across_devices() {
    // Toggle on the phone keypad, steer from the laptop arrows
    let rig = rig();
    feed(&rig, key(0, STAR, 1), KeyboardType::Phone);
    feed(&rig, key(300, STAR, 0), KeyboardType::Phone);
    feed(&rig, key(400, KeyMapping::laptop().right, 1), KeyboardType::Laptop);
    let v = rig.controller.pointer_tick().unwrap();
    assert!(v.x > 0.0);
}

// ── Mode-exit safety ──

#[test]
fn leaving_pointer_mode_releases_each_button_once() {
    let rig = rig();
    feed(&rig, key(0, STAR, 1), KeyboardType::Phone);
    feed(&rig, key(300, STAR, 0), KeyboardType::Phone);
    feed(&rig, key(400, OK, 1), KeyboardType::Phone);
    feed(&rig, key(500, STAR, 1), KeyboardType::Phone);
    feed(&rig, key(800, STAR, 0), KeyboardType::Phone);

    assert!(!rig.controller.is_pointer_mode());
    assert_eq!(rig.pointer.count(PointerCommand::LeftPress), 1);
    assert_eq!(rig.pointer.count(PointerCommand::LeftRelease), 1);

    // OK release now belongs to the keyboard again
    assert_eq!(feed(&rig, key(900, OK, 0), KeyboardType::Phone), Disposition::PassThrough);
    assert_eq!(rig.pointer.count(PointerCommand::LeftRelease), 1);

    rig.controller.shutdown();
    assert_eq!(rig.pointer.count(PointerCommand::LeftRelease), 1);
}

#[test]
fn sync_events_always_pass_through() {
    let rig = rig();
    let syn = RawEvent::new(std::time::UNIX_EPOCH, ev::SYN, 0, 0);
    assert_eq!(feed(&rig, syn, KeyboardType::Phone), Disposition::PassThrough);
    feed(&rig, key(0, STAR, key_value::PRESS), KeyboardType::Phone);
    assert_eq!(feed(&rig, syn, KeyboardType::Phone), Disposition::PassThrough);
}
