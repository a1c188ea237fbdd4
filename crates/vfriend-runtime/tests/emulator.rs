mod common;

use std::time::Duration;

use common::{FakeCore, headless_config, pixel, wait_for};
use vfriend_runtime::{
    Button, Closed, Emulator, LedColors, Rgb, RuntimeConfig, RuntimeError, SessionStatus,
    SharedInputs,
};

#[test]
fn start_primes_a_frame_and_runs_paced_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let (core, probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .title("Red Alarm")
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    let frames = emulator.subscribe_frames();
    assert_eq!(emulator.status(), SessionStatus::Idle);

    emulator.start().unwrap();
    assert_eq!(emulator.status(), SessionStatus::Running);

    let first = frames
        .recv_timeout(Duration::from_secs(1))
        .unwrap()
        .expect("priming frame");
    assert_eq!(pixel(&first.left, 0, 0), [0xFF, 0, 0, 0xFF]);
    assert_eq!(pixel(&first.right, 0, 0), [0, 0, 0, 0xFF]);

    // 400 samples at 41 667 Hz is ~9.6 ms per tick.
    std::thread::sleep(Duration::from_millis(200));
    let ticks = emulator.stats().ticks;
    assert!((10..=40).contains(&ticks), "ran {ticks} ticks in 200ms");
    assert!(probe.lock().sample_counts.iter().all(|n| *n == 400));

    emulator.shutdown();
    assert_eq!(emulator.status(), SessionStatus::Halted);
}

#[test]
fn start_is_idempotent_and_halted_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .config(headless_config(dir.path()))
        .build()
        .unwrap();

    emulator.start().unwrap();
    emulator.start().unwrap();
    emulator.shutdown();
    emulator.shutdown();

    assert!(matches!(emulator.start(), Err(RuntimeError::SessionHalted)));
    assert!(matches!(
        emulator.save_state(),
        Err(RuntimeError::SessionHalted)
    ));
}

#[test]
fn frames_arrive_in_production_order_and_close_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    let frames = emulator.subscribe_frames();
    emulator.start().unwrap();

    let mut last = None;
    for _ in 0..5 {
        let frame = frames
            .recv_timeout(Duration::from_secs(1))
            .unwrap()
            .expect("frame");
        if let Some(previous) = last {
            assert!(frame.sequence > previous);
        }
        last = Some(frame.sequence);
    }

    emulator.shutdown();
    let mut closed = false;
    for _ in 0..3 {
        match frames.recv_timeout(Duration::from_secs(1)) {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("receiver not closed after shutdown"),
            Err(Closed) => {
                closed = true;
                break;
            }
        }
    }
    assert!(closed);
}

#[test]
fn ram_is_loaded_at_build_and_persisted_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let saves = dir.path().join("Saves");
    std::fs::create_dir_all(&saves).unwrap();
    std::fs::write(saves.join("Wario Land.sav"), [9, 8, 7]).unwrap();

    let (core, probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .rom_path("/roms/Wario Land.vb")
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    assert_eq!(emulator.title(), "Wario Land");
    assert_eq!(probe.lock().loaded_ram, Some(vec![9, 8, 7]));

    emulator.start().unwrap();
    assert!(wait_for(|| emulator.stats().ticks >= 3));
    emulator.shutdown();

    let calls = probe.lock().calls;
    let saved = std::fs::read(saves.join("Wario Land.sav")).unwrap();
    assert_eq!(saved, calls.to_le_bytes());
}

#[test]
fn shutdown_before_start_still_persists_ram() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .title("Teleroboxer")
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    emulator.shutdown();

    let saved = std::fs::read(dir.path().join("Saves/Teleroboxer.sav")).unwrap();
    assert_eq!(saved, vec![0xAB; 8]);
}

#[test]
fn core_fault_halts_session_and_saves_ram() {
    let dir = tempfile::tempdir().unwrap();
    let (core, probe) = FakeCore::failing_on(4);
    let mut emulator = Emulator::builder(core)
        .title("Panic Bomber")
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    let frames = emulator.subscribe_frames();
    emulator.start().unwrap();

    assert!(wait_for(|| emulator.status() == SessionStatus::Halted));
    let fault = emulator.fault().expect("fault recorded");
    assert_eq!(fault.message(), "bus error on call 4");
    assert_eq!(probe.lock().calls, 4);

    // RAM from the last successful tick, written once the loop unwinds.
    let ram_file = dir.path().join("Saves/Panic Bomber.sav");
    assert!(wait_for(|| std::fs::read(&ram_file).is_ok_and(|saved| saved == 3u64.to_le_bytes())));

    // The loop is gone: consumers drain and then see the channel close.
    assert!(wait_for(|| matches!(frames.try_recv(), Err(Closed))));
    assert!(matches!(emulator.start(), Err(RuntimeError::SessionHalted)));
}

#[test]
fn fault_on_priming_tick_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::failing_on(1);
    let mut emulator = Emulator::builder(core)
        .config(headless_config(dir.path()))
        .build()
        .unwrap();

    assert!(matches!(emulator.start(), Err(RuntimeError::Core(_))));
    assert_eq!(emulator.status(), SessionStatus::Halted);
    assert!(emulator.fault().is_some());
}

#[test]
fn merged_inputs_reach_the_core() {
    let dir = tempfile::tempdir().unwrap();
    let keyboard = SharedInputs::new();
    let touch = SharedInputs::new();
    let (core, probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .config(headless_config(dir.path()))
        .input(keyboard.clone())
        .input(touch.clone())
        .build()
        .unwrap();
    emulator.start().unwrap();

    keyboard.set_button(Button::A, true);
    touch.set_button(Button::LeftDpadUp, true);
    assert!(wait_for(|| {
        let inputs = probe.lock().last_inputs;
        inputs.a_button && inputs.left_dpad_up
    }));

    keyboard.set_button(Button::A, false);
    assert!(wait_for(|| {
        let inputs = probe.lock().last_inputs;
        !inputs.a_button && inputs.left_dpad_up
    }));
}

#[test]
fn display_settings_apply_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    let frames = emulator.subscribe_frames();
    emulator.start().unwrap();

    let green = LedColors {
        foreground: Rgb::new(0, 0xFF, 0),
        background: Rgb::new(0, 0, 0x20),
    };
    emulator.set_colors(green);
    emulator.set_separation(2.0);
    assert_eq!(emulator.colors(), green);

    assert!(wait_for(|| {
        let Ok(Some(frame)) = frames.recv_timeout(Duration::from_millis(100)) else {
            return false;
        };
        pixel(&frame.left, 0, 0) == [0, 0xFF, 0, 0xFF]
            && pixel(&frame.left, 383, 0) == [0, 0, 0x20, 0xFF]
            && pixel(&frame.right, 0, 0) == [0, 0, 0x20, 0xFF]
    }));
}

#[test]
fn audio_reaches_the_ring_interleaved() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    let mut reader = emulator.take_audio_reader().expect("disabled mode exposes reader");
    assert!(emulator.take_audio_reader().is_none());

    emulator.start().unwrap();
    assert!(wait_for(|| reader.available() >= 4));

    let mut frame = [0u8; 4];
    assert_eq!(reader.read(&mut frame), 4);
    let left = i16::from_le_bytes([frame[0], frame[1]]);
    let right = i16::from_le_bytes([frame[2], frame[3]]);
    assert!(left > 0);
    assert_eq!(right, -left);
}

#[test]
fn save_and_load_state_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let (core, probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .title("Vertical Force")
        .config(headless_config(dir.path()))
        .build()
        .unwrap();
    emulator.start().unwrap();

    let path = emulator.save_state().unwrap();
    assert_eq!(
        path.parent().unwrap(),
        dir.path().join("Savestates/Vertical Force")
    );
    assert_eq!(path.extension().unwrap(), "savestate");
    let contents = std::fs::read(&path).unwrap();
    assert!(contents.starts_with(b"state@"));
    assert_eq!(emulator.list_savestates().unwrap(), vec![path.clone()]);

    emulator.load_state(&path).unwrap();
    assert_eq!(probe.lock().applied, vec![contents]);

    let missing = emulator.load_state(dir.path().join("missing.savestate"));
    assert!(matches!(missing, Err(RuntimeError::Core(_))));
    assert_eq!(emulator.status(), SessionStatus::Running);
}

#[test]
fn save_state_while_idle_runs_inline() {
    let dir = tempfile::tempdir().unwrap();
    let (core, probe) = FakeCore::new();
    let mut emulator = Emulator::builder(core)
        .title("Mario Clash")
        .config(headless_config(dir.path()))
        .build()
        .unwrap();

    let path = emulator.save_state().unwrap();
    emulator.load_state(&path).unwrap();
    assert_eq!(probe.lock().applied, vec![b"state@0".to_vec()]);
    assert_eq!(probe.lock().calls, 0);
}

#[test]
fn sound_toggle_and_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let (core, _probe) = FakeCore::new();
    let emulator = Emulator::builder(core)
        .config(RuntimeConfig {
            sound_enabled: false,
            ..headless_config(dir.path())
        })
        .build()
        .unwrap();
    assert!(!emulator.sound_enabled());
    emulator.set_sound_enabled(true);
    assert!(emulator.sound_enabled());

    emulator.set_separation(f32::NAN);
    assert_eq!(emulator.separation(), 0.0);

    let (core, _probe) = FakeCore::new();
    let invalid = Emulator::builder(core)
        .config(RuntimeConfig {
            samples_per_tick: 0,
            ..headless_config(dir.path())
        })
        .build();
    assert!(matches!(invalid, Err(RuntimeError::InvalidConfig(_))));
}
