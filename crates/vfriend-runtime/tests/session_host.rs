mod common;

use std::sync::Arc;

use common::{FakeCore, Probe, headless_config, wait_for};
use parking_lot::Mutex;
use vfriend_runtime::{Emulator, LifecycleEvent, SessionHost, SessionStatus};

#[test]
fn background_halts_and_foreground_builds_a_fresh_session() {
    let dir = tempfile::tempdir().unwrap();
    let save_dir = dir.path().to_path_buf();
    let probes: Arc<Mutex<Vec<Probe>>> = Arc::default();

    let factory_probes = Arc::clone(&probes);
    let mut host = SessionHost::new(move || {
        let (core, probe) = FakeCore::new();
        factory_probes.lock().push(probe);
        Emulator::builder(core)
            .title("Golf")
            .config(headless_config(&save_dir))
            .build()
    });
    assert!(host.emulator().is_none());

    host.handle(LifecycleEvent::Active).unwrap();
    assert_eq!(host.generation(), 1);
    assert!(wait_for(|| host.emulator().unwrap().stats().ticks >= 3));

    // Repeated activation keeps the running session.
    host.handle(LifecycleEvent::Active).unwrap();
    assert_eq!(host.generation(), 1);

    host.handle(LifecycleEvent::Background).unwrap();
    assert_eq!(host.emulator().unwrap().status(), SessionStatus::Halted);
    let first_calls = probes.lock()[0].lock().calls;

    host.handle(LifecycleEvent::Active).unwrap();
    assert_eq!(host.generation(), 2);
    assert_eq!(host.emulator().unwrap().status(), SessionStatus::Running);

    // The new session resumed from the RAM the old one persisted.
    let second = Arc::clone(&probes.lock()[1]);
    assert_eq!(
        second.lock().loaded_ram,
        Some(first_calls.to_le_bytes().to_vec())
    );

    host.handle(LifecycleEvent::Inactive).unwrap();
    assert_eq!(host.emulator().unwrap().status(), SessionStatus::Halted);
}

#[test]
fn factory_errors_surface_on_activation() {
    let mut host: SessionHost<FakeCore> = SessionHost::new(|| {
        Err(vfriend_runtime::RuntimeError::AudioInit {
            reason: "no device".to_string(),
        })
    });
    assert!(host.handle(LifecycleEvent::Active).is_err());
    assert!(host.emulator().is_none());
    host.handle(LifecycleEvent::Background).unwrap();
}
