//! Listening-gate persistence tests

use orion_assistant::{GateState, ListeningGate};

#[test]
fn stop_forces_off_from_any_state() {
    let dir = tempfile::tempdir().unwrap();
    let gate = ListeningGate::new(dir.path().join("gate"));

    gate.activate().unwrap();
    gate.stop().unwrap();
    assert_eq!(gate.read(), GateState::Off);

    gate.arm().unwrap();
    gate.stop().unwrap();
    assert_eq!(gate.read(), GateState::Off);

    // Already off: still fine
    gate.stop().unwrap();
    assert_eq!(gate.read(), GateState::Off);
}

#[test]
fn concurrent_readers_never_see_torn_values() {
    let dir = tempfile::tempdir().unwrap();
    let gate = ListeningGate::new(dir.path().join("gate"));
    gate.write(GateState::Off).unwrap();

    let reader_gate = gate.clone();
    let reader = std::thread::spawn(move || {
        // Every read must be one of the three valid states; the default-safe
        // fallback also lands on a valid state, so a torn read would have to
        // produce a panic or garbage - neither may happen.
        for _ in 0..500 {
            let _ = reader_gate.read();
        }
    });

    for i in 0..500 {
        let state = match i % 3 {
            0 => GateState::Off,
            1 => GateState::Armed,
            _ => GateState::Active,
        };
        gate.write(state).unwrap();
    }

    reader.join().unwrap();
}

#[test]
fn independent_handles_observe_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gate");

    let writer = ListeningGate::new(path.clone());
    let reader = ListeningGate::new(path);

    writer.activate().unwrap();
    assert_eq!(reader.read(), GateState::Active);

    writer.stop().unwrap();
    assert_eq!(reader.read(), GateState::Off);
}

#[test]
fn overwrite_replaces_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let gate = ListeningGate::new(dir.path().join("gate"));

    gate.arm().unwrap();
    gate.activate().unwrap();
    assert_eq!(gate.read(), GateState::Active);

    let content = std::fs::read_to_string(gate.path()).unwrap();
    assert_eq!(content.trim(), "active");
}

#[test]
fn unreadable_content_defaults_to_off_without_crashing() {
    let dir = tempfile::tempdir().unwrap();
    let gate = ListeningGate::new(dir.path().join("gate"));

    std::fs::write(gate.path(), [0xff, 0xfe, 0x00]).unwrap();
    assert_eq!(gate.read(), GateState::Off);
}
