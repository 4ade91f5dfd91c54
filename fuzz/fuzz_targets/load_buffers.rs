#![no_main]

use libfuzzer_sys::fuzz_target;
use questline_core::{CallbackTable, ScriptedEngine, Session, SessionConfig};

fuzz_target!(|data: &[u8]| {
    if data.len() > 65_536 {
        return;
    }

    let Some((selector, payload)) = data.split_first() else {
        return;
    };

    let config = SessionConfig {
        exit_on_error: false,
        ..SessionConfig::default()
    };
    let mut session = Session::new(
        Box::new(ScriptedEngine::new()),
        CallbackTable::new(),
        &config,
    );

    match selector % 3 {
        0 => {
            // Arbitrary bytes as a world definition.
            let _ = session.load_world_from_buffer(payload, "fuzz.ql");
            let _ = session.restart(false);
        }
        1 => {
            // Arbitrary bytes as a status buffer against a known world.
            let _ = session.load_world_from_buffer(b"= START\nprint ok\n", "fuzz.ql");
            let _ = session.restart(false);
            let _ = session.load_from_buffer(payload, false);
        }
        _ => {
            // First half a world, second half a status buffer.
            let mid = payload.len() / 2;
            let _ = session.load_world_from_buffer(&payload[..mid], "fuzz.ql");
            let _ = session.restart(false);
            let _ = session.load_from_buffer(&payload[mid..], false);
        }
    }

    let report = session.snapshot().last_error();
    assert!(
        report.code == 0 || (100..=125).contains(&report.code),
        "fault code out of band under fuzz input: {}",
        report.code
    );

    // Damaged input must never wedge the session.
    let _ = session.exec_string("FUZZ = 1", false);
    session.terminate();
});
