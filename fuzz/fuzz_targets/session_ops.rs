#![no_main]

use libfuzzer_sys::fuzz_target;
use questline_core::{Callback, CallbackTable, ScriptedEngine, Session, SessionConfig};

const WORLD: &str = "\
= START
print fuzz harness floor
act Go|goto HALL
act Tally|SCORE = SCORE + 1
act Quit|halt
obj Torch
obj Rope
COUNTER = 'TICK'
USERCOM = 'HEARD'
= HALL
print a hall
act Back|goto START
= TICK
TICKS = TICKS + 1
= HEARD
LAST = USER_TEXT
= FORK
F = F + 1
= SPOON
S = S + 1
";

fuzz_target!(|data: &[u8]| {
    if data.len() > 4_096 {
        return;
    }

    let mut table = CallbackTable::new();
    table.register(Callback::GetMsCount(Box::new(|_| 12)));
    table.register(Callback::InputBox(Box::new(|_, _| "fuzzed".to_owned())));
    table.register(Callback::ShowMenu(Box::new(|ctx| {
        let _ = ctx.select_menu_item(0);
    })));

    let config = SessionConfig {
        exit_on_error: false,
        ..SessionConfig::default()
    };
    let mut session = Session::new(Box::new(ScriptedEngine::new()), table, &config);
    if session
        .load_world_from_buffer(WORLD.as_bytes(), "fuzz.ql")
        .is_err()
    {
        return;
    }
    if session.restart(false).is_err() {
        return;
    }

    let mut saved: Option<Vec<u8>> = None;

    for chunk in data.chunks(2) {
        let [op, arg] = match chunk {
            [a, b] => [*a, *b],
            _ => break,
        };
        match op % 10 {
            0 => {
                let _ = session.exec_string(&format!("V{} = {}", arg % 8, arg), false);
            }
            1 => {
                let _ = session.set_selected_action(usize::from(arg % 4), arg & 1 == 0);
            }
            2 => {
                let _ = session.execute_selected_action(false);
            }
            3 => {
                let _ = session.set_selected_object(usize::from(arg % 4), false);
            }
            4 => {
                session.set_input_text(&format!("line {arg}"));
                let _ = session.exec_user_input(false);
            }
            5 => {
                let _ = session.exec_counter(arg & 1 == 0);
            }
            6 => {
                if let Ok(blob) = session.save_to_buffer() {
                    saved = Some(blob);
                }
            }
            7 => {
                if let Some(blob) = &saved {
                    let _ = session.load_from_buffer(blob, false);
                }
            }
            8 => {
                let _ = session.restart(false);
            }
            _ => {
                let _ = session.exec_string("menu Fork:FORK;Spoon:SPOON", false);
            }
        }
    }

    let snap = session.snapshot();
    let report = snap.last_error();
    assert!(
        report.code == 0 || (100..=125).contains(&report.code),
        "fault code out of band under fuzz input: {}",
        report.code
    );
    let _ = snap.main_description();
    let _ = snap.actions();
    let _ = snap.objects();
    let _ = snap.menu_items();
    session.terminate();
});
