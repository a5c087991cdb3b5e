#![no_main]

use knot_session::{Action, FileId, SessionState, SETTINGS_FILE_NAME};
use libfuzzer_sys::fuzz_target;

const MAX_OPS: usize = 256;
const NAMES: [&str; 4] = ["a.py", "b.py", "c.py", SETTINGS_FILE_NAME];

fn name(seed: u8) -> &'static str {
    NAMES[usize::from(seed) % NAMES.len()]
}

fn pick(state: &SessionState<u32>, seed: u8) -> FileId {
    let files = state.files();
    if files.is_empty() {
        // Unknown ids must leave the state untouched.
        return FileId(u32::from(seed) + 1_000);
    }
    files[usize::from(seed) % files.len()].id
}

fn action(state: &SessionState<u32>, op: u8, arg: u8, handle: u32) -> Action<u32> {
    match op % 6 {
        0 => Action::add(name(arg), "", Some(handle)),
        1 => Action::change(pick(state, arg), format!("x = {arg}")),
        2 => Action::rename(pick(state, arg), name(arg >> 2), Some(handle)),
        3 => Action::Remove {
            id: pick(state, arg),
        },
        4 => Action::SelectFile {
            id: pick(state, arg),
        },
        _ => Action::SelectFileByName {
            name: name(arg).into(),
        },
    }
}

fuzz_target!(|data: &[u8]| {
    let mut state = SessionState::new();
    for (step, chunk) in data.chunks_exact(2).take(MAX_OPS).enumerate() {
        let action = action(&state, chunk[0], chunk[1], step as u32);
        let removed = match &action {
            Action::Remove { id } => state.position(*id).map(|position| (*id, position)),
            _ => None,
        };
        let was_selected = removed.is_some_and(|(id, _)| state.selected() == Some(id));
        let revision = state.revision();

        state = state.reduce(action);

        if let Err(violation) = state.check_invariants() {
            panic!("invariant violated: {violation}");
        }
        assert!(state.revision() >= revision);
        if let (true, Some((_, position))) = (was_selected, removed) {
            let expected = position
                .checked_sub(1)
                .or((position < state.len()).then_some(position))
                .map(|index| state.files()[index].id);
            assert_eq!(state.selected(), expected);
        }
    }
});
