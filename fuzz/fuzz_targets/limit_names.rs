#![no_main]

use capwd_lattice::{CommandSet, FieldMask, RestrictionState, UserLimit};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let names: Vec<&str> = s.split(',').collect();

    let mut state = RestrictionState::default();
    state
        .limit_fields(FieldMask::all().without(capwd_lattice::Field::Passwd))
        .unwrap();
    let before = state.clone();

    if let Ok(commands) = CommandSet::parse_names(&names) {
        if state.limit_commands(commands).is_ok() {
            assert_eq!(state.commands(), commands);
        }
    }
    if let Ok(fields) = FieldMask::parse_names(&names) {
        let accepted = state.limit_fields(fields).is_ok();
        assert_eq!(accepted, fields.is_subset(&before.fields()));
    }
    let _ = state.limit_users(UserLimit::only(names.iter().copied(), []));
    assert!(state.leq(&before));
});
