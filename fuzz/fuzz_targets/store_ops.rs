#![no_main]

use colonnade_engine::{AssignmentStore, PortletAssignment};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

const MAX_STEPS: usize = 64;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    run_store_program(data);
});

fn run_store_program(data: &[u8]) {
    let mut store = AssignmentStore::new();
    let mut cursor = 0usize;

    for _ in 0..MAX_STEPS {
        let opcode = byte(data, cursor);
        let operand = byte(data, cursor.saturating_add(1));
        cursor = cursor.saturating_add(2);

        match opcode % 5 {
            0 => {
                let _ = store.save(PortletAssignment::new(
                    "new",
                    json!({ "seed": operand }),
                ));
            }
            1 => {
                let name = (operand % 8).to_string();
                let _ = store.save(PortletAssignment::new(&name, json!({ "seed": operand })));
            }
            2 => {
                let name = (operand % 8).to_string();
                let _ = store.move_to(&name, usize::from(operand / 8));
            }
            3 => {
                let name = (operand % 8).to_string();
                let _ = store.delete(&name);
            }
            _ => {
                let _ = store.len();
                let _ = store.is_empty();
            }
        }

        check_names_are_contiguous(&store);
    }
}

// Entry names must always read back as their own display position.
fn check_names_are_contiguous(store: &AssignmentStore) {
    for (index, assignment) in store.iter().enumerate() {
        assert_eq!(assignment.name, index.to_string());
        assert!(store.get(&assignment.name).is_some());
    }
}

fn byte(data: &[u8], index: usize) -> u8 {
    if data.is_empty() {
        return 0;
    }
    data[index % data.len()]
}
