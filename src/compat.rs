//! Cross-document identity propagation.
//!
//! The downstream engine refuses a process or filament document unless its
//! identity fields match the machine and its compatibility list names the
//! printer. Both are stamped here, after every other mutation of the machine
//! document.

use crate::profile::{FilamentDoc, MachineDoc, ProcessDoc};

/// Overwrite the identity fields of both documents with a snapshot of the
/// machine's current values. This is a copy, not a reference: later machine
/// mutations do not reach the documents.
pub fn copy_machine_signature(
    machine: &MachineDoc,
    process: &mut ProcessDoc,
    filament: &mut FilamentDoc,
) {
    process.signature = Some(machine.signature());
    filament.signature = Some(machine.signature());
}

/// Register `printer_name` in both compatibility lists (order-preserving, no
/// duplicates) and reset the conditional-compatibility expressions.
pub fn register_compatible_printer(
    printer_name: &str,
    process: &mut ProcessDoc,
    filament: &mut FilamentDoc,
) {
    push_unique(&mut process.compatible_printers, printer_name);
    push_unique(&mut filament.compatible_printers, printer_name);
    process.compatible_printers_condition.clear();
    filament.compatible_printers_condition.clear();
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|entry| entry == name) {
        list.push(name.to_string());
    }
}
