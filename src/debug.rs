//! Read-only debug surface over a `Machine` (§4.9): register snapshot,
//! memory window, stack window, label index, and a program listing
//! annotated with the current IP and breakpoint markers. Nothing here
//! mutates machine state beyond the breakpoint set itself, which the
//! `Machine` already owns via `breakpoints_mut()`.

use crate::machine::{Machine, RegistersSnapshot};

/// One line of a program listing, ready for a textual debugger to print.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingLine {
    pub index: usize,
    pub text: String,
    pub is_current: bool,
    pub is_breakpoint: bool,
}

/// `registers()` already returns `RegistersSnapshot` (§6.1); re-exported
/// here under its debug-surface name so callers that only need the
/// read-only views can import from one place.
pub fn registers(m: &Machine) -> RegistersSnapshot {
    m.registers()
}

/// A window of `length` bytes starting at `start`, or `AddressOutOfRange`
/// if the window runs past the backing memory.
pub fn memory_window(m: &Machine, start: u32, length: usize) -> Result<Vec<u8>, crate::error::Error> {
    m.memory().read(start, length).map(|s| s.to_vec())
}

/// Words from SP up to (but not including) the empty-stack sentinel
/// 0xFFFE, read low-to-high address (i.e. top of stack first). Empty
/// when SP == 0xFFFE.
pub fn stack_window(m: &Machine) -> Result<Vec<u16>, crate::error::Error> {
    let sp = u32::from(m.registers().sp);
    let bottom = 0xFFFEu32;
    if sp >= bottom {
        return Ok(Vec::new());
    }
    let mut words = Vec::with_capacity(((bottom - sp) / 2) as usize);
    let mut addr = sp;
    while addr < bottom {
        words.push(m.read_word(addr)?);
        addr += 2;
    }
    Ok(words)
}

/// The full label index as name/index pairs, sorted by index then name
/// so a listing can be produced deterministically.
pub fn label_index(m: &Machine) -> Vec<(String, usize)> {
    let mut labels: Vec<(String, usize)> = m
        .program()
        .labels
        .iter()
        .map(|(name, idx)| (name.clone(), *idx))
        .collect();
    labels.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    labels
}

/// The program listing, one entry per instruction, each tagged with
/// whether it's the current IP and whether a breakpoint sits on it.
pub fn listing(m: &Machine) -> Vec<ListingLine> {
    let ip = m.ip();
    let breakpoints = m.breakpoints();
    m.program()
        .source_lines
        .iter()
        .enumerate()
        .map(|(index, text)| ListingLine {
            index,
            text: text.clone(),
            is_current: index == ip,
            is_breakpoint: breakpoints.hit(index),
        })
        .collect()
}

#[cfg(test)]
#[path = "./debug_test.rs"]
mod debug_test;
