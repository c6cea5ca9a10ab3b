use std::collections::HashMap;

use crate::error::Error;
use crate::op::{self, Instruction};

/// The loaded program: an instruction stream plus the label index that
/// maps a case-sensitive label name to the instruction-stream index it
/// points at (§3.4).
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
    /// The raw source line each instruction came from, parallel to
    /// `instructions`, kept for the debug surface's program listing.
    pub source_lines: Vec<String>,
}

impl Program {
    pub fn label_address(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Strips everything from the first unquoted `;` onward, and surrounding
/// whitespace (§4.7 step 1). This emulator's assembly format has no
/// string literals that would need quote-tracking beyond a plain scan,
/// but the scan still respects a `"` toggle so a `;` inside quotes is
/// left alone for forward compatibility with quoted string operands.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return line[..i].trim(),
            _ => {}
        }
    }
    line.trim()
}

/// Loads an ordered list of source lines into a `Program` (§4.7).
///
/// Labels are recognized as a leading `name:`; everything after the
/// colon on the same line, if any, is the instruction text for that same
/// line. A label-only line contributes to the label index at the index
/// of the next non-empty instruction. Every instruction is compiled
/// (mnemonic resolution, arity and operand validation) before the
/// program is returned, so a malformed line fails the load up front
/// rather than mid-run.
pub fn load(lines: &[String]) -> Result<Program, Error> {
    let mut program = Program::default();
    let mut pending_labels: Vec<String> = Vec::new();

    for raw in lines.iter() {
        let stripped = strip_comment(raw);
        if stripped.is_empty() {
            continue;
        }

        let (label, instruction_text) = match stripped.find(':') {
            Some(pos) => {
                let name = stripped[..pos].trim();
                let rest = stripped[pos + 1..].trim();
                (Some(name.to_string()), rest)
            }
            None => (None, stripped),
        };

        if let Some(name) = label {
            pending_labels.push(name);
        }

        if instruction_text.is_empty() {
            // label-only line: its labels resolve to the next instruction
            continue;
        }

        let index = program.instructions.len();
        for name in pending_labels.drain(..) {
            program.labels.insert(name, index);
        }

        let instruction = op::compile(instruction_text)?;
        program.instructions.push(instruction);
        program.source_lines.push(stripped.to_string());
    }

    Ok(program)
}

#[cfg(test)]
#[path = "./program_test.rs"]
mod program_test;
