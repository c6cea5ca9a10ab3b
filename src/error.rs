quick_error! {
    /// Every way an instruction, a program load, or a memory access can fail.
    #[derive(Debug, PartialEq, Clone)]
    pub enum Error {
        UnknownMnemonic(mnemonic: String) {
            display("unknown mnemonic: {}", mnemonic)
        }
        BadArity(mnemonic: String, expected: usize, got: usize) {
            display("{} expects {} operand(s), got {}", mnemonic, expected, got)
        }
        OperandMismatch(detail: String) {
            display("operand mismatch: {}", detail)
        }
        UnknownLabel(label: String) {
            display("unknown label: {}", label)
        }
        InvalidRegister(token: String) {
            display("not a register: {}", token)
        }
        AddressOutOfRange(address: u32) {
            display("address out of range: {:#06x}", address)
        }
        DivisionByZero {
            display("division by zero")
        }
        ParseError(detail: String) {
            display("parse error: {}", detail)
        }
        Unimplemented(mnemonic: String) {
            display("{} is not implemented", mnemonic)
        }
        Halt {
            display("halt")
        }
    }
}

/// An error tagged with the instruction-stream index that raised it, so a
/// caller can report "instruction 7: DivisionByZero" without re-deriving
/// the index from IP bookkeeping.
#[derive(Debug, PartialEq, Clone)]
pub struct StepError {
    pub index: usize,
    pub source: Error,
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "instruction {}: {}", self.index, self.source)
    }
}

impl std::error::Error for StepError {}
