use crate::error::Error;
use crate::operand::{parse_operand, split_operands, Operand};

/// The string-primitive family a REP/REPE/REPNE prefix is allowed to
/// repeat (§4.6 "String"). Anything else behind a REP-family prefix is a
/// load-time `ParseError` (§9, resolving the "REP on non-string
/// instruction" open question in favor of rejecting it early).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StringOp {
    Movsb, Movsw, Cmpsb, Cmpsw, Scasb, Scasw, Lodsb, Lodsw, Stosb, Stosw,
}

impl StringOp {
    fn from_str(s: &str) -> Option<StringOp> {
        match s.to_ascii_uppercase().as_str() {
            "MOVSB" => Some(StringOp::Movsb),
            "MOVSW" => Some(StringOp::Movsw),
            "CMPSB" => Some(StringOp::Cmpsb),
            "CMPSW" => Some(StringOp::Cmpsw),
            "SCASB" => Some(StringOp::Scasb),
            "SCASW" => Some(StringOp::Scasw),
            "LODSB" => Some(StringOp::Lodsb),
            "LODSW" => Some(StringOp::Lodsw),
            "STOSB" => Some(StringOp::Stosb),
            "STOSW" => Some(StringOp::Stosw),
            _ => None,
        }
    }
}

/// The closed, tagged set of instruction kinds. The mnemonic text is
/// resolved to one of these once, at program-load time, so the per-step
/// dispatcher (`cpu::execute`) is a plain `match` with no string hashing
/// on the hot path (§9 "Instruction dispatch").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mnemonic {
    // data transfer
    Mov, Push, Pop, Xchg, Lea, Lds, Les, Lahf, Sahf, Pushf, Popf, Pusha, Popa,
    // arithmetic
    Add, Adc, Sub, Sbb, Inc, Dec, Neg, Mul, Imul, Div, Idiv, Cbw, Cwd,
    Aaa, Aas, Daa, Das, Aam, Aad,
    // logical / compare
    And, Or, Xor, Not, Test, Cmp,
    // shift / rotate
    Shl, Sal, Shr, Sar, Rol, Ror, Rcl, Rcr,
    // string primitives (bare, unprefixed)
    Movsb, Movsw, Cmpsb, Cmpsw, Scasb, Scasw, Lodsb, Lodsw, Stosb, Stosw,
    // REP-family prefixes, each carrying the primitive it repeats
    Rep(StringOp), Repe(StringOp), Repne(StringOp),
    // control transfer
    Jmp, Call, Ret, Retf,
    Je, Jne, Jb, Jnb, Jbe, Ja, Jl, Jnl, Jle, Jg, Jp, Jnp, Jo, Jno, Js, Jns,
    Jcxz, Loop, Loopz, Loopnz,
    // flag / processor control
    Clc, Stc, Cmc, Cld, Std, Cli, Sti, Hlt, Nop, Wait, Lock, Esc, Xlat,
    // interrupts / IO stubs
    Int, Into, Iret, In, Out,
}

impl Mnemonic {
    fn from_bare_str(s: &str) -> Option<Mnemonic> {
        use Mnemonic::*;
        Some(match s.to_ascii_uppercase().as_str() {
            "MOV" => Mov, "PUSH" => Push, "POP" => Pop, "XCHG" => Xchg,
            "LEA" => Lea, "LDS" => Lds, "LES" => Les, "LAHF" => Lahf,
            "SAHF" => Sahf, "PUSHF" => Pushf, "POPF" => Popf,
            "PUSHA" => Pusha, "POPA" => Popa,
            "ADD" => Add, "ADC" => Adc, "SUB" => Sub, "SBB" => Sbb,
            "INC" => Inc, "DEC" => Dec, "NEG" => Neg,
            "MUL" => Mul, "IMUL" => Imul, "DIV" => Div, "IDIV" => Idiv,
            "CBW" => Cbw, "CWD" => Cwd,
            "AAA" => Aaa, "AAS" => Aas, "DAA" => Daa, "DAS" => Das,
            "AAM" => Aam, "AAD" => Aad,
            "AND" => And, "OR" => Or, "XOR" => Xor, "NOT" => Not,
            "TEST" => Test, "CMP" => Cmp,
            "SHL" => Shl, "SAL" => Sal, "SHR" => Shr, "SAR" => Sar,
            "ROL" => Rol, "ROR" => Ror, "RCL" => Rcl, "RCR" => Rcr,
            "MOVSB" => Movsb, "MOVSW" => Movsw,
            "CMPSB" => Cmpsb, "CMPSW" => Cmpsw,
            "SCASB" => Scasb, "SCASW" => Scasw,
            "LODSB" => Lodsb, "LODSW" => Lodsw,
            "STOSB" => Stosb, "STOSW" => Stosw,
            "JMP" => Jmp, "CALL" => Call, "RET" => Ret, "RETF" => Retf,
            "JE" | "JZ" => Je, "JNE" | "JNZ" => Jne,
            "JB" | "JC" => Jb, "JNB" | "JNC" => Jnb,
            "JBE" => Jbe, "JA" => Ja,
            "JL" => Jl, "JNL" => Jnl, "JLE" => Jle, "JG" => Jg,
            "JP" => Jp, "JNP" => Jnp, "JO" => Jo, "JNO" => Jno,
            "JS" => Js, "JNS" => Jns,
            "JCXZ" => Jcxz, "LOOP" => Loop, "LOOPZ" => Loopz, "LOOPNZ" => Loopnz,
            "CLC" => Clc, "STC" => Stc, "CMC" => Cmc,
            "CLD" => Cld, "STD" => Std, "CLI" => Cli, "STI" => Sti,
            "HLT" => Hlt, "NOP" => Nop, "WAIT" => Wait,
            "LOCK" => Lock, "ESC" => Esc, "XLAT" | "XLATB" => Xlat,
            "INT" => Int, "INTO" => Into, "IRET" => Iret,
            "IN" => In, "OUT" => Out,
            _ => return None,
        })
    }

    /// Number of operands this mnemonic takes on the textual wire format.
    /// REP-family variants take none (their "operand" is the primitive
    /// name consumed during parsing, not a runtime operand).
    pub fn expected_arity(self) -> usize {
        use Mnemonic::*;
        match self {
            Mov | Xchg | Lea | Lds | Les | Add | Adc | Sub | Sbb | And | Or | Xor
            | Test | Cmp | Shl | Sal | Shr | Sar | Rol | Ror | Rcl | Rcr | In | Out => 2,

            Push | Pop | Inc | Dec | Neg | Not | Mul | Imul | Div | Idiv
            | Jmp | Call | Je | Jne | Jb | Jnb | Jbe | Ja | Jl | Jnl | Jle | Jg
            | Jp | Jnp | Jo | Jno | Js | Jns | Jcxz | Loop | Loopz | Loopnz | Int => 1,

            Lahf | Sahf | Pushf | Popf | Pusha | Popa | Cbw | Cwd
            | Aaa | Aas | Daa | Das | Aam | Aad
            | Movsb | Movsw | Cmpsb | Cmpsw | Scasb | Scasw | Lodsb | Lodsw | Stosb | Stosw
            | Ret | Retf | Clc | Stc | Cmc | Cld | Std | Cli | Sti
            | Hlt | Nop | Wait | Lock | Esc | Xlat | Into | Iret
            | Rep(_) | Repe(_) | Repne(_) => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Mov => "MOV", Push => "PUSH", Pop => "POP", Xchg => "XCHG", Lea => "LEA",
            Lds => "LDS", Les => "LES", Lahf => "LAHF", Sahf => "SAHF", Pushf => "PUSHF",
            Popf => "POPF", Pusha => "PUSHA", Popa => "POPA",
            Add => "ADD", Adc => "ADC", Sub => "SUB", Sbb => "SBB", Inc => "INC",
            Dec => "DEC", Neg => "NEG", Mul => "MUL", Imul => "IMUL", Div => "DIV",
            Idiv => "IDIV", Cbw => "CBW", Cwd => "CWD", Aaa => "AAA", Aas => "AAS",
            Daa => "DAA", Das => "DAS", Aam => "AAM", Aad => "AAD",
            And => "AND", Or => "OR", Xor => "XOR", Not => "NOT", Test => "TEST", Cmp => "CMP",
            Shl => "SHL", Sal => "SAL", Shr => "SHR", Sar => "SAR", Rol => "ROL",
            Ror => "ROR", Rcl => "RCL", Rcr => "RCR",
            Movsb => "MOVSB", Movsw => "MOVSW", Cmpsb => "CMPSB", Cmpsw => "CMPSW",
            Scasb => "SCASB", Scasw => "SCASW", Lodsb => "LODSB", Lodsw => "LODSW",
            Stosb => "STOSB", Stosw => "STOSW",
            Rep(_) => "REP", Repe(_) => "REPE", Repne(_) => "REPNE",
            Jmp => "JMP", Call => "CALL", Ret => "RET", Retf => "RETF",
            Je => "JE", Jne => "JNE", Jb => "JB", Jnb => "JNB", Jbe => "JBE", Ja => "JA",
            Jl => "JL", Jnl => "JNL", Jle => "JLE", Jg => "JG", Jp => "JP", Jnp => "JNP",
            Jo => "JO", Jno => "JNO", Js => "JS", Jns => "JNS",
            Jcxz => "JCXZ", Loop => "LOOP", Loopz => "LOOPZ", Loopnz => "LOOPNZ",
            Clc => "CLC", Stc => "STC", Cmc => "CMC", Cld => "CLD", Std => "STD",
            Cli => "CLI", Sti => "STI", Hlt => "HLT", Nop => "NOP", Wait => "WAIT",
            Lock => "LOCK", Esc => "ESC", Xlat => "XLAT",
            Int => "INT", Into => "INTO", Iret => "IRET", In => "IN", Out => "OUT",
        }
    }
}

/// One instruction, compiled once at load time: a tagged mnemonic and its
/// already-classified operands, plus the original source text (kept for
/// the debug surface's program listing).
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub operands: Vec<Operand>,
    pub text: String,
}

/// Compiles one already-comment-stripped source line's instruction text
/// (no label prefix) into a tagged `Instruction`. Validates mnemonic
/// recognition, arity, and operand classification — everything the
/// Program Loader can check without running the program (§4.7).
pub fn compile(text: &str) -> Result<Instruction, Error> {
    let trimmed = text.trim();
    let (head, rest) = match trimmed.find(char::is_whitespace) {
        Some(pos) => (&trimmed[..pos], trimmed[pos..].trim()),
        None => (trimmed, ""),
    };

    let mnemonic = if let Some(string_op) = rep_prefix(head) {
        let primitive = StringOp::from_str(rest).ok_or_else(|| {
            Error::ParseError(format!("{} requires a string instruction, got '{}'", head.to_ascii_uppercase(), rest))
        })?;
        string_op(head, primitive)
    } else {
        Mnemonic::from_bare_str(head).ok_or_else(|| Error::UnknownMnemonic(head.to_string()))?
    };

    let operand_tokens: Vec<(String, Option<crate::operand::Width>)> = if matches!(
        mnemonic,
        Mnemonic::Rep(_) | Mnemonic::Repe(_) | Mnemonic::Repne(_)
    ) {
        Vec::new()
    } else {
        split_operands(rest)
    };

    let expected = mnemonic.expected_arity();
    if operand_tokens.len() != expected {
        return Err(Error::BadArity(mnemonic.as_str().to_string(), expected, operand_tokens.len()));
    }

    let mut operands = Vec::with_capacity(operand_tokens.len());
    for (token, width) in &operand_tokens {
        operands.push(parse_operand(token, *width)?);
    }

    check_operand_widths(mnemonic, &operands)?;

    Ok(Instruction { mnemonic, operands, text: trimmed.to_string() })
}

fn rep_prefix(head: &str) -> Option<&'static str> {
    match head.to_ascii_uppercase().as_str() {
        "REP" => Some("REP"),
        "REPE" | "REPZ" => Some("REPE"),
        "REPNE" | "REPNZ" => Some("REPNE"),
        _ => None,
    }
}

fn string_op(prefix: &'static str, op: StringOp) -> Mnemonic {
    match prefix {
        "REP" => Mnemonic::Rep(op),
        "REPE" => Mnemonic::Repe(op),
        _ => Mnemonic::Repne(op),
    }
}

/// Rejects the one width mismatch that's statically detectable at
/// compile time: a 16-bit register paired with an 8-bit register across
/// a two-operand instruction that otherwise has no destination/source
/// distinction in width (§4.1 `OperandMismatch`). Memory-operand width
/// reconciliation that depends on the *other* operand's width happens
/// here too, when both operands are known at load time.
fn check_operand_widths(mnemonic: Mnemonic, operands: &[Operand]) -> Result<(), Error> {
    if operands.len() != 2 {
        return Ok(());
    }
    let widens = matches!(
        mnemonic,
        Mnemonic::Mov | Mnemonic::Xchg | Mnemonic::Add | Mnemonic::Adc | Mnemonic::Sub
            | Mnemonic::Sbb | Mnemonic::And | Mnemonic::Or | Mnemonic::Xor
            | Mnemonic::Test | Mnemonic::Cmp
    );
    if !widens {
        return Ok(());
    }
    if (operands[0].is_reg8() && operands[1].is_reg16()) || (operands[0].is_reg16() && operands[1].is_reg8()) {
        return Err(Error::OperandMismatch(format!(
            "cannot mix 8-bit and 16-bit registers in {}",
            mnemonic.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "./op_test.rs"]
mod op_test;
