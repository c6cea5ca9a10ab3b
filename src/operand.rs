use crate::error::Error;
use crate::register::{R16, R8};

/// The explicit size hint a memory operand may carry (`BYTE PTR` /
/// `WORD PTR`), used to resolve width when the other operand doesn't
/// carry one either (an immediate source into a memory destination).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

/// A decoded `[base ± index ± displacement]` memory expression.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryOperand {
    pub base: Option<R16>,     // BX or BP
    pub index: Option<R16>,    // SI or DI
    pub displacement: i16,
    pub has_displacement: bool,
}

impl MemoryOperand {
    /// The 16-bit effective address, wrapping on overflow per §4.2.
    pub fn effective_address(&self, base_val: u16, index_val: u16) -> u16 {
        let base = if self.base.is_some() { base_val } else { 0 };
        let index = if self.index.is_some() { index_val } else { 0 };
        let disp = if self.has_displacement { self.displacement as u16 } else { 0 };
        base.wrapping_add(index).wrapping_add(disp)
    }
}

/// A single classified operand token, as produced by `parse_operand`.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Reg8(R8),
    Reg16(R16),
    Imm(u32),
    Mem(MemoryOperand, Option<Width>),
    Label(String),
}

impl Operand {
    pub fn is_reg8(&self) -> bool {
        matches!(self, Operand::Reg8(_))
    }

    pub fn is_reg16(&self) -> bool {
        matches!(self, Operand::Reg16(_))
    }

    pub fn is_mem(&self) -> bool {
        matches!(self, Operand::Mem(_, _))
    }

    pub fn is_imm(&self) -> bool {
        matches!(self, Operand::Imm(_))
    }
}

/// Classifies a single whitespace-trimmed operand token (§4.1).
///
/// An optional `BYTE PTR` / `WORD PTR` prefix is stripped by the caller
/// (see `split_operands`) before the bracket itself reaches here.
pub fn parse_operand(token: &str, width_hint: Option<Width>) -> Result<Operand, Error> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::ParseError("empty operand".into()));
    }

    if token.starts_with('[') {
        if !token.ends_with(']') {
            return Err(Error::ParseError(format!("unterminated memory expression: {}", token)));
        }
        let inner = &token[1..token.len() - 1];
        let mem = parse_memory_expression(inner)?;
        return Ok(Operand::Mem(mem, width_hint));
    }

    if token.ends_with('h') || token.ends_with('H') {
        let digits = &token[..token.len() - 1];
        return u32::from_str_radix(digits, 16)
            .map(Operand::Imm)
            .map_err(|_| Error::ParseError(format!("bad hex immediate: {}", token)));
    }

    if token.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return token
            .parse::<u32>()
            .map(Operand::Imm)
            .map_err(|_| Error::ParseError(format!("bad decimal immediate: {}", token)));
    }

    if let Some(r8) = R8::from_str(token) {
        return Ok(Operand::Reg8(r8));
    }
    if let Some(r16) = R16::from_str(token) {
        return Ok(Operand::Reg16(r16));
    }

    Ok(Operand::Label(token.to_string()))
}

/// Parses the `term ((+|-) term)*` grammar inside a memory expression's
/// brackets (§4.2 / §9). Rejects a second base, a second index, a second
/// displacement, or an unrecognized term with `ParseError`.
fn parse_memory_expression(inner: &str) -> Result<MemoryOperand, Error> {
    let mut mem = MemoryOperand::default();
    let mut sign = 1i32;
    let mut term = String::new();

    let mut terms: Vec<(i32, String)> = Vec::new();
    for c in inner.chars() {
        match c {
            '+' => {
                if !term.is_empty() {
                    terms.push((sign, std::mem::take(&mut term)));
                }
                sign = 1;
            }
            '-' => {
                if !term.is_empty() {
                    terms.push((sign, std::mem::take(&mut term)));
                }
                sign = -1;
            }
            c if c.is_whitespace() => {}
            _ => term.push(c),
        }
    }
    if !term.is_empty() {
        terms.push((sign, term));
    }

    if terms.is_empty() {
        return Err(Error::ParseError("empty memory expression".into()));
    }

    for (sign, raw) in terms {
        match raw.to_ascii_uppercase().as_str() {
            "BX" | "BP" => {
                if mem.base.is_some() {
                    return Err(Error::ParseError(format!("more than one base register in [{}]", inner)));
                }
                if sign < 0 {
                    return Err(Error::ParseError(format!("base register cannot be negated in [{}]", inner)));
                }
                mem.base = R16::from_str(&raw);
            }
            "SI" | "DI" => {
                if mem.index.is_some() {
                    return Err(Error::ParseError(format!("more than one index register in [{}]", inner)));
                }
                if sign < 0 {
                    return Err(Error::ParseError(format!("index register cannot be negated in [{}]", inner)));
                }
                mem.index = R16::from_str(&raw);
            }
            _ => {
                if mem.has_displacement {
                    return Err(Error::ParseError(format!("more than one displacement in [{}]", inner)));
                }
                let digits = raw.trim_end_matches(|c| c == 'h' || c == 'H');
                let value = i64::from_str_radix(digits, 16)
                    .map_err(|_| Error::ParseError(format!("bad displacement term: {}", raw)))?;
                mem.displacement = (sign as i64 * value) as i16;
                mem.has_displacement = true;
            }
        }
    }

    Ok(mem)
}

/// Splits a raw operand list on top-level commas (none occur inside
/// `[...]` in this grammar, so a plain split is sufficient) and strips a
/// leading `BYTE PTR` / `WORD PTR` size keyword from each operand,
/// returning the operand text alongside its optional width hint.
pub fn split_operands(operands: &str) -> Vec<(String, Option<Width>)> {
    if operands.trim().is_empty() {
        return Vec::new();
    }
    operands
        .split(',')
        .map(|raw| {
            let trimmed = raw.trim();
            let upper = trimmed.to_ascii_uppercase();
            if let Some(rest) = upper.strip_prefix("BYTE PTR") {
                (trimmed[trimmed.len() - rest.trim_start().len()..].trim().to_string(), Some(Width::Byte))
            } else if let Some(rest) = upper.strip_prefix("WORD PTR") {
                (trimmed[trimmed.len() - rest.trim_start().len()..].trim().to_string(), Some(Width::Word))
            } else {
                (trimmed.to_string(), None)
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "./operand_test.rs"]
mod operand_test;
