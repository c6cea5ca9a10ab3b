use super::*;

#[test]
fn classifies_hex_and_decimal_immediates() {
    assert_eq!(parse_operand("1Fh", None).unwrap(), Operand::Imm(0x1F));
    assert_eq!(parse_operand("0FFFFh", None).unwrap(), Operand::Imm(0xFFFF));
    assert_eq!(parse_operand("42", None).unwrap(), Operand::Imm(42));
}

#[test]
fn classifies_registers_case_insensitively() {
    assert_eq!(parse_operand("ax", None).unwrap(), Operand::Reg16(R16::AX));
    assert_eq!(parse_operand("AH", None).unwrap(), Operand::Reg8(R8::AH));
}

#[test]
fn anything_else_is_a_label() {
    assert_eq!(parse_operand("DONE", None).unwrap(), Operand::Label("DONE".into()));
}

#[test]
fn memory_expression_with_base_index_and_displacement() {
    let op = parse_operand("[BX+SI+10h]", None).unwrap();
    match op {
        Operand::Mem(mem, _) => {
            assert_eq!(mem.base, Some(R16::BX));
            assert_eq!(mem.index, Some(R16::SI));
            assert_eq!(mem.displacement, 0x10);
        }
        _ => panic!("expected a memory operand"),
    }
}

#[test]
fn memory_expression_with_negative_displacement() {
    let op = parse_operand("[BP-2h]", None).unwrap();
    match op {
        Operand::Mem(mem, _) => {
            assert_eq!(mem.base, Some(R16::BP));
            assert_eq!(mem.displacement, -2);
        }
        _ => panic!("expected a memory operand"),
    }
}

#[test]
fn rejects_a_second_base_register() {
    let err = parse_operand("[BX+BP]", None).unwrap_err();
    assert!(matches!(err, Error::ParseError(_)));
}

#[test]
fn effective_address_wraps() {
    let mem = MemoryOperand { base: Some(R16::BX), index: None, displacement: 0, has_displacement: false };
    assert_eq!(mem.effective_address(0xFFFF, 0).wrapping_add(2), 1);
}

#[test]
fn split_operands_strips_size_keyword() {
    let parts = split_operands("BYTE PTR [BX], 1h");
    assert_eq!(parts[0].0, "[BX]");
    assert_eq!(parts[0].1, Some(Width::Byte));
    assert_eq!(parts[1].0, "1h");
}
