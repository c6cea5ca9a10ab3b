use super::*;

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| s.to_string()).collect()
}

#[test]
fn labels_map_to_the_next_instruction_index() {
    let p = load(&lines(&["MOV CX, 3", "L:", "INC AX", "LOOP L", "HLT"])).unwrap();
    assert_eq!(p.label_address("L"), Some(1));
    assert_eq!(p.len(), 4);
}

#[test]
fn labelled_instruction_on_one_line() {
    let p = load(&lines(&["start: MOV AX, 1h", "JMP start"])).unwrap();
    assert_eq!(p.label_address("start"), Some(0));
}

#[test]
fn blank_and_comment_only_lines_are_skipped() {
    let p = load(&lines(&["", "  ; a comment", "MOV AX, 1h"])).unwrap();
    assert_eq!(p.len(), 1);
}

#[test]
fn comments_are_stripped_from_instruction_lines() {
    let p = load(&lines(&["MOV AX, 1h ; load one"])).unwrap();
    assert_eq!(p.instructions[0].operands.len(), 2);
}

#[test]
fn malformed_instruction_fails_the_whole_load() {
    let err = load(&lines(&["MOV AX, 1h", "FROB BX"])).unwrap_err();
    assert!(matches!(err, Error::UnknownMnemonic(_)));
}

#[test]
fn has_label_implies_address_within_program_bounds() {
    let p = load(&lines(&["start:", "NOP"])).unwrap();
    assert!(p.has_label("start"));
    assert!(p.label_address("start").unwrap() < p.len());
}
