use super::*;
use crate::machine::Machine;

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| s.to_string()).collect()
}

#[test]
fn memory_window_reads_back_written_bytes() {
    let mut m = Machine::with_default_memory();
    m.write_byte(0x10, 0xAB).unwrap();
    m.write_byte(0x11, 0xCD).unwrap();
    assert_eq!(memory_window(&m, 0x10, 2).unwrap(), vec![0xAB, 0xCD]);
}

#[test]
fn memory_window_out_of_range_fails() {
    let m = Machine::new(4);
    assert!(memory_window(&m, 2, 8).is_err());
}

#[test]
fn stack_window_is_empty_at_rest() {
    let m = Machine::with_default_memory();
    assert_eq!(stack_window(&m).unwrap(), Vec::<u16>::new());
}

#[test]
fn stack_window_lists_pushed_words_top_first() {
    let mut m = Machine::with_default_memory();
    m.push_word(0x1111).unwrap();
    m.push_word(0x2222).unwrap();
    assert_eq!(stack_window(&m).unwrap(), vec![0x2222, 0x1111]);
}

#[test]
fn label_index_is_sorted_by_instruction_index() {
    let mut m = Machine::with_default_memory();
    m.load_program(&lines(&["JMP skip", "NOP", "skip: HLT"])).unwrap();
    assert_eq!(label_index(&m), vec![("skip".to_string(), 2)]);
}

#[test]
fn listing_marks_current_ip_and_breakpoints() {
    let mut m = Machine::with_default_memory();
    m.load_program(&lines(&["MOV AX, 1h", "MOV BX, 2h", "HLT"])).unwrap();
    m.breakpoints_mut().add(1);
    let entries = listing(&m);
    assert_eq!(entries.len(), 3);
    assert!(entries[0].is_current);
    assert!(!entries[0].is_breakpoint);
    assert!(entries[1].is_breakpoint);
    assert!(!entries[1].is_current);
}
