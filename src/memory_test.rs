use super::*;

#[test]
fn word_round_trips_at_every_address() {
    let mut m = Memory::new(16);
    for addr in 0..(m.len() as u32 - 1) {
        m.write_word(addr, 0xBEEF).unwrap();
        assert_eq!(m.read_word(addr).unwrap(), 0xBEEF);
    }
}

#[test]
fn little_endian_law() {
    let mut m = Memory::new(16);
    m.write_word(0, 0xABCD).unwrap();
    assert_eq!(m.read_byte(0).unwrap(), 0xCD);
    assert_eq!(m.read_byte(1).unwrap(), 0xAB);
    let lo = u16::from(m.read_byte(0).unwrap());
    let hi = u16::from(m.read_byte(1).unwrap());
    assert_eq!(m.read_word(0).unwrap(), lo | (hi << 8));
}

#[test]
fn out_of_range_byte_access_fails() {
    let m = Memory::new(4);
    assert_eq!(m.read_byte(4), Err(Error::AddressOutOfRange(4)));
}

#[test]
fn word_access_straddling_the_end_fails() {
    let m = Memory::new(4);
    assert_eq!(m.read_word(3), Err(Error::AddressOutOfRange(4)));
}

#[test]
fn reset_zeroes_but_keeps_size() {
    let mut m = Memory::new(8);
    m.write_byte(0, 0xFF).unwrap();
    m.reset();
    assert_eq!(m.read_byte(0).unwrap(), 0);
    assert_eq!(m.len(), 8);
}
