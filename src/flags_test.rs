use super::*;

#[test]
fn update_sets_zero_sign_parity() {
    let mut f = Flags::new();
    f.update(0x00, true, true);
    assert!(f.zero);
    assert!(!f.sign);
    assert!(f.parity); // 0 has even parity

    f.update(0x80, true, true);
    assert!(!f.zero);
    assert!(f.sign);
}

#[test]
fn update_sets_carry_only_when_requested() {
    let mut f = Flags::new();
    f.update(0x100, true, true); // overflowed a byte
    assert!(f.carry);

    let mut f2 = Flags::new();
    f2.update(0x100, true, false);
    assert!(!f2.carry);
}

#[test]
fn pack_unpack_round_trip() {
    let mut f = Flags::new();
    f.carry = true;
    f.zero = true;
    f.overflow = true;
    let packed = f.u16();
    let mut g = Flags::new();
    g.set_u16(packed);
    assert_eq!(f, g);
}

#[test]
fn add_overflow_detects_signed_wrap() {
    let mut f = Flags::new();
    // 0x7F + 0x01 = 0x80: positive + positive = negative -> OF
    f.set_add_overflow(0x7F, 0x01, 0x80, true);
    assert!(f.overflow);

    let mut f2 = Flags::new();
    // 0x10 + 0x10 = 0x20: no sign change -> no OF
    f2.set_add_overflow(0x10, 0x10, 0x20, true);
    assert!(!f2.overflow);
}

#[test]
fn sub_overflow_detects_signed_wrap() {
    let mut f = Flags::new();
    // 0x80 - 0x01 = 0x7F: negative - positive = positive -> OF
    f.set_sub_overflow(0x80, 0x01, 0x7F, true);
    assert!(f.overflow);
}
