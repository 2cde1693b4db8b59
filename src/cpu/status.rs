//! The 6502 status register `P`.
//!
//! Kept packed as a single byte (bit 5 is wired high and never cleared), with
//! typed get/set by flag tag rather than bit-offset arithmetic at call sites.

use bitflags::bitflags;

bitflags! {
    #[derive(Default)]
    pub struct StatusFlags: u8 {
        const CARRY             = 1 << 0;
        const ZERO              = 1 << 1;
        const INTERRUPT_DISABLE = 1 << 2;
        const DECIMAL           = 1 << 3;
        const BREAK             = 1 << 4;
        const UNUSED            = 1 << 5;
        const OVERFLOW          = 1 << 6;
        const NEGATIVE          = 1 << 7;
    }
}

impl StatusFlags {
    /// Power-up/reset value: `0x34` (I set, bit 5 and BREAK set) per §3.
    pub fn power_up() -> Self {
        Self::from_bits_truncate(0x34)
    }

    pub fn get(self, flag: StatusFlags) -> bool {
        self.contains(flag)
    }

    pub fn set_flag(&mut self, flag: StatusFlags, value: bool) {
        self.set(flag, value);
    }

    /// `Z <- (r == 0)`, `N <- bit 7 of r`, leaving other flags untouched.
    pub fn auto_set_zn(&mut self, r: u8) {
        self.set_flag(StatusFlags::ZERO, r == 0);
        self.set_flag(StatusFlags::NEGATIVE, r & 0x80 != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_round_trip_leaves_other_bits_unchanged() {
        let mut p = StatusFlags::power_up();
        p.set_flag(StatusFlags::CARRY, true);
        assert!(p.get(StatusFlags::CARRY));
        assert!(p.get(StatusFlags::INTERRUPT_DISABLE));

        p.set_flag(StatusFlags::CARRY, false);
        assert!(!p.get(StatusFlags::CARRY));
        assert!(p.get(StatusFlags::INTERRUPT_DISABLE));
    }

    #[test]
    fn auto_set_zn_tracks_zero_and_negative() {
        let mut p = StatusFlags::empty();
        p.auto_set_zn(0);
        assert!(p.get(StatusFlags::ZERO));
        assert!(!p.get(StatusFlags::NEGATIVE));

        p.auto_set_zn(0x80);
        assert!(!p.get(StatusFlags::ZERO));
        assert!(p.get(StatusFlags::NEGATIVE));
    }

    #[test]
    fn power_up_matches_reset_value() {
        assert_eq!(StatusFlags::power_up().bits(), 0x34);
    }
}
