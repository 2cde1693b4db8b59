//! The static opcode table.
//!
//! One entry per legal 6502 opcode byte, built once via [`once_cell`] and
//! indexed directly by the fetched opcode. Unofficial opcodes have no entry
//! and trip the CPU into the `ERROR` state (accuracy of unofficial opcodes
//! is explicitly out of scope).

use log::trace;
use once_cell::sync::Lazy;

use super::status::StatusFlags;
use super::Cpu;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

/// How an opcode consumes its resolved operand. Mirrors the shape of a
/// 6502's actual data paths: some instructions only ever touch registers
/// (`Implied`), some read a byte from memory (`Read`), some compute a byte to
/// store (`Write`), some read-modify-write in place (`Modify`), and a
/// handful have genuinely special control flow (`Jmp`/`Jsr`/.../`Pull`).
#[derive(Clone, Copy)]
pub enum OpKind {
    Implied(fn(&mut Cpu)),
    Read(fn(&mut Cpu, u8)),
    Write(fn(&mut Cpu) -> u8),
    Modify(fn(&mut Cpu, u8) -> u8),
    Branch(fn(&Cpu) -> bool),
    Jmp,
    Jsr,
    Rts,
    Brk,
    Rti,
    Push(fn(&Cpu) -> u8),
    Pull(fn(&mut Cpu, u8)),
}

#[derive(Clone, Copy)]
pub struct OpEntry {
    pub name: &'static str,
    pub mode: AddressingMode,
    pub cycles: u8,
    pub kind: OpKind,
}

pub static OPCODES: Lazy<[Option<OpEntry>; 256]> = Lazy::new(build_table);

macro_rules! op {
    ($table:ident, $code:expr, $name:expr, $mode:expr, $cycles:expr, $kind:expr) => {
        $table[$code as usize] = Some(OpEntry {
            name: $name,
            mode: $mode,
            cycles: $cycles,
            kind: $kind,
        });
    };
}

#[rustfmt::skip]
fn build_table() -> [Option<OpEntry>; 256] {
    use AddressingMode::*;

    let mut t: [Option<OpEntry>; 256] = [None; 256];

    op!(t, 0xA9, "LDA", Immediate, 2, OpKind::Read(lda)); op!(t, 0xA5, "LDA", ZeroPage, 3, OpKind::Read(lda));
    op!(t, 0xB5, "LDA", ZeroPageX, 4, OpKind::Read(lda)); op!(t, 0xAD, "LDA", Absolute, 4, OpKind::Read(lda));
    op!(t, 0xBD, "LDA", AbsoluteX, 4, OpKind::Read(lda)); op!(t, 0xB9, "LDA", AbsoluteY, 4, OpKind::Read(lda));
    op!(t, 0xA1, "LDA", IndirectX, 6, OpKind::Read(lda)); op!(t, 0xB1, "LDA", IndirectY, 5, OpKind::Read(lda));

    op!(t, 0xA2, "LDX", Immediate, 2, OpKind::Read(ldx)); op!(t, 0xA6, "LDX", ZeroPage, 3, OpKind::Read(ldx));
    op!(t, 0xB6, "LDX", ZeroPageY, 4, OpKind::Read(ldx)); op!(t, 0xAE, "LDX", Absolute, 4, OpKind::Read(ldx));
    op!(t, 0xBE, "LDX", AbsoluteY, 4, OpKind::Read(ldx));

    op!(t, 0xA0, "LDY", Immediate, 2, OpKind::Read(ldy)); op!(t, 0xA4, "LDY", ZeroPage, 3, OpKind::Read(ldy));
    op!(t, 0xB4, "LDY", ZeroPageX, 4, OpKind::Read(ldy)); op!(t, 0xAC, "LDY", Absolute, 4, OpKind::Read(ldy));
    op!(t, 0xBC, "LDY", AbsoluteX, 4, OpKind::Read(ldy));

    op!(t, 0x85, "STA", ZeroPage, 3, OpKind::Write(sta)); op!(t, 0x95, "STA", ZeroPageX, 4, OpKind::Write(sta));
    op!(t, 0x8D, "STA", Absolute, 4, OpKind::Write(sta)); op!(t, 0x9D, "STA", AbsoluteX, 5, OpKind::Write(sta));
    op!(t, 0x99, "STA", AbsoluteY, 5, OpKind::Write(sta)); op!(t, 0x81, "STA", IndirectX, 6, OpKind::Write(sta));
    op!(t, 0x91, "STA", IndirectY, 6, OpKind::Write(sta));

    op!(t, 0x86, "STX", ZeroPage, 3, OpKind::Write(stx)); op!(t, 0x96, "STX", ZeroPageY, 4, OpKind::Write(stx));
    op!(t, 0x8E, "STX", Absolute, 4, OpKind::Write(stx));

    op!(t, 0x84, "STY", ZeroPage, 3, OpKind::Write(sty)); op!(t, 0x94, "STY", ZeroPageX, 4, OpKind::Write(sty));
    op!(t, 0x8C, "STY", Absolute, 4, OpKind::Write(sty));

    op!(t, 0xAA, "TAX", Implied, 2, OpKind::Implied(tax)); op!(t, 0xA8, "TAY", Implied, 2, OpKind::Implied(tay));
    op!(t, 0xBA, "TSX", Implied, 2, OpKind::Implied(tsx)); op!(t, 0x8A, "TXA", Implied, 2, OpKind::Implied(txa));
    op!(t, 0x9A, "TXS", Implied, 2, OpKind::Implied(txs)); op!(t, 0x98, "TYA", Implied, 2, OpKind::Implied(tya));

    op!(t, 0x48, "PHA", Implied, 3, OpKind::Push(|c| c.a)); op!(t, 0x08, "PHP", Implied, 3, OpKind::Push(php));
    op!(t, 0x68, "PLA", Implied, 4, OpKind::Pull(pla)); op!(t, 0x28, "PLP", Implied, 4, OpKind::Pull(plp));

    op!(t, 0x69, "ADC", Immediate, 2, OpKind::Read(adc)); op!(t, 0x65, "ADC", ZeroPage, 3, OpKind::Read(adc));
    op!(t, 0x75, "ADC", ZeroPageX, 4, OpKind::Read(adc)); op!(t, 0x6D, "ADC", Absolute, 4, OpKind::Read(adc));
    op!(t, 0x7D, "ADC", AbsoluteX, 4, OpKind::Read(adc)); op!(t, 0x79, "ADC", AbsoluteY, 4, OpKind::Read(adc));
    op!(t, 0x61, "ADC", IndirectX, 6, OpKind::Read(adc)); op!(t, 0x71, "ADC", IndirectY, 5, OpKind::Read(adc));

    op!(t, 0xE9, "SBC", Immediate, 2, OpKind::Read(sbc)); op!(t, 0xE5, "SBC", ZeroPage, 3, OpKind::Read(sbc));
    op!(t, 0xF5, "SBC", ZeroPageX, 4, OpKind::Read(sbc)); op!(t, 0xED, "SBC", Absolute, 4, OpKind::Read(sbc));
    op!(t, 0xFD, "SBC", AbsoluteX, 4, OpKind::Read(sbc)); op!(t, 0xF9, "SBC", AbsoluteY, 4, OpKind::Read(sbc));
    op!(t, 0xE1, "SBC", IndirectX, 6, OpKind::Read(sbc)); op!(t, 0xF1, "SBC", IndirectY, 5, OpKind::Read(sbc));

    op!(t, 0xE6, "INC", ZeroPage, 5, OpKind::Modify(inc)); op!(t, 0xF6, "INC", ZeroPageX, 6, OpKind::Modify(inc));
    op!(t, 0xEE, "INC", Absolute, 6, OpKind::Modify(inc)); op!(t, 0xFE, "INC", AbsoluteX, 7, OpKind::Modify(inc));
    op!(t, 0xE8, "INX", Implied, 2, OpKind::Implied(inx)); op!(t, 0xC8, "INY", Implied, 2, OpKind::Implied(iny));

    op!(t, 0xC6, "DEC", ZeroPage, 5, OpKind::Modify(dec)); op!(t, 0xD6, "DEC", ZeroPageX, 6, OpKind::Modify(dec));
    op!(t, 0xCE, "DEC", Absolute, 6, OpKind::Modify(dec)); op!(t, 0xDE, "DEC", AbsoluteX, 7, OpKind::Modify(dec));
    op!(t, 0xCA, "DEX", Implied, 2, OpKind::Implied(dex)); op!(t, 0x88, "DEY", Implied, 2, OpKind::Implied(dey));

    op!(t, 0x29, "AND", Immediate, 2, OpKind::Read(and)); op!(t, 0x25, "AND", ZeroPage, 3, OpKind::Read(and));
    op!(t, 0x35, "AND", ZeroPageX, 4, OpKind::Read(and)); op!(t, 0x2D, "AND", Absolute, 4, OpKind::Read(and));
    op!(t, 0x3D, "AND", AbsoluteX, 4, OpKind::Read(and)); op!(t, 0x39, "AND", AbsoluteY, 4, OpKind::Read(and));
    op!(t, 0x21, "AND", IndirectX, 6, OpKind::Read(and)); op!(t, 0x31, "AND", IndirectY, 5, OpKind::Read(and));

    op!(t, 0x09, "ORA", Immediate, 2, OpKind::Read(ora)); op!(t, 0x05, "ORA", ZeroPage, 3, OpKind::Read(ora));
    op!(t, 0x15, "ORA", ZeroPageX, 4, OpKind::Read(ora)); op!(t, 0x0D, "ORA", Absolute, 4, OpKind::Read(ora));
    op!(t, 0x1D, "ORA", AbsoluteX, 4, OpKind::Read(ora)); op!(t, 0x19, "ORA", AbsoluteY, 4, OpKind::Read(ora));
    op!(t, 0x01, "ORA", IndirectX, 6, OpKind::Read(ora)); op!(t, 0x11, "ORA", IndirectY, 5, OpKind::Read(ora));

    op!(t, 0x49, "EOR", Immediate, 2, OpKind::Read(eor)); op!(t, 0x45, "EOR", ZeroPage, 3, OpKind::Read(eor));
    op!(t, 0x55, "EOR", ZeroPageX, 4, OpKind::Read(eor)); op!(t, 0x4D, "EOR", Absolute, 4, OpKind::Read(eor));
    op!(t, 0x5D, "EOR", AbsoluteX, 4, OpKind::Read(eor)); op!(t, 0x59, "EOR", AbsoluteY, 4, OpKind::Read(eor));
    op!(t, 0x41, "EOR", IndirectX, 6, OpKind::Read(eor)); op!(t, 0x51, "EOR", IndirectY, 5, OpKind::Read(eor));

    op!(t, 0xC9, "CMP", Immediate, 2, OpKind::Read(cmp)); op!(t, 0xC5, "CMP", ZeroPage, 3, OpKind::Read(cmp));
    op!(t, 0xD5, "CMP", ZeroPageX, 4, OpKind::Read(cmp)); op!(t, 0xCD, "CMP", Absolute, 4, OpKind::Read(cmp));
    op!(t, 0xDD, "CMP", AbsoluteX, 4, OpKind::Read(cmp)); op!(t, 0xD9, "CMP", AbsoluteY, 4, OpKind::Read(cmp));
    op!(t, 0xC1, "CMP", IndirectX, 6, OpKind::Read(cmp)); op!(t, 0xD1, "CMP", IndirectY, 5, OpKind::Read(cmp));

    op!(t, 0xE0, "CPX", Immediate, 2, OpKind::Read(cpx)); op!(t, 0xE4, "CPX", ZeroPage, 3, OpKind::Read(cpx));
    op!(t, 0xEC, "CPX", Absolute, 4, OpKind::Read(cpx));
    op!(t, 0xC0, "CPY", Immediate, 2, OpKind::Read(cpy)); op!(t, 0xC4, "CPY", ZeroPage, 3, OpKind::Read(cpy));
    op!(t, 0xCC, "CPY", Absolute, 4, OpKind::Read(cpy));

    op!(t, 0x24, "BIT", ZeroPage, 3, OpKind::Read(bit)); op!(t, 0x2C, "BIT", Absolute, 4, OpKind::Read(bit));

    op!(t, 0x0A, "ASL", Accumulator, 2, OpKind::Implied(asl_acc)); op!(t, 0x06, "ASL", ZeroPage, 5, OpKind::Modify(asl_core));
    op!(t, 0x16, "ASL", ZeroPageX, 6, OpKind::Modify(asl_core)); op!(t, 0x0E, "ASL", Absolute, 6, OpKind::Modify(asl_core));
    op!(t, 0x1E, "ASL", AbsoluteX, 7, OpKind::Modify(asl_core));

    op!(t, 0x4A, "LSR", Accumulator, 2, OpKind::Implied(lsr_acc)); op!(t, 0x46, "LSR", ZeroPage, 5, OpKind::Modify(lsr_core));
    op!(t, 0x56, "LSR", ZeroPageX, 6, OpKind::Modify(lsr_core)); op!(t, 0x4E, "LSR", Absolute, 6, OpKind::Modify(lsr_core));
    op!(t, 0x5E, "LSR", AbsoluteX, 7, OpKind::Modify(lsr_core));

    op!(t, 0x2A, "ROL", Accumulator, 2, OpKind::Implied(rol_acc)); op!(t, 0x26, "ROL", ZeroPage, 5, OpKind::Modify(rol_core));
    op!(t, 0x36, "ROL", ZeroPageX, 6, OpKind::Modify(rol_core)); op!(t, 0x2E, "ROL", Absolute, 6, OpKind::Modify(rol_core));
    op!(t, 0x3E, "ROL", AbsoluteX, 7, OpKind::Modify(rol_core));

    op!(t, 0x6A, "ROR", Accumulator, 2, OpKind::Implied(ror_acc)); op!(t, 0x66, "ROR", ZeroPage, 5, OpKind::Modify(ror_core));
    op!(t, 0x76, "ROR", ZeroPageX, 6, OpKind::Modify(ror_core)); op!(t, 0x6E, "ROR", Absolute, 6, OpKind::Modify(ror_core));
    op!(t, 0x7E, "ROR", AbsoluteX, 7, OpKind::Modify(ror_core));

    op!(t, 0x90, "BCC", Relative, 2, OpKind::Branch(|c| !c.p.get(StatusFlags::CARRY)));
    op!(t, 0xB0, "BCS", Relative, 2, OpKind::Branch(|c| c.p.get(StatusFlags::CARRY)));
    op!(t, 0xF0, "BEQ", Relative, 2, OpKind::Branch(|c| c.p.get(StatusFlags::ZERO)));
    op!(t, 0xD0, "BNE", Relative, 2, OpKind::Branch(|c| !c.p.get(StatusFlags::ZERO)));
    op!(t, 0x30, "BMI", Relative, 2, OpKind::Branch(|c| c.p.get(StatusFlags::NEGATIVE)));
    op!(t, 0x10, "BPL", Relative, 2, OpKind::Branch(|c| !c.p.get(StatusFlags::NEGATIVE)));
    op!(t, 0x50, "BVC", Relative, 2, OpKind::Branch(|c| !c.p.get(StatusFlags::OVERFLOW)));
    op!(t, 0x70, "BVS", Relative, 2, OpKind::Branch(|c| c.p.get(StatusFlags::OVERFLOW)));

    op!(t, 0x18, "CLC", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::CARRY, false)));
    op!(t, 0x38, "SEC", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::CARRY, true)));
    op!(t, 0x58, "CLI", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::INTERRUPT_DISABLE, false)));
    op!(t, 0x78, "SEI", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::INTERRUPT_DISABLE, true)));
    op!(t, 0xB8, "CLV", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::OVERFLOW, false)));
    op!(t, 0xD8, "CLD", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::DECIMAL, false)));
    op!(t, 0xF8, "SED", Implied, 2, OpKind::Implied(|c| c.p.set_flag(StatusFlags::DECIMAL, true)));

    op!(t, 0xEA, "NOP", Implied, 2, OpKind::Implied(|_| {}));

    op!(t, 0x4C, "JMP", Absolute, 3, OpKind::Jmp); op!(t, 0x6C, "JMP", Indirect, 5, OpKind::Jmp);
    op!(t, 0x20, "JSR", Absolute, 6, OpKind::Jsr); op!(t, 0x60, "RTS", Implied, 6, OpKind::Rts);
    op!(t, 0x00, "BRK", Implied, 7, OpKind::Brk); op!(t, 0x40, "RTI", Implied, 6, OpKind::Rti);

    let official_count = t.iter().filter(|e| e.is_some()).count();
    let mnemonics: std::collections::HashSet<&str> = t.iter().flatten().map(|e| e.name).collect();
    trace!("opcode table built: {official_count} official opcodes, {} mnemonics", mnemonics.len());

    t
}

/// Does `mode` carry a variable +1-cycle page-cross penalty, and only for
/// reads (stores/RMWs on these modes already cost the worst case flatly)?
pub fn mode_has_read_page_cross_penalty(mode: AddressingMode) -> bool {
    matches!(
        mode,
        AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectY
    )
}

fn lda(c: &mut Cpu, v: u8) { c.a = v; c.p.auto_set_zn(v); }
fn ldx(c: &mut Cpu, v: u8) { c.x = v; c.p.auto_set_zn(v); }
fn ldy(c: &mut Cpu, v: u8) { c.y = v; c.p.auto_set_zn(v); }
fn sta(c: &mut Cpu) -> u8 { c.a }
fn stx(c: &mut Cpu) -> u8 { c.x }
fn sty(c: &mut Cpu) -> u8 { c.y }

fn tax(c: &mut Cpu) { c.x = c.a; c.p.auto_set_zn(c.x); }
fn tay(c: &mut Cpu) { c.y = c.a; c.p.auto_set_zn(c.y); }
fn tsx(c: &mut Cpu) { c.x = c.s; c.p.auto_set_zn(c.x); }
fn txa(c: &mut Cpu) { c.a = c.x; c.p.auto_set_zn(c.a); }
fn txs(c: &mut Cpu) { c.s = c.x; }
fn tya(c: &mut Cpu) { c.a = c.y; c.p.auto_set_zn(c.a); }

fn php(c: &Cpu) -> u8 { (c.p | StatusFlags::BREAK | StatusFlags::UNUSED).bits() }
fn pla(c: &mut Cpu, v: u8) { c.a = v; c.p.auto_set_zn(v); }
fn plp(c: &mut Cpu, v: u8) { c.p = StatusFlags::from_bits_truncate(v) | StatusFlags::UNUSED; }

/// Shared core for ADC/SBC: SBC is ADC against the one's complement of the
/// operand, which reproduces the NES 6502's binary-only (no decimal mode)
/// carry/overflow behavior identically for both.
fn adc_core(c: &mut Cpu, operand: u8) {
    let carry_in = c.p.get(StatusFlags::CARRY) as u16;
    let sum = c.a as u16 + operand as u16 + carry_in;
    let result = sum as u8;
    let overflow = (!(c.a ^ operand) & (c.a ^ result) & 0x80) != 0;
    c.p.set_flag(StatusFlags::CARRY, sum > 0xFF);
    c.p.set_flag(StatusFlags::OVERFLOW, overflow);
    c.a = result;
    c.p.auto_set_zn(result);
}
fn adc(c: &mut Cpu, v: u8) { adc_core(c, v); }
fn sbc(c: &mut Cpu, v: u8) { adc_core(c, !v); }

fn inc(c: &mut Cpu, v: u8) -> u8 { let r = v.wrapping_add(1); c.p.auto_set_zn(r); r }
fn dec(c: &mut Cpu, v: u8) -> u8 { let r = v.wrapping_sub(1); c.p.auto_set_zn(r); r }
fn inx(c: &mut Cpu) { c.x = c.x.wrapping_add(1); c.p.auto_set_zn(c.x); }
fn iny(c: &mut Cpu) { c.y = c.y.wrapping_add(1); c.p.auto_set_zn(c.y); }
fn dex(c: &mut Cpu) { c.x = c.x.wrapping_sub(1); c.p.auto_set_zn(c.x); }
fn dey(c: &mut Cpu) { c.y = c.y.wrapping_sub(1); c.p.auto_set_zn(c.y); }

fn and(c: &mut Cpu, v: u8) { c.a &= v; c.p.auto_set_zn(c.a); }
fn ora(c: &mut Cpu, v: u8) { c.a |= v; c.p.auto_set_zn(c.a); }
fn eor(c: &mut Cpu, v: u8) { c.a ^= v; c.p.auto_set_zn(c.a); }

fn compare(c: &mut Cpu, register: u8, v: u8) {
    let result = register.wrapping_sub(v);
    c.p.set_flag(StatusFlags::CARRY, register >= v);
    c.p.auto_set_zn(result);
}
fn cmp(c: &mut Cpu, v: u8) { compare(c, c.a, v); }
fn cpx(c: &mut Cpu, v: u8) { compare(c, c.x, v); }
fn cpy(c: &mut Cpu, v: u8) { compare(c, c.y, v); }

fn bit(c: &mut Cpu, v: u8) {
    c.p.set_flag(StatusFlags::ZERO, c.a & v == 0);
    c.p.set_flag(StatusFlags::OVERFLOW, v & 0x40 != 0);
    c.p.set_flag(StatusFlags::NEGATIVE, v & 0x80 != 0);
}

fn asl_core(c: &mut Cpu, v: u8) -> u8 {
    c.p.set_flag(StatusFlags::CARRY, v & 0x80 != 0);
    let r = v << 1;
    c.p.auto_set_zn(r);
    r
}
fn asl_acc(c: &mut Cpu) { c.a = asl_core(c, c.a); }

fn lsr_core(c: &mut Cpu, v: u8) -> u8 {
    c.p.set_flag(StatusFlags::CARRY, v & 0x01 != 0);
    let r = v >> 1;
    c.p.auto_set_zn(r);
    r
}
fn lsr_acc(c: &mut Cpu) { c.a = lsr_core(c, c.a); }

fn rol_core(c: &mut Cpu, v: u8) -> u8 {
    let carry_in = c.p.get(StatusFlags::CARRY) as u8;
    c.p.set_flag(StatusFlags::CARRY, v & 0x80 != 0);
    let r = (v << 1) | carry_in;
    c.p.auto_set_zn(r);
    r
}
fn rol_acc(c: &mut Cpu) { c.a = rol_core(c, c.a); }

fn ror_core(c: &mut Cpu, v: u8) -> u8 {
    let carry_in = (c.p.get(StatusFlags::CARRY) as u8) << 7;
    c.p.set_flag(StatusFlags::CARRY, v & 0x01 != 0);
    let r = (v >> 1) | carry_in;
    c.p.auto_set_zn(r);
    r
}
fn ror_acc(c: &mut Cpu) { c.a = ror_core(c, c.a); }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_an_entry_for_every_official_opcode() {
        let official_count = OPCODES.iter().filter(|e| e.is_some()).count();
        assert_eq!(official_count, 151);
    }

    #[test]
    fn adc_sets_overflow_on_signed_wraparound() {
        let mut cpu = Cpu::new();
        cpu.a = 0x50;
        adc(&mut cpu, 0x50);
        assert_eq!(cpu.a, 0xA0);
        assert!(cpu.p.get(StatusFlags::NEGATIVE));
        assert!(cpu.p.get(StatusFlags::OVERFLOW));
        assert!(!cpu.p.get(StatusFlags::CARRY));
        assert!(!cpu.p.get(StatusFlags::ZERO));
    }
}
