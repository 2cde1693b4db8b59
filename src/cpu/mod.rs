//! The 6502 CPU: registers, instruction dispatch, and interrupt servicing.
//!
//! The CPU holds no reference to the bus or PPU between calls — `run` and
//! `step` borrow both for the duration of the call and let go. This is the
//! Rust-idiomatic answer to the Bus-CPU-PPU reference cycle a shared-pointer
//! design runs into: dependency injection through a parameter instead of a
//! stored back-reference.

mod opcodes;
pub mod status;

pub use opcodes::AddressingMode;
use opcodes::{mode_has_read_page_cross_penalty, OpKind, OPCODES};
pub use status::StatusFlags;

use log::error;

use crate::bus::Bus;
use crate::hardware::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::ppu::Ppu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Halted,
    Run,
    Error,
}

/// A read-only snapshot of CPU state for introspection (debugger capability
/// per the design notes — no setters are exposed alongside it).
#[derive(Debug, Clone, Copy)]
pub struct CpuSnapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: u8,
    pub state: CpuState,
    pub nmi_count: u64,
    pub rti_count: u64,
}

pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    s: u8,
    p: StatusFlags,
    pc: u16,
    state: CpuState,
    nmi_count: u64,
    rti_count: u64,
    penalty: u8,
    /// No component in this core currently raises an IRQ (no APU, and
    /// mapper 0 has no IRQ line) — this is the latch a future IRQ source
    /// (mapper or APU) would set via [`Cpu::request_irq`].
    irq_pending: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            p: StatusFlags::empty(),
            pc: 0,
            state: CpuState::Halted,
            nmi_count: 0,
            rti_count: 0,
            penalty: 0,
            irq_pending: false,
        }
    }

    /// Latch a pending IRQ, serviced at the next instruction boundary if
    /// `I` is clear. Exposed for an eventual IRQ-capable mapper; no mapper
    /// currently implemented in this core raises one.
    pub fn request_irq(&mut self) {
        self.irq_pending = true;
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.s,
            pc: self.pc,
            p: self.p.bits(),
            state: self.state,
            nmi_count: self.nmi_count,
            rti_count: self.rti_count,
        }
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    /// PC from the reset vector, S to `$FD`, P to `0x34`, state to `RUN`.
    /// Illegal to call mid-instruction; the host only calls it at an
    /// instruction boundary between `run` invocations.
    pub fn reset(&mut self, bus: &mut Bus, ppu: &mut Ppu) {
        ppu.reset();
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.s = 0xFD;
        self.p = StatusFlags::power_up();
        self.pc = self.read_u16(RESET_VECTOR, bus, ppu);
        self.state = CpuState::Run;
        self.nmi_count = 0;
        self.rti_count = 0;
        self.penalty = 0;
        self.irq_pending = false;
    }

    /// Step instructions until the next one's base cost would exceed the
    /// remaining budget, or `state` leaves `RUN`. Returns cycles actually
    /// spent, always `<= clk_budget`.
    pub fn run(&mut self, clk_budget: u32, bus: &mut Bus, ppu: &mut Ppu) -> u32 {
        let mut spent = 0u32;
        while self.state == CpuState::Run {
            let remaining = clk_budget - spent;
            if bus.nmi_is_pending() {
                if remaining < 7 {
                    break;
                }
                bus.take_pending_nmi();
                spent += self.service_interrupt(NMI_VECTOR, bus, ppu);
                self.nmi_count += 1;
                continue;
            }
            if self.irq_pending && !self.p.get(StatusFlags::INTERRUPT_DISABLE) {
                if remaining < 7 {
                    break;
                }
                self.irq_pending = false;
                spent += self.service_interrupt(IRQ_VECTOR, bus, ppu);
                continue;
            }
            let opcode = self.read(self.pc, bus, ppu);
            let next_cost = OPCODES[opcode as usize].map(|e| e.cycles).unwrap_or(1);
            if u32::from(next_cost) > remaining {
                break;
            }
            spent += self.step(bus, ppu) as u32;
        }
        spent
    }

    fn service_interrupt(&mut self, vector: u16, bus: &mut Bus, ppu: &mut Ppu) -> u32 {
        self.push16(self.pc, bus, ppu);
        let status = (self.p & !StatusFlags::BREAK) | StatusFlags::UNUSED;
        self.push8(status.bits(), bus, ppu);
        self.p.set_flag(StatusFlags::INTERRUPT_DISABLE, true);
        self.pc = self.read_u16(vector, bus, ppu);
        7
    }

    /// Fetch, decode and execute one instruction. Returns the cycles it
    /// cost (base + any penalty). An opcode with no table entry sets
    /// `state = ERROR` and costs nothing further.
    fn step(&mut self, bus: &mut Bus, ppu: &mut Ppu) -> u8 {
        let opcode = self.fetch_u8(bus, ppu);
        let Some(entry) = OPCODES[opcode as usize] else {
            error!("unknown opcode ${opcode:02X} at ${:04X}", self.pc.wrapping_sub(1));
            self.state = CpuState::Error;
            return 0;
        };
        self.penalty = 0;

        match entry.kind {
            OpKind::Implied(f) => f(self),
            OpKind::Read(f) => {
                let (addr, crossed) = self.resolve(entry.mode, bus, ppu);
                let v = self.read(addr, bus, ppu);
                if crossed && mode_has_read_page_cross_penalty(entry.mode) {
                    self.penalty += 1;
                }
                f(self, v);
            }
            OpKind::Write(f) => {
                let (addr, _) = self.resolve(entry.mode, bus, ppu);
                let v = f(self);
                self.write(addr, v, bus, ppu);
            }
            OpKind::Modify(f) => {
                let (addr, _) = self.resolve(entry.mode, bus, ppu);
                let v = self.read(addr, bus, ppu);
                let r = f(self, v);
                self.write(addr, r, bus, ppu);
            }
            OpKind::Branch(cond) => {
                let offset = self.fetch_u8(bus, ppu) as i8;
                if cond(self) {
                    self.penalty += 1;
                    let from = self.pc;
                    let target = from.wrapping_add(offset as u16);
                    if from & 0xFF00 != target & 0xFF00 {
                        self.penalty += 1;
                    }
                    self.pc = target;
                }
            }
            OpKind::Jmp => {
                self.pc = self.resolve_jmp_target(entry.mode, bus, ppu);
            }
            OpKind::Jsr => {
                let target = self.fetch_u16(bus, ppu);
                let return_addr = self.pc.wrapping_sub(1);
                self.push16(return_addr, bus, ppu);
                self.pc = target;
            }
            OpKind::Rts => {
                let return_addr = self.pop16(bus, ppu);
                self.pc = return_addr.wrapping_add(1);
            }
            OpKind::Brk => {
                self.pc = self.pc.wrapping_add(1); // BRK's operand byte is a padding byte
                self.push16(self.pc, bus, ppu);
                let status = self.p | StatusFlags::BREAK | StatusFlags::UNUSED;
                self.push8(status.bits(), bus, ppu);
                self.p.set_flag(StatusFlags::INTERRUPT_DISABLE, true);
                self.pc = self.read_u16(IRQ_VECTOR, bus, ppu);
                if self.pc == 0 {
                    self.state = CpuState::Halted;
                }
            }
            OpKind::Rti => {
                let status = self.pop8(bus, ppu);
                self.p = StatusFlags::from_bits_truncate(status) | StatusFlags::UNUSED;
                self.pc = self.pop16(bus, ppu);
                self.rti_count += 1;
            }
            OpKind::Push(f) => {
                let v = f(self);
                self.push8(v, bus, ppu);
            }
            OpKind::Pull(f) => {
                let v = self.pop8(bus, ppu);
                f(self, v);
            }
        }

        entry.cycles + self.penalty
    }

    fn resolve(&mut self, mode: AddressingMode, bus: &mut Bus, ppu: &mut Ppu) -> (u16, bool) {
        use AddressingMode::*;
        match mode {
            Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            ZeroPage => (self.fetch_u8(bus, ppu) as u16, false),
            ZeroPageX => (self.fetch_u8(bus, ppu).wrapping_add(self.x) as u16, false),
            ZeroPageY => (self.fetch_u8(bus, ppu).wrapping_add(self.y) as u16, false),
            Absolute => (self.fetch_u16(bus, ppu), false),
            AbsoluteX => {
                let base = self.fetch_u16(bus, ppu);
                let addr = base.wrapping_add(self.x as u16);
                (addr, base & 0xFF00 != addr & 0xFF00)
            }
            AbsoluteY => {
                let base = self.fetch_u16(bus, ppu);
                let addr = base.wrapping_add(self.y as u16);
                (addr, base & 0xFF00 != addr & 0xFF00)
            }
            IndirectX => {
                let zp = self.fetch_u8(bus, ppu).wrapping_add(self.x);
                let lo = self.read(zp as u16, bus, ppu);
                let hi = self.read(zp.wrapping_add(1) as u16, bus, ppu);
                (u16::from_le_bytes([lo, hi]), false)
            }
            IndirectY => {
                let zp = self.fetch_u8(bus, ppu);
                let lo = self.read(zp as u16, bus, ppu);
                let hi = self.read(zp.wrapping_add(1) as u16, bus, ppu);
                let base = u16::from_le_bytes([lo, hi]);
                let addr = base.wrapping_add(self.y as u16);
                (addr, base & 0xFF00 != addr & 0xFF00)
            }
            Accumulator | Implied | Indirect | Relative => {
                unreachable!("{mode:?} is not resolved through resolve()")
            }
        }
    }

    /// `JMP` addressing, including the indirect page-boundary hardware bug:
    /// when the low byte of the pointer is `$FF`, the high byte is fetched
    /// from `$xx00` of the same page rather than the next page.
    fn resolve_jmp_target(&mut self, mode: AddressingMode, bus: &mut Bus, ppu: &mut Ppu) -> u16 {
        let addr = self.fetch_u16(bus, ppu);
        match mode {
            AddressingMode::Absolute => addr,
            AddressingMode::Indirect => {
                let lo = self.read(addr, bus, ppu);
                let hi_addr = if addr & 0x00FF == 0x00FF {
                    addr & 0xFF00
                } else {
                    addr.wrapping_add(1)
                };
                let hi = self.read(hi_addr, bus, ppu);
                u16::from_le_bytes([lo, hi])
            }
            other => unreachable!("JMP does not use {other:?}"),
        }
    }

    fn fetch_u8(&mut self, bus: &mut Bus, ppu: &mut Ppu) -> u8 {
        let v = self.read(self.pc, bus, ppu);
        self.pc = self.pc.wrapping_add(1);
        v
    }

    fn fetch_u16(&mut self, bus: &mut Bus, ppu: &mut Ppu) -> u16 {
        let lo = self.fetch_u8(bus, ppu);
        let hi = self.fetch_u8(bus, ppu);
        u16::from_le_bytes([lo, hi])
    }

    fn read(&self, addr: u16, bus: &mut Bus, ppu: &mut Ppu) -> u8 {
        bus.read_mem(addr, ppu)
    }

    fn write(&self, addr: u16, value: u8, bus: &mut Bus, ppu: &mut Ppu) {
        bus.write_mem(addr, value, ppu);
    }

    fn read_u16(&self, addr: u16, bus: &mut Bus, ppu: &mut Ppu) -> u16 {
        let lo = bus.read_mem(addr, ppu);
        let hi = bus.read_mem(addr.wrapping_add(1), ppu);
        u16::from_le_bytes([lo, hi])
    }

    fn push8(&mut self, value: u8, bus: &mut Bus, ppu: &mut Ppu) {
        bus.write_mem(0x0100 | self.s as u16, value, ppu);
        self.s = self.s.wrapping_sub(1);
    }

    fn pop8(&mut self, bus: &mut Bus, ppu: &mut Ppu) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read_mem(0x0100 | self.s as u16, ppu)
    }

    fn push16(&mut self, value: u16, bus: &mut Bus, ppu: &mut Ppu) {
        let [lo, hi] = value.to_le_bytes();
        self.push8(hi, bus, ppu);
        self.push8(lo, bus, ppu);
    }

    fn pop16(&mut self, bus: &mut Bus, ppu: &mut Ppu) -> u16 {
        let lo = self.pop8(bus, ppu);
        let hi = self.pop8(bus, ppu);
        u16::from_le_bytes([lo, hi])
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Bus, TvMode};
    use crate::cartridge::load_ines;
    use crate::hardware::*;

    /// Build a single-PRG-bank cartridge with `patches` (cpu address, byte)
    /// poked into the bank before loading, so tests can place code/vectors
    /// anywhere in `$8000-$FFFF` without a separate post-load flash step.
    fn rom_with(patches: &[(u16, u8)]) -> Vec<u8> {
        let mut bank = vec![0u8; PRG_BANK_SIZE];
        for &(addr, byte) in patches {
            let offset = (addr - CARTRIDGE_ROM_START) as usize % PRG_BANK_SIZE;
            bank[offset] = byte;
        }
        let mut data = vec![0u8; INES_HEADER_SIZE];
        data[0..4].copy_from_slice(&INES_MAGIC);
        data[4] = 1;
        data[5] = 1;
        data.extend(bank);
        data.extend(vec![0u8; CHR_BANK_SIZE]);
        data
    }

    fn machine(patches: &[(u16, u8)]) -> (Cpu, Bus, Ppu) {
        let cart = load_ines(&rom_with(patches)).unwrap();
        let mut bus = Bus::new(TvMode::Ntsc);
        bus.inject_cartridge(cart);
        (Cpu::new(), bus, Ppu::new())
    }

    #[test]
    fn reset_loads_pc_from_reset_vector() {
        let (mut cpu, mut bus, mut ppu) = machine(&[(0xFFFC, 0x00), (0xFFFD, 0x80)]);
        cpu.reset(&mut bus, &mut ppu);
        assert_eq!(cpu.pc, 0x8000);
        assert_eq!(cpu.s, 0xFD);
        assert!(cpu.p.get(StatusFlags::INTERRUPT_DISABLE));
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut cpu, mut bus, mut ppu) = machine(&[(0xFFFC, 0x00), (0xFFFD, 0x80)]);
        cpu.reset(&mut bus, &mut ppu);
        let first = cpu.snapshot();
        cpu.reset(&mut bus, &mut ppu);
        let second = cpu.snapshot();
        assert_eq!(first.pc, second.pc);
        assert_eq!(first.sp, second.sp);
        assert_eq!(first.p, second.p);
    }

    #[test]
    fn reset_clears_stale_ppu_flags() {
        let (mut cpu, mut bus, mut ppu) = machine(&[(0xFFFC, 0x00), (0xFFFD, 0x80)]);
        ppu.write_register(0, 0x80, &mut bus); // NMI enable
        ppu.write_register(5, 0x40, &mut bus); // scroll_v, leaves write_toggle set mid-pair
        ppu.write_register(5, 0x20, &mut bus); // scroll_h
        cpu.reset(&mut bus, &mut ppu);
        assert_eq!(ppu.read_register(2, &bus), 0);
        assert_eq!(ppu.scroll(), (0, 0));
    }

    #[test]
    fn indirect_jmp_page_bug() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (mut cpu, mut bus, mut ppu) =
            machine(&[(0x8000, 0x6C), (0x8001, 0xFF), (0x8002, 0x02)]);
        bus.write_mem(0x02FF, 0x40, &mut ppu);
        bus.write_mem(0x0300, 0x80, &mut ppu); // would be read if the bug were absent
        bus.write_mem(0x0200, 0x80, &mut ppu);
        cpu.pc = 0x8000;
        cpu.state = CpuState::Run;
        let cycles = cpu.step(&mut bus, &mut ppu);
        assert_eq!(cpu.pc, 0x8040);
        assert_eq!(cycles, 5);
    }

    #[test]
    fn branch_taken_across_page_boundary_costs_four_cycles() {
        let (mut cpu, mut bus, mut ppu) = machine(&[(0x80FD, 0xF0), (0x80FE, 0x05)]);
        cpu.pc = 0x80FD;
        cpu.state = CpuState::Run;
        cpu.p.set_flag(StatusFlags::ZERO, true);
        let cycles = cpu.step(&mut bus, &mut ppu);
        assert_eq!(cpu.pc, 0x8104);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn run_zero_budget_is_a_no_op() {
        let (mut cpu, mut bus, mut ppu) = machine(&[(0x8000, 0xEA)]);
        cpu.pc = 0x8000;
        cpu.state = CpuState::Run;
        let before = cpu.snapshot();
        let spent = cpu.run(0, &mut bus, &mut ppu);
        assert_eq!(spent, 0);
        assert_eq!(cpu.pc, before.pc);
    }

    #[test]
    fn run_never_exceeds_its_budget() {
        let (_cpu, mut bus, mut ppu) =
            machine(&[(0x8000, 0xEA), (0x8001, 0xEA), (0x8002, 0xEA)]);
        for n in 0..10u32 {
            let mut c2 = Cpu::new();
            c2.pc = 0x8000;
            c2.state = CpuState::Run;
            let spent = c2.run(n, &mut bus, &mut ppu);
            assert!(spent <= n, "spent {spent} > budget {n}");
        }
    }

    #[test]
    fn stack_push_pop_round_trips_and_restores_sp() {
        let (mut cpu, mut bus, mut ppu) = machine(&[]);
        let sp_before = cpu.s;
        cpu.push8(0x42, &mut bus, &mut ppu);
        assert_ne!(cpu.s, sp_before);
        let v = cpu.pop8(&mut bus, &mut ppu);
        assert_eq!(v, 0x42);
        assert_eq!(cpu.s, sp_before);
    }
}
