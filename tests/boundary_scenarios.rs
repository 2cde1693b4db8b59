//! The literal boundary scenarios this core is expected to reproduce,
//! driven entirely through the public API.

use nes_core::cartridge::load_ines;
use nes_core::{Bus, Cpu, TvMode};

const INES_HEADER_SIZE: usize = 16;
const PRG_BANK_SIZE: usize = 16 * 1024;
const CHR_BANK_SIZE: usize = 8 * 1024;
const INES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const CARTRIDGE_ROM_START: u16 = 0x8000;

/// A single-bank cartridge with `patches` poked in and the reset vector
/// pointing at `$8000`, so tests can drop code directly where `reset()`
/// will land `PC`.
fn rom_with(patches: &[(u16, u8)]) -> Vec<u8> {
    let mut bank = vec![0u8; PRG_BANK_SIZE];
    let mut poke = |addr: u16, byte: u8| {
        let offset = (addr - CARTRIDGE_ROM_START) as usize % PRG_BANK_SIZE;
        bank[offset] = byte;
    };
    poke(0xFFFC, 0x00);
    poke(0xFFFD, 0x80);
    for &(addr, byte) in patches {
        poke(addr, byte);
    }
    let mut data = vec![0u8; INES_HEADER_SIZE];
    data[0..4].copy_from_slice(&INES_MAGIC);
    data[4] = 1;
    data[5] = 1;
    data.extend(bank);
    data.extend(vec![0u8; CHR_BANK_SIZE]);
    data
}

fn machine(patches: &[(u16, u8)]) -> (Cpu, Bus, nes_core::Ppu) {
    let cart = load_ines(&rom_with(patches)).unwrap();
    let mut bus = Bus::new(TvMode::Ntsc);
    bus.inject_cartridge(cart);
    (Cpu::new(), bus, nes_core::Ppu::new())
}

#[test]
fn scenario_1_reset_vector() {
    let (mut cpu, mut bus, mut ppu) = machine(&[]);
    cpu.reset(&mut bus, &mut ppu);
    let snap = cpu.snapshot();
    assert_eq!(snap.pc, 0x8000);
    assert_eq!(snap.sp, 0xFD);
    assert_ne!(snap.p & 0x04, 0);
}

#[test]
fn scenario_2_indirect_jmp_page_bug() {
    let (mut cpu, mut bus, mut ppu) =
        machine(&[(0x8000, 0x6C), (0x8001, 0xFF), (0x8002, 0x02)]);
    bus.write_mem(0x02FF, 0x40, &mut ppu);
    bus.write_mem(0x0300, 0x80, &mut ppu); // the non-bug target, must NOT be read
    bus.write_mem(0x0200, 0x80, &mut ppu);
    cpu.reset(&mut bus, &mut ppu);
    let spent = cpu.run(5, &mut bus, &mut ppu);
    assert_eq!(cpu.snapshot().pc, 0x8040);
    assert_eq!(spent, 5);
}

#[test]
fn scenario_3_branch_page_cross() {
    // LDA #$00 (sets Z), then enough NOPs to park PC at $80FD, then BEQ +5.
    let mut patches = vec![(0x8000u16, 0xA9u8), (0x8001, 0x00)];
    for addr in 0x8002u16..=0x80FC {
        patches.push((addr, 0xEA));
    }
    patches.push((0x80FD, 0xF0));
    patches.push((0x80FE, 0x05));

    let (mut cpu, mut bus, mut ppu) = machine(&patches);
    cpu.reset(&mut bus, &mut ppu);
    let spent = cpu.run(504, &mut bus, &mut ppu);
    assert_eq!(spent, 504);
    assert_eq!(cpu.snapshot().pc, 0x80FD);

    let spent = cpu.run(4, &mut bus, &mut ppu);
    assert_eq!(cpu.snapshot().pc, 0x8104);
    assert_eq!(spent, 4);
}

#[test]
fn scenario_4_adc_overflow() {
    let (mut cpu, mut bus, mut ppu) =
        machine(&[(0x8000, 0xA9), (0x8001, 0x50), (0x8002, 0x69), (0x8003, 0x50)]);
    cpu.reset(&mut bus, &mut ppu);
    let spent = cpu.run(4, &mut bus, &mut ppu);
    assert_eq!(spent, 4);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0xA0);
    assert_ne!(snap.p & 0x80, 0); // N
    assert_ne!(snap.p & 0x40, 0); // V
    assert_eq!(snap.p & 0x01, 0); // C
    assert_eq!(snap.p & 0x02, 0); // Z
}

#[test]
fn scenario_6_palette_mirror() {
    let (_cpu, mut bus, _ppu) = machine(&[]);
    bus.write_video_mem(0x3F10, 0x3F);
    assert_eq!(bus.read_video_mem(0x3F00), 0x3F);
}

#[test]
fn run_never_exceeds_its_budget() {
    let (_cpu, mut bus, mut ppu) = machine(&[(0x8000, 0xEA), (0x8001, 0xEA), (0x8002, 0xEA)]);
    for n in 0..20u32 {
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus, &mut ppu);
        let spent = cpu.run(n, &mut bus, &mut ppu);
        assert!(spent <= n, "spent {spent} > budget {n}");
    }
}
