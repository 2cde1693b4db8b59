//! Central address decoder.
//!
//! The bus owns every byte array shared between the CPU and PPU — CPU RAM,
//! nametable VRAM, palette RAM and sprite OAM — plus the cartridge. CPU and
//! PPU never hold a stored reference to the bus or to each other; instead
//! each call that needs to cross components borrows the bus (and, for CPU
//! accesses into PPU register space, the PPU) for the duration of that call.
//! This sidesteps the Bus-CPU-PPU-Cartridge reference cycle entirely rather
//! than modeling it with shared ownership and runtime-checked borrows.

use log::info;

use crate::cartridge::{Cartridge, Mirroring};
use crate::hardware::*;
use crate::memory::{Memory, MemoryBank};
use crate::ppu::Ppu;

/// Which television standard the emulated machine targets. Affects PPU row
/// skipping and the conventional per-frame cycle budget (construction-time
/// only — there is no other configuration surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TvMode {
    #[default]
    Ntsc,
    Pal,
}

impl TvMode {
    pub fn cycles_per_frame(self) -> u32 {
        match self {
            TvMode::Ntsc => NTSC_CYCLES_PER_FRAME,
            TvMode::Pal => PAL_CYCLES_PER_FRAME,
        }
    }
}

pub struct Bus {
    ram: MemoryBank,
    vram: MemoryBank,
    palette: MemoryBank,
    oam: MemoryBank,
    mode: TvMode,
    cartridge: Option<Cartridge>,
    nmi_pending: bool,
}

impl Bus {
    pub fn new(mode: TvMode) -> Self {
        Self {
            ram: MemoryBank::new(CPU_RAM_SIZE),
            vram: MemoryBank::new(NAMETABLE_PAGE_SIZE as usize * 2),
            palette: MemoryBank::new(PALETTE_SIZE),
            oam: MemoryBank::new(OAM_SIZE),
            mode,
            cartridge: None,
            nmi_pending: false,
        }
    }

    pub fn get_mode(&self) -> TvMode {
        self.mode
    }

    /// Rebind the cartridge. Clears any in-flight NMI latch, since it
    /// referred to state produced by whatever ROM was previously running.
    pub fn inject_cartridge(&mut self, cartridge: Cartridge) {
        info!("cartridge injected, mirroring={:?}", cartridge.mirroring());
        self.cartridge = Some(cartridge);
        self.nmi_pending = false;
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    /// Raise the pending-NMI latch; serviced by the CPU at its next
    /// instruction boundary.
    pub fn generate_nmi(&mut self) {
        self.nmi_pending = true;
    }

    pub(crate) fn nmi_is_pending(&self) -> bool {
        self.nmi_pending
    }

    pub(crate) fn take_pending_nmi(&mut self) -> bool {
        std::mem::replace(&mut self.nmi_pending, false)
    }

    /// CPU-visible address space, `$0000-$FFFF`. PPU register addresses
    /// (`$2000-$3FFF`) are dispatched to `ppu`, borrowed for the call.
    pub fn read_mem(&mut self, addr: u16, ppu: &mut Ppu) -> u8 {
        match addr {
            CPU_RAM_START..=CPU_RAM_END => self.ram.read(addr % CPU_RAM_SIZE as u16),
            PPU_REG_START..=PPU_REG_END => {
                let reg = ((addr - PPU_REG_START) % PPU_REG_COUNT) as u8;
                ppu.read_register(reg, self)
            }
            APU_IO_START..=APU_IO_END => 0,
            EXPANSION_ROM_START..=EXPANSION_ROM_END => 0,
            CARTRIDGE_RAM_START..=CARTRIDGE_RAM_END => self
                .cartridge()
                .and_then(|c| c.mapper().read_ram(addr - CARTRIDGE_RAM_START).ok())
                .unwrap_or(0),
            CARTRIDGE_ROM_START..=CARTRIDGE_ROM_END => self
                .cartridge()
                .and_then(|c| c.mapper().read_rom(addr).ok())
                .unwrap_or(0),
        }
    }

    pub fn write_mem(&mut self, addr: u16, value: u8, ppu: &mut Ppu) {
        match addr {
            CPU_RAM_START..=CPU_RAM_END => self.ram.write(addr % CPU_RAM_SIZE as u16, value),
            PPU_REG_START..=PPU_REG_END => {
                let reg = ((addr - PPU_REG_START) % PPU_REG_COUNT) as u8;
                ppu.write_register(reg, value, self);
            }
            APU_IO_START..=APU_IO_END => {}
            EXPANSION_ROM_START..=EXPANSION_ROM_END => {}
            CARTRIDGE_RAM_START..=CARTRIDGE_RAM_END => {
                if let Some(cart) = self.cartridge_mut() {
                    let _ = cart.mapper_mut().write_ram(addr - CARTRIDGE_RAM_START, value);
                }
            }
            // Writes into ROM space address the mapper's bank-control
            // registers on bank-switched carts; NROM has none, so the write
            // is a no-op (see the open question in the design notes).
            CARTRIDGE_ROM_START..=CARTRIDGE_ROM_END => {}
        }
    }

    /// PPU-visible address space, `$0000-$3FFF`, as described in §3: pattern
    /// tables via the mapper, nametable mirroring, and palette mirroring.
    pub fn read_video_mem(&self, addr: u16) -> u8 {
        let addr = addr % 0x4000;
        match addr {
            PATTERN_TABLE_START..=PATTERN_TABLE_END => self
                .cartridge()
                .map(|c| c.mapper().read_vrom(addr))
                .unwrap_or(0),
            NAMETABLE_START..=NAMETABLE_MIRROR_END => {
                self.vram.read(self.nametable_offset(addr))
            }
            PALETTE_START..=PALETTE_END => self.palette.read(Self::palette_offset(addr)),
            _ => unreachable!("video address {addr:#06X} out of $0000-$3FFF range"),
        }
    }

    pub fn write_video_mem(&mut self, addr: u16, value: u8) {
        let addr = addr % 0x4000;
        match addr {
            PATTERN_TABLE_START..=PATTERN_TABLE_END => {
                // CHR-RAM carts would accept this; NROM's CHR is ROM/fixed,
                // so writes are dropped silently.
            }
            NAMETABLE_START..=NAMETABLE_MIRROR_END => {
                let offset = self.nametable_offset(addr);
                self.vram.write(offset, value);
            }
            PALETTE_START..=PALETTE_END => {
                self.palette.write(Self::palette_offset(addr), value);
            }
            _ => unreachable!("video address {addr:#06X} out of $0000-$3FFF range"),
        }
    }

    /// Fold a `$2000-$3EFF` nametable address down to an offset into the
    /// 2 KiB VRAM bank, honoring the cartridge's horizontal/vertical
    /// mirroring. Addresses `$3000-$3EFF` mirror `$2000-$2EFF` first.
    fn nametable_offset(&self, addr: u16) -> u16 {
        let addr = if addr >= NAMETABLE_MIRROR_START {
            addr - (NAMETABLE_MIRROR_START - NAMETABLE_START)
        } else {
            addr
        };
        let page = (addr - NAMETABLE_START) / NAMETABLE_PAGE_SIZE;
        let within_page = (addr - NAMETABLE_START) % NAMETABLE_PAGE_SIZE;
        let mirroring = self
            .cartridge()
            .map(|c| c.mirroring())
            .unwrap_or(Mirroring::Horizontal);
        let physical_page = match mirroring {
            // $2000/$2400 share physical page 0, $2800/$2C00 share page 1.
            Mirroring::Horizontal => page / 2,
            // $2000/$2800 share physical page 0, $2400/$2C00 share page 1.
            Mirroring::Vertical => page % 2,
        };
        physical_page * NAMETABLE_PAGE_SIZE + within_page
    }

    /// Fold a `$3F00-$3FFF` palette address into a `0..32` offset, aliasing
    /// the sprite-palette "background color" slots onto the universal ones.
    fn palette_offset(addr: u16) -> u16 {
        let mut offset = (addr - PALETTE_START) % PALETTE_SIZE as u16;
        if offset >= 0x10 && offset.is_multiple_of(4) {
            offset -= 0x10;
        }
        offset
    }

    pub fn read_sprite_mem(&self, index: u8) -> u8 {
        self.oam.read(index as u16)
    }

    pub fn write_sprite_mem(&mut self, index: u8, value: u8) {
        self.oam.write(index as u16, value);
    }

}
