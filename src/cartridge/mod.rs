//! Cartridge abstraction: owns PRG/CHR banks (through its mapper) and the
//! nametable mirroring mode declared by the iNES header.

pub mod loader;
pub mod mapper;

pub use loader::load_ines;
pub use mapper::Mapper;

use crate::errors::LoadError;
use crate::memory::MemoryBank;

/// Nametable mirroring, set by the cartridge and read by the bus/PPU when
/// decoding `$2000-$2FFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
}

/// An inserted NES cartridge: immutable PRG/CHR contents plus mirroring,
/// fronted by the mapper appropriate to the ROM's declared mapper number.
#[derive(Debug)]
pub struct Cartridge {
    mapper: Mapper,
    mirroring: Mirroring,
}

impl Cartridge {
    pub fn new(
        mapper_number: u8,
        prg_banks: Vec<MemoryBank>,
        chr_bank: Option<MemoryBank>,
        mirroring: Mirroring,
    ) -> Result<Self, LoadError> {
        let mapper = Mapper::new(mapper_number, prg_banks, chr_bank)?;
        Ok(Self { mapper, mirroring })
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut Mapper {
        &mut self.mapper
    }
}
