//! iNES ROM file parsing.
//!
//! Parses the 16-byte iNES header plus PRG-ROM/CHR-ROM payload into a
//! [`Cartridge`]. NES 2.0 extensions and header bytes 8-10 (PRG-RAM size,
//! TV system, extra flags) are not read — this core only needs what
//! `spec.md` describes: bank counts, mirroring, trainer presence and mapper
//! number.

use log::debug;

use crate::cartridge::{Cartridge, Mirroring};
use crate::errors::LoadError;
use crate::hardware::{CHR_BANK_SIZE, INES_HEADER_SIZE, INES_MAGIC, PRG_BANK_SIZE, TRAINER_SIZE};
use crate::memory::MemoryBank;
use crate::utils::bv;

/// Parse a complete iNES file image into a [`Cartridge`].
pub fn load_ines(data: &[u8]) -> Result<Cartridge, LoadError> {
    if data.len() < INES_HEADER_SIZE {
        return Err(LoadError::Truncated {
            section: "header",
            expected: INES_HEADER_SIZE - data.len(),
        });
    }

    let header = &data[0..INES_HEADER_SIZE];
    if header[0..4] != INES_MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(&header[0..4]);
        return Err(LoadError::BadMagic { found });
    }

    let prg_bank_count = header[4] as usize;
    let chr_bank_count = header[5] as usize;
    let flags6 = header[6];
    let flags7 = header[7];

    let mirroring = if bv(flags6, 0) == 0 {
        Mirroring::Horizontal
    } else {
        Mirroring::Vertical
    };
    let has_trainer = bv(flags6, 2) != 0;
    let mapper_number = (flags7 & 0xF0) | (flags6 >> 4);

    debug!(
        "iNES header: prg_banks={prg_bank_count} chr_banks={chr_bank_count} \
         mirroring={mirroring:?} trainer={has_trainer} mapper={mapper_number}"
    );

    if prg_bank_count == 0 {
        return Err(LoadError::ZeroPrgBanks);
    }

    let mut cursor = INES_HEADER_SIZE;
    if has_trainer {
        require_remaining(data, cursor, TRAINER_SIZE, "trainer")?;
        cursor += TRAINER_SIZE;
    }

    let prg_size = prg_bank_count * PRG_BANK_SIZE;
    require_remaining(data, cursor, prg_size, "PRG-ROM")?;
    let prg_banks = data[cursor..cursor + prg_size]
        .chunks_exact(PRG_BANK_SIZE)
        .map(|chunk| MemoryBank::from_bytes(chunk.to_vec()))
        .collect::<Vec<_>>();
    cursor += prg_size;

    let chr_bank = if chr_bank_count > 0 {
        let chr_size = chr_bank_count * CHR_BANK_SIZE;
        require_remaining(data, cursor, chr_size, "CHR-ROM")?;
        // Only the first 8 KiB bank is addressable by mapper 0; additional
        // declared banks are ignored, matching NROM's fixed single bank.
        Some(MemoryBank::from_bytes(
            data[cursor..cursor + CHR_BANK_SIZE].to_vec(),
        ))
    } else {
        None
    };

    Cartridge::new(mapper_number, prg_banks, chr_bank, mirroring)
}

fn require_remaining(
    data: &[u8],
    cursor: usize,
    needed: usize,
    section: &'static str,
) -> Result<(), LoadError> {
    let available = data.len().saturating_sub(cursor);
    if available < needed {
        return Err(LoadError::Truncated {
            section,
            expected: needed - available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ines(
        prg_banks: &[[u8; PRG_BANK_SIZE]],
        chr_banks: &[[u8; CHR_BANK_SIZE]],
        mirroring: Mirroring,
        mapper: u8,
    ) -> Vec<u8> {
        let mut bytes = vec![0u8; INES_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&INES_MAGIC);
        bytes[4] = prg_banks.len() as u8;
        bytes[5] = chr_banks.len() as u8;
        bytes[6] = ((mapper & 0x0F) << 4) | if mirroring == Mirroring::Vertical { 1 } else { 0 };
        bytes[7] = mapper & 0xF0;
        for bank in prg_banks {
            bytes.extend_from_slice(bank);
        }
        for bank in chr_banks {
            bytes.extend_from_slice(bank);
        }
        bytes
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = vec![0u8; INES_HEADER_SIZE + PRG_BANK_SIZE];
        data[0..4].copy_from_slice(b"BAD\x1A");
        let err = load_ines(&data).unwrap_err();
        assert!(matches!(err, LoadError::BadMagic { .. }));
    }

    #[test]
    fn rejects_truncated_file() {
        let data = build_ines(&[[1; PRG_BANK_SIZE]], &[], Mirroring::Horizontal, 0);
        let err = load_ines(&data[..data.len() - 10]).unwrap_err();
        assert!(matches!(err, LoadError::Truncated { .. }));
    }

    #[test]
    fn rejects_zero_prg_banks() {
        let mut data = vec![0u8; INES_HEADER_SIZE];
        data[0..4].copy_from_slice(&INES_MAGIC);
        let err = load_ines(&data).unwrap_err();
        assert!(matches!(err, LoadError::ZeroPrgBanks));
    }

    #[test]
    fn rejects_unsupported_mapper() {
        let data = build_ines(&[[1; PRG_BANK_SIZE]], &[], Mirroring::Horizontal, 5);
        let err = load_ines(&data).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedMapper(5)));
    }

    #[test]
    fn round_trips_bank_contents() {
        let mut prg0 = [0u8; PRG_BANK_SIZE];
        prg0[0] = 0xDE;
        prg0[PRG_BANK_SIZE - 1] = 0xAD;
        let mut chr0 = [0u8; CHR_BANK_SIZE];
        chr0[0] = 0xBE;

        let data = build_ines(&[prg0], &[chr0], Mirroring::Vertical, 0);
        let cartridge = load_ines(&data).unwrap();

        assert_eq!(cartridge.mirroring(), Mirroring::Vertical);
        assert_eq!(cartridge.mapper().read_rom(0x8000).unwrap(), 0xDE);
        assert_eq!(cartridge.mapper().read_rom(0xFFFF).unwrap(), 0xAD);
        assert_eq!(cartridge.mapper().read_vrom(0x0000), 0xBE);
    }

    #[test]
    fn trainer_is_skipped_before_prg_data() {
        let mut data = vec![0u8; INES_HEADER_SIZE];
        data[0..4].copy_from_slice(&INES_MAGIC);
        data[4] = 1; // 1 PRG bank
        data[5] = 0;
        data[6] = 0b0000_0100; // trainer present
        data.extend(vec![0xFFu8; TRAINER_SIZE]);
        let mut prg = vec![0u8; PRG_BANK_SIZE];
        prg[0] = 0x55;
        data.extend(prg);

        let cartridge = load_ines(&data).unwrap();
        assert_eq!(cartridge.mapper().read_rom(0x8000).unwrap(), 0x55);
    }
}
