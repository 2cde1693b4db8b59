//! NES core: 6502 CPU, PPU, address bus and cartridge/mapper loading.
//!
//! Host concerns (windowing, audio, controller input, a debugger UI) live
//! outside this crate; it exposes the pieces a host wires together: load a
//! ROM into a [`Bus`], drive a [`Cpu`] against it, and ask a [`Ppu`] to
//! render a frame into a host-provided [`RenderingBackend`].

pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod errors;
pub mod hardware;
pub mod memory;
pub mod ppu;
pub mod rendering;
mod utils;

pub use bus::{Bus, TvMode};
pub use cartridge::{load_ines, Cartridge, Mirroring};
pub use cpu::{Cpu, CpuSnapshot, CpuState, StatusFlags};
pub use errors::{CoreError, ErrorKind, LoadError};
pub use ppu::Ppu;
pub use rendering::{Layer, RenderingBackend, TilePixels};
