/// core-lib/src/cartridge/mod.rs
use thiserror::Error;
use tracing::debug;

pub mod mbc;
pub mod types;

pub use mbc::{Mbc, RtcRegisters, RAM_BANK_SIZE, ROM_BANK_SIZE};
pub use types::{CartridgeKind, RamSize};

use mbc::RamTarget;

/// Errors that can occur when working with cartridges.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("empty ROM image")]
    EmptyRom,
    #[error("external RAM snapshot length mismatch: expected {expected}, got {actual}")]
    RamSizeMismatch { expected: usize, actual: usize },
}

/// A loaded cartridge: the ROM image, external RAM, and the bank controller
/// decoded from the header. Bank-control writes never modify the ROM.
#[derive(Debug, Clone)]
pub struct Cartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    kind: CartridgeKind,
    mbc: Mbc,
    rom_bank_count: usize,
    title: String,
}

impl Default for Cartridge {
    /// A blank 32KiB ROM-only cartridge, used before any ROM is loaded.
    fn default() -> Self {
        Self {
            rom: vec![0; 2 * ROM_BANK_SIZE],
            ram: Vec::new(),
            kind: CartridgeKind::RomOnly,
            mbc: Mbc::RomOnly,
            rom_bank_count: 2,
            title: String::new(),
        }
    }
}

impl Cartridge {
    /// Decodes the header and builds the cartridge. Header bytes consulted:
    /// 0x0147 (type), 0x0148 (ROM size), 0x0149 (RAM size). A header that is
    /// short or malformed degrades to a ROM-only cartridge; only an empty
    /// slice is rejected.
    pub fn new(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.is_empty() {
            return Err(CartridgeError::EmptyRom);
        }

        let header = |addr: usize| rom.get(addr).copied().unwrap_or(0);
        let kind = CartridgeKind::from_header(header(0x0147));
        let rom_bank_count = types::rom_bank_count_from_header(header(0x0148))
            .unwrap_or_else(|| (rom.len() / ROM_BANK_SIZE).next_power_of_two())
            .max(2);

        // MBC2 carries its own 512x4 bit RAM regardless of the header.
        let ram_len = match kind {
            CartridgeKind::Mbc2 { .. } => 512,
            _ => RamSize::from_header(header(0x0149)).as_bytes(),
        };

        let title_bytes: Vec<u8> = (0x0134..=0x0143)
            .map(header)
            .take_while(|&b| b != 0 && b.is_ascii())
            .collect();
        let title = String::from_utf8_lossy(&title_bytes).into_owned();

        debug!(?kind, rom_bank_count, ram_len, %title, "cartridge header decoded");

        Ok(Self {
            rom: rom.to_vec(),
            ram: vec![0; ram_len],
            kind,
            mbc: Mbc::for_kind(kind),
            rom_bank_count,
            title,
        })
    }

    pub fn kind(&self) -> CartridgeKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn has_battery(&self) -> bool {
        self.kind.has_battery()
    }

    pub fn rom_bank_count(&self) -> usize {
        self.rom_bank_count
    }

    /// CPU read of 0x0000..=0x7FFF through the current banking state.
    pub fn read_rom(&self, addr: u16) -> u8 {
        let offset = self.mbc.rom_offset(addr, self.rom_bank_count);
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    /// CPU write to 0x0000..=0x7FFF: bank control only.
    pub fn write_control(&mut self, addr: u16, value: u8) {
        self.mbc.write_control(addr, value);
    }

    /// CPU read of external RAM at 0xA000..=0xBFFF.
    pub fn read_ram(&self, addr: u16) -> u8 {
        if !self.mbc.ram_enabled() {
            return 0xFF;
        }
        match self.mbc.ram_target(addr) {
            RamTarget::Bytes(offset) if !self.ram.is_empty() => self.ram[offset % self.ram.len()],
            // MBC2 stores nibbles; the upper bits read back set.
            RamTarget::Nibble(index) => self.ram.get(index).map_or(0xFF, |v| v | 0xF0),
            RamTarget::Rtc(reg) => self.mbc.read_rtc(reg),
            _ => 0xFF,
        }
    }

    /// CPU write to external RAM at 0xA000..=0xBFFF.
    pub fn write_ram(&mut self, addr: u16, value: u8) {
        if !self.mbc.ram_enabled() {
            return;
        }
        match self.mbc.ram_target(addr) {
            RamTarget::Bytes(offset) if !self.ram.is_empty() => {
                let len = self.ram.len();
                self.ram[offset % len] = value;
            }
            RamTarget::Nibble(index) => {
                if let Some(slot) = self.ram.get_mut(index) {
                    *slot = value & 0x0F;
                }
            }
            RamTarget::Rtc(reg) => self.mbc.write_rtc(reg, value),
            _ => {}
        }
    }

    /// Snapshot of the external RAM for battery-backed persistence.
    pub fn save_ram(&self) -> Vec<u8> {
        self.ram.clone()
    }

    /// Restores an external RAM snapshot taken by [`Self::save_ram`].
    pub fn load_ram(&mut self, data: &[u8]) -> Result<(), CartridgeError> {
        if data.len() != self.ram.len() {
            return Err(CartridgeError::RamSizeMismatch {
                expected: self.ram.len(),
                actual: data.len(),
            });
        }
        self.ram.copy_from_slice(data);
        Ok(())
    }
}
