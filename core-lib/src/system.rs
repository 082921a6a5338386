/// core-lib/src/system.rs
use tracing::debug;

use crate::apu::DEFAULT_SAMPLE_RATE;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::cpu::Cpu;
use crate::joypad::Button;
use crate::mmu::Mmu;
use crate::ppu::{Ppu, CYCLES_PER_FRAME};
use crate::sink::{AudioSink, FrameSink};

/// The assembled machine: CPU, MMU (which owns the APU), and PPU, stepped
/// in lockstep. One `step` runs a single instruction and fans its T-cycles
/// out to every component; `step_frame` runs one video frame.
pub struct GameBoy {
    cpu: Cpu,
    mmu: Mmu,
    ppu: Ppu,
}

impl GameBoy {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    #[must_use]
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(Cartridge::default(), sample_rate),
            ppu: Ppu::new(),
        }
    }

    /// Loads a ROM image and restarts the machine. Sinks and the audio
    /// sample rate survive; everything else is reinitialised, so loading
    /// the same image twice lands in identical state.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), CartridgeError> {
        let cartridge = Cartridge::new(rom)?;
        debug!(title = cartridge.title(), kind = ?cartridge.kind(), "rom loaded");
        self.mmu.reset(cartridge);
        self.cpu.reset();
        self.ppu.reset();
        Ok(())
    }

    /// Executes one instruction (or interrupt dispatch) and advances the
    /// MMU, PPU, and APU by the same T-cycle count. Returns that count.
    pub fn step(&mut self) -> u32 {
        let t_cycles = self.cpu.step(&mut self.mmu);
        self.mmu.step(t_cycles);
        self.ppu.step(&mut self.mmu, t_cycles);
        self.mmu.apu.step(t_cycles);
        t_cycles
    }

    /// Runs one emulated frame (~70,224 T-cycles) and returns the exact
    /// cycle count consumed.
    pub fn step_frame(&mut self) -> u32 {
        let mut elapsed = 0;
        while elapsed < CYCLES_PER_FRAME {
            elapsed += self.step();
        }
        elapsed
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.mmu.set_button(button, pressed);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.mmu.apu.set_master_volume(volume);
    }

    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink + Send>) {
        self.ppu.set_frame_sink(sink);
    }

    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink + Send>) {
        self.mmu.apu.set_sink(sink);
    }

    /// Battery-backed external RAM snapshot/restore.
    #[must_use]
    pub fn save_ram(&self) -> Vec<u8> {
        self.mmu.save_ram()
    }

    pub fn load_ram(&mut self, data: &[u8]) -> Result<(), CartridgeError> {
        self.mmu.load_ram(data)
    }

    // Component access for frontends and tests.

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rom_with(program: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
        rom
    }

    #[test]
    fn step_fans_cycles_out() {
        let mut gb = GameBoy::new();
        // NOP at the entry point takes one machine cycle everywhere.
        let rom = rom_with(&[0x00]);
        assert!(gb.load_rom(&rom).is_ok());
        let t = gb.step();
        assert_eq!(t, 4);
        assert_eq!(gb.mmu().timer.divider(), 4);
    }

    #[test]
    fn frame_consumes_roughly_one_frame_of_cycles() {
        let mut gb = GameBoy::new();
        let rom = rom_with(&[0x18, 0xFE]); // JR -2: spin forever
        assert!(gb.load_rom(&rom).is_ok());
        let elapsed = gb.step_frame();
        // One instruction of overshoot at most.
        assert!(elapsed >= 70_224 && elapsed < 70_224 + 24);
        assert_eq!(gb.ppu().frame_count(), 1);
    }

    /// Loading the same image twice resets to identical state.
    #[test]
    fn reload_is_idempotent() {
        let mut gb = GameBoy::new();
        let rom = rom_with(&[0x3E, 0x42, 0xEA, 0x00, 0xC0]); // LD A,0x42; LD (0xC000),A
        assert!(gb.load_rom(&rom).is_ok());
        for _ in 0..3 {
            gb.step();
        }
        assert_eq!(gb.mmu().read(0xC000), 0x42);
        let pc_after = gb.cpu().regs.pc;

        assert!(gb.load_rom(&rom).is_ok());
        assert_eq!(gb.cpu().regs.pc, 0x0100);
        assert_eq!(gb.mmu().read(0xC000), 0x00);
        assert_eq!(gb.mmu().timer.divider(), 0);

        for _ in 0..3 {
            gb.step();
        }
        assert_eq!(gb.cpu().regs.pc, pc_after);
        assert_eq!(gb.mmu().read(0xC000), 0x42);
    }
}
