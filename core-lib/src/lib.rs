/// core-lib/src/lib.rs
pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod clock;
pub mod cpu;
pub mod interrupts;
pub mod joypad;
pub mod mmu;
pub mod ppu;
pub mod sink;
pub mod system;
pub mod timer;

pub use bus::Bus;
pub use cartridge::Cartridge;
pub use clock::Clock;
pub use cpu::Cpu;
pub use joypad::Button;
pub use mmu::Mmu;
pub use ppu::Ppu;
pub use sink::{AudioSink, FrameSink};
pub use system::GameBoy;
