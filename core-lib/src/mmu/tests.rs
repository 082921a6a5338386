use anyhow::Result;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::Mmu;
use crate::cartridge::Cartridge;
use crate::interrupts::Interrupt;
use crate::joypad::Button;

fn make_mmu() -> Result<Mmu> {
    crate::test_log::init();
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x00;
    Ok(Mmu::new(Cartridge::new(&rom)?, 44_100))
}

#[test]
fn wram_and_vram_round_trip() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xC000, 0x42);
    mmu.write(0x8000, 0x24);
    assert_eq!(mmu.read(0xC000), 0x42);
    assert_eq!(mmu.read(0x8000), 0x24);
    Ok(())
}

/// Echo RAM mirrors work RAM in both directions.
#[test]
fn echo_ram_mirrors_both_ways() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xC123, 0x42);
    assert_eq!(mmu.read(0xE123), 0x42);
    mmu.write(0xE500, 0x77);
    assert_eq!(mmu.read(0xC500), 0x77);
    Ok(())
}

#[test]
fn unusable_region_floats_high() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xFEA0, 0x12);
    assert_eq!(mmu.read(0xFEA0), 0xFF);
    assert_eq!(mmu.read(0xFEFF), 0xFF);
    Ok(())
}

#[test]
fn interrupt_registers() -> Result<()> {
    let mut mmu = make_mmu()?;
    // IF stores five bits and floats the rest high.
    mmu.write(0xFF0F, 0xFF);
    assert_eq!(mmu.read(0xFF0F), 0xFF);
    mmu.write(0xFF0F, 0x00);
    assert_eq!(mmu.read(0xFF0F), 0xE0);
    // IE is a plain byte.
    mmu.write(0xFFFF, 0xAB);
    assert_eq!(mmu.read(0xFFFF), 0xAB);
    Ok(())
}

#[test]
fn stat_write_touches_only_enable_bits() -> Result<()> {
    let mut mmu = make_mmu()?;
    let mode_bits = mmu.read(0xFF41) & 0x07;
    mmu.write(0xFF41, 0xFF);
    assert_eq!(mmu.read(0xFF41) & 0x07, mode_bits);
    assert_eq!(mmu.read(0xFF41) & 0x78, 0x78);
    // Bit 7 floats high.
    assert_eq!(mmu.read(0xFF41) & 0x80, 0x80);
    Ok(())
}

#[test]
fn ly_write_resets_line() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.set_ly(0x42);
    mmu.write(0xFF44, 0x99);
    assert_eq!(mmu.read(0xFF44), 0x00);
    Ok(())
}

/// A LYC match with the coincidence source enabled raises STAT.
#[test]
fn lyc_write_recomputes_coincidence() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xFF41, 0x40);
    mmu.set_ly(0x17);
    mmu.write(0xFF45, 0x17);
    assert_eq!(mmu.read(0xFF41) & 0x04, 0x04);
    assert_eq!(mmu.read(0xFF0F) & Interrupt::LcdStat.bit(), Interrupt::LcdStat.bit());

    mmu.write(0xFF45, 0x18);
    assert_eq!(mmu.read(0xFF41) & 0x04, 0x00);
    Ok(())
}

#[test]
fn dma_copies_oam_and_gates_cpu_access() -> Result<()> {
    let mut mmu = make_mmu()?;
    for i in 0..160u16 {
        mmu.write(0xC100 + i, i as u8 ^ 0x5A);
    }
    mmu.write(0xFF46, 0xC1);
    assert_eq!(mmu.read(0xFF46), 0xC1);

    // While the transfer runs, OAM reads float and writes are dropped.
    mmu.step(16);
    assert_eq!(mmu.read(0xFE00), 0xFF);
    mmu.write(0xFE10, 0x12);

    // One byte lands every fourth T-cycle: 160 bytes in 640 cycles.
    mmu.step(640 - 16);
    for i in 0..160u16 {
        assert_eq!(mmu.read(0xFE00 + i), (i as u8) ^ 0x5A);
    }
    Ok(())
}

#[test]
fn dma_from_rom_source() -> Result<()> {
    let mut rom = vec![0u8; 0x8000];
    for (i, byte) in rom.iter_mut().enumerate().take(0x200).skip(0x100) {
        *byte = i as u8;
    }
    let mut mmu = Mmu::new(Cartridge::new(&rom)?, 44_100);
    mmu.write(0xFF46, 0x01);
    mmu.step(640);
    assert_eq!(mmu.read(0xFE00), 0x00);
    assert_eq!(mmu.read(0xFE9F), 0x9F);
    Ok(())
}

#[test]
fn timer_interrupt_reaches_if() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xFF06, 0xAB);
    mmu.write(0xFF05, 0xFF);
    mmu.write(0xFF07, 0x05); // enabled, tap bit 3

    // The tap bit falls at cycle 16, the reload lands four cycles later.
    mmu.step(24);
    assert_eq!(mmu.read(0xFF05), 0xAB);
    assert_eq!(mmu.read(0xFF0F) & Interrupt::Timer.bit(), Interrupt::Timer.bit());
    Ok(())
}

#[test]
fn joypad_press_requests_interrupt() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xFF00, 0x10);
    mmu.set_button(Button::Right, true);
    assert_eq!(mmu.read(0xFF00), 0xDE);
    assert_eq!(mmu.read(0xFF0F) & Interrupt::Joypad.bit(), Interrupt::Joypad.bit());
    Ok(())
}

#[test]
fn serial_stub_holds_bytes() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xFF01, 0x99);
    assert_eq!(mmu.read(0xFF01), 0x99);
    Ok(())
}

#[test]
fn unmapped_io_floats_high() -> Result<()> {
    let mut mmu = make_mmu()?;
    mmu.write(0xFF4D, 0x01);
    assert_eq!(mmu.read(0xFF4D), 0xFF);
    assert_eq!(mmu.read(0xFF7F), 0xFF);
    Ok(())
}

proptest! {
    /// HRAM stores every byte value at every offset.
    #[test]
    fn hram_round_trip(offset in 0u16..0x7F, value: u8) {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = 0x00;
        let cart = match Cartridge::new(&rom) {
            Ok(cart) => cart,
            Err(e) => panic!("cartridge: {e}"),
        };
        let mut mmu = Mmu::new(cart, 44_100);
        mmu.write(0xFF80 + offset, value);
        prop_assert_eq!(mmu.read(0xFF80 + offset), value);
    }
}
