/// core-lib/src/ppu/regs.rs
use bitflags::bitflags;

bitflags! {
    /// LCD Control register (LCDC, 0xFF40).
    #[derive(Default, Debug, Clone, Copy)]
    pub struct LcdControl: u8 {
        const LCD_ENABLE          = 0b1000_0000; // Bit 7: LCD Display Enable
        const WINDOW_TILEMAP      = 0b0100_0000; // Bit 6: Window Tile Map Area (0=9800-9BFF, 1=9C00-9FFF)
        const WINDOW_ENABLE       = 0b0010_0000; // Bit 5: Window Display Enable
        const BG_WINDOW_TILE_DATA = 0b0001_0000; // Bit 4: BG & Window Tile Data (0=8800-97FF, 1=8000-8FFF)
        const BG_TILEMAP          = 0b0000_1000; // Bit 3: BG Tile Map Area (0=9800-9BFF, 1=9C00-9FFF)
        const SPRITE_SIZE         = 0b0000_0100; // Bit 2: Sprite Size (0=8x8, 1=8x16)
        const SPRITE_ENABLE       = 0b0000_0010; // Bit 1: Sprite Display Enable
        const BG_WINDOW_ENABLE    = 0b0000_0001; // Bit 0: BG & Window Display Enable
    }
}

bitflags! {
    /// LCD Status register (STAT, 0xFF41). Bits 0-2 are maintained by the
    /// PPU; bits 3-6 are the interrupt-source enables.
    #[derive(Default, Debug, Clone, Copy)]
    pub struct LcdStatus: u8 {
        const LYC_INTERRUPT    = 0b0100_0000; // Bit 6: LYC=LY Interrupt
        const OAM_INTERRUPT    = 0b0010_0000; // Bit 5: OAM Interrupt
        const VBLANK_INTERRUPT = 0b0001_0000; // Bit 4: VBlank Interrupt
        const HBLANK_INTERRUPT = 0b0000_1000; // Bit 3: HBlank Interrupt
        const LYC_EQUAL_LY     = 0b0000_0100; // Bit 2: LYC=LY Flag
        const MODE_MASK        = 0b0000_0011; // Bits 0-1: Mode
    }
}
