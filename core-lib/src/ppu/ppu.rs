/// core-lib/src/ppu/ppu.rs
use tracing::debug;

use crate::interrupts::Interrupt;
use crate::mmu::Mmu;
use crate::sink::FrameSink;

use super::color::Color;
use super::regs::{LcdControl, LcdStatus};
use super::sprite::{Sprite, SpriteFlags};
use super::{
    PpuMode, BGP_ADDR, FRAME_BUFFER_SIZE, LCDC_ADDR, MAX_SPRITES_PER_LINE, OBP0_ADDR, OBP1_ADDR,
    SCREEN_HEIGHT, SCREEN_WIDTH, SCX_ADDR, SCY_ADDR, WX_ADDR, WY_ADDR,
};

/// Pixel processing unit. Mode timing, scanline rendering, and the
/// framebuffer live here; the memory-mapped registers stay in the MMU's
/// I/O page and the PPU borrows the MMU while stepping.
pub struct Ppu {
    mode: PpuMode,
    /// T-cycles accumulated inside the current mode.
    mode_clock: u32,
    /// Internal window line counter; only advances on lines where the
    /// window actually produced pixels.
    window_line: u8,
    /// Raw BG/window color indices of the current line, for the
    /// sprite-behind-background test.
    line_indices: [u8; SCREEN_WIDTH],
    /// BGRA8888 output. Boxed so its address is stable for the lifetime of
    /// the emulator, as promised to the frame sink.
    frame_buffer: Box<[u8; FRAME_BUFFER_SIZE]>,
    frame_sink: Option<Box<dyn FrameSink + Send>>,
    /// Completed frames since reset.
    frame_count: u64,
    lcd_was_off: bool,
}

impl Ppu {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: PpuMode::OamScan,
            mode_clock: 0,
            window_line: 0,
            line_indices: [0; SCREEN_WIDTH],
            frame_buffer: vec![0xFF; FRAME_BUFFER_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| Box::new([0xFF; FRAME_BUFFER_SIZE])),
            frame_sink: None,
            frame_count: 0,
            lcd_was_off: false,
        }
    }

    /// Clears timing state and the frame counter; keeps the sink.
    pub fn reset(&mut self) {
        self.mode = PpuMode::OamScan;
        self.mode_clock = 0;
        self.window_line = 0;
        self.line_indices = [0; SCREEN_WIDTH];
        self.frame_buffer.fill(0xFF);
        self.frame_count = 0;
        self.lcd_was_off = false;
    }

    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink + Send>) {
        self.frame_sink = Some(sink);
    }

    #[must_use]
    pub const fn mode(&self) -> PpuMode {
        self.mode
    }

    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub const fn window_line(&self) -> u8 {
        self.window_line
    }

    /// The current framebuffer contents. Stable address, mutated again at
    /// the next rendered scanline.
    #[must_use]
    pub fn frame_buffer(&self) -> &[u8] {
        self.frame_buffer.as_ref()
    }

    /// Advances the mode state machine by `t_cycles`.
    pub fn step(&mut self, mmu: &mut Mmu, t_cycles: u32) {
        let lcdc = LcdControl::from_bits_truncate(mmu.io_reg(LCDC_ADDR));
        if !lcdc.contains(LcdControl::LCD_ENABLE) {
            if !self.lcd_was_off {
                debug!("lcd disabled");
                self.mode = PpuMode::HBlank;
                self.mode_clock = 0;
                self.window_line = 0;
                mmu.set_ly(0);
                mmu.set_stat_mode(PpuMode::HBlank as u8);
                self.lcd_was_off = true;
            }
            return;
        }
        if self.lcd_was_off {
            // Coming back on restarts the frame from the first OAM scan.
            debug!("lcd enabled");
            self.lcd_was_off = false;
            self.mode = PpuMode::OamScan;
            self.mode_clock = 0;
            mmu.set_stat_mode(PpuMode::OamScan as u8);
        }

        self.mode_clock += t_cycles;
        loop {
            let duration = self.mode.duration();
            if self.mode_clock < duration {
                break;
            }
            self.mode_clock -= duration;
            match self.mode {
                PpuMode::OamScan => self.enter_mode(mmu, PpuMode::Draw),
                PpuMode::Draw => {
                    self.render_scanline(mmu);
                    self.enter_mode(mmu, PpuMode::HBlank);
                }
                PpuMode::HBlank => {
                    let ly = mmu.ly() + 1;
                    mmu.set_ly(ly);
                    if ly as usize == SCREEN_HEIGHT {
                        self.enter_mode(mmu, PpuMode::VBlank);
                    } else {
                        self.enter_mode(mmu, PpuMode::OamScan);
                    }
                }
                PpuMode::VBlank => {
                    let ly = mmu.ly() + 1;
                    if ly > 153 {
                        mmu.set_ly(0);
                        self.window_line = 0;
                        self.enter_mode(mmu, PpuMode::OamScan);
                    } else {
                        mmu.set_ly(ly);
                    }
                }
            }
        }
    }

    /// Mode transition: STAT mode bits, STAT source interrupts, and the
    /// VBlank bookkeeping.
    fn enter_mode(&mut self, mmu: &mut Mmu, mode: PpuMode) {
        self.mode = mode;
        mmu.set_stat_mode(mode as u8);

        let stat = LcdStatus::from_bits_truncate(mmu.stat());
        match mode {
            PpuMode::HBlank => {
                if stat.contains(LcdStatus::HBLANK_INTERRUPT) {
                    mmu.request_interrupt(Interrupt::LcdStat);
                }
            }
            PpuMode::OamScan => {
                if stat.contains(LcdStatus::OAM_INTERRUPT) {
                    mmu.request_interrupt(Interrupt::LcdStat);
                }
            }
            PpuMode::VBlank => {
                mmu.request_interrupt(Interrupt::VBlank);
                if stat.contains(LcdStatus::VBLANK_INTERRUPT) {
                    mmu.request_interrupt(Interrupt::LcdStat);
                }
                self.frame_count += 1;
                if let Some(sink) = self.frame_sink.as_mut() {
                    sink.push_frame(self.frame_buffer.as_ref());
                }
            }
            PpuMode::Draw => {}
        }
    }

    /// Renders the scanline at the draw -> HBlank transition.
    fn render_scanline(&mut self, mmu: &Mmu) {
        let ly = mmu.ly();
        if ly as usize >= SCREEN_HEIGHT {
            return;
        }
        let lcdc = LcdControl::from_bits_truncate(mmu.io_reg(LCDC_ADDR));

        self.render_background(mmu, ly, lcdc);
        if lcdc.contains(LcdControl::SPRITE_ENABLE) {
            self.render_sprites(mmu, ly, lcdc);
        }
    }

    fn render_background(&mut self, mmu: &Mmu, ly: u8, lcdc: LcdControl) {
        let vram = mmu.vram_bytes();
        let bgp = mmu.io_reg(BGP_ADDR);
        let scx = mmu.io_reg(SCX_ADDR);
        let scy = mmu.io_reg(SCY_ADDR);
        let wx = mmu.io_reg(WX_ADDR);
        let wy = mmu.io_reg(WY_ADDR);

        let window_active = lcdc.contains(LcdControl::WINDOW_ENABLE) && ly >= wy;
        let window_left = i32::from(wx) - 7;
        let unsigned_tiles = lcdc.contains(LcdControl::BG_WINDOW_TILE_DATA);
        let mut window_drawn = false;

        let row_offset = ly as usize * SCREEN_WIDTH * 4;
        for x in 0..SCREEN_WIDTH {
            let index = if lcdc.contains(LcdControl::BG_WINDOW_ENABLE) {
                if window_active && x as i32 >= window_left.max(0) {
                    window_drawn = true;
                    let map = if lcdc.contains(LcdControl::WINDOW_TILEMAP) { 0x1C00 } else { 0x1800 };
                    let map_x = (x as i32 - window_left) as u16;
                    Self::tile_pixel(vram, map, unsigned_tiles, map_x, u16::from(self.window_line))
                } else {
                    let map = if lcdc.contains(LcdControl::BG_TILEMAP) { 0x1C00 } else { 0x1800 };
                    let map_x = (x as u16 + u16::from(scx)) & 0xFF;
                    let map_y = (u16::from(ly) + u16::from(scy)) & 0xFF;
                    Self::tile_pixel(vram, map, unsigned_tiles, map_x, map_y)
                }
            } else {
                0
            };

            self.line_indices[x] = index;
            let color = if lcdc.contains(LcdControl::BG_WINDOW_ENABLE) {
                Color::from_palette(index, bgp)
            } else {
                Color::WHITE
            };
            color.write_to(&mut self.frame_buffer[row_offset + x * 4..row_offset + x * 4 + 4]);
        }

        if window_drawn {
            self.window_line = self.window_line.wrapping_add(1);
        }
    }

    /// Decodes one background/window pixel. `map` and the returned tile
    /// addresses are offsets into VRAM (relative to 0x8000).
    fn tile_pixel(vram: &[u8], map: u16, unsigned_tiles: bool, map_x: u16, map_y: u16) -> u8 {
        let tile_index = vram[(map + (map_y / 8) * 32 + map_x / 8) as usize];
        let tile_addr = if unsigned_tiles {
            u16::from(tile_index) * 16
        } else {
            (0x1000_i32 + i32::from(tile_index as i8) * 16) as u16
        };
        let line_addr = (tile_addr + (map_y % 8) * 2) as usize;
        let lo = vram[line_addr];
        let hi = vram[line_addr + 1];
        let bit = 7 - (map_x % 8);
        ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1)
    }

    fn render_sprites(&mut self, mmu: &Mmu, ly: u8, lcdc: LcdControl) {
        let vram = mmu.vram_bytes();
        let oam = mmu.oam_bytes();
        let height: i32 = if lcdc.contains(LcdControl::SPRITE_SIZE) { 16 } else { 8 };
        let line = i32::from(ly);

        // The OAM scan keeps the first ten sprites covering this line.
        let mut visible: Vec<Sprite> = Vec::with_capacity(MAX_SPRITES_PER_LINE);
        for index in 0..40 {
            let sprite = Sprite::from_oam(oam, index);
            if line >= sprite.top() && line < sprite.top() + height {
                visible.push(sprite);
                if visible.len() == MAX_SPRITES_PER_LINE {
                    break;
                }
            }
        }

        // Lowest X wins overlaps, ties go to the earlier OAM entry; the
        // stable sort keeps OAM order within equal X. Drawing back to front
        // lets the winner simply overwrite.
        visible.sort_by_key(|sprite| sprite.x);
        for sprite in visible.iter().rev() {
            let mut row = line - sprite.top();
            if sprite.flags.contains(SpriteFlags::Y_FLIP) {
                row = height - 1 - row;
            }
            // In 8x16 mode the tile pair starts at an even index.
            let tile = if height == 16 { sprite.tile & 0xFE } else { sprite.tile };
            let line_addr = (u16::from(tile) * 16 + row as u16 * 2) as usize;
            let lo = vram[line_addr];
            let hi = vram[line_addr + 1];

            let palette = if sprite.flags.contains(SpriteFlags::PALETTE) {
                mmu.io_reg(OBP1_ADDR)
            } else {
                mmu.io_reg(OBP0_ADDR)
            };

            for px in 0..8 {
                let screen_x = sprite.left() + px;
                if !(0..SCREEN_WIDTH as i32).contains(&screen_x) {
                    continue;
                }
                let bit = if sprite.flags.contains(SpriteFlags::X_FLIP) { px } else { 7 - px };
                let index = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                // Color 0 is transparent.
                if index == 0 {
                    continue;
                }
                if sprite.flags.contains(SpriteFlags::BG_OVER_OBJ)
                    && self.line_indices[screen_x as usize] != 0
                {
                    continue;
                }
                let offset = (ly as usize * SCREEN_WIDTH + screen_x as usize) * 4;
                Color::from_palette(index, palette)
                    .write_to(&mut self.frame_buffer[offset..offset + 4]);
            }
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
