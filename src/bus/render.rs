// Scanline rasterisers.
//
// The bus owns rendering: the display-list walker and the per-mode drawers
// live here so they can borrow ANTIC state, GTIA colours, and the memory
// arrays inside one `&mut self`. Each visible scanline is composed into a
// local 320-entry line of palette indices plus a parallel playfield-class
// line used for player/missile priority and collision accounting, then
// committed into the framebuffer window.

use crate::antic::{
    CHACTL_INVERT, CHACTL_REFLECT, DL_DLI, DL_HSCROL, DL_JVB, DL_LMS, DL_VSCROL, DMACTL_MISSILE,
    DMACTL_PLAYER, DMACTL_PM_1LINE, FIRST_VISIBLE_SCANLINE, PLAYFIELD_DMA_CYCLES,
};
use crate::gtia::PixelClass;
use crate::host::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

use super::Bus;

// Playfield classes carried per pixel: 0 is background, 1-4 are PF0-PF3.
const CLASS_NONE: u8 = 0;

// The standard playfield starts at colour clock 48; one clock is two
// output pixels.
const LEFT_BORDER_CLOCK: i32 = 48;

fn class_of(code: u8) -> PixelClass {
    if code == CLASS_NONE {
        PixelClass::Background
    } else {
        PixelClass::Playfield(code - 1)
    }
}

fn size_scale(code: u8) -> i32 {
    match code {
        1 => 2,
        3 => 4,
        _ => 1,
    }
}

impl Bus {
    /// Draw the current scanline. Called after the CPU has consumed its
    /// budget; display-list DMA charged here steals from the next line.
    pub(crate) fn render_scanline(&mut self) {
        if self.antic.in_vblank() {
            // Nothing in the vertical blank region lands in the bitmap.
            return;
        }

        if self.antic.playfield_width() == 0 || !self.antic.display_list_enabled() {
            self.draw_background_line();
            return;
        }

        if self.antic.in_display_list && self.antic.mode_lines_remaining == 0 {
            self.process_display_list();
        }

        if self.antic.mode_lines_remaining == 0 {
            // Jump instruction or an exhausted list: show background.
            self.draw_background_line();
            return;
        }

        if self.antic.current_mode >= 2 {
            self.draw_mode_line();
        } else {
            self.draw_background_line();
        }

        self.antic.row_in_mode += 1;
        self.antic.mode_lines_remaining -= 1;

        let row_finished = self.antic.mode_lines_remaining == 0;
        if self.antic.current_mode >= 2 {
            // Char rows fetch one row of codes for all their scanlines;
            // bitmap rows fetch fresh data every scanline.
            if self.antic.char_mode {
                if row_finished {
                    self.antic.memscan = self
                        .antic
                        .memscan
                        .wrapping_add(self.antic.bytes_per_row as u16);
                }
            } else {
                self.antic.memscan = self
                    .antic
                    .memscan
                    .wrapping_add(self.antic.bytes_per_row as u16);
            }
        }
        if row_finished {
            self.antic.complete_row();
        }
    }

    /// Fetch and decode one display-list instruction. Blank and jump
    /// instructions are resolved here; mode instructions set up the row.
    fn process_display_list(&mut self) {
        if !self.antic.display_list_enabled() {
            return;
        }

        let instruction = self.fetch_dl_byte();
        let mode = instruction & 0x0F;

        if mode == 0x01 {
            // JMP / JVB: operand replaces the fetch pointer. The jump
            // itself occupies this scanline as background.
            let lo = self.fetch_dl_byte() as u16;
            let hi = self.fetch_dl_byte() as u16;
            self.antic.dl_pc = (hi << 8) | lo;
            if instruction & DL_JVB != 0 {
                self.antic.in_display_list = false;
                self.antic.request_vbi();
            }
            return;
        }

        self.antic.row_dli = instruction & DL_DLI != 0;
        self.antic.hscroll_enabled = instruction & DL_HSCROL != 0;
        self.antic.vscroll_enabled = instruction & DL_VSCROL != 0;

        if mode == 0x00 {
            // Blank lines; the high three bits carry the count minus one.
            self.antic.current_mode = 0;
            self.antic.mode_lines_remaining = ((instruction >> 4) & 0x07) + 1;
            self.antic.row_in_mode = 0;
            return;
        }

        self.antic.setup_mode_row(mode);
        if instruction & DL_LMS != 0 {
            let lo = self.fetch_dl_byte() as u16;
            let hi = self.fetch_dl_byte() as u16;
            self.antic.memscan = (hi << 8) | lo;
        }
    }

    fn fetch_dl_byte(&mut self) -> u8 {
        let byte = self.video_read(self.antic.dl_pc);
        self.antic.dl_pc = self.antic.dl_pc.wrapping_add(1);
        self.antic.dma_cycles += 1;
        byte
    }

    fn draw_background_line(&mut self) {
        let bg = self.gtia.background_color();
        let mut line = [bg; DISPLAY_WIDTH];
        let class = [CLASS_NONE; DISPLAY_WIDTH];
        self.finish_line(&mut line, &class);
    }

    fn draw_mode_line(&mut self) {
        let mode = self.antic.current_mode;
        // Text rows sit on the COLPF2 paper; everything else on COLBK.
        let paper = if mode == 2 || mode == 3 {
            self.gtia.playfield_color(2)
        } else {
            self.gtia.background_color()
        };
        let mut line = [paper; DISPLAY_WIDTH];
        let mut class = [CLASS_NONE; DISPLAY_WIDTH];

        match mode {
            2 | 3 => self.draw_text_line(&mut line, &mut class),
            4 | 5 => self.draw_multicolor_text_line(&mut line, &mut class),
            6 | 7 => self.draw_wide_text_line(&mut line, &mut class),
            0x0F => self.draw_hires_line(&mut line, &mut class),
            0x09 | 0x0B | 0x0C => self.draw_two_color_map_line(&mut line, &mut class),
            _ => self.draw_four_color_map_line(&mut line, &mut class),
        }

        self.antic.dma_cycles += PLAYFIELD_DMA_CYCLES;
        self.finish_line(&mut line, &class);
    }

    /// Glyph row for the current scanline, scaled for over-tall modes and
    /// honouring CHACTL reflection.
    fn glyph_row(&self) -> u16 {
        let height = self.antic.scanlines_per_row.max(1);
        let mut row = if height > 8 {
            self.antic.row_in_mode * 8 / height
        } else {
            self.antic.row_in_mode
        };
        if self.antic.chactl & CHACTL_REFLECT != 0 {
            row = 7 - row.min(7);
        }
        row as u16
    }

    // Modes 2/3: 40 columns, foreground takes COLPF1's luminance on
    // COLPF2's hue.
    fn draw_text_line(&self, line: &mut [u8; DISPLAY_WIDTH], class: &mut [u8; DISPLAY_WIDTH]) {
        let paper = self.gtia.playfield_color(2);
        let ink = (paper & 0xF0) | (self.gtia.playfield_color(1) & 0x0F);
        let char_base = (self.antic.chbase as u16) << 8;
        let glyph_row = self.glyph_row();
        let invert_enabled = self.antic.chactl & CHACTL_INVERT != 0;

        let mut x = self.antic.x_offset as usize;
        for col in 0..self.antic.render_bytes as u16 {
            if x >= DISPLAY_WIDTH {
                break;
            }
            let code = self.video_read(self.antic.memscan.wrapping_add(col));
            let glyph = char_base
                .wrapping_add(((code & 0x7F) as u16) * 8)
                .wrapping_add(glyph_row);
            let mut data = self.video_read(glyph);
            if invert_enabled && code & 0x80 != 0 {
                data ^= 0xFF;
            }
            for bit in (0..8).rev() {
                if x >= DISPLAY_WIDTH {
                    break;
                }
                if data & (1 << bit) != 0 {
                    line[x] = ink;
                    class[x] = 2; // lit text registers as PF1
                }
                x += 1;
            }
        }
    }

    // Modes 4/5: 40 columns of 2-bit pixels; pixel value 3 selects COLPF3
    // when the character code carries bit 7, giving the fifth colour.
    fn draw_multicolor_text_line(
        &self,
        line: &mut [u8; DISPLAY_WIDTH],
        class: &mut [u8; DISPLAY_WIDTH],
    ) {
        let char_base = (self.antic.chbase as u16) << 8;
        let glyph_row = self.glyph_row();

        let mut x = self.antic.x_offset as usize;
        for col in 0..self.antic.render_bytes as u16 {
            if x >= DISPLAY_WIDTH {
                break;
            }
            let code = self.video_read(self.antic.memscan.wrapping_add(col));
            let glyph = char_base
                .wrapping_add(((code & 0x7F) as u16) * 8)
                .wrapping_add(glyph_row);
            let data = self.video_read(glyph);
            for field in 0..4 {
                let bits = (data >> (6 - field * 2)) & 0x03;
                let (color, pixel_class) = match bits {
                    0 => (self.gtia.background_color(), CLASS_NONE),
                    3 if code & 0x80 != 0 => (self.gtia.playfield_color(3), 4),
                    _ => (self.gtia.playfield_color(bits - 1), bits),
                };
                for _ in 0..2 {
                    if x >= DISPLAY_WIDTH {
                        break;
                    }
                    if pixel_class != CLASS_NONE {
                        line[x] = color;
                        class[x] = pixel_class;
                    }
                    x += 1;
                }
            }
        }
    }

    // Modes 6/7: 20 double-width columns, colour picked by the two high
    // bits of the character code.
    fn draw_wide_text_line(&self, line: &mut [u8; DISPLAY_WIDTH], class: &mut [u8; DISPLAY_WIDTH]) {
        let char_base = (self.antic.chbase as u16) << 8;
        let glyph_row = self.glyph_row();

        let mut x = self.antic.x_offset as usize;
        for col in 0..self.antic.render_bytes as u16 {
            if x >= DISPLAY_WIDTH {
                break;
            }
            let code = self.video_read(self.antic.memscan.wrapping_add(col));
            let palette_select = code >> 6;
            let ink = self.gtia.playfield_color(palette_select);
            let glyph = char_base
                .wrapping_add(((code & 0x3F) as u16) * 8)
                .wrapping_add(glyph_row);
            let data = self.video_read(glyph);
            for bit in (0..8).rev() {
                let lit = data & (1 << bit) != 0;
                for _ in 0..2 {
                    if x >= DISPLAY_WIDTH {
                        break;
                    }
                    if lit {
                        line[x] = ink;
                        class[x] = palette_select + 1;
                    }
                    x += 1;
                }
            }
        }
    }

    // Mode F: 320 one-bit pixels, COLPF0 ink on the background.
    fn draw_hires_line(&self, line: &mut [u8; DISPLAY_WIDTH], class: &mut [u8; DISPLAY_WIDTH]) {
        let ink = self.gtia.playfield_color(0);
        let mut x = self.antic.x_offset as usize;
        for col in 0..self.antic.render_bytes as u16 {
            if x >= DISPLAY_WIDTH {
                break;
            }
            let data = self.video_read(self.antic.memscan.wrapping_add(col));
            for bit in (0..8).rev() {
                if x >= DISPLAY_WIDTH {
                    break;
                }
                if data & (1 << bit) != 0 {
                    line[x] = ink;
                    class[x] = 1;
                }
                x += 1;
            }
        }
    }

    // Modes 9/B/C: one-bit map pixels in COLPF0, stretched to the mode's
    // pixel width.
    fn draw_two_color_map_line(
        &self,
        line: &mut [u8; DISPLAY_WIDTH],
        class: &mut [u8; DISPLAY_WIDTH],
    ) {
        let ink = self.gtia.playfield_color(0);
        let px_per_byte = DISPLAY_WIDTH / self.antic.bytes_per_row.max(1) as usize;
        let px = px_per_byte / 8;

        let mut x = self.antic.x_offset as usize;
        for col in 0..self.antic.render_bytes as u16 {
            if x >= DISPLAY_WIDTH {
                break;
            }
            let data = self.video_read(self.antic.memscan.wrapping_add(col));
            for bit in (0..8).rev() {
                let lit = data & (1 << bit) != 0;
                for _ in 0..px {
                    if x >= DISPLAY_WIDTH {
                        break;
                    }
                    if lit {
                        line[x] = ink;
                        class[x] = 1;
                    }
                    x += 1;
                }
            }
        }
    }

    // Modes 8/A/D/E: 2-bit map pixels over [COLBK, COLPF0, COLPF1, COLPF2].
    fn draw_four_color_map_line(
        &self,
        line: &mut [u8; DISPLAY_WIDTH],
        class: &mut [u8; DISPLAY_WIDTH],
    ) {
        let px_per_byte = DISPLAY_WIDTH / self.antic.bytes_per_row.max(1) as usize;
        let px = px_per_byte / 4;

        let mut x = self.antic.x_offset as usize;
        for col in 0..self.antic.render_bytes as u16 {
            if x >= DISPLAY_WIDTH {
                break;
            }
            let data = self.video_read(self.antic.memscan.wrapping_add(col));
            for field in 0..4 {
                let bits = (data >> (6 - field * 2)) & 0x03;
                for _ in 0..px {
                    if x >= DISPLAY_WIDTH {
                        break;
                    }
                    if bits != 0 {
                        line[x] = self.gtia.playfield_color(bits - 1);
                        class[x] = bits;
                    }
                    x += 1;
                }
            }
        }
    }

    /// Player/missile DMA, overlay, collision accounting, and the commit
    /// into the visible window.
    fn finish_line(&mut self, line: &mut [u8; DISPLAY_WIDTH], class: &[u8; DISPLAY_WIDTH]) {
        self.fetch_player_missile_dma();
        self.overlay_players_missiles(line, class);
        self.commit_line(line);
    }

    /// Refresh GRAFP/GRAFM from the player/missile DMA area when both
    /// DMACTL and GRACTL enable it. Resolution follows DMACTL bit 4.
    fn fetch_player_missile_dma(&mut self) {
        let scanline = self.antic.scanline;
        let base = (self.antic.pmbase as u16) << 8;
        let single_line = self.antic.dmactl & DMACTL_PM_1LINE != 0;

        if self.antic.dmactl & DMACTL_PLAYER != 0 && self.gtia.player_dma_enabled() {
            for index in 0..4u16 {
                let addr = if single_line {
                    base.wrapping_add(0x400 + index * 0x100 + scanline)
                } else {
                    base.wrapping_add(0x200 + index * 0x80 + scanline / 2)
                };
                self.gtia.grafp[index as usize] = self.video_read(addr);
            }
        }
        if self.antic.dmactl & DMACTL_MISSILE != 0 && self.gtia.missile_dma_enabled() {
            let addr = if single_line {
                base.wrapping_add(0x300 + scanline)
            } else {
                base.wrapping_add(0x180 + scanline / 2)
            };
            self.gtia.grafm = self.video_read(addr);
        }
    }

    fn overlay_players_missiles(&mut self, line: &mut [u8; DISPLAY_WIDTH], class: &[u8; DISPLAY_WIDTH]) {
        let playfield_front = self.gtia.playfield_has_priority();
        let mut player_mask = [0u8; DISPLAY_WIDTH];

        // Players, highest index first so player 0 ends up on top.
        for index in (0..4).rev() {
            let graf = self.gtia.grafp[index];
            if graf == 0 {
                continue;
            }
            let scale = size_scale(self.gtia.player_size(index));
            let base_clock = self.gtia.hposp[index] as i32 - LEFT_BORDER_CLOCK;
            let color = self.gtia.player_color(index as u8);
            for bit in 0..8 {
                if graf & (0x80 >> bit) == 0 {
                    continue;
                }
                let start = (base_clock + bit as i32 * scale) * 2;
                for x in start..start + scale * 2 {
                    if !(0..DISPLAY_WIDTH as i32).contains(&x) {
                        continue;
                    }
                    let x = x as usize;
                    self.gtia.record_player_playfield(index, class_of(class[x]));
                    for other in 0..4 {
                        if player_mask[x] & (1 << other) != 0 {
                            self.gtia.record_player_player(index, other);
                            self.gtia.record_player_player(other, index);
                        }
                    }
                    player_mask[x] |= 1 << index;
                    if !(playfield_front && class[x] != CLASS_NONE) {
                        line[x] = color;
                    }
                }
            }
        }

        // Missiles wear their player's colour and sit beneath players.
        if self.gtia.grafm != 0 {
            for index in 0..4 {
                let pattern = (self.gtia.grafm >> (index * 2)) & 0x03;
                if pattern == 0 {
                    continue;
                }
                let scale = size_scale(self.gtia.missile_size(index));
                let base_clock = self.gtia.hposm[index] as i32 - LEFT_BORDER_CLOCK;
                let color = self.gtia.player_color(index as u8);
                for bit in 0..2 {
                    if pattern & (0x02 >> bit) == 0 {
                        continue;
                    }
                    let start = (base_clock + bit as i32 * scale) * 2;
                    for x in start..start + scale * 2 {
                        if !(0..DISPLAY_WIDTH as i32).contains(&x) {
                            continue;
                        }
                        let x = x as usize;
                        self.gtia.record_missile_playfield(index, class_of(class[x]));
                        for player in 0..4 {
                            if player_mask[x] & (1 << player) != 0 {
                                self.gtia.record_missile_player(index, player);
                            }
                        }
                        if player_mask[x] == 0 && !(playfield_front && class[x] != CLASS_NONE) {
                            line[x] = color;
                        }
                    }
                }
            }
        }
    }

    fn commit_line(&mut self, line: &[u8; DISPLAY_WIDTH]) {
        let scanline = self.antic.scanline;
        if scanline < FIRST_VISIBLE_SCANLINE
            || scanline >= FIRST_VISIBLE_SCANLINE + DISPLAY_HEIGHT as u16
        {
            return;
        }
        let row = (scanline - FIRST_VISIBLE_SCANLINE) as usize;
        self.framebuffer[row * DISPLAY_WIDTH..(row + 1) * DISPLAY_WIDTH].copy_from_slice(line);
    }
}
