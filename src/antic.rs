// ANTIC — display-list processor and the machine's scanline clock.
//
// The bus owns rendering and memory access; this module holds the register
// file, the scan/mode-row state machine, NMI bookkeeping, and the DMA cycle
// tally the CPU budget is charged with.

/// Register offsets (from $D400). Reads and writes share the address space;
/// VCOUNT and NMIST are the readable slots.
pub const DMACTL: u8 = 0x00;
pub const CHACTL: u8 = 0x01;
pub const DLISTL: u8 = 0x02;
pub const DLISTH: u8 = 0x03;
pub const HSCROL: u8 = 0x04;
pub const VSCROL: u8 = 0x05;
pub const PMBASE: u8 = 0x07;
pub const CHBASE: u8 = 0x09;
pub const WSYNC: u8 = 0x0A;
pub const VCOUNT: u8 = 0x0B;
pub const PENH: u8 = 0x0C;
pub const PENV: u8 = 0x0D;
pub const NMIEN: u8 = 0x0E;
pub const NMIRES: u8 = 0x0F;
pub const NMIST: u8 = 0x0F;

// DMACTL bits.
pub const DMACTL_PLAYFIELD: u8 = 0x03;
pub const DMACTL_NARROW: u8 = 0x01;
pub const DMACTL_STANDARD: u8 = 0x02;
pub const DMACTL_WIDE: u8 = 0x03;
pub const DMACTL_MISSILE: u8 = 0x04;
pub const DMACTL_PLAYER: u8 = 0x08;
pub const DMACTL_PM_1LINE: u8 = 0x10;
pub const DMACTL_DL: u8 = 0x20;

// CHACTL bits.
pub const CHACTL_INVERT: u8 = 0x02;
pub const CHACTL_REFLECT: u8 = 0x04;

// NMIEN/NMIST bits. NMIST is active-low, reset to $1F.
pub const NMI_DLI: u8 = 0x80;
pub const NMI_VBI: u8 = 0x40;

// Display-list instruction modifier bits.
pub const DL_DLI: u8 = 0x80;
pub const DL_LMS: u8 = 0x40;
pub const DL_VSCROL: u8 = 0x20;
pub const DL_HSCROL: u8 = 0x10;
pub const DL_JVB: u8 = 0x40;

/// CPU cycles per scanline before DMA stealing.
pub const CYCLES_PER_SCANLINE: u32 = 114;
/// Flat DMA charge for a visible scanline that fetches playfield data.
pub const PLAYFIELD_DMA_CYCLES: u32 = 40;

/// First scanline of the 192-line window captured into the bitmap.
pub const FIRST_VISIBLE_SCANLINE: u16 = 32;
/// Vertical blank region: scanlines below 8 and from here up are blank.
pub const VBLANK_START: u16 = 248;

/// Per-mode geometry: scanlines per row, screen bytes per row, and whether
/// the row indexes a character set. Slots 0 and 1 are the blank and jump
/// instructions, handled before the table is consulted.
#[derive(Clone, Copy)]
pub struct ModeParams {
    pub scanlines: u8,
    pub bytes_per_row: u8,
    pub char_mode: bool,
}

pub const MODE_PARAMS: [ModeParams; 16] = [
    ModeParams { scanlines: 1, bytes_per_row: 0, char_mode: false }, // 0: blank
    ModeParams { scanlines: 1, bytes_per_row: 0, char_mode: false }, // 1: jump
    ModeParams { scanlines: 8, bytes_per_row: 40, char_mode: true }, // 2: GR.0
    ModeParams { scanlines: 10, bytes_per_row: 40, char_mode: true },
    ModeParams { scanlines: 8, bytes_per_row: 40, char_mode: true }, // 4: multicolour text
    ModeParams { scanlines: 16, bytes_per_row: 40, char_mode: true },
    ModeParams { scanlines: 8, bytes_per_row: 20, char_mode: true }, // 6: double width text
    ModeParams { scanlines: 16, bytes_per_row: 20, char_mode: true },
    ModeParams { scanlines: 8, bytes_per_row: 10, char_mode: false }, // 8: GR.3
    ModeParams { scanlines: 4, bytes_per_row: 10, char_mode: false },
    ModeParams { scanlines: 4, bytes_per_row: 20, char_mode: false },
    ModeParams { scanlines: 2, bytes_per_row: 20, char_mode: false },
    ModeParams { scanlines: 1, bytes_per_row: 20, char_mode: false },
    ModeParams { scanlines: 2, bytes_per_row: 40, char_mode: false }, // D: GR.7
    ModeParams { scanlines: 1, bytes_per_row: 40, char_mode: false }, // E: GR.15
    ModeParams { scanlines: 1, bytes_per_row: 40, char_mode: false }, // F: GR.8 hires
];

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Antic {
    // Register file.
    pub(crate) dmactl: u8,
    pub(crate) chactl: u8,
    pub(crate) dlist: u16,
    pub(crate) hscrol: u8,
    pub(crate) vscrol: u8,
    pub(crate) pmbase: u8,
    pub(crate) chbase: u8,
    pub(crate) nmien: u8,
    pub(crate) nmist: u8,

    // Scan state.
    pub(crate) scanline: u16,
    pub(crate) dl_pc: u16,
    pub(crate) memscan: u16,
    pub(crate) mode_lines_remaining: u8,
    pub(crate) row_in_mode: u8,
    pub(crate) current_mode: u8,
    pub(crate) in_display_list: bool,
    pub(crate) dli_pending: bool,
    pub(crate) vbi_pending: bool,
    pub(crate) wsync_halted: bool,

    // Current mode-row setup.
    pub(crate) scanlines_per_row: u8,
    pub(crate) char_mode: bool,
    pub(crate) bytes_per_row: u8,
    pub(crate) render_bytes: u8,
    pub(crate) x_offset: u16,
    pub(crate) row_dli: bool,
    pub(crate) hscroll_enabled: bool,
    pub(crate) vscroll_enabled: bool,

    /// DMA cycles charged against the *next* scanline's CPU budget.
    pub(crate) dma_cycles: u32,

    frame_count: u64,
}

impl Antic {
    pub fn new() -> Self {
        Self {
            dmactl: 0,
            chactl: 0,
            dlist: 0,
            hscrol: 0,
            vscrol: 0,
            pmbase: 0,
            chbase: 0,
            nmien: 0,
            nmist: 0x1F,
            scanline: 0,
            dl_pc: 0,
            memscan: 0,
            mode_lines_remaining: 0,
            row_in_mode: 0,
            current_mode: 0,
            in_display_list: false,
            dli_pending: false,
            vbi_pending: false,
            wsync_halted: false,
            scanlines_per_row: 0,
            char_mode: false,
            bytes_per_row: 0,
            render_bytes: 0,
            x_offset: 0,
            row_dli: false,
            hscroll_enabled: false,
            vscroll_enabled: false,
            dma_cycles: 0,
            frame_count: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn read(&self, addr: u8) -> u8 {
        match addr & 0x0F {
            VCOUNT => (self.scanline >> 1) as u8,
            PENH | PENV => 0x00, // light pen not wired
            NMIST => self.nmist,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u8, value: u8) {
        match addr & 0x0F {
            DMACTL => self.dmactl = value,
            CHACTL => self.chactl = value,
            DLISTL => self.dlist = (self.dlist & 0xFF00) | value as u16,
            DLISTH => self.dlist = (self.dlist & 0x00FF) | ((value as u16) << 8),
            HSCROL => self.hscrol = value & 0x0F,
            VSCROL => self.vscrol = value & 0x0F,
            PMBASE => self.pmbase = value,
            CHBASE => self.chbase = value,
            WSYNC => self.wsync_halted = true,
            NMIEN => self.nmien = value,
            NMIRES => {
                self.nmist = 0x1F;
                self.dli_pending = false;
                self.vbi_pending = false;
            }
            _ => {}
        }
    }

    /// DMA tally accumulated while the previous scanline rendered. The
    /// caller budgets the CPU with it and must call `reset_dma_cycles`.
    pub fn dma_cycles_for_next_scanline(&self) -> u32 {
        self.dma_cycles
    }

    pub fn reset_dma_cycles(&mut self) {
        self.dma_cycles = 0;
    }

    pub fn display_list_enabled(&self) -> bool {
        self.dmactl & DMACTL_DL != 0
    }

    pub fn playfield_width(&self) -> u8 {
        self.dmactl & DMACTL_PLAYFIELD
    }

    pub fn in_vblank(&self) -> bool {
        self.scanline < 8 || self.scanline >= VBLANK_START
    }

    /// Configure the row state for a mode instruction. The memory width
    /// always follows the mode table; the playfield width only changes how
    /// many bytes are rendered and where the row starts on screen.
    pub(crate) fn setup_mode_row(&mut self, mode: u8) {
        let params = MODE_PARAMS[(mode & 0x0F) as usize];
        self.current_mode = mode & 0x0F;
        self.scanlines_per_row = params.scanlines;
        self.char_mode = params.char_mode;
        self.bytes_per_row = params.bytes_per_row;
        self.mode_lines_remaining = params.scanlines;
        self.row_in_mode = 0;

        let standard = params.bytes_per_row.max(1) as u16;
        let px_per_byte = 320 / standard;
        match self.playfield_width() {
            DMACTL_NARROW => {
                self.render_bytes = (params.bytes_per_row as u16 * 4 / 5) as u8;
                self.x_offset = (320 - self.render_bytes as u16 * px_per_byte) / 2;
            }
            DMACTL_STANDARD => {
                self.render_bytes = params.bytes_per_row;
                self.x_offset = 0;
            }
            DMACTL_WIDE => {
                // Reads past the standard width; the extra pixels clip at
                // the right edge.
                self.render_bytes = (params.bytes_per_row as u16 * 6 / 5) as u8;
                self.x_offset = 0;
            }
            _ => {
                self.render_bytes = 0;
                self.x_offset = 0;
            }
        }
    }

    /// Raise the DLI if the finished row asked for one and it is enabled.
    pub(crate) fn complete_row(&mut self) {
        if self.row_dli && self.nmien & NMI_DLI != 0 {
            self.dli_pending = true;
            self.nmist &= !NMI_DLI;
        }
        self.row_dli = false;
    }

    pub(crate) fn request_vbi(&mut self) {
        if self.nmien & NMI_VBI != 0 {
            self.vbi_pending = true;
            self.nmist &= !NMI_VBI;
        }
    }

    /// One-shot edge for the CPU's NMI input.
    pub fn take_pending_nmi(&mut self) -> bool {
        if self.dli_pending {
            self.dli_pending = false;
            return true;
        }
        if self.vbi_pending {
            self.vbi_pending = false;
            return true;
        }
        false
    }

    pub fn wsync_halted(&self) -> bool {
        self.wsync_halted
    }

    pub fn release_wsync(&mut self) {
        self.wsync_halted = false;
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Advance the scanline counter. Returns `true` on frame wrap, at which
    /// point the display list is re-armed and a VBI requested if enabled.
    pub fn advance_scanline(&mut self, total_lines: u16) -> bool {
        self.scanline += 1;
        if self.scanline >= total_lines {
            self.scanline = 0;
            self.dl_pc = self.dlist;
            self.in_display_list = true;
            self.mode_lines_remaining = 0;
            self.row_in_mode = 0;
            self.frame_count += 1;
            self.request_vbi();
            return true;
        }
        false
    }
}

impl Default for Antic {
    fn default() -> Self {
        Self::new()
    }
}
