// GTIA — Graphics Television Interface Adapter
//
// Owns the nine colour registers, player/missile positioning and graphics
// latches, the four collision matrices, and the console/trigger inputs.
// Rendering itself lives on the bus; the rasterisers read colours and
// priority from here and report collisions back through the setters.

// Write register offsets (from $D000).
pub const HPOSP0: u8 = 0x00;
pub const HPOSM0: u8 = 0x04;
pub const SIZEP0: u8 = 0x08;
pub const SIZEM: u8 = 0x0C;
pub const GRAFP0: u8 = 0x0D;
pub const GRAFM: u8 = 0x11;
pub const COLPM0: u8 = 0x12;
pub const COLPF0: u8 = 0x16;
pub const COLBK: u8 = 0x1A;
pub const PRIOR: u8 = 0x1B;
pub const VDELAY: u8 = 0x1C;
pub const GRACTL: u8 = 0x1D;
pub const HITCLR: u8 = 0x1E;
pub const CONSOL: u8 = 0x1F;

// Read register offsets.
pub const M0PF: u8 = 0x00;
pub const P0PF: u8 = 0x04;
pub const M0PL: u8 = 0x08;
pub const P0PL: u8 = 0x0C;
pub const TRIG0: u8 = 0x10;
pub const PAL_FLAG: u8 = 0x14;

// PRIOR bits.
pub const PRIOR_PF_ABOVE: u8 = 0x04;

// GRACTL bits.
pub const GRACTL_MISSILE: u8 = 0x01;
pub const GRACTL_PLAYER: u8 = 0x02;

/// Playfield colour class of a rendered pixel, used for priority decisions
/// and collision accounting. `Background` never collides.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PixelClass {
    Background,
    Playfield(u8),
}

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Gtia {
    pub hposp: [u8; 4],
    pub hposm: [u8; 4],
    pub sizep: [u8; 4],
    pub sizem: u8,
    pub grafp: [u8; 4],
    pub grafm: u8,
    colpm: [u8; 4],
    colpf: [u8; 4],
    colbk: u8,
    prior: u8,
    vdelay: u8,
    gractl: u8,
    m2pf: [u8; 4],
    p2pf: [u8; 4],
    m2pl: [u8; 4],
    p2pl: [u8; 4],
    trig: [u8; 4],
    consol: u8,
    pal: bool,
}

impl Gtia {
    pub fn new(pal: bool) -> Self {
        let mut gtia = Self {
            hposp: [0; 4],
            hposm: [0; 4],
            sizep: [0; 4],
            sizem: 0,
            grafp: [0; 4],
            grafm: 0,
            colpm: [0; 4],
            colpf: [0; 4],
            colbk: 0,
            prior: 0,
            vdelay: 0,
            gractl: 0,
            m2pf: [0; 4],
            p2pf: [0; 4],
            m2pl: [0; 4],
            p2pl: [0; 4],
            trig: [1; 4],
            consol: 0x07,
            pal,
        };
        gtia.load_default_colors();
        gtia
    }

    pub fn reset(&mut self) {
        let pal = self.pal;
        *self = Self::new(pal);
    }

    // Typical power-on colour set so a machine without an OS still shows
    // something recognisable.
    fn load_default_colors(&mut self) {
        self.colpm = [0x38, 0x58, 0x88, 0xC8];
        self.colpf = [0x28, 0x48, 0x94, 0x46];
        self.colbk = 0x00;
    }

    pub fn read(&self, addr: u8) -> u8 {
        let addr = addr & 0x1F;
        match addr {
            0x00..=0x03 => self.m2pf[addr as usize],
            0x04..=0x07 => self.p2pf[(addr - P0PF) as usize],
            0x08..=0x0B => self.m2pl[(addr - M0PL) as usize],
            0x0C..=0x0F => self.p2pl[(addr - P0PL) as usize],
            0x10..=0x13 => self.trig[(addr - TRIG0) as usize],
            PAL_FLAG => {
                if self.pal {
                    0x01
                } else {
                    0x0F
                }
            }
            CONSOL => self.consol | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u8, value: u8) {
        let addr = addr & 0x1F;
        match addr {
            0x00..=0x03 => self.hposp[addr as usize] = value,
            0x04..=0x07 => self.hposm[(addr - HPOSM0) as usize] = value,
            0x08..=0x0B => self.sizep[(addr - SIZEP0) as usize] = value & 0x03,
            SIZEM => self.sizem = value,
            0x0D..=0x10 => self.grafp[(addr - GRAFP0) as usize] = value,
            GRAFM => self.grafm = value,
            0x12..=0x15 => self.colpm[(addr - COLPM0) as usize] = value,
            0x16..=0x19 => self.colpf[(addr - COLPF0) as usize] = value,
            COLBK => self.colbk = value,
            PRIOR => self.prior = value,
            VDELAY => self.vdelay = value,
            GRACTL => self.gractl = value,
            HITCLR => self.clear_collisions(),
            CONSOL => {} // internal speaker, not modelled
            _ => {}
        }
    }

    // Colour queries for the rasterisers.

    pub fn background_color(&self) -> u8 {
        self.colbk
    }

    pub fn playfield_color(&self, index: u8) -> u8 {
        self.colpf[(index & 0x03) as usize]
    }

    pub fn player_color(&self, index: u8) -> u8 {
        self.colpm[(index & 0x03) as usize]
    }

    /// True when PRIOR puts the playfield in front of players and missiles.
    pub fn playfield_has_priority(&self) -> bool {
        self.prior & PRIOR_PF_ABOVE != 0
    }

    pub fn player_dma_enabled(&self) -> bool {
        self.gractl & GRACTL_PLAYER != 0
    }

    pub fn missile_dma_enabled(&self) -> bool {
        self.gractl & GRACTL_MISSILE != 0
    }

    pub fn player_size(&self, index: usize) -> u8 {
        self.sizep[index & 0x03]
    }

    pub fn missile_size(&self, index: usize) -> u8 {
        (self.sizem >> ((index & 0x03) * 2)) & 0x03
    }

    // Collision accounting. Playfield classes map to bits 0-3.

    pub fn record_player_playfield(&mut self, player: usize, class: PixelClass) {
        if let PixelClass::Playfield(pf) = class {
            self.p2pf[player & 0x03] |= 1 << (pf & 0x03);
        }
    }

    pub fn record_missile_playfield(&mut self, missile: usize, class: PixelClass) {
        if let PixelClass::Playfield(pf) = class {
            self.m2pf[missile & 0x03] |= 1 << (pf & 0x03);
        }
    }

    pub fn record_player_player(&mut self, player: usize, other: usize) {
        if player != other {
            self.p2pl[player & 0x03] |= 1 << (other & 0x03);
        }
    }

    pub fn record_missile_player(&mut self, missile: usize, player: usize) {
        self.m2pl[missile & 0x03] |= 1 << (player & 0x03);
    }

    pub fn clear_collisions(&mut self) {
        self.m2pf = [0; 4];
        self.p2pf = [0; 4];
        self.m2pl = [0; 4];
        self.p2pl = [0; 4];
    }

    // External inputs (active-low on the wire, booleans here).

    pub fn set_trigger(&mut self, index: usize, pressed: bool) {
        if index < 4 {
            self.trig[index] = if pressed { 0 } else { 1 };
        }
    }

    pub fn set_console(&mut self, start: bool, select: bool, option: bool) {
        let mut consol = 0x07;
        if start {
            consol &= !0x01;
        }
        if select {
            consol &= !0x02;
        }
        if option {
            consol &= !0x04;
        }
        self.consol = consol;
    }

    pub fn is_pal(&self) -> bool {
        self.pal
    }
}
