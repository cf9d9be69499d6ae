use crate::bus::Bus;

#[cfg(test)]
mod tests;

pub const FLAG_CARRY: u8 = 0b0000_0001;
pub const FLAG_ZERO: u8 = 0b0000_0010;
pub const FLAG_INTERRUPT_DISABLE: u8 = 0b0000_0100;
pub const FLAG_DECIMAL: u8 = 0b0000_1000;
pub const FLAG_BREAK: u8 = 0b0001_0000;
pub const FLAG_UNUSED: u8 = 0b0010_0000;
pub const FLAG_OVERFLOW: u8 = 0b0100_0000;
pub const FLAG_NEGATIVE: u8 = 0b1000_0000;

pub const VECTOR_NMI: u16 = 0xFFFA;
pub const VECTOR_RESET: u16 = 0xFFFC;
pub const VECTOR_IRQ: u16 = 0xFFFE;

const INTERRUPT_CYCLES: u32 = 7;

/// NMOS 6502 core.
///
/// Covers the full documented instruction matrix with decimal-mode ADC/SBC
/// and the page-crossing read penalties. Undocumented opcodes execute as
/// two-byte NOPs (the handful with well-known other widths keep them); the
/// twelve jam opcodes set the observable halt flag and leave PC on the
/// offending instruction.
#[derive(Clone, bincode::Encode, bincode::Decode)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub halted: bool,
    nmi_pending: bool,
    irq_pending: bool,
    last_opcode: u8,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: FLAG_INTERRUPT_DISABLE | FLAG_UNUSED,
            halted: false,
            nmi_pending: false,
            irq_pending: false,
            last_opcode: 0,
        }
    }

    pub fn reset(&mut self, bus: &mut Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = FLAG_INTERRUPT_DISABLE | FLAG_UNUSED;
        self.pc = bus.read_u16(VECTOR_RESET);
        self.halted = false;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.last_opcode = 0;
    }

    /// Latch an NMI edge; serviced at the next instruction boundary.
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Latch an IRQ. The POKEY line is additionally re-sampled from the bus
    /// on every step, so a level that stays asserted keeps interrupting.
    pub fn request_irq(&mut self) {
        self.irq_pending = true;
    }

    pub fn last_opcode(&self) -> u8 {
        self.last_opcode
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.status & mask != 0
    }

    #[inline]
    pub fn set_flag(&mut self, mask: u8, value: bool) {
        if value {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    /// Base cycle count per opcode, before page-crossing and branch
    /// penalties. Jam opcodes carry 0 and are dispatched separately; every
    /// other unlisted opcode is a two-cycle NOP.
    #[inline]
    fn opcode_base_cycles(opcode: u8) -> u32 {
        match opcode {
            // Jam: dispatch handles these before charging cycles.
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => 0,

            // Implied/accumulator/immediate and branch bases.
            0x09 | 0x0A | 0x10 | 0x18 | 0x1A | 0x29 | 0x2A | 0x30 | 0x38 | 0x3A | 0x49 | 0x4A
            | 0x50 | 0x58 | 0x5A | 0x69 | 0x6A | 0x70 | 0x78 | 0x7A | 0x80 | 0x82 | 0x88 | 0x89
            | 0x8A | 0x90 | 0x98 | 0x9A | 0xA0 | 0xA2 | 0xA8 | 0xA9 | 0xAA | 0xB0 | 0xB8 | 0xBA
            | 0xC0 | 0xC2 | 0xC8 | 0xC9 | 0xCA | 0xD0 | 0xD8 | 0xDA | 0xE0 | 0xE2 | 0xE8 | 0xE9
            | 0xEA | 0xEB | 0xF0 | 0xF8 | 0xFA => 2,

            // Zero-page read/write, pushes, JMP absolute.
            0x04 | 0x05 | 0x08 | 0x24 | 0x25 | 0x44 | 0x45 | 0x48 | 0x4C | 0x64 | 0x65 | 0x84
            | 0x85 | 0x86 | 0xA4 | 0xA5 | 0xA6 | 0xC4 | 0xC5 | 0xE4 | 0xE5 => 3,

            // Zero-page indexed, absolute read/write, pulls.
            0x0C | 0x0D | 0x14 | 0x15 | 0x19 | 0x1C | 0x1D | 0x28 | 0x2C | 0x2D | 0x34 | 0x35
            | 0x39 | 0x3C | 0x3D | 0x4D | 0x54 | 0x55 | 0x59 | 0x5C | 0x5D | 0x68 | 0x6D | 0x74
            | 0x75 | 0x79 | 0x7C | 0x7D | 0x8C | 0x8D | 0x8E | 0x94 | 0x95 | 0x96 | 0xAC | 0xAD
            | 0xAE | 0xB4 | 0xB5 | 0xB6 | 0xB9 | 0xBC | 0xBD | 0xBE | 0xCC | 0xCD | 0xD4 | 0xD5
            | 0xD9 | 0xDC | 0xDD | 0xEC | 0xED | 0xF4 | 0xF5 | 0xF9 | 0xFC | 0xFD => 4,

            // Zero-page RMW, (ind),Y reads, STA absolute indexed, JMP (ind).
            0x06 | 0x11 | 0x26 | 0x31 | 0x46 | 0x51 | 0x66 | 0x6C | 0x71 | 0x99 | 0x9D | 0xB1
            | 0xC6 | 0xD1 | 0xE6 | 0xF1 => 5,

            // Indexed RMW, (ind,X), STA (ind),Y, JSR/RTS/RTI.
            0x01 | 0x0E | 0x16 | 0x20 | 0x21 | 0x2E | 0x36 | 0x40 | 0x41 | 0x4E | 0x56 | 0x60
            | 0x61 | 0x6E | 0x76 | 0x81 | 0x91 | 0xA1 | 0xC1 | 0xCE | 0xD6 | 0xE1 | 0xEE | 0xF6 => {
                6
            }

            // Absolute-indexed RMW and BRK.
            0x00 | 0x1E | 0x3E | 0x5E | 0x7E | 0xDE | 0xFE => 7,

            // Remaining undocumented opcodes run as two-byte NOPs.
            _ => 2,
        }
    }

    pub fn step(&mut self, bus: &mut Bus) -> u32 {
        if self.halted {
            return 0;
        }

        if self.nmi_pending {
            self.nmi_pending = false;
            return self.service_interrupt(bus, VECTOR_NMI);
        }

        if (self.irq_pending || bus.irq_pending()) && !self.flag(FLAG_INTERRUPT_DISABLE) {
            self.irq_pending = false;
            return self.service_interrupt(bus, VECTOR_IRQ);
        }

        let opcode = self.fetch_byte(bus);
        self.last_opcode = opcode;
        let base = Self::opcode_base_cycles(opcode);
        match opcode {
            // Jam: observable halt, PC stays on the instruction.
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
                self.pc = self.pc.wrapping_sub(1);
                self.halted = true;
                0
            }

            // Load A
            0xA9 => {
                let value = self.fetch_byte(bus);
                self.lda(value, base)
            }
            0xA5 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.lda(value, base)
            }
            0xB5 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.lda(value, base)
            }
            0xAD => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.lda(value, base)
            }
            0xBD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.lda(value, base) + crossed as u32
            }
            0xB9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.lda(value, base) + crossed as u32
            }
            0xA1 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.lda(value, base)
            }
            0xB1 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.lda(value, base) + crossed as u32
            }

            // Load X
            0xA2 => {
                let value = self.fetch_byte(bus);
                self.ldx(value, base)
            }
            0xA6 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.ldx(value, base)
            }
            0xB6 => {
                let addr = self.addr_zeropage_y(bus);
                let value = bus.read(addr);
                self.ldx(value, base)
            }
            0xAE => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.ldx(value, base)
            }
            0xBE => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.ldx(value, base) + crossed as u32
            }

            // Load Y
            0xA0 => {
                let value = self.fetch_byte(bus);
                self.ldy(value, base)
            }
            0xA4 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.ldy(value, base)
            }
            0xB4 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.ldy(value, base)
            }
            0xAC => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.ldy(value, base)
            }
            0xBC => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.ldy(value, base) + crossed as u32
            }

            // Store A
            0x85 => {
                let addr = self.addr_zeropage(bus);
                bus.write(addr, self.a);
                base
            }
            0x95 => {
                let addr = self.addr_zeropage_x(bus);
                bus.write(addr, self.a);
                base
            }
            0x8D => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.a);
                base
            }
            0x9D => {
                let (addr, _) = self.addr_absolute_x(bus);
                bus.write(addr, self.a);
                base
            }
            0x99 => {
                let (addr, _) = self.addr_absolute_y(bus);
                bus.write(addr, self.a);
                base
            }
            0x81 => {
                let addr = self.addr_indexed_indirect_x(bus);
                bus.write(addr, self.a);
                base
            }
            0x91 => {
                let (addr, _) = self.addr_indirect_y(bus);
                bus.write(addr, self.a);
                base
            }

            // Store X / Y
            0x86 => {
                let addr = self.addr_zeropage(bus);
                bus.write(addr, self.x);
                base
            }
            0x96 => {
                let addr = self.addr_zeropage_y(bus);
                bus.write(addr, self.x);
                base
            }
            0x8E => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.x);
                base
            }
            0x84 => {
                let addr = self.addr_zeropage(bus);
                bus.write(addr, self.y);
                base
            }
            0x94 => {
                let addr = self.addr_zeropage_x(bus);
                bus.write(addr, self.y);
                base
            }
            0x8C => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.y);
                base
            }

            // Arithmetic
            0x69 => {
                let value = self.fetch_byte(bus);
                self.adc(value, base)
            }
            0x65 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.adc(value, base)
            }
            0x75 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.adc(value, base)
            }
            0x6D => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.adc(value, base)
            }
            0x7D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.adc(value, base) + crossed as u32
            }
            0x79 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.adc(value, base) + crossed as u32
            }
            0x61 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.adc(value, base)
            }
            0x71 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.adc(value, base) + crossed as u32
            }

            0xE9 | 0xEB => {
                let value = self.fetch_byte(bus);
                self.sbc(value, base)
            }
            0xE5 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.sbc(value, base)
            }
            0xF5 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.sbc(value, base)
            }
            0xED => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.sbc(value, base)
            }
            0xFD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.sbc(value, base) + crossed as u32
            }
            0xF9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.sbc(value, base) + crossed as u32
            }
            0xE1 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.sbc(value, base)
            }
            0xF1 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.sbc(value, base) + crossed as u32
            }

            // Logical
            0x29 => {
                let value = self.fetch_byte(bus);
                self.and(value, base)
            }
            0x25 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.and(value, base)
            }
            0x35 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.and(value, base)
            }
            0x2D => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.and(value, base)
            }
            0x3D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.and(value, base) + crossed as u32
            }
            0x39 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.and(value, base) + crossed as u32
            }
            0x21 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.and(value, base)
            }
            0x31 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.and(value, base) + crossed as u32
            }

            0x09 => {
                let value = self.fetch_byte(bus);
                self.ora(value, base)
            }
            0x05 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.ora(value, base)
            }
            0x15 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.ora(value, base)
            }
            0x0D => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.ora(value, base)
            }
            0x1D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.ora(value, base) + crossed as u32
            }
            0x19 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.ora(value, base) + crossed as u32
            }
            0x01 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.ora(value, base)
            }
            0x11 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.ora(value, base) + crossed as u32
            }

            0x49 => {
                let value = self.fetch_byte(bus);
                self.eor(value, base)
            }
            0x45 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.eor(value, base)
            }
            0x55 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.eor(value, base)
            }
            0x4D => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.eor(value, base)
            }
            0x5D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.eor(value, base) + crossed as u32
            }
            0x59 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.eor(value, base) + crossed as u32
            }
            0x41 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.eor(value, base)
            }
            0x51 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.eor(value, base) + crossed as u32
            }

            // BIT
            0x24 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.bit(value, base)
            }
            0x2C => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.bit(value, base)
            }

            // Shifts and rotates
            0x0A => self.asl_acc(base),
            0x06 => {
                let addr = self.addr_zeropage(bus);
                self.asl_mem(bus, addr, base)
            }
            0x16 => {
                let addr = self.addr_zeropage_x(bus);
                self.asl_mem(bus, addr, base)
            }
            0x0E => {
                let addr = self.addr_absolute(bus);
                self.asl_mem(bus, addr, base)
            }
            0x1E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.asl_mem(bus, addr, base)
            }

            0x4A => self.lsr_acc(base),
            0x46 => {
                let addr = self.addr_zeropage(bus);
                self.lsr_mem(bus, addr, base)
            }
            0x56 => {
                let addr = self.addr_zeropage_x(bus);
                self.lsr_mem(bus, addr, base)
            }
            0x4E => {
                let addr = self.addr_absolute(bus);
                self.lsr_mem(bus, addr, base)
            }
            0x5E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.lsr_mem(bus, addr, base)
            }

            0x2A => self.rol_acc(base),
            0x26 => {
                let addr = self.addr_zeropage(bus);
                self.rol_mem(bus, addr, base)
            }
            0x36 => {
                let addr = self.addr_zeropage_x(bus);
                self.rol_mem(bus, addr, base)
            }
            0x2E => {
                let addr = self.addr_absolute(bus);
                self.rol_mem(bus, addr, base)
            }
            0x3E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rol_mem(bus, addr, base)
            }

            0x6A => self.ror_acc(base),
            0x66 => {
                let addr = self.addr_zeropage(bus);
                self.ror_mem(bus, addr, base)
            }
            0x76 => {
                let addr = self.addr_zeropage_x(bus);
                self.ror_mem(bus, addr, base)
            }
            0x6E => {
                let addr = self.addr_absolute(bus);
                self.ror_mem(bus, addr, base)
            }
            0x7E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.ror_mem(bus, addr, base)
            }

            // Increment / decrement memory
            0xE6 => {
                let addr = self.addr_zeropage(bus);
                self.inc_mem(bus, addr, base)
            }
            0xF6 => {
                let addr = self.addr_zeropage_x(bus);
                self.inc_mem(bus, addr, base)
            }
            0xEE => {
                let addr = self.addr_absolute(bus);
                self.inc_mem(bus, addr, base)
            }
            0xFE => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.inc_mem(bus, addr, base)
            }
            0xC6 => {
                let addr = self.addr_zeropage(bus);
                self.dec_mem(bus, addr, base)
            }
            0xD6 => {
                let addr = self.addr_zeropage_x(bus);
                self.dec_mem(bus, addr, base)
            }
            0xCE => {
                let addr = self.addr_absolute(bus);
                self.dec_mem(bus, addr, base)
            }
            0xDE => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.dec_mem(bus, addr, base)
            }

            // Register increment / decrement
            0xE8 => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative(self.x);
                base
            }
            0xC8 => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative(self.y);
                base
            }
            0xCA => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative(self.x);
                base
            }
            0x88 => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative(self.y);
                base
            }

            // Comparisons
            0xC9 => {
                let value = self.fetch_byte(bus);
                self.cmp(value, self.a, base)
            }
            0xC5 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base)
            }
            0xD5 => {
                let addr = self.addr_zeropage_x(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base)
            }
            0xCD => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base)
            }
            0xDD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base) + crossed as u32
            }
            0xD9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base) + crossed as u32
            }
            0xC1 => {
                let addr = self.addr_indexed_indirect_x(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base)
            }
            0xD1 => {
                let (addr, crossed) = self.addr_indirect_y(bus);
                let value = bus.read(addr);
                self.cmp(value, self.a, base) + crossed as u32
            }

            0xE0 => {
                let value = self.fetch_byte(bus);
                self.cmp(value, self.x, base)
            }
            0xE4 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.cmp(value, self.x, base)
            }
            0xEC => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.cmp(value, self.x, base)
            }
            0xC0 => {
                let value = self.fetch_byte(bus);
                self.cmp(value, self.y, base)
            }
            0xC4 => {
                let addr = self.addr_zeropage(bus);
                let value = bus.read(addr);
                self.cmp(value, self.y, base)
            }
            0xCC => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.cmp(value, self.y, base)
            }

            // Branches
            0x90 => self.branch(bus, !self.flag(FLAG_CARRY), base),
            0xB0 => self.branch(bus, self.flag(FLAG_CARRY), base),
            0xF0 => self.branch(bus, self.flag(FLAG_ZERO), base),
            0xD0 => self.branch(bus, !self.flag(FLAG_ZERO), base),
            0x30 => self.branch(bus, self.flag(FLAG_NEGATIVE), base),
            0x10 => self.branch(bus, !self.flag(FLAG_NEGATIVE), base),
            0x70 => self.branch(bus, self.flag(FLAG_OVERFLOW), base),
            0x50 => self.branch(bus, !self.flag(FLAG_OVERFLOW), base),

            // Stack
            0x48 => {
                self.push_byte(bus, self.a);
                base
            }
            0x08 => {
                self.push_byte(bus, self.status | FLAG_BREAK | FLAG_UNUSED);
                base
            }
            0x68 => {
                let value = self.pop_byte(bus);
                self.a = value;
                self.update_zero_and_negative(self.a);
                base
            }
            0x28 => {
                let value = self.pop_byte(bus);
                self.status = (value | FLAG_UNUSED) & !FLAG_BREAK;
                base
            }

            // Jumps and subroutines
            0x4C => {
                self.pc = self.fetch_word(bus);
                base
            }
            0x6C => self.jmp_indirect(bus, base),
            0x20 => self.jsr(bus, base),
            0x60 => self.rts(bus, base),
            0x40 => self.rti(bus, base),
            0x00 => self.brk(bus, base),

            // Flag operations
            0x18 => {
                self.set_flag(FLAG_CARRY, false);
                base
            }
            0x38 => {
                self.set_flag(FLAG_CARRY, true);
                base
            }
            0x58 => {
                self.set_flag(FLAG_INTERRUPT_DISABLE, false);
                base
            }
            0x78 => {
                self.set_flag(FLAG_INTERRUPT_DISABLE, true);
                base
            }
            0xB8 => {
                self.set_flag(FLAG_OVERFLOW, false);
                base
            }
            0xD8 => {
                self.set_flag(FLAG_DECIMAL, false);
                base
            }
            0xF8 => {
                self.set_flag(FLAG_DECIMAL, true);
                base
            }

            // Transfers
            0xAA => {
                self.x = self.a;
                self.update_zero_and_negative(self.x);
                base
            }
            0xA8 => {
                self.y = self.a;
                self.update_zero_and_negative(self.y);
                base
            }
            0x8A => {
                self.a = self.x;
                self.update_zero_and_negative(self.a);
                base
            }
            0x98 => {
                self.a = self.y;
                self.update_zero_and_negative(self.a);
                base
            }
            0xBA => {
                self.x = self.sp;
                self.update_zero_and_negative(self.x);
                base
            }
            0x9A => {
                self.sp = self.x;
                base
            }

            // NOP and the undocumented NOPs with known operand widths.
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => base,
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 | 0x04 | 0x44 | 0x64 | 0x14 | 0x34 | 0x54 | 0x74
            | 0xD4 | 0xF4 => {
                self.fetch_byte(bus);
                base
            }
            0x0C => {
                self.fetch_word(bus);
                base
            }
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => {
                let (_, crossed) = self.addr_absolute_x(bus);
                base + crossed as u32
            }

            // Everything else: undocumented, run as a two-byte NOP.
            _ => {
                self.fetch_byte(bus);
                base
            }
        }
    }

    fn service_interrupt(&mut self, bus: &mut Bus, vector: u16) -> u32 {
        self.push_byte(bus, (self.pc >> 8) as u8);
        self.push_byte(bus, (self.pc & 0xFF) as u8);
        let status = (self.status & !FLAG_BREAK) | FLAG_UNUSED;
        self.push_byte(bus, status);
        self.set_flag(FLAG_INTERRUPT_DISABLE, true);
        self.pc = bus.read_u16(vector);
        INTERRUPT_CYCLES
    }

    // Addressing helpers.

    #[inline]
    fn fetch_byte(&mut self, bus: &mut Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    #[inline]
    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn addr_zeropage(&mut self, bus: &mut Bus) -> u16 {
        self.fetch_byte(bus) as u16
    }

    #[inline]
    fn addr_zeropage_x(&mut self, bus: &mut Bus) -> u16 {
        self.fetch_byte(bus).wrapping_add(self.x) as u16
    }

    #[inline]
    fn addr_zeropage_y(&mut self, bus: &mut Bus) -> u16 {
        self.fetch_byte(bus).wrapping_add(self.y) as u16
    }

    #[inline]
    fn addr_absolute(&mut self, bus: &mut Bus) -> u16 {
        self.fetch_word(bus)
    }

    #[inline]
    fn addr_absolute_x(&mut self, bus: &mut Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(self.x as u16);
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    #[inline]
    fn addr_absolute_y(&mut self, bus: &mut Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(self.y as u16);
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    #[inline]
    fn addr_indexed_indirect_x(&mut self, bus: &mut Bus) -> u16 {
        let pointer = self.fetch_byte(bus).wrapping_add(self.x);
        let lo = bus.read(pointer as u16) as u16;
        let hi = bus.read(pointer.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn addr_indirect_y(&mut self, bus: &mut Bus) -> (u16, bool) {
        let pointer = self.fetch_byte(bus);
        let lo = bus.read(pointer as u16) as u16;
        let hi = bus.read(pointer.wrapping_add(1) as u16) as u16;
        let base = (hi << 8) | lo;
        let addr = base.wrapping_add(self.y as u16);
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    // Stack helpers: SP always addresses the $0100 page.

    pub(crate) fn push_byte(&mut self, bus: &mut Bus, value: u8) {
        bus.write(0x0100 | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pop_byte(&mut self, bus: &mut Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    #[inline]
    fn update_zero_and_negative(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    // Instruction bodies.

    fn lda(&mut self, value: u8, cycles: u32) -> u32 {
        self.a = value;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn ldx(&mut self, value: u8, cycles: u32) -> u32 {
        self.x = value;
        self.update_zero_and_negative(self.x);
        cycles
    }

    fn ldy(&mut self, value: u8, cycles: u32) -> u32 {
        self.y = value;
        self.update_zero_and_negative(self.y);
        cycles
    }

    /// N, V and Z always reflect the binary sum; in decimal mode the
    /// accumulator and carry take the BCD-adjusted result.
    fn adc(&mut self, value: u8, cycles: u32) -> u32 {
        let carry = self.flag(FLAG_CARRY) as u16;
        let binary_sum = self.a as u16 + value as u16 + carry;
        let binary_result = binary_sum as u8;

        self.set_flag(
            FLAG_OVERFLOW,
            (!(self.a ^ value) & (self.a ^ binary_result) & 0x80) != 0,
        );
        self.update_zero_and_negative(binary_result);

        if self.flag(FLAG_DECIMAL) {
            let mut sum = binary_sum;
            if (self.a & 0x0F) as u16 + (value & 0x0F) as u16 + carry > 9 {
                sum = sum.wrapping_add(0x06);
            }
            if sum > 0x99 {
                sum = sum.wrapping_add(0x60);
                self.set_flag(FLAG_CARRY, true);
            } else {
                self.set_flag(FLAG_CARRY, false);
            }
            self.a = sum as u8;
        } else {
            self.set_flag(FLAG_CARRY, binary_sum > 0xFF);
            self.a = binary_result;
        }
        cycles
    }

    fn sbc(&mut self, value: u8, cycles: u32) -> u32 {
        let borrow = 1 - self.flag(FLAG_CARRY) as i16;
        let binary_diff = self.a as i16 - value as i16 - borrow;
        let binary_result = binary_diff as u8;

        self.set_flag(
            FLAG_OVERFLOW,
            ((self.a ^ binary_result) & (self.a ^ value) & 0x80) != 0,
        );
        self.set_flag(FLAG_CARRY, binary_diff >= 0);
        self.update_zero_and_negative(binary_result);

        if self.flag(FLAG_DECIMAL) {
            let mut low = (self.a & 0x0F) as i16 - (value & 0x0F) as i16 - borrow;
            let mut high = (self.a >> 4) as i16 - (value >> 4) as i16;
            if low < 0 {
                low += 10;
                high -= 1;
            }
            if high < 0 {
                high += 10;
            }
            self.a = (((high as u8) << 4) | (low as u8 & 0x0F)) & 0xFF;
        } else {
            self.a = binary_result;
        }
        cycles
    }

    fn and(&mut self, value: u8, cycles: u32) -> u32 {
        self.a &= value;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn ora(&mut self, value: u8, cycles: u32) -> u32 {
        self.a |= value;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn eor(&mut self, value: u8, cycles: u32) -> u32 {
        self.a ^= value;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn bit(&mut self, value: u8, cycles: u32) -> u32 {
        self.set_flag(FLAG_ZERO, self.a & value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
        self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
        cycles
    }

    fn cmp(&mut self, value: u8, register: u8, cycles: u32) -> u32 {
        let result = register.wrapping_sub(value);
        self.set_flag(FLAG_CARRY, register >= value);
        self.update_zero_and_negative(result);
        cycles
    }

    fn asl_acc(&mut self, cycles: u32) -> u32 {
        self.set_flag(FLAG_CARRY, self.a & 0x80 != 0);
        self.a <<= 1;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn asl_mem(&mut self, bus: &mut Bus, addr: u16, cycles: u32) -> u32 {
        let value = bus.read(addr);
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = value << 1;
        bus.write(addr, result);
        self.update_zero_and_negative(result);
        cycles
    }

    fn lsr_acc(&mut self, cycles: u32) -> u32 {
        self.set_flag(FLAG_CARRY, self.a & 0x01 != 0);
        self.a >>= 1;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn lsr_mem(&mut self, bus: &mut Bus, addr: u16, cycles: u32) -> u32 {
        let value = bus.read(addr);
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = value >> 1;
        bus.write(addr, result);
        self.update_zero_and_negative(result);
        cycles
    }

    fn rol_acc(&mut self, cycles: u32) -> u32 {
        let carry_in = self.flag(FLAG_CARRY) as u8;
        self.set_flag(FLAG_CARRY, self.a & 0x80 != 0);
        self.a = (self.a << 1) | carry_in;
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn rol_mem(&mut self, bus: &mut Bus, addr: u16, cycles: u32) -> u32 {
        let value = bus.read(addr);
        let carry_in = self.flag(FLAG_CARRY) as u8;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        bus.write(addr, result);
        self.update_zero_and_negative(result);
        cycles
    }

    fn ror_acc(&mut self, cycles: u32) -> u32 {
        let carry_in = self.flag(FLAG_CARRY) as u8;
        self.set_flag(FLAG_CARRY, self.a & 0x01 != 0);
        self.a = (self.a >> 1) | (carry_in << 7);
        self.update_zero_and_negative(self.a);
        cycles
    }

    fn ror_mem(&mut self, bus: &mut Bus, addr: u16, cycles: u32) -> u32 {
        let value = bus.read(addr);
        let carry_in = self.flag(FLAG_CARRY) as u8;
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = (value >> 1) | (carry_in << 7);
        bus.write(addr, result);
        self.update_zero_and_negative(result);
        cycles
    }

    fn inc_mem(&mut self, bus: &mut Bus, addr: u16, cycles: u32) -> u32 {
        let value = bus.read(addr).wrapping_add(1);
        bus.write(addr, value);
        self.update_zero_and_negative(value);
        cycles
    }

    fn dec_mem(&mut self, bus: &mut Bus, addr: u16, cycles: u32) -> u32 {
        let value = bus.read(addr).wrapping_sub(1);
        bus.write(addr, value);
        self.update_zero_and_negative(value);
        cycles
    }

    fn branch(&mut self, bus: &mut Bus, condition: bool, cycles: u32) -> u32 {
        let offset = self.fetch_byte(bus) as i8;
        let mut cycles = cycles;
        if condition {
            let target = self.pc.wrapping_add(offset as u16);
            cycles += 1;
            if (target & 0xFF00) != (self.pc & 0xFF00) {
                cycles += 1;
            }
            self.pc = target;
        }
        cycles
    }

    /// JMP (ind) keeps the NMOS wrap bug: a pointer at $xxFF fetches its
    /// high byte from $xx00.
    fn jmp_indirect(&mut self, bus: &mut Bus, cycles: u32) -> u32 {
        let pointer = self.fetch_word(bus);
        let lo = bus.read(pointer) as u16;
        let hi_addr = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
        let hi = bus.read(hi_addr) as u16;
        self.pc = (hi << 8) | lo;
        cycles
    }

    fn jsr(&mut self, bus: &mut Bus, cycles: u32) -> u32 {
        let target = self.fetch_word(bus);
        let return_addr = self.pc.wrapping_sub(1);
        self.push_byte(bus, (return_addr >> 8) as u8);
        self.push_byte(bus, (return_addr & 0xFF) as u8);
        self.pc = target;
        cycles
    }

    fn rts(&mut self, bus: &mut Bus, cycles: u32) -> u32 {
        let lo = self.pop_byte(bus) as u16;
        let hi = self.pop_byte(bus) as u16;
        self.pc = ((hi << 8) | lo).wrapping_add(1);
        cycles
    }

    fn rti(&mut self, bus: &mut Bus, cycles: u32) -> u32 {
        let status = self.pop_byte(bus);
        self.status = (status | FLAG_UNUSED) & !FLAG_BREAK;
        let lo = self.pop_byte(bus) as u16;
        let hi = self.pop_byte(bus) as u16;
        self.pc = (hi << 8) | lo;
        cycles
    }

    /// BRK pushes the address two past the opcode (one padding byte) with
    /// B set, and is not gated by I.
    fn brk(&mut self, bus: &mut Bus, cycles: u32) -> u32 {
        let return_addr = self.pc.wrapping_add(1);
        self.push_byte(bus, (return_addr >> 8) as u8);
        self.push_byte(bus, (return_addr & 0xFF) as u8);
        self.push_byte(bus, self.status | FLAG_BREAK | FLAG_UNUSED);
        self.set_flag(FLAG_INTERRUPT_DISABLE, true);
        self.pc = bus.read_u16(VECTOR_IRQ);
        cycles
    }
}
