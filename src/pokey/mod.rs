// POKEY — audio, keyboard, paddles, and the machine's IRQ sources.
//
// Audio is generated at a fixed host sample rate in frame-aligned bursts:
// the machine calls `fill_scanline` once per scanline and the chip tops the
// buffer up to the proportional sample count, so every frame produces
// exactly `SAMPLE_RATE / frame_rate` samples.

#[cfg(test)]
mod tests;

use crate::bus::types::TransientSamples;

// Write register offsets (from $D200).
pub const AUDF1: u8 = 0x00;
pub const AUDC1: u8 = 0x01;
pub const AUDF2: u8 = 0x02;
pub const AUDC2: u8 = 0x03;
pub const AUDF3: u8 = 0x04;
pub const AUDC3: u8 = 0x05;
pub const AUDF4: u8 = 0x06;
pub const AUDC4: u8 = 0x07;
pub const AUDCTL: u8 = 0x08;
pub const STIMER: u8 = 0x09;
pub const SKREST: u8 = 0x0A;
pub const POTGO: u8 = 0x0B;
pub const SEROUT: u8 = 0x0D;
pub const IRQEN: u8 = 0x0E;
pub const SKCTL: u8 = 0x0F;

// Read register offsets.
pub const ALLPOT: u8 = 0x08;
pub const KBCODE: u8 = 0x09;
pub const RANDOM: u8 = 0x0A;
pub const SERIN: u8 = 0x0D;
pub const IRQST: u8 = 0x0E;
pub const SKSTAT: u8 = 0x0F;

// AUDCTL bits.
pub const AUDCTL_POLY9: u8 = 0x80;
pub const AUDCTL_CH1_179: u8 = 0x40;
pub const AUDCTL_CH3_179: u8 = 0x20;
pub const AUDCTL_CH1_CH2: u8 = 0x10;
pub const AUDCTL_CH3_CH4: u8 = 0x08;
pub const AUDCTL_CH1_HPF: u8 = 0x04;
pub const AUDCTL_CH2_HPF: u8 = 0x02;
pub const AUDCTL_15KHZ: u8 = 0x01;

// IRQEN/IRQST bits (IRQST is active-low).
pub const IRQ_TIMER1: u8 = 0x01;
pub const IRQ_TIMER2: u8 = 0x02;
pub const IRQ_TIMER4: u8 = 0x04;
pub const IRQ_SERIAL_OUT: u8 = 0x08;
pub const IRQ_SERIAL_IN: u8 = 0x10;
pub const IRQ_KEYPRESS: u8 = 0x40;
pub const IRQ_BREAK: u8 = 0x80;

// SKSTAT bits (active-low).
pub const SKSTAT_KEYDOWN: u8 = 0x04;

/// Host PCM rate, mono i16.
pub const SAMPLE_RATE: u32 = 44_100;

// Base-clock divisors relative to the 1.79 MHz machine clock.
const DIV_64KHZ: u32 = 28;
const DIV_15KHZ: u32 = 114;

const VOLUME_STEP: i32 = 2048;

#[derive(Clone, Copy, Debug, bincode::Encode, bincode::Decode)]
pub(crate) struct PokeyChannel {
    pub(crate) audf: u8,
    pub(crate) audc: u8,
    pub(crate) period: u32,
    pub(crate) divider: u32,
    pub(crate) output: bool,
    pub(crate) last_output: i16,
}

impl PokeyChannel {
    fn new() -> Self {
        Self {
            audf: 0,
            audc: 0,
            period: 1,
            divider: 0,
            output: false,
            last_output: 0,
        }
    }

    fn volume(&self) -> i32 {
        (self.audc & 0x0F) as i32
    }

    fn distortion(&self) -> u8 {
        (self.audc >> 5) & 0x07
    }

    fn volume_only(&self) -> bool {
        self.audc & 0x10 != 0
    }
}

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Pokey {
    channels: [PokeyChannel; 4],

    audctl: u8,
    poly9_mode: bool,
    ch1_179: bool,
    ch3_179: bool,
    ch12_joined: bool,
    ch34_joined: bool,
    ch1_highpass: bool,
    ch2_highpass: bool,
    clock_15khz: bool,

    pub(crate) poly4: u32,
    pub(crate) poly5: u32,
    pub(crate) poly9: u32,
    pub(crate) poly17: u32,

    irqen: u8,
    irqst: u8,

    kbcode: u8,
    skctl: u8,
    skstat: u8,

    pot: [u8; 8],
    allpot: u8,
    serout: u8,
    serin: u8,
    random: u8,

    samples_per_frame: u16,
    produced: u16,
    samples: TransientSamples,
}

impl Pokey {
    pub fn new(frame_rate: u32) -> Self {
        let mut pokey = Self {
            channels: [PokeyChannel::new(); 4],
            audctl: 0,
            poly9_mode: false,
            ch1_179: false,
            ch3_179: false,
            ch12_joined: false,
            ch34_joined: false,
            ch1_highpass: false,
            ch2_highpass: false,
            clock_15khz: false,
            poly4: 0x0F,
            poly5: 0x1F,
            poly9: 0x1FF,
            poly17: 0x1FFFF,
            irqen: 0,
            irqst: 0xFF,
            kbcode: 0xFF,
            skctl: 0,
            skstat: 0xFF,
            pot: [228; 8],
            allpot: 0,
            serout: 0,
            serin: 0,
            random: 0xFF,
            samples_per_frame: (SAMPLE_RATE / frame_rate) as u16,
            produced: 0,
            samples: TransientSamples::default(),
        };
        pokey.update_periods();
        pokey
    }

    pub fn reset(&mut self) {
        let spf = self.samples_per_frame;
        *self = Self::new(1);
        self.samples_per_frame = spf;
    }

    pub fn read(&mut self, addr: u8) -> u8 {
        match addr & 0x0F {
            0x00..=0x07 => self.pot[(addr & 0x07) as usize],
            ALLPOT => self.allpot,
            KBCODE => self.kbcode,
            RANDOM => {
                self.step_polys();
                self.random
            }
            SERIN => self.serin,
            IRQST => self.irqst,
            SKSTAT => self.skstat,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u8, value: u8) {
        match addr & 0x0F {
            AUDF1 | AUDF2 | AUDF3 | AUDF4 => {
                self.channels[((addr & 0x0F) >> 1) as usize].audf = value;
                self.update_periods();
            }
            AUDC1 | AUDC2 | AUDC3 | AUDC4 => {
                self.channels[((addr & 0x0F) >> 1) as usize].audc = value;
            }
            AUDCTL => {
                self.audctl = value;
                self.poly9_mode = value & AUDCTL_POLY9 != 0;
                self.ch1_179 = value & AUDCTL_CH1_179 != 0;
                self.ch3_179 = value & AUDCTL_CH3_179 != 0;
                self.ch12_joined = value & AUDCTL_CH1_CH2 != 0;
                self.ch34_joined = value & AUDCTL_CH3_CH4 != 0;
                self.ch1_highpass = value & AUDCTL_CH1_HPF != 0;
                self.ch2_highpass = value & AUDCTL_CH2_HPF != 0;
                self.clock_15khz = value & AUDCTL_15KHZ != 0;
                self.update_periods();
            }
            STIMER => {
                for channel in &mut self.channels {
                    channel.divider = channel.period;
                }
            }
            SKREST => self.skstat = 0xFF,
            POTGO => self.start_pot_scan(),
            SEROUT => {
                self.serout = value;
                if self.irqen & IRQ_SERIAL_OUT != 0 {
                    self.irqst &= !IRQ_SERIAL_OUT;
                }
            }
            IRQEN => {
                self.irqen = value;
                // Sources whose enable bit went away are acknowledged.
                self.irqst |= !value;
            }
            SKCTL => {
                self.skctl = value;
                if value == 0 {
                    self.reset();
                }
            }
            _ => {}
        }
    }

    /// Level-triggered IRQ line: asserted while any enabled source is low.
    pub fn check_irq(&self) -> bool {
        (self.irqst & self.irqen) != self.irqen
    }

    pub fn acknowledge_irq(&mut self, mask: u8) {
        self.irqst |= mask;
    }

    pub fn irq_status(&self) -> u8 {
        self.irqst
    }

    // Keyboard interface. Codes carry SHIFT in bit 6 and CONTROL in bit 7.

    pub fn set_key(&mut self, code: u8, pressed: bool) {
        if pressed {
            self.kbcode = code;
            self.skstat &= !SKSTAT_KEYDOWN;
            if self.irqen & IRQ_KEYPRESS != 0 {
                self.irqst &= !IRQ_KEYPRESS;
            }
        } else {
            self.skstat |= SKSTAT_KEYDOWN;
        }
    }

    pub fn set_break_key(&mut self, pressed: bool) {
        if pressed && self.irqen & IRQ_BREAK != 0 {
            self.irqst &= !IRQ_BREAK;
        }
    }

    pub fn set_paddle(&mut self, index: usize, value: u8) {
        if index < 8 {
            self.pot[index] = value;
        }
    }

    fn start_pot_scan(&mut self) {
        // A real scan counts up over a frame; the stored values are served
        // immediately and ALLPOT reports the scan complete.
        self.allpot = 0x00;
    }

    // Maximal-length LFSRs. Taps (high bit, mid bit) give the classic
    // x^4+x^3+1, x^5+x^3+1, x^9+x^4+1 and x^17+x^12+1 sequences.
    pub(crate) fn step_polys(&mut self) {
        let bit4 = ((self.poly4 >> 3) ^ (self.poly4 >> 2)) & 1;
        self.poly4 = ((self.poly4 << 1) | bit4) & 0x0F;

        let bit5 = ((self.poly5 >> 4) ^ (self.poly5 >> 2)) & 1;
        self.poly5 = ((self.poly5 << 1) | bit5) & 0x1F;

        let bit9 = ((self.poly9 >> 8) ^ (self.poly9 >> 3)) & 1;
        self.poly9 = ((self.poly9 << 1) | bit9) & 0x1FF;

        let bit17 = ((self.poly17 >> 16) ^ (self.poly17 >> 11)) & 1;
        self.poly17 = ((self.poly17 << 1) | bit17) & 0x1FFFF;

        let long = if self.poly9_mode {
            self.poly9
        } else {
            self.poly17
        };
        self.random = (long ^ (long >> 1)) as u8;
    }

    fn update_periods(&mut self) {
        let base = if self.clock_15khz {
            DIV_15KHZ
        } else {
            DIV_64KHZ
        };

        if self.ch12_joined {
            let freq16 = ((self.channels[1].audf as u32) << 8) | self.channels[0].audf as u32;
            self.channels[0].period = if self.ch1_179 {
                freq16 + 1
            } else {
                (freq16 + 1) * base
            };
            self.channels[1].period = 0; // absorbed into the pair
        } else {
            self.channels[0].period = if self.ch1_179 {
                self.channels[0].audf as u32 + 4
            } else {
                (self.channels[0].audf as u32 + 1) * base
            };
            self.channels[1].period = (self.channels[1].audf as u32 + 1) * base;
        }

        if self.ch34_joined {
            let freq16 = ((self.channels[3].audf as u32) << 8) | self.channels[2].audf as u32;
            self.channels[2].period = if self.ch3_179 {
                freq16 + 1
            } else {
                (freq16 + 1) * base
            };
            self.channels[3].period = 0;
        } else {
            self.channels[2].period = if self.ch3_179 {
                self.channels[2].audf as u32 + 4
            } else {
                (self.channels[2].audf as u32 + 1) * base
            };
            self.channels[3].period = (self.channels[3].audf as u32 + 1) * base;
        }
    }

    fn generate_sample(&mut self) -> i16 {
        self.step_polys();

        let long_poly = if self.poly9_mode {
            self.poly9
        } else {
            self.poly17
        };
        let poly4 = self.poly4 & 1 != 0;
        let poly5 = self.poly5 & 1 != 0;
        let long = long_poly & 1 != 0;

        let mut sum: i32 = 0;
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if channel.period == 0 {
                continue;
            }
            if channel.volume_only() {
                sum += channel.volume() * VOLUME_STEP;
                continue;
            }
            if channel.volume() == 0 {
                continue;
            }

            if channel.divider > 0 {
                channel.divider -= 1;
            } else {
                channel.divider = channel.period;
                channel.output = !channel.output;
            }

            let gated = match channel.distortion() {
                0 => channel.output && poly5 && long,
                1 | 3 => channel.output && poly5,
                2 => channel.output && poly5 && poly4,
                4 => channel.output && long,
                6 => channel.output && poly4,
                _ => channel.output, // 5 and 7: pure tone
            };

            let mut out = if gated {
                (channel.volume() * VOLUME_STEP) as i16
            } else {
                0
            };
            let highpass = (index == 0 && self.ch1_highpass) || (index == 1 && self.ch2_highpass);
            if highpass {
                out = out.wrapping_sub(channel.last_output);
            }
            channel.last_output = out;
            sum += out as i32;
        }

        sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    /// Top the frame buffer up to this scanline's proportional sample count.
    pub fn fill_scanline(&mut self, scanline: u16, total_lines: u16) {
        let target = ((scanline as u32 + 1) * self.samples_per_frame as u32
            / total_lines as u32)
            .min(self.samples_per_frame as u32) as u16;
        while self.produced < target {
            let sample = self.generate_sample();
            self.samples.push(sample);
            self.produced += 1;
        }
    }

    /// Drain the completed frame's burst and restart the per-frame count.
    pub fn take_frame_samples(&mut self) -> Vec<i16> {
        self.produced = 0;
        std::mem::take(&mut self.samples.0)
    }

    pub fn samples_per_frame(&self) -> u16 {
        self.samples_per_frame
    }
}
