// The machine: one CPU, one bus full of chips, and the scanline loop that
// keeps them in lockstep. Everything here is deterministic and headless;
// frame pacing and real sinks belong to the frontend.

mod loader;

#[cfg(test)]
mod tests;

pub use loader::{AtrDisk, INITAD, RUNAD};

use crate::antic::CYCLES_PER_SCANLINE;
use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::error::{AtariError, Result};
use crate::host::{AudioSink, DisplaySink};
use crate::palette::{Palette, VideoSystem};
use std::error::Error;

/// Boot-time inputs: the two ROM blobs and the broadcast standard.
pub struct MachineConfig {
    pub os_rom: Vec<u8>,
    pub basic_rom: Vec<u8>,
    pub video: VideoSystem,
}

#[derive(Clone, bincode::Encode, bincode::Decode)]
pub struct Atari {
    pub cpu: Cpu,
    pub bus: Bus,
    cycles: u64,
    /// Cycles the last instruction ran past its scanline budget; deducted
    /// from the next scanline so the per-line account never exceeds 114.
    cycle_carry: u32,
    last_scanline_cycles: u32,
    palette: Palette,
    atr: Option<AtrDisk>,
    sink_rejects: u64,
}

impl Atari {
    pub fn new(config: MachineConfig) -> Result<Self> {
        let mut bus = Bus::new(config.os_rom, config.basic_rom, config.video)?;
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus);
        Ok(Self {
            cpu,
            bus,
            cycles: 0,
            cycle_carry: 0,
            last_scanline_cycles: 0,
            palette: Palette::new(config.video),
            atr: None,
            sink_rejects: 0,
        })
    }

    /// Warm start: chips and banking re-zeroed, RAM preserved, PC fetched
    /// from the OS reset vector.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.cycles = 0;
        self.cycle_carry = 0;
        self.last_scanline_cycles = 0;
    }

    /// Run one scanline: CPU up to its DMA-reduced budget with interrupt
    /// checks at every instruction boundary, then render, audio, advance.
    /// Returns `true` when this scanline completed a frame.
    pub fn run_scanline(&mut self) -> Result<bool> {
        let dma = self.bus.antic.dma_cycles_for_next_scanline();
        self.bus.antic.reset_dma_cycles();
        let budget = CYCLES_PER_SCANLINE.saturating_sub(dma);

        let mut spent = self.cycle_carry;
        while spent < budget && !self.bus.antic.wsync_halted() {
            if self.bus.antic.take_pending_nmi() {
                self.cpu.request_nmi();
            }
            let consumed = self.cpu.step(&mut self.bus);
            if self.cpu.halted {
                return Err(AtariError::CpuHalt {
                    pc: self.cpu.pc,
                    opcode: self.cpu.last_opcode(),
                });
            }
            spent += consumed;
            self.cycles += consumed as u64;
        }
        self.cycle_carry = spent.saturating_sub(budget);
        self.last_scanline_cycles = spent.min(budget);

        self.bus.antic.release_wsync();
        self.bus.render_scanline();

        let total_lines = self.bus.scanlines_per_frame();
        let scanline = self.bus.antic.scanline();
        self.bus.pokey.fill_scanline(scanline, total_lines);

        Ok(self.bus.antic.advance_scanline(total_lines))
    }

    pub fn run_frame(&mut self) -> Result<()> {
        loop {
            if self.run_scanline()? {
                return Ok(());
            }
        }
    }

    /// Hand the finished frame and its audio burst to the sinks. Refused
    /// submissions are dropped and counted; the next frame starts fresh.
    pub fn present<D: DisplaySink, A: AudioSink>(&mut self, display: &mut D, audio: &mut A) {
        if !display.present_bitmap(self.bus.framebuffer(), &self.palette) {
            self.sink_rejects += 1;
        }
        display.present_border(self.bus.gtia.background_color(), &self.palette);
        let samples = self.bus.pokey.take_frame_samples();
        if !samples.is_empty() && !audio.push_samples(&samples) {
            self.sink_rejects += 1;
        }
    }

    pub fn sink_rejects(&self) -> u64 {
        self.sink_rejects
    }

    // Input surface. Out-of-range ports are ignored without state change.

    pub fn set_key(&mut self, code: u8, pressed: bool) {
        self.bus.pokey.set_key(code, pressed);
    }

    pub fn set_break_key(&mut self, pressed: bool) {
        self.bus.pokey.set_break_key(pressed);
    }

    pub fn set_console(&mut self, start: bool, select: bool, option: bool) {
        self.bus.gtia.set_console(start, select, option);
    }

    pub fn set_joystick(
        &mut self,
        port: usize,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        fire: bool,
    ) {
        if port >= 2 {
            return;
        }
        self.bus.pia.set_joystick(port, up, down, left, right);
        self.bus.gtia.set_trigger(port, fire);
    }

    pub fn set_paddle(&mut self, index: usize, value: u8) {
        self.bus.pokey.set_paddle(index, value);
    }

    // Output surface.

    pub fn framebuffer(&self) -> &[u8] {
        self.bus.framebuffer()
    }

    pub fn take_audio_samples(&mut self) -> Vec<i16> {
        self.bus.pokey.take_frame_samples()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn border_color(&self) -> u8 {
        self.bus.gtia.background_color()
    }

    pub fn video_system(&self) -> VideoSystem {
        self.bus.video_system()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles the CPU consumed within the last scanline's budget.
    pub fn last_scanline_cycles(&self) -> u32 {
        self.last_scanline_cycles
    }

    pub fn frame_count(&self) -> u64 {
        self.bus.antic.frame_count()
    }

    // Save states.

    pub fn save_state_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), Box<dyn Error>> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_state_from_file<P: AsRef<std::path::Path>>(
        &mut self,
        path: P,
    ) -> std::result::Result<(), Box<dyn Error>> {
        let bytes = std::fs::read(path)?;
        let (mut state, _): (Atari, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())?;
        // The palette decodes as a placeholder; rebuild it for the decoded
        // machine's video system.
        state.palette = Palette::new(state.bus.video_system());
        *self = state;
        Ok(())
    }

    // Disk image surface.

    pub fn mount_atr(&mut self, image: &[u8]) -> Result<()> {
        self.atr = Some(AtrDisk::parse(image)?);
        Ok(())
    }

    pub fn unmount_atr(&mut self) {
        self.atr = None;
    }

    pub fn atr(&self) -> Option<&AtrDisk> {
        self.atr.as_ref()
    }

    pub fn atr_mut(&mut self) -> Option<&mut AtrDisk> {
        self.atr.as_mut()
    }
}
