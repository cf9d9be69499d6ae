//! Host-side collaborator traits.
//!
//! The core renders into an indexed bitmap and accumulates PCM samples; real
//! display panels and audio devices live behind these traits and are chosen
//! by the frontend at start-up. Sinks must never block: a sink that cannot
//! accept a submission returns `false` and the frame or audio burst is
//! dropped.

use crate::palette::Palette;

/// Visible output size in pixels.
pub const DISPLAY_WIDTH: usize = 320;
pub const DISPLAY_HEIGHT: usize = 192;

/// Receives one finished frame per vertical blank.
pub trait DisplaySink {
    /// `frame` holds `DISPLAY_WIDTH * DISPLAY_HEIGHT` palette indices, row
    /// major. Use `palette.rgb565()` to map them to the display's native
    /// format. Returns `false` if the frame was refused.
    fn present_bitmap(&mut self, frame: &[u8], palette: &Palette) -> bool;

    /// Border/overscan colour for panels larger than the playfield.
    fn present_border(&mut self, _color_code: u8, _palette: &Palette) {}
}

/// Receives frame-aligned bursts of mono PCM.
pub trait AudioSink {
    /// Returns `false` on overflow; the burst is then discarded.
    fn push_samples(&mut self, samples: &[i16]) -> bool;
}

/// Sink that discards everything, for headless and test runs.
#[derive(Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn present_bitmap(&mut self, _frame: &[u8], _palette: &Palette) -> bool {
        true
    }
}

impl AudioSink for NullSink {
    fn push_samples(&mut self, _samples: &[i16]) -> bool {
        true
    }
}
