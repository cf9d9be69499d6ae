//! Hue/luma colour tables.
//!
//! GTIA colour bytes are `HHHHLLLL`: 16 hues times 16 luminances. The table
//! converts each code to RGB565 through a YIQ model with a per-system hue
//! phase, so PAL and NTSC produce related but distinct palettes. Hue 0 is
//! the grayscale ramp.

/// Broadcast standard the machine is clocked for.
#[derive(Clone, Copy, PartialEq, Eq, Debug, bincode::Encode, bincode::Decode)]
pub enum VideoSystem {
    Pal,
    Ntsc,
}

impl VideoSystem {
    pub fn scanlines(self) -> u16 {
        match self {
            VideoSystem::Pal => 312,
            VideoSystem::Ntsc => 262,
        }
    }

    pub fn frame_rate(self) -> u32 {
        match self {
            VideoSystem::Pal => 50,
            VideoSystem::Ntsc => 60,
        }
    }

    /// Nominal frame duration used by pacing frontends.
    pub fn frame_duration(self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / self.frame_rate() as u64)
    }

    /// Colour carrier phase shift relative to NTSC, in degrees.
    fn phase_offset(self) -> f32 {
        match self {
            VideoSystem::Pal => -15.0,
            VideoSystem::Ntsc => 0.0,
        }
    }
}

/// Approximate NTSC carrier angles for hues 1-15, in degrees. Hue 0 is
/// grayscale and bypasses the table.
const HUE_ANGLES: [f32; 16] = [
    0.0, 0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0, 270.0, 300.0, 330.0, 350.0,
    360.0, 380.0,
];

const SATURATION: f32 = 0.35;

/// 256-entry colour-code to RGB565 table for one video system.
///
/// Built once per machine; not part of save states (it is derived from the
/// video system, which is).
#[derive(Clone)]
pub struct Palette {
    colors: [u16; 256],
    system: VideoSystem,
}

impl Palette {
    pub fn new(system: VideoSystem) -> Self {
        let mut colors = [0u16; 256];
        for (code, slot) in colors.iter_mut().enumerate() {
            let hue = (code >> 4) & 0x0F;
            let lum = code & 0x0F;
            let y = lum as f32 / 15.0;

            let (r, g, b) = if hue == 0 {
                (y, y, y)
            } else {
                let angle = (HUE_ANGLES[hue] + system.phase_offset()).to_radians();
                let i = SATURATION * angle.cos();
                let q = SATURATION * angle.sin();
                let r = (y + 0.956 * i + 0.621 * q).clamp(0.0, 1.0);
                let g = (y - 0.272 * i - 0.647 * q).clamp(0.0, 1.0);
                let b = (y - 1.105 * i + 1.702 * q).clamp(0.0, 1.0);
                (r, g, b)
            };

            let r5 = (r * 31.0) as u16;
            let g6 = (g * 63.0) as u16;
            let b5 = (b * 31.0) as u16;
            *slot = (r5 << 11) | (g6 << 5) | b5;
        }
        Self { colors, system }
    }

    pub fn system(&self) -> VideoSystem {
        self.system
    }

    #[inline]
    pub fn rgb565(&self, code: u8) -> u16 {
        self.colors[code as usize]
    }

    pub fn colors(&self) -> &[u16; 256] {
        &self.colors
    }
}

// The table is reproducible from the video system alone, so save states
// carry nothing. Decoding yields the PAL table; the machine rebuilds the
// correct one from its decoded configuration afterwards.
impl bincode::Encode for Palette {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        _encoder: &mut E,
    ) -> std::result::Result<(), bincode::error::EncodeError> {
        Ok(())
    }
}

impl<Context> bincode::Decode<Context> for Palette {
    fn decode<D: bincode::de::Decoder>(
        _decoder: &mut D,
    ) -> std::result::Result<Self, bincode::error::DecodeError> {
        Ok(Palette::new(VideoSystem::Pal))
    }
}

impl<'de, Context> bincode::BorrowDecode<'de, Context> for Palette {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de>>(
        _decoder: &mut D,
    ) -> std::result::Result<Self, bincode::error::DecodeError> {
        Ok(Palette::new(VideoSystem::Pal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_ramp_is_strictly_increasing() {
        let palette = Palette::new(VideoSystem::Pal);
        for lum in 1..16u8 {
            assert!(
                palette.rgb565(lum) > palette.rgb565(lum - 1),
                "luma {lum} not brighter than {}",
                lum - 1
            );
        }
    }

    #[test]
    fn systems_produce_distinct_chroma() {
        let pal = Palette::new(VideoSystem::Pal);
        let ntsc = Palette::new(VideoSystem::Ntsc);
        // Grayscale is shared; coloured entries must differ somewhere.
        assert!(
            (0x10..=0xFF).any(|c| pal.rgb565(c) != ntsc.rgb565(c)),
            "PAL and NTSC tables are identical"
        );
        assert_eq!(pal.rgb565(0x08), ntsc.rgb565(0x08));
    }

    #[test]
    fn table_is_deterministic() {
        let a = Palette::new(VideoSystem::Ntsc);
        let b = Palette::new(VideoSystem::Ntsc);
        assert_eq!(a.colors()[..], b.colors()[..]);
    }
}
