//! Wrapper types excluded from save-state serialization.
//!
//! Render and audio buffers are rebuilt every frame; encoding them would
//! bloat state files and tie the format to buffer sizes. The wrappers encode
//! as zero bytes and decode to their defaults, so old states stay loadable.

use crate::host::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Indexed framebuffer that is invisible to bincode.
#[derive(Clone, Debug)]
pub(crate) struct TransientFrame(pub(crate) Vec<u8>);

impl Default for TransientFrame {
    fn default() -> Self {
        Self(vec![0; DISPLAY_WIDTH * DISPLAY_HEIGHT])
    }
}

impl bincode::Encode for TransientFrame {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        _encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        Ok(()) // write nothing
    }
}

impl<Context> bincode::Decode<Context> for TransientFrame {
    fn decode<D: bincode::de::Decoder>(
        _decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self::default())
    }
}

impl<'de, Context> bincode::BorrowDecode<'de, Context> for TransientFrame {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de>>(
        _decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self::default())
    }
}

impl core::ops::Deref for TransientFrame {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl core::ops::DerefMut for TransientFrame {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Queued PCM samples, likewise excluded from save states.
#[derive(Clone, Debug, Default)]
pub(crate) struct TransientSamples(pub(crate) Vec<i16>);

impl bincode::Encode for TransientSamples {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        _encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        Ok(())
    }
}

impl<Context> bincode::Decode<Context> for TransientSamples {
    fn decode<D: bincode::de::Decoder>(
        _decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self::default())
    }
}

impl<'de, Context> bincode::BorrowDecode<'de, Context> for TransientSamples {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de>>(
        _decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self::default())
    }
}

impl core::ops::Deref for TransientSamples {
    type Target = Vec<i16>;
    fn deref(&self) -> &Vec<i16> {
        &self.0
    }
}

impl core::ops::DerefMut for TransientSamples {
    fn deref_mut(&mut self) -> &mut Vec<i16> {
        &mut self.0
    }
}
