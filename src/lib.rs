//! Atari 800 XL emulator core.
//!
//! The crate models the interlocked heart of the machine: a 6502 paced
//! scanline by scanline against ANTIC's DMA stealing, GTIA colours and
//! collisions, POKEY audio and IRQs, PIA joystick/banking, and the XL/XE
//! memory map with write-under-ROM. The [`atari::Atari`] machine drives it
//! all deterministically; display and audio devices plug in through the
//! [`host`] traits.

pub mod antic;
pub mod atari;
pub mod bus;
pub mod cpu;
pub mod error;
pub mod gtia;
pub mod host;
pub mod palette;
pub mod pia;
pub mod pokey;
