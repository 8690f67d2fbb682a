//! Audio Data Module
//!
//! WAV reading and writing plus the sample-wise stem mixer. All buffers are
//! f32 in `[-1.0, 1.0]`, mono or interleaved stereo.

pub mod mixer;
pub mod wav;

pub use mixer::mix_stems;
pub use wav::{AudioData, AudioFormat, WavAudio};
