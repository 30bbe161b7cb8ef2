//! Voice processing module
//!
//! Handles microphone capture, speech endpointing, and playback.
//! STT and TTS requests go through the provider clients in
//! [`stt`](crate::stt) and [`tts`](crate::tts).

mod capture;
mod playback;
mod segmenter;

pub use capture::{AudioCapture, SAMPLE_RATE, StreamResampler, samples_to_wav};
pub use playback::AudioPlayback;
pub use segmenter::{DetectorState, UtteranceDetector};
