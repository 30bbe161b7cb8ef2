//! Speech endpointing
//!
//! Segments the microphone stream into utterances using RMS energy:
//! speech starts when energy rises above a threshold and ends after
//! trailing silence, or at a hard duration cap so capture always
//! terminates.

use super::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech for a valid utterance (samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration marking the end of an utterance (samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the utterance detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech
    Idle,
    /// Detected speech, accumulating the utterance
    Listening,
}

/// Segments audio into utterances by energy
pub struct UtteranceDetector {
    state: DetectorState,
    speech_buffer: Vec<f32>,
    speech_samples: usize,
    silence_counter: usize,
    max_samples: usize,
}

impl UtteranceDetector {
    /// Create a new detector with a hard utterance cap in seconds
    #[must_use]
    pub fn new(max_utterance_secs: u64) -> Self {
        let max_samples = usize::try_from(max_utterance_secs)
            .unwrap_or(usize::MAX / SAMPLE_RATE as usize)
            .saturating_mul(SAMPLE_RATE as usize);

        Self {
            state: DetectorState::Idle,
            speech_buffer: Vec::new(),
            speech_samples: 0,
            silence_counter: 0,
            max_samples,
        }
    }

    /// Process audio samples
    ///
    /// Returns true when a complete utterance is available in the
    /// speech buffer.
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            DetectorState::Idle => {
                if is_speech {
                    self.state = DetectorState::Listening;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.speech_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected, listening");
                }
                false
            }
            DetectorState::Listening => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.speech_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech_buffer.len(),
                    speech = self.speech_samples,
                    silence = self.silence_counter,
                    is_speech,
                    energy,
                    "listening state"
                );

                // Enough speech followed by silence completes the utterance
                if self.silence_counter > SILENCE_SAMPLES
                    && self.speech_samples > MIN_SPEECH_SAMPLES
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    return true;
                }

                // Hard cap: never record past the configured window
                if self.speech_buffer.len() >= self.max_samples {
                    tracing::debug!(
                        samples = self.speech_buffer.len(),
                        "utterance cap reached"
                    );
                    return true;
                }

                // Timeout: too much silence without enough speech
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    tracing::trace!("timeout - resetting");
                    self.reset();
                }

                false
            }
        }
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the speech buffer, resetting the detector
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let samples = std::mem::take(&mut self.speech_buffer);
        self.reset();
        samples
    }

    /// Check if currently accumulating speech
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == DetectorState::Listening
    }

    /// Reset detector to idle state
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.speech_buffer.clear();
        self.speech_samples = 0;
        self.silence_counter = 0;
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);
    }

    #[test]
    fn test_cap_terminates_capture() {
        let mut detector = UtteranceDetector::new(1);

        // Continuous loud speech never goes silent; the cap must fire
        let chunk = vec![0.4f32; SAMPLE_RATE as usize / 2];
        assert!(!detector.process(&chunk));
        assert!(detector.process(&chunk));
    }
}
