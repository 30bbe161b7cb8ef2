//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;

use polyvox::voice::{DetectorState, SAMPLE_RATE, UtteranceDetector, samples_to_wav};

mod common;
use common::{generate_silence, generate_sine_samples};

#[test]
fn test_detector_starts_idle() {
    let detector = UtteranceDetector::new(10);

    assert_eq!(detector.state(), DetectorState::Idle);
    assert!(!detector.is_listening());
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_silence_does_not_trigger() {
    let mut detector = UtteranceDetector::new(10);

    let silence = generate_silence(0.1);
    assert!(!detector.process(&silence));
    assert_eq!(detector.state(), DetectorState::Idle);
}

#[test]
fn test_speech_then_silence_completes_utterance() {
    let mut detector = UtteranceDetector::new(10);

    // Loud samples - should start listening
    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    detector.process(&speech);
    assert_eq!(detector.state(), DetectorState::Listening);

    // More speech followed by silence should complete the utterance
    let more_speech = generate_sine_samples(440.0, 0.3, 0.3);
    detector.process(&more_speech);

    let silence = generate_silence(0.6);
    assert!(detector.process(&silence));
}

#[test]
fn test_speech_buffer_accumulation() {
    let mut detector = UtteranceDetector::new(10);

    let chunk1 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk1);

    let chunk2 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk2);

    // Buffer should contain both chunks
    let buffer = detector.speech_buffer();
    assert_eq!(buffer.len(), chunk1.len() + chunk2.len());
}

#[test]
fn test_take_utterance_resets() {
    let mut detector = UtteranceDetector::new(10);

    let speech = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&speech);

    let taken = detector.take_utterance();
    assert_eq!(taken.len(), speech.len());

    // Detector should be back to idle with an empty buffer
    assert_eq!(detector.state(), DetectorState::Idle);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_brief_noise_times_out() {
    let mut detector = UtteranceDetector::new(10);

    // A blip shorter than the minimum speech duration
    let blip = generate_sine_samples(440.0, 0.05, 0.3);
    detector.process(&blip);
    assert_eq!(detector.state(), DetectorState::Listening);

    // Long silence should reset without completing
    let silence = generate_silence(1.2);
    assert!(!detector.process(&silence));
    assert_eq!(detector.state(), DetectorState::Idle);
}

#[test]
fn test_duration_cap_completes_utterance() {
    let mut detector = UtteranceDetector::new(1);

    // Continuous speech with no silence must still terminate
    let speech = generate_sine_samples(440.0, 0.6, 0.3);
    assert!(!detector.process(&speech));
    assert!(detector.process(&speech));

    let utterance = detector.take_utterance();
    assert!(utterance.len() >= SAMPLE_RATE as usize);
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    // Read WAV back
    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    // Read samples back
    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
}
