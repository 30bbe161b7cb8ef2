//! Audio capture from the microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

/// Sample rate the STT providers expect (16kHz mono speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Captures audio from the default input device
///
/// The device is opened at 16kHz when supported, otherwise at the
/// device's default rate with resampling applied in [`take_buffer`].
pub struct AudioCapture {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    resampler: Option<StreamResampler>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available or no usable
    /// mono configuration exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            });

        let (config, device_rate) = if let Some(c) = supported {
            (c.with_sample_rate(SampleRate(SAMPLE_RATE)).config(), SAMPLE_RATE)
        } else {
            // Device can't do 16kHz mono; capture at its default rate
            // and resample when the buffer is drained
            let default = device
                .default_input_config()
                .map_err(|e| Error::Audio(e.to_string()))?;
            let rate = default.sample_rate().0;
            (default.config(), rate)
        };

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            device_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        let resampler = if device_rate == SAMPLE_RATE {
            None
        } else {
            Some(StreamResampler::new(device_rate, SAMPLE_RATE)?)
        };

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            resampler,
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        if channels == 1 {
                            buf.extend_from_slice(data);
                        } else {
                            // Downmix interleaved frames to mono
                            #[allow(clippy::cast_precision_loss)]
                            buf.extend(data.chunks(channels).map(|frame| {
                                frame.iter().sum::<f32>() / frame.len() as f32
                            }));
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Drain the capture buffer, resampled to 16kHz if needed
    ///
    /// # Errors
    ///
    /// Returns error if resampling fails
    pub fn take_buffer(&mut self) -> Result<Vec<f32>> {
        let raw = self
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        match &mut self.resampler {
            None => Ok(raw),
            Some(resampler) => resampler.push(&raw),
        }
    }

    /// Get the capture buffer without clearing, at the device rate
    #[must_use]
    pub fn peek_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Clear the capture buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Sample rate of frames returned by [`take_buffer`]
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Streaming resampler wrapping rubato's fixed-input FFT resampler
///
/// The FFT resampler only consumes whole 1024-frame chunks, but the
/// capture buffer is drained on a short poll interval and rarely lands
/// on a chunk boundary. Input that does not fill a chunk is held in
/// `pending` until the next push, and the inner resampler persists
/// across pushes so its filter state carries over.
pub struct StreamResampler {
    inner: FftFixedIn<f64>,
    pending: Vec<f64>,
}

impl StreamResampler {
    const CHUNK_SIZE: usize = 1024;

    /// Create a resampler from `from_rate` to `to_rate` Hz, mono
    ///
    /// # Errors
    ///
    /// Returns error if rubato rejects the rate pair
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self> {
        let inner = FftFixedIn::<f64>::new(
            from_rate as usize,
            to_rate as usize,
            Self::CHUNK_SIZE,
            2,
            1,
        )
        .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }

    /// Feed captured samples and return whatever full chunks produce
    ///
    /// Leftover input stays buffered for the next call, so no samples
    /// are dropped between polls.
    ///
    /// # Errors
    ///
    /// Returns error if resampling fails
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        self.pending.extend(samples.iter().map(|&s| f64::from(s)));

        let mut output = Vec::new();
        while self.pending.len() >= Self::CHUNK_SIZE {
            let chunk: Vec<f64> = self.pending.drain(..Self::CHUNK_SIZE).collect();
            let result = self
                .inner
                .process(&[chunk], None)
                .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
            output.extend(result[0].iter().map(|&s| s as f32));
        }

        Ok(output)
    }

    /// Samples held back waiting for a full chunk
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Convert f32 samples to WAV bytes for the STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_at(rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / rate as f32;
                (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn resampler_halves_sample_count() {
        let input = sine_at(32000, 4096);
        let mut resampler = StreamResampler::new(32000, 16000).unwrap();
        let output = resampler.push(&input).unwrap();
        assert_eq!(output.len(), input.len() / 2);
        assert_eq!(resampler.pending_len(), 0);
    }

    #[test]
    fn small_pushes_accumulate_without_losing_samples() {
        // A 100ms poll at 48kHz yields ~4800 frames, but nothing
        // forces pushes to land on the 1024-frame chunk boundary.
        let mut resampler = StreamResampler::new(48000, 16000).unwrap();
        let input = sine_at(48000, 480);

        let mut produced = 0usize;
        let mut consumed = 0usize;
        for _ in 0..10 {
            produced += resampler.push(&input).unwrap().len();
            consumed += input.len();
        }

        // 4800 input frames at 3:1 is 1600 output frames, minus the
        // partial chunk still pending and rounding per chunk
        assert!(produced > 0);
        let expected = (consumed - resampler.pending_len()) / 3;
        assert!(produced.abs_diff(expected) <= 8);
        assert!(resampler.pending_len() < 1024);
    }

    #[test]
    fn wav_header_is_valid() {
        let samples = vec![0.0f32; 160];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }
}
