//! Metronome click synthesis
//!
//! Short sine bursts on the audio output device: a higher, louder click for
//! accents and a lower, softer one for plain hits. Bursts may overlap; the
//! tick interval (>= ~273 ms at the tempo ceiling) always exceeds the burst
//! length, so no voice-stealing is needed.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample, Stream, StreamConfig};
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};
use tracing::{error, info, trace};

/// Accent click frequency
pub const ACCENT_FREQ_HZ: f32 = 880.0;
/// Plain hit click frequency
pub const PLAIN_FREQ_HZ: f32 = 660.0;
/// Accent click gain
pub const ACCENT_GAIN: f32 = 0.12;
/// Plain hit click gain
pub const PLAIN_GAIN: f32 = 0.07;
/// Burst length in seconds
pub const CLICK_SECS: f32 = 0.03;

/// Destination for metronome clicks.
///
/// Implementations must not block the caller; the tick loop fires and
/// forgets.
pub trait ClickSink: Send + Sync {
    /// Queue one click; `accented` selects the strong frequency/gain pair
    fn click(&self, accented: bool);
}

/// One sounding click
struct Voice {
    freq_hz: f32,
    gain: f32,
    phase: f32,
    remaining: usize,
}

/// Click sink on the default cpal output device.
///
/// The stream starts at construction and stays alive for the sink's whole
/// lifetime; repeated metronome start/stop cycles reuse it, and it is
/// released exactly once when the sink is dropped.
pub struct CpalClickSink {
    /// Sounding voices, shared with the audio callback
    /// (std::sync::Mutex for cpal callback compatibility)
    voices: Arc<Mutex<Vec<Voice>>>,
    sample_rate: u32,
    /// Audio output stream (kept alive for playback, never accessed after
    /// creation). Stream is not Send, so we hold it and never move it.
    _stream: Stream,
}

// SAFETY: CpalClickSink can be safely shared between threads because:
// - voices and sample_rate are Send + Sync
// - _stream is never accessed after creation, it is only kept alive
// - The cpal callback thread has its own reference to the voice list
unsafe impl Send for CpalClickSink {}
unsafe impl Sync for CpalClickSink {}

impl CpalClickSink {
    /// Open the default output device and start a silent stream.
    ///
    /// # Errors
    /// - No default output device
    /// - Device configuration or stream construction failure
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            Error::AudioOutput("No default output device found".to_string())
        })?;

        info!(
            device_name = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            "Opening audio device for click output"
        );

        let supported = device.default_output_config().map_err(|e| {
            Error::AudioOutput(format!("Failed to get default config: {}", e))
        })?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        let voices: Arc<Mutex<Vec<Voice>>> = Arc::new(Mutex::new(Vec::new()));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, Arc::clone(&voices), channels)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, Arc::clone(&voices), channels)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, Arc::clone(&voices), channels)?
            }
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        Ok(Self {
            voices,
            sample_rate,
            _stream: stream,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        voices: Arc<Mutex<Vec<Voice>>>,
        channels: usize,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Never block the audio thread; a contended lock is one
                    // buffer of silence
                    let mut voices = match voices.try_lock() {
                        Ok(guard) => guard,
                        Err(_) => {
                            for sample in data.iter_mut() {
                                *sample = T::from_sample(0.0f32);
                            }
                            return;
                        }
                    };

                    for frame in data.chunks_mut(channels) {
                        let mut mixed = 0.0f32;
                        for voice in voices.iter_mut() {
                            if voice.remaining == 0 {
                                continue;
                            }
                            mixed += (voice.phase * TAU).sin() * voice.gain;
                            voice.phase += voice.freq_hz / sample_rate;
                            if voice.phase >= 1.0 {
                                voice.phase -= 1.0;
                            }
                            voice.remaining -= 1;
                        }
                        let value = T::from_sample(mixed.clamp(-1.0, 1.0));
                        for channel in frame.iter_mut() {
                            *channel = value;
                        }
                    }

                    voices.retain(|v| v.remaining > 0);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Output sample rate of the opened device
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl ClickSink for CpalClickSink {
    fn click(&self, accented: bool) {
        let (freq_hz, gain) = if accented {
            (ACCENT_FREQ_HZ, ACCENT_GAIN)
        } else {
            (PLAIN_FREQ_HZ, PLAIN_GAIN)
        };
        let burst = (CLICK_SECS * self.sample_rate as f32) as usize;

        trace!(accented, "Click queued");
        self.voices.lock().unwrap().push(Voice {
            freq_hz,
            gain,
            phase: 0.0,
            remaining: burst,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_constants_match_reference() {
        // Frequency/gain pairs from the reference renderer
        assert_eq!(ACCENT_FREQ_HZ, 880.0);
        assert_eq!(PLAIN_FREQ_HZ, 660.0);
        assert!(ACCENT_GAIN > PLAIN_GAIN);
    }

    #[test]
    fn test_burst_shorter_than_fastest_tick() {
        // At the 220 BPM ceiling a tick is ~273 ms; bursts must not pile up
        assert!(CLICK_SECS < 0.273);
    }

    // Actual device output requires audio hardware; covered by running the
    // preview command manually.
}
