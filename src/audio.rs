// src/audio.rs

//! Audio adapter: waveform files to sample matrices and back.
//!
//! The solvers only see channels × frames matrices; this module is the one
//! place that knows about a codec.

use crate::error::{BssError, Result};
use ndarray::Array2;
use std::path::Path;

/// Full-scale value of a peak-normalized 16-bit sample.
pub const PCM16_PEAK: f64 = 32767.0;

/// Decoded audio.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Sample data (n_channels × n_frames).
    pub samples: Array2<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioClip {
    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of frames per channel.
    pub fn num_frames(&self) -> usize {
        self.samples.ncols()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }
}

/// Loads mixtures and stores estimates.
pub trait AudioAdapter {
    /// Load a file into a channels × frames matrix.
    fn load(&self, path: &Path) -> Result<AudioClip>;

    /// Store a channels × frames matrix.
    fn save(&self, path: &Path, samples: &Array2<f64>, sample_rate: u32) -> Result<()>;
}

/// WAV adapter backed by `hound`.
///
/// Integer PCM is scaled by `2^(bits-1)` into [-1, 1); float samples are
/// read as-is. Files are written as peak-normalized 16-bit PCM.
#[derive(Debug, Clone, Default)]
pub struct WavAdapter {
    /// Only read the first `max_frames` frames.
    pub max_frames: Option<usize>,
}

impl WavAdapter {
    /// Adapter reading at most `max_frames` frames per file.
    pub fn with_max_frames(max_frames: usize) -> Self {
        Self {
            max_frames: Some(max_frames),
        }
    }
}

impl AudioAdapter for WavAdapter {
    fn load(&self, path: &Path) -> Result<AudioClip> {
        let path_str = path.display().to_string();
        let reader = hound::WavReader::open(path).map_err(|e| BssError::Audio {
            message: format!("{}: {}", path_str, e),
        })?;

        let spec = reader.spec();
        let num_channels = spec.channels as usize;
        if num_channels == 0 {
            return Err(BssError::Audio {
                message: format!("{}: no channels", path_str),
            });
        }

        let total_frames = reader.duration() as usize;
        let frames = self.max_frames.map_or(total_frames, |m| m.min(total_frames));
        let wanted = frames * num_channels;

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .take(wanted)
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .into_samples::<i32>()
                    .take(wanted)
                    .map(|s| s.map(|v| v as f64 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        // Deinterleave channels
        let frames = interleaved.len() / num_channels;
        let samples = Array2::from_shape_fn((num_channels, frames), |(c, i)| {
            interleaved[i * num_channels + c]
        });

        log::debug!(
            "loaded {}: {} channels, {} frames at {} Hz",
            path_str,
            num_channels,
            frames,
            spec.sample_rate
        );

        Ok(AudioClip {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    fn save(&self, path: &Path, samples: &Array2<f64>, sample_rate: u32) -> Result<()> {
        let (channels, frames) = samples.dim();
        if channels == 0 || channels > u16::MAX as usize {
            return Err(BssError::InvalidDimensions {
                message: format!("cannot write {} channels", channels),
            });
        }

        let spec = hound::WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let pcm = to_pcm16(samples)?;
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in pcm {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        log::debug!(
            "wrote {}: {} channels, {} frames at {} Hz",
            path.display(),
            channels,
            frames,
            sample_rate
        );

        Ok(())
    }
}

/// Peak-normalize a channels × frames matrix to interleaved 16-bit PCM.
///
/// The sample of largest magnitude maps to ±32767; an all-zero matrix maps
/// to zeros.
pub fn to_pcm16(samples: &Array2<f64>) -> Result<Vec<i16>> {
    if samples.iter().any(|v| !v.is_finite()) {
        return Err(BssError::Audio {
            message: "cannot encode non-finite samples".into(),
        });
    }

    let peak = samples.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let gain = if peak > 0.0 { PCM16_PEAK / peak } else { 0.0 };

    let (channels, frames) = samples.dim();
    let mut out = Vec::with_capacity(channels * frames);
    for i in 0..frames {
        for c in 0..channels {
            out.push((samples[[c, i]] * gain).round().clamp(-PCM16_PEAK, PCM16_PEAK) as i16);
        }
    }
    Ok(out)
}

/// Load a WAV file as `(samples, sample_rate)`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(Array2<f64>, u32)> {
    let clip = WavAdapter::default().load(path.as_ref())?;
    Ok((clip.samples, clip.sample_rate))
}

/// Save a channels × frames matrix as peak-normalized 16-bit PCM WAV.
pub fn save<P: AsRef<Path>>(path: P, samples: &Array2<f64>, sample_rate: u32) -> Result<()> {
    WavAdapter::default().save(path.as_ref(), samples, sample_rate)
}
