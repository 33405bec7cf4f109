mod common;

use common::{init_logging, mixture};
use easi::ndarray::{array, Array2};
use easi::*;
use tempfile::tempdir;

// ============================================================================
// WAV Round Trips
// ============================================================================

#[test]
fn test_save_is_peak_normalized_pcm16() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("sources.wav");

    let (_, _, x) = mixture(2000, 31);
    audio::save(&path, &x, 16000).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let raw: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(raw.len(), 4000);
    assert_eq!(raw.iter().map(|v| v.unsigned_abs()).max(), Some(32767));
}

#[test]
fn test_round_trip_preserves_shape_up_to_peak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("round_trip.wav");

    let (_, _, x) = mixture(1000, 32);
    audio::save(&path, &x, 22050).unwrap();
    let (loaded, rate) = audio::load(&path).unwrap();

    assert_eq!(rate, 22050);
    assert_eq!(loaded.dim(), x.dim());

    let peak = x.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    // Written at 32767 full scale, read back divided by 32768
    let gain = 32767.0 / 32768.0 / peak;
    for (l, v) in loaded.iter().zip(x.iter()) {
        assert!((l - v * gain).abs() <= 1.0 / 32767.0, "{} vs {}", l, v * gain);
    }
}

#[test]
fn test_silence_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("silence.wav");

    audio::save(&path, &Array2::zeros((1, 64)), 8000).unwrap();
    let (loaded, _) = audio::load(&path).unwrap();
    assert_eq!(loaded.dim(), (1, 64));
    assert!(loaded.iter().all(|&v| v == 0.0));
}

#[test]
fn test_load_deinterleaves_and_truncates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stereo.wav");

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..10i16 {
        writer.write_sample(i * 100).unwrap();
        writer.write_sample(-i * 100).unwrap();
    }
    writer.finalize().unwrap();

    let clip = WavAdapter::default().load(&path).unwrap();
    assert_eq!(clip.num_channels(), 2);
    assert_eq!(clip.num_frames(), 10);
    assert!((clip.samples[[0, 3]] - 300.0 / 32768.0).abs() < 1e-12);
    assert!((clip.samples[[1, 3]] + 300.0 / 32768.0).abs() < 1e-12);

    let clip = WavAdapter::with_max_frames(4).load(&path).unwrap();
    assert_eq!(clip.samples.dim(), (2, 4));
    assert!((clip.samples[[1, 2]] + 200.0 / 32768.0).abs() < 1e-12);
}

#[test]
fn test_load_float_wav() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("float.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for v in [0.5f32, -0.25, 0.125] {
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();

    let (loaded, rate) = audio::load(&path).unwrap();
    assert_eq!(rate, 48000);
    assert_eq!(loaded, array![[0.5, -0.25, 0.125]]);
}

#[test]
fn test_save_rejects_empty_channel_set() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    assert!(matches!(
        audio::save(&path, &Array2::zeros((0, 10)), 8000),
        Err(BssError::InvalidDimensions { .. })
    ));
}

// ============================================================================
// Separation Pipeline
// ============================================================================

#[test]
fn test_separate_from_file() {
    init_logging();
    let dir = tempdir().unwrap();
    let mix_path = dir.path().join("mixture.wav");
    let out_path = dir.path().join("estimate.wav");

    let (s, _, x) = mixture(4000, 33);
    audio::save(&mix_path, &x, 16000).unwrap();

    let (loaded, rate) = audio::load(&mix_path).unwrap();
    let result = Bss::fit(&loaded).unwrap();
    audio::save(&out_path, &result.sources, rate).unwrap();

    let (estimate, _) = audio::load(&out_path).unwrap();
    let m = utils::match_sources(&estimate, &s).unwrap();
    assert!(m.min_correlation() > 0.95, "correlations {:?}", m.correlations);
}
