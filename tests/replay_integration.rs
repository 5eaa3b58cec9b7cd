// Synthetic voice through the real McLeod estimator, from buffers and WAV files
mod common;

use backchannel::detector::{BackchannelDetector, DetectorConfig, McLeodPitchEstimator};
use backchannel::replay::{read_wav, replay_file, replay_samples};
use common::*;
use std::path::Path;
use std::time::{Duration, Instant};

const AMPLITUDE: f32 = 0.1;

/// 1.5s of tone with a rise in the last 60ms, followed by 600ms of silence
fn rising_utterance() -> Vec<f32> {
    let mut samples = tone_segments(
        &[
            (200.0, Duration::from_millis(1440)),
            (260.0, Duration::from_millis(60)),
        ],
        AMPLITUDE,
    );
    samples.extend(std::iter::repeat(0.0).take(SAMPLE_RATE as usize * 6 / 10));
    samples
}

fn flat_utterance() -> Vec<f32> {
    let mut samples = tone_segments(&[(200.0, Duration::from_millis(1500))], AMPLITUDE);
    samples.extend(std::iter::repeat(0.0).take(SAMPLE_RATE as usize * 6 / 10));
    samples
}

fn write_pcm16(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_rising_tone_fires_once_after_pause() {
    let estimator = McLeodPitchEstimator::new(SAMPLE_RATE);
    let mut detector = BackchannelDetector::new(DetectorConfig::default(), estimator).unwrap();

    let outcome = replay_samples(&mut detector, &rising_utterance(), Instant::now());

    assert_eq!(outcome.frames_processed, 210);
    assert_eq!(outcome.hits.len(), 1);
    let hit = outcome.hits[0];
    assert_eq!(hit.offset, Duration::from_millis(1900));
    assert_eq!(hit.event.pause, Duration::from_millis(400));
    assert_eq!(hit.event.utterance, Duration::from_millis(1490));
}

#[test]
fn test_flat_tone_never_fires() {
    let estimator = McLeodPitchEstimator::new(SAMPLE_RATE);
    let mut detector = BackchannelDetector::new(DetectorConfig::default(), estimator).unwrap();

    let outcome = replay_samples(&mut detector, &flat_utterance(), Instant::now());

    assert_eq!(outcome.frames_processed, 210);
    assert!(outcome.hits.is_empty());
}

#[test]
fn test_replay_file_matches_in_memory_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rising.wav");
    write_pcm16(&path, &rising_utterance());

    let audio = read_wav(&path).unwrap();
    assert_eq!(audio.sample_rate, SAMPLE_RATE);
    assert_eq!(audio.samples.len(), 33600);

    let outcome = replay_file(
        &path,
        &DetectorConfig::default(),
        McLeodPitchEstimator::new(SAMPLE_RATE),
    )
    .unwrap();

    let offsets: Vec<Duration> = outcome.hits.iter().map(|h| h.offset).collect();
    assert_eq!(offsets, vec![Duration::from_millis(1900)]);
}

#[test]
fn test_quiet_recording_never_fires() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiet.wav");
    // RMS ~0.007, below the default silence threshold
    let samples: Vec<f32> = rising_utterance().iter().map(|s| s / 10.0).collect();
    write_pcm16(&path, &samples);

    let outcome = replay_file(
        &path,
        &DetectorConfig::default(),
        McLeodPitchEstimator::new(SAMPLE_RATE),
    )
    .unwrap();
    assert!(outcome.hits.is_empty());
}
