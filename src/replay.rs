//! Offline replay of recorded audio through the detector
//!
//! Frames are stamped from the audio clock rather than the wall clock, so a
//! file always produces the same backchannel offsets.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::audio::{
    first_channel, i16_le_bytes_to_f32, int_to_f32, AudioResampler, FrameAssembler, FrameClock,
};
use crate::detector::{BackchannelDetector, BackchannelEvent, DetectorConfig, PitchEstimator};

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Read a WAV file as normalized mono samples (first channel)
pub fn read_wav(path: &Path) -> Result<MonoAudio> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open WAV file {:?}", path))?;
    let spec = reader.spec();

    debug!(
        "WAV {:?}: {} Hz, {} channels, {} bits {:?}",
        path, spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float WAV samples")?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| int_to_f32(v, bits)))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer WAV samples")?
        }
    };

    Ok(MonoAudio {
        samples: first_channel(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/// Read headerless little-endian 16-bit mono PCM recorded at `sample_rate`
pub fn read_pcm16(path: &Path, sample_rate: u32) -> Result<MonoAudio> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PCM file {:?}", path))?;
    debug!("PCM {:?}: {} bytes at {} Hz", path, bytes.len(), sample_rate);

    Ok(MonoAudio {
        samples: i16_le_bytes_to_f32(&bytes),
        sample_rate,
    })
}

/// Decode a recording, picking the reader from the file extension
pub fn read_audio(path: &Path, raw_sample_rate: u32) -> Result<MonoAudio> {
    let is_raw = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("raw") || ext.eq_ignore_ascii_case("pcm"))
        .unwrap_or(false);

    if is_raw {
        read_pcm16(path, raw_sample_rate)
    } else {
        read_wav(path)
    }
}

/// A backchannel found during replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayHit {
    /// Offset of the triggering frame from the start of the audio
    pub offset: Duration,
    pub event: BackchannelEvent,
}

/// Result of replaying a buffer
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub hits: Vec<ReplayHit>,
    pub frames_processed: u64,
}

/// Feed samples already at the detector rate through `detector`
///
/// Samples are cut into `chunk_size` frames; a trailing partial frame is
/// dropped.
pub fn replay_samples<E: PitchEstimator>(
    detector: &mut BackchannelDetector<E>,
    samples: &[f32],
    origin: Instant,
) -> ReplayOutcome {
    let mut assembler = FrameAssembler::new(detector.config().chunk_size);
    let mut clock = FrameClock::audio(origin, detector.config().frame_duration());
    let frames_before = detector.frames_processed();

    assembler.push(samples);
    let mut hits = Vec::new();
    while let Some(frame) = assembler.next_frame() {
        let now = clock.tick();
        if let Some(event) = detector.process_frame_at(&frame, now) {
            hits.push(ReplayHit {
                offset: event.at.saturating_duration_since(origin),
                event,
            });
        }
    }
    assembler.discard_partial();

    ReplayOutcome {
        hits,
        frames_processed: detector.frames_processed() - frames_before,
    }
}

/// Replay a recording with the given estimator, resampling if needed
///
/// `.raw` and `.pcm` files are taken as 16-bit mono at the detector rate.
pub fn replay_file<E: PitchEstimator>(
    path: &Path,
    config: &DetectorConfig,
    estimator: E,
) -> Result<ReplayOutcome> {
    let audio = read_audio(path, config.frame_rate)?;
    let samples = if audio.sample_rate == config.frame_rate {
        audio.samples
    } else {
        info!(
            "Resampling {:?} from {} Hz to {} Hz",
            path, audio.sample_rate, config.frame_rate
        );
        AudioResampler::new(audio.sample_rate, config.frame_rate)?.process_all(&audio.samples)?
    };

    let mut detector = BackchannelDetector::new(config.clone(), estimator)?;
    let outcome = replay_samples(&mut detector, &samples, Instant::now());

    info!(
        "Replayed {} frames ({:.1}s), {} backchannels",
        outcome.frames_processed,
        outcome.frames_processed as f64 * config.frame_duration_ms() / 1000.0,
        outcome.hits.len()
    );

    Ok(outcome)
}
