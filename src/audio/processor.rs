use anyhow::Result;
use ringbuf::traits::{Consumer as ConsumerTrait, Observer};
use ringbuf::HeapCons;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::clock::FrameClock;
use super::pcm::FrameAssembler;
use super::resampler::AudioResampler;
use crate::detector::{
    BackchannelDetector, BackchannelEvent, DetectorConfig, McLeodConfig, McLeodPitchEstimator,
};

/// Message from processing thread
#[derive(Debug)]
pub enum ProcessorMessage {
    /// A backchannel opportunity was detected
    Backchannel(BackchannelEvent),
    /// Processing status update
    Status {
        audio_clock_ms: u64,
        frames_processed: u64,
        is_speaking: bool,
        pitch_spread_hz: f64,
    },
    /// Processing thread stopped
    Stopped,
    /// Error occurred
    Error(String),
}

/// Audio processing thread configuration
pub struct ProcessorConfig {
    pub device_sample_rate: u32,
    pub detector: DetectorConfig,
    pub pitch: McLeodConfig,
    pub status_interval_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            device_sample_rate: 48000,
            detector: DetectorConfig::default(),
            pitch: McLeodConfig::default(),
            status_interval_ms: 1000,
        }
    }
}

/// Run the audio processing thread
///
/// Owns the stream's detector. Reads from the ring buffer, resamples to the
/// detector rate, cuts fixed-size frames and reports backchannels.
///
/// Frames are stamped from the audio clock, anchored when the first samples
/// arrive, so bursty reads do not distort pause and utterance lengths.
pub fn run_processor(
    mut consumer: HeapCons<f32>,
    config: ProcessorConfig,
    tx: mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) {
    let result = run_processor_inner(&mut consumer, config, &tx, stop_flag);

    if let Err(e) = result {
        let _ = tx.blocking_send(ProcessorMessage::Error(e.to_string()));
    }

    let _ = tx.blocking_send(ProcessorMessage::Stopped);
}

fn run_processor_inner(
    consumer: &mut HeapCons<f32>,
    config: ProcessorConfig,
    tx: &mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) -> Result<()> {
    let frame_rate = config.detector.frame_rate;
    let chunk_size = config.detector.chunk_size;
    info!(
        "Starting audio processor: {} Hz input, {} Hz / {} samples per frame, silence threshold: {}",
        config.device_sample_rate, frame_rate, chunk_size, config.detector.silence_threshold
    );

    let mut resampler = AudioResampler::new(config.device_sample_rate, frame_rate)?;
    let estimator = McLeodPitchEstimator::with_config(frame_rate, config.pitch);
    let mut detector = BackchannelDetector::new(config.detector, estimator)?;

    let mut assembler = FrameAssembler::new(chunk_size);
    let frame_duration = detector.config().frame_duration();
    let mut clock: Option<FrameClock> = None;

    // Without resampling there is no reason to wait for more than one frame
    let input_frames = if resampler.is_passthrough() {
        chunk_size
    } else {
        resampler.input_frames_next()
    };
    let mut input_buffer = vec![0.0f32; input_frames];
    debug!("Reading {} device samples per iteration", input_frames);

    let mut last_status_time = Instant::now();
    let status_interval = Duration::from_millis(config.status_interval_ms);
    let frame_ms = detector.config().frame_duration_ms();

    let send_status = |detector: &BackchannelDetector<McLeodPitchEstimator>| {
        let _ = tx.blocking_send(ProcessorMessage::Status {
            audio_clock_ms: (detector.frames_processed() as f64 * frame_ms) as u64,
            frames_processed: detector.frames_processed(),
            is_speaking: detector.is_speaking(),
            pitch_spread_hz: detector.pitch_spread(),
        });
    };

    info!("Audio processor started, waiting for audio data...");

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            info!("Stop flag received after {} frames", detector.frames_processed());
            break;
        }

        if consumer.occupied_len() < input_frames {
            std::thread::sleep(Duration::from_millis(2));

            if last_status_time.elapsed() >= status_interval {
                send_status(&detector);
                last_status_time = Instant::now();
            }
            continue;
        }

        let read = consumer.pop_slice(&mut input_buffer);
        if read < input_frames {
            warn!("Incomplete read from ring buffer: {} < {}", read, input_frames);
            continue;
        }

        let clock = clock.get_or_insert_with(|| {
            // The oldest buffered sample was captured before this read
            let buffered = (read + consumer.occupied_len()) as f64;
            let lag = Duration::from_secs_f64(buffered / f64::from(config.device_sample_rate));
            let origin = Instant::now().checked_sub(lag).unwrap_or_else(Instant::now);
            info!("First audio received, audio clock started");
            FrameClock::audio(origin, frame_duration)
        });

        let resampled = resampler.process(&input_buffer)?;
        assembler.push(&resampled);

        while let Some(frame) = assembler.next_frame() {
            let started = Instant::now();
            let event = detector.process_frame_at(&frame, clock.tick());

            let elapsed = started.elapsed();
            if elapsed.as_secs_f64() * 1000.0 > frame_ms {
                warn!(
                    "Frame processing took {:?}, over the {:.1}ms frame budget",
                    elapsed, frame_ms
                );
            }

            if let Some(event) = event {
                debug!("Sending backchannel #{}", event.sequence);
                if tx.blocking_send(ProcessorMessage::Backchannel(event)).is_err() {
                    warn!("Failed to send backchannel, receiver dropped");
                    return Ok(());
                }
            }
        }

        if last_status_time.elapsed() >= status_interval {
            send_status(&detector);
            last_status_time = Instant::now();
        }
    }

    // Final counts for the session summary
    send_status(&detector);

    info!("Audio processor stopped");
    Ok(())
}
