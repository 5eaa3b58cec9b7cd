use anyhow::Result;
use clap::Parser;
use cpal::traits::DeviceTrait;
use ringbuf::traits::Split;
use ringbuf::HeapRb;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use backchannel::audio::{
    calculate_ring_buffer_capacity, get_device, list_input_devices, run_processor,
    select_input_config, AudioCapture, ProcessorConfig, ProcessorMessage,
};
use backchannel::config::Config;
use backchannel::detector::McLeodPitchEstimator;
use backchannel::replay::replay_file;
use backchannel::session::{BackchannelRecord, SessionRecord, SessionSource};

/// Detect backchannel opportunities ("mm-hm") in live or recorded speech
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON config file (default: ~/.backchannel/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device name (use "default" or run with --list-devices)
    #[arg(short, long)]
    device: Option<String>,

    /// Replay a recording (WAV, or raw 16-bit PCM with a .raw/.pcm extension) instead of listening
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the session report as JSON to this path
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Detector sample rate (Hz)
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Samples per frame
    #[arg(long)]
    chunk_size: Option<usize>,

    /// RMS level at or below which a frame is silence
    #[arg(long)]
    silence_threshold: Option<f64>,

    /// Pause (ms) required before a backchannel
    #[arg(long)]
    pause_ms: Option<u64>,

    /// Minimum utterance length (ms) before the pause
    #[arg(long)]
    speech_ms: Option<u64>,

    /// Trailing pitch window (ms)
    #[arg(long)]
    pitch_window_ms: Option<u64>,

    /// Minimum pitch movement (Hz) inside the window
    #[arg(long)]
    pitch_shift_hz: Option<f64>,

    /// Minimum time (ms) between backchannels
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config
    fn apply_overrides(&self, config: &mut Config) {
        let detector = &mut config.detector;
        if let Some(v) = self.frame_rate {
            detector.frame_rate = v;
        }
        if let Some(v) = self.chunk_size {
            detector.chunk_size = v;
        }
        if let Some(v) = self.silence_threshold {
            detector.silence_threshold = v;
        }
        if let Some(v) = self.pause_ms {
            detector.pause_req_ms = v;
        }
        if let Some(v) = self.speech_ms {
            detector.speech_req_ms = v;
        }
        if let Some(v) = self.pitch_window_ms {
            detector.pitch_window_ms = v;
        }
        if let Some(v) = self.pitch_shift_hz {
            detector.pitch_shift_hz = v;
        }
        if let Some(v) = self.cooldown_ms {
            detector.bc_cooldown_ms = v;
        }
        if let Some(ref device) = self.device {
            config.input_device_id = Some(device.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if args.list_devices {
        return list_devices_and_exit();
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    args.apply_overrides(&mut config);
    config.detector.validate()?;
    config.pitch.validate()?;

    debug!("Config: {:?}", config);

    let session = match &args.input {
        Some(path) => run_replay(path, &config)?,
        None => run_live(&config).await?,
    };

    print_summary(&session);

    if let Some(path) = &args.report {
        session.save_json(path)?;
        info!("Session report written to {:?}", path);
    }

    Ok(())
}

fn print_backchannel(record: &BackchannelRecord) {
    println!(
        "[{}] BC #{} --> (mm-hm / yeah)  pause {}ms, utterance {}ms",
        record.offset_label(),
        record.sequence,
        record.pause_ms,
        record.utterance_ms
    );
}

fn run_replay(path: &Path, config: &Config) -> Result<SessionRecord> {
    info!("Replaying {:?}", path);
    let detector_config = config.detector.clone();
    let estimator =
        McLeodPitchEstimator::with_config(detector_config.frame_rate, config.pitch.clone());
    let outcome = replay_file(path, &detector_config, estimator)?;

    let mut session = SessionRecord::new(
        SessionSource::File(path.display().to_string()),
        detector_config,
    );
    for hit in &outcome.hits {
        let record = BackchannelRecord::from_event(&hit.event, hit.offset);
        print_backchannel(&record);
        session.add_backchannel(record);
    }
    session.finalize(outcome.frames_processed);
    Ok(session)
}

async fn run_live(config: &Config) -> Result<SessionRecord> {
    let device = get_device(config.input_device_id.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    let selected = select_input_config(&device, config.detector.frame_rate)?;
    let sample_rate = selected.config.sample_rate.0;
    info!(
        "Audio config: {} Hz, {} channels, format {:?}",
        sample_rate, selected.config.channels, selected.sample_format
    );

    let capacity = calculate_ring_buffer_capacity(sample_rate, config.ring_buffer_seconds);
    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
    debug!("Ring buffer capacity: {} samples", capacity);

    let capture = AudioCapture::new(&device, &selected.config, selected.sample_format, producer)?;

    let processor_config = ProcessorConfig {
        device_sample_rate: sample_rate,
        detector: config.detector.clone(),
        pitch: config.pitch.clone(),
        status_interval_ms: config.status_interval_ms,
    };

    let (tx, mut rx) = mpsc::channel::<ProcessorMessage>(32);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();

    let processor_handle = std::thread::spawn(move || {
        run_processor(consumer, processor_config, tx, stop_flag_clone);
    });

    let stop_flag_ctrlc = stop_flag.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, stopping...");
        stop_flag_ctrlc.store(true, Ordering::SeqCst);
    });

    capture.start()?;
    let origin = Instant::now();
    println!("\nListening... Press Ctrl+C to stop.\n");

    let mut session = SessionRecord::new(SessionSource::Microphone(device_name), config.detector.clone());
    let mut frames_processed = 0u64;

    while let Some(msg) = rx.recv().await {
        match msg {
            ProcessorMessage::Backchannel(event) => {
                let record =
                    BackchannelRecord::from_event(&event, event.at.saturating_duration_since(origin));
                print_backchannel(&record);
                session.add_backchannel(record);
            }

            ProcessorMessage::Status {
                audio_clock_ms,
                frames_processed: frames,
                is_speaking,
                pitch_spread_hz,
            } => {
                frames_processed = frames;
                debug!(
                    "Status: {}s processed, speaking: {}, pitch spread: {:.1} Hz",
                    audio_clock_ms / 1000,
                    is_speaking,
                    pitch_spread_hz
                );
            }

            ProcessorMessage::Error(e) => {
                error!("Processor error: {}", e);
            }

            ProcessorMessage::Stopped => {
                info!("Processor stopped");
                break;
            }
        }
    }

    capture.stop()?;
    let _ = processor_handle.join();

    if capture.overflow_count() > 0 {
        warn!("Audio overflows detected: {}", capture.overflow_count());
    }

    session.finalize(frames_processed);
    Ok(session)
}

fn print_summary(session: &SessionRecord) {
    println!("\n--- Session Summary ---");
    println!("Duration: {:.1}s", session.total_duration_ms as f64 / 1000.0);
    println!("Frames: {}", session.frames_processed);
    println!("Backchannels: {}", session.backchannels.len());
    println!("Rate: {:.1}/min", session.rate_per_minute());
}

fn list_devices_and_exit() -> Result<()> {
    println!("Available input devices:\n");

    match list_input_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("  No input devices found.");
            } else {
                for device in devices {
                    let default_marker = if device.is_default { " (default)" } else { "" };
                    println!("  - {}{}", device.name, default_marker);
                }
            }
        }
        Err(e) => {
            error!("Failed to list devices: {}", e);
            println!("  Error: {}", e);
        }
    }

    Ok(())
}
