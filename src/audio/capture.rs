use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::Producer as ProducerTrait;
use ringbuf::HeapProd;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Audio device information
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub name: String,
    pub is_default: bool,
}

/// List available input devices
pub fn list_input_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let devices = host
        .input_devices()
        .context("Failed to enumerate input devices")?
        .filter_map(|device| device.name().ok())
        .map(|name| AudioDevice {
            is_default: name == default_name,
            name,
        })
        .collect();

    Ok(devices)
}

/// Get device by name, or the default input device
pub fn get_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    match device_name {
        Some(name) if name != "default" => host
            .input_devices()
            .context("Failed to enumerate devices")?
            .find(|device| device.name().map(|n| n == name).unwrap_or(false))
            .with_context(|| format!("Device not found: {}", name)),
        _ => host
            .default_input_device()
            .context("No default input device available"),
    }
}

/// Selected audio configuration with both stream config and sample format
pub struct SelectedConfig {
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

/// Pick an input configuration, preferring mono at the detector's own rate
///
/// Falls back to mono at the highest rate, then to the device default (first
/// channel is used).
pub fn select_input_config(device: &Device, preferred_rate: u32) -> Result<SelectedConfig> {
    if let Ok(supported) = device.supported_input_configs() {
        let mono: Vec<_> = supported.filter(|range| range.channels() == 1).collect();

        let exact = mono.iter().find(|range| {
            range.min_sample_rate().0 <= preferred_rate && range.max_sample_rate().0 >= preferred_rate
        });
        if let Some(range) = exact {
            let supported_config = range.clone().with_sample_rate(cpal::SampleRate(preferred_rate));
            debug!(
                "Selected mono config at native detector rate: {} Hz, format {:?}",
                preferred_rate,
                supported_config.sample_format()
            );
            return Ok(SelectedConfig {
                config: supported_config.config(),
                sample_format: supported_config.sample_format(),
            });
        }

        if let Some(range) = mono.into_iter().next() {
            let supported_config = range.with_max_sample_rate();
            debug!(
                "Selected mono config: {} Hz, format {:?}",
                supported_config.sample_rate().0,
                supported_config.sample_format()
            );
            return Ok(SelectedConfig {
                config: supported_config.config(),
                sample_format: supported_config.sample_format(),
            });
        }
    }

    let supported_config = device
        .default_input_config()
        .context("No default input config")?;
    debug!(
        "Using default config (first channel only): {} Hz, {} channels, format {:?}",
        supported_config.sample_rate().0,
        supported_config.channels(),
        supported_config.sample_format()
    );
    Ok(SelectedConfig {
        config: supported_config.config(),
        sample_format: supported_config.sample_format(),
    })
}

/// Ring buffer capacity holding `seconds` of audio at the device rate
pub fn calculate_ring_buffer_capacity(device_sample_rate: u32, seconds: u32) -> usize {
    (device_sample_rate * seconds) as usize
}

/// Push the first channel of each interleaved frame, counting overflows
fn push_first_channel<T>(
    data: &[T],
    channels: usize,
    producer: &mut HeapProd<f32>,
    overflow_counter: &AtomicU64,
) where
    T: Sample,
    f32: FromSample<T>,
{
    for frame in data.chunks(channels.max(1)) {
        if producer.try_push(frame[0].to_sample::<f32>()).is_err() {
            overflow_counter.fetch_add(1, Ordering::Relaxed);
            break;
        }
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut producer: HeapProd<f32>,
    overflow_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !is_running.load(Ordering::Relaxed) {
                    return;
                }
                push_first_channel(data, channels, &mut producer, &overflow_counter);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .context("Failed to build input stream")
}

/// Microphone capture feeding mono samples into a ring buffer
pub struct AudioCapture {
    stream: Stream,
    sample_rate: u32,
    overflow_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
}

impl AudioCapture {
    pub fn new(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        producer: HeapProd<f32>,
    ) -> Result<Self> {
        let overflow_counter = Arc::new(AtomicU64::new(0));
        let is_running = Arc::new(AtomicBool::new(false));

        info!(
            "Building input stream: {} Hz, {} channels, format {:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        let overflow = overflow_counter.clone();
        let running = is_running.clone();
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, config, producer, overflow, running)?,
            SampleFormat::I16 => build_stream::<i16>(device, config, producer, overflow, running)?,
            SampleFormat::I32 => build_stream::<i32>(device, config, producer, overflow, running)?,
            SampleFormat::U8 => build_stream::<u8>(device, config, producer, overflow, running)?,
            other => anyhow::bail!("Unsupported sample format: {:?}", other),
        };

        Ok(Self {
            stream,
            sample_rate: config.sample_rate.0,
            overflow_counter,
            is_running,
        })
    }

    pub fn start(&self) -> Result<()> {
        self.is_running.store(true, Ordering::SeqCst);
        self.stream.play().context("Failed to start audio stream")?;
        info!("Audio capture started");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.is_running.store(false, Ordering::SeqCst);
        self.stream.pause().context("Failed to stop audio stream")?;
        info!("Audio capture stopped");
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Callbacks that found the ring buffer full
    pub fn overflow_count(&self) -> u64 {
        self.overflow_counter.load(Ordering::Relaxed)
    }
}
