pub mod capture;
pub mod clock;
pub mod pcm;
pub mod processor;
pub mod resampler;

pub use capture::{
    calculate_ring_buffer_capacity, get_device, list_input_devices, select_input_config,
    AudioCapture, AudioDevice, SelectedConfig,
};
pub use clock::FrameClock;
pub use pcm::{first_channel, i16_le_bytes_to_f32, int_to_f32, FrameAssembler};
pub use processor::{run_processor, ProcessorConfig, ProcessorMessage};
pub use resampler::AudioResampler;
