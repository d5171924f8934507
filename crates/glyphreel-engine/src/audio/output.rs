//! Audio output using cpal.

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    StreamError, SupportedBufferSize, SupportedStreamConfig,
};
use glyphreel_core::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::audio::sink::{AudioSink, SinkFeeder, SinkStream};

/// A playing cpal stream and the buffer size it was opened with.
struct CpalStream {
    _stream: Stream,
    latency_frames: Option<u32>,
}

impl SinkStream for CpalStream {
    fn latency_frames(&self) -> Option<u32> {
        self.latency_frames
    }
}

/// The default output device of the default host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalSink;

impl CpalSink {
    pub const fn new() -> Self {
        Self
    }

    fn default_device() -> Result<(Device, SupportedStreamConfig)> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get output config: {e}")))?;
        Ok((device, supported))
    }

    fn build_stream<T: SizedSample + FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mut feeder: SinkFeeder,
    ) -> Result<Stream> {
        let channels = usize::from(config.channels);
        let mut scratch: Vec<f32> = Vec::new();

        let fault = feeder.fault();
        let err_fn = move |err: StreamError| {
            if matches!(err, StreamError::DeviceNotAvailable) {
                fault.device_lost(err);
            } else {
                error!("Audio stream error: {err}");
            }
        };

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    feeder.feed_channels(&mut scratch, channels);
                    for (sample, value) in data.iter_mut().zip(&scratch) {
                        *sample = T::from_sample(*value);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))
    }
}

impl AudioSink for CpalSink {
    fn native_rate(&self) -> Option<u32> {
        match Self::default_device() {
            Ok((_, supported)) => Some(supported.sample_rate().0),
            Err(e) => {
                warn!("Can't query the output device rate: {e}");
                None
            }
        }
    }

    fn open(
        &mut self,
        sample_rate: u32,
        latency_frames: u32,
        feeder: SinkFeeder,
    ) -> Result<Box<dyn SinkStream>> {
        let (device, supported) = Self::default_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio output device: {device_name}");
        debug!("Supported output config: {:?}", supported);

        if supported.sample_rate().0 != sample_rate {
            warn!(
                "Device runs at {}Hz, opening it at {sample_rate}Hz",
                supported.sample_rate().0
            );
        }

        let (buffer_size, buffered) = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max } => {
                let frames = latency_frames.max(*min).min(*max);
                if frames != latency_frames {
                    debug!("Device buffers {min}..={max} frames, using {frames}");
                }
                (BufferSize::Fixed(frames), Some(frames))
            }
            SupportedBufferSize::Unknown => {
                debug!("Device buffer size unknown, using its default");
                (BufferSize::Default, None)
            }
        };

        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size,
        };
        debug!("Output config: {}Hz, {} channels", sample_rate, config.channels);

        let sample_format = supported.sample_format();
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, feeder)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, feeder)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, feeder)?,
            _ => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

        Ok(Box::new(CpalStream {
            _stream: stream,
            latency_frames: buffered,
        }))
    }
}
