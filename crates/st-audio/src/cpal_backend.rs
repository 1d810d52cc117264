//! CPAL-based audio host.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream,
    StreamConfig, StreamInstant, SupportedBufferSize,
};
use st_engine::{
    AudioHost, BlockSize, CallbackTiming, DeviceInfo, DeviceTable, HostError, OutputStream,
    RenderFn, StreamSpec,
};

/// Host backed by one of cpal's platform APIs.
///
/// Device indices are positions in cpal's device enumeration, inputs
/// included, so an input-only device shows up with no output channels.
pub struct CpalHost {
    id: cpal::HostId,
    name: String,
}

impl CpalHost {
    /// The platform's default host.
    pub fn new() -> Self {
        let id = cpal::default_host().id();
        Self {
            id,
            name: id.name().to_string(),
        }
    }

    fn host(&self) -> Result<cpal::Host, HostError> {
        cpal::host_from_id(self.id).map_err(|e| HostError::Devices(e.to_string()))
    }

    fn device(&self, index: usize) -> Result<Device, HostError> {
        self.host()?
            .devices()
            .map_err(|e| HostError::Devices(e.to_string()))?
            .nth(index)
            .ok_or(HostError::DeviceUnavailable(index))
    }
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for CpalHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn devices(&self) -> Result<DeviceTable, HostError> {
        let host = self.host()?;
        let default_name = host.default_output_device().and_then(|d| d.name().ok());
        let devices = host
            .devices()
            .map_err(|e| HostError::Devices(e.to_string()))?;

        let mut table = DeviceTable::default();
        for (index, device) in devices.enumerate() {
            let info = describe(index, &device);
            if table.default_output.is_none() && default_name.as_deref() == Some(info.name.as_str()) {
                table.default_output = Some(index);
            }
            table.devices.push(info);
        }
        Ok(table)
    }

    fn open_stream(
        &self,
        spec: &StreamSpec,
        render: RenderFn,
    ) -> Result<Box<dyn OutputStream>, HostError> {
        let device = self.device(spec.device)?;
        let format = device
            .default_output_config()
            .map_err(|e| HostError::StreamCreate(e.to_string()))?
            .sample_format();
        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: SampleRate(spec.sample_rate),
            buffer_size: match spec.block_size {
                BlockSize::HostOptimal => BufferSize::Default,
                BlockSize::Fixed(n) => BufferSize::Fixed(n),
            },
        };

        let stream = match format {
            SampleFormat::F32 => build_f32(&device, &config, render)?,
            SampleFormat::I16 => build_converted::<i16>(&device, &config, spec, render)?,
            SampleFormat::U16 => build_converted::<u16>(&device, &config, spec, render)?,
            other => return Err(HostError::SampleFormat(other.to_string())),
        };
        log::debug!(
            "opened {} stream on device {}: {} ch @ {} Hz",
            format,
            spec.device,
            spec.channels,
            spec.sample_rate
        );
        Ok(Box::new(CpalStream { stream }))
    }
}

fn describe(index: usize, device: &Device) -> DeviceInfo {
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let max_output_channels = device
        .supported_output_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0);
    let default = device
        .default_output_config()
        .or_else(|_| device.default_input_config())
        .ok();
    let default_sample_rate = default.as_ref().map(|c| c.sample_rate().0).unwrap_or(0);
    let default_low_output_latency = match default.as_ref().map(|c| c.buffer_size()) {
        Some(SupportedBufferSize::Range { min, .. }) if default_sample_rate > 0 => {
            *min as f64 / default_sample_rate as f64
        }
        _ => 0.0,
    };
    DeviceInfo {
        index,
        name,
        default_sample_rate,
        max_output_channels,
        default_low_output_latency,
    }
}

/// Converts cpal's stream instants to nanoseconds since the first callback.
struct StreamClock {
    origin: Option<StreamInstant>,
}

impl StreamClock {
    fn new() -> Self {
        Self { origin: None }
    }

    fn timing(&mut self, info: &cpal::OutputCallbackInfo) -> CallbackTiming {
        let ts = info.timestamp();
        let origin = *self.origin.get_or_insert(ts.callback);
        let since = |t: StreamInstant| {
            t.duration_since(&origin)
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0)
        };
        CallbackTiming::new(since(ts.callback), since(ts.playback))
    }
}

fn stream_error(err: cpal::StreamError) {
    log::error!("audio stream error: {}", err);
}

fn build_f32(device: &Device, config: &StreamConfig, mut render: RenderFn) -> Result<Stream, HostError> {
    let mut clock = StreamClock::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                let timing = clock.timing(info);
                render(data, &timing);
            },
            stream_error,
            None,
        )
        .map_err(|e| HostError::StreamCreate(e.to_string()))
}

/// Integer formats render into a preallocated f32 scratch buffer, in
/// chunks when the host asks for more frames than it holds.
fn build_converted<T>(
    device: &Device,
    config: &StreamConfig,
    spec: &StreamSpec,
    mut render: RenderFn,
) -> Result<Stream, HostError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate as i64;
    let frames = spec.block_size.frames().unwrap_or(BlockSize::MAX) as usize;
    let mut scratch = vec![0.0f32; frames * channels];
    let mut clock = StreamClock::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                let timing = clock.timing(info);
                let mut offset_frames = 0i64;
                for chunk in data.chunks_mut(scratch.len()) {
                    let out = &mut scratch[..chunk.len()];
                    let offset_ns = offset_frames * 1_000_000_000 / sample_rate;
                    let chunk_timing =
                        CallbackTiming::new(timing.callback_ns, timing.playback_ns + offset_ns);
                    render(out, &chunk_timing);
                    for (dst, &src) in chunk.iter_mut().zip(out.iter()) {
                        *dst = T::from_sample(src);
                    }
                    offset_frames += (chunk.len() / channels) as i64;
                }
            },
            stream_error,
            None,
        )
        .map_err(|e| HostError::StreamCreate(e.to_string()))
}

struct CpalStream {
    stream: Stream,
}

impl OutputStream for CpalStream {
    fn start(&mut self) -> Result<(), HostError> {
        self.stream
            .play()
            .map_err(|e| HostError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), HostError> {
        self.stream
            .pause()
            .map_err(|e| HostError::Playback(e.to_string()))
    }
}
