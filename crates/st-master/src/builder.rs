use std::path::PathBuf;
use std::sync::Arc;

use st_audio::CpalHost;
use st_engine::{AudioHost, BlockSize, Clock, DeviceConfig, DeviceRequest, MonotonicClock};
use st_signal::{AmMethod, NoiseColor, SignalParams, Volume, Window};

use crate::error::SoundError;
use crate::kind::{SoundKind, DEFAULT_CARRIER, DEFAULT_FREQUENCY, DEFAULT_MODULATION};
use crate::sound::{open_bound, Sound, Source};

pub const DEFAULT_VOLUME: f32 = 10.0;
pub const DEFAULT_DURATION: f64 = 1.0;
pub const DEFAULT_CHANNELS: u16 = 1;

/// Configures and opens a [`Sound`].
///
/// ```no_run
/// use st_master::SoundBuilder;
///
/// let mut sound = SoundBuilder::tone(1000.0).volume(20.0).duration(0.5).build()?;
/// sound.play(Some(0.1), true)?;
/// # Ok::<(), st_master::SoundError>(())
/// ```
pub struct SoundBuilder {
    kind: SoundKind,
    volume: Option<Volume>,
    duration: Option<f64>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    window: Window,
    device: Option<usize>,
    block_size: BlockSize,
    host: Option<Arc<dyn AudioHost>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SoundBuilder {
    pub fn new(kind: SoundKind) -> Self {
        Self {
            kind,
            volume: None,
            duration: None,
            sample_rate: None,
            channels: None,
            window: Window::Rectangular,
            device: None,
            block_size: BlockSize::HostOptimal,
            host: None,
            clock: None,
        }
    }

    pub fn tone(frequency: f64) -> Self {
        Self::new(SoundKind::tone(frequency))
    }

    /// Conventional AM at the default carrier and modulation frequencies.
    pub fn am() -> Self {
        Self::new(SoundKind::am(
            DEFAULT_CARRIER,
            DEFAULT_MODULATION,
            AmMethod::Conventional,
        ))
    }

    pub fn noise(color: NoiseColor) -> Self {
        Self::new(SoundKind::noise(color))
    }

    /// A sound read from a WAV file. Its sample rate, channel count and
    /// duration come from the file.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self::new(SoundKind::loaded(path))
    }

    pub fn volume(mut self, volume: impl Into<Volume>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Defaults to the device's default sample rate.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Output device index. Defaults to the host's default output.
    pub fn device(mut self, index: usize) -> Self {
        self.device = Some(index);
        self
    }

    pub fn block_size(mut self, block_size: BlockSize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Replace the waveform's noise seed. Ignored by other kinds.
    pub fn seed(mut self, seed: u64) -> Self {
        if let SoundKind::ColoredNoise { seed: s, .. } = &mut self.kind {
            *s = seed;
        }
        self
    }

    /// Audio host to open the stream on. Defaults to cpal's platform host.
    pub fn host(mut self, host: Arc<dyn AudioHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Time authority for scheduling. Defaults to a fresh monotonic clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate every parameter, generate the signal, then open and bind
    /// the stream.
    pub fn build(self) -> Result<Sound, SoundError> {
        let source = Source::open(&self.kind)?;
        let (request_rate, mut params) = match &source {
            Source::File(loaded) => {
                if self.duration.is_some() {
                    return Err(SoundError::ReadOnly("duration"));
                }
                if self.sample_rate.is_some() {
                    return Err(SoundError::ReadOnly("sample rate"));
                }
                if self.channels.is_some() {
                    return Err(SoundError::ReadOnly("number of channels"));
                }
                let params = SignalParams {
                    sample_rate: loaded.sample_rate(),
                    duration: loaded.duration(),
                    volume: self
                        .volume
                        .unwrap_or_else(|| loaded.original_volume().clone()),
                    channels: loaded.channels(),
                    window: self.window,
                };
                (Some(loaded.sample_rate()), params)
            }
            Source::Synth(_) => {
                let params = SignalParams {
                    sample_rate: 0,
                    duration: self.duration.unwrap_or(DEFAULT_DURATION),
                    volume: self.volume.unwrap_or(Volume::Uniform(DEFAULT_VOLUME)),
                    channels: self.channels.unwrap_or(DEFAULT_CHANNELS),
                    window: self.window,
                };
                (self.sample_rate, params)
            }
        };

        let host = self
            .host
            .unwrap_or_else(|| Arc::new(CpalHost::new()) as Arc<dyn AudioHost>);
        let table = host.devices()?;
        let config = DeviceConfig::resolve(&table, &DeviceRequest::new(self.device, request_rate))?;
        params.sample_rate = config.sample_rate();

        let buffer = source.render(&params)?;
        config.check_channels(buffer.channels())?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()) as Arc<dyn Clock>);
        let engine = open_bound(host.clone(), config, self.block_size, clock, buffer)?;
        let sound = Sound::new(source, params, host, self.device, engine);
        log::debug!("created {}", sound);
        Ok(sound)
    }
}

impl Default for SoundBuilder {
    /// A pure tone at the default frequency.
    fn default() -> Self {
        Self::tone(DEFAULT_FREQUENCY)
    }
}
