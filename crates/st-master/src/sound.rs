//! The sound object: a stimulus, its signal parameters and the engine
//! playing it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use st_engine::{
    AudioHost, BlockSize, Clock, DeviceConfig, DeviceRequest, PlaybackEngine, RtFault,
};
use st_signal::{
    generate, times, AmMethod, NoiseColor, SignalBuffer, SignalParams, Stimulus, Volume, Window,
};

use crate::error::SoundError;
use crate::kind::SoundKind;
use crate::loaded::LoadedSignal;

/// Where the samples come from.
#[derive(Clone, Debug)]
pub(crate) enum Source {
    Synth(Stimulus),
    File(LoadedSignal),
}

impl Source {
    pub(crate) fn open(kind: &SoundKind) -> Result<Self, SoundError> {
        if let SoundKind::Loaded { path } = kind {
            return Ok(Source::File(LoadedSignal::read(path)?));
        }
        kind.stimulus()
            .map(Source::Synth)
            .ok_or(SoundError::WrongKind {
                property: "waveform",
                kind: kind.name(),
            })
    }

    pub(crate) fn render(&self, params: &SignalParams) -> Result<SignalBuffer, SoundError> {
        match self {
            Source::Synth(stimulus) => Ok(generate(stimulus, params)?),
            Source::File(loaded) => loaded.render(&params.volume, &params.window),
        }
    }

    fn kind(&self) -> SoundKind {
        match self {
            Source::Synth(stimulus) => SoundKind::from_stimulus(stimulus),
            Source::File(loaded) => SoundKind::loaded(loaded.path()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Source::Synth(stimulus) => SoundKind::from_stimulus(stimulus).name(),
            Source::File(_) => "loaded sound",
        }
    }
}

/// A change to one property of a [`Sound`].
///
/// Every mutation regenerates the signal and rebinds it; on error the
/// sound keeps its previous state.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Duration(f64),
    SampleRate(u32),
    Volume(Volume),
    Window(Window),
    Channels(u16),
    Frequency(f64),
    Carrier(f64),
    Modulation(f64),
    Method(AmMethod),
    Color(NoiseColor),
    Seed(u64),
    /// Select `[tmin, tmax]` seconds of a loaded sound.
    Crop { tmin: Option<f64>, tmax: Option<f64> },
    /// Undo crops and restore a loaded sound's original volume.
    Reset,
}

/// A playable stimulus bound to an output device.
///
/// Build one with [`SoundBuilder`](crate::SoundBuilder).
pub struct Sound {
    source: Source,
    params: SignalParams,
    host: Arc<dyn AudioHost>,
    /// Device as requested, `None` for the host default.
    device: Option<usize>,
    engine: PlaybackEngine,
}

impl Sound {
    pub(crate) fn new(
        source: Source,
        params: SignalParams,
        host: Arc<dyn AudioHost>,
        device: Option<usize>,
        engine: PlaybackEngine,
    ) -> Self {
        Self {
            source,
            params,
            host,
            device,
            engine,
        }
    }

    // --- Playback ---

    /// Play the sound `when` seconds from now (`None` means now).
    pub fn play(&mut self, when: Option<f64>, blocking: bool) -> Result<(), SoundError> {
        Ok(self.engine.play(when, blocking)?)
    }

    /// Interrupt playback. Returns whether a pass was on-going.
    pub fn stop(&mut self) -> Result<bool, SoundError> {
        Ok(self.engine.stop()?)
    }

    /// Release the output stream. The sound can no longer play.
    pub fn close(&mut self) {
        self.engine.close();
    }

    pub fn is_armed(&self) -> bool {
        self.engine.is_armed()
    }

    /// Faults raised by the stream callback since the last call.
    pub fn take_faults(&mut self) -> Vec<RtFault> {
        self.engine.take_faults()
    }

    // --- Mutation ---

    /// Apply one property change.
    ///
    /// The new signal is generated and validated before the stream is
    /// touched. A sample rate change reopens the engine on the same
    /// device; any other change rebinds the existing engine.
    pub fn apply(&mut self, mutation: Mutation) -> Result<(), SoundError> {
        let mut source = self.source.clone();
        let mut params = self.params.clone();
        let kind = source.name();
        let wrong = |property| SoundError::WrongKind { property, kind };

        match (mutation, &mut source) {
            (Mutation::Duration(_), Source::File(_)) => return Err(SoundError::ReadOnly("duration")),
            (Mutation::SampleRate(_), Source::File(_)) => {
                return Err(SoundError::ReadOnly("sample rate"))
            }
            (Mutation::Channels(_), Source::File(_)) => {
                return Err(SoundError::ReadOnly("number of channels"))
            }
            (Mutation::Duration(duration), _) => params.duration = duration,
            (Mutation::SampleRate(rate), _) => params.sample_rate = rate,
            (Mutation::Channels(channels), _) => {
                if let Some(v) = params.volume.as_uniform() {
                    params.volume = Volume::uniform(v);
                }
                params.channels = channels;
            }
            (Mutation::Volume(volume), _) => params.volume = volume,
            (Mutation::Window(window), _) => params.window = window,
            (Mutation::Frequency(f), Source::Synth(Stimulus::Tone { frequency })) => *frequency = f,
            (Mutation::Frequency(_), _) => return Err(wrong("frequency")),
            (Mutation::Carrier(f), Source::Synth(Stimulus::AmplitudeModulated { carrier, .. })) => {
                *carrier = f
            }
            (Mutation::Carrier(_), _) => return Err(wrong("carrier frequency")),
            (
                Mutation::Modulation(f),
                Source::Synth(Stimulus::AmplitudeModulated { modulation, .. }),
            ) => *modulation = f,
            (Mutation::Modulation(_), _) => return Err(wrong("modulation frequency")),
            (Mutation::Method(m), Source::Synth(Stimulus::AmplitudeModulated { method, .. })) => {
                *method = m
            }
            (Mutation::Method(_), _) => return Err(wrong("modulation method")),
            (Mutation::Color(c), Source::Synth(Stimulus::ColoredNoise { color, .. })) => *color = c,
            (Mutation::Color(_), _) => return Err(wrong("color")),
            (Mutation::Seed(s), Source::Synth(Stimulus::ColoredNoise { seed, .. })) => *seed = s,
            (Mutation::Seed(_), _) => return Err(wrong("seed")),
            (Mutation::Crop { tmin, tmax }, Source::File(loaded)) => {
                loaded.crop(tmin, tmax)?;
                params.duration = loaded.duration();
            }
            (Mutation::Crop { .. }, _) => return Err(wrong("crop")),
            (Mutation::Reset, Source::File(loaded)) => {
                loaded.reset_crop();
                params.duration = loaded.duration();
                params.volume = loaded.original_volume().clone();
            }
            (Mutation::Reset, _) => return Err(wrong("reset")),
        }

        let buffer = source.render(&params)?;
        if params.sample_rate != self.params.sample_rate {
            self.reopen(params.sample_rate, buffer)?;
        } else {
            self.engine.config().check_channels(buffer.channels())?;
            self.engine.bind(buffer)?;
        }
        self.source = source;
        self.params = params;
        Ok(())
    }

    /// Move the sound to a new engine running at `sample_rate`.
    fn reopen(&mut self, sample_rate: u32, buffer: SignalBuffer) -> Result<(), SoundError> {
        let table = self.host.devices()?;
        let config = DeviceConfig::resolve(&table, &DeviceRequest::new(self.device, Some(sample_rate)))?;
        config.check_channels(buffer.channels())?;

        let block_size = self.engine.block_size();
        let clock = self.engine.clock().clone();
        let previous = self.engine.config().clone();
        let previous_buffer = self.engine.buffer().cloned();
        self.engine.close();

        match open_bound(self.host.clone(), config, block_size, clock.clone(), buffer) {
            Ok(engine) => {
                self.engine = engine;
                Ok(())
            }
            Err(err) => {
                log::error!("failed to reopen the stream at {} Hz: {}", sample_rate, err);
                if let Some(buffer) = previous_buffer {
                    match open_bound(self.host.clone(), previous, block_size, clock, buffer) {
                        Ok(engine) => self.engine = engine,
                        Err(restore) => log::error!("failed to restore the previous stream: {}", restore),
                    }
                }
                Err(err)
            }
        }
    }

    pub fn set_duration(&mut self, duration: f64) -> Result<(), SoundError> {
        self.apply(Mutation::Duration(duration))
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), SoundError> {
        self.apply(Mutation::SampleRate(sample_rate))
    }

    pub fn set_volume(&mut self, volume: impl Into<Volume>) -> Result<(), SoundError> {
        self.apply(Mutation::Volume(volume.into()))
    }

    pub fn set_window(&mut self, window: Window) -> Result<(), SoundError> {
        self.apply(Mutation::Window(window))
    }

    pub fn set_channels(&mut self, channels: u16) -> Result<(), SoundError> {
        self.apply(Mutation::Channels(channels))
    }

    pub fn set_frequency(&mut self, frequency: f64) -> Result<(), SoundError> {
        self.apply(Mutation::Frequency(frequency))
    }

    pub fn set_carrier(&mut self, carrier: f64) -> Result<(), SoundError> {
        self.apply(Mutation::Carrier(carrier))
    }

    pub fn set_modulation(&mut self, modulation: f64) -> Result<(), SoundError> {
        self.apply(Mutation::Modulation(modulation))
    }

    pub fn set_method(&mut self, method: AmMethod) -> Result<(), SoundError> {
        self.apply(Mutation::Method(method))
    }

    pub fn set_color(&mut self, color: NoiseColor) -> Result<(), SoundError> {
        self.apply(Mutation::Color(color))
    }

    pub fn set_seed(&mut self, seed: u64) -> Result<(), SoundError> {
        self.apply(Mutation::Seed(seed))
    }

    /// Crop a loaded sound to `[tmin, tmax]` seconds of the original file.
    pub fn crop(&mut self, tmin: Option<f64>, tmax: Option<f64>) -> Result<(), SoundError> {
        self.apply(Mutation::Crop { tmin, tmax })
    }

    /// Restore a loaded sound's full length and original volume.
    pub fn reset(&mut self) -> Result<(), SoundError> {
        self.apply(Mutation::Reset)
    }

    // --- Properties ---

    pub fn kind(&self) -> SoundKind {
        self.source.kind()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.params.duration
    }

    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    pub fn volume(&self) -> &Volume {
        &self.params.volume
    }

    pub fn window(&self) -> &Window {
        &self.params.window
    }

    pub fn n_channels(&self) -> u16 {
        self.params.channels
    }

    /// The signal bound to the stream.
    pub fn signal(&self) -> Option<&SignalBuffer> {
        self.engine.buffer()
    }

    /// Sample times in seconds. A cropped sound keeps the times of the
    /// original file.
    pub fn times(&self) -> Vec<f64> {
        match &self.source {
            Source::Synth(_) => times(self.params.duration, self.params.n_frames()),
            Source::File(loaded) => loaded.selected_times(),
        }
    }

    /// Start of the cropped interval, for loaded sounds.
    pub fn tmin(&self) -> Option<f64> {
        match &self.source {
            Source::File(loaded) => Some(loaded.bounds().0),
            Source::Synth(_) => None,
        }
    }

    /// End of the cropped interval, for loaded sounds.
    pub fn tmax(&self) -> Option<f64> {
        match &self.source {
            Source::File(loaded) => Some(loaded.bounds().1),
            Source::Synth(_) => None,
        }
    }

    pub fn device(&self) -> &DeviceConfig {
        self.engine.config()
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    // --- Export ---

    /// Write the current signal as a float WAV file.
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<(), SoundError> {
        let path = path.as_ref();
        if path.exists() && !overwrite {
            return Err(SoundError::FileExists(path.to_path_buf()));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("wav") {
            log::warn!("saving {} as WAV despite its extension", path.display());
        }
        let buffer = match self.engine.buffer() {
            Some(buffer) => buffer.clone(),
            None => self.source.render(&self.params)?,
        };
        st_formats::save_wav(path, &buffer, self.params.sample_rate)?;
        log::debug!("sound saved to {}", path.display());
        Ok(())
    }
}

pub(crate) fn open_bound(
    host: Arc<dyn AudioHost>,
    config: DeviceConfig,
    block_size: BlockSize,
    clock: Arc<dyn Clock>,
    buffer: SignalBuffer,
) -> Result<PlaybackEngine, SoundError> {
    let mut engine = PlaybackEngine::open_with_clock(host, config, block_size, clock)?;
    engine.bind(buffer)?;
    Ok(engine)
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:.3} s @ {} Hz | volume {} | {} ch",
            self.source.kind(),
            self.params.duration,
            self.params.sample_rate,
            self.params.volume,
            self.params.channels
        )
    }
}

impl fmt::Debug for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sound")
            .field("source", &self.source)
            .field("params", &self.params)
            .field("host", &self.host.name())
            .field("device", &self.engine.config().index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoundBuilder;
    use st_engine::{CallbackTiming, ManualClock, OfflineHost};

    fn rig() -> (Arc<OfflineHost>, Arc<ManualClock>) {
        (
            Arc::new(OfflineHost::with_device("test", 44100, 2)),
            Arc::new(ManualClock::new()),
        )
    }

    fn tone(host: &Arc<OfflineHost>, clock: &Arc<ManualClock>) -> Sound {
        SoundBuilder::tone(440.0)
            .duration(0.1)
            .host(host.clone())
            .clock(clock.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn defaults_follow_the_device() {
        let (host, clock) = rig();
        let sound = tone(&host, &clock);
        assert_eq!(sound.sample_rate(), 44100);
        assert_eq!(sound.n_channels(), 1);
        assert_eq!(sound.volume(), &Volume::uniform(10.0));
        assert_eq!(sound.signal().unwrap().frames(), 4410);
        assert!((sound.signal().unwrap().peak() - 0.1).abs() < 1e-4);
        assert_eq!(sound.times().len(), 4410);
    }

    #[test]
    fn mutation_rebinds_the_signal() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        sound.set_volume(50.0).unwrap();
        sound.set_channels(2).unwrap();
        let signal = sound.signal().unwrap();
        assert_eq!(signal.channels(), 2);
        assert!((signal.channel_peak(1) - 0.5).abs() < 1e-4);
        assert_eq!(host.stream_spec().unwrap().channels, 2);
    }

    #[test]
    fn failed_mutation_keeps_previous_state() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        assert!(matches!(sound.set_channels(3), Err(SoundError::Config(_))));
        assert!(matches!(sound.set_duration(-1.0), Err(SoundError::Signal(_))));
        assert!(matches!(sound.set_volume(150.0), Err(SoundError::Signal(_))));
        assert_eq!(sound.n_channels(), 1);
        assert_eq!(sound.duration(), 0.1);
        assert_eq!(sound.signal().unwrap().frames(), 4410);
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        assert!(matches!(
            sound.set_carrier(1000.0),
            Err(SoundError::WrongKind { property: "carrier frequency", .. })
        ));
        assert!(matches!(sound.crop(None, None), Err(SoundError::WrongKind { .. })));
        sound.set_frequency(1000.0).unwrap();
        assert_eq!(sound.kind(), SoundKind::tone(1000.0));
    }

    #[test]
    fn sample_rate_change_reopens_the_stream() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        assert_eq!(host.streams_opened(), 1);
        sound.set_sample_rate(48000).unwrap();
        assert_eq!(sound.sample_rate(), 48000);
        assert_eq!(sound.device().sample_rate(), 48000);
        assert_eq!(host.stream_spec().unwrap().sample_rate, 48000);
        assert_eq!(sound.signal().unwrap().frames(), 4800);
    }

    #[test]
    fn failed_reopen_restores_previous_stream() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        host.fail_next_open();
        assert!(sound.set_sample_rate(48000).is_err());
        assert_eq!(sound.sample_rate(), 44100);
        assert_eq!(host.stream_spec().unwrap().sample_rate, 44100);
        sound.play(None, false).unwrap();
        assert!(sound.is_armed());
    }

    #[test]
    fn plays_on_schedule() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        sound.play(Some(0.5), false).unwrap();
        let silent = host.pull(64, CallbackTiming::default()).unwrap();
        assert!(silent.iter().all(|&s| s == 0.0));

        clock.advance(0.5);
        let out = host.pull(64, CallbackTiming::default()).unwrap();
        assert_eq!(out, sound.signal().unwrap().as_interleaved()[..64].to_vec());
        assert!(sound.stop().unwrap());
        assert!(!sound.stop().unwrap());
    }

    #[test]
    fn closed_sound_cannot_play() {
        let (host, clock) = rig();
        let mut sound = tone(&host, &clock);
        sound.close();
        assert!(sound.play(None, false).is_err());
        assert_eq!(host.stream_spec(), None);
    }
}
