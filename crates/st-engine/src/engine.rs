//! Playback engine: owns one output stream and the state it shares with
//! the callback.

use std::hint;
use std::sync::Arc;

use st_signal::SignalBuffer;

use crate::clock::{Clock, MonotonicClock};
use crate::device::{BlockSize, DeviceConfig};
use crate::error::EngineError;
use crate::fault::{fault_queue, FaultReceiver, RtFault};
use crate::host::{AudioHost, CallbackTiming, OutputStream, RenderFn, StreamSpec};
use crate::renderer::Renderer;
use crate::sleep::sleep;
use crate::state::Transport;

/// Fraction of the expected playback time a blocking `play` sleeps
/// before polling for completion.
const BLOCKING_SLEEP_FRACTION: f64 = 0.95;

/// A stream carrying one bound buffer.
struct Binding {
    buffer: Arc<SignalBuffer>,
    transport: Arc<Transport>,
    faults: FaultReceiver,
    stream: Box<dyn OutputStream>,
}

enum State {
    /// Open, but no buffer bound and no stream running.
    Unbound,
    Bound(Binding),
    Closed,
}

/// Plays one bound [`SignalBuffer`] at scheduled times.
///
/// `play` only records a target time; the stream callback starts
/// copying frames once the clock, corrected by the host's output
/// latency, reaches it. Rebinding a buffer replaces the stream.
pub struct PlaybackEngine {
    host: Arc<dyn AudioHost>,
    config: DeviceConfig,
    block_size: BlockSize,
    clock: Arc<dyn Clock>,
    state: State,
    pending_faults: Vec<RtFault>,
}

impl PlaybackEngine {
    /// Open an engine on a resolved device, timed by a fresh
    /// [`MonotonicClock`].
    pub fn open(
        host: Arc<dyn AudioHost>,
        config: DeviceConfig,
        block_size: BlockSize,
    ) -> Result<Self, EngineError> {
        Self::open_with_clock(host, config, block_size, Arc::new(MonotonicClock::new()))
    }

    /// Open an engine using `clock` as the time authority.
    pub fn open_with_clock(
        host: Arc<dyn AudioHost>,
        config: DeviceConfig,
        block_size: BlockSize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        log::debug!(
            "opening playback engine on {} device {} at {} Hz, block size {}",
            host.name(),
            config.index(),
            config.sample_rate(),
            block_size
        );
        Ok(Self {
            host,
            config,
            block_size,
            clock,
            state: State::Unbound,
            pending_faults: Vec::new(),
        })
    }

    /// Bind a buffer, replacing any previous one.
    ///
    /// The channel count is checked before anything else changes. An
    /// armed pass is stopped. If the new stream cannot be opened, the
    /// previous buffer is bound again and the error is returned.
    pub fn bind(&mut self, buffer: SignalBuffer) -> Result<(), EngineError> {
        if matches!(self.state, State::Closed) {
            return Err(EngineError::Closed);
        }
        self.config.check_channels(buffer.channels())?;
        self.collect_faults();

        let previous = match std::mem::replace(&mut self.state, State::Unbound) {
            State::Bound(binding) => {
                if binding.transport.disarm() {
                    log::debug!("stopping on-going playback to bind a new signal");
                }
                let previous = binding.buffer.clone();
                self.release(binding);
                Some(previous)
            }
            _ => None,
        };

        match self.start_stream(Arc::new(buffer)) {
            Ok(binding) => {
                self.state = State::Bound(binding);
                Ok(())
            }
            Err(err) => {
                log::error!("failed to open a stream for the new signal: {}", err);
                if let Some(previous) = previous {
                    match self.start_stream(previous) {
                        Ok(binding) => self.state = State::Bound(binding),
                        Err(restore) => log::error!("failed to restore the previous signal: {}", restore),
                    }
                }
                Err(err)
            }
        }
    }

    fn start_stream(&self, buffer: Arc<SignalBuffer>) -> Result<Binding, EngineError> {
        let spec = StreamSpec {
            device: self.config.index(),
            sample_rate: self.config.sample_rate(),
            channels: buffer.channels(),
            block_size: self.block_size,
        };
        let transport = Arc::new(Transport::new());
        let (tx, faults) = fault_queue();
        let mut renderer = Renderer::new(buffer.clone(), transport.clone(), self.clock.clone(), tx);
        let render: RenderFn = Box::new(move |out: &mut [f32], timing: &CallbackTiming| {
            renderer.process(out, timing);
        });

        let mut stream = self.host.open_stream(&spec, render)?;
        stream.start()?;
        log::debug!(
            "stream started: {} frames x {} channels",
            buffer.frames(),
            buffer.channels()
        );
        Ok(Binding {
            buffer,
            transport,
            faults,
            stream,
        })
    }

    fn release(&mut self, mut binding: Binding) {
        if let Err(err) = binding.stream.stop() {
            log::warn!("failed to stop the audio stream: {}", err);
        }
        let seen = self.pending_faults.len();
        binding.faults.drain(&mut self.pending_faults);
        self.log_new_faults(seen);
    }

    /// Arm playback to start `when` seconds from now (`None` means now).
    ///
    /// With `blocking`, the calling thread waits until the pass ends:
    /// it sleeps through most of the expected time, then polls.
    pub fn play(&mut self, when: Option<f64>, blocking: bool) -> Result<(), EngineError> {
        let when = when.unwrap_or(0.0);
        if !(when.is_finite() && when >= 0.0) {
            return Err(EngineError::InvalidWhen(when));
        }
        self.collect_faults();
        let binding = self.binding()?;
        if binding.transport.is_armed() {
            return Err(EngineError::PlaybackInProgress);
        }
        let target = self
            .clock
            .get_time_ns()
            .saturating_add((when * 1e9) as i64);
        binding.transport.arm(target);

        if blocking {
            let wait = when + binding.buffer.duration(self.config.sample_rate());
            let transport = binding.transport.clone();
            sleep(BLOCKING_SLEEP_FRACTION * wait);
            while transport.is_armed() {
                hint::spin_loop();
            }
        }
        Ok(())
    }

    /// Stop playback immediately. Returns whether a pass was interrupted;
    /// stopping an idle engine only warns.
    pub fn stop(&mut self) -> Result<bool, EngineError> {
        self.collect_faults();
        let interrupted = self.binding()?.transport.disarm();
        if !interrupted {
            log::warn!("the audio playback was not on-going");
        }
        Ok(interrupted)
    }

    /// Stop and release the stream. Later calls are no-ops.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Bound(binding) => {
                if binding.transport.is_armed() {
                    log::warn!("the audio playback was on-going");
                }
                self.release(binding);
                log::debug!("playback engine closed");
            }
            State::Unbound => log::debug!("playback engine closed"),
            State::Closed => {}
        }
    }

    /// Whether a pass is armed or running.
    pub fn is_armed(&self) -> bool {
        match &self.state {
            State::Bound(b) => b.transport.is_armed(),
            _ => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Target time of the armed pass, in clock nanoseconds.
    pub fn target_ns(&self) -> Option<i64> {
        match &self.state {
            State::Bound(b) => b.transport.target_ns(),
            _ => None,
        }
    }

    /// Last frame cursor published by the callback.
    pub fn cursor(&self) -> usize {
        match &self.state {
            State::Bound(b) => b.transport.cursor(),
            _ => 0,
        }
    }

    pub fn buffer(&self) -> Option<&SignalBuffer> {
        match &self.state {
            State::Bound(b) => Some(&b.buffer),
            _ => None,
        }
    }

    /// Duration of the bound buffer in seconds.
    pub fn duration(&self) -> Option<f64> {
        self.buffer().map(|b| b.duration(self.config.sample_rate()))
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate()
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Drain the faults raised by the callback since the last call.
    pub fn take_faults(&mut self) -> Vec<RtFault> {
        self.collect_faults();
        std::mem::take(&mut self.pending_faults)
    }

    fn binding(&self) -> Result<&Binding, EngineError> {
        match &self.state {
            State::Bound(b) => Ok(b),
            State::Unbound => Err(EngineError::NotInitialized),
            State::Closed => Err(EngineError::Closed),
        }
    }

    fn collect_faults(&mut self) {
        let seen = self.pending_faults.len();
        if let State::Bound(b) = &mut self.state {
            b.faults.drain(&mut self.pending_faults);
        }
        self.log_new_faults(seen);
    }

    fn log_new_faults(&self, seen: usize) {
        for fault in self.pending_faults.iter().skip(seen) {
            log::warn!("{}", fault);
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::device::{DeviceRequest, DeviceTable};
    use crate::error::ConfigError;
    use crate::offline::OfflineHost;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Panics on every read while tripped.
    #[derive(Default)]
    struct TrippedClock(AtomicBool);

    impl TrippedClock {
        fn trip(&self, tripped: bool) {
            self.0.store(tripped, Ordering::Relaxed);
        }
    }

    impl Clock for TrippedClock {
        fn get_time_ns(&self) -> i64 {
            if self.0.load(Ordering::Relaxed) {
                panic!("clock read failed");
            }
            0
        }

        fn reset(&self) {}

        fn t0_ns(&self) -> i64 {
            0
        }
    }

    fn setup() -> (Arc<OfflineHost>, Arc<ManualClock>, PlaybackEngine) {
        let host = Arc::new(OfflineHost::with_device("test", 44100, 2));
        let clock = Arc::new(ManualClock::new());
        let table: DeviceTable = host.devices().unwrap();
        let config = DeviceConfig::resolve(&table, &DeviceRequest::default()).unwrap();
        let engine =
            PlaybackEngine::open_with_clock(host.clone(), config, BlockSize::Fixed(4), clock.clone())
                .unwrap();
        (host, clock, engine)
    }

    fn ramp(frames: usize, channels: u16) -> SignalBuffer {
        let n = frames * channels as usize;
        SignalBuffer::from_interleaved((0..n).map(|i| (i + 1) as f32 / n as f32).collect(), channels)
            .unwrap()
    }

    #[test]
    fn unbound_engine_rejects_playback() {
        let (_, _, mut engine) = setup();
        assert!(matches!(engine.play(None, false), Err(EngineError::NotInitialized)));
        assert!(matches!(engine.stop(), Err(EngineError::NotInitialized)));
        assert!(!engine.is_armed());
    }

    #[test]
    fn bind_opens_running_stream() {
        let (host, _, mut engine) = setup();
        engine.bind(ramp(8, 2)).unwrap();
        assert!(host.is_running());
        assert_eq!(host.stream_spec().map(|s| s.channels), Some(2));
        assert_eq!(engine.duration(), Some(8.0 / 44100.0));
    }

    #[test]
    fn play_arms_at_clock_plus_when() {
        let (_, clock, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        clock.set_ns(1_000);
        engine.play(Some(0.5), false).unwrap();
        assert_eq!(engine.target_ns(), Some(500_001_000));
        assert!(engine.is_armed());
    }

    #[test]
    fn invalid_when_rejected() {
        let (_, _, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        for when in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(engine.play(Some(when), false), Err(EngineError::InvalidWhen(_))));
        }
        assert!(!engine.is_armed());
        engine.play(Some(0.0), false).unwrap();
    }

    #[test]
    fn second_play_rejected_and_first_untouched() {
        let (_, _, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        engine.play(Some(1.0), false).unwrap();
        let target = engine.target_ns();
        let err = engine.play(None, false).unwrap_err();
        assert!(matches!(err, EngineError::PlaybackInProgress));
        assert!(err.is_usage());
        assert_eq!(engine.target_ns(), target);
    }

    #[test]
    fn second_play_mid_pass_keeps_cursor() {
        let (host, _, mut engine) = setup();
        let buffer = ramp(16, 1);
        engine.bind(buffer.clone()).unwrap();
        engine.play(None, false).unwrap();
        host.pull(4, CallbackTiming::default()).unwrap();
        assert_eq!(engine.cursor(), 4);

        assert!(matches!(engine.play(None, false), Err(EngineError::PlaybackInProgress)));
        assert_eq!(engine.cursor(), 4);
        let next = host.pull(4, CallbackTiming::default()).unwrap();
        assert_eq!(next, buffer.as_interleaved()[4..8].to_vec());
        assert_eq!(engine.cursor(), 8);
    }

    #[test]
    fn callback_panic_silences_and_disarms() {
        let host = Arc::new(OfflineHost::with_device("test", 44100, 1));
        let clock = Arc::new(TrippedClock::default());
        let config = DeviceConfig::resolve(&host.devices().unwrap(), &DeviceRequest::default())
            .unwrap();
        let mut engine =
            PlaybackEngine::open_with_clock(host.clone(), config, BlockSize::Fixed(4), clock.clone())
                .unwrap();
        let buffer = ramp(16, 1);
        engine.bind(buffer.clone()).unwrap();
        engine.play(None, false).unwrap();

        clock.trip(true);
        let out = host.pull(4, CallbackTiming::default()).unwrap();
        assert_eq!(out, vec![0.0; 4]);
        assert_eq!(engine.take_faults(), vec![RtFault::Panicked]);
        assert!(!engine.is_armed());
        assert_eq!(engine.cursor(), 0);

        // nothing is replayed after the fault
        let out = host.pull(4, CallbackTiming::default()).unwrap();
        assert_eq!(out, vec![0.0; 4]);
        assert!(engine.take_faults().is_empty());

        clock.trip(false);
        engine.play(None, false).unwrap();
        let out = host.pull(4, CallbackTiming::default()).unwrap();
        assert_eq!(out, buffer.as_interleaved()[..4].to_vec());
    }

    #[test]
    fn stop_is_idempotent() {
        let (_, _, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        assert!(!engine.stop().unwrap());
        engine.play(Some(1.0), false).unwrap();
        assert!(engine.stop().unwrap());
        assert!(!engine.stop().unwrap());
        assert!(!engine.is_armed());
    }

    #[test]
    fn channel_mismatch_keeps_binding() {
        let (host, _, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        let err = engine.bind(ramp(8, 3)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::UnsupportedChannels { requested: 3, .. })
        ));
        assert_eq!(engine.buffer().map(|b| b.channels()), Some(1));
        assert_eq!(host.streams_opened(), 1);
    }

    #[test]
    fn failed_rebind_restores_previous() {
        let (host, _, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        host.fail_next_open();
        assert!(matches!(engine.bind(ramp(16, 2)), Err(EngineError::Host(_))));
        assert_eq!(engine.buffer().map(|b| b.frames()), Some(8));
        assert!(host.is_running());
    }

    #[test]
    fn close_is_idempotent() {
        let (host, _, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();
        engine.play(None, false).unwrap();
        engine.close();
        engine.close();
        assert!(engine.is_closed());
        assert_eq!(host.stream_spec(), None);
        assert!(matches!(engine.play(None, false), Err(EngineError::Closed)));
        assert!(matches!(engine.bind(ramp(8, 1)), Err(EngineError::Closed)));
    }

    #[test]
    fn faults_surface_on_control_side() {
        let (host, _, mut engine) = setup();
        engine.bind(ramp(8, 2)).unwrap();
        let mut odd = vec![0.0; 3];
        assert!(host.pull_into(&mut odd, CallbackTiming::default()));
        assert_eq!(
            engine.take_faults(),
            vec![RtFault::MisalignedOutput { samples: 3, channels: 2 }]
        );
        assert!(engine.take_faults().is_empty());
    }

    #[test]
    fn blocking_play_returns_after_completion() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let (host, clock, mut engine) = setup();
        engine.bind(ramp(8, 1)).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let puller = {
            let (host, clock, done) = (host.clone(), clock.clone(), done.clone());
            std::thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    clock.advance_ns(1_000_000);
                    host.pull(4, CallbackTiming::default());
                    std::thread::sleep(std::time::Duration::from_micros(100));
                }
            })
        };
        engine.play(None, true).unwrap();
        assert!(!engine.is_armed());
        done.store(true, Ordering::Relaxed);
        puller.join().unwrap();
    }
}
