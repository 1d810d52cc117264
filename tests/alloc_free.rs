//! Allocation-free render path tests.
//!
//! These tests verify that the stream callback does not allocate while
//! it waits for the onset, plays, completes a pass or reports a fault.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use std::sync::Arc;

use st_engine::{BlockSize, CallbackTiming, ManualClock, OfflineHost};
use st_master::{NoiseColor, Sound, SoundBuilder, Window};

const BLOCK: usize = 256;

fn open(builder: SoundBuilder, channels: u16) -> (Sound, Arc<OfflineHost>, Arc<ManualClock>) {
    let host = Arc::new(OfflineHost::with_device("offline", 44100, channels));
    let clock = Arc::new(ManualClock::new());
    let sound = builder
        .channels(channels)
        .block_size(BlockSize::Fixed(BLOCK as u32))
        .host(host.clone())
        .clock(clock.clone())
        .build()
        .unwrap();
    (sound, host, clock)
}

/// Pull `blocks` callbacks, aborting on any heap allocation.
fn assert_pull_alloc_free(host: &OfflineHost, channels: u16, blocks: usize) {
    let mut out = vec![0.0f32; BLOCK * channels as usize];
    assert_no_alloc(|| {
        for _ in 0..blocks {
            host.pull_into(&mut out, CallbackTiming::default());
        }
    });
}

#[test]
fn tone_pass_alloc_free() {
    let (mut sound, host, _clock) = open(SoundBuilder::tone(440.0).duration(1.0), 2);
    sound.play(None, false).unwrap();
    // 1 s at 44.1 kHz spans 173 blocks; keep pulling past completion
    assert_pull_alloc_free(&host, 2, 200);
    assert!(!sound.is_armed());
}

#[test]
fn waiting_for_onset_alloc_free() {
    let (mut sound, host, clock) = open(
        SoundBuilder::noise(NoiseColor::Pink).window(Window::Hann),
        1,
    );
    sound.play(Some(0.5), false).unwrap();
    assert_pull_alloc_free(&host, 1, 50);
    assert!(sound.is_armed());
    clock.advance(0.5);
    assert_pull_alloc_free(&host, 1, 50);
}

#[test]
fn misaligned_callback_alloc_free() {
    let (mut sound, host, _clock) = open(SoundBuilder::tone(440.0), 2);
    sound.play(None, false).unwrap();
    let mut out = vec![0.0f32; 2 * BLOCK - 1];
    assert_no_alloc(|| {
        host.pull_into(&mut out, CallbackTiming::default());
    });
    assert_eq!(sound.take_faults().len(), 1);
}
