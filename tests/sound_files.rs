//! Loading, cropping and saving sounds through WAV files.

use std::path::Path;
use std::sync::Arc;

use st_engine::OfflineHost;
use st_formats::{read_wav, save_wav};
use st_master::{Sound, SoundBuilder, SoundError, SoundKind, Volume};
use st_signal::SignalBuffer;

const RATE: u32 = 1000;

fn host() -> Arc<OfflineHost> {
    Arc::new(OfflineHost::with_device("offline", 44100, 2))
}

/// A stereo file of 1001 frames (1 s at 1 kHz, both ends included),
/// left channel at half the right's level.
fn write_fixture(path: &Path) {
    let frames = 1001;
    let mut data = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let s = (i as f32 / 10.0).sin();
        data.push(0.4 * s);
        data.push(0.8 * s);
    }
    let buffer = SignalBuffer::from_interleaved(data, 2).unwrap();
    save_wav(path, &buffer, RATE).unwrap();
}

fn load(path: &Path) -> Sound {
    SoundBuilder::load(path).host(host()).build().unwrap()
}

#[test]
fn loaded_sound_takes_its_properties_from_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stim.wav");
    write_fixture(&path);

    let sound = load(&path);
    assert_eq!(sound.kind(), SoundKind::loaded(&path));
    assert_eq!(sound.sample_rate(), RATE);
    assert_eq!(sound.n_channels(), 2);
    assert!((sound.duration() - 1.001).abs() < 1e-9);
    assert_eq!(sound.tmin(), Some(0.0));

    let Volume::PerChannel(volume) = sound.volume() else {
        panic!("expected per-channel volume");
    };
    assert!((volume[0] - 50.0).abs() < 1e-3);
    assert!((volume[1] - 100.0).abs() < 1e-3);

    // played at its original volume the file is reproduced up to the
    // global peak normalization
    let signal = sound.signal().unwrap();
    assert!((signal.channel_peak(0) - 0.5).abs() < 1e-4);
    assert!((signal.channel_peak(1) - 1.0).abs() < 1e-4);
}

#[test]
fn crop_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stim.wav");
    write_fixture(&path);
    let mut sound = load(&path);

    sound.crop(Some(0.2), Some(0.5)).unwrap();
    assert_eq!(sound.signal().unwrap().frames(), sound.times().len());
    let times = sound.times();
    assert!(times[0] >= 0.2 && times[times.len() - 1] <= 0.5);
    assert!((sound.duration() - 0.3).abs() < 0.003);

    sound.set_volume(25.0).unwrap();
    assert!((sound.signal().unwrap().peak() - 0.25).abs() < 1e-3);

    sound.reset().unwrap();
    assert_eq!(sound.signal().unwrap().frames(), 1001);
    assert!(matches!(sound.volume(), Volume::PerChannel(_)));
}

#[test]
fn invalid_crop_keeps_the_previous_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stim.wav");
    write_fixture(&path);
    let mut sound = load(&path);

    sound.crop(Some(0.1), None).unwrap();
    let frames = sound.signal().unwrap().frames();
    assert!(matches!(
        sound.crop(None, Some(5.0)),
        Err(SoundError::InvalidCrop { .. })
    ));
    assert!(matches!(
        sound.crop(Some(-1.0), None),
        Err(SoundError::InvalidCrop { .. })
    ));
    assert_eq!(sound.signal().unwrap().frames(), frames);
}

#[test]
fn loaded_timing_properties_are_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stim.wav");
    write_fixture(&path);
    let mut sound = load(&path);

    assert!(matches!(sound.set_duration(0.5), Err(SoundError::ReadOnly(_))));
    assert!(matches!(sound.set_sample_rate(48000), Err(SoundError::ReadOnly(_))));
    assert!(matches!(sound.set_channels(1), Err(SoundError::ReadOnly(_))));
    assert!(matches!(
        SoundBuilder::load(&path).duration(0.5).host(host()).build(),
        Err(SoundError::ReadOnly("duration"))
    ));
}

#[test]
fn missing_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = SoundBuilder::load(dir.path().join("missing.wav"))
        .host(host())
        .build();
    assert!(matches!(result, Err(SoundError::Format(_))));
}

#[test]
fn save_refuses_to_overwrite_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("tone.wav");
    let sound = SoundBuilder::tone(250.0)
        .duration(0.01)
        .sample_rate(8000)
        .host(host())
        .build()
        .unwrap();

    sound.save(&path, false).unwrap();
    let wav = read_wav(&path).unwrap();
    assert_eq!(wav.sample_rate, 8000);
    assert_eq!(wav.samples, sound.signal().unwrap().as_interleaved());

    assert!(matches!(
        sound.save(&path, false),
        Err(SoundError::FileExists(_))
    ));
    sound.save(&path, true).unwrap();
}

#[test]
fn saved_sound_loads_back_with_its_volume() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let sound = SoundBuilder::tone(100.0)
        .volume(Volume::per_channel(vec![20.0, 40.0]))
        .channels(2)
        .duration(0.05)
        .host(host())
        .build()
        .unwrap();
    sound.save(&path, false).unwrap();

    let loaded = load(&path);
    let Volume::PerChannel(volume) = loaded.volume() else {
        panic!("expected per-channel volume");
    };
    assert!((volume[0] - 50.0).abs() < 1e-3);
    assert!((volume[1] - 100.0).abs() < 1e-3);
}
