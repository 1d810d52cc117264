//! Sounds read from disk.
//!
//! The file is normalized once at load time: globally to a peak of 1,
//! then channel by channel. The per-channel peaks relative to the
//! loudest channel become the sound's original volume, so playing it
//! back at that volume reproduces the file. Cropping selects a closed
//! time interval of the original samples.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use st_formats::WavData;
use st_signal::{times, SignalBuffer, SignalError, Volume, Window};

use crate::error::SoundError;

#[derive(Clone, Debug)]
pub(crate) struct LoadedSignal {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    /// Channel-normalized samples, interleaved.
    samples: Arc<[f32]>,
    frames: usize,
    volume: Volume,
    /// Selected frames, both ends included.
    crop: Option<(usize, usize)>,
}

impl LoadedSignal {
    pub(crate) fn read(path: &Path) -> Result<Self, SoundError> {
        let wav = st_formats::read_wav(path)?;
        Self::from_wav(path.to_path_buf(), wav)
    }

    pub(crate) fn from_wav(path: PathBuf, wav: WavData) -> Result<Self, SoundError> {
        if wav.sample_rate == 0 {
            return Err(SignalError::SampleRate.into());
        }
        if wav.channels == 0 {
            return Err(SignalError::NoChannels.into());
        }
        let frames = wav.frames();
        if frames == 0 {
            return Err(SignalError::Empty.into());
        }

        let ch = wav.channels as usize;
        let mut samples = wav.samples;
        samples.truncate(frames * ch);

        let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        let mut peaks = vec![0.0f32; ch];
        for frame in samples.chunks_exact(ch) {
            for (p, &s) in peaks.iter_mut().zip(frame) {
                *p = p.max(s.abs());
            }
        }

        let volumes: Vec<f32> = if peak > 0.0 {
            peaks.iter().map(|&p| p / peak * Volume::MAX).collect()
        } else {
            log::warn!("the loaded sound {} is silent", path.display());
            vec![0.0; ch]
        };
        for frame in samples.chunks_exact_mut(ch) {
            for (s, &p) in frame.iter_mut().zip(&peaks) {
                if p > 0.0 {
                    *s /= p;
                }
            }
        }

        log::debug!(
            "loaded {} ({} frames x {} channels at {} Hz)",
            path.display(),
            frames,
            ch,
            wav.sample_rate
        );
        Ok(Self {
            path,
            sample_rate: wav.sample_rate,
            channels: wav.channels,
            samples: samples.into(),
            frames,
            volume: Volume::per_channel(volumes),
            crop: None,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub(crate) fn channels(&self) -> u16 {
        self.channels
    }

    /// The per-channel volume recovered from the file.
    pub(crate) fn original_volume(&self) -> &Volume {
        &self.volume
    }

    fn original_duration(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    fn original_times(&self) -> Vec<f64> {
        times(self.original_duration(), self.frames)
    }

    /// Selected frame range, both ends included.
    pub(crate) fn range(&self) -> (usize, usize) {
        self.crop.unwrap_or((0, self.frames - 1))
    }

    pub(crate) fn selected_frames(&self) -> usize {
        let (start, end) = self.range();
        end - start + 1
    }

    pub(crate) fn duration(&self) -> f64 {
        self.selected_frames() as f64 / self.sample_rate as f64
    }

    /// Time of the first and last selected samples on the original time
    /// axis.
    pub(crate) fn bounds(&self) -> (f64, f64) {
        let t = self.original_times();
        let (start, end) = self.range();
        (t[start], t[end])
    }

    /// Original times of the selected samples.
    pub(crate) fn selected_times(&self) -> Vec<f64> {
        let (start, end) = self.range();
        let mut t = self.original_times();
        t.truncate(end + 1);
        t.drain(..start);
        t
    }

    /// Keep the samples whose time lies in `[tmin, tmax]`. A missing or
    /// non-finite bound extends to that end of the file.
    pub(crate) fn crop(&mut self, tmin: Option<f64>, tmax: Option<f64>) -> Result<(), SoundError> {
        let t = self.original_times();
        let last = t[t.len() - 1];
        let lo = tmin.filter(|v| v.is_finite()).unwrap_or(0.0);
        let hi = tmax.filter(|v| v.is_finite()).unwrap_or(last);
        let invalid = SoundError::InvalidCrop {
            tmin: lo,
            tmax: hi,
            end: last,
        };
        if lo < 0.0 || hi > last || lo > hi {
            return Err(invalid);
        }
        let start = t.iter().position(|&x| x >= lo);
        let end = t.iter().rposition(|&x| x <= hi);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => {
                self.crop = Some((start, end));
                Ok(())
            }
            _ => Err(invalid),
        }
    }

    pub(crate) fn reset_crop(&mut self) {
        self.crop = None;
    }

    /// Build the playable buffer for the current crop.
    pub(crate) fn render(&self, volume: &Volume, window: &Window) -> Result<SignalBuffer, SoundError> {
        let gains = volume.gains(self.channels)?;
        let (start, end) = self.range();
        let n = end - start + 1;
        let ch = self.channels as usize;
        let envelope = window.samples(n)?;

        let mut data = Vec::with_capacity(n * ch);
        let selected = &self.samples[start * ch..(end + 1) * ch];
        for (frame, &w) in selected.chunks_exact(ch).zip(&envelope) {
            data.extend(frame.iter().zip(&gains).map(|(&s, &g)| s * g * w));
        }
        Ok(SignalBuffer::from_interleaved(data, self.channels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(left_peak: f32, right_peak: f32, frames: usize) -> LoadedSignal {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let s = if i % 2 == 0 { 1.0 } else { -1.0 };
            samples.push(s * left_peak);
            samples.push(s * right_peak);
        }
        let wav = WavData {
            sample_rate: 10,
            channels: 2,
            samples,
        };
        LoadedSignal::from_wav(PathBuf::from("test.wav"), wav).unwrap()
    }

    #[test]
    fn volume_recovered_from_channel_peaks() {
        let sig = stereo(0.5, 0.25, 10);
        assert_eq!(sig.original_volume(), &Volume::per_channel(vec![100.0, 50.0]));
        let buf = sig.render(&Volume::uniform(100.0), &Window::Rectangular).unwrap();
        assert_eq!(buf.channel_peak(0), 1.0);
        assert_eq!(buf.channel_peak(1), 1.0);
    }

    #[test]
    fn original_volume_reproduces_relative_levels() {
        let sig = stereo(0.5, 0.25, 10);
        let buf = sig.render(sig.original_volume(), &Window::Rectangular).unwrap();
        assert_eq!(buf.channel_peak(0), 1.0);
        assert_eq!(buf.channel_peak(1), 0.5);
    }

    #[test]
    fn silent_channel_stays_silent() {
        let sig = stereo(0.8, 0.0, 10);
        assert_eq!(sig.original_volume(), &Volume::per_channel(vec![100.0, 0.0]));
        let buf = sig.render(&Volume::uniform(100.0), &Window::Rectangular).unwrap();
        assert_eq!(buf.channel_peak(1), 0.0);
    }

    #[test]
    fn crop_is_a_closed_interval() {
        // 10 frames over 1 s: times are i / 9
        let mut sig = stereo(1.0, 1.0, 10);
        sig.crop(Some(1.0 / 9.0), Some(5.0 / 9.0 + 1e-9)).unwrap();
        assert_eq!(sig.range(), (1, 5));
        assert_eq!(sig.selected_frames(), 5);
        assert!((sig.duration() - 0.5).abs() < 1e-12);
        assert_eq!(sig.selected_times().len(), 5);
        let (tmin, tmax) = sig.bounds();
        assert!((tmin - 1.0 / 9.0).abs() < 1e-12);
        assert!((tmax - 5.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn missing_bounds_extend_to_the_ends() {
        let mut sig = stereo(1.0, 1.0, 10);
        sig.crop(None, Some(f64::NAN)).unwrap();
        assert_eq!(sig.range(), (0, 9));
        sig.crop(Some(0.5), None).unwrap();
        assert_eq!(sig.range(), (5, 9));
        sig.reset_crop();
        assert_eq!(sig.range(), (0, 9));
    }

    #[test]
    fn crop_outside_the_file_is_rejected() {
        let mut sig = stereo(1.0, 1.0, 10);
        assert!(matches!(sig.crop(Some(-0.1), None), Err(SoundError::InvalidCrop { .. })));
        assert!(matches!(sig.crop(None, Some(1.5)), Err(SoundError::InvalidCrop { .. })));
        assert!(matches!(sig.crop(Some(0.6), Some(0.4)), Err(SoundError::InvalidCrop { .. })));
        // between two samples
        assert!(matches!(
            sig.crop(Some(0.12), Some(0.2)),
            Err(SoundError::InvalidCrop { .. })
        ));
        assert_eq!(sig.range(), (0, 9));
    }

    #[test]
    fn empty_file_is_rejected() {
        let wav = WavData {
            sample_rate: 44100,
            channels: 1,
            samples: Vec::new(),
        };
        assert!(matches!(
            LoadedSignal::from_wav(PathBuf::from("empty.wav"), wav),
            Err(SoundError::Signal(SignalError::Empty))
        ));
    }
}
