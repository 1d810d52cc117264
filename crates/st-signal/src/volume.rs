//! Per-channel volume expressed as a percentage of full scale.

use alloc::vec;
use alloc::vec::Vec;

use crate::SignalError;

/// Playback volume, in percent of full scale (0-100).
#[derive(Clone, Debug, PartialEq)]
pub enum Volume {
    /// Same volume on every channel.
    Uniform(f32),
    /// One value per channel (a single value is broadcast).
    PerChannel(Vec<f32>),
}

impl Volume {
    pub const MAX: f32 = 100.0;

    pub fn uniform(volume: f32) -> Self {
        Volume::Uniform(volume)
    }

    pub fn per_channel(volumes: impl Into<Vec<f32>>) -> Self {
        Volume::PerChannel(volumes.into())
    }

    /// Check the values without reference to a channel count.
    pub fn validate(&self) -> Result<(), SignalError> {
        let values: &[f32] = match self {
            Volume::Uniform(v) => core::slice::from_ref(v),
            Volume::PerChannel(v) => v,
        };
        if values.is_empty() {
            return Err(SignalError::VolumeChannels { given: 0, channels: 0 });
        }
        for &v in values {
            if !(0.0..=Self::MAX).contains(&v) {
                return Err(SignalError::Volume(v));
            }
        }
        Ok(())
    }

    /// Expand to exactly `channels` percentages.
    pub fn resolve(&self, channels: u16) -> Result<Vec<f32>, SignalError> {
        self.validate()?;
        match self {
            Volume::Uniform(v) => Ok(vec![*v; channels as usize]),
            Volume::PerChannel(v) if v.len() == 1 => Ok(vec![v[0]; channels as usize]),
            Volume::PerChannel(v) if v.len() == channels as usize => Ok(v.clone()),
            Volume::PerChannel(v) => Err(SignalError::VolumeChannels {
                given: v.len(),
                channels,
            }),
        }
    }

    /// Linear gains (`volume / 100`) for `channels` channels.
    pub fn gains(&self, channels: u16) -> Result<Vec<f32>, SignalError> {
        Ok(self
            .resolve(channels)?
            .into_iter()
            .map(|v| v / Self::MAX)
            .collect())
    }

    /// The common value when every channel has the same volume.
    pub fn as_uniform(&self) -> Option<f32> {
        match self {
            Volume::Uniform(v) => Some(*v),
            Volume::PerChannel(v) => {
                let first = *v.first()?;
                v.iter().all(|&x| x == first).then_some(first)
            }
        }
    }
}

impl From<f32> for Volume {
    fn from(volume: f32) -> Self {
        Volume::Uniform(volume)
    }
}

impl core::fmt::Display for Volume {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.as_uniform() {
            Some(v) => write!(f, "{:.1}", v),
            None => match self {
                Volume::PerChannel(v) => {
                    write!(f, "(")?;
                    for (i, x) in v.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{:.1}", x)?;
                    }
                    write!(f, ")")
                }
                Volume::Uniform(v) => write!(f, "{:.1}", v),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_expands_to_channels() {
        for volume in [0.0, 50.0, 100.0] {
            for channels in [1, 2] {
                let v = Volume::uniform(volume).resolve(channels).unwrap();
                assert_eq!(v.len(), channels as usize);
                assert!(v.iter().all(|&x| x == volume));
            }
        }
    }

    #[test]
    fn out_of_range_rejected() {
        assert_eq!(Volume::uniform(-10.0).resolve(1), Err(SignalError::Volume(-10.0)));
        assert_eq!(Volume::uniform(110.0).resolve(1), Err(SignalError::Volume(110.0)));
        assert!(Volume::uniform(f32::NAN).validate().is_err());
    }

    #[test]
    fn per_channel_length_must_match() {
        let v = Volume::per_channel(vec![10.0, 20.0]);
        assert_eq!(v.resolve(2).unwrap(), vec![10.0, 20.0]);
        assert_eq!(
            v.resolve(3),
            Err(SignalError::VolumeChannels { given: 2, channels: 3 })
        );
        assert_eq!(Volume::per_channel(vec![30.0]).resolve(3).unwrap(), vec![30.0; 3]);
    }

    #[test]
    fn gains_are_fractions() {
        assert_eq!(Volume::uniform(25.0).gains(2).unwrap(), vec![0.25, 0.25]);
    }

    #[test]
    fn uniform_detection() {
        assert_eq!(Volume::per_channel(vec![5.0, 5.0]).as_uniform(), Some(5.0));
        assert_eq!(Volume::per_channel(vec![5.0, 6.0]).as_uniform(), None);
    }
}
