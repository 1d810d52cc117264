//! Device table snapshot and configuration resolution.

use std::fmt;

use crate::error::ConfigError;

/// One output device as reported by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub default_sample_rate: u32,
    pub max_output_channels: u16,
    /// Suggested output latency for interactive use, in seconds.
    pub default_low_output_latency: f64,
}

/// Snapshot of the host's output devices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceTable {
    pub devices: Vec<DeviceInfo>,
    /// Index of the system default output device, if any.
    pub default_output: Option<usize>,
}

impl DeviceTable {
    pub fn new(devices: Vec<DeviceInfo>, default_output: Option<usize>) -> Self {
        Self {
            devices,
            default_output,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DeviceInfo> {
        self.devices.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.iter()
    }
}

impl fmt::Display for DeviceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dev in &self.devices {
            let marker = if self.default_output == Some(dev.index) { '>' } else { ' ' };
            writeln!(
                f,
                "{} {:>2} {} ({} out), {} Hz, {:.1} ms",
                marker,
                dev.index,
                dev.name,
                dev.max_output_channels,
                dev.default_sample_rate,
                dev.default_low_output_latency * 1e3
            )?;
        }
        Ok(())
    }
}

/// Frames requested per callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlockSize {
    /// Let the host pick an optimal, possibly varying, size.
    #[default]
    HostOptimal,
    Fixed(u32),
}

impl BlockSize {
    pub const MAX: u32 = 16384;

    /// Interpret a frame count, where 0 means host-optimal.
    pub fn from_frames(frames: i64) -> Result<Self, ConfigError> {
        if frames < 0 {
            return Err(ConfigError::NegativeBlockSize(frames));
        }
        if frames > Self::MAX as i64 {
            return Err(ConfigError::BlockSizeTooLarge {
                given: frames,
                max: Self::MAX,
            });
        }
        Ok(match frames {
            0 => BlockSize::HostOptimal,
            n => BlockSize::Fixed(n as u32),
        })
    }

    pub fn frames(self) -> Option<u32> {
        match self {
            BlockSize::HostOptimal => None,
            BlockSize::Fixed(n) => Some(n),
        }
    }
}

impl TryFrom<i64> for BlockSize {
    type Error = ConfigError;

    fn try_from(frames: i64) -> Result<Self, Self::Error> {
        Self::from_frames(frames)
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockSize::HostOptimal => write!(f, "host-optimal"),
            BlockSize::Fixed(n) => write!(f, "{} frames", n),
        }
    }
}

/// What the caller asked for; `None` means "use the default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceRequest {
    pub device: Option<usize>,
    pub sample_rate: Option<u32>,
}

impl DeviceRequest {
    pub fn new(device: Option<usize>, sample_rate: Option<u32>) -> Self {
        Self {
            device,
            sample_rate,
        }
    }
}

/// A device and sample rate checked against the device table.
///
/// Immutable once resolved: a different sample rate needs a new
/// configuration and a new stream.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    device: DeviceInfo,
    sample_rate: u32,
}

impl DeviceConfig {
    /// Resolve `request` against `table`.
    pub fn resolve(table: &DeviceTable, request: &DeviceRequest) -> Result<Self, ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::NoDevice);
        }
        let index = match request.device {
            Some(index) => index,
            None => table.default_output.ok_or(ConfigError::NoDevice)?,
        };
        let device = table.get(index).ok_or(ConfigError::InvalidDevice {
            index,
            count: table.len(),
        })?;
        if device.max_output_channels == 0 {
            return Err(ConfigError::NoOutputChannels {
                index,
                name: device.name.clone(),
            });
        }

        let sample_rate = match request.sample_rate {
            None => device.default_sample_rate,
            Some(0) => return Err(ConfigError::SampleRate),
            Some(rate) => rate,
        };
        let config = Self {
            device: device.clone(),
            sample_rate,
        };
        if config.sample_rate_mismatch() {
            log::warn!(
                "the sample rate ({}) differs from the default sample rate of device '{}: {}' ({})",
                sample_rate,
                index,
                device.name,
                device.default_sample_rate
            );
        }
        log::debug!("selected device {}: {} at {} Hz", index, device.name, sample_rate);
        Ok(config)
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn index(&self) -> usize {
        self.device.index
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn default_sample_rate(&self) -> u32 {
        self.device.default_sample_rate
    }

    pub fn max_output_channels(&self) -> u16 {
        self.device.max_output_channels
    }

    /// Whether the chosen rate differs from the device default.
    pub fn sample_rate_mismatch(&self) -> bool {
        self.sample_rate != self.device.default_sample_rate
    }

    /// Check that a signal with `channels` channels fits this device.
    pub fn check_channels(&self, channels: u16) -> Result<(), ConfigError> {
        if channels > self.device.max_output_channels {
            return Err(ConfigError::UnsupportedChannels {
                index: self.device.index,
                name: self.device.name.clone(),
                requested: channels,
                max: self.device.max_output_channels,
            });
        }
        Ok(())
    }
}
