//! Camera settings (`[camera]` section of the scanner config).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::DetectionTiming;
use crate::device::VideoConstraints;

/// Camera and detection knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device URI. `stub://<codes>` selects the synthetic camera; unset
    /// means no capture device.
    pub device: Option<String>,

    /// Native strategy frame tick (milliseconds).
    pub frame_interval_ms: u64,

    /// Sampling strategy period (milliseconds).
    pub sampling_interval_ms: u64,

    pub ideal_width: u32,
    pub ideal_height: u32,

    /// Use the device's decoder as a native primitive. When false it is
    /// treated as an external library behind the sampling strategy.
    pub native_decoder: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            device: None,
            frame_interval_ms: 16,
            sampling_interval_ms: 2000,
            ideal_width: 1280,
            ideal_height: 720,
            native_decoder: true,
        }
    }
}

impl CameraSettings {
    pub fn timing(&self) -> DetectionTiming {
        DetectionTiming {
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            sampling_interval: Duration::from_millis(self.sampling_interval_ms),
        }
    }

    pub fn primary_constraints(&self) -> VideoConstraints {
        VideoConstraints::primary(self.ideal_width, self.ideal_height)
    }

    /// Validates the settings, returning a message for the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_interval_ms == 0 {
            return Err("frame_interval_ms must be greater than 0".into());
        }
        if self.sampling_interval_ms == 0 {
            return Err("sampling_interval_ms must be greater than 0".into());
        }
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err("ideal_width and ideal_height must be greater than 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CameraSettings::default();

        assert_eq!(settings.timing(), DetectionTiming::default());
        assert_eq!(settings.primary_constraints(), VideoConstraints::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = CameraSettings {
            sampling_interval_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
