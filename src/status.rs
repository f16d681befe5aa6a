use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants::touch_defaults;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3f {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Acceleration (g) and angular rate (deg/s) in the device's native frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionStatus {
    pub accel: Vec3f,
    pub gyro: Vec3f,
}

/// Touch position normalized to `[0, 1]` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchStatus {
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

/// Raw coordinate range a touch panel reports.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationData {
    pub min_x: u16,
    pub min_y: u16,
    pub max_x: u16,
    pub max_y: u16,
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self {
            min_x: touch_defaults::MIN_X,
            min_y: touch_defaults::MIN_Y,
            max_x: touch_defaults::MAX_X,
            max_y: touch_defaults::MAX_Y,
        }
    }
}

impl CalibrationData {
    /// Clamps a raw sample into the calibrated box and rescales it to the unit square.
    pub fn normalize(&self, x: u16, y: u16) -> (f32, f32) {
        (
            rescale(x, self.min_x, self.max_x),
            rescale(y, self.min_y, self.max_y),
        )
    }
}

#[inline]
fn rescale(raw: u16, min: u16, max: u16) -> f32 {
    if max <= min {
        return 0.0;
    }
    f32::from(raw.clamp(min, max) - min) / f32::from(max - min)
}

/// Everything a reader sees at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusSnapshot {
    pub motion: MotionStatus,
    pub touch: TouchStatus,
}

#[derive(Debug, Default)]
struct Inner {
    motion: MotionStatus,
    touch: TouchStatus,
    calibration: Option<CalibrationData>,
}

/// Latest motion/touch state, written by the client and read by device adapters.
#[derive(Debug, Default)]
pub struct DeviceStatus {
    inner: Mutex<Inner>,
}

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        StatusSnapshot {
            motion: inner.motion,
            touch: inner.touch,
        }
    }

    pub fn motion(&self) -> MotionStatus {
        self.inner.lock().motion
    }

    pub fn touch(&self) -> TouchStatus {
        self.inner.lock().touch
    }

    pub fn calibration(&self) -> Option<CalibrationData> {
        self.inner.lock().calibration
    }

    pub fn set_calibration(&self, calibration: Option<CalibrationData>) {
        self.inner.lock().calibration = calibration;
    }

    /// Publishes one sample. `raw_touch` is the active touch point in panel units, if any;
    /// it only counts as a touch once a calibration has been published.
    pub(crate) fn update(&self, motion: MotionStatus, raw_touch: Option<(u16, u16)>) {
        let mut inner = self.inner.lock();
        inner.motion = motion;
        inner.touch = match (raw_touch, inner.calibration) {
            (Some((x, y)), Some(calibration)) => {
                let (x, y) = calibration.normalize(x, y);
                TouchStatus { x, y, active: true }
            }
            _ => TouchStatus::default(),
        };
    }
}
