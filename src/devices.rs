//! Device adapters over the shared status, and the registry that hands them out.

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    params::ParamPackage,
    status::{CalibrationData, DeviceStatus, MotionStatus, TouchStatus},
};

pub trait TouchDevice: Send + Sync {
    fn status(&self) -> TouchStatus;
}

pub trait MotionDevice: Send + Sync {
    fn status(&self) -> MotionStatus;
}

/// Builds devices of kind `D` from a binding's parameters.
pub trait Factory<D: ?Sized>: Send + Sync {
    fn create(&self, params: &ParamPackage) -> Box<D>;
}

pub struct UdpTouchDevice {
    status: Arc<DeviceStatus>,
}

impl TouchDevice for UdpTouchDevice {
    fn status(&self) -> TouchStatus {
        self.status.touch()
    }
}

pub struct UdpMotionDevice {
    status: Arc<DeviceStatus>,
}

impl MotionDevice for UdpMotionDevice {
    fn status(&self) -> MotionStatus {
        self.status.motion()
    }
}

pub struct UdpTouchFactory {
    status: Arc<DeviceStatus>,
}

impl UdpTouchFactory {
    pub fn new(status: Arc<DeviceStatus>) -> Self {
        Self { status }
    }
}

impl Factory<dyn TouchDevice> for UdpTouchFactory {
    /// Publishes the binding's `min_x/min_y/max_x/max_y`, falling back to DS4-friendly bounds.
    fn create(&self, params: &ParamPackage) -> Box<dyn TouchDevice> {
        let defaults = CalibrationData::default();
        let calibration = CalibrationData {
            min_x: params.get("min_x", defaults.min_x),
            min_y: params.get("min_y", defaults.min_y),
            max_x: params.get("max_x", defaults.max_x),
            max_y: params.get("max_y", defaults.max_y),
        };
        debug!("Creating UDP touch device with {calibration:?}");
        self.status.set_calibration(Some(calibration));
        Box::new(UdpTouchDevice {
            status: self.status.clone(),
        })
    }
}

pub struct UdpMotionFactory {
    status: Arc<DeviceStatus>,
}

impl UdpMotionFactory {
    pub fn new(status: Arc<DeviceStatus>) -> Self {
        Self { status }
    }
}

impl Factory<dyn MotionDevice> for UdpMotionFactory {
    fn create(&self, _params: &ParamPackage) -> Box<dyn MotionDevice> {
        Box::new(UdpMotionDevice {
            status: self.status.clone(),
        })
    }
}

/// Named factories, looked up through a binding's `engine` parameter.
#[derive(Default)]
pub struct DeviceRegistry {
    touch: HashMap<String, Arc<dyn Factory<dyn TouchDevice>>>,
    motion: HashMap<String, Arc<dyn Factory<dyn MotionDevice>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_touch(&mut self, engine: &str, factory: Arc<dyn Factory<dyn TouchDevice>>) {
        self.touch.insert(engine.to_owned(), factory);
    }

    pub fn register_motion(&mut self, engine: &str, factory: Arc<dyn Factory<dyn MotionDevice>>) {
        self.motion.insert(engine.to_owned(), factory);
    }

    pub fn unregister_touch(&mut self, engine: &str) -> bool {
        self.touch.remove(engine).is_some()
    }

    pub fn unregister_motion(&mut self, engine: &str) -> bool {
        self.motion.remove(engine).is_some()
    }

    pub fn create_touch(&self, params: &ParamPackage) -> Option<Box<dyn TouchDevice>> {
        let engine = params.get_str("engine")?;
        self.touch.get(engine).map(|f| f.create(params))
    }

    pub fn create_motion(&self, params: &ParamPackage) -> Option<Box<dyn MotionDevice>> {
        let engine = params.get_str("engine")?;
        self.motion.get(engine).map(|f| f.create(params))
    }
}
