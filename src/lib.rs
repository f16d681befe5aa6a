//! Client for DSU ("cemuhook") UDP motion/touch servers.
//!
//! A [`Client`] keeps a server streaming pad data and republishes it as
//! device-native motion and normalized touch samples in a shared [`DeviceStatus`].
//! [`CalibrationConfigurationJob`] discovers a touch panel's raw range, and
//! [`ConnectivityTester`] checks user-entered connection settings.

pub mod calibration;
pub mod client;
pub mod config;
pub mod constants;
pub mod devices;
pub mod error;
pub mod event;
pub mod input;
pub mod params;
pub mod protocol;
pub mod socket;
pub mod status;
pub mod tester;

pub use calibration::{CalibrationConfigurationJob, CalibrationStatus, Calibrator};
pub use client::{Client, PadDataHandler};
pub use config::AppConfig;
pub use devices::{DeviceRegistry, MotionDevice, TouchDevice};
pub use error::{ConfigError, PacketError};
pub use input::UdpInput;
pub use params::ParamPackage;
pub use socket::ConnectionParams;
pub use status::{CalibrationData, DeviceStatus, MotionStatus, StatusSnapshot, TouchStatus};
pub use tester::{ConnectivityTester, test_communication};
