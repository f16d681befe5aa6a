use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    constants::*, error::ConfigError, params::ParamPackage, socket::ConnectionParams,
    status::CalibrationData,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub udp_input_address: String,
    pub udp_input_port: u16,
    pub udp_pad_index: u8,
    pub client_id: u32,
    /// Saved by `calibrate`; devices fall back to built-in bounds without it.
    pub touch_calibration: Option<CalibrationData>,
}

// Default values for the config
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            udp_input_address: DEFAULT_HOST.into(),
            udp_input_port: DEFAULT_PORT,
            udp_pad_index: DEFAULT_PAD_INDEX,
            client_id: DEFAULT_CLIENT_ID,
            touch_calibration: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("com", "DsuInputBridge", "DsuInputBridge")
        .map(|d| d.config_dir().join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path()?)
    }

    /// Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let txt = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(toml::from_str(&txt)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_owned(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(io_err)
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(
            self.udp_input_address.clone(),
            self.udp_input_port,
            self.udp_pad_index,
            self.client_id,
        )
    }

    /// Touch binding for the UDP engine, carrying the saved calibration if there is one.
    pub fn touch_params(&self) -> ParamPackage {
        let params = ParamPackage::new().with("engine", ENGINE_NAME);
        match self.touch_calibration {
            Some(c) => params
                .with("min_x", c.min_x)
                .with("min_y", c.min_y)
                .with("max_x", c.max_x)
                .with("max_y", c.max_y),
            None => params,
        }
    }
}
