use std::time::Duration;

// Network defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 26760;
pub const DEFAULT_PAD_INDEX: u8 = 0;
pub const DEFAULT_CLIENT_ID: u32 = 24872;

// Wire framing
pub const CLIENT_MAGIC: u32 = 0x4355_5344; // "DSUC" read little-endian
pub const SERVER_MAGIC: u32 = 0x5355_5344; // "DSUS" read little-endian
pub const PROTOCOL_VERSION: u16 = 1001;
pub const MAX_PACKET_SIZE: usize = 100;
pub const MAX_PORTS: usize = 4;

// Timing
pub const SEND_INTERVAL: Duration = Duration::from_secs(3);
pub const RECEIVE_POLL: Duration = Duration::from_millis(100);
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(8);

// Raw touch units a second sample must travel past the first one
pub const CALIBRATION_THRESHOLD: u16 = 100;

// Touch bounds used when a device is created without explicit calibration
pub mod touch_defaults {
    pub const MIN_X: u16 = 100;
    pub const MIN_Y: u16 = 50;
    pub const MAX_X: u16 = 1800;
    pub const MAX_Y: u16 = 850;
}

// Name the subsystem registers its factories under
pub const ENGINE_NAME: &str = "cemuhookudp";
