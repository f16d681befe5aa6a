//! DSU wire format: a 20-byte header followed by one fixed-size payload.
//!
//! Every datagram is one complete message. Multi-byte fields are little-endian and
//! the checksum is a CRC-32 over the whole message with the checksum field zeroed.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::{constants::*, error::PacketError};

pub const HEADER_SIZE: usize = 20;
const CRC_OFFSET: usize = 8;
const TYPE_FIELD_SIZE: usize = 4;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Version = 0x0010_0000,
    PortInfo = 0x0010_0001,
    PadData = 0x0010_0002,
}

impl Type {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0x0010_0000 => Some(Type::Version),
            0x0010_0001 => Some(Type::PortInfo),
            0x0010_0002 => Some(Type::PadData),
            _ => None,
        }
    }

    /// Payload size of the server response carrying this type.
    pub fn response_size(self) -> usize {
        match self {
            Type::Version => response::Version::SIZE,
            Type::PortInfo => response::PortInfo::SIZE,
            Type::PadData => response::PadData::SIZE,
        }
    }
}

/// The type discriminant is framed as part of the header; `payload_length` still counts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub protocol_version: u16,
    pub payload_length: u16,
    pub crc: u32,
    pub id: u32,
    pub payload_type: u32,
}

impl Header {
    pub fn encode(&self, out: &mut [u8]) {
        LittleEndian::write_u32(&mut out[0..4], self.magic);
        LittleEndian::write_u16(&mut out[4..6], self.protocol_version);
        LittleEndian::write_u16(&mut out[6..8], self.payload_length);
        LittleEndian::write_u32(&mut out[8..12], self.crc);
        LittleEndian::write_u32(&mut out[12..16], self.id);
        LittleEndian::write_u32(&mut out[16..20], self.payload_type);
    }

    /// Caller guarantees `buf.len() >= HEADER_SIZE`.
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            magic: LittleEndian::read_u32(&buf[0..4]),
            protocol_version: LittleEndian::read_u16(&buf[4..6]),
            payload_length: LittleEndian::read_u16(&buf[6..8]),
            crc: LittleEndian::read_u32(&buf[8..12]),
            id: LittleEndian::read_u32(&buf[12..16]),
            payload_type: LittleEndian::read_u32(&buf[16..20]),
        }
    }
}

/// A fixed-size message body with a known type discriminant.
pub trait Payload: Sized {
    const TYPE: Type;
    const SIZE: usize;

    /// Writes exactly `SIZE` bytes to the front of `out`.
    fn encode(&self, out: &mut [u8]);

    /// Reads from the first `SIZE` bytes of `buf`.
    fn decode(buf: &[u8]) -> Self;
}

pub type MacAddress = [u8; 6];
pub const EMPTY_MAC_ADDRESS: MacAddress = [0; 6];

fn checksum(message: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&message[..CRC_OFFSET]);
    hasher.update(&[0u8; 4]);
    hasher.update(&message[CRC_OFFSET + 4..]);
    hasher.finalize()
}

fn frame<T: Payload>(magic: u32, data: &T, id: u32) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_SIZE + T::SIZE];
    Header {
        magic,
        protocol_version: PROTOCOL_VERSION,
        payload_length: (T::SIZE + TYPE_FIELD_SIZE) as u16,
        crc: 0,
        id,
        payload_type: T::TYPE as u32,
    }
    .encode(&mut buf[..HEADER_SIZE]);
    data.encode(&mut buf[HEADER_SIZE..]);

    let crc = checksum(&buf);
    LittleEndian::write_u32(&mut buf[CRC_OFFSET..CRC_OFFSET + 4], crc);
    buf
}

pub mod request {
    use super::*;

    /// Marker for bodies the client may send.
    pub trait Request: Payload {}

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Version;

    impl Payload for Version {
        const TYPE: Type = Type::Version;
        const SIZE: usize = 0;

        fn encode(&self, _out: &mut [u8]) {}

        fn decode(_buf: &[u8]) -> Self {
            Version
        }
    }

    /// Asks which controllers sit on the listed ports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PortInfo {
        pub pad_count: u32,
        pub port: [u8; MAX_PORTS],
    }

    impl PortInfo {
        pub fn single(pad_index: u8) -> Self {
            Self {
                pad_count: 1,
                port: [pad_index, 0, 0, 0],
            }
        }
    }

    impl Payload for PortInfo {
        const TYPE: Type = Type::PortInfo;
        const SIZE: usize = 8;

        fn encode(&self, out: &mut [u8]) {
            LittleEndian::write_u32(&mut out[0..4], self.pad_count);
            out[4..8].copy_from_slice(&self.port);
        }

        fn decode(buf: &[u8]) -> Self {
            let mut port = [0u8; MAX_PORTS];
            port.copy_from_slice(&buf[4..8]);
            Self {
                pad_count: LittleEndian::read_u32(&buf[0..4]),
                port,
            }
        }
    }

    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LookupFlags {
        AllPorts = 0,
        Id = 1,
        Mac = 2,
    }

    impl LookupFlags {
        fn from_u8(raw: u8) -> Self {
            match raw {
                1 => LookupFlags::Id,
                2 => LookupFlags::Mac,
                _ => LookupFlags::AllPorts,
            }
        }
    }

    /// Subscribes to pad data. The server stops streaming if this is not renewed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PadData {
        pub flags: LookupFlags,
        pub port_id: u8,
        pub mac: MacAddress,
    }

    impl PadData {
        pub fn by_id(port_id: u8) -> Self {
            Self {
                flags: LookupFlags::Id,
                port_id,
                mac: EMPTY_MAC_ADDRESS,
            }
        }

        pub fn by_mac(mac: MacAddress) -> Self {
            Self {
                flags: LookupFlags::Mac,
                port_id: 0,
                mac,
            }
        }

        pub fn all_ports() -> Self {
            Self {
                flags: LookupFlags::AllPorts,
                port_id: 0,
                mac: EMPTY_MAC_ADDRESS,
            }
        }
    }

    impl Payload for PadData {
        const TYPE: Type = Type::PadData;
        const SIZE: usize = 8;

        fn encode(&self, out: &mut [u8]) {
            out[0] = self.flags as u8;
            out[1] = self.port_id;
            out[2..8].copy_from_slice(&self.mac);
        }

        fn decode(buf: &[u8]) -> Self {
            let mut mac = EMPTY_MAC_ADDRESS;
            mac.copy_from_slice(&buf[2..8]);
            Self {
                flags: LookupFlags::from_u8(buf[0]),
                port_id: buf[1],
                mac,
            }
        }
    }

    impl Request for Version {}
    impl Request for PortInfo {}
    impl Request for PadData {}

    /// Frames a request with the client magic and a valid checksum.
    pub fn create<T: Request>(data: &T, client_id: u32) -> Vec<u8> {
        frame(CLIENT_MAGIC, data, client_id)
    }
}

pub mod response {
    use super::*;

    /// Marker for bodies a server may send.
    pub trait Response: Payload {}

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Version {
        pub version: u16,
    }

    impl Payload for Version {
        const TYPE: Type = Type::Version;
        const SIZE: usize = 2;

        fn encode(&self, out: &mut [u8]) {
            LittleEndian::write_u16(&mut out[0..2], self.version);
        }

        fn decode(buf: &[u8]) -> Self {
            Self {
                version: LittleEndian::read_u16(&buf[0..2]),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortInfo {
        pub id: u8,
        pub state: u8,
        pub model: u8,
        pub connection_type: u8,
        pub mac: MacAddress,
        pub battery: u8,
        pub is_pad_active: u8,
    }

    impl Payload for PortInfo {
        const TYPE: Type = Type::PortInfo;
        const SIZE: usize = 12;

        fn encode(&self, out: &mut [u8]) {
            out[0] = self.id;
            out[1] = self.state;
            out[2] = self.model;
            out[3] = self.connection_type;
            out[4..10].copy_from_slice(&self.mac);
            out[10] = self.battery;
            out[11] = self.is_pad_active;
        }

        fn decode(buf: &[u8]) -> Self {
            let mut mac = EMPTY_MAC_ADDRESS;
            mac.copy_from_slice(&buf[4..10]);
            Self {
                id: buf[0],
                state: buf[1],
                model: buf[2],
                connection_type: buf[3],
                mac,
                battery: buf[10],
                is_pad_active: buf[11],
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TouchPad {
        pub is_active: u8,
        pub id: u8,
        pub x: u16,
        pub y: u16,
    }

    impl TouchPad {
        const SIZE: usize = 6;

        fn encode(&self, out: &mut [u8]) {
            out[0] = self.is_active;
            out[1] = self.id;
            LittleEndian::write_u16(&mut out[2..4], self.x);
            LittleEndian::write_u16(&mut out[4..6], self.y);
        }

        fn decode(buf: &[u8]) -> Self {
            Self {
                is_active: buf[0],
                id: buf[1],
                x: LittleEndian::read_u16(&buf[2..4]),
                y: LittleEndian::read_u16(&buf[4..6]),
            }
        }
    }

    /// Acceleration in g.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Accelerometer {
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }

    /// Angular rate in degrees per second.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Gyroscope {
        pub pitch: f32,
        pub yaw: f32,
        pub roll: f32,
    }

    fn write_f32x3(out: &mut [u8], v: [f32; 3]) {
        LittleEndian::write_f32(&mut out[0..4], v[0]);
        LittleEndian::write_f32(&mut out[4..8], v[1]);
        LittleEndian::write_f32(&mut out[8..12], v[2]);
    }

    fn read_f32x3(buf: &[u8]) -> [f32; 3] {
        [
            LittleEndian::read_f32(&buf[0..4]),
            LittleEndian::read_f32(&buf[4..8]),
            LittleEndian::read_f32(&buf[8..12]),
        ]
    }

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct PadData {
        pub info: PortInfo,
        pub packet_counter: u32,
        pub digital_button: u16,
        pub home: u8,
        /// Set to 1 while the touchpad is physically clicked, on devices that support it.
        pub touch_hard_press: u8,
        pub left_stick_x: u8,
        pub left_stick_y: u8,
        pub right_stick_x: u8,
        pub right_stick_y: u8,
        /// Pressure per button, in wire order (8, 7, 6, 5, 12, 11, 10, 9, 16, 15, 14, 13).
        pub analog_button: [u8; 12],
        pub touch_1: TouchPad,
        pub touch_2: TouchPad,
        pub motion_timestamp: u64,
        pub accel: Accelerometer,
        pub gyro: Gyroscope,
    }

    impl Payload for PadData {
        const TYPE: Type = Type::PadData;
        const SIZE: usize = 80;

        fn encode(&self, out: &mut [u8]) {
            self.info.encode(&mut out[0..12]);
            LittleEndian::write_u32(&mut out[12..16], self.packet_counter);
            LittleEndian::write_u16(&mut out[16..18], self.digital_button);
            out[18] = self.home;
            out[19] = self.touch_hard_press;
            out[20] = self.left_stick_x;
            out[21] = self.left_stick_y;
            out[22] = self.right_stick_x;
            out[23] = self.right_stick_y;
            out[24..36].copy_from_slice(&self.analog_button);
            self.touch_1.encode(&mut out[36..36 + TouchPad::SIZE]);
            self.touch_2.encode(&mut out[42..42 + TouchPad::SIZE]);
            LittleEndian::write_u64(&mut out[48..56], self.motion_timestamp);
            write_f32x3(&mut out[56..68], [self.accel.x, self.accel.y, self.accel.z]);
            write_f32x3(
                &mut out[68..80],
                [self.gyro.pitch, self.gyro.yaw, self.gyro.roll],
            );
        }

        fn decode(buf: &[u8]) -> Self {
            let mut analog_button = [0u8; 12];
            analog_button.copy_from_slice(&buf[24..36]);
            let [ax, ay, az] = read_f32x3(&buf[56..68]);
            let [pitch, yaw, roll] = read_f32x3(&buf[68..80]);
            Self {
                info: PortInfo::decode(&buf[0..12]),
                packet_counter: LittleEndian::read_u32(&buf[12..16]),
                digital_button: LittleEndian::read_u16(&buf[16..18]),
                home: buf[18],
                touch_hard_press: buf[19],
                left_stick_x: buf[20],
                left_stick_y: buf[21],
                right_stick_x: buf[22],
                right_stick_y: buf[23],
                analog_button,
                touch_1: TouchPad::decode(&buf[36..42]),
                touch_2: TouchPad::decode(&buf[42..48]),
                motion_timestamp: LittleEndian::read_u64(&buf[48..56]),
                accel: Accelerometer {
                    x: ax,
                    y: ay,
                    z: az,
                },
                gyro: Gyroscope { pitch, yaw, roll },
            }
        }
    }

    impl Response for Version {}
    impl Response for PortInfo {}
    impl Response for PadData {}

    /// A validated, decoded server message.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Message {
        Version(Version),
        PortInfo(PortInfo),
        PadData(PadData),
    }

    /// Frames a response with the server magic and a valid checksum.
    pub fn create<T: Response>(data: &T, server_id: u32) -> Vec<u8> {
        frame(SERVER_MAGIC, data, server_id)
    }

    /// Runs every framing check on `buf` and reports the first that fails.
    pub fn check(buf: &[u8]) -> Result<Type, PacketError> {
        if buf.len() < HEADER_SIZE {
            return Err(PacketError::TooShort { size: buf.len() });
        }
        let header = Header::decode(buf);
        if header.magic != SERVER_MAGIC {
            return Err(PacketError::BadMagic(header.magic));
        }
        if header.protocol_version != PROTOCOL_VERSION {
            return Err(PacketError::BadVersion(header.protocol_version));
        }
        let ty = Type::from_u32(header.payload_type)
            .ok_or(PacketError::UnknownType(header.payload_type))?;

        let data_len = ty.response_size();
        let expected = (data_len + TYPE_FIELD_SIZE) as u16;
        if header.payload_length != expected {
            return Err(PacketError::LengthMismatch {
                declared: header.payload_length,
                expected,
            });
        }
        let message_len = HEADER_SIZE + data_len;
        if buf.len() < message_len {
            return Err(PacketError::Truncated {
                size: buf.len(),
                expected: message_len,
            });
        }

        let computed = checksum(&buf[..message_len]);
        if computed != header.crc {
            return Err(PacketError::ChecksumMismatch {
                declared: header.crc,
                computed,
            });
        }
        Ok(ty)
    }

    /// Returns the packet type when `buf` holds a well-formed server message.
    pub fn validate(buf: &[u8]) -> Option<Type> {
        match check(buf) {
            Ok(ty) => Some(ty),
            Err(e) => {
                debug!("Dropping malformed DSU packet: {e}");
                None
            }
        }
    }

    /// Validates `buf` and decodes the payload that follows the header.
    pub fn parse(buf: &[u8]) -> Option<Message> {
        let body = buf.get(HEADER_SIZE..)?;
        Some(match validate(buf)? {
            Type::Version => Message::Version(Version::decode(body)),
            Type::PortInfo => Message::PortInfo(PortInfo::decode(body)),
            Type::PadData => Message::PadData(PadData::decode(body)),
        })
    }
}
