use std::{net::SocketAddr, sync::Arc};

use tracing::{info, trace, warn};

use crate::{
    protocol::response::{self, Accelerometer, Gyroscope},
    socket::{ConnectionParams, Socket, SocketCallback, SocketWorker},
    status::{DeviceStatus, MotionStatus, Vec3f},
};

/// Converts the server's sensor frame into the handheld's: accel X/Z and gyro pitch/yaw flip sign.
pub fn to_native_frame(accel: Accelerometer, gyro: Gyroscope) -> MotionStatus {
    MotionStatus {
        accel: Vec3f::new(-accel.x, accel.y, -accel.z),
        gyro: Vec3f::new(-gyro.pitch, -gyro.yaw, gyro.roll),
    }
}

/// Filters stale pad data and publishes the rest into a shared [`DeviceStatus`].
pub struct PadDataHandler {
    status: Arc<DeviceStatus>,
    packet_sequence: u32,
}

impl PadDataHandler {
    pub fn new(status: Arc<DeviceStatus>) -> Self {
        Self {
            status,
            packet_sequence: 0,
        }
    }

    pub fn packet_sequence(&self) -> u32 {
        self.packet_sequence
    }

    /// Returns `false` when the packet was dropped as stale or duplicated.
    pub fn on_pad_data(&mut self, data: &response::PadData) -> bool {
        trace!("PadData packet received");
        if data.packet_counter <= self.packet_sequence {
            warn!(
                "PadData packet dropped because its stale info. Current count: {} Packet count: {}",
                self.packet_sequence, data.packet_counter
            );
            return false;
        }
        self.packet_sequence = data.packet_counter;

        let motion = to_native_frame(data.accel, data.gyro);
        let touch = data.touch_1;
        let raw_touch = (touch.is_active != 0).then_some((touch.x, touch.y));
        self.status.update(motion, raw_touch);
        true
    }
}

/// Keeps a DSU server streaming into a shared [`DeviceStatus`] from a dedicated thread.
pub struct Client {
    status: Arc<DeviceStatus>,
    worker: Option<SocketWorker>,
}

impl Client {
    /// Starts communicating immediately.
    pub fn new(status: Arc<DeviceStatus>, params: &ConnectionParams) -> Self {
        let mut client = Self {
            status,
            worker: None,
        };
        client.start_communication(params);
        client
    }

    /// Stops and joins the current socket thread before starting one with `params`.
    pub fn reload_socket(&mut self, params: &ConnectionParams) {
        self.stop();
        self.start_communication(params);
    }

    pub fn status(&self) -> &Arc<DeviceStatus> {
        &self.status
    }

    /// Local address of the live socket, if it bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.worker.as_ref().and_then(SocketWorker::local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(SocketWorker::is_running)
    }

    fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop_and_join();
        }
    }

    fn start_communication(&mut self, params: &ConnectionParams) {
        let mut handler = PadDataHandler::new(self.status.clone());
        let callback = SocketCallback {
            version: Box::new(|data: response::Version| {
                trace!("Version packet received: {}", data.version)
            }),
            port_info: Box::new(|data: response::PortInfo| {
                trace!("PortInfo packet received: {}", data.model)
            }),
            pad_data: Box::new(move |data: response::PadData| {
                handler.on_pad_data(&data);
            }),
        };
        info!(
            "Starting communication with UDP input server on {}:{}",
            params.host, params.port
        );
        self.worker = Some(SocketWorker::spawn(Socket::new(params, callback)));
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop();
    }
}
