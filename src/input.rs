use std::sync::Arc;

use tracing::info;

use crate::{
    client::Client,
    constants::ENGINE_NAME,
    devices::{DeviceRegistry, UdpMotionFactory, UdpTouchFactory},
    socket::ConnectionParams,
    status::DeviceStatus,
};

/// Composition root for the UDP backend: one status, one client, two registered factories.
pub struct UdpInput {
    status: Arc<DeviceStatus>,
    client: Client,
}

impl UdpInput {
    pub fn init(registry: &mut DeviceRegistry, params: &ConnectionParams) -> Self {
        let status = Arc::new(DeviceStatus::new());
        let client = Client::new(status.clone(), params);
        registry.register_touch(ENGINE_NAME, Arc::new(UdpTouchFactory::new(status.clone())));
        registry.register_motion(ENGINE_NAME, Arc::new(UdpMotionFactory::new(status.clone())));
        info!("Registered \"{ENGINE_NAME}\" input factories");
        Self { status, client }
    }

    /// Points the client at new settings without touching registered devices.
    pub fn reload(&mut self, params: &ConnectionParams) {
        self.client.reload_socket(params);
    }

    pub fn status(&self) -> &Arc<DeviceStatus> {
        &self.status
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn shutdown(self, registry: &mut DeviceRegistry) {
        registry.unregister_touch(ENGINE_NAME);
        registry.unregister_motion(ENGINE_NAME);
        info!("Unregistered \"{ENGINE_NAME}\" input factories");
    }
}
