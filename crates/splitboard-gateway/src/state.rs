//! Gateway shared state.

use std::path::PathBuf;

use tokio::task::JoinHandle;

use crate::hub::{Hub, HubHandle};

/// Shared gateway state accessible from all connections and handlers.
pub struct GatewayState {
    pub hub: HubHandle,
    /// Port the gateway listens on, reported by `/health`.
    pub port: u16,
    pub static_dir: PathBuf,
    hub_task: JoinHandle<()>,
}

impl GatewayState {
    /// Create the state and spawn its relay hub. Must be called inside a
    /// Tokio runtime.
    pub fn new(port: u16, static_dir: PathBuf) -> Self {
        let (hub, hub_task) = Hub::spawn();
        Self {
            hub,
            port,
            static_dir,
            hub_task,
        }
    }
}

impl Drop for GatewayState {
    fn drop(&mut self) {
        self.hub_task.abort();
    }
}
