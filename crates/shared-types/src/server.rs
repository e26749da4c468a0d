//! Remote VPN node descriptors.

use crate::ids::ServerId;
use serde::{Deserialize, Serialize};

/// Operational status of a remote node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// Accepting new accounts.
    #[default]
    Online,
    /// Unreachable or administratively down.
    Offline,
    /// Temporarily closed for new accounts.
    Maintenance,
}

/// Connection profile for a remote node. The admin key itself lives
/// outside this core; only a key reference (path) is carried.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerProfile {
    /// Node identifier.
    pub server_id: ServerId,
    /// Public hostname; also the default access-link domain.
    pub hostname: String,
    /// SSH admin user.
    pub ssh_user: String,
    /// SSH port.
    pub ssh_port: u16,
    /// Path to the admin private key.
    pub ssh_key_path: String,
    /// Operational status.
    pub status: ServerStatus,
    /// Account capacity.
    pub capacity: u32,
    /// Currently provisioned accounts.
    pub active_accounts: u32,
}

impl ServerProfile {
    /// Load as a fraction of capacity; full when capacity is zero.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        f64::from(self.active_accounts) / f64::from(self.capacity)
    }

    /// Eligible to receive new accounts.
    pub fn is_available(&self) -> bool {
        self.status == ServerStatus::Online && self.utilization() < 0.9
    }
}
