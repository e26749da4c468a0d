//! Per-server exclusive leases.
//!
//! The remote mutation edits one shared config file per node, so at
//! most one provision may touch a given server at a time. Leases carry
//! an ownership TTL: if a holder crashes without releasing, the lease
//! lapses on its own and the server does not stay wedged.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use shared_types::{ServerId, TimeSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

struct LeaseEntry {
    token: u64,
    expires_at: DateTime<Utc>,
}

/// Registry of per-server leases.
pub struct ServerLeaseRegistry {
    leases: Arc<Mutex<HashMap<ServerId, LeaseEntry>>>,
    clock: Arc<dyn TimeSource>,
    ttl: ChronoDuration,
    next_token: AtomicU64,
}

impl ServerLeaseRegistry {
    /// Build a registry with the given ownership TTL.
    pub fn new(clock: Arc<dyn TimeSource>, ttl: Duration) -> Self {
        Self {
            leases: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(120)),
            next_token: AtomicU64::new(1),
        }
    }

    /// Try to take the lease for a server.
    ///
    /// Succeeds when no lease is held or the held one has outlived its
    /// TTL. Returns `None` when another holder is live.
    pub fn try_acquire(&self, server_id: &ServerId) -> Option<ServerLease> {
        let now = self.clock.now();
        let mut leases = self.leases.lock();

        if let Some(entry) = leases.get(server_id) {
            if entry.expires_at > now {
                return None;
            }
            warn!(server_id = %server_id, "Reclaiming lapsed lease from a dead holder");
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        leases.insert(
            server_id.clone(),
            LeaseEntry {
                token,
                expires_at: now + self.ttl,
            },
        );
        debug!(server_id = %server_id, token, "Lease acquired");

        Some(ServerLease {
            leases: Arc::clone(&self.leases),
            server_id: server_id.clone(),
            token,
        })
    }

    /// Number of live leases, lapsed ones included until reclaimed.
    pub fn held(&self) -> usize {
        self.leases.lock().len()
    }
}

/// An exclusive hold on one server. Released on drop.
pub struct ServerLease {
    leases: Arc<Mutex<HashMap<ServerId, LeaseEntry>>>,
    server_id: ServerId,
    token: u64,
}

impl ServerLease {
    /// The leased server.
    pub fn server_id(&self) -> &ServerId {
        &self.server_id
    }
}

impl Drop for ServerLease {
    fn drop(&mut self) {
        let mut leases = self.leases.lock();
        // Only release our own lease; after a TTL lapse the entry may
        // belong to a newer holder.
        if leases.get(&self.server_id).is_some_and(|e| e.token == self.token) {
            leases.remove(&self.server_id);
            debug!(server_id = %self.server_id, token = self.token, "Lease released");
        }
    }
}
