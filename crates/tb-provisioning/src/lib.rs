//! # Provisioning Subsystem
//!
//! ## Purpose
//!
//! Turns a PAID, terms-accepted order into a live account on a remote
//! node, where the remote mutation (editing a live config file and
//! restarting a service) is inherently non-transactional. Correctness
//! rests on four legs:
//!
//! 1. A `ProvisioningAttempt` row anchored IN_FLIGHT *before* the
//!    remote call, so a crash mid-provision is distinguishable from
//!    "never attempted".
//! 2. Deterministic identity: `username` and `credential_uuid` are both
//!    derived from the order id, so a re-invoked provision targets the
//!    same remote identity and "already exists" can be read as success.
//! 3. A per-server exclusive lease with ownership TTL, serializing
//!    remote mutation of the shared config file.
//! 4. Idempotent account creation keyed on `order_id`, plus terminal
//!    CAS transitions, so racing retries collapse to one outcome.
//!
//! ## State machine per order
//!
//! ```text
//! TERMS_ACCEPTED ──(lease)──→ IN_FLIGHT ──┬─ SUCCEEDED ───────→ PROVISIONED
//!                                         ├─ FAILED_RETRYABLE → stay, retry later
//!                                         └─ FAILED_FATAL ────→ FAILED
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{SshConfig, SshTransport, StaticServerDirectory};
pub use domain::{
    derive_credential, derive_username, AccessLink, ExitClass, ProvisionRequest,
    ProvisioningError, RemoteGrant, RemoteOutcome, RetryPolicy,
};
pub use ports::{MockBehavior, MockTransport, ProvisioningTransport, ServerDirectory};
pub use service::{ProvisionOutcome, ProvisioningCoordinator, ServerLease, ServerLeaseRegistry};
