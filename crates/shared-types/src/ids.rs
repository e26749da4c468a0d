//! Opaque identifiers for cross-subsystem entities.
//!
//! Every identifier is a newtype over its wire representation so that an
//! `OrderId` can never be passed where an `AccountId` is expected.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrows the wire representation.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

string_id! {
    /// Globally unique order identifier, generated server-side before any
    /// external call so that gateway and provisioning references can be
    /// mapped back to the order.
    OrderId
}

string_id! {
    /// Plan catalog identifier (e.g. `"premium-30"`).
    PlanId
}

string_id! {
    /// Remote VPN node identifier.
    ServerId
}

string_id! {
    /// Provisioned account identifier.
    AccountId
}

/// Platform user identifier (numeric on the chat platform).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    /// Generates a fresh order identifier: `ORD-YYYYMMDD-XXXXXX`.
    ///
    /// The date prefix keeps operator tooling greppable; the random
    /// suffix makes collisions implausible within a day.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| {
                const ALPHABET: &[u8] = b"0123456789ABCDEF";
                ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
            })
            .collect();
        Self(format!("ORD-{}-{}", now.format("%Y%m%d"), suffix))
    }
}

impl AccountId {
    /// Generates a fresh account identifier: `ACC-XXXXXXXX`.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..8)
            .map(|_| {
                const ALPHABET: &[u8] = b"0123456789ABCDEF";
                ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
            })
            .collect();
        Self(format!("ACC-{suffix}"))
    }
}
