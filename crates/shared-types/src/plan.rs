//! Plan catalog types.
//!
//! Plans are immutable at use time and owned by an external catalog
//! collaborator; this core only reads them.

use crate::ids::PlanId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Plan family. The family, not the individual plan, decides the
/// concurrent-order rule: a user gets one trial ever, and at most one
/// open trial order at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Free one-shot evaluation plan.
    Trial,
    /// Entry paid tier.
    Basic,
    /// Standard paid tier.
    Premium,
    /// High-volume tier.
    Enterprise,
}

impl PlanType {
    /// Parses the wire token used by the command boundary.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "trial" => Some(Self::Trial),
            "basic" => Some(Self::Basic),
            "premium" => Some(Self::Premium),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    /// Wire token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

/// An immutable catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Catalog identifier.
    pub id: PlanId,
    /// Plan family.
    pub plan_type: PlanType,
    /// Price; zero for trials.
    pub price: Money,
    /// Validity window granted on provisioning.
    pub duration_days: u32,
    /// Simultaneous device cap.
    pub device_limit: u32,
    /// Inactive plans cannot be ordered.
    pub is_active: bool,
}

impl Plan {
    /// Trials may not coexist with another open order for the same
    /// user and family.
    pub fn forbids_concurrent_orders(&self) -> bool {
        self.plan_type == PlanType::Trial
    }

    /// Trials may be used at most once per user, ever.
    pub fn is_trial(&self) -> bool {
        self.plan_type == PlanType::Trial
    }
}
