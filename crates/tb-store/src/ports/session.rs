//! Per-user UI session state.
//!
//! There is deliberately no ambient global here: callers receive a
//! `SessionStore` at construction and the adapter decides where the
//! data lives (process-local map, or the state store).

use crate::domain::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{OrderId, PlanId, UserId};

/// What the user is currently looking at. Purely conversational state;
/// losing it costs the user a menu tap, never money.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Order the user is mid-flow on (checkout, terms, payment check).
    pub focus_order: Option<OrderId>,
    /// Plan the user last browsed.
    pub selected_plan: Option<PlanId>,
    /// Last touch, for staleness decisions by the caller.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Session persistence seam.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store (or replace) a user's session.
    async fn put(&self, user_id: UserId, session: Session) -> Result<(), StoreError>;

    /// Fetch a user's session.
    async fn get(&self, user_id: UserId) -> Result<Option<Session>, StoreError>;

    /// Drop a user's session.
    async fn clear(&self, user_id: UserId) -> Result<(), StoreError>;
}
