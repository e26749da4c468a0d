//! Outbound (driven) ports for the order ledger.

use crate::domain::LedgerError;
use async_trait::async_trait;
use shared_types::{Plan, PlanId, PlanType};

/// Read-only plan catalog.
///
/// Plans are owned by an external collaborator and immutable at use
/// time; the ledger only ever reads them.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Look up a plan by catalog id.
    async fn plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, LedgerError>;

    /// The orderable plan for a family, if the family is on sale.
    async fn plan_for_type(&self, plan_type: PlanType) -> Result<Option<Plan>, LedgerError>;

    /// All plans currently on sale.
    async fn active_plans(&self) -> Result<Vec<Plan>, LedgerError>;
}
