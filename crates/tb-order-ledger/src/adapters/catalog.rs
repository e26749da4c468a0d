//! Static in-memory plan catalog.

use crate::domain::LedgerError;
use crate::ports::outbound::PlanCatalog;
use async_trait::async_trait;
use shared_types::{Currency, Money, Plan, PlanId, PlanType};

/// Catalog backed by a fixed plan list handed over at construction.
pub struct StaticPlanCatalog {
    plans: Vec<Plan>,
}

impl StaticPlanCatalog {
    /// Catalog over an explicit plan list.
    #[must_use]
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// The stock lineup: trial, basic, premium, enterprise.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Plan {
                id: PlanId::new("trial-3"),
                plan_type: PlanType::Trial,
                price: Money::from_minor(0, Currency::Myr),
                duration_days: 3,
                device_limit: 1,
                is_active: true,
            },
            Plan {
                id: PlanId::new("basic-30"),
                plan_type: PlanType::Basic,
                price: Money::from_major(10, Currency::Myr),
                duration_days: 30,
                device_limit: 1,
                is_active: true,
            },
            Plan {
                id: PlanId::new("premium-30"),
                plan_type: PlanType::Premium,
                price: Money::from_major(20, Currency::Myr),
                duration_days: 30,
                device_limit: 2,
                is_active: true,
            },
            Plan {
                id: PlanId::new("enterprise-30"),
                plan_type: PlanType::Enterprise,
                price: Money::from_major(50, Currency::Myr),
                duration_days: 30,
                device_limit: 5,
                is_active: true,
            },
        ])
    }
}

#[async_trait]
impl PlanCatalog for StaticPlanCatalog {
    async fn plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, LedgerError> {
        Ok(self.plans.iter().find(|p| &p.id == plan_id).cloned())
    }

    async fn plan_for_type(&self, plan_type: PlanType) -> Result<Option<Plan>, LedgerError> {
        Ok(self
            .plans
            .iter()
            .find(|p| p.plan_type == plan_type && p.is_active)
            .cloned())
    }

    async fn active_plans(&self) -> Result<Vec<Plan>, LedgerError> {
        Ok(self.plans.iter().filter(|p| p.is_active).cloned().collect())
    }
}
