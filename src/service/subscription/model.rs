use rust_decimal::Decimal;

use crate::service::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    WooCommercePrice,
    BasicComparison,
    TorobComparison,
    AutoPriceAdjust,
    Reporting,
}

#[derive(Debug, Clone)]
pub struct TierPlan {
    pub tier: Tier,
    /// Monthly price in the configured currency.
    pub price: Decimal,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone)]
pub struct TierCatalog {
    plans: Vec<TierPlan>,
}

impl TierCatalog {
    pub fn new(plans: Vec<TierPlan>) -> Self {
        Self { plans }
    }

    pub fn plans(&self) -> &[TierPlan] {
        &self.plans
    }

    pub fn plan(&self, tier: Tier) -> Option<&TierPlan> {
        self.plans.iter().find(|plan| plan.tier == tier)
    }

    pub fn features(&self, tier: Tier) -> &[Feature] {
        self.plan(tier).map(|plan| plan.features.as_slice()).unwrap_or(&[])
    }
}

/// What a user may do right now, after license checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Entitlement {
    pub tier: Tier,
    pub features: Vec<Feature>,
    /// The stored paid tier was dropped to free during this resolution.
    pub downgraded: bool,
}

impl Entitlement {
    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}
