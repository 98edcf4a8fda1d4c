//! Subscription plans and pricing.

use super::{api_failure, decode, decode_array};
use crate::client::ApiClient;
use crate::models::{BillingCycle, Plan, PlanComparison, PlanFeature, PriceBreakdown};
use crate::utils::unwrap_data;
use anyhow::Result;
use serde_json::{json, Value};

/// Months charged for a year on the annual cycle
const ANNUAL_BILLED_MONTHS: f64 = 10.0;
/// Months given away on the annual cycle
const ANNUAL_FREE_MONTHS: f64 = 2.0;

/// Service for the plan catalog
#[derive(Debug, Clone)]
pub struct PlanService {
    client: ApiClient,
}

impl PlanService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /billing/plans/get-all-plan`. A non-list payload yields no plans.
    pub async fn plans(&self) -> Result<Vec<Plan>> {
        let body: Value = self
            .client
            .get("/billing/plans/get-all-plan")
            .await
            .map_err(api_failure("Failed to load plans"))?;

        decode_array(body, "plan")
    }

    pub async fn plan(&self, id: i64) -> Result<Plan> {
        let body: Value = self
            .client
            .get(&format!("/plans/{}", id))
            .await
            .map_err(api_failure("Failed to load plan"))?;
        decode(unwrap_data(body), "plan")
    }

    /// `POST /plans/compare`
    pub async fn compare_plans(&self, plan_ids: &[i64]) -> Result<PlanComparison> {
        let body: Value = self
            .client
            .post("/plans/compare", &json!({ "plan_ids": plan_ids }))
            .await
            .map_err(api_failure("Failed to compare plans"))?;
        decode(unwrap_data(body), "plan comparison")
    }

    /// Fetch the catalog and pick a plan for `vehicle_count` vehicles
    pub async fn recommended_plan(&self, vehicle_count: u32) -> Result<Option<Plan>> {
        let plans = self.plans().await?;
        Ok(recommend(&plans, vehicle_count).cloned())
    }
}

/// Price for one billing cycle.
///
/// Annual billing charges ten months and gives two away.
pub fn calculate_price(plan: &Plan, cycle: BillingCycle) -> PriceBreakdown {
    let base_price = if plan.price.is_finite() { plan.price } else { 0.0 };

    let (discount, final_price) = match cycle {
        BillingCycle::Monthly => (0.0, base_price),
        BillingCycle::Annual => (
            base_price * ANNUAL_FREE_MONTHS,
            base_price * ANNUAL_BILLED_MONTHS,
        ),
    };

    PriceBreakdown {
        base_price,
        discount,
        final_price,
        savings: discount,
    }
}

pub fn format_features(plan: &Plan) -> Vec<PlanFeature> {
    plan.features
        .iter()
        .map(|name| PlanFeature {
            name: name.clone(),
            description: String::new(),
            included: true,
        })
        .collect()
}

/// Cheapest active plan that fits `vehicle_count`, else the most
/// expensive active plan
pub fn recommend(plans: &[Plan], vehicle_count: u32) -> Option<&Plan> {
    let mut active: Vec<&Plan> = plans.iter().filter(|p| p.is_active).collect();
    active.sort_by(|a, b| a.price.total_cmp(&b.price));

    active
        .iter()
        .find(|p| vehicle_count <= p.max_vehicles)
        .or_else(|| active.last())
        .copied()
}
