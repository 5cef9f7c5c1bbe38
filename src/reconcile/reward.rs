use crate::region::models::Campaign;

/// VAT rate folded into `estimated_cost`
const VAT_DIVISOR: f64 = 1.1;

/// Cost-currency units per reward point
const COST_PER_POINT: f64 = 10.0;

/// Points owed to a creator for a campaign.
///
/// Business policy, first non-zero value wins:
/// 1. `creator_points_override`
/// 2. `reward_points`
/// 3. `round(estimated_cost / 1.1 / 10)`: cost is VAT-inclusive, 10 cost units per point
/// 4. `0`
pub fn resolve_reward(campaign: &Campaign) -> i64 {
    if let Some(points) = campaign.creator_points_override.filter(|p| *p != 0) {
        return points.max(0);
    }
    if let Some(points) = campaign.reward_points.filter(|p| *p != 0) {
        return points.max(0);
    }
    campaign
        .estimated_cost
        .filter(|cost| cost.is_finite())
        .map(derived_estimate)
        .unwrap_or(0)
}

fn derived_estimate(estimated_cost: f64) -> i64 {
    let estimate = (estimated_cost / VAT_DIVISOR / COST_PER_POINT).round();
    if estimate > 0.0 {
        estimate as i64
    } else {
        0
    }
}
