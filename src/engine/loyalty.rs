use chrono::Utc;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::loyalty::LoyaltyAccount;
use crate::models::order::Order;
use crate::state::AppState;

pub fn points_for(subtotal: i64, divisor: i64) -> i64 {
    if divisor <= 0 {
        return 0;
    }
    subtotal.max(0) / divisor
}

pub fn open_account(state: &AppState, customer_id: Uuid) -> Result<LoyaltyAccount, AppError> {
    match state.loyalty_accounts.entry(customer_id) {
        Entry::Occupied(_) => Err(AppError::Conflict(format!(
            "loyalty account for {customer_id} already exists"
        ))),
        Entry::Vacant(slot) => {
            let account = LoyaltyAccount {
                customer_id,
                points: 0,
                updated_at: Utc::now(),
            };
            slot.insert(account.clone());
            Ok(account)
        }
    }
}

pub fn get_account(state: &AppState, customer_id: Uuid) -> Result<LoyaltyAccount, AppError> {
    state
        .loyalty_accounts
        .get(&customer_id)
        .map(|account| account.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("loyalty account {customer_id} not found")))
}

/// Returns the points added. Orders without a customer earn nothing.
pub fn award_points(state: &AppState, order: &Order) -> Result<i64, AppError> {
    let Some(customer_id) = order.customer_id else {
        return Ok(0);
    };

    let points = points_for(order.subtotal, state.loyalty_points_divisor);
    let mut account = state
        .loyalty_accounts
        .get_mut(&customer_id)
        .ok_or_else(|| AppError::NotFound(format!("loyalty account {customer_id} not found")))?;

    account.points = account.points.saturating_add(points);
    account.updated_at = Utc::now();
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::points_for;

    #[test]
    fn one_point_per_divisor_rounded_down() {
        assert_eq!(points_for(12_345, 100), 123);
        assert_eq!(points_for(99, 100), 0);
        assert_eq!(points_for(-500, 100), 0);
        assert_eq!(points_for(500, 0), 0);
    }
}
