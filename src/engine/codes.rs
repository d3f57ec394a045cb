use rand::Rng;

use crate::error::AppError;
use crate::models::order::Order;

pub const CODE_MIN: u16 = 100;
pub const CODE_MAX: u16 = 999;

/// Three-digit handoff code. Drawn from a non-cryptographic RNG: this is a
/// human check at the door, not an access control.
pub fn generate_code() -> u16 {
    generate_code_with(&mut rand::thread_rng())
}

pub fn generate_code_with<R: Rng>(rng: &mut R) -> u16 {
    rng.gen_range(CODE_MIN..=CODE_MAX)
}

/// Exact comparison against the code of the order's handoff leg. Anything
/// outside the code range, or an order without a code yet, never matches.
pub fn verify_code(order: &Order, submitted: i64) -> bool {
    match order.confirmation_code() {
        Some(code) => i64::from(code) == submitted,
        None => false,
    }
}

/// Counts the attempt against the order and checks the code. With no limit
/// configured every guess is allowed.
pub fn register_attempt(
    order: &mut Order,
    submitted: i64,
    max_attempts: Option<u32>,
) -> Result<bool, AppError> {
    if let Some(limit) = max_attempts {
        if order.code_attempts >= limit {
            return Err(AppError::TooManyAttempts);
        }
    }

    order.code_attempts = order.code_attempts.saturating_add(1);
    Ok(verify_code(order, submitted))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    use super::{generate_code, generate_code_with, register_attempt, verify_code};
    use crate::error::AppError;
    use crate::models::order::{DeliveryType, Order, OrderStatus};

    fn order(delivery_type: DeliveryType, code: Option<u16>) -> Order {
        let (pickup_code, delivery_code) = match delivery_type {
            DeliveryType::Pickup => (code, None),
            DeliveryType::Delivery => (None, code),
        };

        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            delivery_type,
            delivery_address: None,
            destination: None,
            subtotal: 5000,
            delivery_fee: 0,
            is_free_delivery: false,
            distance_km: None,
            total: 5000,
            status: OrderStatus::Ready,
            pickup_code,
            delivery_code,
            code_attempts: 0,
            delivery_user_id: None,
            estimated_ready_time: Some(20),
            started_delivery_at: None,
            delivered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn generated_codes_stay_within_three_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let code = generate_code_with(&mut rng);
            assert!((100..=999).contains(&code));
        }
        assert!((100..=999).contains(&generate_code()));
    }

    #[test]
    fn only_exact_match_verifies() {
        let order = order(DeliveryType::Delivery, Some(482));

        assert!(verify_code(&order, 482));
        assert!(!verify_code(&order, 483));
        assert!(!verify_code(&order, 48));
        assert!(!verify_code(&order, 4820));
        assert!(!verify_code(&order, -482));
    }

    #[test]
    fn code_from_the_other_leg_is_ignored() {
        let mut order = order(DeliveryType::Delivery, None);
        order.pickup_code = Some(300);

        assert!(!verify_code(&order, 300));
    }

    #[test]
    fn unlimited_attempts_by_default() {
        let mut order = order(DeliveryType::Pickup, Some(777));
        for guess in 100..200 {
            assert!(!register_attempt(&mut order, guess, None).unwrap());
        }
        assert!(register_attempt(&mut order, 777, None).unwrap());
        assert_eq!(order.code_attempts, 101);
    }

    #[test]
    fn attempt_limit_blocks_further_guesses() {
        let mut order = order(DeliveryType::Pickup, Some(777));
        assert!(!register_attempt(&mut order, 100, Some(2)).unwrap());
        assert!(!register_attempt(&mut order, 101, Some(2)).unwrap());

        let err = register_attempt(&mut order, 777, Some(2)).unwrap_err();
        assert!(matches!(err, AppError::TooManyAttempts));
    }
}
