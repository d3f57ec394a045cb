use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::codes::{generate_code, register_attempt};
use crate::error::AppError;
use crate::models::order::{DeliveryType, Order, OrderStatus};

/// A requested status change, tagged by the target status.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Transition {
    Preparing {
        estimated_ready_time: u32,
        #[serde(default)]
        delivery_user_id: Option<Uuid>,
    },
    Ready,
    OnTheWay {
        #[serde(default)]
        delivery_user_id: Option<Uuid>,
    },
    Delivered {
        code: i64,
    },
    Cancelled,
}

impl Transition {
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Preparing { .. } => OrderStatus::Preparing,
            Transition::Ready => OrderStatus::Ready,
            Transition::OnTheWay { .. } => OrderStatus::OnTheWay,
            Transition::Delivered { .. } => OrderStatus::Delivered,
            Transition::Cancelled => OrderStatus::Cancelled,
        }
    }
}

/// What the caller must do after a transition was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    StartTracking,
    StopTracking,
}

pub struct TransitionRules {
    pub code_max_attempts: Option<u32>,
}

/// Applies `transition` to `order` in place. On error the order is left as
/// it was, except for a counted confirmation attempt.
pub fn apply(
    order: &mut Order,
    transition: Transition,
    rules: &TransitionRules,
    now: DateTime<Utc>,
) -> Result<Effect, AppError> {
    let from = order.status;
    let to = transition.target();
    let invalid = || AppError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    };

    if from.is_terminal() {
        return Err(invalid());
    }

    let effect = match transition {
        Transition::Preparing {
            estimated_ready_time,
            delivery_user_id,
        } => {
            if from != OrderStatus::Received {
                return Err(invalid());
            }
            if estimated_ready_time == 0 {
                return Err(AppError::BadRequest(
                    "estimated_ready_time must be > 0 minutes".to_string(),
                ));
            }
            if delivery_user_id.is_some() && order.delivery_type == DeliveryType::Pickup {
                return Err(AppError::BadRequest(
                    "pickup orders do not take a driver".to_string(),
                ));
            }

            order.estimated_ready_time = Some(estimated_ready_time);
            if delivery_user_id.is_some() {
                order.delivery_user_id = delivery_user_id;
            }
            Effect::None
        }
        Transition::Ready => {
            if from != OrderStatus::Preparing {
                return Err(invalid());
            }

            let slot = match order.delivery_type {
                DeliveryType::Pickup => &mut order.pickup_code,
                DeliveryType::Delivery => &mut order.delivery_code,
            };
            if slot.is_none() {
                *slot = Some(generate_code());
            }
            Effect::None
        }
        Transition::OnTheWay { delivery_user_id } => {
            if from != OrderStatus::Ready || order.delivery_type != DeliveryType::Delivery {
                return Err(invalid());
            }

            let driver = delivery_user_id.or(order.delivery_user_id).ok_or_else(|| {
                AppError::BadRequest("a driver must be assigned before leaving".to_string())
            })?;

            order.delivery_user_id = Some(driver);
            order.started_delivery_at = Some(now);
            Effect::StartTracking
        }
        Transition::Delivered { code } => {
            let expected_from = match order.delivery_type {
                DeliveryType::Delivery => OrderStatus::OnTheWay,
                DeliveryType::Pickup => OrderStatus::Ready,
            };
            if from != expected_from {
                return Err(invalid());
            }
            if !register_attempt(order, code, rules.code_max_attempts)? {
                return Err(AppError::InvalidConfirmationCode);
            }

            order.delivered_at = Some(now);
            Effect::StopTracking
        }
        Transition::Cancelled => Effect::StopTracking,
    };

    order.status = to;
    order.updated_at = now;
    Ok(effect)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{apply, Effect, Transition, TransitionRules};
    use crate::error::AppError;
    use crate::models::order::{DeliveryType, Order, OrderStatus};

    const RULES: TransitionRules = TransitionRules {
        code_max_attempts: None,
    };

    fn order(delivery_type: DeliveryType) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            delivery_type,
            delivery_address: Some("Main St 123".to_string()),
            destination: None,
            subtotal: 8000,
            delivery_fee: 2300,
            is_free_delivery: false,
            distance_km: Some(5.0),
            total: 10_300,
            status: OrderStatus::Received,
            pickup_code: None,
            delivery_code: None,
            code_attempts: 0,
            delivery_user_id: None,
            estimated_ready_time: None,
            started_delivery_at: None,
            delivered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn step(order: &mut Order, transition: Transition) -> Result<Effect, AppError> {
        apply(order, transition, &RULES, Utc::now())
    }

    #[test]
    fn delivery_order_walks_the_full_lifecycle() {
        let driver = Uuid::new_v4();
        let mut order = order(DeliveryType::Delivery);

        step(
            &mut order,
            Transition::Preparing {
                estimated_ready_time: 30,
                delivery_user_id: Some(driver),
            },
        )
        .unwrap();
        assert_eq!(order.estimated_ready_time, Some(30));

        step(&mut order, Transition::Ready).unwrap();
        let code = order.delivery_code.unwrap();
        assert!((100..=999).contains(&code));
        assert!(order.pickup_code.is_none());

        let effect = step(
            &mut order,
            Transition::OnTheWay {
                delivery_user_id: None,
            },
        )
        .unwrap();
        assert_eq!(effect, Effect::StartTracking);
        assert_eq!(order.delivery_user_id, Some(driver));
        assert!(order.started_delivery_at.is_some());

        let effect = step(
            &mut order,
            Transition::Delivered {
                code: i64::from(code),
            },
        )
        .unwrap();
        assert_eq!(effect, Effect::StopTracking);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.delivered_at.is_some());
    }

    #[test]
    fn pickup_order_is_delivered_straight_from_ready() {
        let mut order = order(DeliveryType::Pickup);
        step(
            &mut order,
            Transition::Preparing {
                estimated_ready_time: 15,
                delivery_user_id: None,
            },
        )
        .unwrap();
        step(&mut order, Transition::Ready).unwrap();
        let code = order.pickup_code.unwrap();
        assert!(order.delivery_code.is_none());

        let err = step(
            &mut order,
            Transition::OnTheWay {
                delivery_user_id: Some(Uuid::new_v4()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        step(
            &mut order,
            Transition::Delivered {
                code: i64::from(code),
            },
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn wrong_code_keeps_order_on_the_way() {
        let mut order = order(DeliveryType::Delivery);
        order.status = OrderStatus::OnTheWay;
        order.delivery_code = Some(500);

        let err = step(&mut order, Transition::Delivered { code: 501 }).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfirmationCode));
        assert_eq!(order.status, OrderStatus::OnTheWay);
        assert_eq!(order.code_attempts, 1);
    }

    #[test]
    fn leaving_without_a_driver_is_rejected() {
        let mut order = order(DeliveryType::Delivery);
        order.status = OrderStatus::Ready;

        let err = step(
            &mut order,
            Transition::OnTheWay {
                delivery_user_id: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(order.status, OrderStatus::Ready);
    }

    #[test]
    fn code_is_not_regenerated() {
        let mut order = order(DeliveryType::Delivery);
        order.status = OrderStatus::Preparing;
        order.delivery_code = Some(123);

        step(&mut order, Transition::Ready).unwrap();
        assert_eq!(order.delivery_code, Some(123));
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut order = order(DeliveryType::Delivery);
        let err = step(&mut order, Transition::Ready).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Received);
    }

    #[test]
    fn cancel_from_any_open_state_but_not_after_terminal() {
        for status in [
            OrderStatus::Received,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::OnTheWay,
        ] {
            let mut order = order(DeliveryType::Delivery);
            order.status = status;
            assert_eq!(
                step(&mut order, Transition::Cancelled).unwrap(),
                Effect::StopTracking
            );
            assert_eq!(order.status, OrderStatus::Cancelled);
        }

        let mut order = order(DeliveryType::Delivery);
        order.status = OrderStatus::Delivered;
        assert!(step(&mut order, Transition::Cancelled).is_err());
    }

    #[test]
    fn preparing_requires_positive_estimate() {
        let mut order = order(DeliveryType::Delivery);
        let err = step(
            &mut order,
            Transition::Preparing {
                estimated_ready_time: 0,
                delivery_user_id: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
