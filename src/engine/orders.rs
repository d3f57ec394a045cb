use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::codes::register_attempt;
use crate::engine::destination::resolve_destination;
use crate::engine::eta::eta_between;
use crate::engine::fee::{self, FeeQuote};
use crate::engine::lifecycle::{self, Effect, Transition, TransitionRules};
use crate::engine::loyalty::award_points;
use crate::error::AppError;
use crate::models::location::{DeliveryLocation, GeoPoint, LocationEvent};
use crate::models::order::{DeliveryType, Order, OrderEvent, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub destination: Option<GeoPoint>,
    pub subtotal: i64,
}

/// The order exists once this is returned. A failed loyalty award is
/// reported here instead of failing the order.
#[derive(Debug)]
pub struct OrderCreated {
    pub order: Order,
    pub points_awarded: i64,
    pub points_award_error: Option<AppError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingSnapshot {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub location: Option<DeliveryLocation>,
    pub eta_minutes: Option<u32>,
    pub warning: Option<String>,
}

pub async fn quote_delivery(
    state: &AppState,
    destination: Option<GeoPoint>,
    address: Option<&str>,
    order_total: i64,
) -> Result<FeeQuote, AppError> {
    let point = resolve_destination(state, destination, address).await?;
    let config = state.delivery_config().await;

    let result = fee::quote(&config, &point, order_total);
    let outcome = match &result {
        Ok(quote) if quote.is_free => "free",
        Ok(_) => "charged",
        Err(AppError::OutOfServiceArea { .. }) => "out_of_area",
        Err(_) => "error",
    };
    state
        .metrics
        .fee_quotes_total
        .with_label_values(&[outcome])
        .inc();

    result
}

pub async fn create_order(state: &AppState, new_order: NewOrder) -> Result<OrderCreated, AppError> {
    if new_order.subtotal <= 0 {
        return Err(AppError::BadRequest("subtotal must be > 0".to_string()));
    }

    let config = state.delivery_config().await;
    if new_order.subtotal < config.min_order_amount {
        return Err(AppError::BadRequest(format!(
            "minimum purchase is ${}",
            config.min_order_amount
        )));
    }

    let quote = match new_order.delivery_type {
        DeliveryType::Delivery => Some(
            quote_delivery(
                state,
                new_order.destination,
                new_order.delivery_address.as_deref(),
                new_order.subtotal,
            )
            .await?,
        ),
        DeliveryType::Pickup => None,
    };

    let delivery_fee = quote.as_ref().map(|quote| quote.fee).unwrap_or(0);
    let total = new_order
        .subtotal
        .checked_add(delivery_fee)
        .ok_or_else(|| AppError::BadRequest("order total is too large".to_string()))?;
    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        customer_id: new_order.customer_id,
        delivery_type: new_order.delivery_type,
        delivery_address: new_order.delivery_address,
        destination: new_order.destination,
        subtotal: new_order.subtotal,
        delivery_fee,
        is_free_delivery: quote.as_ref().is_some_and(|quote| quote.is_free),
        distance_km: quote.as_ref().map(|quote| quote.distance_km),
        total,
        status: OrderStatus::Received,
        pickup_code: None,
        delivery_code: None,
        code_attempts: 0,
        delivery_user_id: None,
        estimated_ready_time: None,
        started_delivery_at: None,
        delivered_at: None,
        created_at: now,
        updated_at: now,
    };

    let entry = state.orders.entry(order.id).or_insert(order.clone());
    publish_status(state, &entry);
    drop(entry);
    info!(
        order_id = %order.id,
        delivery_type = ?order.delivery_type,
        total = order.total,
        delivery_fee = order.delivery_fee,
        "order created"
    );

    let (points_awarded, points_award_error) = match award_points(state, &order) {
        Ok(points) => (points, None),
        Err(err) => {
            warn!(order_id = %order.id, error = %err, "order created but loyalty points were not awarded");
            (0, Some(err))
        }
    };

    Ok(OrderCreated {
        order,
        points_awarded,
        points_award_error,
    })
}

pub fn get_order(state: &AppState, id: Uuid) -> Result<Order, AppError> {
    state
        .orders
        .get(&id)
        .map(|order| order.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

/// Oldest first, so boards keep a stable order between polls.
pub fn list_orders(state: &AppState, status: Option<OrderStatus>) -> Vec<Order> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| status.is_none_or(|status| entry.status == status))
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by_key(|order| order.created_at);
    orders
}

/// The tracking effect and the board event run under the order's entry lock.
pub fn transition_order(
    state: &AppState,
    id: Uuid,
    transition: Transition,
) -> Result<Order, AppError> {
    let rules = TransitionRules {
        code_max_attempts: state.code_max_attempts,
    };
    let checks_code = matches!(transition, Transition::Delivered { .. });

    let mut entry = state
        .orders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    let mut candidate = entry.clone();
    let result = lifecycle::apply(&mut candidate, transition, &rules, Utc::now());
    if checks_code {
        record_verification(state, &result);
    }

    let effect = match result {
        Ok(effect) => effect,
        Err(err) => {
            // A rejected handoff still counts as an attempt.
            entry.code_attempts = candidate.code_attempts;
            return Err(err);
        }
    };
    *entry = candidate.clone();

    match effect {
        Effect::StartTracking => {
            info!(order_id = %id, driver_id = ?candidate.delivery_user_id, "delivery started, tracking open");
        }
        Effect::StopTracking => {
            let removed = state.tracking.teardown(id);
            info!(order_id = %id, removed, "tracking closed");
        }
        Effect::None => {}
    }

    state
        .metrics
        .order_transitions_total
        .with_label_values(&[candidate.status.as_str()])
        .inc();
    publish_status(state, &candidate);
    drop(entry);

    info!(order_id = %id, status = %candidate.status, "order status changed");
    Ok(candidate)
}

pub fn verify_order_code(state: &AppState, id: Uuid, code: i64) -> Result<bool, AppError> {
    let result = {
        let mut order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        register_attempt(&mut order, code, state.code_max_attempts)
    };

    let outcome = match &result {
        Ok(true) => "valid",
        Ok(false) => "invalid",
        Err(_) => "blocked",
    };
    state
        .metrics
        .code_verifications_total
        .with_label_values(&[outcome])
        .inc();

    result
}

fn record_verification(state: &AppState, result: &Result<Effect, AppError>) {
    let outcome = match result {
        Ok(_) => "valid",
        Err(AppError::InvalidConfirmationCode) => "invalid",
        Err(AppError::TooManyAttempts) => "blocked",
        Err(_) => return,
    };
    state
        .metrics
        .code_verifications_total
        .with_label_values(&[outcome])
        .inc();
}

/// Driver-side sample. Only the assigned driver of an order that is on the
/// way may publish.
pub fn record_location(
    state: &AppState,
    order_id: Uuid,
    delivery_user_id: Uuid,
    point: GeoPoint,
) -> Result<LocationEvent, AppError> {
    point.validate()?;

    // Held through the upsert: a delivery committing meanwhile would tear
    // down tracking before this row lands.
    let order = state
        .orders
        .get(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    if order.status != OrderStatus::OnTheWay {
        return Err(AppError::Conflict(format!(
            "order {order_id} is {}, not on the way",
            order.status
        )));
    }
    if order.delivery_user_id != Some(delivery_user_id) {
        return Err(AppError::Conflict(format!(
            "driver {delivery_user_id} is not assigned to order {order_id}"
        )));
    }

    let event = state
        .tracking
        .upsert(order_id, delivery_user_id, point, Utc::now());
    drop(order);

    Ok(event)
}

pub fn stop_location(
    state: &AppState,
    order_id: Uuid,
    delivery_user_id: Uuid,
) -> Result<bool, AppError> {
    get_order(state, order_id)?;
    Ok(state.tracking.remove(order_id, delivery_user_id))
}

/// Where the driver is heading. Pickup orders have no destination.
pub async fn order_destination(state: &AppState, order: &Order) -> Result<GeoPoint, AppError> {
    if order.delivery_type == DeliveryType::Pickup {
        return Err(AppError::BadRequest(format!(
            "order {} is a pickup order",
            order.id
        )));
    }
    resolve_destination(state, order.destination, order.delivery_address.as_deref()).await
}

/// Customer-side read: latest position and ETA. A destination that cannot
/// be resolved degrades to a warning.
pub async fn tracking_snapshot(state: &AppState, order_id: Uuid) -> Result<TrackingSnapshot, AppError> {
    let order = get_order(state, order_id)?;
    let location = state.tracking.latest(order_id);

    let mut eta_minutes = None;
    let mut warning = None;
    if let Some(location) = &location {
        match order_destination(state, &order).await {
            Ok(destination) => eta_minutes = Some(eta_between(&location.point(), &destination)),
            Err(err) => warning = Some(err.to_string()),
        }
    }

    Ok(TrackingSnapshot {
        order_id,
        status: order.status,
        location,
        eta_minutes,
        warning,
    })
}

/// Callers hold the order's entry lock so events leave in commit order.
fn publish_status(state: &AppState, order: &Order) {
    let _ = state.order_events_tx.send(OrderEvent {
        order_id: order.id,
        status: order.status,
        delivery_user_id: order.delivery_user_id,
        at: order.updated_at,
    });
}
