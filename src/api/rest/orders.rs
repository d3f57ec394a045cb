use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::lifecycle::Transition;
use crate::engine::orders::{self, NewOrder};
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(change_status))
        .route("/orders/:id/verify-code", post(verify_code))
}

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    pub points_awarded: i64,
    pub points_award_error: Option<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub code: serde_json::Number,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub valid: bool,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewOrder>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let created = orders::create_order(&state, payload).await?;

    Ok(Json(CreateOrderResponse {
        order: created.order,
        points_awarded: created.points_awarded,
        points_award_error: created.points_award_error.map(|err| err.to_string()),
    }))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Json<Vec<Order>> {
    Json(orders::list_orders(&state, query.status))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(orders::get_order(&state, id)?))
}

async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Transition>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(orders::transition_order(&state, id, payload)?))
}

async fn verify_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    // Fractions and values past i64 are guesses that can never match.
    let code = payload.code.as_i64().unwrap_or(-1);
    let valid = orders::verify_order_code(&state, id, code)?;
    Ok(Json(VerifyCodeResponse { valid }))
}
