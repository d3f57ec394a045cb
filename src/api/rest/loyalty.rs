use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::loyalty;
use crate::error::AppError;
use crate::models::loyalty::LoyaltyAccount;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loyalty/accounts", post(open_account))
        .route("/loyalty/accounts/:customer_id", get(get_account))
}

#[derive(Deserialize)]
pub struct OpenAccountRequest {
    pub customer_id: Uuid,
}

async fn open_account(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OpenAccountRequest>,
) -> Result<Json<LoyaltyAccount>, AppError> {
    Ok(Json(loyalty::open_account(&state, payload.customer_id)?))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<LoyaltyAccount>, AppError> {
    Ok(Json(loyalty::get_account(&state, customer_id)?))
}
