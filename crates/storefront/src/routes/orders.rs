//! Checkout route handler.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::instrument;

use super::ApiResponse;
use crate::error::{AppError, Endpoint, Result};
use crate::models::{Order, OrderRequest};
use crate::state::AppState;

/// Place an order by mailing the shop owner and the buyer.
///
/// POST /api/submit-order
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    body: std::result::Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>> {
    let Json(req) = body.map_err(|e| AppError::malformed_body(Endpoint::SubmitOrder, &e))?;
    let order = Order::try_from(req).map_err(crate::services::OrderError::from)?;

    state.orders().submit(&order).await?;

    Ok(Json(ApiResponse::success(
        "Заказ успешно оформлен! Письма отправлены.",
    )))
}
