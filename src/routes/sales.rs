use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::rbac::{Authorized, Members};
use crate::db;
use crate::error::AppError;
use crate::models::{Sale, SaleDetail};
use crate::routes::Payload;
use crate::sale::recorder::{self, LineItem};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateSale {
    pub products: Vec<LineItem>,
}

pub async fn list(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Sale>>, AppError> {
    let sales = db::sales::list(&state.pool).await?;
    Ok(Json(sales))
}

pub async fn create(
    auth: Authorized<Members>,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateSale>,
) -> Result<(StatusCode, Json<SaleDetail>), AppError> {
    let detail = recorder::create_sale(&state.pool, &auth.user.email, &req.products).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleDetail>, AppError> {
    let sale = db::sales::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale not found".to_string()))?;

    let items = db::sales::list_items(&state.pool, id).await?;

    Ok(Json(SaleDetail { sale, items }))
}
