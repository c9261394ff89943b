use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::rbac::{Admins, Authorized, Members, Staff};
use crate::db;
use crate::db::products::ProductChanges;
use crate::error::{is_foreign_key_violation, AppError, FieldErrors};
use crate::models::Product;
use crate::routes::Payload;
use crate::sale::money;
use crate::state::SharedState;

const NAME_MAX: usize = 50;
const STOCK_MAX: i32 = 9999;

#[derive(Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub value: BigDecimal,
    pub stock: i32,
}

#[derive(Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub value: Option<BigDecimal>,
    pub stock: Option<i32>,
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    let len = name.trim().chars().count();
    if len == 0 || len > NAME_MAX {
        errors
            .entry("name".to_string())
            .or_default()
            .push(format!("Length must be between 1 and {NAME_MAX}"));
    }
}

/// Returns the value rounded to cents.
fn check_value(errors: &mut FieldErrors, value: &BigDecimal) -> BigDecimal {
    if !money::within_input_bounds(value) {
        errors
            .entry("value".to_string())
            .or_default()
            .push(format!("Must be between 0 and {}", money::max_value()));
        return BigDecimal::from(0);
    }

    let value = money::normalize(value);
    if !money::fits_column(&value) {
        errors
            .entry("value".to_string())
            .or_default()
            .push(format!("Must be between 0 and {}", money::max_value()));
    }
    value
}

fn check_stock(errors: &mut FieldErrors, stock: i32) {
    if !(0..=STOCK_MAX).contains(&stock) {
        errors
            .entry("stock".to_string())
            .or_default()
            .push(format!("Must be between 0 and {STOCK_MAX}"));
    }
}

pub async fn list(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = db::products::list(&state.pool).await?;
    Ok(Json(products))
}

pub async fn create(
    auth: Authorized<Staff>,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, &req.name);
    let value = check_value(&mut errors, &req.value);
    check_stock(&mut errors, req.stock);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let product = db::products::create(&state.pool, req.name.trim(), req.stock, &value).await?;

    tracing::info!(product_id = %product.id, created_by = %auth.user.id, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = db::products::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}

pub async fn update(
    auth: Authorized<Staff>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateProduct>,
) -> Result<Json<Product>, AppError> {
    let mut errors = FieldErrors::new();
    if let Some(ref name) = req.name {
        check_name(&mut errors, name);
    }
    let value = req.value.as_ref().map(|v| check_value(&mut errors, v));
    if let Some(stock) = req.stock {
        check_stock(&mut errors, stock);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let changes = ProductChanges {
        name: req.name.as_deref().map(str::trim),
        stock: req.stock,
        value: value.as_ref(),
    };

    let product = db::products::update(&state.pool, id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Product not found".to_string()),
            _ => AppError::from(e),
        })?;

    tracing::info!(product_id = %product.id, updated_by = %auth.user.id, "Product updated");

    Ok(Json(product))
}

pub async fn delete(
    auth: Authorized<Admins>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = db::products::delete(&state.pool, id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::Conflict("Product appears in recorded sales and cannot be deleted".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    if deleted == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    tracing::info!(product_id = %id, deleted_by = %auth.user.id, "Product deleted");

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
