use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ProductSale, Sale};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    value: &BigDecimal,
) -> Result<Sale, sqlx::Error> {
    sqlx::query_as::<_, Sale>("INSERT INTO sales (user_id, value) VALUES ($1, $2) RETURNING *")
        .bind(user_id)
        .bind(value)
        .fetch_one(executor)
        .await
}

pub async fn create_item<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    sale_id: Uuid,
    product_id: Uuid,
    position: i32,
    quantity: i32,
    value: &BigDecimal,
) -> Result<ProductSale, sqlx::Error> {
    sqlx::query_as::<_, ProductSale>(
        "INSERT INTO product_sales (sale_id, product_id, position, quantity, value)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(sale_id)
    .bind(product_id)
    .bind(position)
    .bind(quantity)
    .bind(value)
    .fetch_one(executor)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Sale>, sqlx::Error> {
    sqlx::query_as::<_, Sale>("SELECT * FROM sales ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Sale>, sqlx::Error> {
    sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_items(pool: &PgPool, sale_id: Uuid) -> Result<Vec<ProductSale>, sqlx::Error> {
    sqlx::query_as::<_, ProductSale>(
        "SELECT * FROM product_sales WHERE sale_id = $1 ORDER BY position",
    )
    .bind(sale_id)
    .fetch_all(pool)
    .await
}
