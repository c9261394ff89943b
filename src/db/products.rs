use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Product;

pub async fn create(
    pool: &PgPool,
    name: &str,
    stock: i32,
    value: &BigDecimal,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, stock, value) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(stock)
    .bind(value)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name, created_at")
        .fetch_all(pool)
        .await
}

/// Row-lock the given products for the rest of the transaction.
/// Locks are taken in id order so concurrent sales cannot deadlock each other.
pub async fn lock_for_sale<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    ids: &[Uuid],
) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
}

pub async fn decrement_stock<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    quantity: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct ProductChanges<'a> {
    pub name: Option<&'a str>,
    pub stock: Option<i32>,
    pub value: Option<&'a BigDecimal>,
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &ProductChanges<'_>,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET
            name = COALESCE($2, name),
            stock = COALESCE($3, stock),
            value = COALESCE($4, value),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.stock)
    .bind(changes.value)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
