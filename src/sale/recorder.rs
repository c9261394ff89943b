use std::collections::HashMap;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, FieldErrors};
use crate::models::{Product, SaleDetail};
use crate::sale::money;

/// One requested (product, quantity) pair.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(alias = "product_uuid")]
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub value: BigDecimal,
}

/// Result of pricing a request against locked product rows.
#[derive(Debug)]
pub struct PricedSale {
    /// In request order.
    pub lines: Vec<PricedLine>,
    /// Quantity to take off each product, in first-appearance order.
    pub decrements: Vec<(Uuid, i32)>,
    pub total: BigDecimal,
}

/// Shape checks that need no storage access.
pub fn validate(items: &[LineItem]) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();

    if items.is_empty() {
        errors.insert(
            "products".to_string(),
            vec!["At least one product is required".to_string()],
        );
    }

    for (i, item) in items.iter().enumerate() {
        if item.quantity < 1 {
            errors
                .entry(format!("products[{i}].quantity"))
                .or_default()
                .push("Must be greater than or equal to 1".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Price every line and check stock. Nothing here touches storage, so a
/// failure leaves no trace.
pub fn price(
    items: &[LineItem],
    products: &HashMap<Uuid, Product>,
) -> Result<PricedSale, AppError> {
    let mut requested: Vec<(Uuid, i64)> = Vec::new();
    for item in items {
        if !products.contains_key(&item.product_id) {
            return Err(AppError::NotFound(format!(
                "Product {} not found",
                item.product_id
            )));
        }
        match requested.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => *quantity += i64::from(item.quantity),
            None => requested.push((item.product_id, i64::from(item.quantity))),
        }
    }

    let mut decrements = Vec::with_capacity(requested.len());
    for (product_id, quantity) in requested {
        let product = &products[&product_id];
        if quantity > i64::from(product.stock) {
            return Err(AppError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }
        // bounded by stock, which is an i32
        decrements.push((product_id, quantity as i32));
    }

    let lines: Vec<PricedLine> = items
        .iter()
        .map(|item| PricedLine {
            product_id: item.product_id,
            quantity: item.quantity,
            value: money::line_value(&products[&item.product_id].value, item.quantity),
        })
        .collect();

    let total = money::total(lines.iter().map(|line| &line.value));
    if !money::fits_column(&total) {
        return Err(AppError::field(
            "products",
            "Sale total exceeds the maximum recordable value",
        ));
    }

    Ok(PricedSale {
        lines,
        decrements,
        total,
    })
}

/// Record a sale for `identity`.
///
/// Runs in one transaction: the owner lookup, row locks on every product
/// involved, the stock check, the sale row, one line row per item and the
/// stock decrements. Any error drops the transaction uncommitted.
pub async fn create_sale(
    pool: &PgPool,
    identity: &str,
    items: &[LineItem],
) -> Result<SaleDetail, AppError> {
    validate(items)?;

    let mut tx = pool.begin().await?;

    let user = db::users::find_by_email(&mut *tx, identity)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    ids.sort();
    ids.dedup();

    let products: HashMap<Uuid, Product> = db::products::lock_for_sale(&mut *tx, &ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let priced = price(items, &products)?;

    let sale = db::sales::create(&mut *tx, user.id, &priced.total).await?;

    let mut stored = Vec::with_capacity(priced.lines.len());
    for (position, line) in priced.lines.iter().enumerate() {
        let item = db::sales::create_item(
            &mut *tx,
            sale.id,
            line.product_id,
            position as i32,
            line.quantity,
            &line.value,
        )
        .await?;
        stored.push(item);
    }

    for (product_id, quantity) in &priced.decrements {
        db::products::decrement_stock(&mut *tx, *product_id, *quantity).await?;
    }

    tx.commit().await?;

    tracing::info!(
        sale_id = %sale.id,
        user_id = %user.id,
        lines = stored.len(),
        total = %priced.total,
        "Sale recorded"
    );

    Ok(SaleDetail {
        sale,
        items: stored,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::*;

    fn product(stock: i32, value: &str) -> Product {
        Product {
            id: Uuid::now_v7(),
            name: "coffee".to_string(),
            stock,
            value: BigDecimal::from_str(value).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn catalog(products: &[&Product]) -> HashMap<Uuid, Product> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    fn line(product: &Product, quantity: i32) -> LineItem {
        LineItem {
            product_id: product.id,
            quantity,
        }
    }

    #[test]
    fn empty_sale_is_rejected() {
        let Err(AppError::Validation(fields)) = validate(&[]) else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("products"));
    }

    #[test]
    fn non_positive_quantities_are_reported_per_line() {
        let coffee = product(5, "2.50");
        let items = [line(&coffee, 1), line(&coffee, 0), line(&coffee, -2)];
        let Err(AppError::Validation(fields)) = validate(&items) else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("products[1].quantity"));
        assert!(fields.contains_key("products[2].quantity"));
    }

    #[test]
    fn total_is_sum_of_lines() {
        let coffee = product(5, "2.50");
        let cake = product(10, "4.15");
        let products = catalog(&[&coffee, &cake]);

        let priced = price(&[line(&coffee, 3), line(&cake, 2)], &products).unwrap();

        assert_eq!(priced.lines[0].value.to_string(), "7.50");
        assert_eq!(priced.lines[1].value.to_string(), "8.30");
        assert_eq!(priced.total.to_string(), "15.80");
        assert_eq!(priced.decrements, vec![(coffee.id, 3), (cake.id, 2)]);
    }

    #[test]
    fn quantity_above_stock_fails() {
        let coffee = product(2, "2.50");
        let products = catalog(&[&coffee]);

        match price(&[line(&coffee, 3)], &products) {
            Err(AppError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                assert_eq!(product_id, coffee.id);
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
    }

    #[test]
    fn repeated_product_is_checked_against_combined_quantity() {
        let coffee = product(5, "1.00");
        let products = catalog(&[&coffee]);

        let priced = price(&[line(&coffee, 2), line(&coffee, 3)], &products).unwrap();
        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.decrements, vec![(coffee.id, 5)]);

        assert!(matches!(
            price(&[line(&coffee, 3), line(&coffee, 3)], &products),
            Err(AppError::InsufficientStock { requested: 6, .. })
        ));
    }

    #[test]
    fn unknown_product_is_a_lookup_error() {
        let coffee = product(5, "1.00");
        let ghost = product(5, "1.00");
        let products = catalog(&[&coffee]);

        assert!(matches!(
            price(&[line(&coffee, 1), line(&ghost, 1)], &products),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn oversized_total_is_rejected() {
        let bar = product(9999, "99999999.99");
        let products = catalog(&[&bar]);

        assert!(matches!(
            price(&[line(&bar, 2)], &products),
            Err(AppError::Validation(_))
        ));
    }
}
