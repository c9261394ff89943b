use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sale::money;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    /// Sum of the line item values.
    #[serde(serialize_with = "money::serialize")]
    pub value: BigDecimal,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One purchased line within a sale.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProductSale {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: i32,
    #[serde(serialize_with = "money::serialize")]
    pub value: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<ProductSale>,
}
