use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: i32,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Which slice of the products table a lookup is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    Active,
    Trashed,
    Any,
}

impl RecordScope {
    pub fn admits(&self, product: &Product) -> bool {
        match self {
            RecordScope::Active => !product.is_trashed(),
            RecordScope::Trashed => product.is_trashed(),
            RecordScope::Any => true,
        }
    }
}

/// Validated column values written by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: i32,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductSavedResponse {
    pub message: String,
    pub product: ProductResponse,
}
