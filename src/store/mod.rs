mod memory_store;
mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{Category, ListingPage, ListingState, PageSize, Product, ProductFields, RecordScope},
};

/// Persistence for categories and products.
///
/// Write operations that target a single record report whether a row in the
/// expected state was touched, so callers can turn a miss into `NotFound`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find(&self, id: i32, scope: RecordScope) -> Result<Option<Product>>;

    /// Filtered, sorted and paginated active products with their counts.
    async fn query(&self, state: &ListingState) -> Result<ListingPage>;

    async fn list_trashed(&self, page: u32, page_size: PageSize) -> Result<ListingPage>;

    /// Whether an active product other than `except_id` already uses `name`.
    async fn name_taken(&self, name: &str, except_id: Option<i32>) -> Result<bool>;

    async fn create(&self, fields: &ProductFields) -> Result<Product>;

    /// Updates an active product. A `None` image path keeps the stored one.
    async fn update(&self, id: i32, fields: &ProductFields) -> Result<Option<Product>>;

    async fn soft_delete(&self, id: i32) -> Result<bool>;

    async fn restore(&self, id: i32) -> Result<bool>;

    /// Erases a trashed product.
    async fn purge(&self, id: i32) -> Result<bool>;

    async fn is_trashed(&self, id: i32) -> Result<bool>;

    async fn categories(&self) -> Result<Vec<Category>>;

    async fn find_category(&self, id: i32) -> Result<Option<Category>>;

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    async fn create_category(&self, name: &str) -> Result<Category>;

    async fn check_health(&self) -> Result<()>;
}
