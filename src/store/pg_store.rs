use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    database,
    error::{AppError, Result},
    models::{Category, ListingPage, ListingState, PageSize, Product, ProductFields, RecordScope},
    queries::{category_queries, product_queries},
    store::CatalogStore,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find(&self, id: i32, scope: RecordScope) -> Result<Option<Product>> {
        product_queries::find_by_id(&self.pool, id, scope).await
    }

    async fn query(&self, state: &ListingState) -> Result<ListingPage> {
        product_queries::search_products(&self.pool, state).await
    }

    async fn list_trashed(&self, page: u32, page_size: PageSize) -> Result<ListingPage> {
        product_queries::find_trashed(&self.pool, page, page_size).await
    }

    async fn name_taken(&self, name: &str, except_id: Option<i32>) -> Result<bool> {
        product_queries::name_exists(&self.pool, name, except_id).await
    }

    async fn create(&self, fields: &ProductFields) -> Result<Product> {
        let id = product_queries::create_product(&self.pool, fields).await?;

        product_queries::find_by_id(&self.pool, id, RecordScope::Any)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("Product {} vanished after insert", id)))
    }

    async fn update(&self, id: i32, fields: &ProductFields) -> Result<Option<Product>> {
        if product_queries::update_product(&self.pool, id, fields).await? == 0 {
            return Ok(None);
        }

        product_queries::find_by_id(&self.pool, id, RecordScope::Active).await
    }

    async fn soft_delete(&self, id: i32) -> Result<bool> {
        Ok(product_queries::soft_delete_product(&self.pool, id).await? > 0)
    }

    async fn restore(&self, id: i32) -> Result<bool> {
        Ok(product_queries::restore_product(&self.pool, id).await? > 0)
    }

    async fn purge(&self, id: i32) -> Result<bool> {
        Ok(product_queries::purge_product(&self.pool, id).await? > 0)
    }

    async fn is_trashed(&self, id: i32) -> Result<bool> {
        product_queries::is_trashed(&self.pool, id).await
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        category_queries::get_all(&self.pool).await
    }

    async fn find_category(&self, id: i32) -> Result<Option<Category>> {
        category_queries::find_by_id(&self.pool, id).await
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        category_queries::find_by_name(&self.pool, name).await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        category_queries::create_category(&self.pool, name).await
    }

    async fn check_health(&self) -> Result<()> {
        database::check_health(&self.pool).await
    }
}
