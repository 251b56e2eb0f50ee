use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::{AppError, Result},
    models::{
        Category, ListingPage, ListingState, PageSize, Product, ProductFields, RecordScope,
    },
    store::CatalogStore,
};

#[derive(Default)]
struct MemoryState {
    next_product_id: i32,
    next_category_id: i32,
    categories: BTreeMap<i32, Category>,
    products: BTreeMap<i32, Product>,
}

impl MemoryState {
    /// Products carry the joined category name, refreshed on every read.
    fn joined(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.category_name = self
            .categories
            .get(&product.category_id)
            .map(|c| c.name.clone());
        product
    }

    fn name_taken(&self, name: &str, except_id: Option<i32>) -> bool {
        self.products
            .values()
            .any(|p| !p.is_trashed() && p.name == name && Some(p.id) != except_id)
    }

    fn check_constraints(&self, fields: &ProductFields, except_id: Option<i32>) -> Result<()> {
        if !self.categories.contains_key(&fields.category_id) {
            return Err(AppError::BadRequest(format!(
                "Category with id {} does not exist",
                fields.category_id
            )));
        }
        if self.name_taken(&fields.name, except_id) {
            return Err(AppError::Conflict(format!(
                "Product name '{}' is already in use",
                fields.name
            )));
        }
        Ok(())
    }
}

/// Keeps the whole catalog in process memory. Used by the test suite and
/// when the service runs with `DB_DRIVER=memory`.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_product_id: 1,
                next_category_id: 1,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| AppError::InternalError("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| AppError::InternalError("Memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find(&self, id: i32, scope: RecordScope) -> Result<Option<Product>> {
        let state = self.read()?;

        Ok(state
            .products
            .get(&id)
            .filter(|p| scope.admits(p))
            .map(|p| state.joined(p)))
    }

    async fn query(&self, listing: &ListingState) -> Result<ListingPage> {
        let state = self.read()?;
        let records: Vec<Product> = state.products.values().map(|p| state.joined(p)).collect();

        Ok(listing.apply(records))
    }

    async fn list_trashed(&self, page: u32, page_size: PageSize) -> Result<ListingPage> {
        let state = self.read()?;

        let mut trashed: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_trashed())
            .map(|p| state.joined(p))
            .collect();
        trashed.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then_with(|| a.id.cmp(&b.id)));

        let count = trashed.len() as i64;
        Ok(ListingPage::slice(trashed, count, page, page_size))
    }

    async fn name_taken(&self, name: &str, except_id: Option<i32>) -> Result<bool> {
        Ok(self.read()?.name_taken(name, except_id))
    }

    async fn create(&self, fields: &ProductFields) -> Result<Product> {
        let mut state = self.write()?;
        state.check_constraints(fields, None)?;

        let id = state.next_product_id;
        state.next_product_id += 1;

        let now = Utc::now();
        let product = Product {
            id,
            name: fields.name.clone(),
            price: fields.price,
            stock: fields.stock,
            category_id: fields.category_id,
            category_name: None,
            description: fields.description.clone(),
            image_path: fields.image_path.clone(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(id, product.clone());

        Ok(state.joined(&product))
    }

    async fn update(&self, id: i32, fields: &ProductFields) -> Result<Option<Product>> {
        let mut state = self.write()?;

        if !state.products.get(&id).is_some_and(|p| !p.is_trashed()) {
            return Ok(None);
        }
        state.check_constraints(fields, Some(id))?;

        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = fields.name.clone();
        product.price = fields.price;
        product.stock = fields.stock;
        product.category_id = fields.category_id;
        product.description = fields.description.clone();
        if let Some(path) = &fields.image_path {
            product.image_path = Some(path.clone());
        }
        product.updated_at = Utc::now();

        let updated = product.clone();
        Ok(Some(state.joined(&updated)))
    }

    async fn soft_delete(&self, id: i32) -> Result<bool> {
        let mut state = self.write()?;

        match state.products.get_mut(&id) {
            Some(product) if !product.is_trashed() => {
                let now = Utc::now();
                product.deleted_at = Some(now);
                product.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore(&self, id: i32) -> Result<bool> {
        let mut state = self.write()?;

        let name = match state.products.get(&id) {
            Some(product) if product.is_trashed() => product.name.clone(),
            _ => return Ok(false),
        };
        if state.name_taken(&name, Some(id)) {
            return Err(AppError::Conflict(format!(
                "Product name '{}' is already in use",
                name
            )));
        }

        if let Some(product) = state.products.get_mut(&id) {
            product.deleted_at = None;
            product.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn purge(&self, id: i32) -> Result<bool> {
        let mut state = self.write()?;

        if !state.products.get(&id).is_some_and(Product::is_trashed) {
            return Ok(false);
        }
        Ok(state.products.remove(&id).is_some())
    }

    async fn is_trashed(&self, id: i32) -> Result<bool> {
        Ok(self
            .read()?
            .products
            .get(&id)
            .is_some_and(Product::is_trashed))
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let state = self.read()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: i32) -> Result<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .read()?
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut state = self.write()?;

        if state.categories.values().any(|c| c.name == name) {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let id = state.next_category_id;
        state.next_category_id += 1;

        let now = Utc::now();
        let category = Category {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(id, category.clone());

        Ok(category)
    }

    async fn check_health(&self) -> Result<()> {
        self.read().map(|_| ())
    }
}
