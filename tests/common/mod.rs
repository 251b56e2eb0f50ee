#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_admin::{
    AppState,
    config::AuthConfig,
    models::{Actor, Category, ImageUpload, Product, ProductInput, UserRole},
    services::{
        Authorizer, Capability, DEFAULT_SESSION_IDLE_TIMEOUT, LocalImageStorage, ProductPolicy,
        ProductService,
    },
    store::{CatalogStore, MemoryStore},
};
use rust_decimal::Decimal;
use tempfile::TempDir;

pub const JWT_SECRET: &str = "integration-secret";

pub fn admin() -> Actor {
    Actor::new(1, "admin@example.com", Some(UserRole::Admin))
}

pub fn user() -> Actor {
    Actor::new(2, "user@example.com", Some(UserRole::User))
}

/// Follows `ProductPolicy` but refuses deleting the listed products.
pub struct DenyDelete(pub BTreeSet<i32>);

impl Authorizer for DenyDelete {
    fn can(&self, actor: &Actor, capability: Capability, product: Option<&Product>) -> bool {
        if capability == Capability::Delete && product.is_some_and(|p| self.0.contains(&p.id)) {
            return false;
        }
        ProductPolicy.can(actor, capability, product)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub storage: TempDir,
    pub phones: Category,
    pub laptops: Category,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_authorizer(Arc::new(ProductPolicy)).await
    }

    pub async fn with_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let phones = store.create_category("Phones").await.unwrap();
        let laptops = store.create_category("Laptops").await.unwrap();

        let storage = tempfile::tempdir().unwrap();
        let images = Arc::new(LocalImageStorage::new(storage.path(), "/storage"));

        let state = AppState::new(
            store.clone(),
            images,
            authorizer,
            AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            1024,
            DEFAULT_SESSION_IDLE_TIMEOUT,
        );

        Self {
            state,
            store,
            storage,
            phones,
            laptops,
        }
    }

    pub fn products(&self) -> &ProductService {
        &self.state.products
    }

    pub async fn seed(&self, name: &str, price: i64, stock: i32, category: &Category) -> Product {
        let input = input(name, &price.to_string(), &stock.to_string(), category.id);
        self.products()
            .create(&admin(), input)
            .await
            .unwrap()
            .product
            .product
    }

    /// Seeds `count` products named "Item 01", "Item 02", ...
    pub async fn seed_many(&self, count: i32) -> Vec<Product> {
        let mut products = Vec::new();
        for i in 1..=count {
            products.push(
                self.seed(&format!("Item {:02}", i), i64::from(i), i, &self.phones)
                    .await,
            );
        }
        products
    }

    pub fn image_exists(&self, path: &str) -> bool {
        self.storage.path().join(path).exists()
    }
}

pub fn input(name: &str, price: &str, stock: &str, category_id: i32) -> ProductInput {
    ProductInput {
        name: Some(name.to_string()),
        price: Some(price.to_string()),
        stock: Some(stock.to_string()),
        category_id: Some(category_id.to_string()),
        description: None,
        image: None,
    }
}

pub fn png(file_name: &str) -> ImageUpload {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0; 64]);
    ImageUpload {
        file_name: file_name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes,
    }
}

pub fn price(units: i64) -> Decimal {
    Decimal::new(units, 0)
}
