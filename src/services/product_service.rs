use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::{
        Actor, Category, Flash, FormField, FormMode, ListingPage, PageSize, Product,
        ProductFields, ProductFormView, ProductInput, ProductResponse, ProductSavedResponse,
        RecordScope, ValidationErrors, invalid_category_message, name_taken_message, NAME_MAX,
    },
    services::{
        bulk_service::{self, BulkDeleteOutcome},
        image_storage::{ImageStorage, PRODUCT_IMAGE_FOLDER},
        product_policy::{Authorizer, Capability},
    },
    store::CatalogStore,
};

pub const TRASH_PAGE_SIZE: PageSize = PageSize::Ten;

/// Product operations with their authorization, validation and image
/// handling. Cheap to clone.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn CatalogStore>,
    images: Arc<dyn ImageStorage>,
    authorizer: Arc<dyn Authorizer>,
    max_image_kb: usize,
}

fn product_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Product {} not found", id))
}

impl ProductService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        images: Arc<dyn ImageStorage>,
        authorizer: Arc<dyn Authorizer>,
        max_image_kb: usize,
    ) -> Self {
        Self {
            store,
            images,
            authorizer,
            max_image_kb,
        }
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub fn authorize(
        &self,
        actor: &Actor,
        capability: Capability,
        product: Option<&Product>,
    ) -> Result<()> {
        if self.authorizer.can(actor, capability, product) {
            Ok(())
        } else {
            tracing::warn!(
                "User {} denied {} on product {:?}",
                actor.id,
                capability.as_str(),
                product.map(|p| p.id)
            );
            Err(AppError::Forbidden(
                "This action is unauthorized.".to_string(),
            ))
        }
    }

    pub fn to_response(&self, product: Product) -> ProductResponse {
        let image_url = product
            .image_path
            .as_deref()
            .map(|path| self.images.url_for(path));

        ProductResponse { product, image_url }
    }

    async fn find_or_fail(&self, id: i32, scope: RecordScope) -> Result<Product> {
        self.store
            .find(id, scope)
            .await?
            .ok_or_else(|| product_not_found(id))
    }

    /// Runs every rule and collects all failures, including the ones that
    /// need the store.
    async fn validate(&self, input: &ProductInput, except_id: Option<i32>) -> Result<ProductFields> {
        let mut errors = ValidationErrors::new();
        let checked = input.check(self.max_image_kb, &mut errors);

        if let Some(name) = &checked.name {
            if self.store.name_taken(name, except_id).await? {
                errors.add(FormField::Name, name_taken_message());
            }
        }
        if let Some(category_id) = checked.category_id {
            if self.store.find_category(category_id).await?.is_none() {
                errors.add(FormField::CategoryId, invalid_category_message());
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        checked.into_fields(None).ok_or_else(|| {
            AppError::InternalError("Validated product input is incomplete".to_string())
        })
    }

    /// Live validation of a single form field. With a `product_id` the
    /// caller must be allowed to update that product, otherwise to create one.
    pub async fn validate_field(
        &self,
        actor: &Actor,
        field: FormField,
        product_id: Option<i32>,
        input: &ProductInput,
    ) -> Result<Vec<String>> {
        match product_id {
            Some(id) => {
                let product = self.find_or_fail(id, RecordScope::Active).await?;
                self.authorize(actor, Capability::Update, Some(&product))?;
            }
            None => self.authorize(actor, Capability::Create, None)?,
        }

        let mut errors = ValidationErrors::new();
        input.check_field(field, self.max_image_kb, &mut errors);

        if !errors.has(field) {
            match field {
                FormField::Name => {
                    if let Some(name) = input.name.as_deref().map(str::trim) {
                        if self.store.name_taken(name, product_id).await? {
                            errors.add(FormField::Name, name_taken_message());
                        }
                    }
                }
                FormField::CategoryId => {
                    if let Some(id) = input
                        .category_id
                        .as_deref()
                        .and_then(|raw| raw.trim().parse::<i32>().ok())
                    {
                        if self.store.find_category(id).await?.is_none() {
                            errors.add(FormField::CategoryId, invalid_category_message());
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(errors.only(field).get(field).to_vec())
    }

    pub async fn create(&self, actor: &Actor, input: ProductInput) -> Result<ProductSavedResponse> {
        self.authorize(actor, Capability::Create, None)?;

        let mut fields = self.validate(&input, None).await?;

        if let Some(image) = &input.image {
            fields.image_path = Some(self.images.store(image, PRODUCT_IMAGE_FOLDER).await?);
        }

        let product = match self.store.create(&fields).await {
            Ok(product) => product,
            Err(e) => {
                self.discard_image(fields.image_path.as_deref()).await;
                return Err(e);
            }
        };

        tracing::info!("User {} created product {}", actor.id, product.id);

        Ok(ProductSavedResponse {
            message: "Product created successfully".to_string(),
            product: self.to_response(product),
        })
    }

    pub async fn create_form(&self, actor: &Actor) -> Result<ProductFormView> {
        self.authorize(actor, Capability::Create, None)?;

        Ok(ProductFormView {
            mode: FormMode::Create,
            product_id: None,
            name: None,
            price: None,
            stock: None,
            category_id: None,
            description: None,
            image_url: None,
            categories: self.store.categories().await?,
        })
    }

    pub async fn edit(&self, actor: &Actor, id: i32) -> Result<ProductFormView> {
        let product = self.find_or_fail(id, RecordScope::Active).await?;
        self.authorize(actor, Capability::Update, Some(&product))?;

        let categories = self.store.categories().await?;

        Ok(ProductFormView {
            mode: FormMode::Edit,
            product_id: Some(product.id),
            name: Some(product.name.clone()),
            price: Some(product.price.to_string()),
            stock: Some(product.stock.to_string()),
            category_id: Some(product.category_id.to_string()),
            description: product.description.clone(),
            image_url: product
                .image_path
                .as_deref()
                .map(|path| self.images.url_for(path)),
            categories,
        })
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        input: ProductInput,
    ) -> Result<ProductSavedResponse> {
        let existing = self.find_or_fail(id, RecordScope::Active).await?;
        self.authorize(actor, Capability::Update, Some(&existing))?;

        let mut fields = self.validate(&input, Some(id)).await?;

        if let Some(image) = &input.image {
            fields.image_path = Some(self.images.store(image, PRODUCT_IMAGE_FOLDER).await?);
        }

        let updated = match self.store.update(id, &fields).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                self.discard_image(fields.image_path.as_deref()).await;
                return Err(product_not_found(id));
            }
            Err(e) => {
                self.discard_image(fields.image_path.as_deref()).await;
                return Err(e);
            }
        };

        if fields.image_path.is_some() && existing.image_path != fields.image_path {
            self.discard_image(existing.image_path.as_deref()).await;
        }

        tracing::info!("User {} updated product {}", actor.id, id);

        Ok(ProductSavedResponse {
            message: "Product updated successfully".to_string(),
            product: self.to_response(updated),
        })
    }

    /// Best effort removal of an image that is no longer referenced.
    async fn discard_image(&self, path: Option<&str>) {
        if let Some(path) = path {
            if let Err(e) = self.images.delete(path).await {
                tracing::error!("Failed to remove image {}: {}", path, e);
            }
        }
    }

    pub async fn show(&self, actor: &Actor, id: i32) -> Result<ProductResponse> {
        let product = self.find_or_fail(id, RecordScope::Active).await?;
        self.authorize(actor, Capability::View, Some(&product))?;

        Ok(self.to_response(product))
    }

    pub async fn soft_delete(&self, actor: &Actor, id: i32) -> Result<Flash> {
        let product = self.find_or_fail(id, RecordScope::Active).await?;
        self.authorize(actor, Capability::Delete, Some(&product))?;

        if !self.store.soft_delete(id).await? {
            return Err(product_not_found(id));
        }

        tracing::info!("User {} moved product {} to trash", actor.id, id);

        Ok(Flash::success("Product moved to Trash"))
    }

    pub async fn restore(&self, actor: &Actor, id: i32) -> Result<Flash> {
        let product = self.find_or_fail(id, RecordScope::Trashed).await?;
        self.authorize(actor, Capability::Restore, Some(&product))?;

        if !self.store.restore(id).await? {
            return Err(product_not_found(id));
        }

        tracing::info!("User {} restored product {}", actor.id, id);

        Ok(Flash::success("Product restored"))
    }

    /// Erases a trashed product together with its stored image.
    pub async fn purge(&self, actor: &Actor, id: i32) -> Result<Flash> {
        let product = self.find_or_fail(id, RecordScope::Trashed).await?;
        self.authorize(actor, Capability::ForceDelete, Some(&product))?;

        if let Some(path) = &product.image_path {
            self.images.delete(path).await?;
        }

        if !self.store.purge(id).await? {
            return Err(product_not_found(id));
        }

        tracing::info!("User {} permanently deleted product {}", actor.id, id);

        Ok(Flash::success("Product deleted permanently"))
    }

    pub async fn list_trashed(&self, actor: &Actor, page: u32) -> Result<ListingPage> {
        self.authorize(actor, Capability::ViewAny, None)?;

        self.store.list_trashed(page, TRASH_PAGE_SIZE).await
    }

    pub async fn bulk_delete(&self, actor: &Actor, ids: BTreeSet<i32>) -> Result<BulkDeleteOutcome> {
        bulk_service::bulk_soft_delete(self.store.as_ref(), self.authorizer.as_ref(), actor, ids)
            .await
    }

    pub async fn categories(&self, actor: &Actor) -> Result<Vec<Category>> {
        self.authorize(actor, Capability::ViewAny, None)?;

        self.store.categories().await
    }

    pub async fn create_category(&self, actor: &Actor, name: &str) -> Result<Category> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        let name = name.trim();
        let mut errors = ValidationErrors::new();
        if name.is_empty() {
            errors.add(FormField::Name, FormField::Name.required_message());
        } else if name.chars().count() > NAME_MAX {
            errors.add(
                FormField::Name,
                format!(
                    "The name field must not be greater than {} characters.",
                    NAME_MAX
                ),
            );
        } else if self.store.find_category_by_name(name).await?.is_some() {
            errors.add(FormField::Name, name_taken_message());
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let category = self.store.create_category(name).await?;

        tracing::info!("User {} created category {}", actor.id, category.id);

        Ok(category)
    }
}
