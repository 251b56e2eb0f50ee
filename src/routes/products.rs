use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        Actor, Flash, ImageUpload, ProductFormView, ProductInput, ProductResponse,
        ProductSavedResponse, ValidateFieldRequest, ValidateFieldResponse,
    },
};

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Invalid form data: {}", e))
}

/// Reads the product form. An empty file input counts as no image.
async fn read_product_form(mut multipart: Multipart) -> Result<ProductInput> {
    let mut input = ProductInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;

                if !bytes.is_empty() {
                    input.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "name" | "price" | "stock" | "category_id" | "description" => {
                let value = Some(field.text().await.map_err(multipart_error)?);
                match name.as_str() {
                    "name" => input.name = value,
                    "price" => input.price = value,
                    "stock" => input.stock = value,
                    "category_id" => input.category_id = value,
                    _ => input.description = value,
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductSavedResponse>)> {
    let input = read_product_form(multipart).await?;
    let saved = state.products.create(&actor, input).await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn create_form(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ProductFormView>> {
    Ok(Json(state.products.create_form(&actor).await?))
}

pub async fn validate_field(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ValidateFieldRequest>,
) -> Result<Json<ValidateFieldResponse>> {
    let errors = state
        .products
        .validate_field(&actor, payload.field, payload.product_id, &payload.input)
        .await?;

    Ok(Json(ValidateFieldResponse {
        field: payload.field,
        errors,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<Json<ProductResponse>> {
    Ok(Json(state.products.show(&actor, id).await?))
}

pub async fn edit_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<Json<ProductFormView>> {
    Ok(Json(state.products.edit(&actor, id).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ProductSavedResponse>> {
    let input = read_product_form(multipart).await?;

    Ok(Json(state.products.update(&actor, id, input).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<Json<Flash>> {
    Ok(Json(state.products.soft_delete(&actor, id).await?))
}
