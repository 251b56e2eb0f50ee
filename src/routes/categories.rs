use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    error::Result,
    models::{Actor, Category, CreateCategoryRequest},
};

pub async fn get_all_categories(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Category>>> {
    let categories = state.products.categories(&actor).await?;

    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.products.create_category(&actor, &payload.name).await?;

    Ok((StatusCode::CREATED, Json(category)))
}
