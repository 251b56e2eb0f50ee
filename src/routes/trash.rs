use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
    AppState,
    error::Result,
    models::{Actor, Flash, ListingPage},
};

#[derive(Debug, Deserialize)]
pub struct TrashQuery {
    pub page: Option<u32>,
}

pub async fn get_trash(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<TrashQuery>,
) -> Result<Json<ListingPage>> {
    let page = state
        .products
        .list_trashed(&actor, query.page.unwrap_or(1))
        .await?;

    Ok(Json(page))
}

pub async fn restore_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<Json<Flash>> {
    Ok(Json(state.products.restore(&actor, id).await?))
}

pub async fn purge_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<Json<Flash>> {
    Ok(Json(state.products.purge(&actor, id).await?))
}
