use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::Result,
    models::Actor,
    services::{ListingIntent, ListingView},
};

pub async fn open_listing(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<(StatusCode, Json<ListingView>)> {
    let view = state.sessions.open(&state.products, &actor).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session): Path<Uuid>,
) -> Result<Json<ListingView>> {
    let view = state.sessions.render(&state.products, &actor, session).await?;

    Ok(Json(view))
}

pub async fn apply_intent(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session): Path<Uuid>,
    Json(intent): Json<ListingIntent>,
) -> Result<Json<ListingView>> {
    let view = state
        .sessions
        .apply(&state.products, &actor, session, intent)
        .await?;

    Ok(Json(view))
}

pub async fn close_listing(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.close(&actor, session).await?;

    Ok(StatusCode::NO_CONTENT)
}
