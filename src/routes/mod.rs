mod categories;
mod health;
mod listing;
mod products;
mod trash;

use axum::{
    Router,
    middleware,
    routing::{delete, get, post},
};

use crate::{AppState, middleware::auth_middleware};

pub fn create_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/categories",
            get(categories::get_all_categories).post(categories::create_category),
        )
        .route("/products", post(products::create_product))
        .route("/products/create", get(products::create_form))
        .route("/products/validate", post(products::validate_field))
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/{id}/edit", get(products::edit_product))
        .route("/listing", post(listing::open_listing))
        .route(
            "/listing/{session}",
            get(listing::get_listing).delete(listing::close_listing),
        )
        .route("/listing/{session}/intents", post(listing::apply_intent))
        .route("/trash", get(trash::get_trash))
        .route("/trash/{id}", delete(trash::purge_product))
        .route("/trash/{id}/restore", post(trash::restore_product))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .merge(protected)
}
