use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    config::{AppConfig, AuthConfig, DatabaseDriver, StorageDriver},
    database,
    error::{AppError, Result},
    routes,
    services::{
        Authorizer, ImageStorage, ListingSessions, LocalImageStorage, ProductPolicy,
        ProductService, S3ImageStorage,
    },
    store::{CatalogStore, MemoryStore, PgStore},
};

#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub sessions: Arc<ListingSessions>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        images: Arc<dyn ImageStorage>,
        authorizer: Arc<dyn Authorizer>,
        auth: AuthConfig,
        max_image_kb: usize,
        session_idle_timeout: Duration,
    ) -> Self {
        Self {
            products: ProductService::new(store, images, authorizer, max_image_kb),
            sessions: Arc::new(ListingSessions::new(session_idle_timeout)),
            auth,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn CatalogStore> = match config.database.driver {
            DatabaseDriver::Postgres => {
                Arc::new(PgStore::new(database::create_pool(&config.database).await?))
            }
            DatabaseDriver::Memory => {
                tracing::warn!("Using in-memory store, data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let images: Arc<dyn ImageStorage> = match &config.storage.driver {
            StorageDriver::Local { root, public_url } => {
                Arc::new(LocalImageStorage::new(root.clone(), public_url.clone()))
            }
            StorageDriver::S3 { bucket, assets_url } => {
                Arc::new(S3ImageStorage::connect(bucket.clone(), assets_url.clone()).await?)
            }
        };

        Ok(Self::new(
            store,
            images,
            Arc::new(ProductPolicy),
            config.auth.clone(),
            config.storage.max_image_kb,
            config.listing.session_idle_timeout,
        ))
    }
}

/// Routes bound to `state`, without the outer layers added by `build`.
pub fn router(state: AppState) -> Router {
    routes::create_router(state.clone()).with_state(state)
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let state = AppState::from_config(config).await?;

    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::ConfigError(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins);

    let mut app = routes::create_router(state.clone());
    if let StorageDriver::Local { root, .. } = &config.storage.driver {
        app = app.nest_service("/storage", ServeDir::new(root));
    }

    Ok(app
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .with_state(state))
}
