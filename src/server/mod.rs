//! HTTP API over the recipe store, the image cache and the importer.

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;

use axum::routing::get;
use axum::Router;
use log::{info, warn};
use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::images::ImageCache;
use crate::pipelines::RecipeImporter;
use crate::providers::OpenAIProvider;
use crate::store::RecipeStore;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: RecipeStore,
    pub images: Arc<ImageCache>,
    /// `None` when no language model is configured; imports then fail.
    pub importer: Option<Arc<RecipeImporter>>,
}

impl AppState {
    pub fn new(store: RecipeStore, images: Arc<ImageCache>, importer: Option<Arc<RecipeImporter>>) -> Self {
        Self {
            store,
            images,
            importer,
        }
    }

    /// Builds the state described by `config`, creating the data and image
    /// directories when missing.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let store = RecipeStore::new(&config.data_dir);
        std::fs::create_dir_all(store.data_dir())?;

        let images = ImageCache::new(store.images_dir());
        images.ensure_directories()?;

        let importer = match OpenAIProvider::new(&config.openai) {
            Ok(provider) => Some(Arc::new(RecipeImporter::new(
                store.clone(),
                Arc::new(provider),
                &config.import,
            )?)),
            Err(e) => {
                warn!("Recipe import disabled: {}", e);
                None
            }
        };

        Ok(Self::new(store, Arc::new(images), importer))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/constants", get(handlers::constants))
        .route(
            "/api/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route("/api/recipes/{slug}", get(handlers::get_recipe))
        .route("/api/recipe/{slug}", get(handlers::get_recipe))
        .route("/api/images/{size}/{filename}", get(handlers::get_image))
        .route("/api/images/{filename}", get(handlers::get_original_image))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::cors))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .with_state(state)
}

/// Binds the configured address and serves until the process stops.
pub async fn serve(config: &CatalogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState::from_config(config)?;
    let app = router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Serving recipes from {} on http://{}", config.data_dir.display(), address);
    axum::serve(listener, app).await?;
    Ok(())
}
