use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::debug;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::images::SizeClass;
use crate::model::{Category, Diet, Difficulty, RecipeSummary, RecipeType, Season, UiRecipe, Unit};
use crate::pipelines::ImportSummary;

const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub url: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// The closed value sets shared with the front-end.
pub async fn constants() -> Json<Value> {
    fn names<T: ToString>(all: &[T]) -> Vec<String> {
        all.iter().map(ToString::to_string).collect()
    }

    Json(json!({
        "units": names(Unit::ALL),
        "categories": names(Category::ALL),
        "difficulties": names(Difficulty::ALL),
        "diets": names(Diet::ALL),
        "seasons": names(Season::ALL),
        "recipeTypes": names(RecipeType::ALL),
        "imageSizes": names(&SizeClass::ALL),
    }))
}

pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<RecipeSummary>>, ApiError> {
    let summaries = state.store.run_blocking(|store| store.list_all()).await?;
    debug!("Listing {} recipes", summaries.len());
    Ok(Json(summaries))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<UiRecipe>, ApiError> {
    let recipe = state.store.run_blocking(move |store| store.find_by_slug(&slug)).await?;
    Ok(Json(recipe.to_ui()))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportSummary>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("url is required".to_string()));
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => return Err(ApiError::BadRequest(format!("invalid url '{url}'"))),
    }

    let importer = state
        .importer
        .as_ref()
        .ok_or_else(|| ApiError::internal("recipe import is not configured", "no language model provider"))?;
    let summary = importer.import(url).await?;
    Ok(Json(summary))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path((size, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve_image(&state, &size, &filename).await
}

pub async fn get_original_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_image(&state, SizeClass::Original.as_str(), &filename).await
}

async fn serve_image(state: &AppState, size: &str, filename: &str) -> Result<Response, ApiError> {
    let size: SizeClass = size.parse()?;
    let original = state.images.locate_original(filename).await?;
    let derivative = state.images.resolve_class(&original, size).await?;

    let bytes = tokio::fs::read(&derivative)
        .await
        .map_err(|e| ApiError::internal("failed to read image", format!("{}: {e}", derivative.display())))?;

    Ok((
        [(CONTENT_TYPE, "image/webp"), (CACHE_CONTROL, IMAGE_CACHE_CONTROL)],
        bytes,
    )
        .into_response())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
