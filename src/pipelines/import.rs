use log::{debug, info, warn};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::images::ACCEPTED_EXTENSIONS;
use crate::model::{Recipe, RecipeSummary};
use crate::pipelines::post_process::post_process;
use crate::providers::{cleanup_prompt, page_message, structure_prompt, LlmProvider};
use crate::store::RecipeStore;
use crate::url_to_text::{RequestFetcher, WebContent};
use crate::validation::{check_references, validate_schema};

/// Result of a successful import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub slug: String,
    pub title: String,
    pub recipe: RecipeSummary,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Turns a recipe page URL into a stored recipe plus its original image.
///
/// The pipeline runs once per call with no retries: conflict check, fetch,
/// content extraction, optional cleanup pass, structured extraction and
/// validation, post-processing, image download and persistence. Nothing is
/// written to the store unless every earlier step succeeded.
pub struct RecipeImporter {
    store: RecipeStore,
    provider: Arc<dyn LlmProvider>,
    page_fetcher: RequestFetcher,
    image_fetcher: RequestFetcher,
    cleanup: bool,
}

impl RecipeImporter {
    pub fn new(store: RecipeStore, provider: Arc<dyn LlmProvider>, config: &ImportConfig) -> Result<Self, ImportError> {
        let page_fetcher = RequestFetcher::new(Some(config.fetch_timeout()))
            .map_err(|e| ImportError::FetchError(format!("cannot build HTTP client: {e}")))?;
        let image_fetcher = RequestFetcher::new(Some(config.image_timeout()))
            .map_err(|e| ImportError::ImageDownloadError(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            store,
            provider,
            page_fetcher,
            image_fetcher,
            cleanup: config.cleanup,
        })
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    pub async fn import(&self, raw_url: &str) -> Result<ImportSummary, ImportError> {
        let url = parse_source_url(raw_url)?;
        info!("Importing recipe from {}", url);

        let wanted = raw_url.trim().to_string();
        let existing = self
            .store
            .run_blocking(move |store| store.find_by_source_url(&wanted))
            .await?;
        if let Some(existing) = existing {
            return Err(ImportError::Conflict(existing.slug()));
        }

        let html = self
            .page_fetcher
            .fetch(url.as_str())
            .await
            .map_err(ImportError::FetchError)?;

        let page = WebContent::extract(&html, url.as_str()).map_err(ImportError::ExtractionError)?;
        if page.main_content.trim().is_empty() {
            return Err(ImportError::ExtractionError("page has no readable content".to_string()));
        }

        let content = if self.cleanup {
            self.clean_up(&page).await?
        } else {
            page.main_content.clone()
        };

        let mut recipe = self.structure(&page.title, &content).await?;

        let report = post_process(&mut recipe);
        debug!(
            "Post-processed '{}': {} backfilled, {} unused, {} min",
            recipe.metadata.title,
            report.backfilled.len(),
            report.unused.len(),
            report.total_minutes
        );
        let violations = check_references(&recipe);
        if !violations.is_empty() {
            return Err(ImportError::SchemaValidationError(violations));
        }

        recipe.metadata.source_url = url.to_string();
        recipe.metadata.image_url = page.image_urls.first().cloned().unwrap_or_default();
        recipe.metadata.image = String::new();

        let slug = recipe.slug();
        if slug.is_empty() {
            return Err(ImportError::ExtractionError(format!(
                "title '{}' yields an empty slug",
                recipe.metadata.title
            )));
        }
        if tokio::fs::try_exists(self.store.recipe_path(&slug)).await.unwrap_or(false) {
            return Err(ImportError::Conflict(slug));
        }

        // Keeps the downloaded image alive until the store has copied it.
        let scratch = tempfile::tempdir().map_err(|e| ImportError::ImageDownloadError(e.to_string()))?;
        let image = if recipe.metadata.image_url.is_empty() {
            warn!("No image found on {}", url);
            None
        } else {
            let file_name = format!("{slug}.{}", image_extension(&recipe.metadata.image_url));
            let target = scratch.path().join(&file_name);
            self.image_fetcher
                .download(&recipe.metadata.image_url, &target)
                .await
                .map_err(ImportError::ImageDownloadError)?;
            recipe.metadata.image = file_name;
            Some(target)
        };

        let to_save = recipe.clone();
        let path = self
            .store
            .run_blocking(move |store| store.save(&to_save, image.as_deref()))
            .await?;
        info!("Imported '{}' as {}", recipe.metadata.title, slug);

        Ok(ImportSummary {
            slug,
            title: recipe.metadata.title.clone(),
            recipe: recipe.summary(),
            path,
        })
    }

    async fn clean_up(&self, page: &WebContent) -> Result<String, ImportError> {
        let cleaned = self
            .provider
            .complete(&cleanup_prompt(), &page_message(&page.title, &page.main_content), false)
            .await
            .map_err(|e| ImportError::ExtractionError(format!("cleanup pass failed: {e}")))?;

        if cleaned.trim().is_empty() {
            warn!("Cleanup pass returned nothing, keeping the raw page text");
            return Ok(page.main_content.clone());
        }
        Ok(cleaned)
    }

    async fn structure(&self, title: &str, content: &str) -> Result<Recipe, ImportError> {
        let answer = self
            .provider
            .complete(&structure_prompt(), &page_message(title, content), true)
            .await
            .map_err(|e| ImportError::ExtractionError(format!("extraction pass failed: {e}")))?;

        let value: Value = serde_json::from_str(json_payload(&answer))
            .map_err(|e| ImportError::ExtractionError(format!("model did not return JSON: {e}")))?;

        validate_schema(&value).map_err(ImportError::SchemaValidationError)
    }
}

fn parse_source_url(raw: &str) -> Result<Url, ImportError> {
    let url = Url::parse(raw.trim()).map_err(|e| ImportError::FetchError(format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ImportError::FetchError(format!("unsupported URL scheme '{other}'"))),
    }
}

/// Strips a Markdown code fence some models wrap around JSON answers.
fn json_payload(answer: &str) -> &str {
    let trimmed = answer.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Extension of the image URL's path when it is an accepted raster format,
/// `jpg` otherwise.
fn image_extension(image_url: &str) -> String {
    Url::parse(image_url)
        .ok()
        .and_then(|url| {
            let path = url.path().to_string();
            let (_, ext) = path.rsplit_once('.')?;
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
        })
        .unwrap_or_else(|| "jpg".to_string())
}
