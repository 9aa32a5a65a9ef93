use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the file-backed recipe store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No recipe file produces the requested slug
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// A recipe with the same slug or source URL already exists
    #[error("Recipe already exists: {0}")]
    Conflict(String),

    /// The data directory could not be read
    #[error("Failed to read data directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A recipe file or its image could not be written
    #[error("Failed to persist recipe: {0}")]
    Persist(String),

    /// A recipe could not be serialized
    #[error("Failed to serialize recipe: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The blocking task running a store operation panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(String),
}

/// Errors raised while resolving an image derivative
#[derive(Error, Debug)]
pub enum ImageError {
    /// The size class is not one of the fixed classes
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// The original file is not an accepted raster format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// No original exists under any accepted extension
    #[error("Image not found: {0}")]
    NotFound(String),

    /// Decoding, resizing, encoding or writing failed
    #[error("Failed to process image {path}: {message}")]
    Processing { path: PathBuf, message: String },
}

/// Errors raised by a language model provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No API key in the configuration or the environment
    #[error("API key not configured for provider {0}")]
    MissingApiKey(String),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned status {status}")]
    Api { status: u16, body: String },

    /// The response did not carry any completion text
    #[error("Response has no completion content")]
    MissingContent,
}

/// Errors that can occur while importing a recipe from a URL
#[derive(Error, Debug)]
pub enum ImportError {
    /// A recipe from this source URL (or with this slug) already exists
    #[error("Recipe already exists: {0}")]
    Conflict(String),

    /// Failed to fetch the source page
    #[error("Failed to fetch URL: {0}")]
    FetchError(String),

    /// The page or the language model did not yield a usable recipe
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    /// The structured recipe does not match the recipe schema
    #[error("Recipe does not match schema: {}", .0.join("; "))]
    SchemaValidationError(Vec<String>),

    /// Failed to download the recipe image
    #[error("Failed to download image: {0}")]
    ImageDownloadError(String),

    /// Failed to write the recipe or its image into the store
    #[error("Failed to persist recipe: {0}")]
    PersistError(String),
}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => ImportError::Conflict(what),
            other => ImportError::PersistError(other.to_string()),
        }
    }
}
