//! A personal recipe catalog: a directory of JSON recipes served over HTTP,
//! WebP image derivatives generated on demand, and an importer that turns a
//! recipe page URL into a structured recipe with a language model.

pub mod config;
pub mod error;
pub mod images;
pub mod model;
pub mod pipelines;
pub mod providers;
pub mod server;
pub mod slug;
pub mod store;
pub mod url_to_text;
pub mod validation;

pub use config::CatalogConfig;
pub use error::{ImageError, ImportError, ProviderError, StoreError};
pub use images::{ImageCache, SizeClass};
pub use model::{Recipe, RecipeSummary, UiRecipe};
pub use pipelines::{ImportSummary, RecipeImporter};
pub use slug::slugify;
pub use store::RecipeStore;
