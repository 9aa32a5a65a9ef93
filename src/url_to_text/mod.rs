//! Turning a recipe page URL into text the language model can work with.

pub mod fetchers;
pub mod html;

pub use fetchers::RequestFetcher;
pub use html::WebContent;
