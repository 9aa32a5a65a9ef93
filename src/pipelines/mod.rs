pub mod import;
pub mod post_process;

pub use import::{ImportSummary, RecipeImporter};
pub use post_process::{parse_duration_minutes, post_process, PostProcessReport};
