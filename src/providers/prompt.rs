//! Prompt templates for the two language model passes of an import.
//!
//! The templates are loaded from text files at compile time using
//! `include_str!`, making them easy to edit without dealing with Rust string
//! syntax.

use crate::model::{Category, Diet, Difficulty, RecipeType, Season, Unit};

/// System prompt of the optional cleanup pass.
pub const CLEANUP_PROMPT: &str = include_str!("cleanup_prompt.txt");

/// System prompt template of the structured extraction pass.
pub const STRUCTURE_PROMPT: &str = include_str!("structure_prompt.txt");

pub fn cleanup_prompt() -> String {
    CLEANUP_PROMPT.to_string()
}

/// The extraction prompt with every closed tag set spelled out.
pub fn structure_prompt() -> String {
    STRUCTURE_PROMPT
        .replace("{units}", &quoted(Unit::ALL.iter().map(|u| u.as_str())))
        .replace("{categories}", &quoted(Category::ALL.iter().map(|c| c.as_str())))
        .replace("{difficulties}", &quoted(Difficulty::ALL.iter().map(|d| d.as_str())))
        .replace("{diets}", &quoted(Diet::ALL.iter().map(|d| d.as_str())))
        .replace("{seasons}", &quoted(Season::ALL.iter().map(|s| s.as_str())))
        .replace("{recipe_types}", &quoted(RecipeType::ALL.iter().map(|r| r.as_str())))
}

/// User message carrying the page itself.
pub fn page_message(title: &str, content: &str) -> String {
    format!("WEBPAGE TITLE:\n{title}\n\nWEBPAGE CONTENT:\n{content}")
}

fn quoted<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.map(|v| format!("\"{v}\"")).collect::<Vec<_>>().join(", ")
}
