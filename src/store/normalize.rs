//! Decoding of the two on-disk recipe generations.
//!
//! Older files keep one `amount` per global ingredient and have no
//! sub-recipe ingredient map; some do not even have a `metadata` block and
//! carry their metadata fields at the top level. Newer files scope
//! `{amount, state}` to each sub-recipe. Both decode into [`Recipe`].

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{
    null_as_default, Category, Ingredient, IngredientUse, Metadata, Recipe, Step, StepInput, SubRecipe, Unit,
};

/// Which on-disk generation a recipe file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Per-ingredient `amount` on the global list.
    Legacy,
    /// Sub-recipe-scoped ingredient map.
    Current,
}

impl SchemaVersion {
    /// Detects the generation from the presence of a sub-recipe ingredient
    /// map. A recipe without sub-recipes has nothing to migrate and is read
    /// as current unless it lacks a `metadata` block.
    pub fn detect(raw: &Value) -> SchemaVersion {
        if raw.get("metadata").is_none() {
            return SchemaVersion::Legacy;
        }
        let sub_recipes = raw.get("subRecipes").and_then(Value::as_array);
        match sub_recipes {
            Some(subs) if subs.iter().any(|s| s.get("ingredients").is_none()) => {
                SchemaVersion::Legacy
            }
            Some(_) => SchemaVersion::Current,
            None => SchemaVersion::Legacy,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecipe {
    metadata: Option<Metadata>,
    /// Metadata fields stored at the top level by the oldest files.
    #[serde(flatten)]
    top_level: Metadata,
    #[serde(default)]
    ingredients_list: Vec<LegacyIngredient>,
    #[serde(default)]
    sub_recipes: Vec<LegacySubRecipe>,
}

#[derive(Debug, Deserialize)]
struct LegacyIngredient {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default)]
    unit: Unit,
    #[serde(default)]
    category: Category,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct LegacySubRecipe {
    id: String,
    title: String,
    #[serde(default)]
    ingredients: Option<BTreeMap<String, IngredientUse>>,
    #[serde(default)]
    steps: Vec<Step>,
}

/// Parses a recipe file of either generation into the canonical shape.
///
/// Never writes anything back. A file without metadata yields an empty
/// title, which the store replaces with one derived from the file name.
pub fn normalize(raw: &[u8]) -> Result<Recipe, serde_json::Error> {
    let value: Value = serde_json::from_slice(raw)?;
    normalize_value(value)
}

pub fn normalize_value(value: Value) -> Result<Recipe, serde_json::Error> {
    match SchemaVersion::detect(&value) {
        SchemaVersion::Current => serde_json::from_value(value),
        SchemaVersion::Legacy => {
            let legacy: LegacyRecipe = serde_json::from_value(value)?;
            Ok(migrate(legacy))
        }
    }
}

fn migrate(legacy: LegacyRecipe) -> Recipe {
    let metadata = legacy.metadata.unwrap_or(legacy.top_level);

    let amounts: BTreeMap<&str, IngredientUse> = legacy
        .ingredients_list
        .iter()
        .map(|i| {
            (
                i.id.as_str(),
                IngredientUse {
                    amount: i.amount.as_ref().map(parse_amount).unwrap_or(0.0),
                    state: i.state.clone(),
                },
            )
        })
        .collect();

    let sub_recipes = legacy
        .sub_recipes
        .into_iter()
        .map(|sub| {
            let ingredients = match sub.ingredients {
                Some(map) => map,
                None => sub
                    .steps
                    .iter()
                    .flat_map(|step| step.inputs.iter())
                    .filter_map(|input| match input {
                        StepInput::Ingredient(id) => Some(id.as_str()),
                        StepInput::State(_) => None,
                    })
                    .filter_map(|id| amounts.get(id).map(|u| (id.to_string(), u.clone())))
                    .collect(),
            };
            SubRecipe {
                id: sub.id,
                title: sub.title,
                ingredients,
                steps: sub.steps,
            }
        })
        .collect();

    let ingredients_list = legacy
        .ingredients_list
        .into_iter()
        .map(|i| Ingredient {
            id: i.id,
            name: i.name,
            unit: i.unit,
            category: i.category,
            state: i.state,
        })
        .collect();

    Recipe {
        metadata,
        ingredients_list,
        sub_recipes,
    }
}

/// Older generators wrote amounts as numbers or as strings; anything
/// unreadable counts as zero.
fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
