use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::slug::slugify;

/// A recipe in its canonical, on-disk shape.
///
/// Amounts and preparation states live in each sub-recipe's ingredient map, so
/// the same global ingredient can be used at different quantities in
/// different sub-recipes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub metadata: Metadata,
    pub ingredients_list: Vec<Ingredient>,
    pub sub_recipes: Vec<SubRecipe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub servings: u32,
    pub difficulty: Difficulty,
    #[serde(deserialize_with = "null_as_default")]
    pub total_time: String,
    /// File name of the original image under `images/original/`.
    #[serde(deserialize_with = "null_as_default")]
    pub image: String,
    /// Where the image was downloaded from.
    #[serde(deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source_url: String,
    pub diet: Diet,
    pub season: Season,
    pub recipe_type: RecipeType,
    #[serde(deserialize_with = "null_as_default")]
    pub quick: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            servings: 4,
            difficulty: Difficulty::default(),
            total_time: String::new(),
            image: String::new(),
            image_url: String::new(),
            source_url: String::new(),
            diet: Diet::default(),
            season: Season::default(),
            recipe_type: RecipeType::default(),
            quick: false,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ingredient {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub category: Category,
    /// Default preparation state, e.g. "finely chopped".
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubRecipe {
    pub id: String,
    pub title: String,
    pub ingredients: BTreeMap<String, IngredientUse>,
    pub steps: Vec<Step>,
}

/// Quantity and preparation of one ingredient inside one sub-recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IngredientUse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Step {
    pub id: String,
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<StepInput>,
    #[serde(default)]
    pub output: StepOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ref", rename_all = "lowercase")]
pub enum StepInput {
    /// Consumes a global ingredient by id.
    Ingredient(String),
    /// Consumes the output of an earlier step of the same sub-recipe.
    State(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StepOutput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Reads a JSON `null` as the field's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Declares a closed string enum together with its wire names, so the same
/// list feeds serde, validation messages and the extraction prompt.
///
/// Decoding is lenient: names match case-insensitively, and `null` or an
/// unknown name reads as the type's default. Imports are held to the exact
/// names by `validation::validate_schema`.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $wire:tt $(| $alias:tt)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Matches a wire name or legacy alias, ignoring case and
            /// surrounding whitespace.
            pub fn from_wire(name: &str) -> Option<$name> {
                let name = name.trim();
                $(
                    if name.eq_ignore_ascii_case($wire) $(|| name.eq_ignore_ascii_case($alias))* {
                        return Some($name::$variant);
                    }
                )+
                None
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Wire names joined with `|`, as used in the prompts.
            pub fn choices() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("|")
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Option::<String>::deserialize(deserializer)?;
                Ok(match raw.as_deref() {
                    None => $name::default(),
                    Some(name) => $name::from_wire(name).unwrap_or_else(|| {
                        warn!("Unknown {} '{}', reading it as '{}'", stringify!($name), name, $name::default());
                        $name::default()
                    }),
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum! {
    pub enum Difficulty {
        Easy = "easy",
        Medium = "medium",
        Hard = "hard",
    }
}

closed_enum! {
    pub enum Unit {
        Gram = "g",
        Millilitre = "ml",
        Unit = "unit",
        Tablespoon = "tbsp",
        Teaspoon = "tsp",
        Pinch = "pinch",
    }
}

closed_enum! {
    /// Shopping-list aisle. Older files used French aisle names.
    pub enum Category {
        Meat = "meat" | "viande" | "poisson",
        Produce = "produce" | "fruits-legumes",
        Dairy = "dairy" | "cremerie",
        PantrySavory = "pantry-savory" | "epicerie-salee",
        PantrySweet = "pantry-sweet" | "epicerie-sucree",
        Spice = "spice",
        Condiments = "condiments",
        Beverages = "beverages" | "boissons",
        Other = "autres" | "surgele",
    }
}

closed_enum! {
    pub enum Diet {
        Normal = "normal" | "omnivorous",
        Vegetarian = "vegetarian",
        Vegan = "vegan",
    }
}

closed_enum! {
    pub enum Season {
        Spring = "spring",
        Summer = "summer",
        Autumn = "autumn",
        Winter = "winter",
        All = "all",
    }
}

closed_enum! {
    pub enum RecipeType {
        Appetizer = "appetizer",
        Starter = "starter",
        Main = "main" | "main_course",
        Dessert = "dessert",
        Drink = "drink",
        Base = "base",
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Unit
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl Default for Diet {
    fn default() -> Self {
        Diet::Normal
    }
}

impl Default for Season {
    fn default() -> Self {
        Season::All
    }
}

impl Default for RecipeType {
    fn default() -> Self {
        RecipeType::Main
    }
}

/// The listing entry served by `GET /api/recipes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub total_time: String,
    pub image: String,
    pub diet: Diet,
    pub season: Season,
    pub recipe_type: RecipeType,
    pub quick: bool,
    pub ingredients: Vec<String>,
}

/// The front-end shape: flat metadata and id-keyed maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiRecipe {
    pub title: String,
    pub description: String,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub total_time: String,
    pub image: String,
    pub image_url: String,
    pub source_url: String,
    pub diet: Diet,
    pub season: Season,
    pub recipe_type: RecipeType,
    pub quick: bool,
    pub notes: String,
    pub slug: String,
    pub ingredients: IndexMap<String, UiIngredient>,
    pub sub_recipes: IndexMap<String, UiSubRecipe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiIngredient {
    pub name: String,
    pub unit: Unit,
    pub category: Category,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSubRecipe {
    pub title: String,
    pub ingredients: BTreeMap<String, IngredientUse>,
    pub steps: Vec<Step>,
}

impl Recipe {
    pub fn slug(&self) -> String {
        slugify(&self.metadata.title)
    }

    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients_list.iter().find(|i| i.id == id)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.sub_recipes.iter().flat_map(|s| s.steps.iter())
    }

    pub fn summary(&self) -> RecipeSummary {
        let m = &self.metadata;
        RecipeSummary {
            title: m.title.clone(),
            slug: self.slug(),
            description: m.description.clone(),
            servings: m.servings,
            difficulty: m.difficulty,
            total_time: m.total_time.clone(),
            image: m.image.clone(),
            diet: m.diet,
            season: m.season,
            recipe_type: m.recipe_type,
            quick: m.quick,
            ingredients: self.ingredients_list.iter().map(|i| i.name.clone()).collect(),
        }
    }

    pub fn to_ui(&self) -> UiRecipe {
        let m = &self.metadata;
        let ingredients = self
            .ingredients_list
            .iter()
            .map(|i| {
                (
                    i.id.clone(),
                    UiIngredient {
                        name: i.name.clone(),
                        unit: i.unit,
                        category: i.category,
                        state: i.state.clone(),
                    },
                )
            })
            .collect();
        let sub_recipes = self
            .sub_recipes
            .iter()
            .map(|s| {
                (
                    s.id.clone(),
                    UiSubRecipe {
                        title: s.title.clone(),
                        ingredients: s.ingredients.clone(),
                        steps: s.steps.clone(),
                    },
                )
            })
            .collect();

        UiRecipe {
            title: m.title.clone(),
            description: m.description.clone(),
            servings: m.servings,
            difficulty: m.difficulty,
            total_time: m.total_time.clone(),
            image: m.image.clone(),
            image_url: m.image_url.clone(),
            source_url: m.source_url.clone(),
            diet: m.diet,
            season: m.season,
            recipe_type: m.recipe_type,
            quick: m.quick,
            notes: m.notes.clone(),
            slug: self.slug(),
            ingredients,
            sub_recipes,
        }
    }
}
