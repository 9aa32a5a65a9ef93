use log::{debug, warn};
use std::collections::BTreeSet;

use crate::model::{IngredientUse, Recipe, StepInput};

/// Recipes whose steps add up to at most this many minutes are quick.
pub const QUICK_THRESHOLD_MINUTES: f64 = 30.0;

/// What [`post_process`] changed or noticed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostProcessReport {
    /// `(sub-recipe id, ingredient id)` map entries added from the global list.
    pub backfilled: Vec<(String, String)>,
    /// `(sub-recipe id, ingredient id)` map entries no step consumes.
    pub unused: Vec<(String, String)>,
    pub total_minutes: f64,
}

/// Repairs what the language model usually gets slightly wrong and derives
/// the computed metadata.
///
/// Ingredient inputs missing from their sub-recipe map get an entry with
/// amount 0 and no state, provided the id exists in the global list. Unused
/// map entries are only reported. `quick` is recomputed from the summed step
/// times, and `totalTime` is filled in when empty.
pub fn post_process(recipe: &mut Recipe) -> PostProcessReport {
    let mut report = PostProcessReport::default();
    let known: BTreeSet<String> = recipe.ingredients_list.iter().map(|i| i.id.clone()).collect();

    for sub in &mut recipe.sub_recipes {
        let consumed: BTreeSet<String> = sub
            .steps
            .iter()
            .flat_map(|step| step.inputs.iter())
            .filter_map(|input| match input {
                StepInput::Ingredient(id) => Some(id.clone()),
                StepInput::State(_) => None,
            })
            .collect();

        for id in &consumed {
            if known.contains(id) && !sub.ingredients.contains_key(id) {
                debug!("Backfilling ingredient '{}' in sub-recipe '{}'", id, sub.id);
                sub.ingredients.insert(id.clone(), IngredientUse::default());
                report.backfilled.push((sub.id.clone(), id.clone()));
            }
        }

        for id in sub.ingredients.keys() {
            if !consumed.contains(id) {
                warn!("Ingredient '{}' of sub-recipe '{}' is not used by any step", id, sub.id);
                report.unused.push((sub.id.clone(), id.clone()));
            }
        }
    }

    report.total_minutes = recipe.steps().map(|step| parse_duration_minutes(&step.time)).sum();
    recipe.metadata.quick = report.total_minutes <= QUICK_THRESHOLD_MINUTES;
    if recipe.metadata.total_time.trim().is_empty() && report.total_minutes > 0.0 {
        recipe.metadata.total_time = format_minutes(report.total_minutes);
    }
    report
}

/// Minutes in a duration such as `45min`, `1h30min`, `1h30` or `2 hours`.
///
/// Ranges (`5-6min`, `10–15 min`) count as their lower bound. Anything
/// unparseable, including `N/A`, counts as zero.
pub fn parse_duration_minutes(raw: &str) -> f64 {
    let text = raw.trim().to_lowercase();
    if text.is_empty() || text == "n/a" {
        return 0.0;
    }

    let text = match text.split_once(['-', '–']) {
        Some((low, high)) => {
            let low = low.trim();
            if low.chars().any(|c| c.is_alphabetic()) {
                low.to_string()
            } else {
                // "5-6min": the lower bound borrows the upper bound's unit.
                let unit: String = high
                    .trim()
                    .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ',' || c == ' ')
                    .to_string();
                format!("{low}{unit}")
            }
        }
        None => text,
    };

    let mut total = 0.0;
    let mut chars = text.chars().peekable();
    let mut after_hours = false;
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut number = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() || c == '.' || c == ',' {
                number.push(if c == ',' { '.' } else { c });
                chars.next();
            } else {
                break;
            }
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut unit = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphabetic() {
                unit.push(c);
                chars.next();
            } else {
                break;
            }
        }

        if number.is_empty() {
            if unit.is_empty() {
                chars.next();
            }
            continue;
        }
        let Ok(value) = number.parse::<f64>() else {
            continue;
        };

        match unit.as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" | "heure" | "heures" => {
                total += value * 60.0;
                after_hours = true;
            }
            "s" | "sec" | "secs" | "second" | "seconds" => total += value / 60.0,
            "" if after_hours => total += value,
            "" | "m" | "mn" | "min" | "mins" | "minute" | "minutes" => total += value,
            _ => {}
        }
    }
    total
}

/// `90.0` becomes `1h30min`, `45.0` becomes `45min`.
pub fn format_minutes(minutes: f64) -> String {
    let minutes = minutes.round() as u64;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h{m}min"),
    }
}
