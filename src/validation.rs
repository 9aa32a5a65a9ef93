//! Checks for recipes produced by the language model.
//!
//! [`validate_schema`] walks the raw JSON and reports every structural or
//! enum violation with its path, so one failed import lists everything that
//! was wrong. [`check_references`] then checks the cross-references between
//! steps and ingredients on the typed recipe.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{Category, Diet, Difficulty, Recipe, RecipeType, Season, StepInput, SubRecipe, Unit};

/// Validates `value` against the recipe schema and decodes it.
pub fn validate_schema(value: &Value) -> Result<Recipe, Vec<String>> {
    let mut v = Violations::default();

    match value.as_object() {
        Some(root) => {
            v.metadata(root.get("metadata"));
            v.ingredients_list(root.get("ingredientsList"));
            v.sub_recipes(root.get("subRecipes"));
        }
        None => v.push("$", "expected a JSON object"),
    }

    if !v.0.is_empty() {
        return Err(v.0);
    }
    serde_json::from_value(value.clone()).map_err(|e| vec![format!("$: {e}")])
}

/// Cross-reference checks on a decoded recipe: unique ids, every ingredient
/// input present in the global list and in its sub-recipe map, every state
/// input pointing at an earlier step of the same sub-recipe.
pub fn check_references(recipe: &Recipe) -> Vec<String> {
    let mut violations = Vec::new();

    let mut ingredient_ids = HashSet::new();
    for (i, ingredient) in recipe.ingredients_list.iter().enumerate() {
        if !ingredient_ids.insert(ingredient.id.as_str()) {
            violations.push(format!(
                "ingredientsList[{i}].id: duplicate ingredient id '{}'",
                ingredient.id
            ));
        }
    }

    let mut sub_ids = HashSet::new();
    for sub in &recipe.sub_recipes {
        if !sub_ids.insert(sub.id.as_str()) {
            violations.push(format!("subRecipes.{}: duplicate sub-recipe id", sub.id));
        }
        for step in &sub.steps {
            for input in &step.inputs {
                if let StepInput::Ingredient(id) = input {
                    if !ingredient_ids.contains(id.as_str()) {
                        violations.push(format!(
                            "subRecipes.{}.steps.{}: unknown ingredient '{id}'",
                            sub.id, step.id
                        ));
                    } else if !sub.ingredients.contains_key(id) {
                        violations.push(format!(
                            "subRecipes.{}.steps.{}: ingredient '{id}' missing from the sub-recipe ingredients",
                            sub.id, step.id
                        ));
                    }
                }
            }
        }
        violations.extend(StepGraph::new(sub).violations());
    }

    violations
}

/// The dependency graph of one sub-recipe: nodes are steps, edges run from a
/// step to every later step consuming its output.
#[derive(Debug)]
pub struct StepGraph<'a> {
    sub_recipe: &'a str,
    steps: Vec<&'a str>,
    /// (producer index, consumer index) for every resolvable state input.
    edges: Vec<(usize, usize)>,
    dangling: Vec<(usize, &'a str)>,
    duplicates: Vec<&'a str>,
}

impl<'a> StepGraph<'a> {
    pub fn new(sub: &'a SubRecipe) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        let steps: Vec<&str> = sub.steps.iter().map(|s| s.id.as_str()).collect();
        for (i, id) in steps.iter().enumerate() {
            if index.insert(*id, i).is_some() {
                duplicates.push(*id);
            }
        }

        let mut edges = Vec::new();
        let mut dangling = Vec::new();
        for (consumer, step) in sub.steps.iter().enumerate() {
            for input in &step.inputs {
                if let StepInput::State(reference) = input {
                    match index.get(reference.as_str()) {
                        Some(&producer) => edges.push((producer, consumer)),
                        None => dangling.push((consumer, reference.as_str())),
                    }
                }
            }
        }

        Self {
            sub_recipe: &sub.id,
            steps,
            edges,
            dangling,
            duplicates,
        }
    }

    /// Steps in an order where every producer precedes its consumers, or
    /// `None` when the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<&'a str>> {
        let mut indegree = vec![0usize; self.steps.len()];
        for &(_, consumer) in &self.edges {
            indegree[consumer] += 1;
        }
        let mut ready: VecDeque<usize> = (0..self.steps.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.steps.len());
        while let Some(node) = ready.pop_front() {
            order.push(self.steps[node]);
            for &(producer, consumer) in &self.edges {
                if producer == node {
                    indegree[consumer] -= 1;
                    if indegree[consumer] == 0 {
                        ready.push_back(consumer);
                    }
                }
            }
        }
        (order.len() == self.steps.len()).then_some(order)
    }

    pub fn violations(&self) -> Vec<String> {
        let sub = self.sub_recipe;
        let mut out = Vec::new();
        for id in &self.duplicates {
            out.push(format!("subRecipes.{sub}.steps: duplicate step id '{id}'"));
        }
        for &(consumer, reference) in &self.dangling {
            out.push(format!(
                "subRecipes.{sub}.steps.{}: state input '{reference}' does not name a step of this sub-recipe",
                self.steps[consumer]
            ));
        }
        for &(producer, consumer) in &self.edges {
            if producer >= consumer {
                out.push(format!(
                    "subRecipes.{sub}.steps.{}: state input '{}' is not an earlier step",
                    self.steps[consumer], self.steps[producer]
                ));
            }
        }
        if self.duplicates.is_empty() && self.topological_order().is_none() {
            out.push(format!("subRecipes.{sub}.steps: step dependencies form a cycle"));
        }
        out
    }
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, path: &str, message: impl AsRef<str>) {
        self.0.push(format!("{path}: {}", message.as_ref()));
    }

    fn object<'v>(&mut self, path: &str, value: Option<&'v Value>) -> Option<&'v Map<String, Value>> {
        match value {
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                self.push(path, "expected an object");
                None
            }
            None => {
                self.push(path, "is required");
                None
            }
        }
    }

    fn array<'v>(&mut self, path: &str, value: Option<&'v Value>, non_empty: bool) -> Option<&'v Vec<Value>> {
        match value {
            Some(Value::Array(items)) if non_empty && items.is_empty() => {
                self.push(path, "must not be empty");
                None
            }
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.push(path, "expected an array");
                None
            }
            None => {
                self.push(path, "is required");
                None
            }
        }
    }

    fn string(&mut self, path: &str, value: Option<&Value>, required: bool, non_empty: bool) {
        match value {
            Some(Value::String(s)) if non_empty && s.trim().is_empty() => self.push(path, "must not be empty"),
            Some(Value::String(_)) => {}
            Some(_) => self.push(path, "expected a string"),
            None if required => self.push(path, "is required"),
            None => {}
        }
    }

    fn choice(&mut self, path: &str, value: Option<&Value>, choices: &str) {
        match value {
            Some(Value::String(s)) if choices.split('|').any(|c| c == s) => {}
            Some(Value::String(s)) => self.push(path, format!("'{s}' is not one of {choices}")),
            Some(_) => self.push(path, "expected a string"),
            None => self.push(path, "is required"),
        }
    }

    fn metadata(&mut self, value: Option<&Value>) {
        let Some(m) = self.object("metadata", value) else {
            return;
        };
        self.string("metadata.title", m.get("title"), true, true);
        self.string("metadata.description", m.get("description"), true, false);
        self.string("metadata.totalTime", m.get("totalTime"), true, false);
        for key in ["image", "imageUrl", "sourceUrl", "notes"] {
            self.string(&format!("metadata.{key}"), m.get(key), false, false);
        }
        match m.get("servings") {
            Some(n) if n.as_u64().map(|n| n >= 1 && n <= u32::MAX as u64).unwrap_or(false) => {}
            Some(_) => self.push("metadata.servings", "expected a positive integer"),
            None => self.push("metadata.servings", "is required"),
        }
        if let Some(q) = m.get("quick") {
            if !q.is_boolean() {
                self.push("metadata.quick", "expected a boolean");
            }
        }
        self.choice("metadata.difficulty", m.get("difficulty"), &Difficulty::choices());
        self.choice("metadata.diet", m.get("diet"), &Diet::choices());
        self.choice("metadata.season", m.get("season"), &Season::choices());
        self.choice("metadata.recipeType", m.get("recipeType"), &RecipeType::choices());
    }

    fn ingredients_list(&mut self, value: Option<&Value>) {
        let Some(items) = self.array("ingredientsList", value, true) else {
            return;
        };
        for (i, item) in items.iter().enumerate() {
            let path = format!("ingredientsList[{i}]");
            let Some(ing) = self.object(&path, Some(item)) else {
                continue;
            };
            self.string(&format!("{path}.id"), ing.get("id"), true, true);
            self.string(&format!("{path}.name"), ing.get("name"), true, true);
            self.string(&format!("{path}.state"), ing.get("state"), false, false);
            self.choice(&format!("{path}.unit"), ing.get("unit"), &Unit::choices());
            self.choice(&format!("{path}.category"), ing.get("category"), &Category::choices());
        }
    }

    fn sub_recipes(&mut self, value: Option<&Value>) {
        let Some(items) = self.array("subRecipes", value, true) else {
            return;
        };
        for (i, item) in items.iter().enumerate() {
            let path = format!("subRecipes[{i}]");
            let Some(sub) = self.object(&path, Some(item)) else {
                continue;
            };
            self.string(&format!("{path}.id"), sub.get("id"), true, true);
            self.string(&format!("{path}.title"), sub.get("title"), true, false);

            let ingredients_path = format!("{path}.ingredients");
            if let Some(map) = self.object(&ingredients_path, sub.get("ingredients")) {
                for (id, entry) in map {
                    let entry_path = format!("{ingredients_path}.{id}");
                    let Some(entry) = self.object(&entry_path, Some(entry)) else {
                        continue;
                    };
                    match entry.get("amount") {
                        Some(n) if n.as_f64().map(|a| a >= 0.0).unwrap_or(false) => {}
                        Some(_) => self.push(&format!("{entry_path}.amount"), "expected a non-negative number"),
                        None => self.push(&format!("{entry_path}.amount"), "is required"),
                    }
                    self.string(&format!("{entry_path}.state"), entry.get("state"), false, false);
                }
            }

            if let Some(steps) = self.array(&format!("{path}.steps"), sub.get("steps"), true) {
                for (j, step) in steps.iter().enumerate() {
                    self.step(&format!("{path}.steps[{j}]"), step);
                }
            }
        }
    }

    fn step(&mut self, path: &str, value: &Value) {
        let Some(step) = self.object(path, Some(value)) else {
            return;
        };
        self.string(&format!("{path}.id"), step.get("id"), true, true);
        self.string(&format!("{path}.action"), step.get("action"), true, true);
        self.string(&format!("{path}.time"), step.get("time"), true, false);

        if let Some(tools) = self.array(&format!("{path}.tools"), step.get("tools"), false) {
            for (k, tool) in tools.iter().enumerate() {
                self.string(&format!("{path}.tools[{k}]"), Some(tool), true, true);
            }
        }

        if let Some(inputs) = self.array(&format!("{path}.inputs"), step.get("inputs"), false) {
            for (k, input) in inputs.iter().enumerate() {
                let input_path = format!("{path}.inputs[{k}]");
                let Some(input) = self.object(&input_path, Some(input)) else {
                    continue;
                };
                self.choice(&format!("{input_path}.type"), input.get("type"), "ingredient|state");
                self.string(&format!("{input_path}.ref"), input.get("ref"), true, true);
            }
        }

        let output_path = format!("{path}.output");
        if let Some(output) = self.object(&output_path, step.get("output")) {
            self.string(&format!("{output_path}.state"), output.get("state"), true, false);
            self.string(&format!("{output_path}.description"), output.get("description"), true, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_recipe_json() -> Value {
        json!({
            "metadata": {
                "title": "Persian Love Rice",
                "description": "Jewelled rice",
                "servings": 4,
                "difficulty": "medium",
                "totalTime": "1h",
                "diet": "vegetarian",
                "season": "all",
                "recipeType": "main",
                "quick": false,
                "notes": ""
            },
            "ingredientsList": [
                {"id": "ing1", "name": "basmati rice", "unit": "g", "category": "pantry-savory"},
                {"id": "ing2", "name": "saffron", "unit": "pinch", "category": "spice"}
            ],
            "subRecipes": [{
                "id": "sub1",
                "title": "Rice",
                "ingredients": {"ing1": {"amount": 300, "state": "rinsed"}, "ing2": {"amount": 1, "state": ""}},
                "steps": [
                    {"id": "step1", "action": "Boil rice", "time": "10min", "tools": [],
                     "inputs": [{"type": "ingredient", "ref": "ing1"}],
                     "output": {"state": "parboiled", "description": "Rice al dente"}},
                    {"id": "step2", "action": "Steam with saffron", "time": "30min", "tools": ["heavy pot"],
                     "inputs": [{"type": "state", "ref": "step1"}, {"type": "ingredient", "ref": "ing2"}],
                     "output": {"state": "steamed", "description": "Fluffy saffron rice"}}
                ]
            }]
        })
    }

    #[test]
    fn test_valid_recipe_passes() {
        let recipe = validate_schema(&valid_recipe_json()).unwrap();
        assert_eq!(recipe.metadata.title, "Persian Love Rice");
        assert!(check_references(&recipe).is_empty());
    }

    #[test]
    fn test_lists_every_violation() {
        let mut value = valid_recipe_json();
        value["metadata"]["difficulty"] = json!("extreme");
        value["metadata"].as_object_mut().unwrap().remove("servings");
        value["ingredientsList"][0]["unit"] = json!("cup");
        value["subRecipes"][0]["steps"][0]["inputs"][0]["type"] = json!("tool");

        let violations = validate_schema(&value).unwrap_err();
        assert_eq!(violations.len(), 4, "{violations:?}");
        assert!(violations.iter().any(|v| v.starts_with("metadata.difficulty")));
        assert!(violations.iter().any(|v| v.starts_with("metadata.servings")));
        assert!(violations.iter().any(|v| v.starts_with("ingredientsList[0].unit")));
        assert!(violations.iter().any(|v| v.contains("inputs[0].type")));
    }

    #[test]
    fn test_not_an_object() {
        let violations = validate_schema(&json!(["nope"])).unwrap_err();
        assert_eq!(violations, vec!["$: expected a JSON object".to_string()]);
    }

    #[test]
    fn test_ingredient_input_must_be_in_sub_recipe_map() {
        let mut value = valid_recipe_json();
        value["subRecipes"][0]["ingredients"].as_object_mut().unwrap().remove("ing2");
        let recipe = validate_schema(&value).unwrap();
        let violations = check_references(&recipe);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("'ing2' missing from the sub-recipe ingredients"));
    }

    #[test]
    fn test_unknown_ingredient() {
        let mut value = valid_recipe_json();
        value["subRecipes"][0]["steps"][0]["inputs"][0]["ref"] = json!("ing9");
        let recipe = validate_schema(&value).unwrap();
        let violations = check_references(&recipe);
        assert!(violations.iter().any(|v| v.contains("unknown ingredient 'ing9'")));
    }

    #[test]
    fn test_forward_state_reference_is_rejected() {
        let mut value = valid_recipe_json();
        value["subRecipes"][0]["steps"][0]["inputs"] = json!([
            {"type": "ingredient", "ref": "ing1"},
            {"type": "state", "ref": "step2"}
        ]);
        let recipe = validate_schema(&value).unwrap();
        let violations = check_references(&recipe);
        assert!(violations.iter().any(|v| v.contains("'step2' is not an earlier step")));
        assert!(violations.iter().any(|v| v.contains("cycle")));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut value = valid_recipe_json();
        value["subRecipes"][0]["steps"][0]["inputs"] = json!([{"type": "state", "ref": "step1"}]);
        let recipe = validate_schema(&value).unwrap();
        let violations = check_references(&recipe);
        assert!(violations.iter().any(|v| v.contains("'step1' is not an earlier step")));
    }

    #[test]
    fn test_state_reference_across_sub_recipes_is_dangling() {
        let mut value = valid_recipe_json();
        let mut second = value["subRecipes"][0].clone();
        second["id"] = json!("sub2");
        second["steps"] = json!([{
            "id": "assemble", "action": "Serve", "time": "1min", "tools": [],
            "inputs": [{"type": "state", "ref": "step2"}],
            "output": {"state": "served", "description": "On a plate"}
        }]);
        value["subRecipes"].as_array_mut().unwrap().push(second);
        let recipe = validate_schema(&value).unwrap();
        let violations = check_references(&recipe);
        assert!(violations
            .iter()
            .any(|v| v.contains("subRecipes.sub2.steps.assemble: state input 'step2' does not name a step")));
    }

    #[test]
    fn test_topological_order_follows_dependencies() {
        let recipe = validate_schema(&valid_recipe_json()).unwrap();
        let graph = StepGraph::new(&recipe.sub_recipes[0]);
        assert_eq!(graph.topological_order().unwrap(), vec!["step1", "step2"]);
    }
}
