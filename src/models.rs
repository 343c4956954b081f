//! Core data models for the recipe store.
//!
//! A [`Recipe`] row is append-only: regenerating a recipe inserts a new row
//! whose `parent_id` points at the prior version. The structured
//! [`RecipeContent`] is derived from `recipe_text` and embedded in the same
//! JSON blob — it is either absent (text not generated yet) or fully
//! populated, never partial.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named dish with optional generated text and structured content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub name: String,
    /// Source URL the recipe was collected from.
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Raw text returned by the generation model, verbatim.
    #[serde(default)]
    pub recipe_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<RecipeContent>,
}

/// Structured breakdown derived from a recipe's raw generated text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeContent {
    #[serde(default)]
    pub servings: i64,
    /// Ingredient name → amount. A malformed source line is kept under the
    /// raw line text with a `None` amount.
    #[serde(default)]
    pub ingredients: HashMap<String, Option<IngredientAmount>>,
    #[serde(default)]
    pub method_lines: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub modifications: Vec<String>,
}

/// Quantity of a single ingredient, as written by the model ("250" + "g").
/// No unit normalization or numeric parsing is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub amount: String,
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_json_roundtrip() {
        let mut ingredients = HashMap::new();
        ingredients.insert(
            "flour".to_string(),
            Some(IngredientAmount {
                amount: "250".to_string(),
                unit: "g".to_string(),
            }),
        );
        ingredients.insert("a pinch of mystery".to_string(), None);

        let recipe = Recipe {
            id: 7,
            parent_id: Some(3),
            version: 2,
            name: "Shakshuka".to_string(),
            reference: "https://example.com/shakshuka".to_string(),
            tags: vec!["Middle Eastern".to_string(), "Eggs".to_string()],
            recipe_text: "Ingredients:\n- 250 g : flour\n".to_string(),
            content: Some(RecipeContent {
                servings: 2,
                ingredients,
                method_lines: vec!["Mix.".to_string(), "Bake.".to_string()],
                suggestions: vec!["Serve warm.".to_string()],
                modifications: vec!["Add chilli.".to_string()],
            }),
        };

        let json = serde_json::to_string(&recipe).unwrap();
        let restored: Recipe = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, recipe.id);
        assert_eq!(restored.parent_id, recipe.parent_id);
        assert_eq!(restored.version, recipe.version);
        assert_eq!(restored.name, recipe.name);
        assert_eq!(restored.reference, recipe.reference);
        assert_eq!(restored.tags, recipe.tags);
        assert_eq!(restored.recipe_text, recipe.recipe_text);
        assert_eq!(restored.content, recipe.content);
    }

    #[test]
    fn test_seed_fixture_shape_deserializes() {
        // Seed fixtures carry only name/reference/tags; everything else
        // must default.
        let json = r#"{"name": "Chicken Tikka Masala",
                       "reference": "https://example.com/ctm",
                       "tags": ["Indian", "Chicken", "Curry"]}"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.id, 0);
        assert_eq!(recipe.version, 0);
        assert!(recipe.parent_id.is_none());
        assert!(recipe.recipe_text.is_empty());
        assert!(recipe.content.is_none());
        assert_eq!(recipe.tags.len(), 3);
    }
}
