//! Line-scan parser for generated recipe text.
//!
//! The generation prompt asks the model for four sections, in order:
//! `Ingredients`, `Instructions`, `Serving/Presentation Suggestions`,
//! `Modifications`. The parser scans line by line; a line containing a known
//! header switches the active section and is itself discarded. Everything
//! else is appended to the active section after stripping a `- ` bullet or
//! (for instructions) a `1. ` style step prefix.
//!
//! This is deliberately a one-off classifier tied to the prompt format, not
//! a general parsing engine. The only tolerated malformation is an
//! ingredient line without its `amount unit : name` delimiter, which is
//! recorded under the raw line text with no amount.

use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use crate::models::{IngredientAmount, RecipeContent};

/// Section headers, matched by substring anywhere in a line.
const HEADER_INGREDIENTS: &str = "Ingredients";
const HEADER_INSTRUCTIONS: &str = "Instructions";
const HEADER_SUGGESTIONS: &str = "Serving/Presentation Suggestions";
const HEADER_MODIFICATIONS: &str = "Modifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Ingredients,
    Instructions,
    Suggestions,
    Modifications,
}

/// Parse raw generated recipe text into a fully populated [`RecipeContent`].
///
/// `servings` is carried through from the request rather than re-parsed out
/// of the text. Lines before the first section header are discarded.
pub fn parse_recipe_text(text: &str, servings: i64) -> RecipeContent {
    let step_prefix = Regex::new(r"^\d+\. ").expect("step prefix regex is valid");

    let mut content = RecipeContent {
        servings,
        ingredients: HashMap::new(),
        method_lines: Vec::new(),
        suggestions: Vec::new(),
        modifications: Vec::new(),
    };

    let mut section = Section::None;
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        // Header checks mirror the prompt's section order.
        if line.contains(HEADER_INGREDIENTS) {
            section = Section::Ingredients;
            continue;
        }
        if line.contains(HEADER_INSTRUCTIONS) {
            section = Section::Instructions;
            continue;
        }
        if line.contains(HEADER_SUGGESTIONS) {
            section = Section::Suggestions;
            continue;
        }
        if line.contains(HEADER_MODIFICATIONS) {
            section = Section::Modifications;
            continue;
        }

        match section {
            Section::None => {}
            Section::Ingredients => {
                let line = line.strip_prefix("- ").unwrap_or(line);
                match parse_ingredient_line(line) {
                    Some((name, amount)) => {
                        content.ingredients.insert(name, Some(amount));
                    }
                    None => {
                        warn!(line, "ingredient line may be malformed");
                        content.ingredients.insert(line.to_string(), None);
                    }
                }
            }
            Section::Instructions => {
                content
                    .method_lines
                    .push(step_prefix.replace(line, "").into_owned());
            }
            Section::Suggestions => {
                content
                    .suggestions
                    .push(line.strip_prefix("- ").unwrap_or(line).to_string());
            }
            Section::Modifications => {
                content
                    .modifications
                    .push(line.strip_prefix("- ").unwrap_or(line).to_string());
            }
        }
    }

    content
}

/// Split an `amount unit : name` ingredient line.
///
/// Returns `(name, amount)` or `None` when the line lacks the `:` delimiter
/// or the amount token has no unit after its first space.
pub fn parse_ingredient_line(line: &str) -> Option<(String, IngredientAmount)> {
    let (amount_part, name_part) = line.split_once(':')?;
    let (amount, unit) = amount_part.trim().split_once(' ')?;
    Some((
        name_part.trim().to_string(),
        IngredientAmount {
            amount: amount.trim().to_string(),
            unit: unit.trim().to_string(),
        },
    ))
}
