//! Server-rendered HTML pages.
//!
//! Pages are small enough that they are built with plain string formatting
//! and an escaping helper rather than a template engine. Every interpolated
//! value goes through [`escape_html`].

use crate::models::Recipe;

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
table{border-collapse:collapse;width:100%}td,th{border-bottom:1px solid #ddd;\
padding:0.4rem;text-align:left}label{display:block;margin-top:0.8rem}\
input,textarea{width:100%}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
         <title>{} — larder</title><style>{}</style></head>\n\
         <body>\n{}\n</body></html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

/// Escape `&`, `<`, `>`, `"` and `'` for safe HTML interpolation.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The `/list` page: one row per current recipe.
pub fn list_page(recipes: &[Recipe]) -> String {
    let mut rows = String::new();
    for r in recipes {
        let reference = if r.reference.is_empty() {
            String::new()
        } else {
            format!(
                "<a href=\"{}\">source</a>",
                escape_html(&r.reference)
            )
        };
        rows.push_str(&format!(
            "<tr><td><a href=\"/recipe?id={}&amp;serving_size=2\">{}</a></td>\
             <td>v{}</td><td>{}</td><td>{}</td></tr>\n",
            r.id,
            escape_html(&r.name),
            r.version,
            escape_html(&r.tags.join(", ")),
            reference,
        ));
    }

    let body = format!(
        "<h1>Recipes</h1>\n<p><a href=\"/edit\">Add a recipe</a></p>\n\
         <table><tr><th>Name</th><th>Version</th><th>Tags</th><th>Reference</th></tr>\n{rows}</table>"
    );
    page("Recipes", &body)
}

/// The `/recipe` detail page.
pub fn recipe_page(recipe: &Recipe, serving_size: i64) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n<p>version {}{}</p>\n",
        escape_html(&recipe.name),
        recipe.version,
        if recipe.tags.is_empty() {
            String::new()
        } else {
            format!(" · {}", escape_html(&recipe.tags.join(", ")))
        }
    );

    if !recipe.reference.is_empty() {
        body.push_str(&format!(
            "<p><a href=\"{}\">original source</a></p>\n",
            escape_html(&recipe.reference)
        ));
    }

    match &recipe.content {
        Some(content) => {
            body.push_str(&format!("<p>Serves {}</p>\n", content.servings));

            body.push_str("<h2>Ingredients</h2>\n<ul>\n");
            let mut ingredients: Vec<_> = content.ingredients.iter().collect();
            ingredients.sort_by(|a, b| a.0.cmp(b.0));
            for (name, amount) in ingredients {
                match amount {
                    Some(a) => body.push_str(&format!(
                        "<li>{} {} — {}</li>\n",
                        escape_html(&a.amount),
                        escape_html(&a.unit),
                        escape_html(name)
                    )),
                    None => body.push_str(&format!("<li>{}</li>\n", escape_html(name))),
                }
            }
            body.push_str("</ul>\n");

            body.push_str("<h2>Method</h2>\n<ol>\n");
            for line in &content.method_lines {
                body.push_str(&format!("<li>{}</li>\n", escape_html(line)));
            }
            body.push_str("</ol>\n");

            if !content.suggestions.is_empty() {
                body.push_str("<h2>Serving suggestions</h2>\n<ul>\n");
                for line in &content.suggestions {
                    body.push_str(&format!("<li>{}</li>\n", escape_html(line)));
                }
                body.push_str("</ul>\n");
            }

            if !content.modifications.is_empty() {
                body.push_str("<h2>Modifications</h2>\n<ul>\n");
                for line in &content.modifications {
                    body.push_str(&format!("<li>{}</li>\n", escape_html(line)));
                }
                body.push_str("</ul>\n");
            }
        }
        None => {
            body.push_str("<p>No text has been generated for this recipe yet.</p>\n");
        }
    }

    body.push_str(&format!(
        "<p><a href=\"/recipe?id={}&amp;serving_size={}&amp;regenerate=true\">Regenerate</a> · \
         <a href=\"/list\">Back to list</a></p>\n",
        recipe.id, serving_size
    ));

    page(&recipe.name, &body)
}

/// The `/edit` form page.
pub fn edit_page() -> String {
    let body = "<h1>Add a recipe</h1>\n\
<form method=\"post\" action=\"/edit\">\n\
<label>Name <input name=\"name\" required></label>\n\
<label>Source URL <input name=\"url\"></label>\n\
<label>Serving size <input name=\"serving_size\" value=\"2\"></label>\n\
<label>Tags (comma separated) <input name=\"tags\"></label>\n\
<label>Ingredients (one per line, \"amount unit : name\") <textarea name=\"ingredients\" rows=\"8\"></textarea></label>\n\
<label>Method (one step per line) <textarea name=\"method\" rows=\"8\"></textarea></label>\n\
<label>Suggestions (one per line) <textarea name=\"suggestions\" rows=\"3\"></textarea></label>\n\
<label>Modifications (one per line) <textarea name=\"modifications\" rows=\"3\"></textarea></label>\n\
<p><button type=\"submit\">Save</button></p>\n\
</form>";
    page("Add a recipe", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeContent;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"fish & chips"</b>"#),
            "&lt;b&gt;&quot;fish &amp; chips&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_list_page_escapes_names() {
        let recipes = vec![Recipe {
            id: 1,
            version: 1,
            name: "<script>alert(1)</script>".to_string(),
            ..Recipe::default()
        }];
        let html = list_page(&recipes);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_recipe_page_without_content() {
        let recipe = Recipe {
            id: 4,
            version: 1,
            name: "Pho".to_string(),
            ..Recipe::default()
        };
        let html = recipe_page(&recipe, 2);
        assert!(html.contains("No text has been generated"));
        assert!(html.contains("regenerate=true"));
    }

    #[test]
    fn test_recipe_page_with_content() {
        let mut content = RecipeContent {
            servings: 2,
            ..RecipeContent::default()
        };
        content.method_lines.push("Chop everything.".to_string());
        content.ingredients.insert("flour".to_string(), None);
        let recipe = Recipe {
            id: 4,
            version: 2,
            name: "Bread".to_string(),
            content: Some(content),
            ..Recipe::default()
        };
        let html = recipe_page(&recipe, 2);
        assert!(html.contains("Serves 2"));
        assert!(html.contains("Chop everything."));
        assert!(html.contains("flour"));
    }

    #[test]
    fn test_edit_page_has_all_fields() {
        let html = edit_page();
        for field in [
            "name",
            "url",
            "serving_size",
            "tags",
            "ingredients",
            "method",
            "suggestions",
            "modifications",
        ] {
            assert!(
                html.contains(&format!("name=\"{field}\"")),
                "missing field {field}"
            );
        }
    }
}
