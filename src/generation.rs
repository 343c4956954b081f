//! Chat-completion client for tag and recipe-text generation.
//!
//! Talks to the OpenAI `POST /v1/chat/completions` endpoint with a
//! per-call timeout and exponential-backoff retry:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, ... (capped at 2^5)
//!
//! Requires the `OPENAI_API_KEY` environment variable. When
//! `generation.provider = "disabled"` every call fails with a descriptive
//! error; callers decide whether that is fatal.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::models::Recipe;
use crate::parser::parse_recipe_text;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// System prompt for tag generation. The response must be a bare JSON
/// string array.
const TAG_SYSTEM_PROMPT: &str = "You are a data tagger for a global food entertainment brand. \
Your role is to read recipe titles/links and, using your exhaustive knowledge of food, provide \
ten tags for the recipe as a json string array. It can include cuisine, ingredients, cooking \
method, etc. For example, given the recipe title \"Chicken Tikka Masala\" you would return \
[\"Indian\", \"Chicken\", \"Curry\"]. Bias towards ingredients making up the bulk of the tags; \
if the recipe is suitable for lunch then always include a lunch tag. Respond with the JSON \
array only.";

/// System prompt for full recipe generation. The section order and the
/// `amount unit : name` ingredient format are what the parser expects.
const RECIPE_SYSTEM_PROMPT: &str = "Think carefully about this. \
You are a personal chef with extensive experience in the home cooking space. \
You are tasked with creating a recipe for a new dish. You are given a title and a serving size, \
and must create a recipe suitable for that serving size. \
The output is comprised of the following sections, in order: Serving Size, Ingredients, \
Instructions, Serving/Presentation Suggestions, Modifications. Suggestions and Modifications \
contain at least three entry lines each. Include line breaks to separate sections and lines. \
All units are metric, but tsp/tbsp is okay. An ingredient line is always a number, a space, a \
singular lowercase unit, then ' : ' and the lowercase ingredient name; the number is a whole \
number or a decimal with at most 2 places. Examples: '250 g : flour', '1 tsp : salt', \
'125 g : sugar'. When cooking large pieces of meat include internal temperature targets, for \
example 'cook until the internal temperature reaches 70C'.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Issue one chat completion and return the assistant's message content.
async fn chat_completion(
    config: &GenerationConfig,
    system: &str,
    user: &str,
    timeout: Duration,
) -> Result<String> {
    if !config.is_enabled() {
        bail!("generation provider is disabled");
    }

    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let body = ChatRequest {
        model: &config.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
    };

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: ChatResponse = response.json().await?;
                    return extract_content(json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "chat completion error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("chat completion error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("chat completion failed after retries")))
}

fn extract_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("chat completion response contained no content"))
}

/// Generate tags for a recipe's name and merge them into `recipe.tags`.
///
/// On any failure — API error or a response that is not a JSON string
/// array — the error propagates and the existing tags are left untouched.
/// On success the new tags replace the old when `override_tags`, otherwise
/// they are appended.
pub async fn generate_tags(
    config: &GenerationConfig,
    recipe: &mut Recipe,
    override_tags: bool,
) -> Result<()> {
    let raw = chat_completion(
        config,
        TAG_SYSTEM_PROMPT,
        &recipe.name,
        Duration::from_secs(config.tag_timeout_secs),
    )
    .await
    .with_context(|| format!("tag generation failed for '{}'", recipe.name))?;

    apply_tag_response(recipe, &raw, override_tags)
}

/// Parse a tag response and merge it into the recipe. Split out so the
/// merge semantics are testable without a live API.
fn apply_tag_response(recipe: &mut Recipe, raw: &str, override_tags: bool) -> Result<()> {
    let tags: Vec<String> = serde_json::from_str(raw.trim())
        .with_context(|| format!("unable to parse tag response as a string array: {raw}"))?;

    debug!(recipe = %recipe.name, count = tags.len(), "generated tags");

    if override_tags {
        recipe.tags = tags;
    } else {
        recipe.tags.extend(tags);
    }
    Ok(())
}

/// Generate recipe text for the given serving size and return the next
/// version: `parent_id` set to the prior row, `version` incremented, raw
/// text stored verbatim, and content parsed from it.
pub async fn generate_recipe(
    config: &GenerationConfig,
    recipe: &Recipe,
    serving_size: i64,
) -> Result<Recipe> {
    let user = format!("{} {}", recipe.name, serving_size);
    let raw = chat_completion(
        config,
        RECIPE_SYSTEM_PROMPT,
        &user,
        Duration::from_secs(config.timeout_secs),
    )
    .await
    .with_context(|| format!("recipe generation failed for '{}'", recipe.name))?;

    let content = parse_recipe_text(&raw, serving_size);
    if content.ingredients.is_empty() && content.method_lines.is_empty() {
        warn!(recipe = %recipe.name, "generated text contained no recognizable sections");
    }

    Ok(Recipe {
        id: 0,
        parent_id: Some(recipe.id),
        version: recipe.version + 1,
        name: recipe.name.clone(),
        reference: recipe.reference.clone(),
        tags: recipe.tags.clone(),
        recipe_text: raw,
        content: Some(content),
    })
}
