//! HTTP server and route handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/list` | HTML table of current recipes |
//! | `GET`  | `/recipe` | Recipe detail page, generating text on demand |
//! | `GET`  | `/extract` | All current recipes as JSON |
//! | `GET`  | `/edit` | New-recipe form |
//! | `POST` | `/edit` | Create a recipe from the form |
//! | `GET`  | `/auth/github` | Start the GitHub OAuth flow |
//! | `GET`  | `/auth/github/callback` | Finish the OAuth flow |
//! | `GET`  | `/health` | Health check (unauthenticated) |
//!
//! Recipe routes sit behind the auth middleware configured by
//! `[auth].mode`. Errors are returned as a JSON body with a
//! machine-readable code:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "recipe not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `not_found`
//! (404), `generation_failed` (500), `internal` (500).

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{self, GithubApp, SessionSecret, SESSION_COOKIE, STATE_COOKIE};
use crate::config::Config;
use crate::generation;
use crate::models::{Recipe, RecipeContent};
use crate::parser::parse_ingredient_line;
use crate::snapshot;
use crate::store;
use crate::views;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    session: SessionSecret,
}

/// Start the HTTP server: migrate, seed an empty store from the configured
/// fixture, spawn the snapshot task, and serve until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    crate::db::run_migrations(&pool).await?;

    if !store::is_seeded(&pool).await? {
        if config.seed.path.exists() {
            let count = store::seed_from_file(&pool, &config.seed.path).await?;
            info!(count, "seeded empty store from fixture");
        } else {
            info!("store is empty and no seed fixture exists; starting bare");
        }
    }

    if config.snapshot.enabled {
        tokio::spawn(snapshot::run_snapshot_loop(
            config.snapshot.clone(),
            pool.clone(),
        ));
    }

    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        session: SessionSecret::from_env_or_random(),
    };

    let app = build_router(state);

    info!("listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/list", get(handle_list))
        .route("/recipe", get(handle_recipe))
        .route("/extract", get(handle_extract))
        .route("/edit", get(handle_edit_form).post(handle_edit_submit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(protected)
        .route("/auth/github", get(handle_oauth_start))
        .route("/auth/github/callback", get(handle_oauth_callback))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

fn generation_failed(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "generation_failed".to_string(),
        message: format!("{err:#}"),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{err:#}"),
    }
}

// ============ Auth middleware ============

/// Gate requests according to `[auth].mode`.
async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.config.auth.mode.as_str() {
        "disabled" => next.run(req).await,
        "basic" => {
            let header_value = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth::verify_basic(&state.config.auth, header_value) {
                next.run(req).await
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    AppendHeaders([(
                        header::WWW_AUTHENTICATE,
                        "Basic realm=\"larder\", charset=\"UTF-8\"",
                    )]),
                    "Unauthorized",
                )
                    .into_response()
            }
        }
        // github: a valid signed session cookie, or into the OAuth flow.
        _ => {
            let session = req
                .headers()
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|h| auth::cookie_value(h, SESSION_COOKIE))
                .and_then(|c| auth::verify_session(&state.config.auth, &state.session, c));
            match session {
                Some(_) => next.run(req).await,
                None => Redirect::to("/auth/github").into_response(),
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /list ============

async fn handle_list(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let recipes = store::all_meta(&state.pool).await.map_err(internal)?;
    Ok(Html(views::list_page(&recipes)))
}

// ============ GET /recipe ============

#[derive(Deserialize)]
struct RecipeQuery {
    id: Option<i64>,
    name: Option<String>,
    serving_size: Option<i64>,
    regenerate: Option<bool>,
}

/// Fetch one recipe; when it has no text yet (or `regenerate=true`),
/// generate a new version, store it, and render that instead.
async fn handle_recipe(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Html<String>, AppError> {
    let serving_size = query
        .serving_size
        .ok_or_else(|| bad_request("no serving size provided"))?;
    if serving_size <= 0 {
        return Err(bad_request("invalid serving size provided"));
    }

    let recipe = match (query.id, query.name.as_deref()) {
        (Some(id), _) => store::recipe_by_id(&state.pool, id).await,
        (None, Some(name)) => store::recipe_by_name(&state.pool, name).await,
        (None, None) => return Err(bad_request("no recipe id or name provided")),
    }
    .map_err(internal)?;

    let mut recipe = recipe.ok_or_else(|| not_found("recipe not found"))?;

    let regenerate = query.regenerate.unwrap_or(false);
    let wants_generation = recipe.recipe_text.is_empty() || regenerate;

    // An explicit regenerate with no provider is an error; a text-less
    // recipe just renders its placeholder.
    if wants_generation && !state.config.generation.is_enabled() && regenerate {
        return Err(generation_failed(anyhow::anyhow!(
            "generation provider is disabled"
        )));
    }

    if wants_generation && state.config.generation.is_enabled() {
        let next_version = generation::generate_recipe(&state.config.generation, &recipe, serving_size)
            .await
            .map_err(generation_failed)?;
        recipe = store::insert_version(&state.pool, &next_version)
            .await
            .map_err(internal)?;
        info!(
            name = %recipe.name,
            version = recipe.version,
            "stored regenerated recipe"
        );
    }

    Ok(Html(views::recipe_page(&recipe, serving_size)))
}

// ============ GET /extract ============

async fn handle_extract(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    let recipes = store::all_current(&state.pool).await.map_err(internal)?;
    Ok(Json(recipes))
}

// ============ GET/POST /edit ============

async fn handle_edit_form() -> Html<String> {
    Html(views::edit_page())
}

#[derive(Deserialize)]
struct EditForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    serving_size: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    ingredients: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    suggestions: String,
    #[serde(default)]
    modifications: String,
}

async fn handle_edit_submit(
    State(state): State<AppState>,
    Form(form): Form<EditForm>,
) -> Result<Redirect, AppError> {
    if form.name.trim().is_empty() {
        return Err(bad_request("no recipe name provided"));
    }

    let serving_size_value = if form.serving_size.trim().is_empty() {
        "2"
    } else {
        form.serving_size.trim()
    };
    let serving_size: i64 = serving_size_value
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| bad_request("invalid serving size provided"))?;

    let mut recipe = Recipe {
        version: 1,
        name: form.name.trim().to_string(),
        reference: form.url.trim().to_string(),
        tags: split_tags(&form.tags),
        content: Some(content_from_form(&form, serving_size)),
        ..Recipe::default()
    };

    // Tag generation is best effort; a failed call must not lose the form.
    if state.config.generation.is_enabled() {
        if let Err(e) = generation::generate_tags(&state.config.generation, &mut recipe, false).await
        {
            warn!(error = %format!("{e:#}"), "tag generation failed");
        }
    }

    let stored = store::insert_version(&state.pool, &recipe)
        .await
        .map_err(internal)?;

    Ok(Redirect::to(&format!(
        "/recipe?id={}&serving_size={}",
        stored.id, serving_size
    )))
}

fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn content_from_form(form: &EditForm, serving_size: i64) -> RecipeContent {
    let mut ingredients = HashMap::new();
    for line in non_empty_lines(&form.ingredients) {
        match parse_ingredient_line(&line) {
            Some((name, amount)) => {
                ingredients.insert(name, Some(amount));
            }
            None => {
                ingredients.insert(line, None);
            }
        }
    }

    RecipeContent {
        servings: serving_size,
        ingredients,
        method_lines: non_empty_lines(&form.method),
        suggestions: non_empty_lines(&form.suggestions),
        modifications: non_empty_lines(&form.modifications),
    }
}

// ============ OAuth flow ============

#[derive(Deserialize)]
struct OauthCallback {
    code: Option<String>,
    state: Option<String>,
}

async fn handle_oauth_start(State(state): State<AppState>) -> Result<Response, AppError> {
    let app = GithubApp::from_env().map_err(internal)?;
    let oauth_state = Uuid::new_v4().to_string();
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; Max-Age=300",
        STATE_COOKIE,
        state.session.sign(&oauth_state)
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(&app.authorize_url(&oauth_state)),
    )
        .into_response())
}

async fn handle_oauth_callback(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<OauthCallback>,
) -> Result<Response, AppError> {
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| bad_request("missing code parameter"))?;
    let returned_state = query
        .state
        .as_deref()
        .ok_or_else(|| bad_request("missing state parameter"))?;

    // The state must match the signed value we set when starting the flow.
    let expected_state = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| auth::cookie_value(h, STATE_COOKIE))
        .and_then(|c| state.session.verify(c));
    if expected_state.as_deref() != Some(returned_state) {
        return Err(unauthorized("oauth state mismatch"));
    }

    let app = GithubApp::from_env().map_err(internal)?;
    let token = app.exchange_code(code).await.map_err(internal)?;
    let login = app.fetch_login(&token).await.map_err(internal)?;

    if !state.config.auth.users.iter().any(|u| u == &login) {
        warn!(login = %login, "github login not in allowed set");
        return Err(unauthorized("login not permitted"));
    }

    let cookie = format!(
        "{}={}; Path=/; HttpOnly",
        SESSION_COOKIE,
        state.session.sign(&login)
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/list"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(ingredients: &str, method: &str) -> EditForm {
        EditForm {
            name: "Test".to_string(),
            url: String::new(),
            serving_size: "2".to_string(),
            tags: String::new(),
            ingredients: ingredients.to_string(),
            method: method.to_string(),
            suggestions: String::new(),
            modifications: String::new(),
        }
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(
            split_tags("Indian, Chicken , ,Curry"),
            vec!["Indian", "Chicken", "Curry"]
        );
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_content_from_form_parses_ingredients() {
        let content = content_from_form(
            &form("250 g : flour\nsalt to taste\n", "Mix.\n\nBake.\n"),
            4,
        );
        assert_eq!(content.servings, 4);
        assert_eq!(content.ingredients.len(), 2);
        let flour = content.ingredients["flour"].as_ref().unwrap();
        assert_eq!(flour.amount, "250");
        assert_eq!(flour.unit, "g");
        assert_eq!(content.ingredients["salt to taste"], None);
        assert_eq!(content.method_lines, vec!["Mix.", "Bake."]);
    }
}
