//! Request authentication: HTTP basic credentials or a GitHub OAuth flow.
//!
//! Basic mode compares SHA-256 digests of the presented username and
//! password in constant time against the configured user set; passwords
//! live in `USER_<NAME>_PASSWORD` environment variables, never on disk.
//!
//! GitHub mode issues an HMAC-SHA256 signed session cookie after the OAuth
//! callback verifies the login is in the allowed set. The signing key comes
//! from `LARDER_SESSION_SECRET`, or is generated per process when unset
//! (sessions then die with the process).
//!
//! There is no lockout or rate limiting; a failed check is just a 401 or a
//! redirect back into the OAuth flow.

use anyhow::{bail, Context, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "larder_session";
pub const STATE_COOKIE: &str = "larder_oauth_state";

/// Per-process cookie signing key.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    /// Read `LARDER_SESSION_SECRET`, or generate a random key so a fresh
    /// process invalidates old cookies rather than failing to start.
    pub fn from_env_or_random() -> Self {
        match std::env::var("LARDER_SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => Self(secret.into_bytes()),
            _ => {
                let mut key = Vec::with_capacity(32);
                key.extend_from_slice(Uuid::new_v4().as_bytes());
                key.extend_from_slice(Uuid::new_v4().as_bytes());
                Self(key)
            }
        }
    }

    fn mac(&self, value: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("hmac accepts any key length");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Produce a `value.signature` token.
    pub fn sign(&self, value: &str) -> String {
        format!("{}.{}", value, self.mac(value))
    }

    /// Verify a `value.signature` token and return the value.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (value, sig) = token.rsplit_once('.')?;
        let expected = self.mac(value);
        if expected.as_bytes().ct_eq(sig.as_bytes()).into() {
            Some(value.to_string())
        } else {
            None
        }
    }
}

/// Check an `Authorization: Basic ...` header value against the configured
/// users. Username and password digests are compared in constant time.
pub fn verify_basic(config: &AuthConfig, header: &str) -> bool {
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = credentials.split_once(':') else {
        return false;
    };

    config.users.iter().any(|user| {
        let expected_password = expected_password_for(user);
        let user_ok: bool = Sha256::digest(username.as_bytes())
            .ct_eq(&Sha256::digest(user.as_bytes()))
            .into();
        let pass_ok: bool = Sha256::digest(password.as_bytes())
            .ct_eq(&Sha256::digest(expected_password.as_bytes()))
            .into();
        user_ok && pass_ok
    })
}

fn expected_password_for(user: &str) -> String {
    std::env::var(format!("USER_{}_PASSWORD", user.to_uppercase())).unwrap_or_default()
}

/// Check a signed session cookie and return the login when it is both
/// authentic and in the allowed set.
pub fn verify_session(config: &AuthConfig, secret: &SessionSecret, cookie: &str) -> Option<String> {
    let login = secret.verify(cookie)?;
    if config.users.iter().any(|u| u == &login) {
        Some(login)
    } else {
        None
    }
}

// ============ GitHub OAuth ============

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";

pub struct GithubApp {
    client_id: String,
    client_secret: String,
}

impl GithubApp {
    pub fn from_env() -> Result<Self> {
        let client_id =
            std::env::var("GITHUB_CLIENT_ID").with_context(|| "GITHUB_CLIENT_ID not set")?;
        let client_secret = std::env::var("GITHUB_CLIENT_SECRET")
            .with_context(|| "GITHUB_CLIENT_SECRET not set")?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&state={}",
            GITHUB_AUTHORIZE_URL, self.client_id, state
        )
    }

    /// Exchange the callback code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
            error_description: Option<String>,
        }

        let client = reqwest::Client::new();
        let response: TokenResponse = client
            .post(GITHUB_TOKEN_URL)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await?
            .json()
            .await?;

        match response.access_token {
            Some(token) => Ok(token),
            None => bail!(
                "GitHub token exchange failed: {}",
                response
                    .error_description
                    .unwrap_or_else(|| "no error description".to_string())
            ),
        }
    }

    /// Fetch the authenticated user's login.
    pub async fn fetch_login(&self, token: &str) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct UserResponse {
            login: String,
        }

        let client = reqwest::Client::new();
        let response = client
            .get(GITHUB_USER_URL)
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", concat!("larder/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("GitHub user lookup failed: {}", response.status());
        }

        let user: UserResponse = response.json().await?;
        Ok(user.login)
    }
}

/// Extract one cookie's value from a `Cookie` request header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}
