use anyhow::{bail, Context, Result};
use budgetsync_finance::ai_classifier::usable_api_key;
use budgetsync_finance::SyncError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::state::ensure_budgetsync_home;

/// Secrets persisted in `~/.budgetsync/auth.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthState {
    pub aggregator_client_id: Option<String>,
    pub aggregator_secret: Option<String>,
    pub openai_api_key: Option<String>,
}

/// File values with environment overrides applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub aggregator_client_id: Option<String>,
    pub aggregator_secret: Option<String>,
    pub aggregator_env: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_budgetsync_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Overlay environment variables onto stored secrets. Blank values count
/// as unset on both sides.
pub fn resolve_with(auth: AuthState, lookup: impl Fn(&str) -> Option<String>) -> Credentials {
    let env = |key: &str| non_blank(lookup(key));
    Credentials {
        aggregator_client_id: env("PLAID_CLIENT_ID").or(non_blank(auth.aggregator_client_id)),
        aggregator_secret: env("PLAID_SECRET").or(non_blank(auth.aggregator_secret)),
        aggregator_env: env("PLAID_ENV"),
        openai_api_key: env("OPENAI_API_KEY").or(non_blank(auth.openai_api_key)),
        openai_model: env("OPENAI_MODEL"),
    }
}

pub fn resolve(auth: AuthState) -> Credentials {
    resolve_with(auth, |key| std::env::var(key).ok())
}

impl Credentials {
    /// Client id and secret, or a configuration failure naming what to set.
    pub fn aggregator_keys(&self) -> Result<(&str, &str), SyncError> {
        match (
            self.aggregator_client_id.as_deref(),
            self.aggregator_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(SyncError::Config(
                "aggregator credentials missing: set PLAID_CLIENT_ID and PLAID_SECRET \
                 or run `budgetsync auth set-aggregator-keys`"
                    .to_string(),
            )),
        }
    }
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn set_openai_key() -> Result<()> {
    let mut auth = load_auth()?;
    let pasted = prompt_secret("OpenAI API key")?;
    let Some(key) = usable_api_key(Some(&pasted)) else {
        bail!("not a usable API key: empty or contains whitespace");
    };
    auth.openai_api_key = Some(key.to_string());
    save_auth(&auth)?;
    println!("Saved OpenAI API key to ~/.budgetsync/auth.json");
    Ok(())
}

pub fn set_aggregator_keys() -> Result<()> {
    let mut auth = load_auth()?;
    let client_id = prompt_secret("Aggregator client id")?;
    let secret = prompt_secret("Aggregator secret")?;
    if client_id.is_empty() || secret.is_empty() {
        bail!("both client id and secret are required");
    }
    auth.aggregator_client_id = Some(client_id);
    auth.aggregator_secret = Some(secret);
    save_auth(&auth)?;
    println!("Saved aggregator keys to ~/.budgetsync/auth.json");
    Ok(())
}
