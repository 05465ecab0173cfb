use anyhow::{Context, Result};
use budgetsync_finance::{
    Categorizer, OpenAiClassifier, OpenAiConfig, SyncError, SyncPayload, SyncRequest, SyncService,
    TransactionDraft,
};
use budgetsync_ingest::{Environment, PlaidClient};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod state;

use auth::Credentials;
use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "budgetsync",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUDGETSYNC_BUILD_SHA"), ")"),
    about = "Pull, categorize and reconcile linked bank data"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one linked item and print `{transactions, accounts}` JSON
    Sync {
        /// JSON request body with access_token, start_date, end_date
        #[arg(long)]
        request: Option<PathBuf>,

        /// Aggregator access token for the linked item
        #[arg(long)]
        access_token: Option<String>,

        /// First day of the window, YYYY-MM-DD (default: 90 days ago)
        #[arg(long)]
        start: Option<String>,

        /// Last day of the window, YYYY-MM-DD (default: today)
        #[arg(long)]
        end: Option<String>,

        /// Skip the remote classifier and use the keyword rules only
        #[arg(long)]
        no_ai: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Categorize a JSON array of transaction drafts from a file
    Categorize {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        no_ai: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Manage ~/.budgetsync/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store credentials in ~/.budgetsync/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Prompt for and save an OpenAI API key
    SetOpenaiKey,

    /// Prompt for and save the aggregator client id and secret
    SetAggregatorKeys,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Sync {
            request,
            access_token,
            start,
            end,
            no_ai,
            pretty,
        } => {
            let outcome = match build_request(request.as_deref(), access_token, start, end) {
                Ok(request) => run_sync(&request, no_ai).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(payload) => print_json(&payload, pretty)?,
                Err(err) => {
                    error!(reason = err.reason(), "{err}");
                    print_json(&err.to_failure(), pretty)?;
                    std::process::exit(1);
                }
            }
        }

        Command::Categorize {
            input,
            no_ai,
            pretty,
        } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("read {}", input.display()))?;
            let drafts: Vec<TransactionDraft> = serde_json::from_str(&raw)
                .with_context(|| format!("parse drafts from {}", input.display()))?;

            let cfg = config::load_config()?;
            let creds = auth::resolve(auth::load_auth()?);
            let categorizer = Categorizer::new(classifier(&cfg, &creds, no_ai)?);
            let transactions = categorizer.categorize(drafts).await;
            print_json(&transactions, pretty)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::SetOpenaiKey => auth::set_openai_key()?,
            AuthCommand::SetAggregatorKeys => auth::set_aggregator_keys()?,
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only JSON.
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "budgetsync=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serialize output")?;
    println!("{out}");
    Ok(())
}

/// Build the remote classifier. When disabled or without a key it simply
/// declines every batch, so the keyword rules decide.
fn classifier(cfg: &Config, creds: &Credentials, no_ai: bool) -> Result<OpenAiClassifier> {
    let enabled = cfg.classifier.enabled && !no_ai;
    let classifier = OpenAiClassifier::new(OpenAiConfig {
        api_key: creds.openai_api_key.clone().filter(|_| enabled),
        model: creds
            .openai_model
            .clone()
            .unwrap_or_else(|| cfg.classifier.model.clone()),
        base_url: cfg.classifier.base_url.clone(),
        timeout: Duration::from_secs(cfg.classifier.timeout_secs),
    })?;
    if enabled && !classifier.is_configured() {
        info!("no OpenAI API key configured; using keyword rules only");
    }
    Ok(classifier)
}

/// Start from the JSON body file when given; flags override its fields.
fn build_request(
    body: Option<&Path>,
    access_token: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<SyncRequest, SyncError> {
    let mut request = match body {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                SyncError::InvalidRequest(format!("read {}: {e}", path.display()))
            })?;
            SyncRequest::from_json(&raw)?
        }
        None => SyncRequest::default(),
    };
    if let Some(token) = access_token {
        request.access_token = token;
    }
    if start.is_some() {
        request.start_date = start;
    }
    if end.is_some() {
        request.end_date = end;
    }
    Ok(request)
}

async fn run_sync(request: &SyncRequest, no_ai: bool) -> Result<SyncPayload, SyncError> {
    let as_config_error = |e: anyhow::Error| SyncError::Config(format!("{e:#}"));

    let cfg = config::load_config().map_err(as_config_error)?;
    let creds = auth::resolve(auth::load_auth().map_err(as_config_error)?);
    let (client_id, secret) = creds.aggregator_keys()?;

    let environment = Environment::from_name(
        creds
            .aggregator_env
            .as_deref()
            .unwrap_or(&cfg.aggregator.environment),
    );
    let base_url = cfg
        .aggregator
        .base_url
        .clone()
        .unwrap_or_else(|| environment.base_url().to_string());
    let bank = PlaidClient::new(base_url, client_id, secret)
        .map_err(|e| SyncError::Config(e.to_string()))?;
    let classifier = classifier(&cfg, &creds, no_ai).map_err(as_config_error)?;

    SyncService::new(bank, classifier, cfg.sync.options())
        .sync(request)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_file(name: &str, contents: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("budgetsync-{}-{name}.json", std::process::id()));
        std::fs::write(&p, contents).unwrap();
        p
    }

    #[test]
    fn test_request_file_with_flag_overrides() {
        let p = body_file(
            "override",
            r#"{"access_token":"from-file","start_date":"2026-01-01","end_date":"2026-01-31"}"#,
        );
        let r = build_request(Some(p.as_path()), None, None, Some("2026-02-15".into())).unwrap();
        assert_eq!(r.access_token, "from-file");
        assert_eq!(r.start_date.as_deref(), Some("2026-01-01"));
        assert_eq!(r.end_date.as_deref(), Some("2026-02-15"));
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn test_bad_request_file_is_invalid_request() {
        let p = body_file("bad", "{not json");
        let err = build_request(Some(p.as_path()), Some("tok".into()), None, None).unwrap_err();
        assert_eq!(err.reason(), "invalid_request");
        std::fs::remove_file(&p).ok();

        let missing = std::env::temp_dir().join("budgetsync-does-not-exist.json");
        let err = build_request(Some(missing.as_path()), None, None, None).unwrap_err();
        assert_eq!(err.reason(), "invalid_request");
    }

    #[test]
    fn test_flags_only() {
        let r = build_request(None, Some("tok".into()), None, None).unwrap();
        assert_eq!(r.access_token, "tok");
        assert!(r.start_date.is_none() && r.end_date.is_none());
    }
}
