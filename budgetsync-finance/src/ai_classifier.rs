//! Optional remote classifier: one batched chat-completion request for the
//! whole transaction set.
//!
//! This module only reports success or failure. Deciding to fall back to
//! the rule-based path is the pipeline's job.

use anyhow::{bail, Context, Result};
use budgetsync_core::{clean_name, Category};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::draft::TransactionDraft;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const SYSTEM_PROMPT: &str = "You categorize bank transactions and clean merchant labels. \
Return JSON only. Allowed categories: groceries, dining, transportation, entertainment, \
shopping, subscription, other.";

/// What the remote classifier said about one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct AiLabel {
    pub category: Category,
    pub display_name: String,
}

/// One entry per input index; any entry may be missing.
pub type BatchLabels = Vec<Option<AiLabel>>;

/// A classifier that labels a whole batch at once.
///
/// `Ok(None)` means "declined" (not configured, nothing to do, or an empty
/// reply). `Err` is a real failure.
pub trait BatchClassifier {
    fn classify_batch(
        &self,
        drafts: &[TransactionDraft],
    ) -> impl Future<Output = Result<Option<BatchLabels>>> + Send;
}

/// Classifier that always declines. Used when the remote path is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl BatchClassifier for Offline {
    async fn classify_batch(&self, _drafts: &[TransactionDraft]) -> Result<Option<BatchLabels>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Chat-completions backed classifier (OpenAI-compatible API)
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    config: OpenAiConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct Msg {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct Req {
    model: String,
    temperature: f32,
    response_format: Value,
    messages: Vec<Msg>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build classifier http client")?;
        Ok(Self { config, http })
    }

    pub fn is_configured(&self) -> bool {
        usable_api_key(self.config.api_key.as_deref()).is_some()
    }

    fn build_request(&self, drafts: &[TransactionDraft]) -> Req {
        let transactions: Vec<Value> = drafts
            .iter()
            .enumerate()
            .map(|(index, t)| {
                json!({
                    "index": index,
                    "name": t.name,
                    "merchant_name": t.merchant_name,
                    "amount": t.amount,
                    "account": t.account,
                    "category_hints": t.hints,
                })
            })
            .collect();

        let user = json!({
            "instructions": "For each transaction index, choose the best allowed category and provide a short cleaned displayName.",
            "transactions": transactions,
            "output_shape": {
                "categories": [{ "index": 0, "category": "dining", "displayName": "Starbucks" }]
            },
        });

        Req {
            model: self.config.model.clone(),
            temperature: 0.0,
            response_format: json!({ "type": "json_object" }),
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Msg {
                    role: "user",
                    content: user.to_string(),
                },
            ],
        }
    }
}

impl BatchClassifier for OpenAiClassifier {
    async fn classify_batch(&self, drafts: &[TransactionDraft]) -> Result<Option<BatchLabels>> {
        let Some(key) = usable_api_key(self.config.api_key.as_deref()) else {
            return Ok(None);
        };
        if drafts.is_empty() {
            return Ok(None);
        }

        let body = self.build_request(drafts);
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(count = drafts.len(), model = %self.config.model, "classifier request");

        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .context("classifier request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("classifier error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse classifier response")?;
        let content = out.choices.into_iter().next().and_then(|c| c.message.content);
        match content {
            Some(c) if !c.trim().is_empty() => parse_reply(&c, drafts),
            _ => Ok(None),
        }
    }
}

/// The trimmed key, or `None` when it cannot authenticate a request.
pub fn usable_api_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty() && !k.contains(char::is_whitespace))
}

/// Parse the model's JSON reply into index-aligned labels.
///
/// Malformed JSON is an error. A reply without a `categories` array is
/// "no result". Entries with a non-integer or out-of-range index are
/// ignored; a later entry for the same index replaces an earlier one.
pub fn parse_reply(content: &str, drafts: &[TransactionDraft]) -> Result<Option<BatchLabels>> {
    let parsed: Value = serde_json::from_str(content).context("classifier reply is not JSON")?;
    let Some(items) = parsed.get("categories").and_then(Value::as_array) else {
        return Ok(None);
    };

    let mut by_index: HashMap<usize, AiLabel> = HashMap::new();
    for item in items {
        let Some(index) = item.get("index").and_then(integer_index) else {
            continue;
        };
        let Some(draft) = drafts.get(index) else {
            continue;
        };

        let category = item
            .get("category")
            .and_then(Value::as_str)
            .map(Category::normalize)
            .unwrap_or(Category::Other);
        let raw_name = item
            .get("displayName")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&draft.name);

        by_index.insert(
            index,
            AiLabel {
                category,
                display_name: clean_name(raw_name),
            },
        );
    }

    Ok(Some((0..drafts.len()).map(|i| by_index.remove(&i)).collect()))
}

fn integer_index(v: &Value) -> Option<usize> {
    if let Some(u) = v.as_u64() {
        return usize::try_from(u).ok();
    }
    v.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 0.0)
        .map(|f| f as usize)
}
