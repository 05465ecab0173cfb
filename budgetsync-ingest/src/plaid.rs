//! HTTP client for a Plaid-compatible aggregator API.

use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::client::BankingData;
use crate::error::UpstreamError;
use crate::types::{InvestmentHoldings, Liabilities, RawAccount, RawTransaction, TransactionsPage};

/// Page size for `/transactions/get` (the aggregator's maximum)
pub const TRANSACTIONS_PAGE_SIZE: usize = 500;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl Environment {
    /// Unknown names fall back to the sandbox.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" => Environment::Production,
            "development" => Environment::Development,
            _ => Environment::Sandbox,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://sandbox.plaid.com",
            Environment::Development => "https://development.plaid.com",
            Environment::Production => "https://production.plaid.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaidClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
}

#[derive(Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    accounts: Vec<RawAccount>,
}

#[derive(Deserialize)]
struct LiabilitiesResponse {
    #[serde(default)]
    liabilities: Liabilities,
}

impl PlaidClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| UpstreamError::transport(format!("build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            secret: secret.into(),
        })
    }

    pub fn for_environment(
        env: Environment,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, UpstreamError> {
        Self::new(env.base_url(), client_id, secret)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, mut body: Value) -> Result<T, UpstreamError> {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("client_id".to_string(), Value::String(self.client_id.clone()));
            obj.insert("secret".to_string(), Value::String(self.secret.clone()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "aggregator request");

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("{path} request: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(status.as_u16(), &txt));
        }

        resp.json::<T>()
            .await
            .map_err(|e| UpstreamError::transport(format!("parse {path} response: {e}")))
    }
}

impl BankingData for PlaidClient {
    async fn get_transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawTransaction>, UpstreamError> {
        let mut out: Vec<RawTransaction> = Vec::new();

        loop {
            let page: TransactionsPage = self
                .post(
                    "/transactions/get",
                    json!({
                        "access_token": access_token,
                        "start_date": start.format("%Y-%m-%d").to_string(),
                        "end_date": end.format("%Y-%m-%d").to_string(),
                        "options": { "count": TRANSACTIONS_PAGE_SIZE, "offset": out.len() },
                    }),
                )
                .await?;

            let fetched = page.transactions.len();
            out.extend(page.transactions);
            debug!(fetched, total = page.total_transactions, "transactions page");

            if fetched == 0 || out.len() >= page.total_transactions {
                break;
            }
        }

        Ok(out)
    }

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<RawAccount>, UpstreamError> {
        let resp: AccountsResponse = self
            .post("/accounts/get", json!({ "access_token": access_token }))
            .await?;
        Ok(resp.accounts)
    }

    async fn get_investment_holdings(
        &self,
        access_token: &str,
    ) -> Result<InvestmentHoldings, UpstreamError> {
        self.post("/investments/holdings/get", json!({ "access_token": access_token }))
            .await
    }

    async fn get_liabilities(&self, access_token: &str) -> Result<Liabilities, UpstreamError> {
        let resp: LiabilitiesResponse = self
            .post("/liabilities/get", json!({ "access_token": access_token }))
            .await?;
        Ok(resp.liabilities)
    }
}
