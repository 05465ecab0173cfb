//! Top-level sync: fetch everything for one linked item, reconcile it and
//! hand back `{transactions, accounts}` or a single failure.

use budgetsync_core::{is_liability_type, Account, AccountKind, Transaction};
use budgetsync_ingest::{
    BankingData, InvestmentHoldings, RawAccount, RawHolding, RawTransaction, Security,
};
use chrono::{NaiveDate, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::info;

use crate::ai_classifier::BatchClassifier;
use crate::draft::{CategoryHints, TransactionDraft};
use crate::error::SyncError;
use crate::holdings::build_holdings;
use crate::liabilities::{build_liability_index, LiabilityIndex};
use crate::pipeline::Categorizer;
use crate::retry::{with_retry, RetryPolicy};

pub const DEFAULT_WINDOW_DAYS: i64 = 90;

static RE_ISO_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("iso day regex"));

/// Caller input for one sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl SyncRequest {
    /// Parse a JSON request body. A blank body is an empty request.
    pub fn from_json(body: &str) -> Result<Self, SyncError> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(body)
            .map_err(|e| SyncError::InvalidRequest(format!("Invalid request body: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncPayload {
    pub transactions: Vec<Transaction>,
    pub accounts: Vec<Account>,
}

/// Inclusive date range sent to the transactions fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn parse_bound(label: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, SyncError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if !RE_ISO_DAY.is_match(raw) {
        return Err(SyncError::InvalidRequest(format!(
            "{label} must be YYYY-MM-DD, got {raw:?}"
        )));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| SyncError::InvalidRequest(format!("{label} is not a calendar day: {raw:?}")))
}

/// Resolve the fetch window. Each missing bound falls back on its own:
/// `end` to `today`, `start` to `today - window_days`.
///
/// A `window_days` that leaves the calendar range is a configuration error.
pub fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
    window_days: i64,
) -> Result<DateWindow, SyncError> {
    let start = match parse_bound("start_date", start)? {
        Some(day) => day,
        None => TimeDelta::try_days(window_days)
            .and_then(|back| today.checked_sub_signed(back))
            .ok_or_else(|| {
                SyncError::Config(format!("window_days {window_days} is out of range"))
            })?,
    };
    let end = parse_bound("end_date", end)?.unwrap_or(today);
    if start > end {
        return Err(SyncError::InvalidRequest(format!(
            "start_date {start} is after end_date {end}"
        )));
    }
    Ok(DateWindow { start, end })
}

/// Drop pending records that a posted record in the same batch supersedes.
/// Returns the survivors (original order) and how many were dropped.
pub fn drop_pending_shadows(txns: Vec<RawTransaction>) -> (Vec<RawTransaction>, usize) {
    let superseded: HashSet<String> = txns
        .iter()
        .filter(|t| !t.pending)
        .filter_map(|t| t.pending_transaction_id.clone())
        .collect();

    let before = txns.len();
    let kept: Vec<RawTransaction> = txns
        .into_iter()
        .filter(|t| !(t.pending && superseded.contains(&t.transaction_id)))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Join a raw transaction to its account type and flip the amount sign.
pub fn to_draft(raw: RawTransaction, account_types: &HashMap<&str, &str>) -> TransactionDraft {
    let account = AccountKind::from_account_type(account_types.get(raw.account_id.as_str()).copied());
    let pfc = raw.personal_finance_category.unwrap_or_default();

    TransactionDraft {
        id: raw.transaction_id,
        account_id: raw.account_id,
        name: raw.name,
        merchant_name: raw.merchant_name,
        amount: -raw.amount,
        date: raw.date,
        pending: raw.pending,
        account,
        include_in_budget: account.include_in_budget(),
        hints: CategoryHints {
            detailed: pfc.detailed,
            primary: pfc.primary,
            list: raw.category.unwrap_or_default(),
        },
    }
}

/// Shape accounts with their holdings and, for liability types, their
/// reconciled interest/payment fields.
pub fn shape_accounts(
    accounts: Vec<RawAccount>,
    investments: &InvestmentHoldings,
    liabilities: &LiabilityIndex,
) -> Vec<Account> {
    let securities: HashMap<&str, &Security> = investments
        .securities
        .iter()
        .map(|s| (s.security_id.as_str(), s))
        .collect();
    let mut by_account: HashMap<&str, Vec<&RawHolding>> = HashMap::new();
    for h in &investments.holdings {
        by_account.entry(h.account_id.as_str()).or_default().push(h);
    }

    accounts
        .into_iter()
        .map(|acc| {
            let matched = by_account
                .get(acc.account_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let holdings = build_holdings(&acc, matched, &securities);
            let liability = is_liability_type(&acc.account_type)
                .then(|| liabilities.get(&acc.account_id).cloned().unwrap_or_default());

            Account {
                id: acc.account_id,
                name: acc.name,
                account_type: acc.account_type,
                subtype: acc.subtype,
                balance: acc.balances.current,
                institution_name: acc.institution_name,
                holdings,
                liability,
            }
        })
        .collect()
}

/// Per-call-site policies and the default window
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub window_days: i64,
    pub transactions: RetryPolicy,
    pub investments: RetryPolicy,
    pub liabilities: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            transactions: RetryPolicy::transactions(),
            investments: RetryPolicy::investments(),
            liabilities: RetryPolicy::liabilities(),
        }
    }
}

impl SyncOptions {
    /// Apply one attempt ceiling and base delay to every call site.
    pub fn with_timing(mut self, max_attempts: u32, base_delay: std::time::Duration) -> Self {
        self.transactions = self.transactions.with_timing(max_attempts, base_delay);
        self.investments = self.investments.with_timing(max_attempts, base_delay);
        self.liabilities = self.liabilities.with_timing(max_attempts, base_delay);
        self
    }
}

/// Stateless per invocation; safe to share across concurrent requests.
pub struct SyncService<B, C> {
    bank: B,
    categorizer: Categorizer<C>,
    options: SyncOptions,
}

impl<B: BankingData, C: BatchClassifier> SyncService<B, C> {
    pub fn new(bank: B, classifier: C, options: SyncOptions) -> Self {
        Self {
            bank,
            categorizer: Categorizer::new(classifier),
            options,
        }
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub async fn sync(&self, request: &SyncRequest) -> Result<SyncPayload, SyncError> {
        self.sync_as_of(request, Utc::now().date_naive()).await
    }

    /// Same as [`sync`](Self::sync) with an explicit "today" for the
    /// default window.
    pub async fn sync_as_of(
        &self,
        request: &SyncRequest,
        today: NaiveDate,
    ) -> Result<SyncPayload, SyncError> {
        let token = request.access_token.trim();
        if token.is_empty() {
            return Err(SyncError::InvalidRequest("access_token is required".to_string()));
        }
        let window = resolve_window(
            request.start_date.as_deref(),
            request.end_date.as_deref(),
            today,
            self.options.window_days,
        )?;

        let bank = &self.bank;
        let (raw_txns, raw_accounts, investments, liabilities) = tokio::try_join!(
            with_retry(&self.options.transactions, move || {
                bank.get_transactions(token, window.start, window.end)
            }),
            async move {
                bank.get_accounts(token)
                    .await
                    .map_err(|source| SyncError::Upstream {
                        call: "accounts",
                        attempts: 1,
                        source,
                    })
            },
            with_retry(&self.options.investments, move || bank.get_investment_holdings(token)),
            with_retry(&self.options.liabilities, move || bank.get_liabilities(token)),
        )?;

        let fetched = raw_txns.len();
        let (raw_txns, dropped) = drop_pending_shadows(raw_txns);

        let account_types: HashMap<&str, &str> = raw_accounts
            .iter()
            .map(|a| (a.account_id.as_str(), a.account_type.as_str()))
            .collect();
        let drafts: Vec<TransactionDraft> = raw_txns
            .into_iter()
            .map(|t| to_draft(t, &account_types))
            .collect();

        let transactions = self.categorizer.categorize(drafts).await;

        let liability_index = build_liability_index(&liabilities);
        let accounts = shape_accounts(raw_accounts, &investments, &liability_index);

        info!(
            start = %window.start,
            end = %window.end,
            fetched,
            pending_dropped = dropped,
            transactions = transactions.len(),
            accounts = accounts.len(),
            holdings = investments.holdings.len(),
            liabilities = liability_index.len(),
            "sync complete"
        );

        Ok(SyncPayload {
            transactions,
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetsync_ingest::PersonalFinanceCategory;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(id: &str, pending: bool, pending_id: Option<&str>) -> RawTransaction {
        RawTransaction {
            transaction_id: id.into(),
            account_id: "a1".into(),
            name: "STARBUCKS STORE 0123".into(),
            merchant_name: None,
            amount: -4.75,
            date: day(2026, 1, 5),
            pending,
            pending_transaction_id: pending_id.map(str::to_string),
            category: None,
            personal_finance_category: None,
        }
    }

    #[test]
    fn test_default_window_is_90_days() {
        let w = resolve_window(None, None, day(2026, 4, 1), DEFAULT_WINDOW_DAYS).unwrap();
        assert_eq!(w.end, day(2026, 4, 1));
        assert_eq!(w.start, day(2026, 1, 1));
    }

    #[test]
    fn test_bounds_default_independently() {
        let today = day(2026, 4, 1);
        let w = resolve_window(Some("2026-03-01"), None, today, 90).unwrap();
        assert_eq!((w.start, w.end), (day(2026, 3, 1), today));

        let w = resolve_window(Some("  "), Some("2026-03-15"), today, 90).unwrap();
        assert_eq!((w.start, w.end), (day(2026, 1, 1), day(2026, 3, 15)));
    }

    #[test]
    fn test_oversized_window_is_config_error() {
        let today = day(2026, 4, 1);
        let err = resolve_window(None, None, today, 1_000_000_000).unwrap_err();
        assert_eq!(err.reason(), "configuration_error");
        assert!(err.to_string().contains("window_days"));

        // an explicit start never consults the window
        let w = resolve_window(Some("2026-03-01"), None, today, 1_000_000_000).unwrap();
        assert_eq!(w.start, day(2026, 3, 1));
    }

    #[test]
    fn test_malformed_bounds_are_rejected() {
        let today = day(2026, 4, 1);
        for bad in ["2026-3-1", "03/01/2026", "2026-02-30", "2026-03-01T00:00:00Z"] {
            let err = resolve_window(Some(bad), None, today, 90).unwrap_err();
            assert_eq!(err.reason(), "invalid_request", "{bad} should be rejected");
        }
        let err = resolve_window(Some("2026-03-10"), Some("2026-03-01"), today, 90).unwrap_err();
        assert_eq!(err.reason(), "invalid_request");
    }

    #[test]
    fn test_posted_record_supersedes_pending_shadow() {
        let txns = vec![
            raw("P1", true, None),
            raw("T1", false, Some("P1")),
            raw("P2", true, None),
        ];
        let (kept, dropped) = drop_pending_shadows(txns);
        let ids: Vec<&str> = kept.iter().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "P2"]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_pending_reference_on_pending_record_does_not_dedup() {
        let txns = vec![raw("P1", true, None), raw("P3", true, Some("P1"))];
        let (kept, dropped) = drop_pending_shadows(txns);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_to_draft_resigns_and_joins_account() {
        let mut t = raw("T1", false, None);
        t.category = Some(vec!["Food and Drink".into()]);
        t.personal_finance_category = Some(PersonalFinanceCategory {
            primary: Some("FOOD_AND_DRINK".into()),
            detailed: None,
        });
        let types: HashMap<&str, &str> = [("a1", "credit")].into_iter().collect();
        let d = to_draft(t, &types);
        assert_eq!(d.amount, 4.75);
        assert_eq!(d.account, AccountKind::Credit);
        assert!(d.include_in_budget);
        assert_eq!(d.hints.primary.as_deref(), Some("FOOD_AND_DRINK"));
        assert_eq!(d.hints.list, vec!["Food and Drink".to_string()]);

        let mut t = raw("T2", false, None);
        t.amount = 1200.0;
        t.account_id = "unknown".into();
        let d = to_draft(t, &types);
        assert_eq!(d.amount, -1200.0);
        assert_eq!(d.account, AccountKind::Checking);
        assert!(!d.include_in_budget);
    }

    #[test]
    fn test_request_from_json() {
        let r = SyncRequest::from_json(r#"{"access_token":"tok","start_date":"2026-01-01"}"#).unwrap();
        assert_eq!(r.access_token, "tok");
        assert_eq!(r.start_date.as_deref(), Some("2026-01-01"));
        assert!(r.end_date.is_none());

        assert_eq!(SyncRequest::from_json("  ").unwrap(), SyncRequest::default());
        assert_eq!(SyncRequest::from_json("{not json").unwrap_err().reason(), "invalid_request");
    }
}
