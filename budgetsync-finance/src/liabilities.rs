//! Liability reconciler: folds the credit, student and mortgage groups into
//! one `LiabilityDetail` per account id.
//!
//! The aggregator has renamed these fields across API versions, so each
//! field is read from an ordered list of candidates and the first usable
//! value wins. New spellings go into the tables, not into branching code.

use budgetsync_core::{round_to, LiabilityDetail};
use budgetsync_ingest::Liabilities;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Where a value may live inside one liability entry
#[derive(Debug, Clone, Copy)]
enum Candidate {
    /// Plain or nested field, e.g. `["interest_rate", "percentage"]`
    Field(&'static [&'static str]),
    /// `apr_percentage` of the first `aprs` entry whose `apr_type` contains
    /// the marker; `None` takes the first entry
    Apr(Option<&'static str>),
}

/// Candidate tables for one liability group
struct GroupSchema {
    name: &'static str,
    interest_rate: &'static [Candidate],
    payment_amount: &'static [Candidate],
    next_payment_date: &'static [Candidate],
    term: &'static [Candidate],
    /// Key of a nested list of sub-loans sharing this schema
    nested: Option<&'static str>,
}

use Candidate::{Apr, Field};

const CREDIT: GroupSchema = GroupSchema {
    name: "credit",
    interest_rate: &[
        Apr(Some("purchase")),
        Field(&["apr_percentage"]),
        Field(&["interest_rate_percentage"]),
        Field(&["interest_rate", "percentage"]),
        Apr(None),
    ],
    payment_amount: &[
        Field(&["minimum_payment_amount"]),
        Field(&["next_monthly_payment"]),
        Field(&["last_payment_amount"]),
    ],
    next_payment_date: &[
        Field(&["next_payment_due_date"]),
        Field(&["next_payment_date"]),
        Field(&["payment_due_date"]),
    ],
    term: &[],
    nested: None,
};

const STUDENT: GroupSchema = GroupSchema {
    name: "student",
    interest_rate: &[
        Field(&["interest_rate_percentage"]),
        Field(&["interest_rate", "percentage"]),
        Field(&["interest_rate"]),
        Field(&["apr_percentage"]),
    ],
    payment_amount: &[
        Field(&["minimum_payment_amount"]),
        Field(&["next_monthly_payment"]),
        Field(&["last_payment_amount"]),
    ],
    next_payment_date: &[
        Field(&["next_payment_due_date"]),
        Field(&["next_payment_date"]),
        Field(&["payment_due_date"]),
    ],
    term: &[Field(&["term_months"]), Field(&["loan_term"])],
    nested: Some("loans"),
};

const MORTGAGE: GroupSchema = GroupSchema {
    name: "mortgage",
    interest_rate: &[
        Field(&["interest_rate", "percentage"]),
        Field(&["interest_rate_percentage"]),
        Field(&["interest_rate"]),
    ],
    payment_amount: &[
        Field(&["next_monthly_payment"]),
        Field(&["minimum_payment_amount"]),
        Field(&["last_payment_amount"]),
    ],
    next_payment_date: &[
        Field(&["next_payment_due_date"]),
        Field(&["next_payment_date"]),
    ],
    term: &[Field(&["term_months"]), Field(&["loan_term"])],
    nested: None,
};

impl Candidate {
    fn resolve<'a>(&self, entry: &'a Value) -> Option<&'a Value> {
        match self {
            Field(path) => path.iter().try_fold(entry, |v, key| v.get(key)),
            Apr(marker) => entry
                .get("aprs")?
                .as_array()?
                .iter()
                .find(|apr| match marker {
                    Some(m) => apr
                        .get("apr_type")
                        .and_then(Value::as_str)
                        .is_some_and(|t| t.to_lowercase().contains(m)),
                    None => true,
                })?
                .get("apr_percentage"),
        }
    }
}

fn first_present<T>(
    entry: &Value,
    candidates: &[Candidate],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    candidates
        .iter()
        .filter_map(|c| c.resolve(entry))
        .find_map(parse)
}

/// Finite number (or numeric string) rounded to cents
fn money(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    round_to(n, 2)
}

/// Calendar day; full timestamps are cut to their date.
fn calendar_day(v: &Value) -> Option<NaiveDate> {
    let s = v.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Term in months from a number of months or text like `"30 year"`.
fn term_months(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()).filter(|m| *m > 0),
        Value::String(s) => {
            let lower = s.trim().to_lowercase();
            let mut parts = lower.split_whitespace();
            let count: u32 = parts.next()?.parse().ok()?;
            let months = match parts.next() {
                Some(unit) if unit.starts_with("year") => count.checked_mul(12)?,
                Some(unit) if unit.starts_with("month") => count,
                None => count,
                Some(_) => return None,
            };
            (months > 0).then_some(months)
        }
        _ => None,
    }
}

fn account_id(entry: &Value) -> Option<&str> {
    entry
        .get("account_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Per-account accumulator. Upserts only ever fill in or replace present
/// values; an absent value never erases what an earlier upsert wrote.
#[derive(Debug, Clone, Default)]
pub struct LiabilityIndex {
    by_account: HashMap<String, LiabilityDetail>,
}

impl LiabilityIndex {
    pub fn upsert(&mut self, account_id: &str, incoming: LiabilityDetail) {
        let slot = self.by_account.entry(account_id.to_string()).or_default();
        if incoming.interest_rate.is_some() {
            slot.interest_rate = incoming.interest_rate;
        }
        if incoming.term_months.is_some() {
            slot.term_months = incoming.term_months;
        }
        if incoming.next_payment_date.is_some() {
            slot.next_payment_date = incoming.next_payment_date;
        }
        if incoming.payment_amount.is_some() {
            slot.payment_amount = incoming.payment_amount;
        }
    }

    pub fn get(&self, account_id: &str) -> Option<&LiabilityDetail> {
        self.by_account.get(account_id)
    }

    pub fn len(&self) -> usize {
        self.by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }
}

fn extract(entry: &Value, schema: &GroupSchema) -> LiabilityDetail {
    LiabilityDetail {
        interest_rate: first_present(entry, schema.interest_rate, money),
        term_months: first_present(entry, schema.term, term_months),
        next_payment_date: first_present(entry, schema.next_payment_date, calendar_day),
        payment_amount: first_present(entry, schema.payment_amount, money),
    }
}

fn fold_group(index: &mut LiabilityIndex, entries: &[Value], schema: &GroupSchema) {
    for entry in entries {
        let parent_id = account_id(entry);
        match parent_id {
            Some(id) => index.upsert(id, extract(entry, schema)),
            None => debug!(group = schema.name, "skipping liability entry without account_id"),
        }

        let Some(key) = schema.nested else { continue };
        let Some(loans) = entry.get(key).and_then(Value::as_array) else {
            continue;
        };
        for loan in loans {
            match account_id(loan).or(parent_id) {
                Some(id) => index.upsert(id, extract(loan, schema)),
                None => debug!(group = schema.name, "skipping sub-loan without account_id"),
            }
        }
    }
}

/// Reconcile every liability group into one record per account id.
pub fn build_liability_index(liabilities: &Liabilities) -> LiabilityIndex {
    let mut index = LiabilityIndex::default();
    let groups = [
        (&liabilities.credit, &CREDIT),
        (&liabilities.student, &STUDENT),
        (&liabilities.mortgage, &MORTGAGE),
    ];
    for (entries, schema) in groups {
        if let Some(entries) = entries {
            fold_group(&mut index, entries, schema);
        }
    }
    index
}
