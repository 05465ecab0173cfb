//! Pre-categorization transaction shape.

use budgetsync_core::AccountKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upstream category hints, consumed by categorization and then dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryHints {
    #[serde(default)]
    pub detailed: Option<String>,
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub list: Vec<String>,
}

impl CategoryHints {
    /// Hints in lookup order: detailed, primary, then list-form.
    pub fn in_order(&self) -> impl Iterator<Item = &str> {
        self.detailed
            .as_deref()
            .into_iter()
            .chain(self.primary.as_deref())
            .chain(self.list.iter().map(String::as_str))
    }
}

/// A transaction already re-signed and joined to its account, waiting for
/// a category and display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub id: String,
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub account: AccountKind,
    #[serde(default)]
    pub include_in_budget: bool,
    #[serde(default)]
    pub hints: CategoryHints,
}
