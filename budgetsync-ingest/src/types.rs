use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured category hint attached by the aggregator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalFinanceCategory {
    pub primary: Option<String>,
    pub detailed: Option<String>,
}

/// Transaction as returned by the aggregator (upstream sign convention:
/// positive means money left the account)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction_id: String,
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub pending: bool,
    /// On a posted record: the id of the pending record it supersedes
    #[serde(default)]
    pub pending_transaction_id: Option<String>,
    /// Legacy list-form hints, most general first
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub personal_finance_category: Option<PersonalFinanceCategory>,
}

/// One page of `/transactions/get`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionsPage {
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
    #[serde(default)]
    pub total_transactions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub current: Option<f64>,
    #[serde(default)]
    pub available: Option<f64>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAccount {
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub balances: Balances,
    #[serde(default)]
    pub institution_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHolding {
    pub account_id: String,
    pub security_id: String,
    #[serde(default)]
    pub institution_value: Option<f64>,
    #[serde(default)]
    pub institution_price: Option<f64>,
    #[serde(default)]
    pub cost_basis: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub security_id: String,
    #[serde(default)]
    pub ticker_symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `/investments/holdings/get` payload. The default value is the neutral
/// result for items without investment accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentHoldings {
    #[serde(default)]
    pub holdings: Vec<RawHolding>,
    #[serde(default)]
    pub securities: Vec<Security>,
}

/// `/liabilities/get` groups. Entries stay loosely typed because the field
/// names drift between aggregator API versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Liabilities {
    #[serde(default)]
    pub credit: Option<Vec<Value>>,
    #[serde(default)]
    pub student: Option<Vec<Value>>,
    #[serde(default)]
    pub mortgage: Option<Vec<Value>>,
}
