//! Category taxonomy and the normalized record shapes handed to budget clients

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Transaction categories. The set is closed; `Other` always matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Groceries,
    Dining,
    Transportation,
    Entertainment,
    Shopping,
    Subscription,
    Other,
}

impl Category {
    /// Every category, in keyword-matching priority order (`Other` last).
    pub const ALL: [Category; 7] = [
        Category::Groceries,
        Category::Dining,
        Category::Transportation,
        Category::Entertainment,
        Category::Shopping,
        Category::Subscription,
        Category::Other,
    ];

    /// Stable key used on the wire and in classifier prompts
    pub fn key(&self) -> &'static str {
        match self {
            Category::Groceries => "groceries",
            Category::Dining => "dining",
            Category::Transportation => "transportation",
            Category::Entertainment => "entertainment",
            Category::Shopping => "shopping",
            Category::Subscription => "subscription",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Dining => "Dining",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Shopping => "Shopping",
            Category::Subscription => "Subscription",
            Category::Other => "Other",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Groceries => "🛒",
            Category::Dining => "🍽️",
            Category::Transportation => "🚗",
            Category::Entertainment => "🎬",
            Category::Shopping => "🛍️",
            Category::Subscription => "📱",
            Category::Other => "📦",
        }
    }

    /// Merchant keywords for the rule-based classifier. `Other` has none.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Category::Groceries => &[
                "whole foods", "trader joes", "safeway", "kroger", "grocery", "supermarket",
                "costco", "aldi",
            ],
            Category::Dining => &[
                "restaurant", "cafe", "coffee", "starbucks", "chipotle", "doordash", "ubereats",
                "grubhub", "bar", "bistro", "pizza",
            ],
            Category::Transportation => &[
                "gas", "shell", "chevron", "exxon", "uber", "lyft", "parking", "metro", "toll",
                "transit",
            ],
            Category::Entertainment => &[
                "movie", "amc", "netflix", "spotify", "hulu", "disney", "theater", "concert",
                "ticketmaster",
            ],
            Category::Shopping => &["amazon", "ebay", "etsy", "target", "walmart", "store", "shop"],
            Category::Subscription => &[
                "subscription", "prime", "premium", "membership", "icloud", "google one", "adobe",
            ],
            Category::Other => &[],
        }
    }

    /// Map a free-text category hint onto the taxonomy. Total: anything
    /// unrecognized becomes `Other`.
    pub fn normalize(raw: &str) -> Category {
        let raw = raw.trim().to_lowercase();

        if let Some(exact) = Category::ALL.iter().find(|c| c.key() == raw) {
            return *exact;
        }

        if raw.contains("food") {
            Category::Dining
        } else if raw.contains("grocer") {
            Category::Groceries
        } else if raw.contains("transport") || raw.contains("travel") {
            Category::Transportation
        } else if raw.contains("entertain") {
            Category::Entertainment
        } else if raw.contains("shop") || raw.contains("retail") {
            Category::Shopping
        } else if raw.contains("subscription") || raw.contains("stream") {
            Category::Subscription
        } else {
            Category::Other
        }
    }
}

/// How the owning account is treated for budgeting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Checking,
    Credit,
}

impl AccountKind {
    /// Resolve from the upstream account type; anything but `credit`
    /// (including an unknown account) is treated as checking.
    pub fn from_account_type(account_type: Option<&str>) -> Self {
        match account_type {
            Some(t) if t.eq_ignore_ascii_case("credit") => AccountKind::Credit,
            _ => AccountKind::Checking,
        }
    }

    /// Only credit-card spending counts toward the budget.
    pub fn include_in_budget(&self) -> bool {
        matches!(self, AccountKind::Credit)
    }
}

/// A categorized transaction as emitted to budget clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub display_name: String,
    /// Upstream amount with its sign flipped
    pub amount: f64,
    pub date: NaiveDate,
    pub pending: bool,
    pub account: AccountKind,
    pub include_in_budget: bool,
    pub category: Category,
    pub category_label: String,
    pub category_icon: String,
    pub reimbursable: f64,
    pub linked_deposit: Option<String>,
}

/// One position inside an investment (or synthesized) account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub value: f64,
    /// Share of the account's holdings value, percent with one decimal
    pub weight: f64,
    pub live_pct: Option<f64>,
    pub ytd_pct: Option<f64>,
}

/// Interest and payment facts reconciled for one liability account.
/// Every field is independently optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiabilityDetail {
    pub interest_rate: Option<f64>,
    pub term_months: Option<u32>,
    pub next_payment_date: Option<NaiveDate>,
    pub payment_amount: Option<f64>,
}

impl LiabilityDetail {
    pub fn is_empty(&self) -> bool {
        self.interest_rate.is_none()
            && self.term_months.is_none()
            && self.next_payment_date.is_none()
            && self.payment_amount.is_none()
    }
}

/// An account as emitted to budget clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
    pub holdings: Vec<Holding>,
    /// Present only on liability accounts; flattened so the fields sit at
    /// the top level of the account object.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub liability: Option<LiabilityDetail>,
}

/// Account types eligible for liability reconciliation
pub fn is_liability_type(account_type: &str) -> bool {
    matches!(
        account_type.trim().to_lowercase().as_str(),
        "credit" | "loan" | "liability"
    )
}

/// Round to `places` decimals; non-finite input yields `None`.
pub fn round_to(value: f64, places: i32) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    rounded.is_finite().then_some(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_exact_keys_are_idempotent() {
        for c in Category::ALL {
            assert_eq!(Category::normalize(c.key()), c);
            assert_eq!(Category::normalize(Category::normalize(c.key()).key()), c);
        }
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(Category::normalize("  Groceries "), Category::Groceries);
        assert_eq!(Category::normalize("DINING"), Category::Dining);
    }

    #[test]
    fn test_normalize_substring_heuristics() {
        assert_eq!(Category::normalize("FOOD_AND_DRINK"), Category::Dining);
        assert_eq!(Category::normalize("Food and Drink"), Category::Dining);
        assert_eq!(Category::normalize("FOOD_AND_DRINK_GROCERIES"), Category::Dining);
        assert_eq!(Category::normalize("Supermarkets and Grocers"), Category::Groceries);
        assert_eq!(Category::normalize("TRAVEL"), Category::Transportation);
        assert_eq!(Category::normalize("TRANSPORTATION_GAS"), Category::Transportation);
        assert_eq!(Category::normalize("ENTERTAINMENT_TV_AND_MOVIES"), Category::Entertainment);
        assert_eq!(Category::normalize("GENERAL_MERCHANDISE_ONLINE_MARKETPLACES"), Category::Other);
        assert_eq!(Category::normalize("Shops"), Category::Shopping);
        assert_eq!(Category::normalize("retail"), Category::Shopping);
        assert_eq!(Category::normalize("video streaming"), Category::Subscription);
    }

    #[test]
    fn test_normalize_is_total() {
        for raw in ["", "   ", "transfer", "🙂", "LOAN_PAYMENTS", "\u{0}"] {
            let c = Category::normalize(raw);
            assert!(Category::ALL.contains(&c));
        }
        assert_eq!(Category::normalize(""), Category::Other);
    }

    #[test]
    fn test_category_serializes_as_key() {
        let json = serde_json::to_string(&Category::Subscription).unwrap();
        assert_eq!(json, "\"subscription\"");
    }

    #[test]
    fn test_account_kind_resolution() {
        assert_eq!(AccountKind::from_account_type(Some("credit")), AccountKind::Credit);
        assert_eq!(AccountKind::from_account_type(Some("depository")), AccountKind::Checking);
        assert_eq!(AccountKind::from_account_type(None), AccountKind::Checking);
        assert!(AccountKind::Credit.include_in_budget());
        assert!(!AccountKind::Checking.include_in_budget());
    }

    #[test]
    fn test_non_liability_account_omits_liability_fields() {
        let account = Account {
            id: "a1".into(),
            name: "Checking".into(),
            account_type: "depository".into(),
            subtype: Some("checking".into()),
            balance: Some(100.0),
            institution_name: None,
            holdings: vec![],
            liability: None,
        };
        let v = serde_json::to_value(&account).unwrap();
        assert!(v.get("interestRate").is_none());
        assert!(v.get("nextPaymentDate").is_none());
        assert_eq!(v["type"], "depository");
    }

    #[test]
    fn test_liability_account_flattens_fields() {
        let account = Account {
            id: "c1".into(),
            name: "Card".into(),
            account_type: "credit".into(),
            subtype: None,
            balance: Some(-50.0),
            institution_name: Some("Bank".into()),
            holdings: vec![],
            liability: Some(LiabilityDetail {
                interest_rate: Some(22.49),
                ..Default::default()
            }),
        };
        let v = serde_json::to_value(&account).unwrap();
        assert_eq!(v["interestRate"], 22.49);
        assert!(v["termMonths"].is_null());
        assert!(v["nextPaymentDate"].is_null());
        assert_eq!(v["institutionName"], "Bank");
    }

    #[test]
    fn test_is_liability_type() {
        assert!(is_liability_type("credit"));
        assert!(is_liability_type("Loan"));
        assert!(is_liability_type("liability"));
        assert!(!is_liability_type("investment"));
        assert!(!is_liability_type("depository"));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(22.4949, 2), Some(22.49));
        assert_eq!(round_to(33.333, 1), Some(33.3));
        assert_eq!(round_to(f64::NAN, 2), None);
        assert_eq!(round_to(f64::INFINITY, 1), None);
    }
}
