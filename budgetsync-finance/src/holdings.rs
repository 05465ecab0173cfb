//! Per-account holdings with value weights, or one synthesized placeholder
//! for accounts that report no positions.

use budgetsync_core::{round_to, Holding};
use budgetsync_ingest::{RawAccount, RawHolding, Security};
use std::collections::HashMap;

const PLACEHOLDER_SYMBOL_LEN: usize = 8;

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Map an account's matched holdings, or synthesize a single 100% holding
/// when there are none.
pub fn build_holdings(
    account: &RawAccount,
    holdings: &[&RawHolding],
    securities: &HashMap<&str, &Security>,
) -> Vec<Holding> {
    if holdings.is_empty() {
        return vec![placeholder_holding(account)];
    }

    let total: f64 = holdings
        .iter()
        .map(|h| h.institution_value.unwrap_or(0.0).abs())
        .sum();

    holdings
        .iter()
        .map(|h| {
            let security = securities.get(h.security_id.as_str()).copied();
            let ticker = security.and_then(|s| non_empty(s.ticker_symbol.as_deref()));
            let sec_name = security.and_then(|s| non_empty(s.name.as_deref()));

            let symbol = ticker
                .or(sec_name)
                .or(non_empty(account.subtype.as_deref()))
                .unwrap_or("HOLDING");
            let name = sec_name
                .or(non_empty(Some(h.security_id.as_str())))
                .or(non_empty(Some(account.name.as_str())))
                .unwrap_or("Holding");

            let value = h.institution_value.unwrap_or(0.0).abs();
            let weight = if total > 0.0 {
                round_to(value / total * 100.0, 1).unwrap_or(0.0)
            } else {
                0.0
            };

            Holding {
                symbol: symbol.to_string(),
                name: name.to_string(),
                value,
                weight,
                live_pct: live_pct(h),
                ytd_pct: None,
            }
        })
        .collect()
}

/// Unrealized gain/loss vs. cost basis, one decimal
fn live_pct(h: &RawHolding) -> Option<f64> {
    let cost_basis = h.cost_basis.filter(|c| *c > 0.0)?;
    let price = h.institution_price.unwrap_or(0.0);
    round_to((price - cost_basis) / cost_basis * 100.0, 1)
}

/// Stand-in position covering the account's whole balance
pub fn placeholder_holding(account: &RawAccount) -> Holding {
    let symbol = non_empty(account.subtype.as_deref())
        .or(non_empty(Some(account.account_type.as_str())))
        .map(|s| s.to_uppercase().chars().take(PLACEHOLDER_SYMBOL_LEN).collect())
        .unwrap_or_else(|| "ACCOUNT".to_string());

    Holding {
        symbol,
        name: non_empty(Some(account.name.as_str()))
            .unwrap_or("Holding")
            .to_string(),
        value: account.balances.current.unwrap_or(0.0).abs(),
        weight: 100.0,
        live_pct: None,
        ytd_pct: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetsync_ingest::Balances;

    fn account(account_type: &str, subtype: Option<&str>, balance: Option<f64>) -> RawAccount {
        RawAccount {
            account_id: "inv1".into(),
            name: "Brokerage".into(),
            official_name: None,
            account_type: account_type.into(),
            subtype: subtype.map(str::to_string),
            balances: Balances {
                current: balance,
                ..Default::default()
            },
            institution_name: None,
        }
    }

    fn holding(security_id: &str, value: f64, price: f64, cost_basis: Option<f64>) -> RawHolding {
        RawHolding {
            account_id: "inv1".into(),
            security_id: security_id.into(),
            institution_value: Some(value),
            institution_price: Some(price),
            cost_basis,
            quantity: None,
        }
    }

    fn security(id: &str, ticker: Option<&str>, name: Option<&str>) -> Security {
        Security {
            security_id: id.into(),
            ticker_symbol: ticker.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_weights_sum_to_100() {
        let acct = account("investment", Some("brokerage"), Some(600.0));
        let hs = [
            holding("s1", 100.0, 10.0, Some(8.0)),
            holding("s2", 200.0, 10.0, None),
            holding("s3", 300.0, 10.0, None),
        ];
        let refs: Vec<&RawHolding> = hs.iter().collect();
        let secs = [security("s1", Some("VTI"), Some("Vanguard Total"))];
        let by_id: HashMap<&str, &Security> =
            secs.iter().map(|s| (s.security_id.as_str(), s)).collect();

        let out = build_holdings(&acct, &refs, &by_id);
        assert_eq!(out.len(), 3);
        let sum: f64 = out.iter().map(|h| h.weight).sum();
        assert!((sum - 100.0).abs() <= 0.1, "weights summed to {sum}");
        assert_eq!(out[0].weight, 16.7);
        assert_eq!(out[1].weight, 33.3);
        assert_eq!(out[2].weight, 50.0);

        assert_eq!(out[0].symbol, "VTI");
        assert_eq!(out[0].name, "Vanguard Total");
        assert_eq!(out[0].live_pct, Some(25.0));
        assert!(out[0].ytd_pct.is_none());
    }

    #[test]
    fn test_equal_sixths_round_per_holding() {
        let acct = account("investment", Some("brokerage"), None);
        let hs: Vec<RawHolding> = (0..6)
            .map(|i| holding(&format!("s{i}"), 100.0, 0.0, None))
            .collect();
        let refs: Vec<&RawHolding> = hs.iter().collect();

        let out = build_holdings(&acct, &refs, &HashMap::new());
        assert!(out.iter().all(|h| h.weight == 16.7));
        // each weight rounds on its own, so the total drifts past 100
        let sum: f64 = out.iter().map(|h| h.weight).sum();
        assert!((sum - 100.2).abs() < 1e-9, "weights summed to {sum}");
    }

    #[test]
    fn test_symbol_and_name_fallbacks() {
        let acct = account("investment", Some("401k"), None);
        let hs = [holding("sec-x", -50.0, 0.0, Some(0.0))];
        let refs: Vec<&RawHolding> = hs.iter().collect();

        let out = build_holdings(&acct, &refs, &HashMap::new());
        assert_eq!(out[0].symbol, "401k");
        assert_eq!(out[0].name, "sec-x");
        assert_eq!(out[0].value, 50.0);
        assert_eq!(out[0].weight, 100.0);
        assert!(out[0].live_pct.is_none());

        let secs = [security("sec-x", None, Some("Target Date 2050"))];
        let by_id: HashMap<&str, &Security> =
            secs.iter().map(|s| (s.security_id.as_str(), s)).collect();
        let out = build_holdings(&acct, &refs, &by_id);
        assert_eq!(out[0].symbol, "Target Date 2050");
    }

    #[test]
    fn test_zero_total_gives_zero_weights() {
        let acct = account("investment", None, None);
        let hs = [holding("a", 0.0, 0.0, None), holding("b", 0.0, 0.0, None)];
        let refs: Vec<&RawHolding> = hs.iter().collect();
        let out = build_holdings(&acct, &refs, &HashMap::new());
        assert!(out.iter().all(|h| h.weight == 0.0));
        assert_eq!(out[0].symbol, "HOLDING");
    }

    #[test]
    fn test_placeholder_for_account_without_holdings() {
        let acct = account("depository", Some("money market"), Some(-1234.5));
        let out = build_holdings(&acct, &[], &HashMap::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "MONEY MA");
        assert_eq!(out[0].name, "Brokerage");
        assert_eq!(out[0].value, 1234.5);
        assert_eq!(out[0].weight, 100.0);
        assert!(out[0].live_pct.is_none() && out[0].ytd_pct.is_none());
    }

    #[test]
    fn test_placeholder_symbol_fallbacks() {
        assert_eq!(placeholder_holding(&account("credit", None, None)).symbol, "CREDIT");
        assert_eq!(placeholder_holding(&account("", None, None)).symbol, "ACCOUNT");
        assert_eq!(placeholder_holding(&account("", None, None)).value, 0.0);
    }
}
