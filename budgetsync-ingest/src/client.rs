use chrono::NaiveDate;
use std::future::Future;

use crate::error::UpstreamError;
use crate::types::{InvestmentHoldings, Liabilities, RawAccount, RawTransaction};

/// Read-only view of one linked item at the banking-data aggregator.
///
/// Every call may fail with a coded [`UpstreamError`]; callers decide which
/// codes mean "unsupported", "not ready yet" or fatal.
pub trait BankingData {
    /// All transactions dated within `[start, end]`, inclusive.
    fn get_transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RawTransaction>, UpstreamError>> + Send;

    fn get_accounts(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<RawAccount>, UpstreamError>> + Send;

    fn get_investment_holdings(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<InvestmentHoldings, UpstreamError>> + Send;

    fn get_liabilities(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Liabilities, UpstreamError>> + Send;
}
