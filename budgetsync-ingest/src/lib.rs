//! budgetsync-ingest: aggregator wire types, coded upstream errors and the
//! banking-data client.

pub mod client;
pub mod error;
pub mod plaid;
pub mod types;

pub use client::BankingData;
pub use error::UpstreamError;
pub use plaid::{Environment, PlaidClient};
pub use types::{
    Balances, InvestmentHoldings, Liabilities, PersonalFinanceCategory, RawAccount, RawHolding,
    RawTransaction, Security, TransactionsPage,
};
