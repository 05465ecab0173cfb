//! Deterministic category rules: merchant keywords first, then the
//! aggregator's own category hints.
//!
//! Works fully offline and is the fallback whenever the remote classifier
//! has nothing to say.

use budgetsync_core::Category;

use crate::draft::TransactionDraft;

/// Categorize one transaction.
/// Priority: name/merchant keywords > upstream hints > `Other`.
///
/// Keyword tables are scanned in `Category::ALL` order and the first
/// category with any substring hit wins, so "ubereats" lands in dining
/// before transportation's "uber" is ever tried.
pub fn classify(txn: &TransactionDraft) -> Category {
    let haystack = format!(
        "{} {}",
        txn.name,
        txn.merchant_name.as_deref().unwrap_or("")
    )
    .to_lowercase();

    for category in Category::ALL {
        if category.keywords().iter().any(|k| haystack.contains(k)) {
            return category;
        }
    }

    txn.hints
        .in_order()
        .map(Category::normalize)
        .find(|c| *c != Category::Other)
        .unwrap_or(Category::Other)
}
