//! Categorization pipeline: remote labels per index when available, the
//! deterministic rules otherwise.

use budgetsync_core::{clean_name, Transaction};
use tracing::{debug, warn};

use crate::ai_classifier::{BatchClassifier, BatchLabels};
use crate::category_rules;
use crate::draft::TransactionDraft;

pub struct Categorizer<C> {
    classifier: C,
}

impl<C: BatchClassifier> Categorizer<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Categorize a batch. Output is 1:1 and in input order.
    ///
    /// Any classifier failure is logged and treated as "no remote labels".
    pub async fn categorize(&self, drafts: Vec<TransactionDraft>) -> Vec<Transaction> {
        let labels = match self.classifier.classify_batch(&drafts).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "falling back to rule-based categorization");
                None
            }
        };
        debug!(
            count = drafts.len(),
            remote = labels.is_some(),
            "categorizing transactions"
        );
        merge(drafts, labels)
    }
}

/// Combine remote labels with the rule-based result, index by index.
pub fn merge(drafts: Vec<TransactionDraft>, labels: Option<BatchLabels>) -> Vec<Transaction> {
    let mut labels = labels.unwrap_or_default().into_iter();

    drafts
        .into_iter()
        .map(|draft| {
            let label = labels.next().flatten();
            let (category, display_name) = match label {
                Some(l) => (l.category, l.display_name),
                None => (category_rules::classify(&draft), clean_name(&draft.name)),
            };

            Transaction {
                id: draft.id,
                account_id: draft.account_id,
                name: draft.name,
                display_name,
                amount: draft.amount,
                date: draft.date,
                pending: draft.pending,
                account: draft.account,
                include_in_budget: draft.include_in_budget,
                category,
                category_label: category.label().to_string(),
                category_icon: category.icon().to_string(),
                reimbursable: 0.0,
                linked_deposit: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_classifier::{AiLabel, Offline};
    use anyhow::{anyhow, Result};
    use budgetsync_core::{AccountKind, Category};
    use chrono::NaiveDate;

    fn draft(id: &str, name: &str) -> TransactionDraft {
        TransactionDraft {
            id: id.into(),
            account_id: "a1".into(),
            name: name.into(),
            merchant_name: None,
            amount: 4.75,
            date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            pending: false,
            account: AccountKind::Credit,
            include_in_budget: true,
            hints: Default::default(),
        }
    }

    struct Failing;

    impl BatchClassifier for Failing {
        async fn classify_batch(&self, _d: &[TransactionDraft]) -> Result<Option<BatchLabels>> {
            Err(anyhow!("network down"))
        }
    }

    struct Partial;

    impl BatchClassifier for Partial {
        async fn classify_batch(&self, d: &[TransactionDraft]) -> Result<Option<BatchLabels>> {
            let mut out: BatchLabels = vec![None; d.len()];
            out[1] = Some(AiLabel {
                category: Category::Subscription,
                display_name: "Spotify".into(),
            });
            Ok(Some(out))
        }
    }

    #[tokio::test]
    async fn test_offline_uses_rules() {
        let out = Categorizer::new(Offline)
            .categorize(vec![draft("t1", "STARBUCKS STORE 0123")])
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, Category::Dining);
        assert_eq!(out[0].category_label, "Dining");
        assert_eq!(out[0].category_icon, "🍽️");
        assert_eq!(out[0].display_name, "Starbucks Store");
        assert_eq!(out[0].reimbursable, 0.0);
        assert!(out[0].linked_deposit.is_none());
    }

    #[tokio::test]
    async fn test_classifier_failure_is_absorbed() {
        let out = Categorizer::new(Failing)
            .categorize(vec![draft("t1", "SHELL OIL 5541"), draft("t2", "ZZZ")])
            .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].category, Category::Transportation);
        assert_eq!(out[1].category, Category::Other);
    }

    #[tokio::test]
    async fn test_partial_labels_merge_per_index() {
        let drafts = vec![
            draft("t1", "KROGER 0042"),
            draft("t2", "SPOTIFY USA"),
            draft("t3", "AMC 1234"),
        ];
        let out = Categorizer::new(Partial).categorize(drafts).await;
        let ids: Vec<&str> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(out[0].category, Category::Groceries);
        assert_eq!(out[1].category, Category::Subscription);
        assert_eq!(out[1].display_name, "Spotify");
        assert_eq!(out[2].category, Category::Entertainment);
        assert_eq!(out[2].display_name, "AMC");
    }

    #[test]
    fn test_merge_with_short_label_list_keeps_length() {
        let drafts = vec![draft("t1", "A"), draft("t2", "B")];
        let out = merge(drafts, Some(vec![None]));
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        assert!(Categorizer::new(Offline).categorize(vec![]).await.is_empty());
    }
}
