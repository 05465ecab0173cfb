//! budgetsync-finance: categorization, retry policy, liability and holdings
//! reconciliation, and the sync service that ties them together

pub mod ai_classifier;
pub mod assembler;
pub mod category_rules;
pub mod draft;
pub mod error;
pub mod holdings;
pub mod liabilities;
pub mod pipeline;
pub mod retry;

pub use ai_classifier::{AiLabel, BatchClassifier, BatchLabels, Offline, OpenAiClassifier, OpenAiConfig};
pub use assembler::{SyncOptions, SyncPayload, SyncRequest, SyncService};
pub use category_rules::classify;
pub use draft::{CategoryHints, TransactionDraft};
pub use error::{SyncError, SyncFailure};
pub use liabilities::{build_liability_index, LiabilityIndex};
pub use pipeline::Categorizer;
pub use retry::{with_retry, RetryPolicy};
