//! budgetsync-core: category taxonomy, display-name cleanup and the
//! normalized transaction/account shapes shared by every crate

pub mod finance;
pub mod text;

pub use finance::{
    is_liability_type, round_to, Account, AccountKind, Category, Holding, LiabilityDetail,
    Transaction,
};
pub use text::{clean_name, PLACEHOLDER_NAME};
