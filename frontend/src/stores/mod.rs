pub mod plan_store;
pub mod transaction_store;

pub use plan_store::{PlanEdit, PlanItem, PlanStore, SyncState, NEW_ROW_CATEGORY};
pub use transaction_store::{parse_amount_input, validate_transaction, TransactionStore};
