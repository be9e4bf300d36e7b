//! Pure budget logic computed from store snapshots.

pub mod category_matching;
pub mod metrics;
pub mod transaction_table;

pub use category_matching::{CategoryMatcher, ExactMatcher, SubstringMatcher};
pub use metrics::{BudgetSummary, CategorySpend, MetricsEngine, Totals};
pub use transaction_table::{AmountFormat, TransactionTable, TransactionTableConfig};
