//! Write coalescing and identifier reconciliation for plan rows.

pub mod coalescer;
pub mod identifier;

pub use coalescer::WriteCoalescer;
pub use identifier::{IdMinter, PlanItemId, Reconciler, TEMPORARY_PREFIX};
