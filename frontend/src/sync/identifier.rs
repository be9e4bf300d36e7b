//! Plan row identity: temporary local ids, permanent server ids, and the
//! reconciliation that swaps one for the other.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Display prefix of temporary identifiers
pub const TEMPORARY_PREFIX: &str = "tmp-";

/// Identifier of a plan row.
///
/// Whether a row exists on the server is encoded in the variant, so the
/// create-vs-update decision is a match on the id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanItemId {
    /// Minted locally, never persisted
    Temporary(u64),
    /// Assigned by the server
    Permanent(String),
}

impl PlanItemId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, PlanItemId::Temporary(_))
    }

    pub fn as_permanent(&self) -> Option<&str> {
        match self {
            PlanItemId::Permanent(id) => Some(id),
            PlanItemId::Temporary(_) => None,
        }
    }
}

impl fmt::Display for PlanItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanItemId::Temporary(local) => write!(f, "{}{}", TEMPORARY_PREFIX, local),
            PlanItemId::Permanent(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for PlanItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s
            .strip_prefix(TEMPORARY_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(PlanItemId::Temporary)
            .unwrap_or_else(|| PlanItemId::Permanent(s.to_string()));
        Ok(parsed)
    }
}

/// Session-unique source of temporary identifiers
#[derive(Debug)]
pub struct IdMinter {
    next: AtomicU64,
}

impl IdMinter {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn mint(&self) -> PlanItemId {
        PlanItemId::Temporary(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdMinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Swaps temporary ids for server ids in place and remembers the mapping, so
/// anything still holding the old temporary id (a UI handle, an armed timer)
/// resolves to the same row afterwards.
#[derive(Debug, Default)]
pub struct Reconciler {
    forwarded: HashMap<u64, String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a reconciled temporary id to its permanent id
    pub fn resolve(&self, id: &PlanItemId) -> PlanItemId {
        match id {
            PlanItemId::Temporary(local) => match self.forwarded.get(local) {
                Some(server_id) => PlanItemId::Permanent(server_id.clone()),
                None => id.clone(),
            },
            PlanItemId::Permanent(_) => id.clone(),
        }
    }

    /// Replace the temporary id held in `slot` with `server_id`.
    ///
    /// Returns the new permanent id, or `None` when `slot` was already
    /// permanent (nothing is changed in that case).
    pub fn reconcile(&mut self, slot: &mut PlanItemId, server_id: String) -> Option<PlanItemId> {
        let PlanItemId::Temporary(local) = *slot else {
            return None;
        };
        info!("🔁 Reconciled plan row {}{} -> {}", TEMPORARY_PREFIX, local, server_id);
        self.forwarded.insert(local, server_id.clone());
        *slot = PlanItemId::Permanent(server_id);
        Some(slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_ids_are_unique_and_temporary() {
        let minter = IdMinter::new();
        let a = minter.mint();
        let b = minter.mint();
        assert_ne!(a, b);
        assert!(a.is_temporary() && b.is_temporary());
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(PlanItemId::Temporary(7).to_string(), "tmp-7");
        assert_eq!("tmp-7".parse::<PlanItemId>().unwrap(), PlanItemId::Temporary(7));
        assert_eq!(
            "b3c1".parse::<PlanItemId>().unwrap(),
            PlanItemId::Permanent("b3c1".to_string())
        );
        // Not a counter, so it can only be a server id
        assert_eq!(
            "tmp-abc".parse::<PlanItemId>().unwrap(),
            PlanItemId::Permanent("tmp-abc".to_string())
        );
    }

    #[test]
    fn test_reconcile_swaps_in_place_and_forwards() {
        let mut reconciler = Reconciler::new();
        let mut slot = PlanItemId::Temporary(3);

        let permanent = reconciler.reconcile(&mut slot, "srv-9".to_string());
        assert_eq!(permanent, Some(PlanItemId::Permanent("srv-9".to_string())));
        assert_eq!(slot, PlanItemId::Permanent("srv-9".to_string()));
        assert_eq!(
            reconciler.resolve(&PlanItemId::Temporary(3)),
            PlanItemId::Permanent("srv-9".to_string())
        );
        assert_eq!(reconciler.resolve(&PlanItemId::Temporary(4)), PlanItemId::Temporary(4));
    }

    #[test]
    fn test_reconcile_ignores_permanent_slot() {
        let mut reconciler = Reconciler::new();
        let mut slot = PlanItemId::Permanent("srv-1".to_string());
        assert_eq!(reconciler.reconcile(&mut slot, "srv-2".to_string()), None);
        assert_eq!(slot, PlanItemId::Permanent("srv-1".to_string()));
    }
}
