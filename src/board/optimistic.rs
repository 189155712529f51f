//! Optimistic stage mutation over the shared deal list.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::deal::{Deal, DealId};
use crate::stage::Stage;

/// Immutable deal list shared between the store and its readers.
pub type DealList = Arc<Vec<Deal>>;

/// Moves one deal to `stage`, stamping it with `at`.
///
/// Returns the input list itself (same allocation) when the deal is missing
/// or already in `stage`, so readers can skip work with [`Arc::ptr_eq`].
/// Otherwise returns a new list where only the matching deal differs.
pub fn apply_stage_change(
    deals: &DealList,
    deal_id: &DealId,
    stage: Stage,
    at: DateTime<Utc>,
) -> DealList {
    let Some(index) = deals.iter().position(|deal| &deal.id == deal_id) else {
        return Arc::clone(deals);
    };
    if deals[index].stage == stage {
        return Arc::clone(deals);
    }

    let mut next = Vec::clone(deals);
    let moved = &mut next[index];
    moved.stage = stage;
    moved.updated_at = at;
    Arc::new(next)
}
