//! Drop-target resolution.

use crate::deal::{Deal, DealId};
use crate::stage::Stage;

const COLUMN_PREFIX: &str = "column:";
const CARD_PREFIX: &str = "card:";

/// What a drag was released over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// A stage column.
    Column(Stage),
    /// Another deal card.
    Card(DealId),
}

impl DropTarget {
    /// Parses a drop token.
    ///
    /// Accepts `column:<stage>`, `card:<deal id>`, or a bare canonical stage id
    /// (column). Any other non-empty token is taken as a card id. Column tokens
    /// naming no canonical stage, and empty tokens, parse to `None`.
    pub fn parse(token: &str) -> Option<DropTarget> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        if let Some(stage) = token.strip_prefix(COLUMN_PREFIX) {
            return Stage::from_canonical(stage).map(DropTarget::Column);
        }
        if let Some(id) = token.strip_prefix(CARD_PREFIX) {
            if id.is_empty() {
                return None;
            }
            return Some(DropTarget::Card(DealId::new(id)));
        }

        match Stage::from_canonical(token) {
            Some(stage) => Some(DropTarget::Column(stage)),
            None => Some(DropTarget::Card(DealId::new(token))),
        }
    }

    /// Token form accepted by [`DropTarget::parse`].
    pub fn token(&self) -> String {
        match self {
            DropTarget::Column(stage) => format!("{COLUMN_PREFIX}{stage}"),
            DropTarget::Card(id) => format!("{CARD_PREFIX}{id}"),
        }
    }
}

/// Stage implied by dropping onto `token`, given the current deals.
///
/// Dropping on a card means dropping into that card's column. Returns `None`
/// when the token is unusable or names a card that is no longer on the board;
/// callers treat that as a no-op.
pub fn resolve_drop_target(token: &str, deals: &[Deal]) -> Option<Stage> {
    match DropTarget::parse(token)? {
        DropTarget::Column(stage) => Some(stage),
        DropTarget::Card(id) => deals.iter().find(|deal| deal.id == id).map(|deal| deal.stage),
    }
}
