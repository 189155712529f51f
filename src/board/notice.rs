//! User-facing notices raised by the board.

use serde::Serialize;

use crate::deal::DealId;
use crate::stage::Stage;

/// Transient user-facing message raised by the board (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardNotice {
    pub deal_id: DealId,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A stage move failed and the card went back to `restored`.
    StageRolledBack { attempted: Stage, restored: Stage },
}
