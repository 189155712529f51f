//! Realtime change feed for the deals table.
//!
//! The backend pushes one JSON message per row change:
//!
//! ```json
//! {"eventType": "UPDATE", "new": {"id": "d1", "title": "Renewal"}, "old": {"id": "d1"}}
//! ```
//!
//! Events are filtered to the board's tenant scope and turned into
//! [`RemoteAction`]s for the board store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::RemoteAction;
use crate::deal::{Deal, DealPatch, DealRow};
use crate::error::BoardResult;

/// One row change pushed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum FeedEvent {
    Insert {
        new: DealRow,
    },
    Update {
        new: DealRow,
        /// Prior row image; often `{}` unless the table replicates full rows.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old: Option<serde_json::Value>,
    },
    Delete {
        old: DealRow,
    },
}

impl FeedEvent {
    /// Decodes one feed message.
    pub fn from_json(payload: &str) -> BoardResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The row the event is about.
    pub fn row(&self) -> &DealRow {
        match self {
            FeedEvent::Insert { new } | FeedEvent::Update { new, .. } => new,
            FeedEvent::Delete { old } => old,
        }
    }

    /// Store action for this event. Inserted rows are classified here.
    pub fn into_action(self, received_at: DateTime<Utc>) -> RemoteAction {
        match self {
            FeedEvent::Insert { new } => RemoteAction::Insert(Deal::from_row(&new, received_at)),
            FeedEvent::Update { new, .. } => RemoteAction::Update {
                patch: DealPatch::from_row(&new),
                deal_id: new.id,
            },
            FeedEvent::Delete { old } => RemoteAction::Delete(old.id),
        }
    }
}

/// Which rows belong to this board's tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum FeedScope {
    /// Every row the subscription delivers.
    #[default]
    All,
    /// Rows of one team.
    Team(String),
    /// Rows owned by one user.
    Owner(String),
}

impl FeedScope {
    /// Whether the event belongs to this scope.
    ///
    /// Rows that omit the scoping column are admitted: minimal delete payloads
    /// carry only the key, and deleting an unknown id is a no-op anyway.
    pub fn admits(&self, event: &FeedEvent) -> bool {
        let row = event.row();
        match self {
            FeedScope::All => true,
            FeedScope::Team(team) => row.team_id.as_ref().map_or(true, |id| id == team),
            FeedScope::Owner(owner) => row.user_id.as_ref().map_or(true, |id| id == owner),
        }
    }
}
