//! Deal records as held on the board, plus their wire forms.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::{classify_stage, Stage};

/// Currency assumed when a row carries none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Identifier of a deal row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DealId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DealId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One sales opportunity as shown on the board.
///
/// `stage` is always canonical: rows enter through [`Deal::from_row`], which
/// runs the stage classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub title: String,
    pub value: f64,
    pub currency: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Create a deal with default currency and no owner references.
    pub fn new(
        id: impl Into<DealId>,
        title: impl Into<String>,
        value: f64,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            value,
            currency: DEFAULT_CURRENCY.to_string(),
            stage,
            owner_id: None,
            team_id: None,
            contact_id: None,
            updated_at,
        }
    }

    /// Builds a deal from a backend row.
    ///
    /// The raw stage label is classified; missing timestamps fall back to
    /// `created_at`, then to `received_at`.
    pub fn from_row(row: &DealRow, received_at: DateTime<Utc>) -> Self {
        Self {
            id: row.id.clone(),
            title: row.title.clone().unwrap_or_default(),
            value: row.value.unwrap_or(0.0),
            currency: row
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            stage: classify_stage(row.stage.as_deref()),
            owner_id: row.user_id.clone(),
            team_id: row.team_id.clone(),
            contact_id: row.contact_id.clone(),
            updated_at: row.updated_at.or(row.created_at).unwrap_or(received_at),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Applies the fields present in `patch`. Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &DealPatch) -> bool {
        let before = self.clone();
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
        *self != before
    }
}

/// Deal row as the backend and the realtime feed send it.
///
/// Every column except `id` may be absent: update events carry only the
/// changed columns, delete events often only the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealRow {
    pub id: DealId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Raw stage label, not yet classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update to a deal: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealPatch {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub stage: Option<Stage>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DealPatch {
    /// Extracts the updatable fields present in a row, classifying the stage.
    pub fn from_row(row: &DealRow) -> Self {
        Self {
            title: row.title.clone(),
            value: row.value,
            stage: row.stage.as_deref().map(|raw| classify_stage(Some(raw))),
            updated_at: row.updated_at,
        }
    }

    /// The patch with its stage and timestamp removed.
    pub fn without_stage(&self) -> Self {
        Self {
            title: self.title.clone(),
            value: self.value,
            stage: None,
            updated_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.value.is_none()
            && self.stage.is_none()
            && self.updated_at.is_none()
    }
}
