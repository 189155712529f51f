//! Stage confirmation: asking the backend to persist a stage move.
//!
//! The board controller talks to the backend only through
//! [`StageConfirmer`]. [`RestStageConfirmer`] speaks to a PostgREST-style
//! table endpoint; [`MemoryConfirmer`] replays scripted answers.

mod memory;
mod rest;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::deal::DealId;
use crate::stage::Stage;

pub use memory::{ConfirmCall, MemoryConfirmer, ScriptedReply};
pub use rest::RestStageConfirmer;

/// Successful confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageConfirmation {
    /// Server-side `updated_at` after the write, if the backend returned it.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Why a stage move was not confirmed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    /// The backend refused the change.
    #[error("Stage change rejected: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// The request never got a usable answer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No answer within the configured confirmation timeout.
    #[error("Confirmation timed out after {0:?}")]
    TimedOut(Duration),
}

impl ConfirmError {
    pub fn rejected(message: impl Into<String>) -> Self {
        ConfirmError::Rejected {
            message: Some(message.into()),
        }
    }

    /// Text to show the user: the backend's own message when it sent a
    /// non-blank one, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ConfirmError::Rejected {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Backend endpoint that persists a deal's stage.
///
/// Implementations must be idempotent for repeated calls with the same
/// `(deal_id, stage)`.
#[async_trait]
pub trait StageConfirmer: Send + Sync {
    async fn confirm_stage(
        &self,
        deal_id: &DealId,
        stage: Stage,
    ) -> Result<StageConfirmation, ConfirmError>;
}
