//! In-process confirmer answering from a script.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConfirmError, StageConfirmation, StageConfirmer};
use crate::deal::DealId;
use crate::stage::Stage;

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedReply {
    Confirm {
        #[serde(default)]
        updated_at: Option<DateTime<Utc>>,
    },
    Reject {
        #[serde(default)]
        message: Option<String>,
    },
    TransportFailure,
    /// Never answers.
    Hang,
}

impl ScriptedReply {
    pub fn confirm() -> Self {
        ScriptedReply::Confirm { updated_at: None }
    }

    pub fn confirm_at(updated_at: DateTime<Utc>) -> Self {
        ScriptedReply::Confirm {
            updated_at: Some(updated_at),
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        ScriptedReply::Reject {
            message: Some(message.into()),
        }
    }
}

/// A recorded `confirm_stage` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmCall {
    pub deal_id: DealId,
    pub stage: Stage,
}

/// Confirmer that pops replies from a queue, falling back to a default reply
/// once the queue is empty.
#[derive(Debug)]
pub struct MemoryConfirmer {
    replies: Mutex<VecDeque<ScriptedReply>>,
    default_reply: ScriptedReply,
    delay: Duration,
    calls: Mutex<Vec<ConfirmCall>>,
}

impl MemoryConfirmer {
    /// Confirmer that accepts every move without a server timestamp.
    pub fn accepting() -> Self {
        Self::with_default(ScriptedReply::confirm())
    }

    pub fn with_default(default_reply: ScriptedReply) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Wait `delay` before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a reply for the next unanswered call.
    pub fn push_reply(&self, reply: ScriptedReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Drop queued replies that no call consumed.
    pub fn clear_replies(&self) -> usize {
        self.replies
            .lock()
            .map(|mut replies| replies.drain(..).count())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<ConfirmCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> ScriptedReply {
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MemoryConfirmer {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl StageConfirmer for MemoryConfirmer {
    async fn confirm_stage(
        &self,
        deal_id: &DealId,
        stage: Stage,
    ) -> Result<StageConfirmation, ConfirmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ConfirmCall {
                deal_id: deal_id.clone(),
                stage,
            });
        }
        let reply = self.next_reply();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match reply {
            ScriptedReply::Confirm { updated_at } => Ok(StageConfirmation { updated_at }),
            ScriptedReply::Reject { message } => Err(ConfirmError::Rejected { message }),
            ScriptedReply::TransportFailure => {
                Err(ConfirmError::Transport("scripted transport failure".to_string()))
            }
            ScriptedReply::Hang => std::future::pending().await,
        }
    }
}
