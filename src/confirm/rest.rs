//! Stage confirmation over a PostgREST-style HTTP API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ConfirmError, StageConfirmation, StageConfirmer};
use crate::config::RestConfig;
use crate::deal::DealId;
use crate::error::BoardResult;
use crate::stage::Stage;

#[derive(Debug, Deserialize)]
struct UpdatedRow {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Patches the deal row's `stage` column and reads back `updated_at`.
#[derive(Debug, Clone)]
pub struct RestStageConfirmer {
    client: Client,
    config: RestConfig,
}

impl RestStageConfirmer {
    pub fn new(config: RestConfig) -> BoardResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: RestConfig) -> Self {
        Self { client, config }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }
}

#[async_trait]
impl StageConfirmer for RestStageConfirmer {
    async fn confirm_stage(
        &self,
        deal_id: &DealId,
        stage: Stage,
    ) -> Result<StageConfirmation, ConfirmError> {
        let response = self
            .client
            .patch(self.table_url())
            .query(&[("id", format!("eq.{deal_id}"))])
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Prefer", "return=representation")
            .json(&json!({ "stage": stage }))
            .send()
            .await
            .map_err(|err| ConfirmError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ConfirmError::Transport(err.to_string()))?;
        debug!(deal_id = %deal_id, %stage, %status, "Stage confirmation response");

        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        // `return=representation` answers with the updated rows; an empty
        // array means the filter (or row-level security) matched nothing.
        let rows: Vec<UpdatedRow> = if body.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&body).map_err(|err| ConfirmError::Transport(err.to_string()))?
        };
        match rows.into_iter().next() {
            Some(row) => Ok(StageConfirmation {
                updated_at: row.updated_at,
            }),
            None => Err(ConfirmError::rejected("Deal not found")),
        }
    }
}

fn rejection(status: StatusCode, body: &str) -> ConfirmError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    match parsed.message.or(parsed.error) {
        Some(message) => ConfirmError::rejected(message),
        None if status.is_server_error() => ConfirmError::Transport(status.to_string()),
        None => ConfirmError::Rejected { message: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reads_message_or_error_field() {
        assert_eq!(
            rejection(StatusCode::BAD_REQUEST, r#"{"message": "invalid stage"}"#),
            ConfirmError::rejected("invalid stage")
        );
        assert_eq!(
            rejection(StatusCode::FORBIDDEN, r#"{"error": "Stage update failed"}"#),
            ConfirmError::rejected("Stage update failed")
        );
    }

    #[test]
    fn test_rejection_without_message() {
        assert_eq!(
            rejection(StatusCode::BAD_GATEWAY, "<html>"),
            ConfirmError::Transport("502 Bad Gateway".to_string())
        );
        assert_eq!(
            rejection(StatusCode::CONFLICT, ""),
            ConfirmError::Rejected { message: None }
        );
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let confirmer = RestStageConfirmer::with_client(
            Client::new(),
            RestConfig {
                base_url: "http://localhost:54321/".to_string(),
                api_key: "anon".to_string(),
                table: "deals".to_string(),
            },
        );
        assert_eq!(confirmer.table_url(), "http://localhost:54321/rest/v1/deals");
    }
}
