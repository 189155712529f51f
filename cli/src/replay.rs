//! `replay` subcommand
//!
//! Runs a scripted board session against an in-memory confirmer. A script is
//! a JSON document:
//!
//! ```json
//! {
//!   "deals": [{"id": "d1", "title": "Renewal", "value": 1200, "stage": "Potansiyel"}],
//!   "steps": [
//!     {"drop": {"deal": "d1", "over": "column:proposal", "reply": {"reject": {"message": "Stage update failed"}}}},
//!     {"move": {"deal": "d1", "stage": "Kazanıldı"}},
//!     {"feed": {"eventType": "UPDATE", "new": {"id": "d1", "title": "Renewal 2025"}}}
//!   ]
//! }
//! ```
//!
//! Every stage move is settled before the next step runs.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use dealboard::board::{
    BoardColumns, BoardController, BoardNotice, BoardStats, ConfirmOutcome, DragOutcome,
    Reduction,
};
use dealboard::config::BoardConfig;
use dealboard::confirm::{MemoryConfirmer, ScriptedReply, StageConfirmer};
use dealboard::deal::{DealId, DealRow};
use dealboard::feed::{FeedEvent, FeedScope};
use dealboard::stage::classify_stage;

use crate::render;

/// Arguments for the replay subcommand
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Replay script (JSON)
    pub script: PathBuf,

    /// Board configuration file (TOML); DEALBOARD_* variables still apply
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub scope: FeedScope,
    pub deals: Vec<DealRow>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Drag `deal` and release it over a drop token.
    Drop {
        deal: DealId,
        over: String,
        #[serde(default)]
        reply: Option<ScriptedReply>,
    },
    /// Move without a drag; `stage` may be any known label.
    Move {
        deal: DealId,
        stage: String,
        #[serde(default)]
        reply: Option<ScriptedReply>,
    },
    Feed(FeedEvent),
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: String,
    pub deal_id: DealId,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub notices: Vec<BoardNotice>,
    pub board: BoardColumns,
    pub stats: BoardStats,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let config =
        BoardConfig::load(args.config.as_deref()).context("Failed to load board configuration")?;
    let raw = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid replay script {}", args.script.display()))?;

    let report = execute(script, config).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }
    Ok(())
}

pub async fn execute(script: Script, config: BoardConfig) -> ReplayReport {
    let confirmer = Arc::new(MemoryConfirmer::accepting());
    let shared: Arc<dyn StageConfirmer> = confirmer.clone();
    let (board, mut handles) = BoardController::from_rows(&script.deals, shared, config);
    let board = board.with_scope(script.scope);

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.into_iter().enumerate() {
        let number = index + 1;
        let report = match step {
            Step::Drop { deal, over, reply } => {
                if let Some(reply) = reply {
                    confirmer.push_reply(reply);
                }
                let outcome = board.drop_deal(&deal, &over).await;
                settle(number, format!("drop over {over}"), deal, outcome, &confirmer).await
            }
            Step::Move { deal, stage, reply } => {
                let stage = classify_stage(Some(&stage));
                if let Some(reply) = reply {
                    confirmer.push_reply(reply);
                }
                let outcome = board.move_deal(&deal, stage).await;
                settle(number, format!("move to {stage}"), deal, outcome, &confirmer).await
            }
            Step::Feed(event) => {
                let deal_id = event.row().id.clone();
                let action = format!("feed {}", event_label(&event));
                let reduction = board.apply_feed_event(event).await;
                StepReport {
                    step: number,
                    action,
                    deal_id,
                    outcome: reduction_label(reduction),
                    message: None,
                }
            }
        };
        steps.push(report);
    }

    let mut notices = Vec::new();
    while let Ok(notice) = handles.notices.try_recv() {
        notices.push(notice);
    }

    ReplayReport {
        steps,
        notices,
        board: board.columns().await,
        stats: board.stats().await,
    }
}

async fn settle(
    step: usize,
    action: String,
    deal_id: DealId,
    outcome: DragOutcome,
    confirmer: &MemoryConfirmer,
) -> StepReport {
    let (outcome, message) = match outcome {
        DragOutcome::Pending(pending) => match pending.settled().await {
            ConfirmOutcome::Confirmed => ("confirmed", None),
            ConfirmOutcome::RolledBack { message } => ("rolled_back", Some(message)),
            ConfirmOutcome::Superseded { message } => ("superseded", Some(message)),
            ConfirmOutcome::Discarded => ("discarded", None),
        },
        other => {
            // No request went out, so the scripted reply belongs to nobody.
            confirmer.clear_replies();
            (drag_label(&other), None)
        }
    };

    StepReport {
        step,
        action,
        deal_id,
        outcome,
        message,
    }
}

fn drag_label(outcome: &DragOutcome) -> &'static str {
    match outcome {
        DragOutcome::Started => "started",
        DragOutcome::Cancelled => "cancelled",
        DragOutcome::Ignored => "ignored",
        DragOutcome::Unresolved => "unresolved",
        DragOutcome::Unchanged => "unchanged",
        DragOutcome::Busy => "busy",
        DragOutcome::Pending(_) => "pending",
    }
}

fn reduction_label(reduction: Reduction) -> &'static str {
    match reduction {
        Reduction::Changed => "changed",
        Reduction::Unchanged => "unchanged",
        Reduction::Busy => "busy",
        Reduction::Stale => "stale",
        Reduction::Superseded => "superseded",
    }
}

fn event_label(event: &FeedEvent) -> &'static str {
    match event {
        FeedEvent::Insert { .. } => "insert",
        FeedEvent::Update { .. } => "update",
        FeedEvent::Delete { .. } => "delete",
    }
}
