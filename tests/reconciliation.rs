//! End-to-end reconciliation behaviour of the board controller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use dealboard::board::{
    apply_stage_change, resolve_drop_target, BoardController, BoardHandles, ConfirmOutcome,
    DragEvent, DragOutcome, NoticeKind, Reduction,
};
use dealboard::config::BoardConfig;
use dealboard::confirm::{MemoryConfirmer, ScriptedReply};
use dealboard::deal::{Deal, DealId, DealRow};
use dealboard::feed::FeedEvent;
use dealboard::stage::{classify_stage, Stage, STAGE_SYNONYMS};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn seed() -> Vec<Deal> {
    vec![
        Deal::new("d1", "Warehouse racking", 12_000.0, Stage::Lead, at(0)),
        Deal::new("d2", "Fleet telematics", 48_000.0, Stage::Won, at(10)),
        Deal::new("d3", "Office fit-out", 7_500.0, Stage::Negotiation, at(20)),
    ]
}

fn board_with(confirmer: Arc<MemoryConfirmer>) -> (BoardController, BoardHandles) {
    BoardController::new(seed(), confirmer, BoardConfig::default())
}

fn d1() -> DealId {
    DealId::new("d1")
}

#[tokio::test]
async fn test_scenario_a_optimistic_move_visible_before_response() {
    let confirmer = Arc::new(MemoryConfirmer::with_default(ScriptedReply::Hang));
    let (board, handles) = board_with(Arc::clone(&confirmer));

    let outcome = board.drop_deal(&d1(), "column:proposal").await;

    assert!(outcome.is_pending());
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Proposal);
    assert_eq!(handles.board.borrow()[0].stage, Stage::Proposal);
    assert_eq!(board.columns().await.stage_of("d1"), Some(Stage::Proposal));
    assert!(board.is_pending(&d1()).await);
}

#[tokio::test]
async fn test_scenario_b_rejection_rolls_back_with_backend_message() {
    let confirmer = Arc::new(MemoryConfirmer::accepting().with_delay(Duration::from_millis(20)));
    confirmer.push_reply(ScriptedReply::reject("Stage update failed"));
    let (board, mut handles) = board_with(Arc::clone(&confirmer));
    let before = board.snapshot().await;

    let pending = board
        .drop_deal(&d1(), "column:proposal")
        .await
        .into_pending()
        .expect("pending confirmation");
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Proposal);

    let outcome = pending.settled().await;

    match outcome {
        ConfirmOutcome::RolledBack { message } => assert!(message.contains("Stage update failed")),
        other => panic!("expected rollback, got {other:?}"),
    }
    let restored = board.deal(&d1()).await.unwrap();
    assert_eq!(restored.stage, Stage::Lead);
    assert_eq!(restored.updated_at, at(0));
    assert_eq!(board.snapshot().await.as_ref(), before.as_ref());

    let notice = handles.notices.recv().await.expect("notice");
    assert!(notice.message.contains("Stage update failed"));
    assert_eq!(
        notice.kind,
        NoticeKind::StageRolledBack {
            attempted: Stage::Proposal,
            restored: Stage::Lead,
        }
    );
    assert_eq!(
        confirmer.calls().iter().map(|c| c.stage).collect::<Vec<_>>(),
        vec![Stage::Proposal]
    );
}

#[tokio::test]
async fn test_scenario_c_title_only_update_keeps_stage() {
    let (board, _handles) = board_with(Arc::new(MemoryConfirmer::accepting()));

    let reduction = board
        .apply_feed_payload(
            r#"{"eventType": "UPDATE", "new": {"id": "d1", "title": "Warehouse racking (phase 2)"}, "old": {}}"#,
        )
        .await
        .expect("payload");

    assert_eq!(reduction, Reduction::Changed);
    let deal = board.deal(&d1()).await.unwrap();
    assert_eq!(deal.title, "Warehouse racking (phase 2)");
    assert_eq!(deal.stage, Stage::Lead);
    assert_eq!(deal.updated_at, at(0));
}

#[tokio::test]
async fn test_scenario_d_drop_on_card_takes_its_stage() {
    let deals = seed();
    assert_eq!(resolve_drop_target("card:d2", &deals), Some(Stage::Won));

    let confirmer = Arc::new(MemoryConfirmer::accepting());
    let (board, _handles) = board_with(Arc::clone(&confirmer));
    let pending = board
        .drop_deal(&d1(), "card:d2")
        .await
        .into_pending()
        .expect("pending");
    assert_eq!(pending.target, Stage::Won);
    assert_eq!(pending.settled().await, ConfirmOutcome::Confirmed);
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Won);
}

#[test]
fn test_scenario_e_turkish_and_legacy_labels_agree() {
    assert_eq!(classify_stage(Some("Teklif Gönderildi")), Stage::Proposal);
    assert_eq!(classify_stage(Some("proposal_sent")), Stage::Proposal);
}

#[test]
fn test_classifier_always_returns_canonical_stage() {
    let mut inputs: Vec<Option<String>> = vec![None, Some(String::new())];
    for (_, synonyms) in STAGE_SYNONYMS {
        for synonym in *synonyms {
            inputs.push(Some(synonym.to_uppercase()));
            inputs.push(Some(format!("{synonym}!")));
        }
    }
    inputs.push(Some("\u{0}\u{ffff}".to_string()));

    for input in inputs {
        let stage = classify_stage(input.as_deref());
        assert!(Stage::ALL.contains(&stage), "{input:?} -> {stage:?}");
    }
}

#[test]
fn test_same_stage_move_is_identity() {
    let deals = Arc::new(seed());
    for deal in deals.iter() {
        let next = apply_stage_change(&deals, &deal.id, deal.stage, at(999));
        assert!(Arc::ptr_eq(&deals, &next));
        assert_eq!(next.as_ref(), deals.as_ref());
    }
}

#[test]
fn test_missing_card_tokens_never_resolve() {
    let deals = seed();
    for token in ["card:d404", "d404", "card:D1", "card: d1"] {
        assert_eq!(resolve_drop_target(token, &deals), None, "{token}");
    }
}

#[tokio::test]
async fn test_transport_failure_uses_fallback_message() {
    let confirmer = Arc::new(MemoryConfirmer::with_default(ScriptedReply::TransportFailure));
    let config = BoardConfig::default().with_fallback_error_message("Could not move the deal");
    let (board, mut handles) = BoardController::new(seed(), confirmer, config);

    let outcome = board
        .move_deal(&d1(), Stage::Negotiation)
        .await
        .into_pending()
        .expect("pending")
        .settled()
        .await;

    assert_eq!(
        outcome,
        ConfirmOutcome::RolledBack {
            message: "Could not move the deal".to_string()
        }
    );
    assert_eq!(handles.notices.recv().await.unwrap().message, "Could not move the deal");
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Lead);
}

#[tokio::test]
async fn test_hung_confirmation_times_out_and_rolls_back() {
    let confirmer = Arc::new(MemoryConfirmer::with_default(ScriptedReply::Hang));
    let config = BoardConfig::default().with_confirm_timeout(Duration::from_millis(30));
    let (board, _handles) = BoardController::new(seed(), confirmer, config);

    let outcome = board
        .move_deal(&d1(), Stage::Won)
        .await
        .into_pending()
        .expect("pending")
        .settled()
        .await;

    assert_eq!(
        outcome,
        ConfirmOutcome::RolledBack {
            message: "Failed to update deal stage".to_string()
        }
    );
    assert!(!board.is_pending(&d1()).await);
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Lead);
}

#[tokio::test]
async fn test_rollback_leaves_unrelated_deals_alone() {
    let confirmer = Arc::new(MemoryConfirmer::accepting().with_delay(Duration::from_millis(20)));
    confirmer.push_reply(ScriptedReply::reject("nope"));
    let (board, _handles) = board_with(confirmer);

    let pending = board
        .drop_deal(&d1(), "won")
        .await
        .into_pending()
        .expect("pending");
    board
        .apply_feed_payload(
            r#"{"eventType": "UPDATE", "new": {"id": "d3", "value": 9100.0, "updated_at": "2023-11-14T22:20:00Z"}}"#,
        )
        .await
        .expect("payload");
    pending.settled().await;

    let deals = board.snapshot().await;
    assert_eq!(deals[0].stage, Stage::Lead);
    assert_eq!(deals[0].updated_at, at(0));
    assert_eq!(deals[1], seed()[1]);
    assert_eq!(deals[2].value, 9100.0);
    assert_eq!(deals[2].stage, Stage::Negotiation);
}

#[tokio::test]
async fn test_stale_feed_update_cannot_undo_pending_move() {
    let confirmer = Arc::new(MemoryConfirmer::accepting().with_delay(Duration::from_millis(20)));
    let (board, _handles) = board_with(confirmer);

    let pending = board
        .drop_deal(&d1(), "column:proposal")
        .await
        .into_pending()
        .expect("pending");

    // Written long before the drop: must not drag the card back to lead.
    let stale = FeedEvent::Update {
        new: DealRow {
            id: d1(),
            stage: Some("lead".to_string()),
            updated_at: Some(at(5)),
            ..Default::default()
        },
        old: None,
    };
    assert_eq!(board.apply_feed_event(stale).await, Reduction::Stale);
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Proposal);

    assert_eq!(pending.settled().await, ConfirmOutcome::Confirmed);
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Proposal);
    let stats = board.stats().await;
    assert_eq!(stats.stale_discarded, 1);
    assert_eq!(stats.confirmed, 1);
}

#[tokio::test]
async fn test_newer_partial_update_does_not_block_rollback() {
    let confirmer = Arc::new(MemoryConfirmer::accepting().with_delay(Duration::from_millis(50)));
    confirmer.push_reply(ScriptedReply::reject("Stage update failed"));
    let (board, mut handles) = board_with(confirmer);

    let pending = board
        .drop_deal(&d1(), "column:proposal")
        .await
        .into_pending()
        .expect("pending");

    // Partial row from another client, written after the drop, no stage column.
    let later = Utc::now() + chrono::Duration::seconds(5);
    let payload = format!(
        r#"{{"eventType": "UPDATE", "new": {{"id": "d1", "title": "Warehouse racking v2", "updated_at": "{}"}}}}"#,
        later.to_rfc3339()
    );
    assert_eq!(
        board.apply_feed_payload(&payload).await.expect("payload"),
        Reduction::Changed
    );
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Proposal);

    assert_eq!(
        pending.settled().await,
        ConfirmOutcome::RolledBack {
            message: "Stage update failed".to_string()
        }
    );
    let deal = board.deal(&d1()).await.unwrap();
    assert_eq!(deal.stage, Stage::Lead);
    assert_eq!(deal.title, "Warehouse racking v2");
    assert_eq!(deal.updated_at, later);
    assert_eq!(board.columns().await.stage_of("d1"), Some(Stage::Lead));

    let notice = handles.notices.recv().await.expect("notice");
    assert_eq!(
        notice.kind,
        NoticeKind::StageRolledBack {
            attempted: Stage::Proposal,
            restored: Stage::Lead,
        }
    );
    assert_eq!(board.stats().await.rolled_back, 1);
}

#[tokio::test]
async fn test_duplicate_insert_is_suppressed() {
    let (board, handles) = board_with(Arc::new(MemoryConfirmer::accepting()));
    let before = handles.board.borrow().clone();

    let reduction = board
        .apply_feed_payload(r#"{"eventType": "INSERT", "new": {"id": "d2", "title": "Dup", "stage": "lost"}}"#)
        .await
        .expect("payload");

    assert_eq!(reduction, Reduction::Unchanged);
    assert!(Arc::ptr_eq(&before, &board.snapshot().await));
    assert_eq!(board.deal(&DealId::new("d2")).await.unwrap().stage, Stage::Won);
    assert_eq!(board.stats().await.duplicate_inserts, 1);
}

#[tokio::test]
async fn test_feed_insert_and_delete_round_out_the_board() {
    let (board, _handles) = board_with(Arc::new(MemoryConfirmer::accepting()));

    board
        .apply_feed_payload(
            r#"{"eventType": "INSERT", "new": {"id": "d4", "title": "POS rollout", "value": 3000, "stage": "Kazanıldı"}}"#,
        )
        .await
        .expect("insert");
    board
        .apply_feed_payload(r#"{"eventType": "DELETE", "old": {"id": "d3"}}"#)
        .await
        .expect("delete");
    let missing = board
        .apply_feed_payload(r#"{"eventType": "DELETE", "old": {"id": "d3"}}"#)
        .await
        .expect("delete again");

    assert_eq!(missing, Reduction::Unchanged);
    let columns = board.columns().await;
    assert_eq!(columns.stage_of("d4"), Some(Stage::Won));
    assert_eq!(columns.stage_of("d3"), None);
    assert_eq!(columns.column(Stage::Won).len(), 2);
}

#[tokio::test]
async fn test_pointer_gesture_drives_a_drop() {
    let confirmer = Arc::new(MemoryConfirmer::accepting());
    let (board, _handles) = board_with(Arc::clone(&confirmer));
    let mut pointer = board.pointer_tracker();

    pointer.pointer_down(d1(), 100.0, 100.0);
    assert!(pointer.pointer_move(102.0, 101.0).is_none());
    let started = pointer.pointer_move(160.0, 100.0).expect("drag start");
    assert!(matches!(board.handle_drag(started).await, DragOutcome::Started));

    let ended = pointer.pointer_up(Some("column:negotiation")).expect("drag end");
    assert!(matches!(ended, DragEvent::Ended { .. }));
    let pending = board.handle_drag(ended).await.into_pending().expect("pending");

    assert_eq!(pending.settled().await, ConfirmOutcome::Confirmed);
    assert_eq!(board.deal(&d1()).await.unwrap().stage, Stage::Negotiation);
    assert_eq!(confirmer.calls().len(), 1);
}
