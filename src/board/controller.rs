//! Stage reconciliation controller.
//!
//! Owns the board store and drives the drag lifecycle:
//!
//! ```text
//! Idle --Started--> Dragging --Ended(unresolved | same stage)--> Idle
//!                      |
//!                      +--Ended(new stage)--> Pending --confirmed--> Idle
//!                                                 \----failed/timeout--> Idle (rolled back)
//! ```
//!
//! The optimistic move is visible to readers before the confirmation request
//! is sent. Realtime feed events are merged through the same store at any
//! time. Board snapshots are published on a `watch` channel and rollback
//! notices on an `mpsc` channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::columns::BoardColumns;
use super::gesture::{DragEvent, PointerTracker};
use super::notice::{BoardNotice, NoticeKind};
use super::optimistic::DealList;
use super::resolver::resolve_drop_target;
use super::store::{
    BoardAction, BoardStats, BoardStore, LocalAction, MoveTicket, Reduction, RemoteAction,
};
use crate::config::BoardConfig;
use crate::confirm::{ConfirmError, StageConfirmer};
use crate::deal::{Deal, DealId, DealRow};
use crate::error::BoardResult;
use crate::feed::{FeedEvent, FeedScope};
use crate::stage::Stage;

/// An active drag, between `Started` and `Ended`/`Cancelled`.
///
/// The rollback snapshot is taken when the drop applies the move (see
/// [`PendingMove`](super::PendingMove)), not at drag start, so feed
/// updates merged mid-drag are not undone by a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub deal_id: DealId,
}

/// How the controller handled a drag event or programmatic move.
#[derive(Debug)]
pub enum DragOutcome {
    /// A drag session opened.
    Started,
    /// The drag session was abandoned.
    Cancelled,
    /// The event did not match an active drag, or named an unknown deal.
    Ignored,
    /// The drop target resolved to no stage.
    Unresolved,
    /// The deal already sits in the target stage.
    Unchanged,
    /// The deal still waits for an earlier confirmation.
    Busy,
    /// Moved optimistically; confirmation in flight.
    Pending(PendingConfirmation),
}

impl DragOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, DragOutcome::Pending(_))
    }

    /// The pending confirmation, if this outcome started one.
    pub fn into_pending(self) -> Option<PendingConfirmation> {
        match self {
            DragOutcome::Pending(pending) => Some(pending),
            _ => None,
        }
    }
}

/// Final result of a confirmation round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    RolledBack { message: String },
    /// The backend refused the move, but a newer remote update had already
    /// replaced its stage (or the deal is gone); the board was left as is.
    Superseded { message: String },
    /// The controller shut down before the answer arrived.
    Discarded,
}

/// Handle on an in-flight confirmation.
#[derive(Debug)]
pub struct PendingConfirmation {
    pub deal_id: DealId,
    pub target: Stage,
    pub ticket: MoveTicket,
    handle: JoinHandle<ConfirmOutcome>,
}

impl PendingConfirmation {
    /// Waits for the confirmation to settle.
    pub async fn settled(self) -> ConfirmOutcome {
        self.handle.await.unwrap_or(ConfirmOutcome::Discarded)
    }

    pub fn is_settled(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Receivers handed out when a controller is created.
#[derive(Debug)]
pub struct BoardHandles {
    /// Latest deal list; updated after every change.
    pub board: watch::Receiver<DealList>,
    /// Rollback notices for display.
    pub notices: mpsc::Receiver<BoardNotice>,
}

/// State reachable from spawned confirmation tasks.
struct Shared {
    store: Mutex<BoardStore>,
    board_tx: watch::Sender<DealList>,
    notice_tx: mpsc::Sender<BoardNotice>,
    closed: AtomicBool,
    fallback_error_message: String,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn publish(&self, store: &BoardStore) {
        self.board_tx.send_replace(Arc::clone(store.deals()));
    }

    fn notify(&self, notice: BoardNotice) {
        if let Err(err) = self.notice_tx.try_send(notice) {
            warn!("Dropping board notice: {}", err);
        }
    }
}

/// Single owner of a board's deal list.
pub struct BoardController {
    shared: Arc<Shared>,
    confirmer: Arc<dyn StageConfirmer>,
    config: BoardConfig,
    scope: FeedScope,
    drag: Mutex<Option<DragSession>>,
    next_ticket: AtomicU64,
}

impl BoardController {
    /// Creates a controller over `deals`.
    ///
    /// Returns the controller and the receivers for board snapshots and
    /// notices.
    pub fn new(
        deals: Vec<Deal>,
        confirmer: Arc<dyn StageConfirmer>,
        config: BoardConfig,
    ) -> (Self, BoardHandles) {
        let store = BoardStore::new(deals);
        let (board_tx, board) = watch::channel(Arc::clone(store.deals()));
        let (notice_tx, notices) = mpsc::channel(config.notice_capacity.max(1));

        let controller = Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                board_tx,
                notice_tx,
                closed: AtomicBool::new(false),
                fallback_error_message: config.fallback_error_message.clone(),
            }),
            confirmer,
            config,
            scope: FeedScope::All,
            drag: Mutex::new(None),
            next_ticket: AtomicU64::new(1),
        };

        (controller, BoardHandles { board, notices })
    }

    /// Creates a controller from backend rows, classifying their stages.
    pub fn from_rows(
        rows: &[DealRow],
        confirmer: Arc<dyn StageConfirmer>,
        config: BoardConfig,
    ) -> (Self, BoardHandles) {
        let now = Utc::now();
        let deals = rows.iter().map(|row| Deal::from_row(row, now)).collect();
        Self::new(deals, confirmer, config)
    }

    /// Restricts feed events to one tenant.
    pub fn with_scope(mut self, scope: FeedScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    /// Pointer tracker using this board's activation distance.
    pub fn pointer_tracker(&self) -> PointerTracker {
        PointerTracker::new(self.config.activation_distance)
    }

    /// Current deal list.
    pub async fn snapshot(&self) -> DealList {
        Arc::clone(self.shared.store.lock().await.deals())
    }

    pub async fn deal(&self, deal_id: &DealId) -> Option<Deal> {
        self.shared.store.lock().await.get(deal_id).cloned()
    }

    pub async fn columns(&self) -> BoardColumns {
        BoardColumns::from_deals(&self.snapshot().await)
    }

    pub async fn stats(&self) -> BoardStats {
        self.shared.store.lock().await.stats()
    }

    /// Whether the deal waits for a stage confirmation.
    pub async fn is_pending(&self, deal_id: &DealId) -> bool {
        self.shared.store.lock().await.pending(deal_id).is_some()
    }

    pub async fn current_drag(&self) -> Option<DragSession> {
        self.drag.lock().await.clone()
    }

    /// Feeds one drag event through the state machine.
    pub async fn handle_drag(&self, event: DragEvent) -> DragOutcome {
        if self.shared.is_closed() {
            return DragOutcome::Ignored;
        }

        match event {
            DragEvent::Started { deal_id } => {
                if self.deal(&deal_id).await.is_none() {
                    debug!(deal_id = %deal_id, "Drag started on unknown deal");
                    return DragOutcome::Ignored;
                }
                *self.drag.lock().await = Some(DragSession { deal_id });
                DragOutcome::Started
            }
            DragEvent::Cancelled { deal_id } => {
                let mut drag = self.drag.lock().await;
                if drag.as_ref().is_some_and(|session| session.deal_id == deal_id) {
                    *drag = None;
                    DragOutcome::Cancelled
                } else {
                    DragOutcome::Ignored
                }
            }
            DragEvent::Ended { deal_id, over } => {
                let session = {
                    let mut drag = self.drag.lock().await;
                    match drag.take() {
                        Some(session) if session.deal_id == deal_id => session,
                        other => {
                            *drag = other;
                            return DragOutcome::Ignored;
                        }
                    }
                };

                let target = match over.as_deref() {
                    Some(token) => resolve_drop_target(token, &self.snapshot().await),
                    None => None,
                };
                let Some(stage) = target else {
                    debug!(deal_id = %session.deal_id, over = ?over, "Drop target did not resolve");
                    return DragOutcome::Unresolved;
                };

                self.begin_move(session.deal_id, stage).await
            }
        }
    }

    /// Convenience for a complete drag: start on `deal_id`, drop over `over`.
    pub async fn drop_deal(&self, deal_id: &DealId, over: &str) -> DragOutcome {
        if let DragOutcome::Ignored = self
            .handle_drag(DragEvent::Started {
                deal_id: deal_id.clone(),
            })
            .await
        {
            return DragOutcome::Ignored;
        }
        self.handle_drag(DragEvent::Ended {
            deal_id: deal_id.clone(),
            over: Some(over.to_string()),
        })
        .await
    }

    /// Moves a deal without a drag (e.g. "mark as won"). Same optimistic,
    /// confirm and rollback path as a drop.
    pub async fn move_deal(&self, deal_id: &DealId, stage: Stage) -> DragOutcome {
        if self.shared.is_closed() {
            return DragOutcome::Ignored;
        }
        self.begin_move(deal_id.clone(), stage).await
    }

    async fn begin_move(&self, deal_id: DealId, stage: Stage) -> DragOutcome {
        let ticket = MoveTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst));
        let reduction = {
            let mut store = self.shared.store.lock().await;
            let reduction = store.dispatch(LocalAction::Move {
                deal_id: deal_id.clone(),
                stage,
                at: Utc::now(),
                ticket,
            });
            if reduction.changed() {
                self.shared.publish(&store);
            }
            reduction
        };

        match reduction {
            Reduction::Changed => {}
            Reduction::Busy => {
                debug!(deal_id = %deal_id, "Deal already awaiting confirmation");
                return DragOutcome::Busy;
            }
            _ => return DragOutcome::Unchanged,
        }

        debug!(deal_id = %deal_id, %stage, ticket = ticket.0, "Optimistic stage move");
        let handle = tokio::spawn(confirm_move(
            Arc::clone(&self.shared),
            Arc::clone(&self.confirmer),
            self.config.confirm_timeout(),
            deal_id.clone(),
            stage,
            ticket,
        ));

        DragOutcome::Pending(PendingConfirmation {
            deal_id,
            target: stage,
            ticket,
            handle,
        })
    }

    /// Merges one realtime feed event.
    pub async fn apply_feed_event(&self, event: FeedEvent) -> Reduction {
        if self.shared.is_closed() {
            return Reduction::Unchanged;
        }
        if !self.scope.admits(&event) {
            debug!(deal_id = %event.row().id, "Feed event outside board scope");
            return Reduction::Unchanged;
        }
        self.dispatch(event.into_action(Utc::now())).await
    }

    /// Decodes and merges one raw feed message.
    pub async fn apply_feed_payload(&self, payload: &str) -> BoardResult<Reduction> {
        let event = FeedEvent::from_json(payload)?;
        Ok(self.apply_feed_event(event).await)
    }

    /// Merges feed events until the stream ends or the controller shuts
    /// down. Returns the number of events consumed.
    pub async fn consume_feed<S>(&self, feed: S) -> usize
    where
        S: Stream<Item = FeedEvent>,
    {
        let mut feed = std::pin::pin!(feed);
        let mut consumed = 0;
        while let Some(event) = feed.next().await {
            if self.shared.is_closed() {
                break;
            }
            self.apply_feed_event(event).await;
            consumed += 1;
        }
        consumed
    }

    /// Adds a deal created on this client.
    pub async fn add_deal(&self, deal: Deal) -> Reduction {
        self.dispatch(LocalAction::Add(deal)).await
    }

    /// Removes a deal deleted on this client.
    pub async fn remove_deal(&self, deal_id: &DealId) -> Reduction {
        self.dispatch(LocalAction::Remove(deal_id.clone())).await
    }

    /// Replaces the list with an authoritative fetch. Deals awaiting
    /// confirmation keep their optimistic stage.
    pub async fn reload(&self, deals: Vec<Deal>) -> Reduction {
        self.dispatch(RemoteAction::Reload(deals)).await
    }

    async fn dispatch(&self, action: impl Into<BoardAction>) -> Reduction {
        let mut store = self.shared.store.lock().await;
        let reduction = store.dispatch(action);
        if reduction.changed() {
            self.shared.publish(&store);
        }
        reduction
    }

    /// Stops accepting input. Confirmations that answer afterwards are
    /// discarded without touching the board.
    pub fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for BoardController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn confirm_move(
    shared: Arc<Shared>,
    confirmer: Arc<dyn StageConfirmer>,
    timeout: Option<Duration>,
    deal_id: DealId,
    stage: Stage,
    ticket: MoveTicket,
) -> ConfirmOutcome {
    let request = confirmer.confirm_stage(&deal_id, stage);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .unwrap_or(Err(ConfirmError::TimedOut(limit))),
        None => request.await,
    };

    let mut store = shared.store.lock().await;
    if shared.is_closed() {
        debug!(deal_id = %deal_id, ticket = ticket.0, "Discarding confirmation after shutdown");
        return ConfirmOutcome::Discarded;
    }

    match result {
        Ok(confirmation) => {
            let reduction = store.dispatch(LocalAction::Confirm {
                deal_id: deal_id.clone(),
                ticket,
                server_updated_at: confirmation.updated_at,
            });
            if reduction.changed() {
                shared.publish(&store);
            }
            info!(deal_id = %deal_id, %stage, "Stage change confirmed");
            ConfirmOutcome::Confirmed
        }
        Err(err) => {
            let reduction = store.dispatch(LocalAction::Revert {
                deal_id: deal_id.clone(),
                ticket,
            });
            if reduction.changed() {
                shared.publish(&store);
            }
            let restored = match reduction {
                Reduction::Changed => store.get(&deal_id).map(|deal| deal.stage),
                _ => None,
            };
            drop(store);

            let message = err.user_message(&shared.fallback_error_message);
            let Some(restored) = restored else {
                warn!(
                    deal_id = %deal_id,
                    %stage,
                    error = %err,
                    "Stage change failed after a newer update, board left as is"
                );
                return ConfirmOutcome::Superseded { message };
            };

            warn!(deal_id = %deal_id, %stage, error = %err, "Stage change failed, rolled back");
            shared.notify(BoardNotice {
                deal_id,
                kind: NoticeKind::StageRolledBack {
                    attempted: stage,
                    restored,
                },
                message: message.clone(),
            });
            ConfirmOutcome::RolledBack { message }
        }
    }
}
