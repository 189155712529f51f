//! Reducer-style container for the board's deal list.
//!
//! All mutations of the deal list go through [`BoardStore::dispatch`]. Actions
//! are split by origin: [`LocalAction`]s come from this client (drags, forms,
//! confirmation outcomes) and [`RemoteAction`]s from the backend (realtime
//! feed, reloads). The one conflict rule between them: while a local stage
//! move awaits confirmation, remote updates for that deal stamped before the
//! optimistic timestamp are dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::optimistic::{apply_stage_change, DealList};
use crate::deal::{Deal, DealId, DealPatch};
use crate::stage::Stage;

/// Identifies one optimistic move, so a late outcome for an older move
/// cannot settle a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoveTicket(pub u64);

/// An optimistic stage move awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub ticket: MoveTicket,
    /// Stage before the move, restored on rollback.
    pub prior_stage: Stage,
    /// Timestamp before the move, restored on rollback.
    pub prior_updated_at: DateTime<Utc>,
    pub target: Stage,
    pub optimistic_at: DateTime<Utc>,
    /// A newer remote update set the stage while the move was pending.
    pub remote_stage: bool,
    /// Latest remote timestamp applied while the move was pending.
    pub remote_updated_at: Option<DateTime<Utc>>,
}

impl PendingMove {
    fn record_remote(&mut self, remote_at: DateTime<Utc>, sets_stage: bool) {
        self.remote_stage |= sets_stage;
        self.remote_updated_at = Some(
            self.remote_updated_at
                .map_or(remote_at, |seen| seen.max(remote_at)),
        );
    }
}

/// Mutations originating from this client.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    /// Optimistically move a deal and open a pending confirmation.
    Move {
        deal_id: DealId,
        stage: Stage,
        at: DateTime<Utc>,
        ticket: MoveTicket,
    },
    /// The backend accepted the move.
    Confirm {
        deal_id: DealId,
        ticket: MoveTicket,
        server_updated_at: Option<DateTime<Utc>>,
    },
    /// The backend rejected the move, or it never answered; roll back.
    Revert { deal_id: DealId, ticket: MoveTicket },
    /// A deal created on this client.
    Add(Deal),
    /// A deal deleted on this client.
    Remove(DealId),
}

/// Mutations originating from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteAction {
    Insert(Deal),
    Update { deal_id: DealId, patch: DealPatch },
    Delete(DealId),
    /// Authoritative full list, e.g. after a refetch.
    Reload(Vec<Deal>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardAction {
    Local(LocalAction),
    Remote(RemoteAction),
}

impl From<LocalAction> for BoardAction {
    fn from(action: LocalAction) -> Self {
        BoardAction::Local(action)
    }
}

impl From<RemoteAction> for BoardAction {
    fn from(action: RemoteAction) -> Self {
        BoardAction::Remote(action)
    }
}

/// Result of dispatching one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// The deal list changed.
    Changed,
    /// Nothing to do: unknown deal, same stage, duplicate insert, empty patch.
    Unchanged,
    /// Move refused because the deal already has a pending confirmation.
    Busy,
    /// Remote update older than the pending optimistic move; discarded.
    Stale,
    /// Confirmation outcome arrived after a newer state replaced the
    /// optimistic one, or for a move that is no longer pending.
    Superseded,
}

impl Reduction {
    pub fn changed(&self) -> bool {
        matches!(self, Reduction::Changed)
    }
}

/// Counters over the store's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStats {
    pub confirmed: u64,
    pub rolled_back: u64,
    pub stale_discarded: u64,
    pub duplicate_inserts: u64,
}

/// The deal list plus the bookkeeping needed to roll moves back.
#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    deals: DealList,
    pending: HashMap<DealId, PendingMove>,
    stats: BoardStats,
}

impl BoardStore {
    /// Create a store seeded with `deals`. Later duplicates of an id are dropped.
    pub fn new(deals: Vec<Deal>) -> Self {
        Self {
            deals: Arc::new(dedupe(deals)),
            pending: HashMap::new(),
            stats: BoardStats::default(),
        }
    }

    /// Current deal list.
    pub fn deals(&self) -> &DealList {
        &self.deals
    }

    pub fn get(&self, deal_id: &DealId) -> Option<&Deal> {
        self.deals.iter().find(|deal| &deal.id == deal_id)
    }

    pub fn pending(&self, deal_id: &DealId) -> Option<&PendingMove> {
        self.pending.get(deal_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> BoardStats {
        self.stats
    }

    /// Apply one action.
    pub fn dispatch(&mut self, action: impl Into<BoardAction>) -> Reduction {
        match action.into() {
            BoardAction::Local(action) => self.reduce_local(action),
            BoardAction::Remote(action) => self.reduce_remote(action),
        }
    }

    fn reduce_local(&mut self, action: LocalAction) -> Reduction {
        match action {
            LocalAction::Move {
                deal_id,
                stage,
                at,
                ticket,
            } => {
                if self.pending.contains_key(&deal_id) {
                    return Reduction::Busy;
                }
                let Some(current) = self.get(&deal_id) else {
                    return Reduction::Unchanged;
                };
                let (prior_stage, prior_updated_at) = (current.stage, current.updated_at);

                let next = apply_stage_change(&self.deals, &deal_id, stage, at);
                if Arc::ptr_eq(&next, &self.deals) {
                    return Reduction::Unchanged;
                }
                self.deals = next;
                self.pending.insert(
                    deal_id,
                    PendingMove {
                        ticket,
                        prior_stage,
                        prior_updated_at,
                        target: stage,
                        optimistic_at: at,
                        remote_stage: false,
                        remote_updated_at: None,
                    },
                );
                Reduction::Changed
            }
            LocalAction::Confirm {
                deal_id,
                ticket,
                server_updated_at,
            } => {
                let Some(pending) = self.take_pending(&deal_id, ticket) else {
                    return Reduction::Superseded;
                };
                self.stats.confirmed += 1;
                let Some(server_updated_at) = server_updated_at else {
                    return Reduction::Unchanged;
                };
                if !self.shows_target(&deal_id, &pending) {
                    return Reduction::Superseded;
                }
                let adopted = pending
                    .remote_updated_at
                    .map_or(server_updated_at, |remote| remote.max(server_updated_at));
                self.modify(&deal_id, |deal| {
                    deal.updated_at = adopted;
                    true
                })
            }
            LocalAction::Revert { deal_id, ticket } => {
                let Some(pending) = self.take_pending(&deal_id, ticket) else {
                    return Reduction::Superseded;
                };
                if !self.shows_target(&deal_id, &pending) {
                    return Reduction::Superseded;
                }
                // Newer remote edits to other columns keep their timestamp.
                let restored_at = pending
                    .remote_updated_at
                    .unwrap_or(pending.prior_updated_at);
                self.stats.rolled_back += 1;
                self.modify(&deal_id, |deal| {
                    deal.stage = pending.prior_stage;
                    deal.updated_at = restored_at;
                    true
                })
            }
            LocalAction::Add(deal) => self.insert(deal),
            LocalAction::Remove(deal_id) => self.remove(&deal_id),
        }
    }

    fn reduce_remote(&mut self, action: RemoteAction) -> Reduction {
        match action {
            RemoteAction::Insert(deal) => {
                let reduction = self.insert(deal);
                if reduction == Reduction::Unchanged {
                    self.stats.duplicate_inserts += 1;
                }
                reduction
            }
            RemoteAction::Update { deal_id, patch } => {
                let patch = match self.pending.get_mut(&deal_id) {
                    None => patch,
                    Some(pending) => match patch.updated_at {
                        Some(remote_at) if remote_at < pending.optimistic_at => {
                            debug!(
                                deal_id = %deal_id,
                                remote_at = %remote_at,
                                optimistic_at = %pending.optimistic_at,
                                "Discarding stale remote update for pending deal"
                            );
                            self.stats.stale_discarded += 1;
                            return Reduction::Stale;
                        }
                        Some(remote_at) => {
                            pending.record_remote(remote_at, patch.stage.is_some());
                            patch
                        }
                        None => patch.without_stage(),
                    },
                };
                if patch.is_empty() {
                    return Reduction::Unchanged;
                }
                self.modify(&deal_id, |deal| deal.apply_patch(&patch))
            }
            RemoteAction::Delete(deal_id) => self.remove(&deal_id),
            RemoteAction::Reload(deals) => {
                let mut deals = dedupe(deals);
                let present: HashSet<DealId> = deals.iter().map(|deal| deal.id.clone()).collect();
                self.pending.retain(|deal_id, _| present.contains(deal_id));

                // Pending moves keep their optimistic card until confirmation settles.
                for deal in deals.iter_mut() {
                    if let Some(pending) = self.pending.get(&deal.id) {
                        deal.stage = pending.target;
                        deal.updated_at = pending.optimistic_at;
                    }
                }

                if *self.deals == deals {
                    return Reduction::Unchanged;
                }
                self.deals = Arc::new(deals);
                Reduction::Changed
            }
        }
    }

    fn insert(&mut self, deal: Deal) -> Reduction {
        if self.get(&deal.id).is_some() {
            return Reduction::Unchanged;
        }
        Arc::make_mut(&mut self.deals).push(deal);
        Reduction::Changed
    }

    fn remove(&mut self, deal_id: &DealId) -> Reduction {
        self.pending.remove(deal_id);
        if self.get(deal_id).is_none() {
            return Reduction::Unchanged;
        }
        Arc::make_mut(&mut self.deals).retain(|deal| &deal.id != deal_id);
        Reduction::Changed
    }

    /// Runs `edit` on a copy of the deal and swaps it in only if `edit`
    /// reports a change, so readers keep the same list otherwise.
    fn modify(&mut self, deal_id: &DealId, edit: impl FnOnce(&mut Deal) -> bool) -> Reduction {
        let Some(index) = self.deals.iter().position(|deal| &deal.id == deal_id) else {
            return Reduction::Unchanged;
        };
        let mut deal = self.deals[index].clone();
        if !edit(&mut deal) || deal == self.deals[index] {
            return Reduction::Unchanged;
        }
        Arc::make_mut(&mut self.deals)[index] = deal;
        Reduction::Changed
    }

    fn take_pending(&mut self, deal_id: &DealId, ticket: MoveTicket) -> Option<PendingMove> {
        match self.pending.get(deal_id) {
            Some(pending) if pending.ticket == ticket => self.pending.remove(deal_id),
            _ => None,
        }
    }

    /// Whether the deal still shows the move's target stage and no newer
    /// remote update has taken over its stage.
    fn shows_target(&self, deal_id: &DealId, pending: &PendingMove) -> bool {
        !pending.remote_stage
            && self
                .get(deal_id)
                .is_some_and(|deal| deal.stage == pending.target)
    }
}

fn dedupe(deals: Vec<Deal>) -> Vec<Deal> {
    let mut seen = HashSet::new();
    deals
        .into_iter()
        .filter(|deal| seen.insert(deal.id.clone()))
        .collect()
}
