//! The deal board: drop resolution, optimistic moves, the reconciling store
//! and the controller that ties them to the stage confirmation endpoint.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dealboard::board::BoardController;
//! use dealboard::confirm::MemoryConfirmer;
//! use dealboard::config::BoardConfig;
//!
//! let (board, mut handles) =
//!     BoardController::new(deals, Arc::new(MemoryConfirmer::accepting()), BoardConfig::default());
//!
//! // Card moves to "proposal" immediately; confirmation runs in the background.
//! if let Some(pending) = board.drop_deal(&deal_id, "column:proposal").await.into_pending() {
//!     pending.settled().await;
//! }
//!
//! while let Ok(notice) = handles.notices.try_recv() {
//!     eprintln!("{}", notice.message);
//! }
//! ```

mod columns;
mod controller;
mod gesture;
mod notice;
mod optimistic;
mod resolver;
mod store;

pub use columns::{BoardColumn, BoardColumns};
pub use controller::{
    BoardController, BoardHandles, ConfirmOutcome, DragOutcome, DragSession, PendingConfirmation,
};
pub use gesture::{DragEvent, PointerTracker, DEFAULT_ACTIVATION_DISTANCE};
pub use notice::{BoardNotice, NoticeKind};
pub use optimistic::{apply_stage_change, DealList};
pub use resolver::{resolve_drop_target, DropTarget};
pub use store::{
    BoardAction, BoardStats, BoardStore, LocalAction, MoveTicket, PendingMove, Reduction,
    RemoteAction,
};
