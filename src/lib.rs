//! Deal pipeline board state.
//!
//! Deals move between five canonical stages on a kanban board. A stage move
//! shows up immediately, is confirmed by the backend in the background, and is
//! rolled back if the backend refuses or never answers. A realtime change feed
//! is merged into the same state without letting stale events undo a pending
//! move.
//!
//! - [`stage`]: canonical stages and raw label classification
//! - [`deal`]: deal records and their wire rows
//! - [`board`]: drop resolution, optimistic moves, store and controller
//! - [`feed`]: realtime change events and tenant scoping
//! - [`confirm`]: stage confirmation backends
//! - [`config`]: layered configuration

pub mod board;
pub mod config;
pub mod confirm;
pub mod deal;
pub mod error;
pub mod feed;
pub mod logging;
pub mod stage;

pub use board::{BoardController, BoardHandles, DragEvent, DragOutcome};
pub use config::BoardConfig;
pub use deal::{Deal, DealId};
pub use error::{BoardError, BoardResult};
pub use stage::{classify_stage, Stage};
