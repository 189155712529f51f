//! Pointer gesture tracking: turns raw pointer events into drag events.
//!
//! A press only becomes a drag once the pointer has travelled the activation
//! distance; releasing before that is a click and produces nothing.

use crate::deal::DealId;

/// Default pointer travel, in pixels, before a press becomes a drag.
pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 8.0;

/// Drag lifecycle events consumed by the board controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Started { deal_id: DealId },
    /// Released over `over`, a drop token, or over nothing.
    Ended { deal_id: DealId, over: Option<String> },
    Cancelled { deal_id: DealId },
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Pressed { deal_id: DealId, x: f64, y: f64 },
    Dragging { deal_id: DealId },
}

/// Tracks a single pointer over the board.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    activation_distance: f64,
    phase: Phase,
}

impl PointerTracker {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            activation_distance,
            phase: Phase::Idle,
        }
    }

    /// Pointer pressed on a card. Replaces any unfinished press.
    pub fn pointer_down(&mut self, deal_id: DealId, x: f64, y: f64) {
        self.phase = Phase::Pressed { deal_id, x, y };
    }

    /// Pointer moved. Emits `Started` once when the press crosses the threshold.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<DragEvent> {
        let Phase::Pressed {
            deal_id,
            x: start_x,
            y: start_y,
        } = &self.phase
        else {
            return None;
        };

        let distance = (x - start_x).hypot(y - start_y);
        if distance < self.activation_distance {
            return None;
        }

        let deal_id = deal_id.clone();
        self.phase = Phase::Dragging {
            deal_id: deal_id.clone(),
        };
        Some(DragEvent::Started { deal_id })
    }

    /// Pointer released over `over`. Emits `Ended` only if a drag was active.
    pub fn pointer_up(&mut self, over: Option<&str>) -> Option<DragEvent> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Dragging { deal_id } => Some(DragEvent::Ended {
                deal_id,
                over: over.map(str::to_string),
            }),
            _ => None,
        }
    }

    /// Gesture aborted (escape key, pointer capture lost).
    pub fn cancel(&mut self) -> Option<DragEvent> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Dragging { deal_id } => Some(DragEvent::Cancelled { deal_id }),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_DISTANCE)
    }
}
