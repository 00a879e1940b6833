//! Core module - accrual engine and event plumbing

mod engine;
mod event_bus;

pub use engine::{run_accrual, Accrual, AccrualEngine};
pub use event_bus::{Event, EventBus, EventPayload, EventType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensors::ActivationState;

/// An accepted step increment, as published on the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualUpdate {
    pub delta: u64,
    pub running_total: u64,
    pub timestamp: DateTime<Utc>,
}

/// Session-wide state snapshot, maintained from the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub running: bool,
    pub activation: ActivationState,
    pub total_accruals: u64,
    pub running_total: u64,
    pub last_accrual: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Fresh session resuming from a persisted total
    pub fn new(activation: ActivationState, initial_total: u64) -> Self {
        Self {
            running: activation.is_active(),
            activation,
            total_accruals: 0,
            running_total: initial_total,
            last_accrual: None,
        }
    }

    /// Fold one accepted increment into the snapshot
    pub fn apply(&mut self, update: &AccrualUpdate) {
        self.total_accruals += 1;
        self.running_total = update.running_total;
        self.last_accrual = Some(update.timestamp);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ActivationState::AwaitingPermission, 0)
    }
}
