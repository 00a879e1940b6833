// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! Event bus for inter-component communication

use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::sensors::StepReading;
use crate::core::AccrualUpdate;

/// Event types in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventType {
    StepReading,
    Accrual,
    Alert,
    SystemStatus,
    Error,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Reading(StepReading),
    Accrual(AccrualUpdate),
    Alert { level: String, message: String },
    Status { key: String, value: String },
    Error { code: u32, message: String },
}

/// Central event bus for pub/sub communication.
///
/// Readings flow from the feed manager to the accrual loop; accrual updates
/// flow from the accrual loop to the display. Dropping a receiver is the
/// unsubscription.
pub struct EventBus {
    reading_tx: broadcast::Sender<StepReading>,
    accrual_tx: broadcast::Sender<AccrualUpdate>,
    event_tx: broadcast::Sender<Event>,
    event_counter: std::sync::atomic::AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (reading_tx, _) = broadcast::channel(capacity);
        let (accrual_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            reading_tx,
            accrual_tx,
            event_tx,
            event_counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn publish_reading(&self, reading: StepReading) {
        let _ = self.reading_tx.send(reading.clone());
        self.publish_event(EventType::StepReading, EventPayload::Reading(reading));
    }

    pub fn publish_accrual(&self, update: AccrualUpdate) {
        let _ = self.accrual_tx.send(update.clone());
        self.publish_event(EventType::Accrual, EventPayload::Accrual(update));
    }

    pub fn publish_alert(&self, level: &str, message: &str) {
        self.publish_event(
            EventType::Alert,
            EventPayload::Alert {
                level: level.to_string(),
                message: message.to_string(),
            },
        );
    }

    pub fn publish_error(&self, code: u32, message: &str) {
        self.publish_event(
            EventType::Error,
            EventPayload::Error {
                code,
                message: message.to_string(),
            },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_readings(&self) -> broadcast::Receiver<StepReading> {
        self.reading_tx.subscribe()
    }

    pub fn subscribe_accruals(&self) -> broadcast::Receiver<AccrualUpdate> {
        self.accrual_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SourceKind;

    #[tokio::test]
    async fn test_readings_reach_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe_readings();

        bus.publish_reading(StepReading::new("pedometer-1", SourceKind::StepCounter, 42.0));

        let reading = rx.recv().await.unwrap();
        assert_eq!(reading.cumulative, 42.0);
    }

    #[tokio::test]
    async fn test_accrual_mirrors_onto_event_stream() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe_events();

        bus.publish_accrual(AccrualUpdate {
            delta: 5,
            running_total: 12,
            timestamp: Utc::now(),
        });

        let event = events.recv().await.unwrap();
        assert!(matches!(event.payload, EventPayload::Accrual(ref u) if u.running_total == 12));
    }
}
