// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! Step source traits and common types

use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use anyhow::Result;

/// Reading kinds a source can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    StepCounter,        // Cumulative steps since source epoch
    StepDetector,       // One event per step, no running value
    Custom(u32),        // User-defined
}

/// Delivery-rate hint passed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateClass {
    Fastest,
    Game,
    Ui,
    Normal,
}

impl RateClass {
    /// Polling interval corresponding to the rate hint
    pub fn interval(&self) -> Duration {
        match self {
            RateClass::Fastest => Duration::from_millis(20),
            RateClass::Game => Duration::from_millis(50),
            RateClass::Ui => Duration::from_millis(66),
            RateClass::Normal => Duration::from_millis(200),
        }
    }
}

/// Source operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStatus {
    Detached,
    Attaching,
    Attached,
    Error,
}

/// A single cumulative step reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReading {
    pub source_id: String,
    pub kind: SourceKind,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,

    /// Total steps counted by the source since its epoch (commonly last
    /// reboot). Non-decreasing between resets; may reset to a smaller value
    /// at any time without notice.
    pub cumulative: f64,
}

impl StepReading {
    pub fn new(source_id: &str, kind: SourceKind, cumulative: f64) -> Self {
        Self {
            source_id: source_id.to_string(),
            kind,
            timestamp: Utc::now(),
            sequence: 0,
            cumulative,
        }
    }

    pub fn is_step_counter(&self) -> bool {
        self.kind == SourceKind::StepCounter
    }
}

/// Trait for all step sources
#[async_trait]
pub trait StepSource: Send + Sync {
    /// Get source unique identifier
    fn id(&self) -> &str;

    /// Get reading kind this source emits
    fn kind(&self) -> SourceKind;

    /// Get current status
    fn status(&self) -> SourceStatus;

    /// Rate hint the source was registered with
    fn rate_class(&self) -> RateClass;

    /// Attach to the underlying counter
    async fn attach(&mut self) -> Result<()>;

    /// Detach from the underlying counter
    async fn detach(&mut self) -> Result<()>;

    /// Read the current cumulative value
    async fn poll(&mut self) -> Result<StepReading>;
}

/// Source health metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source_id: String,
    pub status: SourceStatus,
    pub readings_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

impl SourceHealth {
    pub fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            status: SourceStatus::Detached,
            readings_count: 0,
            error_count: 0,
            last_error: None,
        }
    }
}
