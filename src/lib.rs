// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! stridekeeper - Step Telemetry Engine
//!
//! A small Rust service that turns raw cumulative pedometer readings into a
//! durable running step total and ships each accepted increment to a remote
//! document store as best-effort telemetry:
//! - Accrual engine that absorbs counter resets and duplicate readings
//! - Single-slot local persistence of the last known total
//! - Fire-and-forget append-only cloud sync (no retry queue by design)
//! - Activation gated on authorization and source presence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   stridekeeper Session                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐  ┌────────────┐  │
//! │  │  Step   │ → │ Accrual  │ → │ Counter  │  │   Remote   │  │
//! │  │ Source  │   │ Engine   │   │  Store   │  │ Sync Sink  │  │
//! │  └─────────┘   └──────────┘   └──────────┘  └────────────┘  │
//! │       ↓             ↓                                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Event Bus                        │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                          ↓                                  │
//! │                 ┌─────────────────┐                         │
//! │                 │ Status Display  │                         │
//! │                 └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod core;
pub mod sensors;
pub mod store;
pub mod sync;
pub mod config;

// Re-exports for convenience
pub use config::Config;
pub use core::{AccrualEngine, EventBus};
pub use sensors::{SensorManager, SourceKind, StepReading};
pub use store::CounterStore;
pub use sync::{RemoteSink, SyncRecord};

/// stridekeeper version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// stridekeeper name
pub const NAME: &str = "stridekeeper";
