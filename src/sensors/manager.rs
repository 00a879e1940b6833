// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! Feed manager - gated attachment and delivery of step readings

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use super::{ActivationGate, ActivationState, SourceHealth, SourceStatus, StepSource};
use crate::core::EventBus;

/// Owns the step source and delivers its readings onto the event bus.
///
/// Attachment happens only when the activation gate reports `Active`.
/// While detached no readings are delivered and the running total is
/// frozen; shutdown is the explicit unsubscription.
pub struct SensorManager {
    source: RwLock<Box<dyn StepSource>>,
    health: RwLock<SourceHealth>,
    event_bus: Arc<EventBus>,
    gate: ActivationGate,
}

impl SensorManager {
    pub fn new(source: Box<dyn StepSource>, event_bus: Arc<EventBus>, gate: ActivationGate) -> Self {
        let health = SourceHealth::new(source.id());

        Self {
            source: RwLock::new(source),
            health: RwLock::new(health),
            event_bus,
            gate,
        }
    }

    pub fn activation_state(&self) -> ActivationState {
        self.gate.state()
    }

    pub async fn health(&self) -> SourceHealth {
        self.health.read().await.clone()
    }

    /// Attach the source and poll it until shutdown
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let state = self.gate.state();
        if !state.is_active() {
            bail!("feed not activated: {}", state);
        }

        let rate = {
            let mut source = self.source.write().await;
            source.attach().await?;
            info!("Attached step source: {} ({:?}, {:?} rate)", source.id(), source.kind(), source.rate_class());
            source.rate_class()
        };

        self.health.write().await.status = SourceStatus::Attached;

        let mut poll_interval = interval(rate.interval());

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    self.poll_source().await;
                }
                _ = shutdown.recv() => {
                    info!("Feed manager shutting down...");
                    break;
                }
            }
        }

        {
            let mut source = self.source.write().await;
            if let Err(e) = source.detach().await {
                warn!("Error detaching {}: {}", source.id(), e);
            }
        }
        self.health.write().await.status = SourceStatus::Detached;

        Ok(())
    }

    async fn poll_source(&self) {
        let mut source = self.source.write().await;

        if source.status() != SourceStatus::Attached {
            return;
        }

        match source.poll().await {
            Ok(reading) => {
                let mut health = self.health.write().await;
                health.readings_count += 1;
                drop(health);

                self.event_bus.publish_reading(reading);
            }
            Err(e) => {
                let mut health = self.health.write().await;
                health.error_count += 1;
                health.last_error = Some(e.to_string());
                debug!("Read error for {}: {}", source.id(), e);
            }
        }
    }
}
