// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! Pedometer simulator for demo/testing

use async_trait::async_trait;
use anyhow::{bail, Result};
use rand::prelude::*;

use super::{RateClass, SourceKind, SourceStatus, StepReading, StepSource};

/// Simulates a cumulative hardware step counter.
///
/// The counter starts at an arbitrary baseline (a device that has been up
/// for a while), alternates between walking bursts and idle stretches, and
/// can spontaneously reset to zero the way real counters do across reboots.
pub struct PedometerSimulator {
    id: String,
    rate_class: RateClass,
    status: SourceStatus,
    sequence: u64,
    rng: StdRng,

    // Simulation state
    cumulative: f64,
    walking: bool,
    reset_probability: f64,
}

impl PedometerSimulator {
    pub fn new(id: &str, rate_class: RateClass) -> Self {
        Self::with_rng(id, rate_class, StdRng::from_entropy())
    }

    fn with_rng(id: &str, rate_class: RateClass, rng: StdRng) -> Self {
        Self {
            id: id.to_string(),
            rate_class,
            status: SourceStatus::Detached,
            sequence: 0,
            rng,
            cumulative: 0.0,
            walking: false,
            reset_probability: 0.001,
        }
    }

    /// Simulator with a fixed seed, for reproducible runs
    pub fn seeded(id: &str, rate_class: RateClass, seed: u64) -> Self {
        Self::with_rng(id, rate_class, StdRng::seed_from_u64(seed))
    }

    /// Chance per poll that the counter resets to zero
    pub fn set_reset_probability(&mut self, p: f64) {
        self.reset_probability = p.clamp(0.0, 1.0);
    }

    fn advance(&mut self) -> f64 {
        if self.rng.gen::<f64>() < self.reset_probability {
            self.cumulative = 0.0;
            self.walking = false;
            return self.cumulative;
        }

        // Toggle walking phase occasionally
        if self.rng.gen::<f64>() < 0.05 {
            self.walking = !self.walking;
        }

        if self.walking {
            self.cumulative += self.rng.gen_range(1..=3) as f64;
        }

        self.cumulative
    }
}

#[async_trait]
impl StepSource for PedometerSimulator {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::StepCounter
    }

    fn status(&self) -> SourceStatus {
        self.status
    }

    fn rate_class(&self) -> RateClass {
        self.rate_class
    }

    async fn attach(&mut self) -> Result<()> {
        // Counter has been running since "boot"
        self.cumulative = self.rng.gen_range(1_000..100_000) as f64;
        self.status = SourceStatus::Attached;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        self.status = SourceStatus::Detached;
        Ok(())
    }

    async fn poll(&mut self) -> Result<StepReading> {
        if self.status != SourceStatus::Attached {
            bail!("simulator '{}' polled while detached", self.id);
        }

        let cumulative = self.advance();
        self.sequence += 1;

        let mut reading = StepReading::new(&self.id, SourceKind::StepCounter, cumulative);
        reading.sequence = self.sequence;
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cumulative_is_non_decreasing_without_resets() {
        let mut sim = PedometerSimulator::seeded("pedometer-1", RateClass::Normal, 7);
        sim.set_reset_probability(0.0);
        sim.attach().await.unwrap();

        let mut previous = sim.poll().await.unwrap().cumulative;
        for _ in 0..500 {
            let reading = sim.poll().await.unwrap();
            assert!(reading.cumulative >= previous);
            previous = reading.cumulative;
        }
    }

    #[tokio::test]
    async fn test_reset_drops_counter_to_zero() {
        let mut sim = PedometerSimulator::seeded("pedometer-1", RateClass::Normal, 7);
        sim.set_reset_probability(1.0);
        sim.attach().await.unwrap();

        let reading = sim.poll().await.unwrap();
        assert_eq!(reading.cumulative, 0.0);
    }

    #[tokio::test]
    async fn test_poll_while_detached_is_an_error() {
        let mut sim = PedometerSimulator::seeded("pedometer-1", RateClass::Normal, 7);
        assert!(sim.poll().await.is_err());
    }

    #[tokio::test]
    async fn test_sequence_increments_per_reading() {
        let mut sim = PedometerSimulator::seeded("pedometer-1", RateClass::Normal, 7);
        sim.attach().await.unwrap();

        let first = sim.poll().await.unwrap();
        let second = sim.poll().await.unwrap();
        assert_eq!(second.sequence, first.sequence + 1);
    }
}
