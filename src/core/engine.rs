//! Accrual engine - turns raw cumulative readings into a running step total

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::{AccrualUpdate, EventBus};
use crate::store::CounterStore;
use crate::sync::RemoteSink;

/// An accepted increment produced by a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    pub delta: u64,
    pub running_total: u64,
}

/// Converts possibly-resetting cumulative readings into a strictly
/// accumulating application-level step total.
///
/// The first reading after activation only seeds the subtrahend and never
/// produces a delta. A reading below the previous one is a counter reset:
/// it re-seeds the subtrahend and is otherwise absorbed. Steps walked
/// between the reset point and the next reading are not recovered.
pub struct AccrualEngine {
    running_total: u64,
    previous: Option<f64>,
    last_accrual: Option<DateTime<Utc>>,
}

impl AccrualEngine {
    /// Engine with an unseeded subtrahend, resuming from a persisted total
    pub fn new(initial_total: u64) -> Self {
        Self {
            running_total: initial_total,
            previous: None,
            last_accrual: None,
        }
    }

    pub fn running_total(&self) -> u64 {
        self.running_total
    }

    /// Wall-clock time of the last accepted increment
    pub fn last_accrual(&self) -> Option<DateTime<Utc>> {
        self.last_accrual
    }

    /// Process one cumulative reading.
    ///
    /// Returns the accepted increment, or `None` when the reading seeds,
    /// duplicates, resets, or is malformed. Malformed means non-finite or
    /// negative; both take the absorb path rather than erroring.
    pub fn on_reading(&mut self, cumulative: f64) -> Option<Accrual> {
        if !cumulative.is_finite() || cumulative < 0.0 {
            return None;
        }

        let previous = match self.previous {
            Some(p) => p,
            None => {
                self.previous = Some(cumulative);
                return None;
            }
        };

        if cumulative < previous {
            // Counter reset: re-seed so counting resumes from here
            self.previous = Some(cumulative);
            return None;
        }

        let delta = (cumulative - previous).floor();
        if delta <= 0.0 {
            return None;
        }

        self.running_total += delta as u64;
        self.previous = Some(cumulative);
        self.last_accrual = Some(Utc::now());

        Some(Accrual {
            delta: delta as u64,
            running_total: self.running_total,
        })
    }
}

/// Drives the engine from the reading bus and fans accepted increments out
/// to the counter store and the remote sink.
///
/// Readings not coming from a step counter are filtered out. The remote
/// append is dispatched fire-and-forget; the local save is a blocking call
/// whose failure is logged and not retried - the in-memory total stays
/// correct and the next accepted delta writes the latest value anyway.
pub async fn run_accrual(
    mut engine: AccrualEngine,
    bus: Arc<EventBus>,
    store: Arc<CounterStore>,
    sink: Arc<RemoteSink>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut readings = bus.subscribe_readings();
    info!("Accrual loop started (total: {})", engine.running_total());

    loop {
        tokio::select! {
            result = readings.recv() => match result {
                Ok(reading) => {
                    if !reading.is_step_counter() {
                        continue;
                    }

                    if let Some(accrual) = engine.on_reading(reading.cumulative) {
                        debug!("Steps updated: {} (+{})", accrual.running_total, accrual.delta);

                        sink.dispatch(accrual.running_total);

                        if let Err(e) = store.save(accrual.running_total) {
                            warn!("Failed to persist step total: {}", e);
                        }

                        bus.publish_accrual(AccrualUpdate {
                            delta: accrual.delta,
                            running_total: accrual.running_total,
                            timestamp: Utc::now(),
                        });
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Accrual loop lagged, {} readings dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Reading feed closed, accrual loop exiting");
                    break;
                }
            },
            _ = shutdown.recv() => {
                info!("Accrual loop shutting down...");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::sensors::{SourceKind, StepReading};
    use crate::sync::SyncConfig;
    use std::time::Duration;

    #[test]
    fn test_non_decreasing_sequence_accumulates_span() {
        let mut engine = AccrualEngine::new(0);

        for reading in [100.0, 120.0, 120.0, 350.0, 351.0] {
            engine.on_reading(reading);
        }

        // floor(last - first), the first reading having seeded
        assert_eq!(engine.running_total(), 251);
    }

    #[test]
    fn test_first_reading_never_produces_a_delta() {
        let mut engine = AccrualEngine::new(42);
        assert_eq!(engine.on_reading(987_654.0), None);
        assert_eq!(engine.running_total(), 42);
    }

    #[test]
    fn test_duplicate_reading_is_a_no_op() {
        let mut engine = AccrualEngine::new(0);
        engine.on_reading(1000.0);
        assert_eq!(
            engine.on_reading(1005.0),
            Some(Accrual { delta: 5, running_total: 5 })
        );
        assert_eq!(engine.on_reading(1005.0), None);
        assert_eq!(engine.running_total(), 5);
    }

    #[test]
    fn test_reset_is_absorbed_without_decreasing_total() {
        let mut engine = AccrualEngine::new(0);
        engine.on_reading(1000.0);
        engine.on_reading(1010.0);
        assert_eq!(engine.running_total(), 10);

        // Counter rebooted
        assert_eq!(engine.on_reading(2.0), None);
        assert_eq!(engine.running_total(), 10);

        // Counting resumes from the reset point
        assert_eq!(
            engine.on_reading(6.0),
            Some(Accrual { delta: 4, running_total: 14 })
        );
    }

    #[test]
    fn test_reset_scenario_undercounts_across_the_reset() {
        let mut engine = AccrualEngine::new(0);

        let deltas: Vec<Option<u64>> = [500.0, 3.0, 10.0]
            .iter()
            .map(|r| engine.on_reading(*r).map(|a| a.delta))
            .collect();

        assert_eq!(deltas, vec![None, None, Some(7)]);
        assert_eq!(engine.running_total(), 7);
    }

    #[test]
    fn test_malformed_readings_take_the_absorb_path() {
        let mut engine = AccrualEngine::new(0);
        engine.on_reading(100.0);

        assert_eq!(engine.on_reading(f64::NAN), None);
        assert_eq!(engine.on_reading(f64::NEG_INFINITY), None);
        assert_eq!(engine.on_reading(-5.0), None);

        // Subtrahend untouched by the malformed inputs
        assert_eq!(
            engine.on_reading(103.0),
            Some(Accrual { delta: 3, running_total: 3 })
        );
    }

    #[test]
    fn test_fractional_progress_below_one_step_is_deferred() {
        let mut engine = AccrualEngine::new(0);
        engine.on_reading(10.0);
        assert_eq!(engine.on_reading(10.6), None);
        assert_eq!(
            engine.on_reading(12.0),
            Some(Accrual { delta: 2, running_total: 2 })
        );
    }

    #[tokio::test]
    async fn test_accrual_loop_fans_out_to_store_and_sink() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CounterStore::open(&StoreConfig {
                path: dir.path().join("steps.db"),
            })
            .unwrap(),
        );

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stepCounts")
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let sink = Arc::new(
            RemoteSink::new(&SyncConfig {
                enabled: true,
                endpoint: server.url(),
                collection: "stepCounts".to_string(),
                user_id: "user123".to_string(),
                timeout_secs: 5,
            })
            .unwrap(),
        );

        let bus = Arc::new(EventBus::new(64));
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut accruals = bus.subscribe_accruals();

        let engine = AccrualEngine::new(0);
        let task = tokio::spawn(run_accrual(
            engine,
            bus.clone(),
            store.clone(),
            sink,
            shutdown_tx.subscribe(),
        ));

        // Give the loop a moment to subscribe before publishing
        tokio::time::sleep(Duration::from_millis(50)).await;

        for cumulative in [1000.0, 1000.0, 1005.0, 1005.0, 1007.0] {
            bus.publish_reading(StepReading::new("pedometer-1", SourceKind::StepCounter, cumulative));
        }

        let first = accruals.recv().await.unwrap();
        assert_eq!(first.delta, 5);
        assert_eq!(first.running_total, 5);

        let second = accruals.recv().await.unwrap();
        assert_eq!(second.delta, 2);
        assert_eq!(second.running_total, 7);

        // Local slot reflects the latest accepted total
        assert_eq!(store.load().unwrap(), 7);

        // Exactly two documents appended, carrying totals not raw deltas
        tokio::time::sleep(Duration::from_millis(300)).await;
        mock.assert_async().await;

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_accrual_loop_ignores_non_counter_readings() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CounterStore::open(&StoreConfig {
                path: dir.path().join("steps.db"),
            })
            .unwrap(),
        );
        let sink = Arc::new(
            RemoteSink::new(&SyncConfig {
                enabled: false,
                ..SyncConfig::default()
            })
            .unwrap(),
        );

        let bus = Arc::new(EventBus::new(64));
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut accruals = bus.subscribe_accruals();

        let task = tokio::spawn(run_accrual(
            AccrualEngine::new(0),
            bus.clone(),
            store.clone(),
            sink,
            shutdown_tx.subscribe(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;

        // Detector events carry no cumulative total and must be filtered
        bus.publish_reading(StepReading::new("detector-1", SourceKind::StepDetector, 1.0));
        bus.publish_reading(StepReading::new("detector-1", SourceKind::StepDetector, 900.0));

        bus.publish_reading(StepReading::new("pedometer-1", SourceKind::StepCounter, 10.0));
        bus.publish_reading(StepReading::new("pedometer-1", SourceKind::StepCounter, 13.0));

        let update = accruals.recv().await.unwrap();
        assert_eq!(update.delta, 3);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
