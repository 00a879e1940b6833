//! Sensor module - step sources and the activation gate

mod manager;
mod permission;
mod simulator;
mod traits;

pub use manager::SensorManager;
pub use permission::{ActivationGate, ActivationState, Permission};
pub use simulator::PedometerSimulator;
pub use traits::{RateClass, SourceHealth, SourceKind, SourceStatus, StepReading, StepSource};
