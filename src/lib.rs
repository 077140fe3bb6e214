pub mod clock;
pub mod config;
pub mod metrics;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use config::{AccumulatorConfig, ConfigError};
pub use metrics::{Accumulator, LastValueAccumulator, Metric, ResourceMetrics};
