//! Book reconstruction and derived metrics.

pub mod metrics;
pub mod scheduler;
pub mod state;

pub use metrics::{MetricsConfig, MetricsEngine, MetricsSnapshot, PriceLevel};
pub use scheduler::{Emission, EmissionReason, EmissionScheduler, SchedulerConfig};
pub use state::{BookState, BookStats};
