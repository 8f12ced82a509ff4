mod aggregate;
mod health;
mod recorder;
mod service;

pub use aggregate::MinuteAggregate;
pub use recorder::MetricsRecorder;
pub use service::PerformanceMonitor;
