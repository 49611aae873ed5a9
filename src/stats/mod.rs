//! Per-tag timing and stream statistics

pub mod metrics;
pub mod timing;

pub use metrics::DemuxStats;
pub use timing::{TagTiming, TimingTracker};
