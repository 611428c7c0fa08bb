pub mod moments;
pub mod stats;

pub use moments::MomentTracker;
pub use stats::StatsHelper;
