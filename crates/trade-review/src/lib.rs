pub mod models;
pub mod weekly_review;

pub use models::*;
pub use weekly_review::{
    behavioral_anomalies, emotional_drift, most_consistent_strategy, strategy_stats, WeekBounds,
    MAX_ANOMALIES, RISKY_TAGS,
};
