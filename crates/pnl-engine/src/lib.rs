//! P&L Engine
//!
//! Average-cost realized P&L and cumulative daily series for the positions,
//! symbols and accounts views.

pub mod average_cost;
pub mod reconstructor;
pub mod scope;
pub mod series;

pub use average_cost::{
    fold, AverageCostEngine, InventoryBook, InventoryState, RealizedPnlEvent, ShortSaleTreatment,
};
pub use reconstructor::{apply_unrealized, Reconstructor, UnrealizedSplit};
pub use scope::Scope;
pub use series::{ChartSeries, CumulativeSeries, SeriesPoint};
