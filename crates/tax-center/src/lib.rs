//! Tax Center
//!
//! Short/long-term classification of closed trades, estimated tax for a
//! selected bracket, wash sale detection and dividend totals per tax year.

pub mod report;
pub mod tax_calculator;
pub mod wash_sale;

pub use report::{
    available_years, dividend_events, dividend_rows, ClassifiedGroup, DividendRow, TaxReport,
    TaxSummary,
};
pub use tax_calculator::{
    GainBuckets, GainType, TaxBracket, TaxCalculator, TaxEstimate, TaxRules, DEFAULT_BRACKET,
    TAX_BRACKETS,
};
pub use wash_sale::{flags_for_year, WashSaleDetector, WashSaleFlag, WashSaleSummary};
