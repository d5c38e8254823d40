//! Tax Calculator
//!
//! Holding-period classification, gain/loss buckets and the estimated tax
//! for one tax year.

use ledger_core::ClosedTradeGroup;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ordinary income bracket used by default
pub const DEFAULT_BRACKET: u32 = 22;

/// Federal ordinary-income brackets and the long-term capital gains rate
/// that applies in each, in percent.
pub const TAX_BRACKETS: [TaxBracket; 7] = [
    TaxBracket { rate: 10, lt_rate: 0 },
    TaxBracket { rate: 12, lt_rate: 0 },
    TaxBracket { rate: 22, lt_rate: 15 },
    TaxBracket { rate: 24, lt_rate: 15 },
    TaxBracket { rate: 32, lt_rate: 15 },
    TaxBracket { rate: 35, lt_rate: 15 },
    TaxBracket { rate: 37, lt_rate: 20 },
];

/// One ordinary-income bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Ordinary (short-term) rate in percent
    pub rate: u32,
    /// Long-term capital gains rate in percent
    pub lt_rate: u32,
}

impl TaxBracket {
    /// Bracket for an ordinary rate, falling back to the default bracket
    pub fn lookup(rate: u32) -> Self {
        TAX_BRACKETS
            .iter()
            .copied()
            .find(|b| b.rate == rate)
            .unwrap_or(Self {
                rate: DEFAULT_BRACKET,
                lt_rate: 15,
            })
    }

    pub fn label(&self) -> String {
        format!("{}%", self.rate)
    }

    pub fn short_term_rate(&self) -> Decimal {
        Decimal::from(self.rate) / Decimal::ONE_HUNDRED
    }

    pub fn long_term_rate(&self) -> Decimal {
        Decimal::from(self.lt_rate) / Decimal::ONE_HUNDRED
    }
}

impl Default for TaxBracket {
    fn default() -> Self {
        Self::lookup(DEFAULT_BRACKET)
    }
}

/// Tax rules applied to a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRules {
    /// Wash sale window in days (before and after)
    pub wash_sale_window_days: i64,
    /// Holding periods longer than this are long-term
    pub long_term_threshold_days: i64,
    /// Maximum net capital loss deductible in a year
    pub annual_loss_limit: Decimal,
    /// Selected income bracket
    pub bracket: TaxBracket,
}

impl TaxRules {
    /// US federal rules at the default bracket
    pub fn us() -> Self {
        Self {
            wash_sale_window_days: 30,
            long_term_threshold_days: 365,
            annual_loss_limit: Decimal::from(3000),
            bracket: TaxBracket::default(),
        }
    }

    pub fn with_bracket(mut self, rate: u32) -> Self {
        self.bracket = TaxBracket::lookup(rate);
        self
    }
}

impl Default for TaxRules {
    fn default() -> Self {
        Self::us()
    }
}

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainType {
    #[serde(rename = "Short-Term")]
    ShortTerm,
    #[serde(rename = "Long-Term")]
    LongTerm,
}

impl GainType {
    /// Exactly at the threshold is still short-term.
    pub fn classify(days_in_trade: i64, rules: &TaxRules) -> Self {
        if days_in_trade > rules.long_term_threshold_days {
            Self::LongTerm
        } else {
            Self::ShortTerm
        }
    }
}

impl std::fmt::Display for GainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GainType::ShortTerm => write!(f, "Short-Term"),
            GainType::LongTerm => write!(f, "Long-Term"),
        }
    }
}

/// Realized gains and losses by holding period. Loss sums are negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainBuckets {
    pub st_gains: Decimal,
    pub st_losses: Decimal,
    pub lt_gains: Decimal,
    pub lt_losses: Decimal,
}

impl GainBuckets {
    pub fn add(&mut self, gain_type: GainType, pnl: Decimal) {
        let positive = pnl > Decimal::ZERO;
        let negative = pnl < Decimal::ZERO;
        match gain_type {
            GainType::ShortTerm if positive => self.st_gains += pnl,
            GainType::ShortTerm if negative => self.st_losses += pnl,
            GainType::LongTerm if positive => self.lt_gains += pnl,
            GainType::LongTerm if negative => self.lt_losses += pnl,
            _ => {}
        }
    }

    pub fn net_short_term(&self) -> Decimal {
        self.st_gains + self.st_losses
    }

    pub fn net_long_term(&self) -> Decimal {
        self.lt_gains + self.lt_losses
    }

    pub fn net_total(&self) -> Decimal {
        self.net_short_term() + self.net_long_term()
    }
}

/// Estimated tax for one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxEstimate {
    pub short_term_tax: Decimal,
    pub long_term_tax: Decimal,
    /// Dividends are taxed at the ordinary rate
    pub dividend_tax: Decimal,
    pub total_tax: Decimal,
}

/// Tax calculator for one set of rules
pub struct TaxCalculator {
    rules: TaxRules,
}

impl TaxCalculator {
    pub fn new(rules: TaxRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TaxRules {
        &self.rules
    }

    pub fn classify(&self, group: &ClosedTradeGroup) -> GainType {
        GainType::classify(group.days_in_trade, &self.rules)
    }

    /// Sum closed groups into gain buckets
    pub fn buckets<'a, I>(&self, groups: I) -> GainBuckets
    where
        I: IntoIterator<Item = &'a ClosedTradeGroup>,
    {
        let mut buckets = GainBuckets::default();
        for group in groups {
            buckets.add(self.classify(group), group.total_pnl);
        }
        buckets
    }

    /// Deductible net loss, capped at the annual limit. Zero for a net gain.
    pub fn loss_deduction(&self, buckets: &GainBuckets) -> Decimal {
        let net = buckets.net_total();
        if net < Decimal::ZERO {
            net.abs().min(self.rules.annual_loss_limit)
        } else {
            Decimal::ZERO
        }
    }

    pub fn estimate(&self, buckets: &GainBuckets, total_dividends: Decimal) -> TaxEstimate {
        let st_rate = self.rules.bracket.short_term_rate();
        let lt_rate = self.rules.bracket.long_term_rate();

        let short_term_tax = buckets.net_short_term().max(Decimal::ZERO) * st_rate;
        let long_term_tax = buckets.net_long_term().max(Decimal::ZERO) * lt_rate;
        let dividend_tax = total_dividends.max(Decimal::ZERO) * st_rate;

        TaxEstimate {
            short_term_tax,
            long_term_tax,
            dividend_tax,
            total_tax: short_term_tax + long_term_tax + dividend_tax,
        }
    }
}
