use anyhow::{Context, Result};
use ledger_core::AccountFilter;
use pnl_engine::ShortSaleTreatment;
use serde::{Deserialize, Serialize};
use std::env;
use tax_center::DEFAULT_BRACKET;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub database_url: String,
    /// Ordinary income bracket in percent
    pub tax_bracket: u32,
    pub short_sale_mode: ShortSaleTreatment,
    /// Unset = every account, empty list = none
    pub accounts: AccountFilter,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tax_bracket = get("TAX_BRACKET")
            .unwrap_or_else(|| DEFAULT_BRACKET.to_string())
            .trim()
            .parse()
            .context("TAX_BRACKET must be a whole percentage")?;

        let short_sale_mode = match get("SHORT_SALE_MODE") {
            Some(raw) => ShortSaleTreatment::parse(&raw)
                .with_context(|| format!("SHORT_SALE_MODE must be 'proceeds' or 'track', got '{raw}'"))?,
            None => ShortSaleTreatment::default(),
        };

        let accounts = match get("ACCOUNTS") {
            Some(raw) => AccountFilter::Only(
                raw.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect(),
            ),
            None => AccountFilter::All,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite:ledger.db".to_string()),
            tax_bracket,
            short_sale_mode,
            accounts,
        })
    }
}
