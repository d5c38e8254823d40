//! dashboard-cli: print the options dashboard reports as JSON.
//!
//! Usage:
//!   cargo run -p dashboard-cli -- pnl                              # every account
//!   cargo run -p dashboard-cli -- pnl --account IRA [--symbol AAPL]
//!   cargo run -p dashboard-cli -- pnl --account IRA --by-symbol
//!   cargo run -p dashboard-cli -- taxes [--year 2024] [--bracket 24]
//!   cargo run -p dashboard-cli -- review
//!
//! Common flags: `--db <url>` overrides DATABASE_URL, `--today YYYY-MM-DD`
//! sets the as-of date.

mod config;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use config::DashboardConfig;
use ledger_core::{
    parse_date, JournalSource, PositionSource, TradeGroupSource, TransactionSource,
};
use ledger_store::LedgerDb;
use pnl_engine::{Reconstructor, Scope};
use serde::Serialize;
use serde_json::json;
use tax_center::{TaxReport, TaxRules};
use trade_review::WeeklyReview;

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the report, logs go to stderr
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "dashboard_cli=info,pnl_engine=info,tax_center=info,trade_review=info".into()
        })
    };
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(|s| s.as_str()) else {
        bail!("usage: dashboard-cli <pnl|taxes|review> [flags]");
    };

    let config = DashboardConfig::from_env()?;
    let database_url = flag(&args, "--db").unwrap_or(&config.database_url);

    let today = match flag(&args, "--today") {
        Some(raw) => parse_date(Some(raw)).with_context(|| format!("invalid --today date '{raw}'"))?,
        None => Local::now().date_naive(),
    };

    let db = LedgerDb::new(database_url)
        .await
        .with_context(|| format!("failed to open ledger database {database_url}"))?;
    tracing::info!(command, database_url, %today, "dashboard-cli starting");

    match command {
        "pnl" => run_pnl(&db, &config, &args, today).await,
        "taxes" => run_taxes(&db, &config, &args, today).await,
        "review" => run_review(&db, &config, today).await,
        other => bail!("unknown command '{other}', expected pnl, taxes or review"),
    }
}

async fn run_pnl(db: &LedgerDb, config: &DashboardConfig, args: &[String], today: NaiveDate) -> Result<()> {
    let account = flag(args, "--account");
    let symbol = flag(args, "--symbol");

    let events = db.trade_events(&config.accounts).await?;
    let snapshots = db.position_snapshots(&config.accounts).await?;
    let reconstructor = Reconstructor::new(config.short_sale_mode);

    if args.iter().any(|a| a == "--by-symbol") {
        let Some(account) = account else {
            bail!("--by-symbol needs --account");
        };
        let charts: serde_json::Map<String, serde_json::Value> = reconstructor
            .reconstruct_by_symbol(&events, &snapshots, account, today)
            .into_iter()
            .map(|(symbol, series)| -> Result<(String, serde_json::Value)> {
                Ok((symbol, serde_json::to_value(series.to_chart())?))
            })
            .collect::<Result<_>>()?;
        return print_json(&json!({ "account": account, "symbols": charts }));
    }

    let scope = match (account, symbol) {
        (Some(account), Some(symbol)) => Scope::symbol(account, symbol.to_uppercase()),
        (Some(account), None) => Scope::account(account),
        (None, None) => Scope::All,
        (None, Some(_)) => bail!("--symbol needs --account"),
    };

    let series = reconstructor.reconstruct(&events, &snapshots, &scope, today);
    tracing::info!(points = series.len(), total = %series.total(), "P&L series reconstructed");

    print_json(&json!({
        "scope": scope,
        "total": series.total(),
        "chart": series.to_chart(),
    }))
}

async fn run_taxes(db: &LedgerDb, config: &DashboardConfig, args: &[String], today: NaiveDate) -> Result<()> {
    let year: i32 = match flag(args, "--year") {
        Some(raw) => raw.parse().with_context(|| format!("invalid --year '{raw}'"))?,
        None => today.year(),
    };
    let bracket: u32 = match flag(args, "--bracket") {
        Some(raw) => raw.parse().with_context(|| format!("invalid --bracket '{raw}'"))?,
        None => config.tax_bracket,
    };

    let groups = db.closed_trade_groups(&config.accounts).await?;
    let ledger = db.trade_events(&config.accounts).await?;

    let report = TaxReport::build(&groups, &ledger, year, &TaxRules::us().with_bracket(bracket));
    print_json(&report)
}

async fn run_review(db: &LedgerDb, config: &DashboardConfig, today: NaiveDate) -> Result<()> {
    let groups = db.closed_trade_groups(&config.accounts).await?;
    let open_dates = db.group_open_dates(&config.accounts).await?;
    let journal = db.journal_entries(&config.accounts).await?;

    let review = WeeklyReview::compute(&groups, &open_dates, &journal, today);
    print_json(&review)
}
