use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One day of cumulative P&L
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub equity_cum: Decimal,
    pub options_cum: Decimal,
    pub dividends_cum: Decimal,
    /// Equity + options + dividends + other
    pub total_cum: Decimal,
}

/// Date-ordered cumulative P&L, at most one point per date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeSeries {
    pub points: Vec<SeriesPoint>,
}

impl CumulativeSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Final cumulative total, zero for an empty series
    pub fn total(&self) -> Decimal {
        self.last().map(|p| p.total_cum).unwrap_or(Decimal::ZERO)
    }

    /// Columnar shape consumed by the chart renderer
    pub fn to_chart(&self) -> ChartSeries {
        let mut chart = ChartSeries::default();
        for p in &self.points {
            chart.dates.push(p.date.format("%Y-%m-%d").to_string());
            chart.equity.push(p.equity_cum);
            chart.options.push(p.options_cum);
            chart.dividends.push(p.dividends_cum);
            chart.total.push(p.total_cum);
        }
        chart
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub dates: Vec<String>,
    pub equity: Vec<Decimal>,
    pub options: Vec<Decimal>,
    pub dividends: Vec<Decimal>,
    pub total: Vec<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_chart_shape() {
        let chart = CumulativeSeries::default().to_chart();
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dates": [], "equity": [], "options": [], "dividends": [], "total": []
            })
        );
    }

    #[test]
    fn test_chart_columns() {
        let series = CumulativeSeries {
            points: vec![SeriesPoint {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                equity_cum: dec!(50),
                options_cum: dec!(12.5),
                dividends_cum: dec!(0),
                total_cum: dec!(62.5),
            }],
        };

        let chart = series.to_chart();
        assert_eq!(chart.dates, vec!["2024-03-01".to_string()]);
        assert_eq!(chart.total, vec![dec!(62.5)]);
        assert_eq!(series.total(), dec!(62.5));
    }
}
