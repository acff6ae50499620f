//! Price bar representation and series hygiene.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar frequency requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            other => Err(BacktestError::invalid(format!(
                "unknown frequency '{other}' (expected daily, weekly or monthly)"
            ))),
        }
    }
}

/// Check that a bar sequence is usable: strictly increasing dates,
/// finite positive closes, finite prices and non-negative volume.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), BacktestError> {
    for (i, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(BacktestError::malformed(format!(
                "non-finite price on {}",
                bar.date
            )));
        }
        if bar.close <= 0.0 {
            return Err(BacktestError::malformed(format!(
                "non-positive close {} on {}",
                bar.close, bar.date
            )));
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(BacktestError::malformed(format!(
                "negative volume on {}",
                bar.date
            )));
        }
        if i > 0 && bars[i - 1].date >= bar.date {
            return Err(BacktestError::malformed(format!(
                "dates not strictly increasing at {} (previous {})",
                bar.date,
                bars[i - 1].date
            )));
        }
    }
    Ok(())
}

/// Aggregate daily bars into weekly (ISO week) or monthly bars.
///
/// Each output bar carries the date of the last trading day in its bucket.
pub fn resample(bars: &[PriceBar], frequency: Frequency) -> Vec<PriceBar> {
    let bucket = |date: NaiveDate| -> (i32, u32) {
        match frequency {
            Frequency::Daily => (date.year(), date.ordinal()),
            Frequency::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Frequency::Monthly => (date.year(), date.month()),
        }
    };

    if frequency == Frequency::Daily {
        return bars.to_vec();
    }

    let mut out: Vec<PriceBar> = Vec::new();
    let mut current: Option<(i32, u32)> = None;

    for bar in bars {
        let key = bucket(bar.date);
        match out.last_mut() {
            Some(agg) if current == Some(key) => {
                agg.date = bar.date;
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                out.push(bar.clone());
                current = Some(key);
            }
        }
    }
    out
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
