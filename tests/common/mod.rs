#![allow(dead_code)]

use chrono::NaiveDate;
use crossback::cli::RunArgs;
use crossback::domain::backtest::BacktestConfig;
use crossback::domain::error::BacktestError;
pub use crossback::domain::ohlcv::PriceBar;
use crossback::domain::ohlcv::{Frequency, resample};
use crossback::ports::data_port::DataPort;
use crossback::ports::report_port::{ReportInput, ReportPort};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(BacktestError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        let bars: Vec<PriceBar> = self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(BacktestError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no rows".into(),
            });
        }
        Ok(resample(&bars, frequency))
    }

    fn list_tickers(&self) -> Result<Vec<String>, BacktestError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Records render calls instead of writing files.
#[derive(Default)]
pub struct MockReportPort {
    pub rendered: RefCell<Vec<(PathBuf, String)>>,
}

impl ReportPort for MockReportPort {
    fn render(&self, input: &ReportInput<'_>, output_path: &Path) -> Result<(), BacktestError> {
        self.rendered
            .borrow_mut()
            .push((output_path.to_path_buf(), input.title.clone()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// One bar per calendar day starting at `start`.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start + chrono::Duration::days(i as i64), c))
        .collect()
}

/// Oscillating closes around 100 so both strategies trade.
pub fn wave_closes(count: usize, period: f64, amplitude: f64) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 + amplitude * (i as f64 * std::f64::consts::TAU / period).sin())
        .collect()
}

pub fn wave_bars(count: usize) -> Vec<PriceBar> {
    bars_from_closes(date(2023, 1, 1), &wave_closes(count, 40.0, 15.0))
}

pub fn run_args(ticker: &str) -> RunArgs {
    RunArgs {
        ticker: ticker.to_string(),
        no_chart: true,
        ..RunArgs::default()
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        ticker: "TEST".into(),
        ..BacktestConfig::default()
    }
}

pub fn write_csv(dir: &Path, ticker: &str, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{ticker}.csv")), content).unwrap();
}
