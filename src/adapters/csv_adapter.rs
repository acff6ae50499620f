//! CSV file data adapter.
//!
//! Each ticker lives in `<base_path>/<TICKER>.csv` with a header row naming
//! at least `date,open,high,low,close,volume` (any order, extra columns are
//! ignored). Dates are `YYYY-MM-DD`.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{Frequency, PriceBar, resample, validate_bars};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn parse_number(record: &csv::StringRecord, idx: usize, name: &str, line: u64) -> Result<f64, BacktestError> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|e| {
        BacktestError::malformed(format!("line {}: invalid {} value '{}': {}", line, name, raw, e))
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        let path = self.csv_path(ticker);
        tracing::debug!(path = %path.display(), "reading price file");
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| BacktestError::malformed(format!("CSV header error: {}", e)))?
            .clone();

        let mut idx = [0usize; 6];
        for (slot, name) in idx.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| BacktestError::malformed(format!("missing {} column", name)))?;
        }
        let [date_idx, open_idx, high_idx, low_idx, close_idx, volume_idx] = idx;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| BacktestError::malformed(format!("CSV parse error: {}", e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let date_str = record.get(date_idx).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                BacktestError::malformed(format!("line {}: invalid date '{}': {}", line, date_str, e))
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(PriceBar {
                date,
                open: parse_number(&record, open_idx, "open", line)?,
                high: parse_number(&record, high_idx, "high", line)?,
                low: parse_number(&record, low_idx, "low", line)?,
                close: parse_number(&record, close_idx, "close", line)?,
                volume: parse_number(&record, volume_idx, "volume", line)?,
            });
        }

        if bars.is_empty() {
            return Err(BacktestError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: format!("no rows between {} and {}", start_date, end_date),
            });
        }

        bars.sort_by_key(|b| b.date);
        validate_bars(&bars)?;

        let bars = resample(&bars, frequency);
        tracing::info!(ticker, bars = bars.len(), %frequency, "loaded price data");
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktestError::DataUnavailable {
            ticker: "*".into(),
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
