//! Market data access port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{Frequency, PriceBar};
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `ticker` between `start_date` and `end_date` inclusive,
    /// ordered by date.
    ///
    /// An unknown ticker or an empty range is `DataUnavailable`; rows that
    /// cannot be parsed are `MalformedData`.
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<PriceBar>, BacktestError>;

    fn list_tickers(&self) -> Result<Vec<String>, BacktestError>;
}
