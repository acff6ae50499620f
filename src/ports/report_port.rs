//! Report rendering port trait.

use std::path::Path;

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::strategy::StrategyRun;

/// Everything a renderer may draw. The backtest never depends on it.
pub struct ReportInput<'a> {
    pub ticker: &'a str,
    pub title: String,
    pub bars: &'a [PriceBar],
    pub run: &'a StrategyRun,
}

/// Port for writing a visual report of a finished run.
pub trait ReportPort {
    fn render(&self, input: &ReportInput<'_>, output_path: &Path) -> Result<(), BacktestError>;
}
