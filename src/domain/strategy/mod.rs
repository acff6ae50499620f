//! Strategy interface and the shared backtest pipeline.
//!
//! A strategy contributes two steps, indicator computation and signal
//! generation. Accounting is written once in [`run`] against the trait.

pub mod bollinger;
pub mod macd;

pub use bollinger::BollingerStrategy;
pub use macd::MacdStrategy;

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::backtest::{self, BacktestConfig, BacktestResult};
use crate::domain::error::BacktestError;
use crate::domain::indicator::{IndicatorSeries, IndicatorValue};
use crate::domain::ohlcv::{PriceBar, validate_bars};
use crate::domain::signal::{DatedSignal, PositionPoint, signal_events};

pub trait Strategy {
    /// Short human-readable name, e.g. "MACD".
    fn name(&self) -> &str;

    /// Parameter summary for reports, e.g. "fast=12, slow=26, signal=9".
    fn describe(&self) -> String;

    /// Bars consumed before the first defined indicator value.
    fn warmup(&self) -> usize;

    fn compute_indicators(&self, bars: &[PriceBar]) -> Result<IndicatorSeries, BacktestError>;

    /// One position per date carrying a defined indicator value.
    fn generate_signals(
        &self,
        bars: &[PriceBar],
        indicators: &IndicatorSeries,
    ) -> Result<Vec<PositionPoint>, BacktestError>;
}

/// Everything produced by one pass of the pipeline.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub indicators: IndicatorSeries,
    pub positions: Vec<PositionPoint>,
    pub signals: Vec<DatedSignal>,
    pub result: BacktestResult,
}

pub fn run(
    strategy: &dyn Strategy,
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<StrategyRun, BacktestError> {
    validate_bars(bars)?;

    let indicators = strategy.compute_indicators(bars)?;
    tracing::debug!(
        indicator = %indicators.indicator_type,
        points = indicators.len(),
        "indicators computed"
    );

    let positions = strategy.generate_signals(bars, &indicators)?;
    let signals = signal_events(&positions);
    tracing::debug!(signals = signals.len(), "signals generated");

    let result = backtest::evaluate(bars, &positions, config)?;
    tracing::info!(
        strategy = strategy.name(),
        trades = result.summary.trade_count,
        total_return = result.summary.total_return,
        "backtest complete"
    );

    Ok(StrategyRun {
        indicators,
        positions,
        signals,
        result,
    })
}

/// Pair each indicator point with the close of the bar sharing its date.
pub(crate) fn align_closes<'a>(
    bars: &[PriceBar],
    indicators: &'a IndicatorSeries,
) -> Result<Vec<(NaiveDate, f64, &'a IndicatorValue)>, BacktestError> {
    let date_index: HashMap<NaiveDate, usize> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| (bar.date, i))
        .collect();

    indicators
        .values
        .iter()
        .map(|point| {
            date_index
                .get(&point.date)
                .map(|&i| (point.date, bars[i].close, &point.value))
                .ok_or_else(|| {
                    BacktestError::malformed(format!(
                        "indicator date {} has no matching price bar",
                        point.date
                    ))
                })
        })
        .collect()
}
