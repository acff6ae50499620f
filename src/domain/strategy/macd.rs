//! MACD golden-cross / death-cross strategy.
//!
//! Enter LONG when the MACD line crosses above the signal line, return to
//! FLAT when it crosses back below. Equal values never count as a cross.

use crate::domain::error::BacktestError;
use crate::domain::indicator::{IndicatorSeries, IndicatorValue, MacdParams, calculate_macd};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{PositionPoint, crossed_above, crossed_below, run_state_machine};
use crate::domain::strategy::{Strategy, align_closes};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacdStrategy {
    pub params: MacdParams,
}

impl MacdStrategy {
    pub fn new(params: MacdParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        "MACD"
    }

    fn describe(&self) -> String {
        format!(
            "fast={}, slow={}, signal={}",
            self.params.fast, self.params.slow, self.params.signal
        )
    }

    fn warmup(&self) -> usize {
        self.params.warmup()
    }

    fn compute_indicators(&self, bars: &[PriceBar]) -> Result<IndicatorSeries, BacktestError> {
        calculate_macd(bars, &self.params)
    }

    fn generate_signals(
        &self,
        bars: &[PriceBar],
        indicators: &IndicatorSeries,
    ) -> Result<Vec<PositionPoint>, BacktestError> {
        let aligned = align_closes(bars, indicators)?;

        let mut dates = Vec::with_capacity(aligned.len());
        let mut lines = Vec::with_capacity(aligned.len());
        let mut signals = Vec::with_capacity(aligned.len());
        for (date, _, value) in aligned {
            match *value {
                IndicatorValue::Macd { line, signal, .. } => {
                    dates.push(date);
                    lines.push(line);
                    signals.push(signal);
                }
                _ => {
                    return Err(BacktestError::malformed(format!(
                        "expected MACD values, got {}",
                        indicators.indicator_type
                    )));
                }
            }
        }

        Ok(run_state_machine(
            &dates,
            |i| crossed_above(lines[i - 1], signals[i - 1], lines[i], signals[i]),
            |i| crossed_below(lines[i - 1], signals[i - 1], lines[i], signals[i]),
        ))
    }
}
