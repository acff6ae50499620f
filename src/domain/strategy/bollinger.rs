//! Bollinger Bands mean-reversion strategy.
//!
//! Enter LONG when the close crosses back above the lower band from below
//! (oversold rebound). Return to FLAT when the close crosses above the upper
//! band (overbought). A close exactly on a band never counts as a cross.

use crate::domain::error::BacktestError;
use crate::domain::indicator::{
    BollingerParams, IndicatorSeries, IndicatorValue, calculate_bollinger,
};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{PositionPoint, crossed_above, run_state_machine};
use crate::domain::strategy::{Strategy, align_closes};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BollingerStrategy {
    pub params: BollingerParams,
}

impl BollingerStrategy {
    pub fn new(params: BollingerParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        "Bollinger"
    }

    fn describe(&self) -> String {
        format!(
            "window={}, multiplier={}, deviation={}",
            self.params.window, self.params.multiplier, self.params.deviation
        )
    }

    fn warmup(&self) -> usize {
        self.params.warmup()
    }

    fn compute_indicators(&self, bars: &[PriceBar]) -> Result<IndicatorSeries, BacktestError> {
        calculate_bollinger(bars, &self.params)
    }

    fn generate_signals(
        &self,
        bars: &[PriceBar],
        indicators: &IndicatorSeries,
    ) -> Result<Vec<PositionPoint>, BacktestError> {
        let aligned = align_closes(bars, indicators)?;

        let mut dates = Vec::with_capacity(aligned.len());
        let mut closes = Vec::with_capacity(aligned.len());
        let mut uppers = Vec::with_capacity(aligned.len());
        let mut lowers = Vec::with_capacity(aligned.len());
        for (date, close, value) in aligned {
            match *value {
                IndicatorValue::Bollinger { upper, lower, .. } => {
                    dates.push(date);
                    closes.push(close);
                    uppers.push(upper);
                    lowers.push(lower);
                }
                _ => {
                    return Err(BacktestError::malformed(format!(
                        "expected Bollinger values, got {}",
                        indicators.indicator_type
                    )));
                }
            }
        }

        Ok(run_state_machine(
            &dates,
            |i| crossed_above(closes[i - 1], lowers[i - 1], closes[i], lowers[i]),
            |i| crossed_above(closes[i - 1], uppers[i - 1], closes[i], uppers[i]),
        ))
    }
}
