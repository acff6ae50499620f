//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow + signal - 1 bars before the first defined point.

use crate::domain::error::BacktestError;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, ema,
};
use crate::domain::ohlcv::{PriceBar, closes};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 {
            return Err(BacktestError::invalid(format!(
                "MACD periods must be positive (fast={}, slow={}, signal={})",
                self.fast, self.slow, self.signal
            )));
        }
        if self.fast >= self.slow {
            return Err(BacktestError::invalid(format!(
                "MACD fast period {} must be shorter than slow period {}",
                self.fast, self.slow
            )));
        }
        if self.slow.checked_add(self.signal).is_none() {
            return Err(BacktestError::invalid(format!(
                "MACD warm-up overflows (slow={}, signal={})",
                self.slow, self.signal
            )));
        }
        Ok(())
    }

    /// Number of bars consumed before the first defined MACD point.
    pub fn warmup(&self) -> usize {
        self.slow.saturating_add(self.signal) - 1
    }

    pub fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal,
        }
    }
}

pub fn calculate_macd(
    bars: &[PriceBar],
    params: &MacdParams,
) -> Result<IndicatorSeries, BacktestError> {
    params.validate()?;

    let warmup = params.warmup();
    if bars.len() < warmup {
        return Err(BacktestError::InsufficientHistory {
            indicator: params.indicator_type().to_string(),
            bars: bars.len(),
            required: warmup,
        });
    }

    let prices = closes(bars);
    let ema_fast = ema(&prices, params.fast);
    let ema_slow = ema(&prices, params.slow);

    // Both EMAs are defined from bar index slow-1 onward.
    let offset = params.slow - params.fast;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(j, slow)| ema_fast[j + offset] - slow)
        .collect();

    let signal_line = ema(&macd_line, params.signal);

    let values = signal_line
        .iter()
        .enumerate()
        .map(|(k, &signal)| {
            let line = macd_line[k + params.signal - 1];
            IndicatorPoint {
                date: bars[warmup - 1 + k].date,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type: params.indicator_type(),
        values,
    })
}
