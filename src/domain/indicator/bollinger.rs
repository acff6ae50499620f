//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1) unless
//! [`Deviation::Population`] is requested.
//!
//! Default parameters: window=20, multiplier=2.0
//! Warmup: window bars before the first defined point.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::BacktestError;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, sma,
};
use crate::domain::ohlcv::{PriceBar, closes};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deviation {
    #[default]
    Sample,
    Population,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::Sample => write!(f, "sample"),
            Deviation::Population => write!(f, "population"),
        }
    }
}

impl FromStr for Deviation {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sample" => Ok(Deviation::Sample),
            "population" => Ok(Deviation::Population),
            other => Err(BacktestError::invalid(format!(
                "unknown deviation '{other}' (expected sample or population)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerParams {
    pub window: usize,
    pub multiplier: f64,
    pub deviation: Deviation,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            multiplier: DEFAULT_MULTIPLIER,
            deviation: Deviation::Sample,
        }
    }
}

impl BollingerParams {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.window == 0 {
            return Err(BacktestError::invalid("Bollinger window must be positive"));
        }
        if self.deviation == Deviation::Sample && self.window < 2 {
            return Err(BacktestError::invalid(
                "Bollinger window must be at least 2 for sample deviation",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(BacktestError::invalid(format!(
                "Bollinger multiplier must be a non-negative number, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    pub fn warmup(&self) -> usize {
        self.window
    }

    pub fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            window: self.window,
            multiplier: self.multiplier,
        }
    }
}

pub fn calculate_bollinger(
    bars: &[PriceBar],
    params: &BollingerParams,
) -> Result<IndicatorSeries, BacktestError> {
    params.validate()?;

    let window = params.window;
    if bars.len() < window {
        return Err(BacktestError::InsufficientHistory {
            indicator: params.indicator_type().to_string(),
            bars: bars.len(),
            required: window,
        });
    }

    let prices = closes(bars);
    let middles = sma(&prices, window);
    let divisor = match params.deviation {
        Deviation::Sample => (window - 1) as f64,
        Deviation::Population => window as f64,
    };

    let values = prices
        .windows(window)
        .zip(middles)
        .enumerate()
        .map(|(k, (slice, middle))| {
            let variance = slice
                .iter()
                .map(|c| {
                    let diff = c - middle;
                    diff * diff
                })
                .sum::<f64>()
                / divisor;
            let width = params.multiplier * variance.sqrt();
            let upper = middle + width;
            let lower = middle - width;

            let bar = &bars[k + window - 1];
            let percent_b = if upper > lower {
                Some((bar.close - lower) / (upper - lower))
            } else {
                None
            };

            IndicatorPoint {
                date: bar.date,
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                    percent_b,
                },
            }
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type: params.indicator_type(),
        values,
    })
}
