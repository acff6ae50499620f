//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single defined point in an indicator time series
//! - `IndicatorValue`: Enum for the different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A date-keyed series covering the post-warm-up dates
//!
//! A series never carries placeholder values for the warm-up window; its
//! first point is the first bar with a defined value.

pub mod bollinger;
pub mod ema;
pub mod macd;

pub use bollinger::{BollingerParams, Deviation, calculate_bollinger};
pub use ema::{ema, sma};
pub use macd::{MacdParams, calculate_macd};

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
        /// Position of the close inside the band; `None` when the band has no width.
        percent_b: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        window: usize,
        multiplier: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.values.first().map(|p| p.date)
    }

    /// Look up the value defined on `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<&IndicatorValue> {
        self.values
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| &self.values[i].value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { window, multiplier } => {
                write!(f, "BOLLINGER({},{})", window, multiplier)
            }
        }
    }
}
