//! Backtest accounting over a position series.
//!
//! BacktestConfig defines the run parameters. `evaluate` walks the
//! position dates in order: while LONG on date t the close-to-close return
//! to the next position date accrues to the equity curve, otherwise nothing
//! does. The curve starts at exactly 1.0.
//!
//! A LONG position still open on the last date is not a completed trade.
//! It is reported separately as [`OpenPosition`], marked to the last close,
//! and its mark-to-market is part of the equity curve.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::error::BacktestError;
use crate::domain::metrics::Summary;
use crate::domain::ohlcv::{Frequency, PriceBar};
use crate::domain::signal::{PositionPoint, PositionState};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            ticker: String::new(),
            start_date: NaiveDate::MIN,
            end_date: NaiveDate::MAX,
            frequency: Frequency::Daily,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// One completed FLAT→LONG→FLAT cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Simple return as a fraction: exit / entry - 1.
    pub return_pct: f64,
}

impl TradeRecord {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub last_date: NaiveDate,
    pub last_price: f64,
    pub unrealized_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub open_position: Option<OpenPosition>,
    pub summary: Summary,
}

pub fn evaluate(
    bars: &[PriceBar],
    positions: &[PositionPoint],
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    if positions.is_empty() {
        return Err(BacktestError::malformed("no positions to evaluate"));
    }
    if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
        return Err(BacktestError::invalid(format!(
            "initial capital must be positive, got {}",
            config.initial_capital
        )));
    }

    let date_index: HashMap<NaiveDate, usize> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| (bar.date, i))
        .collect();

    let mut prices = Vec::with_capacity(positions.len());
    for (i, point) in positions.iter().enumerate() {
        if i > 0 && positions[i - 1].date >= point.date {
            return Err(BacktestError::malformed(format!(
                "position dates not strictly increasing at {}",
                point.date
            )));
        }
        let idx = date_index.get(&point.date).ok_or_else(|| {
            BacktestError::malformed(format!("no price bar for position date {}", point.date))
        })?;
        prices.push(bars[*idx].close);
    }

    let mut equity = 1.0_f64;
    let mut equity_curve = Vec::with_capacity(positions.len());
    equity_curve.push(EquityPoint {
        date: positions[0].date,
        equity,
    });
    for i in 1..positions.len() {
        if positions[i - 1].state == PositionState::Long {
            let daily = (prices[i] - prices[i - 1]) / prices[i - 1];
            equity *= 1.0 + daily;
        }
        equity_curve.push(EquityPoint {
            date: positions[i].date,
            equity,
        });
    }

    let mut trades = Vec::new();
    let mut entry: Option<(NaiveDate, f64)> = None;
    let mut prev_state = PositionState::Flat;
    for (point, &price) in positions.iter().zip(&prices) {
        match (prev_state, point.state) {
            (PositionState::Flat, PositionState::Long) => {
                entry = Some((point.date, price));
            }
            (PositionState::Long, PositionState::Flat) => {
                if let Some((entry_date, entry_price)) = entry.take() {
                    trades.push(TradeRecord {
                        entry_date,
                        exit_date: point.date,
                        entry_price,
                        exit_price: price,
                        return_pct: price / entry_price - 1.0,
                    });
                }
            }
            _ => {}
        }
        prev_state = point.state;
    }

    let open_position = entry.map(|(entry_date, entry_price)| {
        let last = positions.len() - 1;
        OpenPosition {
            entry_date,
            entry_price,
            last_date: positions[last].date,
            last_price: prices[last],
            unrealized_return: prices[last] / entry_price - 1.0,
        }
    });

    let summary = Summary::compute(&equity_curve, &trades, config.initial_capital);

    Ok(BacktestResult {
        equity_curve,
        trades,
        open_position,
        summary,
    })
}
