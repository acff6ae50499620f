//! Performance summary statistics.

use crate::domain::backtest::{EquityPoint, TradeRecord};

const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// `None` when there are no completed trades.
    pub win_rate: Option<f64>,
    pub avg_trade_return: Option<f64>,
    pub best_trade: Option<f64>,
    pub worst_trade: Option<f64>,
}

impl Summary {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        initial_capital: f64,
    ) -> Self {
        let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(1.0);
        let total_return = final_equity - 1.0;

        let annualized_return = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => {
                let days = (last.date - first.date).num_days();
                if days > 0 && final_equity > 0.0 {
                    final_equity.powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        let trade_count = trades.len();
        let winning_trades = trades.iter().filter(|t| t.return_pct > 0.0).count();
        let losing_trades = trades.iter().filter(|t| t.return_pct < 0.0).count();

        let (win_rate, avg_trade_return) = if trade_count > 0 {
            let n = trade_count as f64;
            (
                Some(winning_trades as f64 / n),
                Some(trades.iter().map(|t| t.return_pct).sum::<f64>() / n),
            )
        } else {
            (None, None)
        };

        let best_trade = trades.iter().map(|t| t.return_pct).reduce(f64::max);
        let worst_trade = trades.iter().map(|t| t.return_pct).reduce(f64::min);

        Summary {
            initial_capital,
            final_capital: initial_capital * final_equity,
            total_return,
            annualized_return,
            max_drawdown: compute_drawdown(equity_curve),
            trade_count,
            winning_trades,
            losing_trades,
            win_rate,
            avg_trade_return,
            best_trade,
            worst_trade,
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}

/// Running maximum of the equity curve, used for drawdown charts.
pub fn running_peak(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|p| {
            peak = peak.max(p.equity);
            peak
        })
        .collect()
}
