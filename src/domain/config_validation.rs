//! Configuration validation.
//!
//! Every key is optional; a key that is present must hold a usable value.
//! Validation runs before any data is fetched.

use crate::domain::error::BacktestError;
use crate::domain::indicator::Deviation;
use crate::domain::ohlcv::Frequency;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_frequency(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_macd(config)?;
    validate_bollinger(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_value<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("expected {expected}, got '{raw}'"))),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(value) = parse_value::<f64>(config, "backtest", "initial_capital", "a number")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(())
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, BacktestError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(
            section,
            key,
            format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start = config
        .get_string("backtest", "start_date")
        .map(|s| parse_date(&s, "backtest", "start_date"))
        .transpose()?;
    let end = config
        .get_string("backtest", "end_date")
        .map(|s| parse_date(&s, "backtest", "end_date"))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

fn validate_frequency(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(raw) = config.get_string("data", "frequency") {
        raw.parse::<Frequency>()
            .map_err(|e| invalid("data", "frequency", e.to_string()))?;
    }
    Ok(())
}

fn validate_macd(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let mut periods = [None; 3];
    for (slot, key) in periods.iter_mut().zip(["fast", "slow", "signal"]) {
        if let Some(value) = parse_value::<i64>(config, "macd", key, "an integer")? {
            if value < 1 {
                return Err(invalid("macd", key, format!("{key} must be positive")));
            }
            *slot = Some(value);
        }
    }
    if let [Some(fast), Some(slow), _] = periods {
        if fast >= slow {
            return Err(invalid("macd", "fast", "fast must be shorter than slow"));
        }
    }
    Ok(())
}

fn validate_bollinger(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(window) = parse_value::<i64>(config, "bollinger", "window", "an integer")? {
        if window < 1 {
            return Err(invalid("bollinger", "window", "window must be positive"));
        }
    }
    if let Some(mult) = parse_value::<f64>(config, "bollinger", "multiplier", "a number")? {
        if !mult.is_finite() || mult < 0.0 {
            return Err(invalid(
                "bollinger",
                "multiplier",
                "multiplier must be non-negative",
            ));
        }
    }
    if let Some(raw) = config.get_string("bollinger", "deviation") {
        raw.parse::<Deviation>()
            .map_err(|e| invalid("bollinger", "deviation", e.to_string()))?;
    }
    Ok(())
}
