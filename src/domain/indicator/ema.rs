//! Moving-average primitives shared by MACD and Bollinger Bands.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//!
//! Both functions return only defined values: element 0 of the output
//! lines up with input index (n-1).

/// Exponential moving average. Empty when `period` is 0 or longer than the input.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema);

    for &x in &values[period..] {
        // Same recurrence, written so an unchanged input leaves EMA bit-identical.
        ema += k * (x - ema);
        out.push(ema);
    }
    out
}

/// Simple moving average over a sliding window.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}
