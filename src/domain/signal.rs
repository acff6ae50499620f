//! Position state machine and crossing detection.
//!
//! States are FLAT and LONG; the initial state is FLAT. While FLAT only the
//! entry condition is evaluated, while LONG only the exit condition, so a
//! sequence can never open twice without closing in between.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Long => write!(f, "LONG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPoint {
    pub date: NaiveDate,
    pub state: PositionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedSignal {
    pub date: NaiveDate,
    pub event: SignalEvent,
}

/// `a` was at or below `b` yesterday and is strictly above it today.
pub fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// `a` was at or above `b` yesterday and is strictly below it today.
pub fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}

/// Run the FLAT/LONG state machine over `len` consecutive observations.
///
/// `entry(i)` and `exit(i)` are asked about observation `i` (always `i >= 1`,
/// since a crossing needs the previous observation). Observation 0 is FLAT.
pub fn run_state_machine<E, X>(
    dates: &[NaiveDate],
    mut entry: E,
    mut exit: X,
) -> Vec<PositionPoint>
where
    E: FnMut(usize) -> bool,
    X: FnMut(usize) -> bool,
{
    let mut state = PositionState::Flat;
    let mut out = Vec::with_capacity(dates.len());

    for (i, &date) in dates.iter().enumerate() {
        if i > 0 {
            state = match state {
                PositionState::Flat if entry(i) => PositionState::Long,
                PositionState::Long if exit(i) => PositionState::Flat,
                unchanged => unchanged,
            };
        }
        out.push(PositionPoint { date, state });
    }
    out
}

/// Buy/Sell events at every state transition.
pub fn signal_events(positions: &[PositionPoint]) -> Vec<DatedSignal> {
    positions
        .windows(2)
        .filter_map(|w| match (w[0].state, w[1].state) {
            (PositionState::Flat, PositionState::Long) => Some(DatedSignal {
                date: w[1].date,
                event: SignalEvent::Buy,
            }),
            (PositionState::Long, PositionState::Flat) => Some(DatedSignal {
                date: w[1].date,
                event: SignalEvent::Sell,
            }),
            _ => None,
        })
        .collect()
}
