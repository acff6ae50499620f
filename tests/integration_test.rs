//! Integration tests for the backtest pipeline.
//!
//! Tests cover:
//! - Both strategies end to end through a mock data port
//! - The collapsed-band and constant-price scenarios
//! - Error propagation for short or missing data
//! - CSV files on disk through `CsvAdapter`
//! - The CLI pipeline with mock data and report ports

mod common;

use common::*;
use crossback::adapters::csv_adapter::CsvAdapter;
use crossback::cli::{RunArgs, format_summary, format_trades, run_pipeline};
use crossback::domain::error::BacktestError;
use crossback::domain::indicator::{BollingerParams, Deviation, IndicatorValue, MacdParams};
use crossback::domain::ohlcv::Frequency;
use crossback::domain::signal::{PositionState, SignalEvent};
use crossback::domain::strategy::{self, BollingerStrategy, MacdStrategy, Strategy};
use crossback::ports::data_port::DataPort;
use std::path::PathBuf;

fn count_exits(states: &[PositionState]) -> usize {
    states
        .windows(2)
        .filter(|w| w[0] == PositionState::Long && w[1] == PositionState::Flat)
        .count()
}

mod full_backtest_pipeline {
    use super::*;

    #[test]
    fn macd_pipeline_with_mock_data_port() {
        let port = MockDataPort::new().with_bars("WAVE", wave_bars(240));
        let bars = port
            .fetch_bars("WAVE", date(2023, 1, 1), date(2023, 12, 31), Frequency::Daily)
            .unwrap();
        assert_eq!(bars.len(), 240);

        let strat = MacdStrategy::default();
        let run = strategy::run(&strat, &bars, &sample_config()).unwrap();

        assert_eq!(run.indicators.len(), 240 - (strat.warmup() - 1));
        assert_eq!(run.positions.len(), run.indicators.len());
        assert_eq!(run.positions[0].date, bars[strat.warmup() - 1].date);
        assert_eq!(run.positions[0].state, PositionState::Flat);

        let states: Vec<PositionState> = run.positions.iter().map(|p| p.state).collect();
        assert!(run.result.summary.trade_count > 0);
        assert_eq!(count_exits(&states), run.result.trades.len());
        assert_eq!(run.result.equity_curve[0].equity, 1.0);

        // Buys and sells alternate, starting with a buy.
        for (i, s) in run.signals.iter().enumerate() {
            let expected = if i % 2 == 0 {
                SignalEvent::Buy
            } else {
                SignalEvent::Sell
            };
            assert_eq!(s.event, expected);
        }
    }

    #[test]
    fn bollinger_pipeline_with_mock_data_port() {
        let bars = wave_bars(200);
        let strat = BollingerStrategy::new(BollingerParams::default()).unwrap();
        let run = strategy::run(&strat, &bars, &sample_config()).unwrap();

        assert_eq!(run.indicators.len(), 200 - 19);
        for point in &run.indicators.values {
            match point.value {
                IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                    ..
                } => {
                    assert!(upper >= middle && middle >= lower);
                }
                _ => panic!("expected Bollinger values"),
            }
        }

        let states: Vec<PositionState> = run.positions.iter().map(|p| p.state).collect();
        assert_eq!(count_exits(&states), run.result.trades.len());
        if let Some(rate) = run.result.summary.win_rate {
            assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn rerunning_gives_identical_results() {
        let bars = wave_bars(150);
        let strat = MacdStrategy::new(MacdParams {
            fast: 5,
            slow: 13,
            signal: 4,
        })
        .unwrap();
        let first = strategy::run(&strat, &bars, &sample_config()).unwrap();
        let second = strategy::run(&strat, &bars, &sample_config()).unwrap();

        assert_eq!(first.positions, second.positions);
        assert_eq!(first.signals, second.signals);
        assert_eq!(first.result, second.result);
    }

    #[test]
    fn weekly_bars_shorten_the_series() {
        let port = MockDataPort::new().with_bars("WAVE", wave_bars(364));
        let weekly = port
            .fetch_bars("WAVE", date(2023, 1, 1), date(2023, 12, 31), Frequency::Weekly)
            .unwrap();
        assert!(weekly.len() <= 53);

        let strat = MacdStrategy::new(MacdParams {
            fast: 3,
            slow: 6,
            signal: 3,
        })
        .unwrap();
        let run = strategy::run(&strat, &weekly, &sample_config()).unwrap();
        assert_eq!(run.positions.len(), weekly.len() - 7);
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn collapsed_band_crosses_at_price_changes() {
        let closes = [10.0, 10.0, 10.0, 12.0, 9.0, 9.0, 13.0, 8.0];
        let bars = bars_from_closes(date(2024, 1, 1), &closes);
        let strat = BollingerStrategy::new(BollingerParams {
            window: 2,
            multiplier: 0.0,
            deviation: Deviation::Sample,
        })
        .unwrap();

        let run = strategy::run(&strat, &bars, &sample_config()).unwrap();
        assert_eq!(run.indicators.len(), 7);
        for point in &run.indicators.values {
            let IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
                percent_b,
            } = point.value
            else {
                panic!("expected Bollinger values");
            };
            assert_eq!(upper, middle);
            assert_eq!(lower, middle);
            assert_eq!(percent_b, None);
        }

        use PositionState::{Flat, Long};
        let states: Vec<PositionState> = run.positions.iter().map(|p| p.state).collect();
        assert_eq!(states, vec![Flat, Flat, Long, Long, Long, Flat, Flat]);

        let events: Vec<SignalEvent> = run.signals.iter().map(|s| s.event).collect();
        assert_eq!(events, vec![SignalEvent::Buy, SignalEvent::Sell]);
        assert_eq!(run.signals[0].date, date(2024, 1, 4));
        assert_eq!(run.signals[1].date, date(2024, 1, 7));

        assert_eq!(run.result.trades.len(), 1);
        let trade = &run.result.trades[0];
        assert_eq!((trade.entry_price, trade.exit_price), (12.0, 13.0));
        assert_eq!(run.result.summary.win_rate, Some(1.0));
        assert!(run.result.open_position.is_none());
        approx::assert_relative_eq!(
            run.result.summary.total_return,
            13.0 / 12.0 - 1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn constant_prices_never_trade() {
        let bars = bars_from_closes(date(2024, 1, 1), &[100.0; 80]);
        let run = strategy::run(&MacdStrategy::default(), &bars, &sample_config()).unwrap();

        for point in &run.indicators.values {
            let IndicatorValue::Macd { line, signal, .. } = point.value else {
                panic!("expected MACD values");
            };
            assert_eq!(line, 0.0);
            assert_eq!(signal, 0.0);
        }
        assert!(run.signals.is_empty());
        assert_eq!(run.result.summary.total_return, 0.0);
        assert_eq!(run.result.summary.trade_count, 0);
    }

    #[test]
    fn position_open_at_the_end_is_reported_separately() {
        // Accelerating fall, then an accelerating rally into the last bar.
        let mut closes: Vec<f64> = (0..40).map(|i| 200.0 - (i * i) as f64 / 10.0).collect();
        closes.extend((1..=20).map(|i| 47.9 + (i * i) as f64 * 0.5));
        let bars = bars_from_closes(date(2024, 1, 1), &closes);
        let strat = MacdStrategy::new(MacdParams {
            fast: 3,
            slow: 6,
            signal: 3,
        })
        .unwrap();

        let run = strategy::run(&strat, &bars, &sample_config()).unwrap();
        assert_eq!(
            run.positions.last().map(|p| p.state),
            Some(PositionState::Long)
        );
        let open = run.result.open_position.as_ref().unwrap();
        assert_eq!(open.last_price, *closes.last().unwrap());
        assert!(open.unrealized_return > 0.0);
        assert!(run.result.summary.total_return > 0.0);
        assert_eq!(
            run.result.summary.trade_count,
            run.signals
                .iter()
                .filter(|s| s.event == SignalEvent::Sell)
                .count()
        );
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn too_few_bars_is_insufficient_history() {
        let bars = bars_from_closes(date(2024, 1, 1), &[10.0; 33]);
        let result = strategy::run(&MacdStrategy::default(), &bars, &sample_config());
        match result {
            Err(BacktestError::InsufficientHistory { bars, required, .. }) => {
                assert_eq!(bars, 33);
                assert_eq!(required, 34);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[test]
    fn empty_series_is_insufficient_history() {
        let strat = BollingerStrategy::default();
        assert!(matches!(
            strategy::run(&strat, &[], &sample_config()),
            Err(BacktestError::InsufficientHistory { bars: 0, .. })
        ));
    }

    #[test]
    fn data_port_error_propagates() {
        let port = MockDataPort::new().with_error("BAD", "vendor offline");
        let report = MockReportPort::default();
        let config = crossback::adapters::file_config_adapter::FileConfigAdapter::from_string("")
            .unwrap();

        let result = run_pipeline(
            &MacdStrategy::default(),
            &run_args("BAD"),
            &config,
            &port,
            &report,
        );
        assert!(matches!(result, Err(BacktestError::DataUnavailable { .. })));
        assert!(report.rendered.borrow().is_empty());
    }
}

mod csv_end_to_end {
    use super::*;

    #[test]
    fn csv_file_through_both_strategies() {
        let dir = tempfile::TempDir::new().unwrap();
        let bars = wave_bars(180);
        write_csv(dir.path(), "601318", &bars);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        assert_eq!(adapter.list_tickers().unwrap(), vec!["601318"]);

        let loaded = adapter
            .fetch_bars("601318", date(2023, 1, 1), date(2023, 12, 31), Frequency::Daily)
            .unwrap();
        assert_eq!(loaded.len(), 180);

        let macd = strategy::run(&MacdStrategy::default(), &loaded, &sample_config()).unwrap();
        let boll = strategy::run(&BollingerStrategy::default(), &loaded, &sample_config()).unwrap();
        assert_eq!(macd.positions.len(), 180 - 33);
        assert_eq!(boll.positions.len(), 180 - 19);
    }

    #[test]
    fn date_range_is_inclusive() {
        let dir = tempfile::TempDir::new().unwrap();
        write_csv(dir.path(), "X", &wave_bars(30));
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let bars = adapter
            .fetch_bars("X", date(2023, 1, 5), date(2023, 1, 10), Frequency::Daily)
            .unwrap();
        assert_eq!(bars.len(), 6);
        assert_eq!(bars[0].date, date(2023, 1, 5));
        assert_eq!(bars[5].date, date(2023, 1, 10));
    }
}

mod cli_pipeline {
    use super::*;
    use crossback::adapters::file_config_adapter::FileConfigAdapter;

    fn empty_config() -> FileConfigAdapter {
        FileConfigAdapter::from_string("").unwrap()
    }

    #[test]
    fn pipeline_renders_chart_when_requested() {
        let port = MockDataPort::new().with_bars("WAVE", wave_bars(120));
        let report = MockReportPort::default();
        let args = RunArgs {
            ticker: "WAVE".into(),
            chart: Some(PathBuf::from("wave.svg")),
            ..RunArgs::default()
        };

        let run = run_pipeline(
            &MacdStrategy::default(),
            &args,
            &empty_config(),
            &port,
            &report,
        )
        .unwrap();
        assert_eq!(run.positions.len(), 120 - 33);

        let rendered = report.rendered.borrow();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].0, PathBuf::from("wave.svg"));
        assert!(rendered[0].1.contains("WAVE MACD"));
    }

    #[test]
    fn pipeline_skips_chart_with_no_chart() {
        let port = MockDataPort::new().with_bars("WAVE", wave_bars(120));
        let report = MockReportPort::default();

        run_pipeline(
            &BollingerStrategy::default(),
            &run_args("WAVE"),
            &empty_config(),
            &port,
            &report,
        )
        .unwrap();
        assert!(report.rendered.borrow().is_empty());
    }

    #[test]
    fn pipeline_respects_date_flags() {
        let port = MockDataPort::new().with_bars("WAVE", wave_bars(200));
        let report = MockReportPort::default();
        let args = RunArgs {
            start: Some(date(2023, 2, 1)),
            end: Some(date(2023, 4, 30)),
            ..run_args("WAVE")
        };

        let run = run_pipeline(
            &BollingerStrategy::default(),
            &args,
            &empty_config(),
            &port,
            &report,
        )
        .unwrap();
        // Feb 1 to Apr 30 2023 is 89 days.
        assert_eq!(run.positions.len(), 89 - 19);
        assert_eq!(run.positions[0].date, date(2023, 2, 20));
    }

    #[test]
    fn summary_and_trade_listing() {
        let bars = wave_bars(240);
        let strat = MacdStrategy::default();
        let config = sample_config();
        let run = strategy::run(&strat, &bars, &config).unwrap();

        let summary = format_summary(&strat, &config, &run);
        assert!(summary.contains("=== MACD Backtest Summary ==="));
        assert!(summary.contains("fast=12, slow=26, signal=9"));
        assert!(summary.contains("Initial Capital:  100000.00"));
        assert!(summary.contains(&format!(
            "Completed Trades: {}",
            run.result.summary.trade_count
        )));

        let trades = format_trades(&run);
        assert!(trades.contains("=== Trades ==="));
        assert_eq!(
            trades.lines().filter(|l| l.contains("->")).count(),
            run.result.trades.len()
        );
    }

    #[test]
    fn summary_without_trades_shows_sentinel() {
        let bars = bars_from_closes(date(2024, 1, 1), &[100.0; 40]);
        let strat = MacdStrategy::default();
        let config = sample_config();
        let run = strategy::run(&strat, &bars, &config).unwrap();

        let summary = format_summary(&strat, &config, &run);
        assert!(summary.contains("Win Rate:         n/a"));
        assert!(format_trades(&run).contains("(none)"));
    }
}
