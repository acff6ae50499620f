//! Standalone SVG chart of a finished run.
//!
//! Three stacked panels share one x axis (the bar index):
//! 1. close price with indicator overlays and buy/sell markers
//! 2. the indicator itself (MACD line/signal/histogram, or %B with guides)
//! 3. the equity curve with its running peak

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::domain::indicator::{IndicatorSeries, IndicatorValue};
use crate::domain::metrics::running_peak;
use crate::domain::signal::SignalEvent;
use crate::ports::report_port::{ReportInput, ReportPort};

const WIDTH: f64 = 960.0;
const PADDING: f64 = 50.0;
const TITLE_HEIGHT: f64 = 30.0;
const PANEL_GAP: f64 = 30.0;
const PRICE_HEIGHT: f64 = 280.0;
const INDICATOR_HEIGHT: f64 = 150.0;
const EQUITY_HEIGHT: f64 = 150.0;

const PRICE_COLOR: &str = "#1f2937";
const BAND_COLOR: &str = "#6366f1";
const LINE_COLOR: &str = "#2563eb";
const SIGNAL_COLOR: &str = "#f59e0b";
const BUY_COLOR: &str = "#16a34a";
const SELL_COLOR: &str = "#dc2626";
const GUIDE_COLOR: &str = "#9ca3af";
const FRAME_COLOR: &str = "#d1d5db";

#[derive(Debug, Default)]
pub struct SvgReportAdapter;

impl SvgReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for SvgReportAdapter {
    fn render(&self, input: &ReportInput<'_>, output_path: &Path) -> Result<(), BacktestError> {
        let svg = render_svg(input)?;
        fs::write(output_path, svg).map_err(|e| BacktestError::Render {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;
        tracing::info!(path = %output_path.display(), "chart written");
        Ok(())
    }
}

/// Vertical placement of one panel and the value range it maps.
struct Panel {
    top: f64,
    height: f64,
    min: f64,
    max: f64,
}

impl Panel {
    fn new(top: f64, height: f64, values: impl IntoIterator<Item = f64>) -> Self {
        let (mut min, mut max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() {
            min = 0.0;
            max = 1.0;
        }
        // 5% headroom; a flat series gets a unit range.
        let range = max - min;
        let pad = if range > 0.0 { range * 0.05 } else { 0.5 };
        Self {
            top,
            height,
            min: min - pad,
            max: max + pad,
        }
    }

    fn y(&self, value: f64) -> f64 {
        self.top + self.height - (value - self.min) / (self.max - self.min) * self.height
    }
}

struct XAxis {
    scale: f64,
    index: HashMap<NaiveDate, usize>,
}

impl XAxis {
    fn new(dates: impl Iterator<Item = NaiveDate>) -> Self {
        let index: HashMap<NaiveDate, usize> = dates.enumerate().map(|(i, d)| (d, i)).collect();
        let plot_width = WIDTH - 2.0 * PADDING;
        let scale = if index.len() > 1 {
            plot_width / (index.len() - 1) as f64
        } else {
            0.0
        };
        Self { scale, index }
    }

    fn at(&self, date: NaiveDate) -> Option<f64> {
        self.index
            .get(&date)
            .map(|&i| PADDING + i as f64 * self.scale)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn polyline(out: &mut String, points: &[(f64, f64)], color: &str, width: f64, dashed: bool) {
    if points.len() < 2 {
        return;
    }
    let coords: Vec<String> = points
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect();
    let dash = if dashed { r#" stroke-dasharray="4 3""# } else { "" };
    let _ = writeln!(
        out,
        r#"<polyline fill="none" stroke="{}" stroke-width="{}"{} points="{}"/>"#,
        color,
        width,
        dash,
        coords.join(" ")
    );
}

fn guide(out: &mut String, panel: &Panel, value: f64, label: &str) {
    let y = panel.y(value);
    let _ = writeln!(
        out,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-dasharray="2 3"/>"#,
        PADDING,
        y,
        WIDTH - PADDING,
        y,
        GUIDE_COLOR
    );
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" font-size="10" fill="{}" text-anchor="end">{}</text>"#,
        PADDING - 4.0,
        y + 3.0,
        GUIDE_COLOR,
        escape(label)
    );
}

fn frame(out: &mut String, panel: &Panel, caption: &str) {
    let _ = writeln!(
        out,
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="{}"/>"#,
        PADDING,
        panel.top,
        WIDTH - 2.0 * PADDING,
        panel.height,
        FRAME_COLOR
    );
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" font-size="12" fill="{}">{}</text>"#,
        PADDING + 4.0,
        panel.top + 14.0,
        PRICE_COLOR,
        escape(caption)
    );
}

fn marker(out: &mut String, x: f64, y: f64, event: SignalEvent) {
    // Buy triangles sit below the price and point up; sells sit above and point down.
    let (color, points) = match event {
        SignalEvent::Buy => (
            BUY_COLOR,
            format!(
                "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                x,
                y + 4.0,
                x - 5.0,
                y + 13.0,
                x + 5.0,
                y + 13.0
            ),
        ),
        SignalEvent::Sell => (
            SELL_COLOR,
            format!(
                "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                x,
                y - 4.0,
                x - 5.0,
                y - 13.0,
                x + 5.0,
                y - 13.0
            ),
        ),
    };
    let _ = writeln!(out, r#"<polygon fill="{}" points="{}"/>"#, color, points);
}

fn band_values(series: &IndicatorSeries) -> impl Iterator<Item = f64> + '_ {
    series.values.iter().flat_map(|p| match p.value {
        IndicatorValue::Bollinger {
            upper, lower, ..
        } => vec![upper, lower],
        IndicatorValue::Macd { .. } => Vec::new(),
    })
}

fn price_panel(out: &mut String, input: &ReportInput<'_>, axis: &XAxis, top: f64) {
    let indicators = &input.run.indicators;
    let panel = Panel::new(
        top,
        PRICE_HEIGHT,
        input.bars.iter().map(|b| b.close).chain(band_values(indicators)),
    );
    frame(out, &panel, &format!("{} close", input.ticker));

    let mut upper = Vec::new();
    let mut middle = Vec::new();
    let mut lower = Vec::new();
    for point in &indicators.values {
        let (Some(x), IndicatorValue::Bollinger { upper: u, middle: m, lower: l, .. }) =
            (axis.at(point.date), &point.value)
        else {
            continue;
        };
        upper.push((x, panel.y(*u)));
        middle.push((x, panel.y(*m)));
        lower.push((x, panel.y(*l)));
    }
    polyline(out, &upper, BAND_COLOR, 1.0, false);
    polyline(out, &middle, BAND_COLOR, 1.0, true);
    polyline(out, &lower, BAND_COLOR, 1.0, false);

    let closes: Vec<(f64, f64)> = input
        .bars
        .iter()
        .filter_map(|b| axis.at(b.date).map(|x| (x, panel.y(b.close))))
        .collect();
    polyline(out, &closes, PRICE_COLOR, 1.5, false);

    let close_on: HashMap<NaiveDate, f64> = input.bars.iter().map(|b| (b.date, b.close)).collect();
    for signal in &input.run.signals {
        if let (Some(x), Some(close)) = (axis.at(signal.date), close_on.get(&signal.date)) {
            marker(out, x, panel.y(*close), signal.event);
        }
    }
}

fn macd_panel(out: &mut String, series: &IndicatorSeries, axis: &XAxis, top: f64) {
    let panel = Panel::new(
        top,
        INDICATOR_HEIGHT,
        series
            .values
            .iter()
            .flat_map(|p| match p.value {
                IndicatorValue::Macd {
                    line,
                    signal,
                    histogram,
                } => vec![line, signal, histogram],
                IndicatorValue::Bollinger { .. } => Vec::new(),
            })
            .chain(std::iter::once(0.0)),
    );
    frame(out, &panel, &series.indicator_type.to_string());
    guide(out, &panel, 0.0, "0");

    let zero = panel.y(0.0);
    let bar_width = (axis.scale * 0.8).clamp(1.0, 8.0);
    let mut line_pts = Vec::new();
    let mut signal_pts = Vec::new();
    for point in &series.values {
        let (Some(x), IndicatorValue::Macd { line, signal, histogram }) =
            (axis.at(point.date), &point.value)
        else {
            continue;
        };
        let y = panel.y(*histogram);
        let color = if *histogram >= 0.0 { BUY_COLOR } else { SELL_COLOR };
        let _ = writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" opacity="0.5"/>"#,
            x - bar_width / 2.0,
            y.min(zero),
            bar_width,
            (y - zero).abs(),
            color
        );
        line_pts.push((x, panel.y(*line)));
        signal_pts.push((x, panel.y(*signal)));
    }
    polyline(out, &line_pts, LINE_COLOR, 1.2, false);
    polyline(out, &signal_pts, SIGNAL_COLOR, 1.2, false);
}

fn percent_b_panel(out: &mut String, series: &IndicatorSeries, axis: &XAxis, top: f64) {
    let panel = Panel::new(
        top,
        INDICATOR_HEIGHT,
        series
            .values
            .iter()
            .filter_map(|p| match p.value {
                IndicatorValue::Bollinger { percent_b, .. } => percent_b,
                IndicatorValue::Macd { .. } => None,
            })
            .chain([0.0, 1.0]),
    );
    frame(out, &panel, &format!("%B {}", series.indicator_type));
    for (value, label) in [(0.0, "0"), (0.5, "0.5"), (1.0, "1")] {
        guide(out, &panel, value, label);
    }

    // A zero-width band has no %B; break the line there.
    let mut segment = Vec::new();
    for point in &series.values {
        let value = match point.value {
            IndicatorValue::Bollinger { percent_b, .. } => percent_b,
            IndicatorValue::Macd { .. } => None,
        };
        match (axis.at(point.date), value) {
            (Some(x), Some(b)) => segment.push((x, panel.y(b))),
            _ => {
                polyline(out, &segment, BAND_COLOR, 1.2, false);
                segment.clear();
            }
        }
    }
    polyline(out, &segment, BAND_COLOR, 1.2, false);
}

fn equity_panel(out: &mut String, input: &ReportInput<'_>, axis: &XAxis, top: f64) {
    let curve = &input.run.result.equity_curve;
    let peaks = running_peak(curve);
    let panel = Panel::new(top, EQUITY_HEIGHT, curve.iter().map(|p| p.equity));
    frame(out, &panel, "Equity (start = 1.0)");
    if panel.min < 1.0 && panel.max > 1.0 {
        guide(out, &panel, 1.0, "1.0");
    }

    let mut equity_pts = Vec::new();
    let mut peak_pts = Vec::new();
    for (point, peak) in curve.iter().zip(&peaks) {
        if let Some(x) = axis.at(point.date) {
            equity_pts.push((x, panel.y(point.equity)));
            peak_pts.push((x, panel.y(*peak)));
        }
    }
    polyline(out, &peak_pts, GUIDE_COLOR, 1.0, true);
    polyline(out, &equity_pts, LINE_COLOR, 1.5, false);
}

/// Build the full SVG document.
pub fn render_svg(input: &ReportInput<'_>) -> Result<String, BacktestError> {
    if input.bars.is_empty() {
        return Err(BacktestError::Render {
            reason: "no price data to chart".into(),
        });
    }

    let axis = XAxis::new(input.bars.iter().map(|b| b.date));
    let price_top = TITLE_HEIGHT + PADDING / 2.0;
    let indicator_top = price_top + PRICE_HEIGHT + PANEL_GAP;
    let equity_top = indicator_top + INDICATOR_HEIGHT + PANEL_GAP;
    let height = equity_top + EQUITY_HEIGHT + PADDING;

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="sans-serif">"#,
        WIDTH, height, WIDTH, height
    );
    let _ = writeln!(
        out,
        r#"<rect width="100%" height="100%" fill="white"/>"#
    );
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" font-size="16" fill="{}">{}</text>"#,
        PADDING,
        TITLE_HEIGHT,
        PRICE_COLOR,
        escape(&input.title)
    );

    price_panel(&mut out, input, &axis, price_top);
    let indicators = &input.run.indicators;
    match indicators.values.first().map(|p| &p.value) {
        Some(IndicatorValue::Bollinger { .. }) => {
            percent_b_panel(&mut out, indicators, &axis, indicator_top)
        }
        _ => macd_panel(&mut out, indicators, &axis, indicator_top),
    }
    equity_panel(&mut out, input, &axis, equity_top);

    if let (Some(first), Some(last)) = (input.bars.first(), input.bars.last()) {
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="10" fill="{}">{}</text>"#,
            PADDING,
            height - PADDING / 2.0,
            GUIDE_COLOR,
            first.date
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="10" fill="{}" text-anchor="end">{}</text>"#,
            WIDTH - PADDING,
            height - PADDING / 2.0,
            GUIDE_COLOR,
            last.date
        );
    }

    out.push_str("</svg>\n");
    Ok(out)
}
