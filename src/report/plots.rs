use chrono::{Datelike, NaiveDate};

use crate::analytics::types::{DerivedColumn, Metric};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 300.0;
const PADDING: f64 = 40.0;
const MARKET_COLOR: &str = "#333333";
const GRID_COLOR: &str = "#dddddd";
const PALETTE: [&str; 8] = [
    "#348dc1", "#ff9933", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

struct Extent {
    min: f64,
    max: f64,
}

impl Extent {
    fn from_values<'a>(values: impl Iterator<Item = &'a f64>, include: Option<f64>) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values.copied().chain(include).filter(|v| v.is_finite()) {
            min = min.min(value);
            max = max.max(value);
        }
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        if min == max {
            let widen = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
            min -= widen;
            max += widen;
        }
        Some(Self { min, max })
    }

    fn y(&self, value: f64) -> f64 {
        let norm = (value - self.min) / (self.max - self.min);
        PADDING + (1.0 - norm) * (HEIGHT - 2.0 * PADDING)
    }
}

/// Multi-series line chart over `dates`, one line per available column.
/// The last column is drawn as the market, dark and dashed. Columns whose
/// values are unavailable are left out of the chart and the legend.
pub fn line_chart(dates: &[NaiveDate], columns: &[DerivedColumn], title: &str, baseline: Option<f64>) -> String {
    let drawable: Vec<(usize, &DerivedColumn, &Vec<f64>)> = columns
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.values.as_ref().ok().map(|v| (i, c, v)))
        .collect();
    if dates.is_empty() || drawable.is_empty() {
        return wrap_plot(title, String::new());
    }

    let Some(extent) = Extent::from_values(drawable.iter().flat_map(|(_, _, v)| v.iter()), baseline) else {
        return wrap_plot(title, String::new());
    };
    let xs = x_positions(dates.len());
    let market_index = columns.len().saturating_sub(1);

    let mut svg = svg_header();
    if let Some(level) = baseline {
        svg.push_str(&horizontal_line(extent.y(level), "#bbbbbb", true));
    }
    add_y_labels(&mut svg, &extent);

    let mut legend = Vec::with_capacity(drawable.len());
    for (index, column, values) in &drawable {
        let is_market = *index == market_index;
        let color = if is_market { MARKET_COLOR } else { PALETTE[index % PALETTE.len()] };
        let points = xs
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_finite())
            .map(|(x, v)| format!("{x:.2},{:.2}", extent.y(*v)))
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" points="{points}" />"#,
            dash = if is_market { "4 3" } else { "0" },
        ));
        legend.push((column.name.as_str(), color, is_market));
    }

    add_time_axis(&mut svg, dates, &xs);
    draw_legend(&mut svg, &legend);
    svg.push_str("</svg>");
    wrap_plot(title, svg)
}

/// Vertical bars for one metric per label. Unavailable values get an empty
/// slot labelled `n/a`. `reference` draws a dashed guide, e.g. beta = 1.
pub fn bar_chart(bars: &[(String, Metric)], title: &str, reference: Option<f64>) -> String {
    let values: Vec<f64> = bars.iter().filter_map(|(_, m)| m.as_ref().ok().copied()).collect();
    let Some(extent) = Extent::from_values(values.iter().chain(reference.iter()), Some(0.0)) else {
        return wrap_plot(title, String::new());
    };

    let mut svg = svg_header();
    add_y_labels(&mut svg, &extent);

    let slot = (WIDTH - 2.0 * PADDING) / bars.len().max(1) as f64;
    let bar_width = slot * 0.6;
    let zero = extent.y(0.0);
    for (i, (label, metric)) in bars.iter().enumerate() {
        let center = PADDING + slot * (i as f64 + 0.5);
        match metric {
            Ok(value) => {
                let top = extent.y(*value).min(zero);
                let height = (extent.y(*value) - zero).abs();
                svg.push_str(&format!(
                    r#"<rect x="{x:.2}" y="{top:.2}" width="{bar_width:.2}" height="{height:.2}" fill="{color}"><title>{label}: {value:.3}</title></rect>"#,
                    x = center - bar_width / 2.0,
                    color = PALETTE[i % PALETTE.len()],
                    label = escape_html(label),
                ));
            }
            Err(reason) => {
                svg.push_str(&format!(
                    r##"<text x="{center:.2}" y="{y:.2}" text-anchor="middle" fill="#999"><title>{reason}</title>n/a</text>"##,
                    y = zero - 4.0,
                    reason = escape_html(&reason.to_string()),
                ));
            }
        }
        svg.push_str(&format!(
            r#"<text x="{center:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            y = HEIGHT - PADDING + 16.0,
            label = escape_html(label),
        ));
    }

    svg.push_str(&horizontal_line(zero, "#000000", false));
    if let Some(level) = reference {
        svg.push_str(&horizontal_line(extent.y(level), "#d62728", true));
    }
    svg.push_str("</svg>");
    wrap_plot(title, svg)
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn svg_header() -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style>"#
    )
}

fn wrap_plot(title: &str, svg: String) -> String {
    format!(
        r#"<div class="plot"><div class="plot-title">{title}</div>{svg}</div>"#,
        title = escape_html(title),
    )
}

fn horizontal_line(y: f64, color: &str, dashed: bool) -> String {
    format!(
        r#"<line x1="{PADDING:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1" stroke-dasharray="{dash}" />"#,
        x2 = WIDTH - PADDING,
        dash = if dashed { "4 3" } else { "0" },
    )
}

fn x_positions(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![WIDTH / 2.0];
    }
    let inner = WIDTH - 2.0 * PADDING;
    (0..len)
        .map(|i| PADDING + inner * (i as f64 / (len.saturating_sub(1) as f64).max(1.0)))
        .collect()
}

fn add_y_labels(svg: &mut String, extent: &Extent) {
    for step in 0..=4 {
        let value = extent.min + (extent.max - extent.min) * step as f64 / 4.0;
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{value:.2}</text>"#,
            x = PADDING - 4.0,
            y = extent.y(value) + 3.0,
        ));
    }
}

// One tick per month, labels thinned so they never overlap
fn add_time_axis(svg: &mut String, dates: &[NaiveDate], xs: &[f64]) {
    let axis_y = HEIGHT - PADDING + 5.0;
    svg.push_str(&format!(
        r##"<line x1="{PADDING:.2}" y1="{axis_y:.2}" x2="{x2:.2}" y2="{axis_y:.2}" stroke="#000" stroke-width="1" />"##,
        x2 = WIDTH - PADDING,
    ));

    let month_starts: Vec<usize> = dates
        .iter()
        .enumerate()
        .filter(|(i, d)| *i == 0 || (d.year(), d.month()) != (dates[i - 1].year(), dates[i - 1].month()))
        .map(|(i, _)| i)
        .collect();
    let stride = (month_starts.len() / 12).max(1);

    for &index in month_starts.iter().step_by(stride) {
        let x = xs[index];
        svg.push_str(&format!(
            r#"<line x1="{x:.2}" y1="{PADDING:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="{GRID_COLOR}" stroke-width="0.5" />"#,
            y2 = HEIGHT - PADDING,
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            y = axis_y + 14.0,
            label = dates[index].format("%Y-%m"),
        ));
    }
}

fn draw_legend(svg: &mut String, entries: &[(&str, &str, bool)]) {
    let x = PADDING + 10.0;
    let mut y = PADDING + 10.0;
    for (label, color, dashed) in entries {
        svg.push_str(&format!(
            r#"<line x1="{x:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y1:.2}" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" />"#,
            y1 = y - 4.0,
            x2 = x + 20.0,
            dash = if *dashed { "4 3" } else { "0" },
        ));
        svg.push_str(&format!(
            r##"<text x="{tx:.2}" y="{y:.2}" fill="#333">{label}</text>"##,
            tx = x + 26.0,
            label = escape_html(label),
        ));
        y += 14.0;
    }
}
