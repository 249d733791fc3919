//! Inline SVG line and bar charts.
//!
//! Both charts share the same frame: fixed margins, five horizontal
//! gridlines, a y axis that always starts at zero and tick labels rounded to
//! whole numbers. Hover tooltips use SVG `<title>` elements so the markup
//! works without any script; line charts also carry their series as JSON in
//! `data-series` for the optional Chart.js upgrade on the page.

use crate::aggregate::Point;

const MARGIN_LEFT: f64 = 44.0;
const MARGIN_RIGHT: f64 = 10.0;
const MARGIN_TOP: f64 = 10.0;
const MARGIN_BOTTOM: f64 = 34.0;

const AXIS_COLOR: &str = "#9ca3af";
const GRID_COLOR: &str = "#e5e7eb";
const TICK_TEXT_COLOR: &str = "#6b7280";
const LABEL_COLOR: &str = "#374151";

/// Hours labelled under the 24-bar histogram.
const HOUR_TICKS: [usize; 5] = [0, 6, 12, 18, 23];

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub x_label: String,
    pub y_label: String,
    /// Distance in px from a point within which its tooltip shows.
    pub hover_radius: f64,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 720.0,
            height: 240.0,
            color: "#2563eb".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            hover_radius: 12.0,
        }
    }
}

struct Frame {
    width: f64,
    height: f64,
    w: f64,
    h: f64,
}

impl Frame {
    fn new(opts: &ChartOptions) -> Self {
        Self {
            width: opts.width,
            height: opts.height,
            w: (opts.width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            h: (opts.height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        }
    }

    fn bottom(&self) -> f64 {
        MARGIN_TOP + self.h
    }
}

struct Tick {
    pos: f64,
    label: String,
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// Coordinates with at most two decimals and no trailing zeros.
fn px(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn open_svg(frame: &Frame, kind: &str, extra_attrs: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="chart-svg {kind}" viewBox="0 0 {} {}" width="100%" height="100%" style="background:#fff"{extra_attrs}>"#,
        px(frame.width),
        px(frame.height),
    )
}

fn grid(frame: &Frame) -> String {
    let mut out = format!(r#"<g class="grid" stroke="{GRID_COLOR}" stroke-width="1" fill="none">"#);
    for i in 0..5 {
        let y = px(MARGIN_TOP + frame.h * i as f64 / 4.0);
        out.push_str(&format!(
            r#"<line x1="{}" x2="{}" y1="{y}" y2="{y}"/>"#,
            px(MARGIN_LEFT),
            px(MARGIN_LEFT + frame.w),
        ));
    }
    out.push_str("</g>");
    out
}

fn y_ticks(frame: &Frame, max: f64) -> Vec<Tick> {
    [0.0, 0.25, 0.5, 0.75, 1.0]
        .iter()
        .map(|frac| {
            let v = frac * max;
            Tick {
                pos: MARGIN_TOP + frame.h - v / max * frame.h,
                label: format!("{}", v.round()),
            }
        })
        .collect()
}

fn axes(frame: &Frame, x_ticks: &[Tick], y_ticks: &[Tick], opts: &ChartOptions) -> String {
    let (l, bottom) = (MARGIN_LEFT, frame.bottom());
    let mut out = format!(
        r#"<g class="axis" stroke="{AXIS_COLOR}" stroke-width="1" fill="none"><line x1="{l}" x2="{}" y1="{b}" y2="{b}"/><line x1="{l}" x2="{l}" y1="{t}" y2="{b}"/></g>"#,
        px(l + frame.w),
        l = px(l),
        b = px(bottom),
        t = px(MARGIN_TOP),
    );

    out.push_str(&format!(r#"<g class="labels" fill="{TICK_TEXT_COLOR}" font-size="10">"#));
    for t in x_ticks {
        let x = px(t.pos);
        out.push_str(&format!(
            r#"<g><line x1="{x}" x2="{x}" y1="{}" y2="{}" stroke="{AXIS_COLOR}"/><text x="{x}" y="{}" text-anchor="middle">{}</text></g>"#,
            px(bottom),
            px(bottom + 4.0),
            px(bottom + 14.0),
            escape(&t.label),
        ));
    }
    for t in y_ticks {
        let y = px(t.pos);
        out.push_str(&format!(
            r#"<g><line x1="{}" x2="{}" y1="{y}" y2="{y}" stroke="{AXIS_COLOR}"/><text x="{}" y="{}" text-anchor="end">{}</text></g>"#,
            px(l - 4.0),
            px(l),
            px(l - 6.0),
            px(t.pos + 3.0),
            escape(&t.label),
        ));
    }
    if !opts.x_label.is_empty() {
        out.push_str(&format!(
            r#"<text class="x-label" x="{}" y="{}" text-anchor="middle" fill="{LABEL_COLOR}" font-size="11">{}</text>"#,
            px(l + frame.w / 2.0),
            px(bottom + 28.0),
            escape(&opts.x_label),
        ));
    }
    if !opts.y_label.is_empty() {
        out.push_str(&format!(
            r#"<text class="y-label" transform="translate({} {}) rotate(-90)" text-anchor="middle" fill="{LABEL_COLOR}" font-size="11">{}</text>"#,
            px(l - 36.0),
            px(MARGIN_TOP + frame.h / 2.0),
            escape(&opts.y_label),
        ));
    }
    out.push_str("</g>");
    out
}

/// Indices that get an x tick: ends plus the middle once there are three or more points.
fn line_tick_indices(len: usize) -> Vec<usize> {
    match len {
        0 => vec![],
        1 => vec![0],
        2 => vec![0, 1],
        n => vec![0, n / 2, n - 1],
    }
}

pub fn line_chart(series: &[Point], opts: &ChartOptions) -> String {
    let frame = Frame::new(opts);
    let data = serde_json::to_string(series).unwrap_or_else(|_| "[]".to_string());
    let mut out = open_svg(&frame, "line", &format!(r#" data-series="{}""#, escape(&data)));

    if series.is_empty() {
        out.push_str("</svg>");
        return out;
    }

    let y_max = series.iter().map(|p| p.y).fold(1.0_f64, f64::max);
    let step = frame.w / ((series.len() - 1).max(1) as f64);
    let to_x = |i: usize| MARGIN_LEFT + i as f64 * step;
    let to_y = |v: f64| MARGIN_TOP + frame.h - v / y_max * frame.h;

    out.push_str(&grid(&frame));
    let x_ticks: Vec<Tick> = line_tick_indices(series.len())
        .into_iter()
        .map(|i| Tick {
            pos: to_x(i),
            label: series[i].x.clone(),
        })
        .collect();
    out.push_str(&axes(&frame, &x_ticks, &y_ticks(&frame, y_max), opts));

    let d: Vec<String> = series
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let cmd = if i == 0 { 'M' } else { 'L' };
            format!("{cmd} {} {}", px(to_x(i)), px(to_y(p.y)))
        })
        .collect();
    out.push_str(&format!(
        r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        d.join(" "),
        escape(&opts.color),
    ));

    out.push_str(r#"<g class="points">"#);
    for (i, p) in series.iter().enumerate() {
        let (cx, cy) = (px(to_x(i)), px(to_y(p.y)));
        out.push_str(&format!(
            r#"<g class="point"><title>{}: {}</title><circle class="hit" cx="{cx}" cy="{cy}" r="{}" fill="transparent"/><circle cx="{cx}" cy="{cy}" r="3" fill="{}"/></g>"#,
            escape(&p.x),
            p.y,
            px(opts.hover_radius),
            escape(&opts.color),
        ));
    }
    out.push_str("</g></svg>");
    out
}

pub fn bar_chart(values: &[Point], opts: &ChartOptions) -> String {
    let frame = Frame::new(opts);
    let mut out = open_svg(&frame, "bar", "");

    if values.is_empty() {
        out.push_str("</svg>");
        return out;
    }

    let max_v = values.iter().map(|p| p.y).fold(1.0_f64, f64::max);
    let bw = frame.w / values.len() as f64;
    let to_y = |v: f64| MARGIN_TOP + frame.h - v / max_v * frame.h;

    out.push_str(&grid(&frame));
    let x_ticks: Vec<Tick> = HOUR_TICKS
        .iter()
        .filter(|hr| **hr < values.len())
        .map(|hr| Tick {
            pos: MARGIN_LEFT + *hr as f64 * bw + bw / 2.0,
            label: hr.to_string(),
        })
        .collect();
    out.push_str(&axes(&frame, &x_ticks, &y_ticks(&frame, max_v), opts));

    out.push_str(&format!(r#"<g class="bars" fill="{}">"#, escape(&opts.color)));
    for (i, v) in values.iter().enumerate() {
        let y = to_y(v.y);
        out.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="2" data-label="{}" data-value="{}"><title>{}</title></rect>"#,
            px(MARGIN_LEFT + i as f64 * bw + 2.0),
            px(y),
            px((bw - 4.0).max(1.0)),
            px((frame.bottom() - y).max(0.0)),
            escape(&v.x),
            v.y,
            v.y,
        ));
    }
    out.push_str("</g></svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(ys: &[f64]) -> Vec<Point> {
        ys.iter()
            .enumerate()
            .map(|(i, y)| Point {
                x: format!("2025-06-{:02}", i + 1),
                y: *y,
            })
            .collect()
    }

    #[test]
    fn empty_line_chart_is_blank_canvas() {
        let svg = line_chart(&[], &ChartOptions::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("<path"));
        assert!(!svg.contains("class=\"grid\""));
    }

    #[test]
    fn line_chart_draws_point_per_sample() {
        let svg = line_chart(&pts(&[1.0, 4.0, 2.0, 8.0]), &ChartOptions::default());
        assert_eq!(svg.matches(r#"<g class="point">"#).count(), 4);
        assert!(svg.contains(r#"viewBox="0 0 720 240""#));
        // first point at the left margin, max value at the top margin
        assert!(svg.contains(r#"<path d="M 44 181.5 L"#));
        assert!(svg.contains(r#"L 710 10""#));
        assert!(svg.contains("<title>2025-06-04: 8</title>"));
        // five gridlines
        let grid = svg.split(r#"class="grid""#).nth(1).unwrap();
        assert_eq!(grid.split("</g>").next().unwrap().matches("<line").count(), 5);
    }

    #[test]
    fn line_chart_ticks_first_middle_last() {
        let svg = line_chart(&pts(&[1.0, 2.0, 3.0, 4.0, 5.0]), &ChartOptions::default());
        assert!(svg.contains(">2025-06-01</text>"));
        assert!(svg.contains(">2025-06-03</text>"));
        assert!(svg.contains(">2025-06-05</text>"));
        assert!(!svg.contains(">2025-06-02</text>"));

        let two = line_chart(&pts(&[1.0, 2.0]), &ChartOptions::default());
        assert!(two.contains(">2025-06-01</text>"));
        assert!(two.contains(">2025-06-02</text>"));
    }

    #[test]
    fn y_axis_starts_at_zero_with_floor_of_one() {
        let svg = line_chart(&pts(&[0.0, 0.0]), &ChartOptions::default());
        assert!(svg.contains(r#"text-anchor="end">0</text>"#));
        assert!(svg.contains(r#"text-anchor="end">1</text>"#));

        let big = line_chart(&pts(&[0.0, 400.0]), &ChartOptions::default());
        assert!(big.contains(r#"text-anchor="end">100</text>"#));
        assert!(big.contains(r#"text-anchor="end">400</text>"#));
    }

    #[test]
    fn line_chart_embeds_series_json() {
        let svg = line_chart(&pts(&[3.5]), &ChartOptions::default());
        assert!(svg.contains(
            r#"data-series="[{&quot;x&quot;:&quot;2025-06-01&quot;,&quot;y&quot;:3.5}]""#
        ));
    }

    #[test]
    fn bar_chart_has_bar_per_hour_and_hour_ticks() {
        let values: Vec<Point> = (0..24)
            .map(|h| Point {
                x: h.to_string(),
                y: h as f64,
            })
            .collect();
        let svg = bar_chart(&values, &ChartOptions::default());
        assert_eq!(svg.matches("<rect").count(), 24);
        for hr in ["0", "6", "12", "18", "23"] {
            assert!(svg.contains(&format!(r#"text-anchor="middle">{hr}</text>"#)));
        }
        assert!(!svg.contains(r#"text-anchor="middle">5</text>"#));
        assert!(svg.contains(r#"data-label="23" data-value="23"><title>23</title>"#));
    }

    #[test]
    fn zero_bars_have_no_height() {
        let values = vec![
            Point { x: "0".into(), y: 0.0 },
            Point { x: "1".into(), y: 2.0 },
        ];
        let svg = bar_chart(&values, &ChartOptions::default());
        assert!(svg.contains(r#"y="206" width="329" height="0""#));
        assert!(svg.contains(r#"y="10" width="329" height="196""#));
    }

    #[test]
    fn hit_circle_uses_hover_radius() {
        let svg = line_chart(&pts(&[1.0]), &ChartOptions::default());
        assert!(svg.contains(r#"<circle class="hit" cx="44" cy="10" r="12" fill="transparent"/>"#));

        let wide = line_chart(
            &pts(&[1.0, 2.0]),
            &ChartOptions {
                hover_radius: 20.0,
                ..Default::default()
            },
        );
        assert_eq!(wide.matches(r#"r="20" fill="transparent""#).count(), 2);
        assert!(!wide.contains(r#"r="12""#));
    }

    #[test]
    fn all_zero_bars_use_floor_of_one() {
        let values: Vec<Point> = (0..24)
            .map(|h| Point {
                x: h.to_string(),
                y: 0.0,
            })
            .collect();
        let svg = bar_chart(&values, &ChartOptions::default());
        // y max floors at 1: ticks run 0..1 and every bar sits on the baseline
        assert!(svg.contains(r#"text-anchor="end">0</text>"#));
        assert!(svg.contains(r#"text-anchor="end">1</text>"#));
        assert_eq!(svg.matches(r#"y="206" width="23.75" height="0""#).count(), 24);
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn text_is_escaped() {
        let svg = line_chart(
            &[Point { x: "<a&b>".into(), y: 1.0 }],
            &ChartOptions {
                y_label: "rides \"per\" day".into(),
                ..Default::default()
            },
        );
        assert!(svg.contains("&lt;a&amp;b&gt;"));
        assert!(svg.contains("rides &quot;per&quot; day"));
        assert!(!svg.contains("<a&b>"));
    }

    #[test]
    fn coordinates_are_compact() {
        assert_eq!(px(44.0), "44");
        assert_eq!(px(12.5), "12.5");
        assert_eq!(px(1.0 / 3.0), "0.33");
        assert_eq!(px(-0.001), "0");
    }
}
