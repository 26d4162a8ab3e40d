//! SVG line charts comparing one metric across runs.
//!
//! Output is deterministic: coordinates are printed with two decimals and
//! curves keep the order they were supplied in.

use std::fmt::Write as _;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 220.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

/// One run's curve: `(step, value)` pairs in event order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotCurve {
    pub label: String,
    pub points: Vec<(i64, f64)>,
}

/// Axis bounds of a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Bounds {
    fn of(curves: &[PlotCurve]) -> Option<Self> {
        let mut points = curves.iter().flat_map(|c| c.points.iter());
        let &(step, value) = points.next()?;
        let mut b = Bounds {
            x_min: step as f64,
            x_max: step as f64,
            y_min: value,
            y_max: value,
        };
        for &(step, value) in points {
            b.x_min = b.x_min.min(step as f64);
            b.x_max = b.x_max.max(step as f64);
            b.y_min = b.y_min.min(value);
            b.y_max = b.y_max.max(value);
        }
        // Flat ranges still need a drawable extent.
        if b.x_max == b.x_min {
            b.x_max = b.x_min + 1.0;
        }
        if b.y_max == b.y_min {
            b.y_min -= 0.5;
            b.y_max += 0.5;
        }
        Some(b)
    }

    fn project(&self, step: i64, value: f64) -> (f64, f64) {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let x = MARGIN_LEFT + (step as f64 - self.x_min) / (self.x_max - self.x_min) * plot_w;
        let y = MARGIN_TOP + (self.y_max - value) / (self.y_max - self.y_min) * plot_h;
        (x, y)
    }
}

/// Render a comparison chart with one polyline per curve.
///
/// Curves without points are skipped; if none has points the chart only
/// carries its title and a "no data" notice.
pub fn render_comparison_svg(title: &str, x_label: &str, y_label: &str, curves: &[PlotCurve]) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="28" font-size="16" text-anchor="middle">{}</text>"#,
        (WIDTH - MARGIN_RIGHT + MARGIN_LEFT) / 2.0,
        escape(title)
    );

    let drawable: Vec<&PlotCurve> = curves.iter().filter(|c| !c.points.is_empty()).collect();
    let Some(bounds) = Bounds::of(curves) else {
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">no data</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        svg.push_str("</svg>\n");
        return svg;
    };

    write_axes(&mut svg, &bounds, x_label, y_label);

    for (idx, curve) in drawable.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let coords: Vec<String> = curve
            .points
            .iter()
            .map(|&(step, value)| {
                let (x, y) = bounds.project(step, value);
                format!("{x:.2},{y:.2}")
            })
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" stroke-opacity="0.7" points="{}"/>"#,
            coords.join(" ")
        );

        let legend_y = MARGIN_TOP + 10.0 + idx as f64 * 20.0;
        let legend_x = WIDTH - MARGIN_RIGHT + 20.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{legend_x:.2}" y1="{legend_y:.2}" x2="{:.2}" y2="{legend_y:.2}" stroke="{color}" stroke-width="3"/>"#,
            legend_x + 20.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}">{}</text>"#,
            legend_x + 26.0,
            legend_y + 4.0,
            escape(&curve.label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn write_axes(svg: &mut String, bounds: &Bounds, x_label: &str, y_label: &str) {
    let left = MARGIN_LEFT;
    let right = WIDTH - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = HEIGHT - MARGIN_BOTTOM;

    let _ = writeln!(
        svg,
        r##"<g stroke="#cccccc" stroke-width="1"><line x1="{left:.2}" y1="{bottom:.2}" x2="{right:.2}" y2="{bottom:.2}"/><line x1="{left:.2}" y1="{top:.2}" x2="{left:.2}" y2="{bottom:.2}"/></g>"##
    );
    let _ = writeln!(
        svg,
        r#"<text x="{left:.2}" y="{:.2}" text-anchor="start">{}</text>"#,
        bottom + 18.0,
        bounds.x_min
    );
    let _ = writeln!(
        svg,
        r#"<text x="{right:.2}" y="{:.2}" text-anchor="end">{}</text>"#,
        bottom + 18.0,
        bounds.x_max
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" text-anchor="end">{:.2}</text>"#,
        left - 6.0,
        top + 4.0,
        bounds.y_max
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="{bottom:.2}" text-anchor="end">{:.2}</text>"#,
        left - 6.0,
        bounds.y_min
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
        (left + right) / 2.0,
        bottom + 40.0,
        escape(x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{:.2}" text-anchor="middle" transform="rotate(-90 20 {:.2})">{}</text>"#,
        (top + bottom) / 2.0,
        (top + bottom) / 2.0,
        escape(y_label)
    );
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
