//! Swimlane rendering.
//!
//! Turns per-user interval forests into one standalone SVG document:
//! users stacked vertically in id order, one row per nesting depth, box
//! width proportional to duration, fill alternating by depth parity and
//! switching to the failure palette when a scope failed. Rendering is a
//! pure transformation and cannot fail; malformed input is rejected
//! earlier, when the log is loaded.

use std::fmt::Write;

use crate::forest::ActorForest;

/// Geometry and typography knobs for the diagram.
#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Horizontal scale in pixels per second.
    pub px_per_second: f64,
    /// Height of one nesting row in pixels.
    pub row_height: f64,
    /// Width of the left gutter carrying the user labels.
    pub gutter_width: f64,
    /// Label font size in pixels.
    pub font_size: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            px_per_second: 50.0,
            row_height: 28.0,
            gutter_width: 80.0,
            font_size: 12.0,
        }
    }
}

// Depth-parity tones; the failure palette replaces both when a scope
// failed.
const SUCCESS_FILLS: [&str; 2] = ["#4e79a7", "#86b0d2"];
const FAILURE_FILLS: [&str; 2] = ["#e15759", "#f19c9d"];
const BAR_STROKE: &str = "#22303f";
const LABEL_COLOR: &str = "#ffffff";
const GUTTER_COLOR: &str = "#22303f";

/// Human-readable duration: whole seconds once the interval reaches ten
/// seconds, whole milliseconds below that.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds >= 10.0 {
        format!("{} s", seconds.round() as i64)
    } else {
        format!("{} ms", (seconds * 1000.0).round() as i64)
    }
}

/// Renders every user's forest into one SVG document.
#[must_use]
pub fn render_svg(forests: &[ActorForest], options: &SvgOptions) -> String {
    let mut out = String::new();
    render_into(&mut out, forests, options).expect("formatting into a String cannot fail");
    out
}

fn render_into(
    out: &mut String,
    forests: &[ActorForest],
    options: &SvgOptions,
) -> std::fmt::Result {
    let window = time_window(forests);
    let (window_start, window_end) = match window {
        Some(window) => window,
        None => {
            // Nothing to draw.
            return write!(
                out,
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"0\" height=\"0\"></svg>\n"
            );
        }
    };

    let scale = options.px_per_second;
    let width = options.gutter_width + (window_end - window_start) * scale;
    let height: f64 = forests
        .iter()
        .map(|f| f.rows() as f64 * options.row_height)
        .sum();

    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.1}\" height=\"{height:.1}\" \
         font-family=\"sans-serif\">"
    )?;

    let mut band_top = 0.0;
    let mut clip_id = 0usize;
    for forest in forests {
        let band_height = forest.rows() as f64 * options.row_height;
        if band_height == 0.0 {
            continue;
        }

        writeln!(
            out,
            "  <text x=\"4\" y=\"{y:.1}\" font-size=\"{size:.1}\" fill=\"{GUTTER_COLOR}\">user {user}</text>",
            y = band_top + band_height / 2.0 + options.font_size / 2.0,
            size = options.font_size,
            user = forest.user_id,
        )?;

        // Explicit recursive walk; nodes carry their depth, the band
        // carries its offset.
        let mut result = Ok(());
        forest.walk(|index, depth| {
            if result.is_err() {
                return;
            }
            result = render_bar(
                out,
                forest,
                index,
                depth,
                band_top,
                window_start,
                options,
                &mut clip_id,
            );
        });
        result?;

        band_top += band_height;
    }

    writeln!(out, "</svg>")
}

#[allow(clippy::too_many_arguments)]
fn render_bar(
    out: &mut String,
    forest: &ActorForest,
    index: usize,
    depth: usize,
    band_top: f64,
    window_start: f64,
    options: &SvgOptions,
    clip_id: &mut usize,
) -> std::fmt::Result {
    let record = &forest.records[index];
    let x = options.gutter_width + (record.start - window_start) * options.px_per_second;
    let y = band_top + depth as f64 * options.row_height;
    let width = record.duration() * options.px_per_second;
    let height = options.row_height;

    let palette = if record.success {
        SUCCESS_FILLS
    } else {
        FAILURE_FILLS
    };
    let fill = palette[depth % 2];

    let label = format!(
        "{} ({})",
        record.name,
        format_duration(record.duration())
    );
    let escaped = escape_xml(&label);
    *clip_id += 1;
    let clip = *clip_id;

    writeln!(out, "  <g>")?;
    writeln!(out, "    <title>{escaped}</title>")?;
    writeln!(
        out,
        "    <clipPath id=\"clip{clip}\"><rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{width:.1}\" height=\"{height:.1}\"/></clipPath>"
    )?;
    writeln!(
        out,
        "    <rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{width:.1}\" height=\"{height:.1}\" fill=\"{fill}\" stroke=\"{BAR_STROKE}\"/>"
    )?;
    writeln!(
        out,
        "    <text x=\"{tx:.1}\" y=\"{ty:.1}\" font-size=\"{size:.1}\" fill=\"{LABEL_COLOR}\" \
         dominant-baseline=\"central\" clip-path=\"url(#clip{clip})\">{escaped}</text>",
        tx = x + 4.0,
        ty = y + height / 2.0,
        size = options.font_size,
    )?;
    writeln!(out, "  </g>")
}

/// `[min(start), max(end)]` over every record, or `None` when there are
/// no records at all.
fn time_window(forests: &[ActorForest]) -> Option<(f64, f64)> {
    let mut window: Option<(f64, f64)> = None;
    for record in forests.iter().flat_map(|f| f.records.iter()) {
        window = Some(match window {
            None => (record.start, record.end),
            Some((start, end)) => (start.min(record.start), end.max(record.end)),
        });
    }
    window
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
