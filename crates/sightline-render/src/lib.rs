#![forbid(unsafe_code)]

//! Standalone SVG output for `sightline` frames.
//!
//! The picture uses the search's own coordinates with the y axis pointing up: disks are drawn
//! as circles, each with a segment to its focus, over the arena boundary (the `y = 0` line or
//! the origin disk).

mod util;

use sightline::{Boundary, Frame, QualityMetric, TrialStatus};
use std::fmt::Write as _;
use util::{escape_xml, fmt, fmt_into};

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Extra space around the arena extent, in arena units.
    pub viewbox_padding: f64,
    /// When true, draw a segment from every disk centre to its focus.
    pub include_foci: bool,
    /// When true, draw the forbidden region.
    pub include_boundary: bool,
    /// When true, add a title with the point count and quality.
    pub include_title: bool,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            viewbox_padding: 20.0,
            include_foci: true,
            include_boundary: true,
            include_title: true,
        }
    }
}

/// Title shown above a frame, e.g. `Best config for n=4, Power = 1.234`, or
/// `Best config for 4 layers, Avg. Distance = 1.414` for constructive results.
pub fn frame_title(frame: &Frame<'_>) -> String {
    let mut title = match (frame.metric, frame.mean_focus_distance) {
        (QualityMetric::AverageDistance, Some(distance)) => format!(
            "Best config for {} layers, Avg. Distance = {:.3}",
            frame.layers.unwrap_or(frame.num_points),
            distance
        ),
        _ => format!(
            "Best config for n={}, Power = {:.3}",
            frame.num_points, frame.quality
        ),
    };
    if !frame.is_final {
        let _ = write!(&mut title, " (trial {})", frame.trial);
    }
    if let TrialStatus::Degraded(reason) = frame.status {
        let _ = write!(&mut title, " [degraded: {reason:?}]");
    }
    title
}

pub fn render_frame_svg(frame: &Frame<'_>, options: &SvgRenderOptions) -> String {
    let extent = if frame.extent.is_finite() && frame.extent > 0.0 {
        frame.extent
    } else {
        frame.radius.max(1.0)
    };
    let pad = options.viewbox_padding.max(0.0);
    let half = extent + pad;
    let title_band = if options.include_title {
        (half * 0.08).max(12.0)
    } else {
        0.0
    };

    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
        fmt(-half),
        fmt(-half - title_band),
        fmt(2.0 * half),
        fmt(2.0 * half + title_band)
    );
    let _ = writeln!(
        &mut out,
        r#"<style>
.boundary {{ fill: #f3f4f6; stroke: #6b7280; stroke-width: {stroke}; }}
.disk {{ fill: #93c5fd; stroke: #1d4ed8; stroke-width: {stroke}; }}
.disk.degraded {{ fill: #fca5a5; stroke: #b91c1c; }}
.sight {{ fill: none; stroke: #1e3a8a; stroke-width: {stroke}; }}
.title {{ fill: #111827; font-family: ui-sans-serif, system-ui, sans-serif; font-size: {font}px; text-anchor: middle; dominant-baseline: middle; }}
</style>"#,
        stroke = fmt((extent / 400.0).max(0.5)),
        font = fmt(title_band * 0.6),
    );
    let _ = writeln!(
        &mut out,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="white" />"#,
        fmt(-half),
        fmt(-half - title_band),
        fmt(2.0 * half),
        fmt(2.0 * half + title_band)
    );

    if options.include_title {
        let _ = writeln!(
            &mut out,
            r#"<text class="title" x="0" y="{}">{}</text>"#,
            fmt(-half - title_band / 2.0),
            escape_xml(&frame_title(frame))
        );
    }

    if options.include_boundary {
        render_boundary(&mut out, frame.boundary, frame.radius, half);
    }

    if options.include_foci {
        out.push_str(r#"<g class="foci">"#);
        for p in frame.points {
            let _ = write!(
                &mut out,
                r#"<line class="sight" x1="{}" y1="{}" x2="{}" y2="{}" />"#,
                fmt(p.x),
                fmt(-p.y),
                fmt(p.focus_x),
                fmt(-p.focus_y)
            );
        }
        out.push_str("</g>\n");
    }

    let class = if frame.status.is_valid() {
        "disk"
    } else {
        "disk degraded"
    };
    out.push_str(r#"<g class="disks">"#);
    for p in frame.points {
        out.push_str(r#"<circle class=""#);
        out.push_str(class);
        out.push_str(r#"" cx=""#);
        fmt_into(&mut out, p.x);
        out.push_str(r#"" cy=""#);
        fmt_into(&mut out, -p.y);
        out.push_str(r#"" r=""#);
        fmt_into(&mut out, frame.radius);
        out.push_str(r#"" />"#);
    }
    out.push_str("</g>\n");

    out.push_str("</svg>\n");
    out
}

fn render_boundary(out: &mut String, boundary: Boundary, radius: f64, half: f64) {
    match boundary {
        // Everything below the line is forbidden.
        Boundary::HalfPlane => {
            let _ = writeln!(
                out,
                r#"<rect class="boundary" x="{}" y="0" width="{}" height="{}" />"#,
                fmt(-half),
                fmt(2.0 * half),
                fmt(half)
            );
        }
        Boundary::OriginDisk => {
            let _ = writeln!(
                out,
                r#"<circle class="boundary" cx="0" cy="0" r="{}" />"#,
                fmt(radius)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SvgRenderOptions, frame_title, render_frame_svg};
    use sightline::{Boundary, DegradedReason, Frame, Point, QualityMetric, TrialStatus};

    fn frame<'a>(points: &'a [Point], boundary: Boundary, status: TrialStatus) -> Frame<'a> {
        Frame {
            points,
            radius: 100.0,
            extent: 900.0,
            boundary,
            num_points: points.len(),
            layers: None,
            trial: 3,
            metric: QualityMetric::InverseSquare,
            quality: 0.5,
            mean_focus_distance: None,
            status,
            is_final: true,
        }
    }

    #[test]
    fn draws_disks_foci_and_half_plane() {
        let points = [
            Point::new(-200.0, 150.0).with_focus(-180.0, 0.0),
            Point::new(250.5, 400.0).with_focus(300.0, 0.0),
        ];
        let svg = render_frame_svg(
            &frame(&points, Boundary::HalfPlane, TrialStatus::Valid),
            &SvgRenderOptions::default(),
        );
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-920 "#));
        assert_eq!(svg.matches("<circle class=\"disk\"").count(), 2);
        assert!(svg.contains(r#"cx="250.5" cy="-400" r="100""#));
        assert!(svg.contains(r#"x1="-200" y1="-150" x2="-180" y2="0""#));
        assert!(svg.contains(r#"<rect class="boundary""#));
        assert!(svg.contains("Best config for n=2, Power = 0.500"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn origin_disk_and_degraded_styling() {
        let points = [Point::new(0.0, 300.0)];
        let status = TrialStatus::Degraded(DegradedReason::Interrupted);
        let svg = render_frame_svg(
            &frame(&points, Boundary::OriginDisk, status),
            &SvgRenderOptions::default(),
        );
        assert!(svg.contains(r#"<circle class="boundary" cx="0" cy="0" r="100" />"#));
        assert!(svg.contains(r#"class="disk degraded""#));
    }

    #[test]
    fn options_turn_layers_off() {
        let points = [Point::new(0.0, 300.0)];
        let options = SvgRenderOptions {
            include_foci: false,
            include_boundary: false,
            include_title: false,
            ..SvgRenderOptions::default()
        };
        let svg = render_frame_svg(&frame(&points, Boundary::HalfPlane, TrialStatus::Valid), &options);
        assert!(!svg.contains("class=\"sight\""));
        assert!(!svg.contains("class=\"boundary\""));
        assert!(!svg.contains("<text"));
    }

    #[test]
    fn intermediate_titles_name_the_trial() {
        let points = [Point::new(0.0, 300.0)];
        let mut f = frame(&points, Boundary::HalfPlane, TrialStatus::Valid);
        f.is_final = false;
        assert_eq!(frame_title(&f), "Best config for n=1, Power = 0.500 (trial 3)");
    }

    #[test]
    fn constructive_titles_report_layers_and_distance() {
        let points = [
            Point::new(-700.0, 100.0).with_focus(-600.0, 0.0),
            Point::new(-500.0, 100.0).with_focus(-500.0, 0.0),
        ];
        let mut f = frame(&points, Boundary::HalfPlane, TrialStatus::Valid);
        f.metric = QualityMetric::AverageDistance;
        f.quality = -3.25;
        f.mean_focus_distance = Some(1.2071);
        f.layers = Some(1);
        assert_eq!(
            frame_title(&f),
            "Best config for 1 layers, Avg. Distance = 1.207"
        );
        let svg = render_frame_svg(&f, &SvgRenderOptions::default());
        assert!(svg.contains("Avg. Distance = 1.207"));
        assert!(!svg.contains("Power"));
    }
}
