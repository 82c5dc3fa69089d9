use crate::model::Point;
use serde::Serialize;

/// Scalar ranking of a configuration; higher is better for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum QualityMetric {
    /// `1 / mean(|p - focus| / r) - spread / (2r)`.
    #[default]
    AverageDistance,
    /// `sum(r^2 / |p - focus|^2)`.
    InverseSquare,
}

impl QualityMetric {
    /// Scores `points`. `spread` is the width of the focus window the constructive search was
    /// allowed to use (0 when there is none); only the averaging metric charges for it.
    ///
    /// `None` means the score is undefined: a point on its own focus, or no points at all for
    /// the averaging metric.
    pub fn score(self, points: &[Point], radius: f64, spread: f64) -> Option<f64> {
        match self {
            Self::AverageDistance => {
                if points.is_empty() {
                    return None;
                }
                let total: f64 = points.iter().map(|p| p.focus_distance() / radius).sum();
                let avg = total / points.len() as f64;
                if !(avg.is_finite() && avg > 0.0) {
                    return None;
                }
                Some(1.0 / avg - spread / 2.0 / radius)
            }
            Self::InverseSquare => {
                let r2 = radius * radius;
                let mut power = 0.0;
                for p in points {
                    let dx = p.x - p.focus_x;
                    let dy = p.y - p.focus_y;
                    let d2 = dx * dx + dy * dy;
                    if d2 == 0.0 {
                        return None;
                    }
                    power += r2 / d2;
                }
                Some(power)
            }
        }
    }

    /// Mean focus distance in radii, reported alongside the constructive score.
    pub fn mean_focus_distance(points: &[Point], radius: f64) -> Option<f64> {
        if points.is_empty() {
            return None;
        }
        let total: f64 = points.iter().map(|p| p.focus_distance() / radius).sum();
        Some(total / points.len() as f64)
    }
}
