//! Timing functions: named presets and `cubic-bezier(x1, y1, x2, y2)`.
use log::warn;

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Control points `(x1, y1, x2, y2)`; endpoints are fixed at `(0, 0)` and `(1, 1)`.
    CubicBezier(f64, f64, f64, f64),
}

fn bezier_component(first: f64, second: f64, param: f64) -> f64 {
    // B(s) = 3(1-s)^2 s p1 + 3(1-s) s^2 p2 + s^3
    let inv = 1.0 - param;
    3.0 * inv * inv * param * first + 3.0 * inv * param * param * second + param * param * param
}

fn bezier_slope(first: f64, second: f64, param: f64) -> f64 {
    let inv = 1.0 - param;
    3.0 * inv * inv * first + 6.0 * inv * param * (second - first) + 3.0 * param * param * (1.0 - second)
}

fn parse_bezier(args: &str) -> Option<Easing> {
    let nums: Vec<f64> = args
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|num| num.is_finite()))
        .collect::<Option<Vec<f64>>>()?;
    let [x1, y1, x2, y2] = nums.as_slice() else {
        return None;
    };
    if !(0.0..=1.0).contains(x1) || !(0.0..=1.0).contains(x2) {
        return None;
    }
    Some(Easing::CubicBezier(*x1, *y1, *x2, *y2))
}

impl Easing {
    /// Parse a timing function name. Unknown or malformed input is linear.
    pub fn parse(text: &str) -> Self {
        let text = text.trim().to_ascii_lowercase();
        match text.as_str() {
            "" | "linear" => Self::Linear,
            "ease" => Self::CubicBezier(0.25, 0.1, 0.25, 1.0),
            "ease-in" => Self::CubicBezier(0.42, 0.0, 1.0, 1.0),
            "ease-out" => Self::CubicBezier(0.0, 0.0, 0.58, 1.0),
            "ease-in-out" => Self::CubicBezier(0.42, 0.0, 0.58, 1.0),
            other => {
                let parsed = other
                    .strip_prefix("cubic-bezier(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(parse_bezier);
                parsed.unwrap_or_else(|| {
                    warn!("Unrecognized easing `{other}`, using linear");
                    Self::Linear
                })
            }
        }
    }

    /// Eased progress for linear progress `progress` (clamped to `[0, 1]`).
    pub fn ease(self, progress: f64) -> f64 {
        let progress = progress.clamp(0.0, 1.0);
        match self {
            Self::Linear => progress,
            Self::CubicBezier(x1, y1, x2, y2) => {
                // Newton iteration for the curve parameter whose x equals `progress`.
                let mut param = progress;
                for _ in 0..NEWTON_ITERATIONS {
                    let error = bezier_component(x1, x2, param) - progress;
                    if error.abs() < NEWTON_TOLERANCE {
                        return bezier_component(y1, y2, param);
                    }
                    let slope = bezier_slope(x1, x2, param);
                    if slope.abs() < NEWTON_TOLERANCE {
                        break;
                    }
                    param -= error / slope;
                }
                if (bezier_component(x1, x2, param) - progress).abs() < NEWTON_TOLERANCE {
                    return bezier_component(y1, y2, param);
                }
                bezier_component(y1, y2, progress)
            }
        }
    }
}
