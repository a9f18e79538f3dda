/// `a + (b - a) * t`
#[inline]
pub fn lerp_number(from: f64, to: f64, progress: f64) -> f64 {
    (to - from).mul_add(progress, from)
}

/// Lerp shared indices; values present on only one side pass through unchanged.
pub fn lerp_array(from: &[f64], to: &[f64], progress: f64) -> Vec<f64> {
    let len = from.len().max(to.len());
    (0..len)
        .filter_map(|idx| match (from.get(idx), to.get(idx)) {
            (Some(start), Some(end)) => Some(lerp_number(*start, *end, progress)),
            (Some(only), None) | (None, Some(only)) => Some(*only),
            (None, None) => None,
        })
        .collect()
}

/// Values the animator can interpolate.
pub trait Animatable: Clone {
    /// Interpolated value at `progress`, or `None` when the pair is not numeric.
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Option<Self>;
}

impl Animatable for f64 {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Option<Self> {
        Some(lerp_number(*from, *to, progress))
    }
}

impl Animatable for Vec<f64> {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Option<Self> {
        Some(lerp_array(from, to, progress))
    }
}
