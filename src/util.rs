pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Round to the nearest integer, with halves going towards positive infinity.
///
/// `f64::round` sends halves away from zero, which disagrees for negative
/// halves (`-17.5` becomes `-18` instead of `-17`). Scores and curves are
/// pinned to the half-up behaviour.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
