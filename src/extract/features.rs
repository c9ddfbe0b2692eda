//! Scalar feature scans over a (trimmed or normalised) sweep.
//!
//! All scans walk the series in increasing strain order and stop at the first
//! qualifying point; reordering a sweep changes their results.

/// Strain at the first `G' > G''` to `G' < G''` transition.
///
/// The crossing is located by linear interpolation of `G' - G''` between the
/// two bracketing points. A pair touching zero exactly (`diff == 0`) does not
/// qualify, and neither does a crossing in the opposite direction.
pub fn crossover_strain(strain: &[f64], storage: &[f64], loss: &[f64]) -> Option<f64> {
    let n = strain.len().min(storage.len()).min(loss.len());
    (0..n.saturating_sub(1)).find_map(|i| {
        let d0 = storage[i] - loss[i];
        let d1 = storage[i + 1] - loss[i + 1];
        (d0 > 0.0 && d1 < 0.0).then(|| strain[i] + (strain[i + 1] - strain[i]) * d0 / (d0 - d1))
    })
}

/// Sampled strain of the first point whose normalised `G'` is below `threshold`.
pub fn yield_strain(strain: &[f64], normalized_storage: &[f64], threshold: f64) -> Option<f64> {
    strain
        .iter()
        .zip(normalized_storage)
        .find(|&(_, &g)| g < threshold)
        .map(|(&s, _)| s)
}

/// Weak strain overshoot: peak `G''` over the series minus the plateau `G''0`.
///
/// Non-positive results are legitimate (no overshoot). NaN only for an empty
/// series or an undefined `G''0`.
pub fn weak_strain_overshoot(loss: &[f64], loss_baseline: f64) -> f64 {
    if loss.is_empty() {
        return f64::NAN;
    }
    let peak = loss.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    peak - loss_baseline
}
