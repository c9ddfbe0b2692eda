//! Baseline normalisation and master curves.

use crate::extract::baseline::PositiveBaseline;
use crate::extract::trim::TrimmedSample;

/// `G'/G'0` and `G''/G'0`, index-aligned with the trimmed strain.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSample<'a> {
    strain: &'a [f64],
    storage: Vec<f64>,
    loss: Vec<f64>,
}

impl<'a> NormalizedSample<'a> {
    pub fn strain(&self) -> &'a [f64] {
        self.strain
    }

    pub fn storage(&self) -> &[f64] {
        &self.storage
    }

    pub fn loss(&self) -> &[f64] {
        &self.loss
    }

    pub fn len(&self) -> usize {
        self.strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain.is_empty()
    }
}

/// Divide both moduli by `G'0`.
pub fn normalize<'a>(trimmed: &TrimmedSample<'a>, baseline: PositiveBaseline) -> NormalizedSample<'a> {
    let g0 = baseline.storage();
    NormalizedSample {
        strain: trimmed.strain(),
        storage: trimmed.storage().iter().map(|g| g / g0).collect(),
        loss: trimmed.loss().iter().map(|g| g / g0).collect(),
    }
}

/// A normalised sweep with strain expressed in units of its crossover strain.
///
/// Curves from different isolates collapse onto one another on this axis,
/// which is what the master plot compares.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterCurve {
    pub strain_ratio: Vec<f64>,
    pub storage_ratio: Vec<f64>,
    pub loss_ratio: Vec<f64>,
}

/// Rescale strain by `gamma_f`; `None` unless `gamma_f` is finite and positive.
pub fn master_curve(normalized: &NormalizedSample<'_>, gamma_f: f64) -> Option<MasterCurve> {
    if !(gamma_f.is_finite() && gamma_f > 0.0) {
        return None;
    }
    Some(MasterCurve {
        strain_ratio: normalized.strain().iter().map(|s| s / gamma_f).collect(),
        storage_ratio: normalized.storage().to_vec(),
        loss_ratio: normalized.loss().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BaselinePolicy, Sample, SampleId, SkipPolicy};
    use crate::extract::baseline::estimate_baseline;
    use crate::extract::trim::trim;

    fn sample() -> Sample {
        Sample::new(
            SampleId::new("A", "week1", "A_30C_1"),
            vec![0.1, 1.0, 10.0],
            vec![200.0, 100.0, 50.0],
            vec![20.0, 40.0, 80.0],
        )
        .unwrap()
    }

    #[test]
    fn divides_both_moduli_by_storage_baseline() {
        let s = sample();
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::fixed(1)).validate().unwrap();
        let n = normalize(&t, b);

        assert_eq!(n.len(), 3);
        assert_eq!(n.strain(), t.strain());
        assert_eq!(n.storage(), &[1.0, 0.5, 0.25]);
        assert_eq!(n.loss(), &[0.1, 0.2, 0.4]);
    }

    #[test]
    fn master_curve_scales_strain_by_crossover() {
        let s = sample();
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::fixed(1)).validate().unwrap();
        let n = normalize(&t, b);

        let m = master_curve(&n, 2.0).unwrap();
        assert_eq!(m.strain_ratio, vec![0.05, 0.5, 5.0]);
        assert_eq!(m.storage_ratio, vec![1.0, 0.5, 0.25]);

        assert!(master_curve(&n, f64::NAN).is_none());
        assert!(master_curve(&n, 0.0).is_none());
    }
}
