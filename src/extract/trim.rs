//! Startup-transient trimming.
//!
//! Rheometers settle during the first few oscillations, so the leading part of
//! a sweep is dropped before any baseline or scan sees it. The result borrows
//! the sample; no values are copied.

use crate::domain::{Sample, SampleId, SkipPolicy};
use crate::error::ExtractError;

/// The tail `[start, N)` of a sample. Never empty.
#[derive(Debug, Clone, Copy)]
pub struct TrimmedSample<'a> {
    sample: &'a Sample,
    start: usize,
}

impl<'a> TrimmedSample<'a> {
    pub fn id(&self) -> &'a SampleId {
        self.sample.id()
    }

    /// Index of the first kept point in the original sample.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn strain(&self) -> &'a [f64] {
        &self.sample.strain()[self.start..]
    }

    pub fn storage(&self) -> &'a [f64] {
        &self.sample.storage()[self.start..]
    }

    pub fn loss(&self) -> &'a [f64] {
        &self.sample.loss()[self.start..]
    }

    pub fn len(&self) -> usize {
        self.sample.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop the leading points selected by `skip`.
pub fn trim(sample: &Sample, skip: SkipPolicy) -> Result<TrimmedSample<'_>, ExtractError> {
    let total = sample.len();
    let skipped = skip.skipped(total);
    if skipped >= total {
        return Err(ExtractError::EmptySeries { total, skipped });
    }
    Ok(TrimmedSample {
        sample,
        start: skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkipFraction;

    fn sample(n: usize) -> Sample {
        let strain: Vec<f64> = (0..n).map(|i| (i + 1) as f64).collect();
        let storage: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let loss: Vec<f64> = (0..n).map(|i| 10.0 + i as f64).collect();
        Sample::new(SampleId::new("A", "week1", "A_30C_1"), strain, storage, loss).unwrap()
    }

    #[test]
    fn one_third_of_nine_keeps_indices_three_to_eight() {
        let s = sample(9);
        let t = trim(&s, SkipPolicy::Leading(SkipFraction::ONE_THIRD)).unwrap();
        assert_eq!(t.start(), 3);
        assert_eq!(t.len(), 6);
        assert_eq!(t.strain(), &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(t.storage()[0], 103.0);
        assert_eq!(t.loss()[5], 18.0);
    }

    #[test]
    fn one_third_of_two_keeps_everything() {
        let s = sample(2);
        let t = trim(&s, SkipPolicy::Leading(SkipFraction::ONE_THIRD)).unwrap();
        assert_eq!(t.start(), 0);
        assert_eq!(t.strain(), &[1.0, 2.0]);
    }

    #[test]
    fn keep_policy_is_identity() {
        let s = sample(4);
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn empty_sample_is_an_empty_series() {
        let s = sample(0);
        let err = trim(&s, SkipPolicy::Keep).unwrap_err();
        assert_eq!(err, ExtractError::EmptySeries { total: 0, skipped: 0 });
    }

    #[test]
    fn large_fraction_on_one_point_keeps_it() {
        // floor(1 * 9/10) = 0, so the single point survives.
        let s = sample(1);
        let fraction = SkipFraction::new(9, 10).unwrap();
        let t = trim(&s, SkipPolicy::Leading(fraction)).unwrap();
        assert_eq!(t.len(), 1);
    }
}
