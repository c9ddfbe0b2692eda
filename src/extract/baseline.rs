//! Plateau (low-strain) baseline estimation.
//!
//! Two policies are supported:
//!
//! - a fixed window over the first points of the trimmed series
//! - an adaptive mask over a declared linear-regime strain range, which falls
//!   back to a fixed window when the range holds no points
//!
//! The estimate is always produced. Whether it can be divided by is a separate
//! question answered by [`BaselineEstimate::validate`].

use serde::{Deserialize, Serialize};

use crate::domain::{BaselinePolicy, StrainRange};
use crate::error::ExtractError;
use crate::extract::trim::TrimmedSample;

/// Which rule actually produced the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    FixedWindow,
    PlateauRange,
    /// Adaptive mask was empty; the fixed fallback window was used.
    Fallback,
}

/// Plateau moduli `(G'0, G''0)` for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineEstimate {
    pub storage: f64,
    pub loss: f64,
    /// Number of points averaged.
    pub points: usize,
    pub source: BaselineSource,
}

impl BaselineEstimate {
    /// Check `G'0 > 0`, the precondition for every normalised feature.
    pub fn validate(&self) -> Result<PositiveBaseline, ExtractError> {
        if self.storage.is_finite() && self.storage > 0.0 {
            Ok(PositiveBaseline {
                storage: self.storage,
                loss: self.loss,
            })
        } else {
            Err(ExtractError::InvalidBaseline {
                storage: self.storage,
            })
        }
    }
}

/// A baseline whose storage modulus is finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositiveBaseline {
    storage: f64,
    loss: f64,
}

impl PositiveBaseline {
    pub fn storage(&self) -> f64 {
        self.storage
    }

    pub fn loss(&self) -> f64 {
        self.loss
    }

    /// `G''0 / G'0`.
    pub fn tan_delta(&self) -> f64 {
        self.loss / self.storage
    }
}

/// Estimate the plateau moduli of a trimmed sample.
pub fn estimate_baseline(trimmed: &TrimmedSample<'_>, policy: BaselinePolicy) -> BaselineEstimate {
    match policy {
        BaselinePolicy::FixedWindow { start, count } => {
            fixed_window(trimmed, start, count, BaselineSource::FixedWindow)
        }
        BaselinePolicy::AdaptiveMask {
            range,
            fallback_count,
        } => match plateau_range(trimmed, range) {
            Some(estimate) => estimate,
            None => {
                log::warn!(
                    "{}: no points in plateau range [{}, {}]%, using first {} points",
                    trimmed.id(),
                    range.low,
                    range.high,
                    fallback_count
                );
                fixed_window(trimmed, 0, fallback_count, BaselineSource::Fallback)
            }
        },
    }
}

fn plateau_range(trimmed: &TrimmedSample<'_>, range: StrainRange) -> Option<BaselineEstimate> {
    let mut storage_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut points = 0usize;

    for ((&strain, &storage), &loss) in trimmed
        .strain()
        .iter()
        .zip(trimmed.storage())
        .zip(trimmed.loss())
    {
        if range.contains(strain) {
            storage_sum += storage;
            loss_sum += loss;
            points += 1;
        }
    }

    if points == 0 {
        return None;
    }

    Some(BaselineEstimate {
        storage: storage_sum / points as f64,
        loss: loss_sum / points as f64,
        points,
        source: BaselineSource::PlateauRange,
    })
}

fn fixed_window(
    trimmed: &TrimmedSample<'_>,
    start: usize,
    count: usize,
    source: BaselineSource,
) -> BaselineEstimate {
    // Short series average whatever part of the window exists.
    let len = trimmed.len();
    let from = start.min(len);
    let to = start.saturating_add(count).min(len);

    BaselineEstimate {
        storage: mean(&trimmed.storage()[from..to]),
        loss: mean(&trimmed.loss()[from..to]),
        points: to - from,
        source,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Sample, SampleId, SkipPolicy};
    use crate::extract::trim::trim;

    fn sample(strain: Vec<f64>, storage: Vec<f64>, loss: Vec<f64>) -> Sample {
        Sample::new(SampleId::new("A", "week1", "A_30C_1"), strain, storage, loss).unwrap()
    }

    #[test]
    fn fixed_window_averages_first_points() {
        let s = sample(
            vec![0.01, 0.02, 0.03, 0.04, 0.05, 0.06, 0.07],
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 1000.0, 1000.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 1000.0, 1000.0],
        );
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::fixed(5));
        assert!((b.storage - 30.0).abs() < 1e-12);
        assert!((b.loss - 3.0).abs() < 1e-12);
        assert_eq!(b.points, 5);
        assert_eq!(b.source, BaselineSource::FixedWindow);
    }

    #[test]
    fn fixed_window_honours_start_offset() {
        let s = sample(
            vec![0.01, 0.02, 0.03],
            vec![999.0, 10.0, 20.0],
            vec![99.0, 1.0, 3.0],
        );
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::FixedWindow { start: 1, count: 5 });
        assert!((b.storage - 15.0).abs() < 1e-12);
        assert!((b.loss - 2.0).abs() < 1e-12);
        assert_eq!(b.points, 2);
    }

    #[test]
    fn fixed_window_past_the_end_is_invalid() {
        let s = sample(vec![0.01, 0.02], vec![10.0, 20.0], vec![1.0, 2.0]);
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::FixedWindow { start: 5, count: 5 });
        assert_eq!(b.points, 0);
        assert!(b.storage.is_nan());
        assert!(matches!(b.validate(), Err(ExtractError::InvalidBaseline { .. })));
    }

    #[test]
    fn adaptive_mask_uses_points_inside_range() {
        let s = sample(
            vec![0.005, 0.01, 0.05, 0.1, 0.5],
            vec![1.0, 100.0, 110.0, 120.0, 5.0],
            vec![9.0, 10.0, 11.0, 12.0, 50.0],
        );
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::default());
        assert_eq!(b.source, BaselineSource::PlateauRange);
        assert_eq!(b.points, 3);
        assert!((b.storage - 110.0).abs() < 1e-12);
        assert!((b.loss - 11.0).abs() < 1e-12);
    }

    #[test]
    fn adaptive_mask_falls_back_to_fixed_window_when_range_is_empty() {
        let strain = vec![0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        let storage = vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0];
        let loss = vec![1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0];
        let s = sample(strain, storage, loss);
        let t = trim(&s, SkipPolicy::Keep).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::default());

        assert_eq!(b.source, BaselineSource::Fallback);
        assert_eq!(b.points, 5);
        assert!((b.storage - 30.0).abs() < 1e-12);
        assert!((b.loss - 1.0).abs() < 1e-12);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn adaptive_mask_only_sees_trimmed_points() {
        // The only in-range point sits in the skipped third.
        let s = sample(
            vec![0.05, 0.2, 0.3, 0.4, 0.5, 0.6],
            vec![500.0, 10.0, 10.0, 10.0, 10.0, 10.0],
            vec![50.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        );
        let t = trim(&s, SkipPolicy::default()).unwrap();
        let b = estimate_baseline(&t, BaselinePolicy::default());
        assert_eq!(b.source, BaselineSource::Fallback);
        assert!((b.storage - 10.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_storage_is_invalid() {
        let b = BaselineEstimate {
            storage: -3.0,
            loss: 1.0,
            points: 5,
            source: BaselineSource::FixedWindow,
        };
        assert_eq!(
            b.validate().unwrap_err(),
            ExtractError::InvalidBaseline { storage: -3.0 }
        );

        let zero = BaselineEstimate { storage: 0.0, ..b };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn tan_delta_is_loss_over_storage() {
        let b = BaselineEstimate {
            storage: 200.0,
            loss: 50.0,
            points: 5,
            source: BaselineSource::FixedWindow,
        };
        let positive = b.validate().unwrap();
        assert!((positive.tan_delta() - 0.25).abs() < 1e-12);
    }
}
