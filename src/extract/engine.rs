//! Per-sample extraction: trim -> baseline -> normalise -> features.
//!
//! This is the single engine behind every command. The variants the analysis
//! used to need (raw vs skipped, fixed vs adaptive baseline) are all selected
//! through [`ExtractConfig`].

use serde::{Deserialize, Serialize};

use crate::domain::{CrossoverBasis, ExtractConfig, FeatureValues, ParameterSet, Sample};
use crate::error::ExtractError;
use crate::extract::baseline::{BaselineEstimate, BaselineSource, estimate_baseline};
use crate::extract::features::{crossover_strain, weak_strain_overshoot, yield_strain};
use crate::extract::normalize::{MasterCurve, master_curve, normalize};
use crate::extract::trim::trim;

/// Non-fatal observations made while extracting one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flag", rename_all = "snake_case")]
pub enum ExtractFlag {
    /// The plateau range was empty; `points` fallback points were averaged.
    BaselineFallback { points: usize },
    /// `G'0 <= 0` or undefined; normalised features were left undefined.
    InvalidBaseline {
        #[serde(with = "crate::domain::nan_as_null")]
        storage: f64,
    },
    NoCrossover,
    NoYield,
}

/// Everything extracted from one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub params: ParameterSet,
    pub baseline: BaselineEstimate,
    /// Points dropped by the skip policy.
    pub skipped: usize,
    /// Points the features were computed from.
    pub points: usize,
    pub flags: Vec<ExtractFlag>,
    /// Present when both the baseline and `gamma_f` are defined.
    pub master: Option<MasterCurve>,
}

impl Extraction {
    pub fn has_flag(&self, flag: &ExtractFlag) -> bool {
        self.flags.contains(flag)
    }
}

/// Extract the parameter set of one sample.
///
/// Only an empty trimmed series is an error here. An invalid baseline is
/// recorded as a flag and leaves the normalised features NaN.
pub fn extract_parameters(sample: &Sample, config: &ExtractConfig) -> Result<Extraction, ExtractError> {
    let trimmed = trim(sample, config.skip)?;
    let baseline = estimate_baseline(&trimmed, config.baseline);

    let mut flags = Vec::new();
    if baseline.source == BaselineSource::Fallback {
        flags.push(ExtractFlag::BaselineFallback {
            points: baseline.points,
        });
    }

    let positive = match baseline.validate() {
        Ok(positive) => Some(positive),
        Err(err) => {
            log::warn!("{}: {err}; normalised features left undefined", sample.id());
            flags.push(ExtractFlag::InvalidBaseline {
                storage: baseline.storage,
            });
            None
        }
    };
    let normalized = positive.map(|p| normalize(&trimmed, p));

    let gamma_f = match (config.crossover_basis, &normalized) {
        (CrossoverBasis::Normalized, Some(n)) => crossover_strain(n.strain(), n.storage(), n.loss()),
        (CrossoverBasis::Normalized, None) => None,
        (CrossoverBasis::Raw, _) => crossover_strain(trimmed.strain(), trimmed.storage(), trimmed.loss()),
    };
    let gamma_y = normalized
        .as_ref()
        .and_then(|n| yield_strain(n.strain(), n.storage(), config.yield_threshold));

    if gamma_f.is_none() && (normalized.is_some() || config.crossover_basis == CrossoverBasis::Raw) {
        flags.push(ExtractFlag::NoCrossover);
    }
    if gamma_y.is_none() && normalized.is_some() {
        flags.push(ExtractFlag::NoYield);
    }

    let values = FeatureValues {
        g0_prime: baseline.storage,
        tan_delta0: positive.map_or(f64::NAN, |p| p.tan_delta()),
        gamma_f: gamma_f.unwrap_or(f64::NAN),
        gamma_y: gamma_y.unwrap_or(f64::NAN),
        wso: weak_strain_overshoot(trimmed.loss(), baseline.loss),
    };

    let master = match (&normalized, gamma_f) {
        (Some(n), Some(gf)) => master_curve(n, gf),
        _ => None,
    };

    log::debug!(
        "{}: skipped={} points={} G'0={:.4} gamma_f={:.4} gamma_y={:.4} WSO={:.4}",
        sample.id(),
        trimmed.start(),
        trimmed.len(),
        values.g0_prime,
        values.gamma_f,
        values.gamma_y,
        values.wso
    );

    Ok(Extraction {
        params: ParameterSet {
            id: sample.id().clone(),
            values,
        },
        baseline,
        skipped: trimmed.start(),
        points: trimmed.len(),
        flags,
        master,
    })
}
