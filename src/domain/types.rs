//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - passed between engine stages without copying the raw series
//! - exported to CSV / JSON
//! - reloaded from a run summary for printing

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Identity of one measurement table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleId {
    /// Isolate identifier (`2103` for `2103_30C_1.csv`).
    pub isolate: String,
    /// Session / week the sample was measured in (directory name).
    pub condition: String,
    /// Replicate label (file stem).
    pub replicate: String,
}

impl SampleId {
    pub fn new(isolate: impl Into<String>, condition: impl Into<String>, replicate: impl Into<String>) -> Self {
        Self {
            isolate: isolate.into(),
            condition: condition.into(),
            replicate: replicate.into(),
        }
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.condition, self.replicate)
    }
}

/// One strain sweep: `(γ [%], G' [Pa], G'' [Pa])` triples in increasing strain order.
///
/// Stored column-wise because every stage scans one or two columns at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    id: SampleId,
    strain: Vec<f64>,
    storage: Vec<f64>,
    loss: Vec<f64>,
}

impl Sample {
    /// Build a sample, rejecting mismatched columns, non-finite values and non-increasing strain.
    pub fn new(
        id: SampleId,
        strain: Vec<f64>,
        storage: Vec<f64>,
        loss: Vec<f64>,
    ) -> Result<Self, ExtractError> {
        if strain.len() != storage.len() || strain.len() != loss.len() {
            return Err(ExtractError::LengthMismatch {
                strain: strain.len(),
                storage: storage.len(),
                loss: loss.len(),
            });
        }

        for (column, values) in [("strain", &strain), ("storage", &storage), ("loss", &loss)] {
            if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(ExtractError::NonFiniteValue { column, index, value });
            }
        }

        for (index, pair) in strain.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ExtractError::NonIncreasingStrain {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        Ok(Self {
            id,
            strain,
            storage,
            loss,
        })
    }

    pub fn id(&self) -> &SampleId {
        &self.id
    }

    pub fn strain(&self) -> &[f64] {
        &self.strain
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

/// Leading fraction of a sweep to discard, held as an exact ratio.
///
/// A ratio keeps `floor(N * 1/3)` identical to `N / 3` for every `N`, which a
/// binary `f64` cannot promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipFraction {
    numerator: u32,
    denominator: u32,
}

impl SkipFraction {
    pub const ZERO: Self = Self {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE_THIRD: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    /// Fraction `numerator / denominator`, which must lie in `[0, 1)`.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, String> {
        if denominator == 0 {
            return Err("Skip fraction denominator must be > 0.".to_string());
        }
        if numerator >= denominator {
            return Err(format!(
                "Skip fraction {numerator}/{denominator} must be in [0, 1)."
            ));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Number of leading points dropped from a series of length `n`.
    pub fn leading(self, n: usize) -> usize {
        (n as u128 * self.numerator as u128 / self.denominator as u128) as usize
    }

    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }
}

impl fmt::Display for SkipFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for SkipFraction {
    type Err = String;

    /// Accepts `a/b` or a plain decimal (`0`, `0.25`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let num = num
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("Invalid skip fraction '{s}': {e}"))?;
            let den = den
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("Invalid skip fraction '{s}': {e}"))?;
            return Self::new(num, den);
        }

        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        if frac_part.len() > 9 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!(
                "Invalid skip fraction '{s}': expected `a/b` or a decimal with at most 9 places."
            ));
        }
        let int_value = int_part
            .parse::<u64>()
            .map_err(|e| format!("Invalid skip fraction '{s}': {e}"))?;
        let denominator = 10u64.pow(frac_part.len() as u32);
        let frac_value = if frac_part.is_empty() {
            0
        } else {
            frac_part
                .parse::<u64>()
                .map_err(|e| format!("Invalid skip fraction '{s}': {e}"))?
        };
        let numerator = int_value
            .checked_mul(denominator)
            .and_then(|v| v.checked_add(frac_value))
            .filter(|&v| v < denominator)
            .ok_or_else(|| format!("Skip fraction '{s}' must be in [0, 1)."))?;

        Self::new(numerator as u32, denominator as u32)
    }
}

/// How the startup transient is removed before any scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// Use the raw series.
    Keep,
    /// Drop `floor(N * fraction)` leading points.
    Leading(SkipFraction),
}

impl SkipPolicy {
    pub fn skipped(self, n: usize) -> usize {
        match self {
            SkipPolicy::Keep => 0,
            SkipPolicy::Leading(fraction) => fraction.leading(n),
        }
    }
}

impl From<SkipFraction> for SkipPolicy {
    fn from(value: SkipFraction) -> Self {
        if value.is_zero() {
            SkipPolicy::Keep
        } else {
            SkipPolicy::Leading(value)
        }
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        SkipPolicy::Leading(SkipFraction::ONE_THIRD)
    }
}

/// Closed strain interval `[low, high]` in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainRange {
    pub low: f64,
    pub high: f64,
}

impl StrainRange {
    /// The linear-viscoelastic regime used for plateau moduli.
    pub const LINEAR_REGIME: Self = Self { low: 0.01, high: 0.1 };

    pub fn contains(&self, strain: f64) -> bool {
        strain >= self.low && strain <= self.high
    }
}

/// Number of points averaged by the fixed-window baseline.
pub const DEFAULT_BASELINE_WINDOW: usize = 5;

/// How the plateau moduli `G'0` / `G''0` are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Mean of `count` points starting at index `start` of the trimmed series.
    FixedWindow { start: usize, count: usize },
    /// Mean over points with strain inside `range`; falls back to the first
    /// `fallback_count` points when the range holds none.
    AdaptiveMask {
        range: StrainRange,
        fallback_count: usize,
    },
}

impl BaselinePolicy {
    pub fn fixed(count: usize) -> Self {
        BaselinePolicy::FixedWindow { start: 0, count }
    }

    pub fn adaptive(range: StrainRange) -> Self {
        BaselinePolicy::AdaptiveMask {
            range,
            fallback_count: DEFAULT_BASELINE_WINDOW,
        }
    }
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        BaselinePolicy::adaptive(StrainRange::LINEAR_REGIME)
    }
}

/// CLI selector for [`BaselinePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BaselineKind {
    /// First N points of the trimmed series.
    Fixed,
    /// Points inside the plateau strain range, with a fixed-window fallback.
    Adaptive,
}

/// Which series the crossover scan runs on.
///
/// Both give the same `γ_f` when the baseline is valid (dividing by a positive
/// constant keeps the sign and the interpolation ratio); they differ only for
/// samples with an invalid baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CrossoverBasis {
    /// `G'/G'0 - G''/G'0`; undefined without a valid baseline.
    Normalized,
    /// `G' - G''` on the trimmed raw series.
    Raw,
}

/// Everything the per-sample engine needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub skip: SkipPolicy,
    pub baseline: BaselinePolicy,
    /// Normalised `G'` below this marks the yield strain.
    pub yield_threshold: f64,
    pub crossover_basis: CrossoverBasis,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            skip: SkipPolicy::default(),
            baseline: BaselinePolicy::default(),
            yield_threshold: 0.95,
            crossover_basis: CrossoverBasis::Normalized,
        }
    }
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.yield_threshold.is_finite() && self.yield_threshold > 0.0) {
            return Err(format!(
                "Invalid yield threshold {} (must be finite and > 0).",
                self.yield_threshold
            ));
        }
        match self.baseline {
            BaselinePolicy::FixedWindow { count, .. } if count == 0 => {
                Err("Baseline window must contain at least one point.".to_string())
            }
            BaselinePolicy::AdaptiveMask { range, fallback_count } => {
                if !(range.low.is_finite() && range.high.is_finite() && range.low <= range.high) {
                    return Err(format!(
                        "Invalid plateau range [{}, {}] (must be finite with low <= high).",
                        range.low, range.high
                    ));
                }
                if fallback_count == 0 {
                    return Err("Baseline fallback window must contain at least one point.".to_string());
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// The scalar descriptors extracted from one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    G0Prime,
    TanDelta0,
    GammaF,
    GammaY,
    Wso,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::G0Prime,
        Feature::TanDelta0,
        Feature::GammaF,
        Feature::GammaY,
        Feature::Wso,
    ];

    /// Column name used in exported tables.
    pub fn column(self) -> &'static str {
        match self {
            Feature::G0Prime => "G0_prime",
            Feature::TanDelta0 => "tan_delta0",
            Feature::GammaF => "gamma_f",
            Feature::GammaY => "gamma_y",
            Feature::Wso => "WSO",
        }
    }

    /// Short label for terminal tables.
    pub fn label(self) -> &'static str {
        match self {
            Feature::G0Prime => "G'0 [Pa]",
            Feature::TanDelta0 => "tan d0",
            Feature::GammaF => "gamma_f [%]",
            Feature::GammaY => "gamma_y [%]",
            Feature::Wso => "WSO [Pa]",
        }
    }
}

/// One value of `T` per [`Feature`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features<T> {
    #[serde(rename = "G0_prime")]
    pub g0_prime: T,
    pub tan_delta0: T,
    pub gamma_f: T,
    pub gamma_y: T,
    #[serde(rename = "WSO")]
    pub wso: T,
}

impl<T> Features<T> {
    pub fn from_fn(mut f: impl FnMut(Feature) -> T) -> Self {
        Self {
            g0_prime: f(Feature::G0Prime),
            tan_delta0: f(Feature::TanDelta0),
            gamma_f: f(Feature::GammaF),
            gamma_y: f(Feature::GammaY),
            wso: f(Feature::Wso),
        }
    }

    pub fn get(&self, feature: Feature) -> &T {
        match feature {
            Feature::G0Prime => &self.g0_prime,
            Feature::TanDelta0 => &self.tan_delta0,
            Feature::GammaF => &self.gamma_f,
            Feature::GammaY => &self.gamma_y,
            Feature::Wso => &self.wso,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Features<U> {
        Features::from_fn(|feature| f(self.get(feature)))
    }
}

/// Feature values; NaN marks "undefined for this sample".
pub type FeatureValues = Features<f64>;

impl FeatureValues {
    /// `None` for undefined values (CSV empty cell / JSON `null`).
    pub fn defined(&self) -> Features<Option<f64>> {
        self.map(|&v| v.is_finite().then_some(v))
    }
}

impl From<Features<Option<f64>>> for FeatureValues {
    fn from(value: Features<Option<f64>>) -> Self {
        value.map(|v| v.unwrap_or(f64::NAN))
    }
}

/// Extracted descriptors for a single sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub id: SampleId,
    pub values: FeatureValues,
}

/// Mean / sample std / count / SEM of one field over one isolate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistic {
    #[serde(with = "nan_as_null")]
    pub mean: f64,
    #[serde(with = "nan_as_null")]
    pub std: f64,
    pub count: usize,
    #[serde(with = "nan_as_null")]
    pub sem: f64,
}

/// Per-isolate statistics for every feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolateAggregate {
    pub isolate: String,
    /// Number of parameter sets in the group (defined or not).
    pub samples: usize,
    pub fields: Features<FieldStatistic>,
}

impl IsolateAggregate {
    pub fn means(&self) -> FeatureValues {
        self.fields.map(|s| s.mean)
    }
}

/// `left - right` for one isolate present on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub isolate: String,
    pub difference: FeatureValues,
}

/// Serialize non-finite floats as `null` and read `null` back as NaN.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
