//! Per-isolate aggregation of parameter sets.
//!
//! Each feature is summarised independently over the samples where that
//! feature is defined, so one undefined crossover does not discard the same
//! sample's plateau modulus.

use std::collections::BTreeMap;

use crate::domain::{FeatureValues, Features, FieldStatistic, IsolateAggregate, ParameterSet};

/// Mean, Bessel-corrected std, count and SEM over the finite values.
pub fn field_statistic(values: impl IntoIterator<Item = f64>) -> FieldStatistic {
    let defined: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    let count = defined.len();
    if count == 0 {
        return FieldStatistic {
            mean: f64::NAN,
            std: f64::NAN,
            count,
            sem: f64::NAN,
        };
    }

    let n = count as f64;
    let mean = defined.iter().sum::<f64>() / n;
    if count == 1 {
        return FieldStatistic {
            mean,
            std: f64::NAN,
            count,
            sem: f64::NAN,
        };
    }

    let sum_sq = defined.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>();
    let std = (sum_sq / (n - 1.0)).sqrt();
    FieldStatistic {
        mean,
        std,
        count,
        sem: std / n.sqrt(),
    }
}

/// Group by exact isolate id and summarise every feature.
pub fn aggregate(sets: &[ParameterSet]) -> BTreeMap<String, IsolateAggregate> {
    let mut groups: BTreeMap<&str, Vec<&FeatureValues>> = BTreeMap::new();
    for set in sets {
        groups.entry(set.id.isolate.as_str()).or_default().push(&set.values);
    }

    groups
        .into_iter()
        .map(|(isolate, values)| {
            let fields = Features::from_fn(|feature| field_statistic(values.iter().map(|v| *v.get(feature))));
            (
                isolate.to_string(),
                IsolateAggregate {
                    isolate: isolate.to_string(),
                    samples: values.len(),
                    fields,
                },
            )
        })
        .collect()
}

/// Sorted, de-duplicated isolate ids with `reference` (the control) moved first.
pub fn isolate_order<'a>(isolates: impl IntoIterator<Item = &'a str>, reference: Option<&str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = isolates.into_iter().collect();
    out.sort_unstable();
    out.dedup();
    if let Some(reference) = reference {
        if let Some(pos) = out.iter().position(|&i| i == reference) {
            let control = out.remove(pos);
            out.insert(0, control);
        }
    }
    out
}
