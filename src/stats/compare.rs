//! Isolate-by-isolate comparison of two parameter tables.
//!
//! Typical use: the curated "best" sample of each isolate against the mean of
//! all its samples. Only isolates present on both sides are compared.

use std::collections::BTreeMap;

use crate::domain::{ComparisonRow, FeatureValues, Features, IsolateAggregate, ParameterSet};

/// Both input tables restricted to their common isolates, plus `left - right`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub left: BTreeMap<String, FeatureValues>,
    pub right: BTreeMap<String, FeatureValues>,
    pub difference: Vec<ComparisonRow>,
}

/// `left - right` per isolate in the intersection of both key sets.
pub fn compare(
    left: &BTreeMap<String, FeatureValues>,
    right: &BTreeMap<String, FeatureValues>,
) -> Vec<ComparisonRow> {
    left.iter()
        .filter_map(|(isolate, l)| {
            let r = right.get(isolate)?;
            Some(ComparisonRow {
                isolate: isolate.clone(),
                difference: Features::from_fn(|f| l.get(f) - r.get(f)),
            })
        })
        .collect()
}

pub fn comparison_table(
    left: &BTreeMap<String, FeatureValues>,
    right: &BTreeMap<String, FeatureValues>,
) -> ComparisonTable {
    let difference = compare(left, right);
    let keep = |table: &BTreeMap<String, FeatureValues>| -> BTreeMap<String, FeatureValues> {
        difference
            .iter()
            .filter_map(|row| table.get(&row.isolate).map(|v| (row.isolate.clone(), *v)))
            .collect()
    };
    ComparisonTable {
        left: keep(left),
        right: keep(right),
        difference,
    }
}

/// One parameter set per isolate; later duplicates are ignored.
pub fn by_isolate(sets: &[ParameterSet]) -> BTreeMap<String, FeatureValues> {
    let mut out = BTreeMap::new();
    for set in sets {
        if out.contains_key(&set.id.isolate) {
            log::warn!(
                "{}: isolate {} already has a parameter set, ignoring",
                set.id,
                set.id.isolate
            );
            continue;
        }
        out.insert(set.id.isolate.clone(), set.values);
    }
    out
}

/// Per-isolate means of an aggregate table.
pub fn aggregate_means(aggregates: &BTreeMap<String, IsolateAggregate>) -> BTreeMap<String, FeatureValues> {
    aggregates
        .iter()
        .map(|(isolate, agg)| (isolate.clone(), agg.means()))
        .collect()
}
