//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the extraction/statistics code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use std::collections::BTreeMap;

use crate::domain::{
    BaselinePolicy, CrossoverBasis, ExtractConfig, Feature, FeatureValues, FieldStatistic, IsolateAggregate,
    SkipPolicy,
};
use crate::extract::ExtractFlag;
use crate::io::summary::{FailureRecord, SampleRecord};
use crate::stats::{ComparisonTable, isolate_order};

/// Header: engine configuration plus batch counts.
pub fn format_run_summary(config: &ExtractConfig, discovered: usize, extracted: usize, failed: usize) -> String {
    let mut out = String::new();

    out.push_str("=== rheo - strain-sweep parameters ===\n");
    out.push_str(&format!("Skip: {}\n", describe_skip(config.skip)));
    out.push_str(&format!("Baseline: {}\n", describe_baseline(config.baseline)));
    out.push_str(&format!("Yield threshold: {}\n", config.yield_threshold));
    out.push_str(&format!("Crossover basis: {}\n", basis_name(config.crossover_basis)));
    out.push_str(&format!(
        "Samples: discovered={discovered} | extracted={extracted} | failed={failed}\n"
    ));
    out.push('\n');

    out
}

fn basis_name(basis: CrossoverBasis) -> &'static str {
    match basis {
        CrossoverBasis::Normalized => "normalized",
        CrossoverBasis::Raw => "raw",
    }
}

fn describe_skip(skip: SkipPolicy) -> String {
    match skip {
        SkipPolicy::Keep => "none (raw series)".to_string(),
        SkipPolicy::Leading(fraction) => format!("leading {fraction} of each sweep"),
    }
}

fn describe_baseline(policy: BaselinePolicy) -> String {
    match policy {
        BaselinePolicy::FixedWindow { start, count } => {
            format!("fixed window, points {start}..{}", start.saturating_add(count))
        }
        BaselinePolicy::AdaptiveMask { range, fallback_count } => format!(
            "plateau range [{}, {}]% (fallback: first {fallback_count} points)",
            range.low, range.high
        ),
    }
}

/// One row per extracted sample.
pub fn format_samples(rows: &[SampleRecord]) -> String {
    let mut out = String::new();
    out.push_str("Per-sample parameters:\n");
    push_row(
        &mut out,
        format!(
            "{:<10} {:<12} {:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {}",
            "isolate", "week", "replicate", "G0'", "tan_d0", "gamma_f", "gamma_y", "WSO", "flags"
        ),
    );
    push_rule(&mut out, &[10, 12, 16, 10, 10, 10, 10, 10, 5]);

    for r in rows {
        let v = FeatureValues::from(r.values);
        let flags: Vec<String> = r.flags.iter().map(flag_label).collect();
        push_row(
            &mut out,
            format!(
                "{:<10} {:<12} {:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {}",
                truncate(&r.id.isolate, 10),
                truncate(&r.id.condition, 12),
                truncate(&r.id.replicate, 16),
                fmt_num(v.g0_prime),
                fmt_num(v.tan_delta0),
                fmt_num(v.gamma_f),
                fmt_num(v.gamma_y),
                fmt_num(v.wso),
                flags.join(","),
            ),
        );
    }

    out
}

/// Per-isolate `mean ± sem (n)` for every feature.
pub fn format_aggregates(aggregates: &BTreeMap<String, IsolateAggregate>, reference: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("Per-isolate mean ± SEM (n):\n");

    let mut header = format!("{:<10} {:>3}", "isolate", "N");
    for f in Feature::ALL {
        header.push_str(&format!(" {:>24}", f.label()));
    }
    push_row(&mut out, header);
    push_rule(&mut out, &[10, 3, 24, 24, 24, 24, 24]);

    for isolate in isolate_order(aggregates.keys().map(String::as_str), reference) {
        let agg = &aggregates[isolate];
        let mut line = format!("{:<10} {:>3}", truncate(isolate, 10), agg.samples);
        for f in Feature::ALL {
            line.push_str(&format!(" {:>24}", fmt_stat(agg.fields.get(f))));
        }
        push_row(&mut out, line);
    }

    out
}

/// Best / averaged / difference blocks over the common isolates.
pub fn format_comparison(table: &ComparisonTable, reference: Option<&str>) -> String {
    let mut out = String::new();

    out.push_str("Best sample:\n");
    out.push_str(&format_feature_table(&table.left, reference));
    out.push('\n');

    out.push_str("Averaged:\n");
    out.push_str(&format_feature_table(&table.right, reference));
    out.push('\n');

    let diff: BTreeMap<String, FeatureValues> = table
        .difference
        .iter()
        .map(|r| (r.isolate.clone(), r.difference))
        .collect();
    out.push_str("Difference (best - averaged):\n");
    out.push_str(&format_feature_table(&diff, reference));

    out
}

fn format_feature_table(table: &BTreeMap<String, FeatureValues>, reference: Option<&str>) -> String {
    let mut out = String::new();
    let mut header = format!("{:<10}", "isolate");
    for f in Feature::ALL {
        header.push_str(&format!(" {:>12}", f.column()));
    }
    push_row(&mut out, header);
    push_rule(&mut out, &[10, 12, 12, 12, 12, 12]);

    for isolate in isolate_order(table.keys().map(String::as_str), reference) {
        let values = &table[isolate];
        let mut line = format!("{:<10}", truncate(isolate, 10));
        for f in Feature::ALL {
            line.push_str(&format!(" {:>12}", fmt_num(*values.get(f))));
        }
        push_row(&mut out, line);
    }

    out
}

pub fn format_failures(failures: &[FailureRecord]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&format!("Failed samples ({}):\n", failures.len()));
    for f in failures {
        out.push_str(&format!("- {}: {}\n", f.id, f.error));
    }
    out
}

pub fn flag_label(flag: &ExtractFlag) -> String {
    match flag {
        ExtractFlag::BaselineFallback { points } => format!("fallback({points})"),
        ExtractFlag::InvalidBaseline { .. } => "invalid-baseline".to_string(),
        ExtractFlag::NoCrossover => "no-crossover".to_string(),
        ExtractFlag::NoYield => "no-yield".to_string(),
    }
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn push_rule(out: &mut String, widths: &[usize]) {
    let parts: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(out, parts.join(" "));
}

fn fmt_num(v: f64) -> String {
    if v.is_finite() { format!("{v:.4}") } else { "-".to_string() }
}

fn fmt_stat(s: &FieldStatistic) -> String {
    if s.count == 0 {
        return "-".to_string();
    }
    let sem = if s.sem.is_finite() { format!("{:.3}", s.sem) } else { "-".to_string() };
    format!("{:.3} ± {sem} ({})", s.mean, s.count)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Features, ParameterSet, SampleId};
    use crate::extract::BaselineSource;
    use crate::stats::{aggregate, comparison_table};

    fn record(isolate: &str, gamma_f: Option<f64>, flags: Vec<ExtractFlag>) -> SampleRecord {
        SampleRecord {
            id: SampleId::new(isolate, "week3", format!("{isolate}_30C_1")),
            values: Features {
                g0_prime: Some(123.456789),
                tan_delta0: Some(0.1),
                gamma_f,
                gamma_y: Some(0.5),
                wso: Some(2.0),
            },
            baseline_source: BaselineSource::PlateauRange,
            skipped: 3,
            points: 6,
            flags,
        }
    }

    #[test]
    fn undefined_values_print_as_dash_with_flags() {
        let out = format_samples(&[record("2103", None, vec![ExtractFlag::NoCrossover])]);
        let row = out.lines().nth(3).unwrap();
        assert!(row.starts_with("2103"), "{row}");
        assert!(row.contains("123.4568"), "{row}");
        assert!(row.contains(" - "), "{row}");
        assert!(row.ends_with("no-crossover"), "{row}");
    }

    #[test]
    fn aggregates_list_reference_first() {
        let sets: Vec<ParameterSet> = ["2103", "3610", "2107"]
            .iter()
            .map(|iso| ParameterSet {
                id: SampleId::new(*iso, "week3", format!("{iso}_30C_1")),
                values: Features::from_fn(|_| 1.0),
            })
            .collect();
        let out = format_aggregates(&aggregate(&sets), Some("3610"));
        let isolates: Vec<&str> = out
            .lines()
            .skip(3)
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(isolates, vec!["3610", "2103", "2107"]);
        // Single sample: SEM undefined.
        assert!(out.contains("1.000 ± - (1)"), "{out}");
    }

    #[test]
    fn comparison_prints_three_blocks() {
        let left = BTreeMap::from([("A".to_string(), Features::from_fn(|_| 2.0))]);
        let right = BTreeMap::from([("A".to_string(), Features::from_fn(|_| 1.5))]);
        let out = format_comparison(&comparison_table(&left, &right), None);
        assert!(out.contains("Best sample:"));
        assert!(out.contains("Averaged:"));
        assert!(out.contains("Difference (best - averaged):"));
        assert!(out.contains("0.5000"));
    }

    #[test]
    fn run_summary_describes_config() {
        let out = format_run_summary(&ExtractConfig::default(), 10, 9, 1);
        assert!(out.contains("Skip: leading 1/3 of each sweep"), "{out}");
        assert!(out.contains("plateau range [0.01, 0.1]%"), "{out}");
        assert!(out.contains("Crossover basis: normalized"), "{out}");
        assert!(out.contains("discovered=10 | extracted=9 | failed=1"), "{out}");
    }

    #[test]
    fn fixed_window_at_usize_max_does_not_overflow() {
        let config = ExtractConfig {
            baseline: BaselinePolicy::FixedWindow {
                start: usize::MAX,
                count: 5,
            },
            ..ExtractConfig::default()
        };
        assert!(config.validate().is_ok());
        let out = format_run_summary(&config, 1, 1, 0);
        assert!(out.contains(&format!("points {}..{}", usize::MAX, usize::MAX)), "{out}");
    }

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
