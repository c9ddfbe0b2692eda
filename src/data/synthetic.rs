//! Synthetic strain-sweep generation.
//!
//! Each isolate gets a deterministic material model (seeded from its id), and
//! each replicate adds its own scatter and measurement noise. The sweeps show
//! the features the extractor looks for: a startup transient, a linear
//! plateau, yield, a weak `G''` overshoot and a `G'`/`G''` crossover.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Sample, SampleId};
use crate::error::AppError;
use crate::io::export::write_sample_table_csv;

/// Width (in `ln x` units) of the loss-modulus overshoot around the yield strain.
const OVERSHOOT_WIDTH: f64 = 0.6;

/// Material parameters of one isolate.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepModel {
    /// Linear-regime storage modulus [Pa].
    pub plateau: f64,
    /// `G''0 / G'0` in the linear regime.
    pub tan_delta: f64,
    /// Strain [%] where `G'` has dropped to half the plateau.
    pub yield_strain: f64,
    /// Relative height of the `G''` bump near yield.
    pub overshoot: f64,
    /// Relative excess at the first point, decaying over the next few.
    pub transient: f64,
}

impl SweepModel {
    pub fn for_isolate(isolate: &str, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(isolate_seed(isolate, seed));
        Self {
            plateau: rng.gen_range(50.0..500.0),
            tan_delta: rng.gen_range(0.08..0.3),
            yield_strain: rng.gen_range(0.5..5.0),
            overshoot: rng.gen_range(0.3..1.0),
            transient: rng.gen_range(0.3..0.8),
        }
    }

    pub fn storage(&self, strain: f64) -> f64 {
        let x = strain / self.yield_strain;
        self.plateau / (1.0 + x * x)
    }

    // Falls as x^-1/2 past yield, slower than G' (x^-2), so the moduli cross.
    pub fn loss(&self, strain: f64) -> f64 {
        let x = strain / self.yield_strain;
        let bump = self.overshoot * (-(x.ln().powi(2)) / (2.0 * OVERSHOOT_WIDTH * OVERSHOOT_WIDTH)).exp();
        self.plateau * self.tan_delta * (1.0 + bump) / (1.0 + x * x).powf(0.25)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub isolates: Vec<String>,
    pub conditions: Vec<String>,
    pub replicates: usize,
    pub points: usize,
    pub strain_min: f64,
    pub strain_max: f64,
    /// Standard deviation of the multiplicative log-noise.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            isolates: ["3610", "2103", "2106", "2107", "2109"].map(String::from).to_vec(),
            conditions: ["week3", "week4"].map(String::from).to_vec(),
            replicates: 3,
            points: 40,
            strain_min: 1e-4,
            strain_max: 1e3,
            noise: 0.02,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.isolates.is_empty() || self.conditions.is_empty() {
            return Err(AppError::new(2, "At least one isolate and one condition are required."));
        }
        if self.replicates == 0 {
            return Err(AppError::new(2, "Replicate count must be > 0."));
        }
        if self.points < 2 {
            return Err(AppError::new(2, "A sweep needs at least 2 points."));
        }
        if !(self.strain_min > 0.0 && self.strain_max.is_finite() && self.strain_max > self.strain_min) {
            return Err(AppError::new(2, "Invalid strain range for simulation."));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(AppError::new(2, "Noise level must be finite and >= 0."));
        }
        if let Some(bad) = self.isolates.iter().find(|i| i.is_empty() || i.contains('_')) {
            return Err(AppError::new(2, format!("Invalid isolate id `{bad}` (must be non-empty, without `_`).")));
        }
        Ok(())
    }
}

/// `n` log-spaced strains from `min` to `max` inclusive.
pub fn strain_grid(min: f64, max: f64, n: usize) -> Vec<f64> {
    let (l0, l1) = (min.log10(), max.log10());
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            10f64.powf(l0 + u * (l1 - l0))
        })
        .collect()
}

/// One replicate sweep of `model`, with scatter and noise drawn from `rng`.
pub fn simulate_sample(
    model: &SweepModel,
    id: SampleId,
    config: &SimulationConfig,
    rng: &mut StdRng,
) -> Result<Sample, AppError> {
    let normal = Normal::<f64>::new(0.0, 1.0)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;

    // Replicate-to-replicate scatter of the material itself.
    let scale = (0.1 * normal.sample(rng)).exp();

    let strain = strain_grid(config.strain_min, config.strain_max, config.points);
    let mut storage = Vec::with_capacity(strain.len());
    let mut loss = Vec::with_capacity(strain.len());
    for (i, &g) in strain.iter().enumerate() {
        let startup = 1.0 + model.transient * (-(i as f64) / 2.0).exp();
        let n1 = (config.noise * normal.sample(rng)).exp();
        let n2 = (config.noise * normal.sample(rng)).exp();
        storage.push(model.storage(g) * scale * startup * n1);
        loss.push(model.loss(g) * scale * startup * n2);
    }

    Sample::new(id, strain, storage, loss).map_err(|e| AppError::new(2, format!("Synthetic sweep error: {e}")))
}

/// Every `(condition, isolate, replicate)` sweep, in that order.
pub fn simulate_dataset(config: &SimulationConfig) -> Result<Vec<Sample>, AppError> {
    config.validate()?;

    let mut out = Vec::with_capacity(config.conditions.len() * config.isolates.len() * config.replicates);
    for condition in &config.conditions {
        for isolate in &config.isolates {
            let model = SweepModel::for_isolate(isolate, config.seed);
            for r in 1..=config.replicates {
                let replicate = format!("{isolate}_30C_{r}");
                let mut rng = StdRng::seed_from_u64(replicate_seed(condition, &replicate, config.seed));
                let id = SampleId::new(isolate, condition, replicate);
                out.push(simulate_sample(&model, id, config, &mut rng)?);
            }
        }
    }
    Ok(out)
}

/// Write the dataset as `<root>/<condition>/<isolate>_30C_<r>.csv`.
pub fn write_dataset(root: &Path, config: &SimulationConfig) -> Result<Vec<PathBuf>, AppError> {
    let samples = simulate_dataset(config)?;
    let mut paths = Vec::with_capacity(samples.len());
    for sample in &samples {
        let dir = root.join(&sample.id().condition);
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
        let path = dir.join(format!("{}.csv", sample.id().replicate));
        write_sample_table_csv(&path, sample)?;
        paths.push(path);
    }
    log::info!("Wrote {} synthetic sweeps under {}", paths.len(), root.display());
    Ok(paths)
}

fn isolate_seed(isolate: &str, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    isolate.hash(&mut hasher);
    seed.hash(&mut hasher);
    hasher.finish()
}

fn replicate_seed(condition: &str, replicate: &str, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    condition.hash(&mut hasher);
    replicate.hash(&mut hasher);
    seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExtractConfig;
    use crate::extract::{ExtractFlag, extract_parameters};
    use crate::io::ingest::discover_sources;

    fn small() -> SimulationConfig {
        SimulationConfig {
            isolates: vec!["3610".into(), "2103".into()],
            conditions: vec!["week3".into()],
            replicates: 2,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn strain_grid_is_log_spaced_and_inclusive() {
        let g = strain_grid(0.01, 100.0, 5);
        let expected = [0.01, 0.1, 1.0, 10.0, 100.0];
        for (a, b) in g.iter().zip(expected) {
            assert!((a / b - 1.0).abs() < 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn isolate_model_is_deterministic_per_seed() {
        assert_eq!(SweepModel::for_isolate("2103", 7), SweepModel::for_isolate("2103", 7));
        assert_ne!(SweepModel::for_isolate("2103", 7), SweepModel::for_isolate("3610", 7));
    }

    #[test]
    fn dataset_is_reproducible() {
        let a = simulate_dataset(&small()).unwrap();
        let b = simulate_dataset(&small()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert_eq!(a[0].id().replicate, "3610_30C_1");
    }

    #[test]
    fn noiseless_sweeps_have_defined_crossover_and_yield() {
        let config = SimulationConfig { noise: 0.0, ..small() };
        for sample in simulate_dataset(&config).unwrap() {
            let x = extract_parameters(&sample, &ExtractConfig::default()).unwrap();
            let v = x.params.values;
            assert!(v.gamma_f.is_finite(), "{}: no crossover", sample.id());
            assert!(v.gamma_y.is_finite(), "{}: no yield", sample.id());
            assert!(v.gamma_y < v.gamma_f);
            assert!(v.wso > 0.0);
            assert!(!x.has_flag(&ExtractFlag::BaselineFallback { points: 5 }));
        }
    }

    #[test]
    fn noisy_sweeps_still_cross_and_yield() {
        for sample in simulate_dataset(&small()).unwrap() {
            let v = extract_parameters(&sample, &ExtractConfig::default()).unwrap().params.values;
            assert!(v.gamma_f.is_finite() && v.gamma_y.is_finite(), "{}", sample.id());
        }
    }

    #[test]
    fn written_dataset_is_discoverable() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_dataset(dir.path(), &small()).unwrap();
        assert_eq!(paths.len(), 4);

        let sources = discover_sources(dir.path(), &[]).unwrap();
        assert_eq!(sources.len(), 4);
        assert_eq!(sources[0].id.isolate, "2103");
        assert_eq!(sources[0].id.replicate, "2103_30C_1");
    }

    #[test]
    fn rejects_isolate_ids_with_underscores() {
        let config = SimulationConfig {
            isolates: vec!["bad_id".into()],
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }
}
