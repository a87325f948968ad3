//! Pipeline configuration: every seed, ratio, hyperparameter and file path
//! the two stages use. Loaded from JSON; any missing field takes its default.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    pub test_fraction: f64,
    /// Leading raw feature columns kept by the balancer.
    pub feature_count: usize,
    /// The published Elliptic feature dump has no header row.
    /// Set false to read it as such; columns become txId, 1, 2, ...
    pub raw_features_have_header: bool,
    pub mlp: MlpConfig,
    pub input_paths: InputPaths,
    pub output_paths: OutputPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    pub hidden_units: usize,
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// L2 penalty strength.
    pub alpha: f64,
    pub batch_size: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub shuffle: bool,
}

/// Raw Elliptic tables read by the balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub classes: PathBuf,
    pub edges: PathBuf,
    pub features: PathBuf,
}

/// Balanced tables written by the balancer and read by the trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub classes: PathBuf,
    pub edges: PathBuf,
    pub features: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.3,
            feature_count: 100,
            raw_features_have_header: true,
            mlp: MlpConfig::default(),
            input_paths: InputPaths::default(),
            output_paths: OutputPaths::default(),
        }
    }
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_units: 100,
            max_iterations: 100,
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            alpha: 1e-4,
            batch_size: 200,
            tol: 1e-4,
            n_iter_no_change: 10,
            shuffle: true,
        }
    }
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            classes: "elliptic_txs_classes.csv".into(),
            edges: "elliptic_txs_edgelist.csv".into(),
            features: "elliptic_txs_features.csv".into(),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            classes: "elliptic_balanced_classes.csv".into(),
            edges: "elliptic_balanced_edgelist.csv".into(),
            features: "elliptic_balanced_features.csv".into(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fast settings for tests on synthetic tables.
    /// Paths must still be pointed at a scratch directory via `with_data_dir`.
    pub fn default_test() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.3,
            feature_count: 4,
            raw_features_have_header: true,
            mlp: MlpConfig {
                hidden_units: 8,
                max_iterations: 200,
                learning_rate: 0.01,
                batch_size: 16,
                ..MlpConfig::default()
            },
            input_paths: InputPaths::default(),
            output_paths: OutputPaths::default(),
        }
    }

    /// Resolve every relative path against `dir`. Absolute paths are untouched.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        for path in [
            &mut self.input_paths.classes,
            &mut self.input_paths.edges,
            &mut self.input_paths.features,
            &mut self.output_paths.classes,
            &mut self.output_paths.edges,
            &mut self.output_paths.features,
        ] {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(anyhow::anyhow!(
                "test_fraction must lie strictly between 0 and 1, got {}",
                self.test_fraction
            )
            .into());
        }
        if self.feature_count == 0 {
            return Err(anyhow::anyhow!("feature_count must be at least 1").into());
        }
        if self.mlp.hidden_units == 0 || self.mlp.max_iterations == 0 || self.mlp.batch_size == 0 {
            return Err(anyhow::anyhow!(
                "hidden_units, max_iterations and batch_size must all be at least 1"
            )
            .into());
        }
        Ok(())
    }
}
