//! Classifier trainer/evaluator.
//!
//! Pipeline:
//!   1. Inner-join balanced features and labels on txId.
//!   2. Stratified train/test split.
//!   3. Fit the scaler on the training partition only; transform both.
//!   4. Fit the MLP on the scaled training rows.
//!   5. Predict the scaled test rows and score them.

use crate::{
    config::PipelineConfig,
    dataset::{self, LabeledDataset},
    error::{PipelineError, PipelineResult},
    metrics::ClassificationReport,
    mlp::{FitReport, MlpClassifier},
    rng::{RngBank, StageSlot},
    scaler::StandardScaler,
    split::stratified_split,
    types::Label,
};

#[derive(Debug)]
pub struct TrainingOutcome {
    pub train_rows: usize,
    pub test_rows: usize,
    pub scaler: StandardScaler,
    pub model: MlpClassifier,
    pub fit: FitReport,
    pub predictions: Vec<Label>,
    pub report: ClassificationReport,
}

impl TrainingOutcome {
    pub fn accuracy_line(&self) -> String {
        format!("Test Accuracy: {:.2}%", self.report.accuracy * 100.0)
    }
}

/// Read the balanced tables named in `config.output_paths` and evaluate.
pub fn run(config: &PipelineConfig) -> PipelineResult<TrainingOutcome> {
    log::info!("trainer: loading balanced tables");
    let data = dataset::load_joined(&config.output_paths.features, &config.output_paths.classes)?;
    evaluate(&data, config)
}

pub fn evaluate(data: &LabeledDataset, config: &PipelineConfig) -> PipelineResult<TrainingOutcome> {
    let bank = RngBank::new(config.seed);
    let split = stratified_split(data, config.test_fraction, &mut bank.for_stage(StageSlot::Split));
    log::info!(
        "trainer: {} train rows, {} test rows",
        split.train.len(),
        split.test.len()
    );

    for label in Label::ALL {
        if split.train.count(label) == 0 {
            return Err(PipelineError::DegenerateClass {
                partition: "training",
                missing_label: label.as_u8(),
            });
        }
    }
    if split.test.is_empty() {
        return Err(anyhow::anyhow!(
            "test partition is empty: {} rows at test_fraction {}",
            data.len(),
            config.test_fraction
        )
        .into());
    }

    let (scaler, x_train) = StandardScaler::fit_transform(&split.train.x);
    let x_test = scaler.transform(&split.test.x);

    log::info!(
        "trainer: fitting MLP ({} inputs, {} hidden units, max {} iterations)",
        data.n_features(),
        config.mlp.hidden_units,
        config.mlp.max_iterations
    );
    let (model, fit) = MlpClassifier::fit(&x_train, &split.train.y, &config.mlp, &bank)?;

    let predictions = model.predict(&x_test)?;
    let report = ClassificationReport::new(&split.test.y, &predictions);

    Ok(TrainingOutcome {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        scaler,
        model,
        fit,
        predictions,
        report,
    })
}
