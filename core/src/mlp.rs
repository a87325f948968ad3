//! Single-hidden-layer perceptron for binary classification, on candle.
//!
//! Architecture: inputs -> `hidden_units` ReLU -> 2 logits (licit, illicit).
//! Loss: cross-entropy + alpha/2 * ||W||^2 / batch_len.
//! Optimizer: Adam (AdamW with zero decay) over shuffled mini-batches.
//!
//! Stopping: after each epoch, if the epoch loss failed to beat the best
//! loss by more than `tol` for more than `n_iter_no_change` epochs in a row,
//! training stops and counts as converged. Hitting `max_iterations` first
//! is a non-fatal convergence warning.

use crate::{
    config::MlpConfig,
    error::PipelineResult,
    rng::{RngBank, StageRng, StageSlot},
    types::Label,
};
use candle_core::{Device, Tensor, Var, D};
use candle_nn::{Linear, Module, Optimizer, ParamsAdamW};
use rand::{seq::SliceRandom, Rng};

const NUM_CLASSES: usize = 2;

#[derive(Debug, Clone)]
pub struct MlpClassifier {
    hidden: Linear,
    output: Linear,
    device: Device,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub iterations: usize,
    pub converged: bool,
    pub loss_curve: Vec<f64>,
}

impl FitReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_curve.last().copied()
    }
}

/// Glorot-uniform weight and bias for a `fan_in -> fan_out` layer:
/// bound sqrt(gain / (fan_in + fan_out)). candle's own initializers draw
/// from an unseeded RNG, so weights come from the stage RNG instead.
fn glorot(
    rng: &mut StageRng,
    fan_in: usize,
    fan_out: usize,
    gain: f64,
    device: &Device,
) -> PipelineResult<(Var, Var)> {
    let bound = (gain / (fan_in + fan_out) as f64).sqrt();
    let mut draw = |len: usize| -> Vec<f32> {
        (0..len).map(|_| rng.gen_range(-bound..bound) as f32).collect()
    };
    let weight = Var::from_vec(draw(fan_out * fan_in), (fan_out, fan_in), device)?;
    let bias = Var::from_vec(draw(fan_out), fan_out, device)?;
    Ok((weight, bias))
}

fn to_tensor(x: &[Vec<f64>], device: &Device) -> PipelineResult<Tensor> {
    let cols = x.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<f32> = x.iter().flatten().map(|&v| v as f32).collect();
    Ok(Tensor::from_vec(flat, (x.len(), cols), device)?)
}

impl MlpClassifier {
    fn logits(&self, x: &Tensor) -> PipelineResult<Tensor> {
        let h = self.hidden.forward(x)?.relu()?;
        Ok(self.output.forward(&h)?)
    }

    /// Train a fresh network on already-scaled rows.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[Label],
        config: &MlpConfig,
        bank: &RngBank,
    ) -> PipelineResult<(Self, FitReport)> {
        let device = Device::Cpu;
        let n = x.len();
        let n_inputs = x.first().map(Vec::len).unwrap_or(0);
        let inputs = to_tensor(x, &device)?;
        let targets: Vec<u32> = y.iter().map(|l| l.as_u8() as u32).collect();
        let labels = Tensor::from_vec(targets, n, &device)?;

        let mut init_rng = bank.for_stage(StageSlot::WeightInit);
        let (w1, b1) = glorot(&mut init_rng, n_inputs, config.hidden_units, 6.0, &device)?;
        let (w2, b2) = glorot(&mut init_rng, config.hidden_units, NUM_CLASSES, 2.0, &device)?;
        let net = Self {
            hidden: Linear::new(w1.as_tensor().clone(), Some(b1.as_tensor().clone())),
            output: Linear::new(w2.as_tensor().clone(), Some(b2.as_tensor().clone())),
            device: device.clone(),
        };
        let mut optimizer = candle_nn::AdamW::new(
            vec![w1, b1, w2, b2],
            ParamsAdamW {
                lr: config.learning_rate,
                beta1: config.beta1,
                beta2: config.beta2,
                eps: config.epsilon,
                weight_decay: 0.0,
            },
        )?;

        let mut shuffle_rng = bank.for_stage(StageSlot::EpochShuffle);
        let batch_size = config.batch_size.clamp(1, n.max(1));
        let mut order: Vec<u32> = (0..n as u32).collect();
        let mut loss_curve = Vec::with_capacity(config.max_iterations);
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut converged = false;

        for epoch in 1..=config.max_iterations {
            if config.shuffle {
                order.shuffle(&mut shuffle_rng);
            }
            let mut epoch_loss = 0.0;
            for batch in order.chunks(batch_size) {
                let idx = Tensor::new(batch, &device)?;
                let logits = net.logits(&inputs.index_select(&idx, 0)?)?;
                let data_loss = candle_nn::loss::cross_entropy(&logits, &labels.index_select(&idx, 0)?)?;
                let penalty = net
                    .hidden
                    .weight()
                    .sqr()?
                    .sum_all()?
                    .add(&net.output.weight().sqr()?.sum_all()?)?
                    .affine(0.5 * config.alpha / batch.len() as f64, 0.0)?;
                let loss = data_loss.add(&penalty)?;
                optimizer.backward_step(&loss)?;
                epoch_loss += loss.to_scalar::<f32>()? as f64 * batch.len() as f64;
            }
            let loss = epoch_loss / n.max(1) as f64;
            loss_curve.push(loss);
            log::info!("Iteration {epoch}, loss = {loss:.8}");

            if loss > best_loss - config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if loss < best_loss {
                best_loss = loss;
            }
            if no_improvement > config.n_iter_no_change {
                log::info!(
                    "Training loss did not improve more than tol={} for {} consecutive epochs. Stopping.",
                    config.tol,
                    config.n_iter_no_change
                );
                converged = true;
                break;
            }
        }

        let iterations = loss_curve.len();
        if !converged {
            log::warn!(
                "Stochastic optimizer: maximum iterations ({}) reached and the optimization hasn't converged yet.",
                config.max_iterations
            );
        }
        Ok((net, FitReport { iterations, converged, loss_curve }))
    }

    /// Most likely class per row.
    pub fn predict(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<Label>> {
        let logits = self.logits(&to_tensor(x, &self.device)?)?;
        let classes = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;
        Ok(classes
            .into_iter()
            .map(|c| if c == 1 { Label::Illicit } else { Label::Licit })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<Label>) {
        let mut rng = RngBank::new(1).for_stage(StageSlot::Split);
        (0..n)
            .map(|i| {
                let label = if i % 2 == 0 { Label::Illicit } else { Label::Licit };
                let shift = if label == Label::Illicit { 1.5 } else { -1.5 };
                (vec![shift + rng.gen_range(-0.5..0.5), rng.gen_range(-1.0..1.0)], label)
            })
            .unzip()
    }

    #[test]
    fn init_respects_glorot_bounds() {
        let mut rng = RngBank::new(9).for_stage(StageSlot::WeightInit);
        let (w, b) = glorot(&mut rng, 100, 100, 6.0, &Device::Cpu).unwrap();
        assert_eq!(w.dims(), &[100, 100]);
        let bound = (6.0f64 / 200.0).sqrt() as f32;
        let values = w.as_tensor().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|v| v.abs() <= bound));
        assert_eq!(b.dims(), &[100]);
    }

    #[test]
    fn learns_a_linearly_separable_problem() {
        let (x, y) = separable(200);
        let config = MlpConfig {
            hidden_units: 8,
            max_iterations: 200,
            learning_rate: 0.01,
            batch_size: 32,
            ..MlpConfig::default()
        };
        let (net, report) = MlpClassifier::fit(&x, &y, &config, &RngBank::new(42)).unwrap();
        let predicted = net.predict(&x).unwrap();
        let correct = predicted.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct >= 195, "only {correct}/200 correct");
        assert!(report.final_loss().unwrap() < report.loss_curve[0]);
    }

    #[test]
    fn iteration_cap_is_a_warning_not_a_failure() {
        let (x, y) = separable(50);
        let config = MlpConfig { hidden_units: 4, max_iterations: 2, ..MlpConfig::default() };
        let (net, report) = MlpClassifier::fit(&x, &y, &config, &RngBank::new(42)).unwrap();
        assert_eq!(report.iterations, 2);
        assert!(!report.converged);
        assert_eq!(net.predict(&x).unwrap().len(), 50);
    }

    #[test]
    fn same_seed_same_training_run() {
        let (x, y) = separable(40);
        let config = MlpConfig { hidden_units: 4, max_iterations: 5, ..MlpConfig::default() };
        let (a, ra) = MlpClassifier::fit(&x, &y, &config, &RngBank::new(5)).unwrap();
        let (b, rb) = MlpClassifier::fit(&x, &y, &config, &RngBank::new(5)).unwrap();
        assert_eq!(ra.loss_curve, rb.loss_curve);
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }
}
