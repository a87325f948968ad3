//! Balanced feature/label tables joined into a numeric design matrix.

use crate::{
    balancer::{LABEL, TX_ID},
    error::{PipelineError, PipelineResult},
    table::Table,
    types::{Label, TxId},
};
use std::collections::HashMap;
use std::path::Path;

/// Rows of the inner join `features ⨝ labels` on txId, in feature-table order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    pub tx_ids: Vec<TxId>,
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Label>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn count(&self, label: Label) -> usize {
        self.y.iter().filter(|&&l| l == label).count()
    }

    /// Gather the given rows into a new dataset, in index order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            tx_ids: indices.iter().map(|&i| self.tx_ids[i].clone()).collect(),
            feature_names: self.feature_names.clone(),
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}

pub fn load_joined(
    features_path: impl AsRef<Path>,
    labels_path: impl AsRef<Path>,
) -> PipelineResult<LabeledDataset> {
    let features = Table::read(features_path)?;
    let labels = Table::read(labels_path)?;
    join(&features, &labels)
}

/// Inner join on txId. Feature rows without a label are dropped, and so are
/// labels without features. Zero surviving rows is an EmptyJoin error.
pub fn join(features: &Table, labels: &Table) -> PipelineResult<LabeledDataset> {
    let label_id = labels.column_index(TX_ID)?;
    let label_col = labels.column_index(LABEL)?;

    let mut by_id: HashMap<&str, Label> = HashMap::with_capacity(labels.len());
    for (row_idx, row) in labels.rows.iter().enumerate() {
        let raw = row[label_col].trim();
        let label = raw
            .parse::<u8>()
            .ok()
            .and_then(Label::from_u8)
            .ok_or_else(|| PipelineError::InvalidLabel {
                path: labels.path.clone(),
                row: row_idx + 1,
                value: raw.to_string(),
            })?;
        if by_id.insert(row[label_id].as_str(), label).is_some() {
            return Err(PipelineError::DuplicateTxId {
                path: labels.path.clone(),
                tx_id: row[label_id].clone(),
            });
        }
    }

    let feature_id = features.column_index(TX_ID)?;
    let feature_cols: Vec<usize> = features
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.as_str() != TX_ID && h.as_str() != LABEL)
        .map(|(i, _)| i)
        .collect();
    let feature_names = feature_cols.iter().map(|&i| features.headers[i].clone()).collect();

    let mut dataset = LabeledDataset {
        tx_ids: Vec::new(),
        feature_names,
        x: Vec::new(),
        y: Vec::new(),
    };
    for (row_idx, row) in features.rows.iter().enumerate() {
        let Some(&label) = by_id.get(row[feature_id].as_str()) else {
            continue;
        };
        let mut values = Vec::with_capacity(feature_cols.len());
        for &col in &feature_cols {
            let raw = &row[col];
            let value = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PipelineError::InvalidNumber {
                    path: features.path.clone(),
                    row: row_idx + 1,
                    column: features.headers[col].clone(),
                    value: raw.clone(),
                })?;
            values.push(value);
        }
        dataset.tx_ids.push(row[feature_id].clone());
        dataset.x.push(values);
        dataset.y.push(label);
    }

    if dataset.is_empty() {
        return Err(PipelineError::EmptyJoin {
            features_path: features.path.clone(),
            labels_path: labels.path.clone(),
        });
    }
    log::info!(
        "joined {} rows x {} features ({} illicit, {} licit)",
        dataset.len(),
        dataset.n_features(),
        dataset.count(Label::Illicit),
        dataset.count(Label::Licit)
    );
    Ok(dataset)
}
