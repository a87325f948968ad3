//! Dataset balancer: raw Elliptic tables in, balanced subset out.
//!
//! Pipeline (single pass, no partial output):
//!   1. Read classes, edges and features as text; header names trimmed.
//!   2. Keep classes "1" (illicit) and "2" (licit); everything else is dropped.
//!   3. Keep every illicit row, then a seeded sample of equally many licit rows.
//!   4. Restrict edges (both endpoints) and features to the surviving txIds.
//!   5. Keep the first `feature_count` feature columns by position, renamed f1..fN.
//!   6. Only after every check passes, write the three tables.

use crate::{
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    rng::{RngBank, StageRng, StageSlot},
    table::Table,
    types::{Label, TxId},
};
use std::collections::HashSet;
use std::fmt;

pub const TX_ID: &str = "txId";
pub const CLASS: &str = "class";
pub const LABEL: &str = "label";
pub const EDGE_SRC: &str = "txId1";
pub const EDGE_DST: &str = "txId2";

/// The three raw Elliptic tables.
pub struct RawTables {
    pub classes: Table,
    pub edges: Table,
    pub features: Table,
}

impl RawTables {
    pub fn load(config: &PipelineConfig) -> PipelineResult<Self> {
        let paths = &config.input_paths;
        let classes = Table::read(&paths.classes)?;
        let edges = Table::read(&paths.edges)?;
        let mut features = Table::read_with(&paths.features, config.raw_features_have_header)?;
        if let Some(first) = features.headers.first_mut() {
            if first.as_str() != TX_ID {
                log::debug!("renaming feature id column '{first}' to {TX_ID}");
                *first = TX_ID.to_string();
            }
        }
        Ok(Self { classes, edges, features })
    }
}

/// The balanced tables, ready to be written.
pub struct BalancedTables {
    pub classes: Table,
    pub edges: Table,
    pub features: Table,
    pub summary: BalanceSummary,
}

impl BalancedTables {
    /// All three tables land, or none do.
    pub fn write(&self) -> PipelineResult<()> {
        Table::write_all(&[&self.classes, &self.edges, &self.features])
    }
}

/// Row counts reported after balancing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSummary {
    pub illicit: usize,
    pub licit: usize,
    pub edges: usize,
    pub feature_rows: usize,
    pub feature_count: usize,
    pub feature_header: Vec<String>,
}

impl BalanceSummary {
    pub fn transactions(&self) -> usize {
        self.illicit + self.licit
    }
}

impl fmt::Display for BalanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Transactions kept: {} (illicit={}, legit={})",
            self.transactions(),
            self.illicit,
            self.licit
        )?;
        writeln!(f, "Edges kept:        {}", self.edges)?;
        writeln!(
            f,
            "Feature rows kept: {}, features per tx: {}",
            self.feature_rows, self.feature_count
        )?;
        write!(f, "Header row for features.csv: {:?}", self.feature_header)
    }
}

/// Load, balance and write. Returns the summary for the caller to print.
pub fn run(config: &PipelineConfig) -> PipelineResult<BalanceSummary> {
    log::info!("balancer: loading raw tables");
    let raw = RawTables::load(config)?;
    let mut rng = RngBank::new(config.seed).for_stage(StageSlot::BalanceSample);
    let balanced = balance(&raw, config, &mut rng)?;
    balanced.write()?;
    log::info!(
        "balancer: wrote {}, {}, {}",
        balanced.classes.path.display(),
        balanced.edges.path.display(),
        balanced.features.path.display()
    );
    Ok(balanced.summary)
}

/// Pure balancing step. Touches no files.
pub fn balance(
    raw: &RawTables,
    config: &PipelineConfig,
    rng: &mut StageRng,
) -> PipelineResult<BalancedTables> {
    let labelled = resolve_classes(&raw.classes)?;
    let (illicit, licit): (Vec<_>, Vec<_>) =
        labelled.into_iter().partition(|(_, label)| *label == Label::Illicit);
    log::info!(
        "balancer: {} illicit and {} licit transactions with resolved class",
        illicit.len(),
        licit.len()
    );

    if licit.len() < illicit.len() {
        return Err(PipelineError::InsufficientData {
            illicit: illicit.len(),
            licit: licit.len(),
        });
    }

    let drawn = rand::seq::index::sample(rng, licit.len(), illicit.len()).into_vec();
    let balanced: Vec<(TxId, Label)> = illicit
        .iter()
        .cloned()
        .chain(drawn.into_iter().map(|i| licit[i].clone()))
        .collect();
    let valid: HashSet<&str> = balanced.iter().map(|(tx, _)| tx.as_str()).collect();

    let edges = filter_edges(&raw.edges, &valid, &config.output_paths.edges)?;
    let features = truncate_features(
        &raw.features,
        &valid,
        config.feature_count,
        &config.output_paths.features,
    )?;

    let classes = Table {
        path: config.output_paths.classes.clone(),
        headers: vec![TX_ID.to_string(), LABEL.to_string()],
        rows: balanced
            .iter()
            .map(|(tx, label)| vec![tx.clone(), label.to_string()])
            .collect(),
    };

    let summary = BalanceSummary {
        illicit: illicit.len(),
        licit: balanced.len() - illicit.len(),
        edges: edges.len(),
        feature_rows: features.len(),
        feature_count: config.feature_count,
        feature_header: features.headers.clone(),
    };

    Ok(BalancedTables { classes, edges, features, summary })
}

/// (txId, label) for every row whose class is "1" or "2", in file order.
fn resolve_classes(classes: &Table) -> PipelineResult<Vec<(TxId, Label)>> {
    let id_col = classes.column_index(TX_ID)?;
    let class_col = classes.column_index(CLASS)?;
    Ok(classes
        .rows
        .iter()
        .filter_map(|row| {
            Label::from_raw_class(&row[class_col]).map(|label| (row[id_col].clone(), label))
        })
        .collect())
}

fn filter_edges(
    edges: &Table,
    valid: &HashSet<&str>,
    out_path: &std::path::Path,
) -> PipelineResult<Table> {
    let src = edges.column_index(EDGE_SRC)?;
    let dst = edges.column_index(EDGE_DST)?;
    let rows = edges
        .rows
        .iter()
        .filter(|row| valid.contains(row[src].as_str()) && valid.contains(row[dst].as_str()))
        .map(|row| vec![row[src].clone(), row[dst].clone()])
        .collect();
    Ok(Table {
        path: out_path.to_path_buf(),
        headers: vec![EDGE_SRC.to_string(), EDGE_DST.to_string()],
        rows,
    })
}

/// Keep surviving rows and the first `keep` feature columns by position.
/// Values are copied verbatim but must parse as finite numbers.
fn truncate_features(
    features: &Table,
    valid: &HashSet<&str>,
    keep: usize,
    out_path: &std::path::Path,
) -> PipelineResult<Table> {
    let id_col = features.column_index(TX_ID)?;
    let feature_cols: Vec<usize> = (0..features.headers.len()).filter(|&i| i != id_col).collect();
    if feature_cols.len() < keep {
        return Err(PipelineError::InsufficientFeatures {
            required: keep,
            found: feature_cols.len(),
        });
    }
    let kept_cols = &feature_cols[..keep];

    let mut rows = Vec::new();
    for (row_idx, row) in features.rows.iter().enumerate() {
        if !valid.contains(row[id_col].as_str()) {
            continue;
        }
        let mut out = Vec::with_capacity(keep + 1);
        out.push(row[id_col].clone());
        for &col in kept_cols {
            let value = &row[col];
            if !value.trim().parse::<f64>().is_ok_and(f64::is_finite) {
                return Err(PipelineError::InvalidNumber {
                    path: features.path.clone(),
                    row: row_idx + 1,
                    column: features.headers[col].clone(),
                    value: value.clone(),
                });
            }
            out.push(value.clone());
        }
        rows.push(out);
    }

    let headers = std::iter::once(TX_ID.to_string())
        .chain((1..=keep).map(|i| format!("f{i}")))
        .collect();
    Ok(Table { path: out_path.to_path_buf(), headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            path: PathBuf::from("mem.csv"),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn unknown_and_unexpected_classes_are_dropped() {
        let classes = table(
            &["txId", "class"],
            &[&["a", "1"], &["b", "2"], &["c", "unknown"], &["d", "3"], &["e", " 1"]],
        );
        let resolved = resolve_classes(&classes).unwrap();
        assert_eq!(
            resolved,
            vec![("a".to_string(), Label::Illicit), ("b".to_string(), Label::Licit)]
        );
    }

    #[test]
    fn truncation_is_positional_not_by_name() {
        let features = table(&["txId", "z", "a", "m"], &[&["t1", "1.0", "2.0", "3.0"]]);
        let valid: HashSet<&str> = ["t1"].into_iter().collect();
        let out = truncate_features(&features, &valid, 2, std::path::Path::new("o.csv")).unwrap();
        assert_eq!(out.headers, vec!["txId", "f1", "f2"]);
        assert_eq!(out.rows, vec![vec!["t1", "1.0", "2.0"]]);
    }

    #[test]
    fn too_few_feature_columns_is_reported() {
        let features = table(&["txId", "a"], &[&["t1", "1.0"]]);
        let valid: HashSet<&str> = HashSet::new();
        let err = truncate_features(&features, &valid, 3, std::path::Path::new("o.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientFeatures { required: 3, found: 1 }));
    }

    #[test]
    fn non_numeric_feature_value_names_the_column() {
        let features = table(&["txId", "a", "b"], &[&["t1", "1.0", "oops"]]);
        let valid: HashSet<&str> = ["t1"].into_iter().collect();
        let err = truncate_features(&features, &valid, 2, std::path::Path::new("o.csv")).unwrap_err();
        match err {
            PipelineError::InvalidNumber { column, value, row, .. } => {
                assert_eq!(column, "b");
                assert_eq!(value, "oops");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_feature_values_are_rejected() {
        let valid: HashSet<&str> = ["t1"].into_iter().collect();
        for bad in ["NaN", "inf", "Infinity"] {
            let features = table(&["txId", "a", "b"], &[&["t1", bad, "2.0"]]);
            let err = truncate_features(&features, &valid, 2, std::path::Path::new("o.csv"))
                .unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidNumber { ref column, .. } if column == "a"),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn summary_reports_true_licit_count() {
        let summary = BalanceSummary {
            illicit: 3,
            licit: 3,
            edges: 2,
            feature_rows: 6,
            feature_count: 100,
            feature_header: vec!["txId".into(), "f1".into()],
        };
        let text = summary.to_string();
        assert!(text.starts_with("Transactions kept: 6 (illicit=3, legit=3)"));
        assert!(text.contains("Edges kept:        2"));
        assert!(text.contains("features per tx: 100"));
    }
}
