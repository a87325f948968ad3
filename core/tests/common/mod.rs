//! Synthetic raw Elliptic-shaped tables for integration tests.
#![allow(dead_code)]

use elliptic_core::PipelineConfig;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shape of a generated raw dataset.
#[derive(Clone, Copy)]
pub struct RawShape {
    pub illicit: usize,
    pub licit: usize,
    pub unknown: usize,
    pub n_features: usize,
}

pub struct RawFixture {
    pub dir: TempDir,
    pub config: PipelineConfig,
    /// txId -> raw class string ("1", "2" or "unknown").
    pub classes: HashMap<String, String>,
}

/// txIds look numeric on purpose; they must survive as text.
fn tx_id(k: usize) -> String {
    format!("{}", 230_400_000 + k * 37)
}

/// Feature j of transaction k. f1 separates the classes; the rest is
/// deterministic noise.
fn feature(k: usize, j: usize, illicit: bool) -> f64 {
    let noise = ((k * 7 + j * 13) % 17) as f64 / 17.0 - 0.5;
    if j == 1 {
        (if illicit { 2.0 } else { -2.0 }) + noise
    } else {
        noise * j as f64
    }
}

/// Round-robin "1", "2", "unknown" until each bucket is exhausted, so the
/// classes are interleaved in file order.
fn interleaved_classes(shape: RawShape) -> Vec<&'static str> {
    let mut left = [(shape.illicit, "1"), (shape.licit, "2"), (shape.unknown, "unknown")];
    let mut out = Vec::new();
    while left.iter().any(|(n, _)| *n > 0) {
        for (n, class) in left.iter_mut() {
            if *n > 0 {
                *n -= 1;
                out.push(*class);
            }
        }
    }
    out
}

pub fn write_raw(dir: &Path, shape: RawShape) -> HashMap<String, String> {
    let total = shape.illicit + shape.licit + shape.unknown;
    let mut classes = HashMap::new();
    let mut class_csv = String::from("txId,class\n");
    let mut feature_csv = String::new();
    // Header with a blank id name and padded names, as in raw dumps.
    feature_csv.push(' ');
    for j in 1..=shape.n_features {
        let _ = write!(feature_csv, ", raw_{j} ");
    }
    feature_csv.push('\n');

    for (k, class) in interleaved_classes(shape).into_iter().enumerate() {
        let id = tx_id(k);
        let _ = writeln!(class_csv, "{id},{class}");
        feature_csv.push_str(&id);
        for j in 1..=shape.n_features {
            let _ = write!(feature_csv, ",{}", feature(k, j, class == "1"));
        }
        feature_csv.push('\n');
        classes.insert(id, class.to_string());
    }

    let mut edge_csv = String::from("txId1,txId2\n");
    for k in 0..total.saturating_sub(1) {
        let _ = writeln!(edge_csv, "{},{}", tx_id(k), tx_id(k + 1));
        if k + 5 < total {
            let _ = writeln!(edge_csv, "{},{}", tx_id(k + 5), tx_id(k));
        }
    }

    std::fs::write(dir.join("elliptic_txs_classes.csv"), class_csv).unwrap();
    std::fs::write(dir.join("elliptic_txs_features.csv"), feature_csv).unwrap();
    std::fs::write(dir.join("elliptic_txs_edgelist.csv"), edge_csv).unwrap();
    classes
}

pub fn raw_fixture(shape: RawShape) -> RawFixture {
    init_logging();
    let dir = tempfile::tempdir().expect("create temp dir");
    let classes = write_raw(dir.path(), shape);
    let config = PipelineConfig::default_test().with_data_dir(dir.path());
    RawFixture { dir, config, classes }
}

pub fn count_by_class(classes: &HashMap<String, String>, class: &str) -> usize {
    classes.values().filter(|c| c.as_str() == class).count()
}
