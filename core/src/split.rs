//! Stratified train/test partitioning.

use crate::{dataset::LabeledDataset, rng::StageRng, types::Label};
use rand::seq::SliceRandom;

pub struct TrainTestSplit {
    pub train: LabeledDataset,
    pub test: LabeledDataset,
}

/// Rows going to the training side: round(n * (1 - test_fraction)).
pub fn train_size(n: usize, test_fraction: f64) -> usize {
    ((n as f64 * (1.0 - test_fraction)).round() as usize).min(n)
}

/// Per-class training counts summing exactly to `n_train`.
/// Each class gets floor(count * n_train / n); leftover rows go to the
/// classes with the largest remainders, ties to the earlier class.
pub fn allocate(class_counts: &[usize], n_train: usize) -> Vec<usize> {
    let n: usize = class_counts.iter().sum();
    if n == 0 {
        return vec![0; class_counts.len()];
    }
    let mut alloc: Vec<usize> = class_counts.iter().map(|&c| c * n_train / n).collect();
    let mut leftover = n_train - alloc.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..class_counts.len()).collect();
    order.sort_by_key(|&k| std::cmp::Reverse((class_counts[k] * n_train) % n));
    for k in order {
        if leftover == 0 {
            break;
        }
        if alloc[k] < class_counts[k] {
            alloc[k] += 1;
            leftover -= 1;
        }
    }
    alloc
}

/// Shuffle within each class, cut each at its allocated count, then shuffle
/// each partition so classes are interleaved.
pub fn stratified_split(
    data: &LabeledDataset,
    test_fraction: f64,
    rng: &mut StageRng,
) -> TrainTestSplit {
    let n_train = train_size(data.len(), test_fraction);
    let by_class: Vec<Vec<usize>> = Label::ALL
        .iter()
        .map(|&label| (0..data.len()).filter(|&i| data.y[i] == label).collect())
        .collect();
    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    let alloc = allocate(&counts, n_train);

    let mut train_idx = Vec::with_capacity(n_train);
    let mut test_idx = Vec::with_capacity(data.len() - n_train);
    for (mut indices, take) in by_class.into_iter().zip(alloc) {
        indices.shuffle(rng);
        let rest = indices.split_off(take);
        train_idx.extend(indices);
        test_idx.extend(rest);
    }
    train_idx.shuffle(rng);
    test_idx.shuffle(rng);

    log::debug!("split {} rows into {} train / {} test", data.len(), train_idx.len(), test_idx.len());
    TrainTestSplit {
        train: data.select(&train_idx),
        test: data.select(&test_idx),
    }
}
