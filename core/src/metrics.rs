//! Held-out evaluation: accuracy and a per-class precision/recall/F1 report.

use crate::types::Label;
use std::fmt;

const WIDTH: usize = 12; // len("weighted avg")

pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Indexed by label value (0 = licit, 1 = illicit).
    pub per_class: Vec<(Label, ClassScores)>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

/// Zero denominators yield 0.0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationReport {
    pub fn new(y_true: &[Label], y_pred: &[Label]) -> Self {
        let per_class: Vec<(Label, ClassScores)> = Label::ALL
            .iter()
            .map(|&label| {
                let tp = y_true.iter().zip(y_pred).filter(|&(&t, &p)| t == label && p == label).count();
                let predicted = y_pred.iter().filter(|&&p| p == label).count();
                let support = y_true.iter().filter(|&&t| t == label).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                (label, ClassScores { precision, recall, f1, support })
            })
            .collect();

        let total: usize = per_class.iter().map(|(_, s)| s.support).sum();
        let k = per_class.len() as f64;
        let macro_avg = ClassScores {
            precision: per_class.iter().map(|(_, s)| s.precision).sum::<f64>() / k,
            recall: per_class.iter().map(|(_, s)| s.recall).sum::<f64>() / k,
            f1: per_class.iter().map(|(_, s)| s.f1).sum::<f64>() / k,
            support: total,
        };
        let weighted = |f: fn(&ClassScores) -> f64| {
            if total == 0 {
                0.0
            } else {
                per_class.iter().map(|(_, s)| f(s) * s.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = ClassScores {
            precision: weighted(|s| s.precision),
            recall: weighted(|s| s.recall),
            f1: weighted(|s| s.f1),
            support: total,
        };

        Self {
            accuracy: accuracy(y_true, y_pred),
            per_class,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn support(&self) -> usize {
        self.macro_avg.support
    }
}

fn score_row(f: &mut fmt::Formatter<'_>, name: &str, s: &ClassScores) -> fmt::Result {
    writeln!(
        f,
        "{name:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        s.precision,
        s.recall,
        s.f1,
        s.support,
        width = WIDTH
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = WIDTH
        )?;
        writeln!(f)?;
        for (label, scores) in &self.per_class {
            score_row(f, &label.to_string(), scores)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support(),
            width = WIDTH
        )?;
        score_row(f, "macro avg", &self.macro_avg)?;
        score_row(f, "weighted avg", &self.weighted_avg)
    }
}
