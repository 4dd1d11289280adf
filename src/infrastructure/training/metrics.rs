//! Hold-out evaluation metrics

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::{ClassMetrics, ConfusionMatrix};

/// Stratified train/test split; returns sorted `(train, test)` row indices
///
/// Each class contributes `round(n_class * test_size)` rows to the test set,
/// keeping at least one row of every class in training.
pub fn stratified_split(y: &[u8], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for label in [0u8, 1] {
        let mut rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == label).collect();
        rows.shuffle(&mut rng);

        let n_test = ((rows.len() as f64) * test_size).round() as usize;
        let n_test = n_test.min(rows.len().saturating_sub(1));

        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    match cm.total() {
        0 => 0.0,
        total => cm.correct() as f64 / total as f64,
    }
}

/// Area under the ROC curve via the rank-sum statistic; `None` for a single class
pub fn roc_auc(actual: &[u8], scores: &[f64]) -> Option<f64> {
    let positives = actual.iter().filter(|&&v| v == 1).count();
    let negatives = actual.len() - positives;
    if positives == 0 || negatives == 0 || actual.len() != scores.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // average ranks over ties
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            ranks[i] = rank;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = (0..actual.len())
        .filter(|&i| actual[i] == 1)
        .map(|i| ranks[i])
        .sum();
    let p = positives as f64;
    let n = negatives as f64;

    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Precision, recall, F1 and support for both classes
pub fn class_metrics(cm: &ConfusionMatrix) -> Vec<ClassMetrics> {
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    (0..2)
        .map(|c| {
            let tp = cm.matrix[c][c];
            let support = cm.matrix[c][0] + cm.matrix[c][1];
            let predicted = cm.matrix[0][c] + cm.matrix[1][c];

            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: c as u8,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_split_keeps_class_balance() {
        let y: Vec<u8> = (0..100).map(|i| u8::from(i < 30)).collect();
        let (train, test) = stratified_split(&y, 0.2, 42);

        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.len(), 20);
        assert_eq!(test.iter().filter(|&&i| y[i] == 1).count(), 6);
        assert!(train.iter().all(|i| !test.contains(i)));
    }

    #[test]
    fn test_split_is_seeded() {
        let y: Vec<u8> = (0..50).map(|i| (i % 2) as u8).collect();
        assert_eq!(stratified_split(&y, 0.3, 7), stratified_split(&y, 0.3, 7));
    }

    #[test]
    fn test_tiny_class_stays_in_training() {
        let (train, test) = stratified_split(&[0, 0, 0, 0, 1], 0.4, 1);
        assert!(train.contains(&4));
        assert_eq!(test.len(), 2);
    }

    #[test]
    fn test_roc_auc() {
        assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]), Some(0.75));
        assert_eq!(roc_auc(&[0, 1], &[0.2, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&[0, 1], &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[1, 1], &[0.5, 0.6]), None);
    }

    #[test]
    fn test_class_metrics() {
        let cm = ConfusionMatrix {
            matrix: [[3, 1], [2, 4]],
        };
        assert_eq!(accuracy(&cm), 0.7);

        let metrics = class_metrics(&cm);
        assert_eq!(metrics[1].support, 6);
        assert_eq!(metrics[1].precision, 0.8);
        assert!((metrics[1].recall - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(metrics[0].recall, 0.75);
    }
}
