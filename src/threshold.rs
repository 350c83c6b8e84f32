use crate::labels::RelatednessLabels;
use crate::matrix::{DistanceMatrix, ModelId};

/// Smallest distance guaranteed to sit strictly above every related pair's
/// distance for `model`: max related distance plus a fixed 0.001 buffer,
/// rounded to 4 decimal places. Returns `None` when no related pair has a
/// computed distance yet.
///
/// Known limitation: the rule only looks at the related class. It ignores the
/// unrelated distribution entirely, so the threshold can still overlap
/// unrelated distances. A midpoint between max-related and min-unrelated
/// would separate better; kept as a possible future enhancement, not
/// substituted here.
///
/// Recomputed from the matrix and labels on every call; nothing is cached, so
/// the result is never stale.
pub fn compute_threshold(
    matrix: &DistanceMatrix,
    labels: &RelatednessLabels,
    model: &ModelId,
) -> Option<f64> {
    let max_related = matrix
        .values_for(model, |pair| labels.get(pair))
        .fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |m| m.max(v)))
        })?;
    Some(round4(max_related + 0.001))
}

/// Round to 4 decimal places, matching the export format.
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(distances: &[(usize, f64)], related: &[usize]) -> (DistanceMatrix, RelatednessLabels, ModelId) {
        let model = ModelId::from("test/model");
        let mut matrix = DistanceMatrix::new();
        for &(pair, d) in distances {
            matrix.set_value(pair, &model, d);
        }
        let mut labels = RelatednessLabels::new();
        for &pair in related {
            labels.set(pair, true);
        }
        (matrix, labels, model)
    }

    #[test]
    fn max_plus_epsilon_rounded() {
        let (matrix, labels, model) = setup(
            &[(0, 0.10), (1, 0.25), (2, 0.18)],
            &[0, 1, 2],
        );
        assert_eq!(compute_threshold(&matrix, &labels, &model), Some(0.2510));
    }

    #[test]
    fn unrelated_distances_are_ignored() {
        let (matrix, labels, model) = setup(
            &[(0, 0.05), (1, 0.80)],
            &[0],
        );
        assert_eq!(compute_threshold(&matrix, &labels, &model), Some(0.0510));
    }

    #[test]
    fn no_related_examples_is_unset() {
        let (matrix, labels, model) = setup(&[(0, 0.4), (1, 0.6)], &[]);
        assert_eq!(compute_threshold(&matrix, &labels, &model), None);
    }

    #[test]
    fn related_label_without_value_is_unset() {
        let model = ModelId::from("m");
        let mut matrix = DistanceMatrix::new();
        matrix.set_pending(0, &model);
        let mut labels = RelatednessLabels::new();
        labels.set(0, true);
        assert_eq!(compute_threshold(&matrix, &labels, &model), None);
    }

    #[test]
    fn single_related_example() {
        let (matrix, labels, model) = setup(&[(3, 0.3333)], &[3]);
        assert_eq!(compute_threshold(&matrix, &labels, &model), Some(0.3343));
    }

    #[test]
    fn idempotent_without_state_change() {
        let (matrix, labels, model) = setup(&[(0, 0.12), (1, 0.44)], &[0, 1]);
        let first = compute_threshold(&matrix, &labels, &model);
        let second = compute_threshold(&matrix, &labels, &model);
        assert_eq!(first, second);
    }

    #[test]
    fn rounding_to_four_places() {
        assert_eq!(round4(0.12345678), 0.1235);
        assert_eq!(round4(0.1), 0.1);
    }
}
