// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the corpus and splits it so the model is always
// evaluated on sentences it has not trained on.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::seq::SliceRandom;

/// Randomly shuffle `items` and split into (train, validation).
///
/// `train_fraction` is the proportion kept for training,
/// e.g. 0.9 = 90%. The split index is clamped so tiny corpora
/// never panic.
pub fn split_train_val<T>(mut items: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    let mut rng = rand::thread_rng();
    items.shuffle(&mut rng);

    let total = items.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    let val = items.split_off(split_at);

    tracing::debug!("Dataset split: {} training, {} validation", items.len(), val.len());
    (items, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, val) = split_train_val((0..10).collect::<Vec<_>>(), 0.8);
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
    }

    #[test]
    fn test_degenerate_fractions() {
        let (train, val) = split_train_val(vec![1, 2, 3], 1.0);
        assert_eq!((train.len(), val.len()), (3, 0));
        let (train, val) = split_train_val(vec![1, 2, 3], 0.0);
        assert_eq!((train.len(), val.len()), (0, 3));
    }
}
