//! Random train/validation splits

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Result, VaepError};

/// Row indices of a train/validation split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Shuffle `0..n_rows` and hold out the last `val_size` fraction.
///
/// The training part has `floor(n_rows * (1 - val_size))` rows and the
/// validation part the rest. A `val_size` of 0 keeps every row for training.
/// The same seed always gives the same split.
pub fn train_validation_split(
    n_rows: usize,
    val_size: f64,
    seed: Option<u64>,
) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&val_size) {
        return Err(VaepError::InvalidParameter(format!(
            "validation size must be in [0, 1), got {}",
            val_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    if val_size == 0.0 {
        return Ok(SplitIndices {
            train: indices,
            validation: Vec::new(),
        });
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let n_train = (n_rows as f64 * (1.0 - val_size)).floor() as usize;
    let validation = indices.split_off(n_train);
    log::info!(
        "Split {} states: {} train, {} validation",
        n_rows,
        indices.len(),
        validation.len()
    );
    Ok(SplitIndices {
        train: indices,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let split = train_validation_split(10, 0.25, Some(0)).unwrap();
        assert_eq!(split.train.len(), 7);
        assert_eq!(split.validation.len(), 3);

        let all: HashSet<usize> = split.train.iter().chain(&split.validation).copied().collect();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_zero_val_size_keeps_all_rows() {
        let split = train_validation_split(5, 0.0, None).unwrap();
        assert_eq!(split.train, vec![0, 1, 2, 3, 4]);
        assert!(split.validation.is_empty());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = train_validation_split(100, 0.2, Some(42)).unwrap();
        let b = train_validation_split(100, 0.2, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_val_size() {
        assert!(matches!(
            train_validation_split(10, 1.0, None),
            Err(VaepError::InvalidParameter(_))
        ));
        assert!(train_validation_split(10, -0.1, None).is_err());
    }
}
