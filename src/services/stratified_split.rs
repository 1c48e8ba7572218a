use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Train/validation item indices of one fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldIndices {
    /// Ascending
    pub train: Vec<usize>,
    /// Ascending
    pub valid: Vec<usize>,
}

/// Stratified K-fold splitter.
///
/// Items are grouped by label; each group is shuffled with a seeded RNG and
/// dealt round-robin into the folds, with the fold cursor carried over from
/// one group to the next. Every fold therefore holds roughly `1/K` of each
/// label, fold sizes differ by at most one, and the same seed always gives
/// the same split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    folds: usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self { folds, seed }
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Validation fold of each item.
    pub fn assign(&self, labels: &[u8]) -> Result<Vec<usize>, ConfigError> {
        let k = self.folds;
        if k < 2 {
            return Err(ConfigError::TooFewFolds(k));
        }
        if k > labels.len() {
            return Err(ConfigError::FoldsExceedItems {
                folds: k,
                items: labels.len(),
            });
        }

        let mut groups: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            groups.entry(label).or_default().push(i);
        }

        let largest = groups.values().map(Vec::len).max().unwrap_or(0);
        if k > largest {
            return Err(ConfigError::FoldsExceedGroups { folds: k, largest });
        }
        for (label, members) in &groups {
            if members.len() < k {
                tracing::warn!(
                    label,
                    members = members.len(),
                    folds = k,
                    "Label group is smaller than the fold count"
                );
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_of = vec![0; labels.len()];
        let mut cursor = 0;
        for members in groups.values_mut() {
            members.shuffle(&mut rng);
            for &item in members.iter() {
                fold_of[item] = cursor;
                cursor = (cursor + 1) % k;
            }
        }
        Ok(fold_of)
    }

    /// Split `labels.len()` items into `K` train/validation folds.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<FoldIndices>, ConfigError> {
        let fold_of = self.assign(labels)?;
        Ok((0..self.folds)
            .map(|k| {
                let (valid, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| fold_of[i] == k);
                FoldIndices { train, valid }
            })
            .collect())
    }
}
