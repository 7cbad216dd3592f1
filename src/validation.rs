use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::learner::{Learner, Predictor};
use crate::tensor::{Numeric, Tensor};

/// K-fold cross-validation over a seeded shuffle of the row indices.
///
/// Every fold trains a separate model through [`Learner::learn`] on the rows
/// outside the fold and predicts the rows inside it. The seed is required so
/// runs are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomCrossValidation {
    folds: usize,
    seed: u64,
}

impl RandomCrossValidation {
    pub fn new(folds: usize, seed: u64) -> Result<Self> {
        if folds < 2 {
            return Err(Error::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {folds}"
            )));
        }
        Ok(RandomCrossValidation { folds, seed })
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Shuffled row indices split into `folds` groups whose sizes differ by
    /// at most one.
    pub fn fold_indices(&self, rows: usize) -> Result<Vec<Vec<usize>>> {
        if rows < self.folds {
            return Err(Error::InvalidConfig(format!(
                "{} folds need at least as many observations, got {rows}",
                self.folds
            )));
        }
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..rows).collect();
        indices.shuffle(&mut rng);

        let base = rows / self.folds;
        let extra = rows % self.folds;
        let mut folds = Vec::with_capacity(self.folds);
        let mut start = 0;
        for fold in 0..self.folds {
            let len = base + usize::from(fold < extra);
            let mut members = indices[start..start + len].to_vec();
            members.sort_unstable();
            folds.push(members);
            start += len;
        }
        Ok(folds)
    }

    /// Out-of-fold predictions for every row, in the original row order.
    pub fn cross_validated_predictions<T, L>(
        &self,
        learner: &L,
        observations: &Tensor<T>,
        targets: &Tensor<T>,
    ) -> Result<Tensor<T>>
    where
        T: Numeric,
        L: Learner<T>,
    {
        let rows = observations.batch_size();
        if targets.batch_size() != rows {
            return Err(Error::shape_mismatch(&[rows], &[targets.batch_size()]));
        }
        let folds = self.fold_indices(rows)?;
        let mut predictions: Option<Tensor<T>> = None;

        for holdout in &folds {
            let training: Vec<usize> = (0..rows)
                .filter(|row| holdout.binary_search(row).is_err())
                .collect();
            let mut model = learner.learn(
                &observations.rows(&training)?,
                &targets.rows(&training)?,
            )?;
            let fold_predictions = model.predict(&observations.rows(holdout)?)?;

            let all = match predictions.as_mut() {
                Some(all) => all,
                None => {
                    let mut dimensions = fold_predictions.dimensions().to_vec();
                    dimensions[0] = rows;
                    predictions.insert(Tensor::zeros(dimensions)?)
                }
            };
            let mut row_dimensions = fold_predictions.dimensions().to_vec();
            row_dimensions[0] = 1;
            let mut row = Tensor::zeros(row_dimensions)?;
            for (position, &target_row) in holdout.iter().enumerate() {
                fold_predictions.slice_copy(position, 1, &mut row)?;
                all.set_slice(target_row, &row)?;
            }
        }
        predictions.ok_or_else(|| Error::configuration("cross-validation produced no folds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predicts the mean target of its training rows.
    struct MeanLearner;

    struct MeanModel(f64);

    impl Predictor<f64> for MeanModel {
        fn predict(&mut self, observations: &Tensor<f64>) -> Result<Tensor<f64>> {
            Tensor::new_with_filler(vec![observations.batch_size(), 1], self.0)
        }
    }

    impl Learner<f64> for MeanLearner {
        type Model = MeanModel;

        fn learn(&self, _observations: &Tensor<f64>, targets: &Tensor<f64>) -> Result<MeanModel> {
            let mean = targets.data().iter().sum::<f64>() / targets.batch_size() as f64;
            Ok(MeanModel(mean))
        }
    }

    #[test]
    fn test_folds_partition_rows() {
        let cv = RandomCrossValidation::new(3, 42).unwrap();
        let folds = cv.fold_indices(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        let mut all: Vec<usize> = folds.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_folds_depend_only_on_seed() {
        let a = RandomCrossValidation::new(4, 7).unwrap().fold_indices(20).unwrap();
        let b = RandomCrossValidation::new(4, 7).unwrap().fold_indices(20).unwrap();
        let c = RandomCrossValidation::new(4, 8).unwrap().fold_indices(20).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_fold_counts() {
        assert!(RandomCrossValidation::new(1, 0).is_err());
        let cv = RandomCrossValidation::new(5, 0).unwrap();
        assert!(cv.fold_indices(4).is_err());
    }

    #[test]
    fn test_predictions_are_out_of_fold() {
        let observations = Tensor::zeros(vec![6, 1]).unwrap();
        let targets = Tensor::new(vec![0.0, 0.0, 0.0, 6.0, 6.0, 6.0], vec![6, 1]).unwrap();
        let cv = RandomCrossValidation::new(2, 3).unwrap();
        let predictions = cv
            .cross_validated_predictions(&MeanLearner, &observations, &targets)
            .unwrap();
        assert_eq!(predictions.dimensions(), &[6, 1]);

        let folds = cv.fold_indices(6).unwrap();
        for holdout in &folds {
            let training: Vec<f64> = (0..6)
                .filter(|row| !holdout.contains(row))
                .map(|row| targets.data()[row])
                .collect();
            let mean = training.iter().sum::<f64>() / training.len() as f64;
            for &row in holdout {
                assert_eq!(predictions.data()[row], mean);
            }
        }
    }
}
