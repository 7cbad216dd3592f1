use std::marker::PhantomData;

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::nn::Network;
use crate::optim::Sgd;
use crate::tensor::{Element, Numeric, Tensor};

/// Anything that maps a batch of observations to a batch of predictions.
pub trait Predictor<T: Numeric> {
    fn predict(&mut self, observations: &Tensor<T>) -> Result<Tensor<T>>;
}

/// Trains a model from observations and targets (both batch-first).
pub trait Learner<T: Numeric> {
    type Model: Predictor<T>;

    fn learn(&self, observations: &Tensor<T>, targets: &Tensor<T>) -> Result<Self::Model>;
}

impl<T: Element> Predictor<T> for Network<T> {
    fn predict(&mut self, observations: &Tensor<T>) -> Result<Tensor<T>> {
        Network::predict(self, observations)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Seeds both weight initialization and the per-epoch shuffle.
    pub seed: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitReport {
    /// Mean squared error over the training set, per epoch, measured on the
    /// forward pass of each mini-batch.
    pub epoch_losses: Vec<f64>,
}

impl FitReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// Mini-batch SGD over a freshly built network.
///
/// `build` is called once per [`Learner::learn`], so every call (every
/// cross-validation fold, say) trains its own network and storage.
pub struct NeuralNetLearner<T, F>
where
    T: Element,
    F: Fn() -> Network<T>,
{
    build: F,
    config: LearnerConfig,
    _marker: PhantomData<T>,
}

impl<T, F> std::fmt::Debug for NeuralNetLearner<T, F>
where
    T: Element,
    F: Fn() -> Network<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeuralNetLearner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T, F> NeuralNetLearner<T, F>
where
    T: Element,
    F: Fn() -> Network<T>,
{
    pub fn new(build: F, config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(NeuralNetLearner {
            build,
            config,
            _marker: PhantomData,
        })
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn fit(&self, observations: &Tensor<T>, targets: &Tensor<T>) -> Result<(Network<T>, FitReport)> {
        let rows = observations.batch_size();
        if targets.batch_size() != rows {
            return Err(Error::shape_mismatch(&[rows], &[targets.batch_size()]));
        }
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.config.seed);
        let mut net = (self.build)();
        let mut input_dimensions = observations.dimensions().to_vec();
        input_dimensions[0] = self.config.batch_size.min(rows);
        net.initialize(&input_dimensions, &mut rng)?;

        let sgd = Sgd::new(T::from_f64(self.config.learning_rate))?;
        let elements = targets.element_count() as f64;
        let mut indices: Vec<usize> = (0..rows).collect();
        let mut report = FitReport::default();

        for _ in 0..self.config.epochs {
            indices.shuffle(&mut rng);
            let mut squared_error = 0.0;
            for batch in indices.chunks(self.config.batch_size) {
                let x = observations.rows(batch)?;
                let t = targets.rows(batch)?;
                net.set_next_batch(&x, &t)?;
                net.forward()?;
                squared_error += net
                    .batch_predictions()?
                    .data()
                    .iter()
                    .zip(t.data())
                    .map(|(&y, &t)| (y - t).as_f64().powi(2))
                    .sum::<f64>();
                net.backward()?;
                sgd.step(&mut net.trainable_parameters());
            }
            report.epoch_losses.push(squared_error / elements);
        }
        Ok((net, report))
    }
}

impl<T, F> Learner<T> for NeuralNetLearner<T, F>
where
    T: Element,
    F: Fn() -> Network<T>,
{
    type Model = Network<T>;

    fn learn(&self, observations: &Tensor<T>, targets: &Tensor<T>) -> Result<Network<T>> {
        self.fit(observations, targets).map(|(net, _)| net)
    }
}
