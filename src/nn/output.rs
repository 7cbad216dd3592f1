//! Output layers close a chain. The network stores the batch targets in the
//! gradient slot of the last layer's output, so these layers read targets from
//! there and turn them into the input gradient of their loss.

use rand::RngCore;
use rayon::prelude::*;

use crate::error::Result;
use crate::nn::init::Initialization;
use crate::nn::module::{Layer, Ports};
use crate::nn::storage::Storage;
use crate::nn::variable::Variable;
use crate::tensor::Element;

// dL/dx = (y - t) / batch for both squared error on an identity output and
// cross-entropy on a softmax output.
fn residual_gradient<T: Element>(ports: &Ports, storage: &mut Storage<T>) -> Result<()> {
    let scale = T::one() / T::from_f64(ports.output.batch_size() as f64);
    let y = storage.get_tensor(&ports.output)?.data();
    let targets = storage.get_gradient(&ports.output)?.data();
    let dx: Vec<T> = y
        .par_iter()
        .zip(targets.par_iter())
        .map(|(&y, &t)| (y - t) * scale)
        .collect();
    storage.assign_gradient(&ports.input, &dx)
}

/// Regression output: identity forward, squared-error gradient backward.
#[derive(Debug, Clone, Default)]
pub struct SquaredErrorOutput {
    ports: Option<Ports>,
}

impl SquaredErrorOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Element> Layer<T> for SquaredErrorOutput {
    fn initialize(
        &mut self,
        input: &Variable,
        storage: &mut Storage<T>,
        _rng: &mut dyn RngCore,
        _initialization: Initialization,
    ) -> Result<Variable> {
        Ports::connect(
            &mut self.ports,
            "squared error output",
            input,
            input.dimensions().to_vec(),
            storage,
        )
    }

    fn update_dimensions(&mut self, input: &Variable) -> Result<Variable> {
        Ports::reshape(
            &mut self.ports,
            "squared error output",
            input,
            input.dimensions().to_vec(),
        )
    }

    fn forward(&self, storage: &mut Storage<T>) -> Result<()> {
        let ports = Ports::wired(&self.ports, "squared error output")?;
        let x = storage.get_tensor(&ports.input)?.data().to_vec();
        storage.assign_tensor(&ports.output, &x)
    }

    fn backward(&self, storage: &mut Storage<T>) -> Result<()> {
        let ports = Ports::wired(&self.ports, "squared error output")?;
        residual_gradient(ports, storage)
    }

    fn reset(&mut self) {
        self.ports = None;
    }

    fn input(&self) -> Option<&Variable> {
        self.ports.as_ref().map(|ports| &ports.input)
    }

    fn output(&self) -> Option<&Variable> {
        self.ports.as_ref().map(|ports| &ports.output)
    }
}

/// Classification output: row-wise softmax forward, cross-entropy gradient
/// backward. Each output row is a probability distribution over the
/// trailing elements of the row.
#[derive(Debug, Clone, Default)]
pub struct SoftmaxOutput {
    ports: Option<Ports>,
}

impl SoftmaxOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Element> Layer<T> for SoftmaxOutput {
    fn initialize(
        &mut self,
        input: &Variable,
        storage: &mut Storage<T>,
        _rng: &mut dyn RngCore,
        _initialization: Initialization,
    ) -> Result<Variable> {
        Ports::connect(
            &mut self.ports,
            "softmax output",
            input,
            input.dimensions().to_vec(),
            storage,
        )
    }

    fn update_dimensions(&mut self, input: &Variable) -> Result<Variable> {
        Ports::reshape(
            &mut self.ports,
            "softmax output",
            input,
            input.dimensions().to_vec(),
        )
    }

    fn forward(&self, storage: &mut Storage<T>) -> Result<()> {
        let ports = Ports::wired(&self.ports, "softmax output")?;
        let width: usize = ports.input.trailing().iter().product();
        let mut y = storage.get_tensor(&ports.input)?.data().to_vec();
        y.par_chunks_mut(width).for_each(|row| {
            let max = row.iter().fold(T::neg_infinity(), |acc, &x| acc.max(x));
            let mut sum = T::zero();
            for value in row.iter_mut() {
                *value = (*value - max).exp();
                sum = sum + *value;
            }
            for value in row.iter_mut() {
                *value = *value / sum;
            }
        });
        storage.assign_tensor(&ports.output, &y)
    }

    fn backward(&self, storage: &mut Storage<T>) -> Result<()> {
        let ports = Ports::wired(&self.ports, "softmax output")?;
        residual_gradient(ports, storage)
    }

    fn reset(&mut self) {
        self.ports = None;
    }

    fn input(&self) -> Option<&Variable> {
        self.ports.as_ref().map(|ports| &ports.input)
    }

    fn output(&self) -> Option<&Variable> {
        self.ports.as_ref().map(|ports| &ports.output)
    }

    fn supports_probabilities(&self) -> bool {
        true
    }
}
