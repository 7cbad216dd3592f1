use rand::RngCore;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::nn::init::Initialization;
use crate::nn::module::{Layer, Ports};
use crate::nn::storage::Storage;
use crate::nn::variable::Variable;
use crate::tensor::{Element, Tensor};

/// Fully-connected layer: `y = x W + b`.
///
/// Trailing input dimensions are flattened, so an input `[batch, c, h, w]`
/// is treated as `[batch, c * h * w]`. Weights have shape `[fan_in, units]`
/// and bias `[units]`; neither depends on the batch size, so both survive a
/// reshape.
#[derive(Debug, Clone)]
pub struct Linear {
    units: usize,
    fan_in: usize,
    ports: Option<Ports>,
    weights: Option<Variable>,
    bias: Option<Variable>,
}

impl Linear {
    pub fn new(units: usize) -> Self {
        Linear {
            units,
            fan_in: 0,
            ports: None,
            weights: None,
            bias: None,
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    fn wired(&self) -> Result<(&Ports, &Variable, &Variable)> {
        let ports = Ports::wired(&self.ports, "linear")?;
        match (&self.weights, &self.bias) {
            (Some(weights), Some(bias)) => Ok((ports, weights, bias)),
            _ => Err(Error::configuration("linear layer has no parameters")),
        }
    }
}

impl<T: Element> Layer<T> for Linear {
    fn initialize(
        &mut self,
        input: &Variable,
        storage: &mut Storage<T>,
        rng: &mut dyn RngCore,
        initialization: Initialization,
    ) -> Result<Variable> {
        if self.units == 0 {
            return Err(Error::InvalidShape(vec![input.batch_size(), 0]));
        }
        let fan_in: usize = input.trailing().iter().product();
        let weights: Tensor<T> =
            initialization.sample(vec![fan_in, self.units], fan_in, self.units, rng)?;
        let output = Ports::connect(
            &mut self.ports,
            "linear",
            input,
            vec![input.batch_size(), self.units],
            storage,
        )?;
        self.fan_in = fan_in;
        self.weights = Some(storage.declare_trainable(weights)?);
        self.bias = Some(storage.declare_trainable(Tensor::zeros(vec![self.units])?)?);
        Ok(output)
    }

    fn update_dimensions(&mut self, input: &Variable) -> Result<Variable> {
        let fan_in: usize = input.trailing().iter().product();
        if self.ports.is_some() && fan_in != self.fan_in {
            return Err(Error::shape_mismatch(
                &[input.batch_size(), self.fan_in],
                input.dimensions(),
            ));
        }
        Ports::reshape(
            &mut self.ports,
            "linear",
            input,
            vec![input.batch_size(), self.units],
        )
    }

    fn forward(&self, storage: &mut Storage<T>) -> Result<()> {
        let (ports, weights, bias) = self.wired()?;
        let units = self.units;
        let x = storage.get_tensor(&ports.input)?.data();
        let w = storage.get_tensor(weights)?.data();
        let b = storage.get_tensor(bias)?.data();

        let mut y = vec![T::zero(); ports.output.element_count()];
        y.par_chunks_mut(units)
            .zip(x.par_chunks(self.fan_in))
            .for_each(|(row, xs)| {
                for (o, value) in row.iter_mut().enumerate() {
                    let mut sum = b[o];
                    for (i, &xi) in xs.iter().enumerate() {
                        sum = sum + xi * w[i * units + o];
                    }
                    *value = sum;
                }
            });
        storage.assign_tensor(&ports.output, &y)
    }

    fn backward(&self, storage: &mut Storage<T>) -> Result<()> {
        let (ports, weights, bias) = self.wired()?;
        let units = self.units;
        let fan_in = self.fan_in;
        let x = storage.get_tensor(&ports.input)?.data();
        let w = storage.get_tensor(weights)?.data();
        let dy = storage.get_gradient(&ports.output)?.data();

        let mut dx = vec![T::zero(); ports.input.element_count()];
        dx.par_chunks_mut(fan_in)
            .zip(dy.par_chunks(units))
            .for_each(|(dx_row, dy_row)| {
                for (i, value) in dx_row.iter_mut().enumerate() {
                    let mut sum = T::zero();
                    for (o, &g) in dy_row.iter().enumerate() {
                        sum = sum + g * w[i * units + o];
                    }
                    *value = sum;
                }
            });

        let mut dw = vec![T::zero(); fan_in * units];
        dw.par_chunks_mut(units)
            .enumerate()
            .for_each(|(i, dw_row)| {
                for (xs, dy_row) in x.chunks(fan_in).zip(dy.chunks(units)) {
                    for (value, &g) in dw_row.iter_mut().zip(dy_row) {
                        *value = *value + xs[i] * g;
                    }
                }
            });

        let mut db = vec![T::zero(); units];
        for dy_row in dy.chunks(units) {
            for (value, &g) in db.iter_mut().zip(dy_row) {
                *value = *value + g;
            }
        }

        storage.assign_gradient(&ports.input, &dx)?;
        storage.assign_gradient(weights, &dw)?;
        storage.assign_gradient(bias, &db)
    }

    fn reset(&mut self) {
        self.fan_in = 0;
        self.ports = None;
        self.weights = None;
        self.bias = None;
    }

    fn input(&self) -> Option<&Variable> {
        self.ports.as_ref().map(|ports| &ports.input)
    }

    fn output(&self) -> Option<&Variable> {
        self.ports.as_ref().map(|ports| &ports.output)
    }

    fn parameters(&self) -> Vec<Variable> {
        self.weights.iter().chain(self.bias.iter()).cloned().collect()
    }
}
