use rand::RngCore;
use rayon::prelude::*;

use crate::error::Result;
use crate::nn::init::Initialization;
use crate::nn::module::{Layer, Ports};
use crate::nn::storage::Storage;
use crate::nn::variable::Variable;
use crate::tensor::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFunction {
    Identity,
    Relu,
    Sigmoid,
    Tanh,
}

impl ActivationFunction {
    #[inline]
    pub fn function<T: Element>(self, x: T) -> T {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::Relu => x.max(T::zero()),
            ActivationFunction::Sigmoid => T::one() / (T::one() + (-x).exp()),
            ActivationFunction::Tanh => x.tanh(),
        }
    }

    /// Derivative expressed through the activation's own output `y = f(x)`.
    #[inline]
    pub fn derivative_from_output<T: Element>(self, y: T) -> T {
        match self {
            ActivationFunction::Identity => T::one(),
            ActivationFunction::Relu => {
                if y > T::zero() {
                    T::one()
                } else {
                    T::zero()
                }
            }
            ActivationFunction::Sigmoid => y * (T::one() - y),
            ActivationFunction::Tanh => T::one() - y * y,
        }
    }
}

/// Element-wise activation. Output shape equals input shape.
#[derive(Debug, Clone)]
pub struct Activation {
    function: ActivationFunction,
    ports: Option<Ports>,
}

impl Activation {
    pub fn new(function: ActivationFunction) -> Self {
        Activation {
            function,
            ports: None,
        }
    }

    pub fn identity() -> Self {
        Self::new(ActivationFunction::Identity)
    }

    pub fn relu() -> Self {
        Self::new(ActivationFunction::Relu)
    }

    pub fn sigmoid() -> Self {
        Self::new(ActivationFunction::Sigmoid)
    }

    pub fn tanh() -> Self {
        Self::new(ActivationFunction::Tanh)
    }

    pub fn function(&self) -> ActivationFunction {
        self.function
    }
}

impl<T: Element> Layer<T> for Activation {
    fn initialize(
        &mut self,
        input: &Variable,
        storage: &mut Storage<T>,
        _rng: &mut dyn RngCore,
        _initialization: Initialization,
    ) -> Result<Variable> {
        Ports::connect(
            &mut self.ports,
            "activation",
            input,
            input.dimensions().to_vec(),
            storage,
        )
    }

    fn update_dimensions(&mut self, input: &Variable) -> Result<Variable> {
        Ports::reshape(
            &mut self.ports,
            "activation",
            input,
            input.dimensions().to_vec(),
        )
    }

    fn forward(&self, storage: &mut Storage<T>) -> Result<()> {
        let ports = Ports::wired(&self.ports, "activation")?;
        let function = self.function;
        let y: Vec<T> = storage
            .get_tensor(&ports.input)?
            .data()
            .par_iter()
            .map(|&x| function.function(x))
            .collect();
        storage.assign_tensor(&ports.output, &y)
    }

    fn backward(&self, storage: &mut Storage<T>) -> Result<()> {
        let ports = Ports::wired(&self.ports, "activation")?;
        let function = self.function;
        let y = storage.get_tensor(&ports.output)?.data();
        let dy = storage.get_gradient(&ports.output)?.data();
        let dx: Vec<T> = y
            .par_iter()
            .zip(dy.par_iter())
            .map(|(&y, &g)| g * function.derivative_from_output(y))
            .collect();
        storage.assign_gradient(&ports.input, &dx)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::SeedableRng;

    fn run(function: ActivationFunction, x: &[f64], dy: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut storage = Storage::new();
        let input = storage.declare(vec![1, x.len()]).unwrap();
        let mut layer = Activation::new(function);
        let output = layer
            .initialize(&input, &mut storage, &mut rng, Initialization::default())
            .unwrap();
        storage.assign_tensor(&input, x).unwrap();
        layer.forward(&mut storage).unwrap();
        storage.assign_gradient(&output, dy).unwrap();
        layer.backward(&mut storage).unwrap();
        (
            storage.get_tensor(&output).unwrap().data().to_vec(),
            storage.get_gradient(&input).unwrap().data().to_vec(),
        )
    }

    #[test]
    fn test_relu() {
        let (y, dx) = run(ActivationFunction::Relu, &[-1.0, 0.0, 2.0], &[1.0, 1.0, 3.0]);
        assert_eq!(y, vec![0.0, 0.0, 2.0]);
        assert_eq!(dx, vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_identity() {
        let (y, dx) = run(ActivationFunction::Identity, &[-1.5, 2.0], &[0.5, -0.5]);
        assert_eq!(y, vec![-1.5, 2.0]);
        assert_eq!(dx, vec![0.5, -0.5]);
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let eps = 1e-6;
        for function in [ActivationFunction::Sigmoid, ActivationFunction::Tanh] {
            for &x in &[-2.0_f64, -0.3, 0.0, 0.7, 1.9] {
                let numeric =
                    (function.function(x + eps) - function.function(x - eps)) / (2.0 * eps);
                let analytic = function.derivative_from_output(function.function(x));
                assert!((numeric - analytic).abs() < 1e-6, "{function:?} at {x}");
            }
        }
    }

    #[test]
    fn test_backward_before_forward() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut storage = Storage::<f64>::new();
        let input = storage.declare(vec![1, 2]).unwrap();
        let mut layer = Activation::tanh();
        layer
            .initialize(&input, &mut storage, &mut rng, Initialization::default())
            .unwrap();
        assert!(matches!(
            layer.backward(&mut storage),
            Err(Error::Configuration(_))
        ));
    }
}
