use crate::error::{Error, Result};
use crate::nn::Parameter;
use crate::tensor::Element;

/// Plain stochastic gradient descent: `value -= step_size * gradient`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd<T: Element> {
    step_size: T,
}

impl<T: Element> Sgd<T> {
    pub fn new(step_size: T) -> Result<Self> {
        if !(step_size > T::zero()) || !step_size.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "step size must be positive and finite, got {step_size:?}"
            )));
        }
        Ok(Sgd { step_size })
    }

    pub fn step_size(&self) -> T {
        self.step_size
    }

    pub fn step(&self, parameters: &mut [Parameter<'_, T>]) {
        for parameter in parameters.iter_mut() {
            let gradient = parameter.gradient.data();
            for (value, &g) in parameter.value.data_mut().iter_mut().zip(gradient) {
                *value = *value - self.step_size * g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::Storage;
    use crate::tensor::Tensor;

    #[test]
    fn test_sgd_step() {
        let mut storage = Storage::<f64>::new();
        let weights = storage
            .declare_trainable(Tensor::new(vec![1.0, 2.0], vec![2]).unwrap())
            .unwrap();
        storage.assign_gradient(&weights, &[0.5, -1.0]).unwrap();

        let sgd = Sgd::new(0.1_f64).unwrap();
        let mut parameters = Vec::new();
        storage.get_trainable_parameters(&mut parameters);
        sgd.step(&mut parameters);
        drop(parameters);

        let updated = storage.get_tensor(&weights).unwrap().data();
        assert!((updated[0] - 0.95).abs() < 1e-12);
        assert!((updated[1] - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_sgd_rejects_bad_step() {
        assert!(Sgd::new(0.0_f64).is_err());
        assert!(Sgd::new(-1.0_f32).is_err());
        assert!(Sgd::new(f64::NAN).is_err());
    }
}
