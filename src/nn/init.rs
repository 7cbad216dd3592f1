use rand::RngCore;
use rand_distr::{Distribution, Normal, Uniform};

use crate::error::{Error, Result};
use crate::tensor::{Element, Tensor};

/// Weight initialization schemes, parameterised by fan-in and fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Initialization {
    /// U(-l, l) with l = sqrt(6 / (fan_in + fan_out)).
    #[default]
    GlorotUniform,
    /// N(0, s) with s = sqrt(2 / (fan_in + fan_out)).
    GlorotNormal,
    /// U(-l, l) with l = sqrt(6 / fan_in).
    HeUniform,
    /// N(0, s) with s = sqrt(2 / fan_in).
    HeNormal,
}

enum Sampler {
    Uniform(Uniform<f64>),
    Normal(Normal<f64>),
}

impl Initialization {
    fn sampler(self, fan_in: usize, fan_out: usize) -> Result<Sampler> {
        if fan_in == 0 || fan_out == 0 {
            return Err(Error::InvalidShape(vec![fan_in, fan_out]));
        }
        let fan_in = fan_in as f64;
        let fan_out = fan_out as f64;
        let normal = |std: f64| {
            Normal::new(0.0, std)
                .map(Sampler::Normal)
                .map_err(|e| Error::InvalidConfig(e.to_string()))
        };
        match self {
            Initialization::GlorotUniform => {
                let limit = (6.0 / (fan_in + fan_out)).sqrt();
                Ok(Sampler::Uniform(Uniform::new_inclusive(-limit, limit)))
            }
            Initialization::GlorotNormal => normal((2.0 / (fan_in + fan_out)).sqrt()),
            Initialization::HeUniform => {
                let limit = (6.0 / fan_in).sqrt();
                Ok(Sampler::Uniform(Uniform::new_inclusive(-limit, limit)))
            }
            Initialization::HeNormal => normal((2.0 / fan_in).sqrt()),
        }
    }

    /// Draws a tensor of the given shape from this scheme.
    pub fn sample<T: Element>(
        self,
        dimensions: Vec<usize>,
        fan_in: usize,
        fan_out: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Tensor<T>> {
        let sampler = self.sampler(fan_in, fan_out)?;
        let len: usize = dimensions.iter().product();
        let data = (0..len)
            .map(|_| {
                let value = match &sampler {
                    Sampler::Uniform(d) => d.sample(&mut *rng),
                    Sampler::Normal(d) => d.sample(&mut *rng),
                };
                T::from_f64(value)
            })
            .collect();
        Tensor::new(data, dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_glorot_uniform_respects_limit() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let weights: Tensor<f64> = Initialization::GlorotUniform
            .sample(vec![4, 2], 4, 2, &mut rng)
            .unwrap();
        let limit = 1.0_f64;
        assert_eq!(weights.dimensions(), &[4, 2]);
        assert!(weights.data().iter().all(|w| w.abs() <= limit));
        assert!(weights.data().iter().any(|w| *w != 0.0));
    }

    #[test]
    fn test_same_seed_same_weights() {
        for scheme in [
            Initialization::GlorotUniform,
            Initialization::GlorotNormal,
            Initialization::HeUniform,
            Initialization::HeNormal,
        ] {
            let mut first = rand::rngs::StdRng::seed_from_u64(7);
            let mut second = rand::rngs::StdRng::seed_from_u64(7);
            let a: Tensor<f32> = scheme.sample(vec![3, 3], 3, 3, &mut first).unwrap();
            let b: Tensor<f32> = scheme.sample(vec![3, 3], 3, 3, &mut second).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_zero_fan_is_rejected() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let result: Result<Tensor<f64>> =
            Initialization::HeNormal.sample(vec![1, 1], 0, 1, &mut rng);
        assert!(result.is_err());
    }
}
