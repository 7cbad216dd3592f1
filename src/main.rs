use light_net::learner::{LearnerConfig, NeuralNetLearner};
use light_net::nn::{Activation, Linear, Network, SquaredErrorOutput};
use light_net::tensor::Tensor;
use light_net::validation::RandomCrossValidation;

use rand::prelude::*;
use rand_distr::Normal;

fn build() -> Network<f64> {
    let mut net = Network::default();
    net.add(Linear::new(16))
        .add(Activation::tanh())
        .add(Linear::new(1))
        .add(SquaredErrorOutput::new());
    net
}

fn main() -> light_net::Result<()> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.05).map_err(|e| light_net::Error::InvalidConfig(e.to_string()))?;

    let rows = 200;
    let mut xs = Vec::with_capacity(rows);
    let mut ys = Vec::with_capacity(rows);
    for _ in 0..rows {
        let a: f64 = rng.gen_range(-1.0..1.0);
        let b: f64 = rng.gen_range(-1.0..1.0);
        xs.push(vec![a, b]);
        ys.push(vec![(a * 2.0).sin() + 0.5 * b + noise.sample(&mut rng)]);
    }
    let observations = Tensor::from_rows(&xs)?;
    let targets = Tensor::from_rows(&ys)?;

    let config = LearnerConfig {
        epochs: 200,
        batch_size: 16,
        learning_rate: 0.05,
        seed: 7,
    };
    let learner = NeuralNetLearner::new(build, config)?;
    let (_, report) = learner.fit(&observations, &targets)?;
    for (epoch, loss) in report.epoch_losses.iter().enumerate().step_by(20) {
        println!("epoch={epoch} loss={loss:.5}");
    }

    let cv = RandomCrossValidation::new(5, 7)?;
    let predictions = cv.cross_validated_predictions(&learner, &observations, &targets)?;
    let mse = predictions
        .data()
        .iter()
        .zip(targets.data())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / rows as f64;
    println!("5-fold cross-validated mse={mse:.5}");
    Ok(())
}
