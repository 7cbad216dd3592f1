use rand::RngCore;

use crate::error::{Error, Result};
use crate::nn::init::Initialization;
use crate::nn::module::Layer;
use crate::nn::storage::{Parameter, Storage};
use crate::nn::variable::Variable;
use crate::tensor::{Element, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    /// Wired, with no training batch in storage.
    Initialized,
    /// `set_next_batch` loaded observations and targets; forward is allowed.
    Loaded,
    /// A forward pass ran on the current batch; backward is allowed.
    Forwarded,
}

/// An ordered chain of layers sharing one [`Storage`] arena.
///
/// ```
/// use light_net::nn::{Activation, Linear, Network, SquaredErrorOutput};
/// use light_net::tensor::Tensor;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let mut net = Network::<f64>::default();
/// net.add(Linear::new(8))
///     .add(Activation::tanh())
///     .add(Linear::new(1))
///     .add(SquaredErrorOutput::new());
/// net.initialize(&[1, 3], &mut rng).unwrap();
///
/// let observations = Tensor::new_with_filler(vec![5, 3], 0.5).unwrap();
/// let predictions = net.predict(&observations).unwrap();
/// assert_eq!(predictions.dimensions(), &[5, 1]);
/// ```
#[derive(Debug)]
pub struct Network<T: Element> {
    layers: Vec<Box<dyn Layer<T>>>,
    storage: Storage<T>,
    initialization: Initialization,
    phase: Phase,
}

impl<T: Element> Default for Network<T> {
    fn default() -> Self {
        Network::new(Initialization::default())
    }
}

impl<T: Element> Network<T> {
    pub fn new(initialization: Initialization) -> Self {
        Network {
            layers: Vec::new(),
            storage: Storage::new(),
            initialization,
            phase: Phase::Uninitialized,
        }
    }

    pub fn add<L: Layer<T> + 'static>(&mut self, layer: L) -> &mut Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn layers(&self) -> &[Box<dyn Layer<T>>] {
        &self.layers
    }

    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    pub fn is_initialized(&self) -> bool {
        self.phase != Phase::Uninitialized
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::configuration("network has no layers"));
        }
        if self.phase == Phase::Uninitialized {
            return Err(Error::configuration("network used before initialize"));
        }
        Ok(())
    }

    fn input_variable(&self) -> Result<&Variable> {
        self.layers
            .first()
            .and_then(|layer| layer.input())
            .ok_or_else(|| Error::configuration("network has no wired input"))
    }

    fn output_variable(&self) -> Result<&Variable> {
        self.layers
            .last()
            .and_then(|layer| layer.output())
            .ok_or_else(|| Error::configuration("network has no wired output"))
    }

    pub fn input_dimensions(&self) -> Option<&[usize]> {
        self.input_variable().ok().map(Variable::dimensions)
    }

    pub fn output_dimensions(&self) -> Option<&[usize]> {
        self.output_variable().ok().map(Variable::dimensions)
    }

    /// Wires every layer to the arena, head to tail, and draws initial
    /// weights from `rng`. Each layer's output shape is the next layer's
    /// input shape.
    pub fn initialize(&mut self, input_dimensions: &[usize], rng: &mut dyn RngCore) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::configuration("network has no layers"));
        }
        if self.phase != Phase::Uninitialized {
            return Err(Error::configuration("network is already initialized"));
        }
        if let Err(error) = self.wire_chain(input_dimensions, rng) {
            for layer in self.layers.iter_mut() {
                layer.reset();
            }
            self.storage = Storage::new();
            return Err(error);
        }
        self.phase = Phase::Initialized;
        Ok(())
    }

    fn wire_chain(&mut self, input_dimensions: &[usize], rng: &mut dyn RngCore) -> Result<()> {
        let mut current = self.storage.declare(input_dimensions.to_vec())?;
        for layer in self.layers.iter_mut() {
            current = layer.initialize(&current, &mut self.storage, rng, self.initialization)?;
        }
        Ok(())
    }

    fn reshape_chain(&mut self, input_dimensions: &[usize]) -> Result<()> {
        self.storage.clear_non_trainables();
        let mut current = self.input_variable()?.with_dimensions(input_dimensions.to_vec())?;
        for layer in self.layers.iter_mut() {
            current = layer.update_dimensions(&current)?;
        }
        Ok(())
    }

    /// Drops non-trainable storage and re-derives every layer's shape for a
    /// new input shape. Parameters are kept.
    ///
    /// If a layer rejects the new shape the chain is restored to its previous
    /// shapes and the error is returned.
    pub fn update_dimensions(&mut self, input_dimensions: &[usize]) -> Result<()> {
        self.ensure_ready()?;
        let previous = self.input_variable()?.dimensions().to_vec();
        self.phase = Phase::Initialized;
        if let Err(error) = self.reshape_chain(input_dimensions) {
            self.reshape_chain(&previous)?;
            return Err(error);
        }
        Ok(())
    }

    /// Copies `observations` into the first layer's input and `targets` into
    /// the last layer's output gradient. A batch shape different from the
    /// current one goes through [`Network::update_dimensions`] first.
    pub fn set_next_batch(&mut self, observations: &Tensor<T>, targets: &Tensor<T>) -> Result<()> {
        self.ensure_ready()?;
        if self.input_variable()?.dimensions() != observations.dimensions() {
            self.update_dimensions(observations.dimensions())?;
        }
        let input = self.input_variable()?.clone();
        let output = self.output_variable()?.clone();
        if output.dimensions() != targets.dimensions() {
            return Err(Error::shape_mismatch(output.dimensions(), targets.dimensions()));
        }
        self.phase = Phase::Initialized;
        self.storage.assign_tensor(&input, observations.data())?;
        self.storage.assign_gradient(&output, targets.data())?;
        self.phase = Phase::Loaded;
        Ok(())
    }

    /// Last layer's activations for the current batch.
    pub fn batch_predictions(&self) -> Result<&Tensor<T>> {
        self.storage.get_tensor(self.output_variable()?)
    }

    fn run_forward(&mut self) -> Result<()> {
        for layer in self.layers.iter() {
            layer.forward(&mut self.storage)?;
        }
        Ok(())
    }

    /// Runs every layer's forward pass, first to last, on the batch loaded by
    /// [`Network::set_next_batch`].
    pub fn forward(&mut self) -> Result<()> {
        self.ensure_ready()?;
        if self.phase == Phase::Initialized {
            return Err(Error::configuration(
                "forward requires a batch loaded by set_next_batch",
            ));
        }
        self.phase = Phase::Loaded;
        self.run_forward()?;
        self.phase = Phase::Forwarded;
        Ok(())
    }

    /// Runs every layer's backward pass, last to first. Valid only directly
    /// after [`Network::forward`] on the current batch.
    pub fn backward(&mut self) -> Result<()> {
        self.ensure_ready()?;
        if self.phase != Phase::Forwarded {
            return Err(Error::configuration(
                "backward requires a forward pass on the current batch",
            ));
        }
        self.phase = Phase::Loaded;
        for layer in self.layers.iter().rev() {
            layer.backward(&mut self.storage)?;
        }
        Ok(())
    }

    /// Predicts one observation at a time.
    ///
    /// The chain is reshaped to a batch size of one (when it is not already),
    /// every observation is pushed through [`Network::forward`], and its
    /// output is copied into the matching row of the result. The training
    /// batch is overwritten, so a later [`Network::forward`] needs a fresh
    /// [`Network::set_next_batch`].
    pub fn predict(&mut self, observations: &Tensor<T>) -> Result<Tensor<T>> {
        self.ensure_ready()?;
        let mut single = observations.dimensions().to_vec();
        single[0] = 1;
        if self.input_variable()?.dimensions() != single.as_slice() {
            self.update_dimensions(&single)?;
        }
        self.phase = Phase::Initialized;

        let input = self.input_variable()?.clone();
        let output = self.output_variable()?.clone();
        let mut prediction_dimensions = output.dimensions().to_vec();
        prediction_dimensions[0] = observations.batch_size();
        let mut predictions = Tensor::zeros(prediction_dimensions)?;
        let mut observation = Tensor::zeros(single)?;

        for i in 0..observations.batch_size() {
            observations.slice_copy(i, 1, &mut observation)?;
            self.storage.assign_tensor(&input, observation.data())?;
            self.run_forward()?;
            predictions.set_slice(i, self.storage.get_tensor(&output)?)?;
        }
        Ok(predictions)
    }

    /// Like [`Network::predict`], for chains whose last layer outputs
    /// probability distributions.
    pub fn predict_probabilities(&mut self, observations: &Tensor<T>) -> Result<Tensor<T>> {
        self.ensure_ready()?;
        let supported = self
            .layers
            .last()
            .map_or(false, |layer| layer.supports_probabilities());
        if !supported {
            return Err(Error::Unsupported(
                "the last layer of this network does not output probabilities".to_owned(),
            ));
        }
        self.predict(observations)
    }

    /// Appends every trainable parameter and its gradient, in layer order.
    pub fn get_trainable_parameters<'a>(&'a mut self, parameters: &mut Vec<Parameter<'a, T>>) {
        self.storage.get_trainable_parameters(parameters);
    }

    pub fn trainable_parameters(&mut self) -> Vec<Parameter<'_, T>> {
        let mut parameters = Vec::new();
        self.storage.get_trainable_parameters(&mut parameters);
        parameters
    }

    /// Trainable slots of every layer, in layer order.
    pub fn parameter_variables(&self) -> Vec<Variable> {
        self.layers.iter().flat_map(|layer| layer.parameters()).collect()
    }

    pub fn clear_non_trainable_storage(&mut self) {
        self.storage.clear_non_trainables();
        if self.phase != Phase::Uninitialized {
            self.phase = Phase::Initialized;
        }
    }
}
