use rand::RngCore;

use crate::error::{Error, Result};
use crate::nn::init::Initialization;
use crate::nn::storage::Storage;
use crate::nn::variable::Variable;
use crate::tensor::Element;

/// The capability every layer in a [`crate::nn::Network`] chain provides.
///
/// A layer consumes one input [`Variable`] and produces one output
/// [`Variable`]. All data lives in the network's [`Storage`]; the layer only
/// remembers which slots it reads and writes, plus the slots of its own
/// trainable parameters.
///
/// Implement this trait to add a new layer kind. The network never needs to
/// know the concrete type.
pub trait Layer<T: Element>: std::fmt::Debug + Send {
    /// Declares this layer's output slot and parameters in `storage`, drawing
    /// initial weights from `rng`. Returns the output variable.
    ///
    /// A layer can be initialized once; a second call is a configuration
    /// error.
    fn initialize(
        &mut self,
        input: &Variable,
        storage: &mut Storage<T>,
        rng: &mut dyn RngCore,
        initialization: Initialization,
    ) -> Result<Variable>;

    /// Re-derives the output shape for a new input shape. Parameters are kept;
    /// the output keeps its slot.
    fn update_dimensions(&mut self, input: &Variable) -> Result<Variable>;

    /// Reads the input activation and writes the output activation.
    fn forward(&self, storage: &mut Storage<T>) -> Result<()>;

    /// Reads the output gradient (and whatever `forward` left in storage) and
    /// writes the input gradient and the parameter gradients.
    fn backward(&self, storage: &mut Storage<T>) -> Result<()>;

    /// Forgets the wiring done by `initialize`. The network calls this on
    /// every layer when initializing the chain fails part way.
    fn reset(&mut self);

    fn input(&self) -> Option<&Variable>;

    fn output(&self) -> Option<&Variable>;

    /// Trainable parameter slots, in declaration order.
    fn parameters(&self) -> Vec<Variable> {
        Vec::new()
    }

    /// Whether each output row is a probability distribution.
    fn supports_probabilities(&self) -> bool {
        false
    }
}

/// The pair of slots a layer is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ports {
    pub input: Variable,
    pub output: Variable,
}

impl Ports {
    /// The ports of an initialized layer, or a configuration error naming it.
    pub fn wired<'a>(ports: &'a Option<Ports>, layer: &str) -> Result<&'a Ports> {
        ports
            .as_ref()
            .ok_or_else(|| Error::configuration(format!("{layer} layer used before initialize")))
    }

    /// Wires a fresh layer to `input` and a newly declared output slot.
    pub fn connect<T: Element>(
        ports: &mut Option<Ports>,
        layer: &str,
        input: &Variable,
        output_dimensions: Vec<usize>,
        storage: &mut Storage<T>,
    ) -> Result<Variable> {
        if ports.is_some() {
            return Err(Error::configuration(format!(
                "{layer} layer is already initialized"
            )));
        }
        let output = storage.declare(output_dimensions)?;
        *ports = Some(Ports {
            input: input.clone(),
            output: output.clone(),
        });
        Ok(output)
    }

    /// Moves both slots to new shapes. The input must be the slot the layer
    /// was initialized with.
    pub fn reshape(
        ports: &mut Option<Ports>,
        layer: &str,
        input: &Variable,
        output_dimensions: Vec<usize>,
    ) -> Result<Variable> {
        let current = ports
            .as_mut()
            .ok_or_else(|| Error::configuration(format!("{layer} layer used before initialize")))?;
        if !current.input.same_slot(input) {
            return Err(Error::configuration(format!(
                "{layer} layer is wired to variable {}, got variable {}",
                current.input.id(),
                input.id()
            )));
        }
        current.input = input.clone();
        current.output = current.output.with_dimensions(output_dimensions)?;
        Ok(current.output.clone())
    }
}
