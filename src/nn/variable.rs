use crate::error::Result;
use crate::tensor::check_dimensions;

/// Arena handle of a [`Variable`]. Issued by [`crate::nn::Storage`].
pub type VariableId = usize;

/// A named tensor slot: a handle into the storage arena plus the shape the
/// slot currently has. Holds no data.
///
/// Two variables with the same dimensions are still different slots; use
/// [`Variable::same_slot`] to compare identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    id: VariableId,
    dimensions: Vec<usize>,
}

impl Variable {
    pub(crate) fn new(id: VariableId, dimensions: Vec<usize>) -> Result<Variable> {
        check_dimensions(&dimensions)?;
        Ok(Variable { id, dimensions })
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn batch_size(&self) -> usize {
        self.dimensions[0]
    }

    /// Dimensions after the batch axis.
    pub fn trailing(&self) -> &[usize] {
        &self.dimensions[1..]
    }

    pub fn element_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Same slot, new shape.
    pub fn with_dimensions(&self, dimensions: Vec<usize>) -> Result<Variable> {
        Variable::new(self.id, dimensions)
    }

    /// Same slot, with the batch axis replaced.
    pub fn with_batch_size(&self, batch_size: usize) -> Result<Variable> {
        let mut dimensions = self.dimensions.clone();
        dimensions[0] = batch_size;
        self.with_dimensions(dimensions)
    }

    pub fn same_slot(&self, other: &Variable) -> bool {
        self.id == other.id
    }
}
