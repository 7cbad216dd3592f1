use crate::error::{Error, Result};
use crate::nn::variable::Variable;
use crate::tensor::{Numeric, Tensor};

#[derive(Debug, Clone)]
struct Slot<T: Numeric> {
    value: Option<Tensor<T>>,
    gradient: Option<Tensor<T>>,
    trainable: bool,
}

/// A trainable parameter and the gradient the last backward pass wrote for it.
#[derive(Debug)]
pub struct Parameter<'a, T: Numeric> {
    pub variable: &'a Variable,
    pub value: &'a mut Tensor<T>,
    pub gradient: &'a Tensor<T>,
}

/// Per-network arena of activation, gradient and parameter buffers.
///
/// Slots are addressed by the integer handle carried in each [`Variable`].
/// Handles are issued in declaration order, which is layer order when a
/// network initializes its chain, so parameter enumeration is stable.
///
/// There is no internal locking: every mutating call takes `&mut self`.
#[derive(Debug, Clone)]
pub struct Storage<T: Numeric> {
    slots: Vec<Slot<T>>,
    variables: Vec<Variable>,
}

impl<T: Numeric> Default for Storage<T> {
    fn default() -> Self {
        Storage {
            slots: Vec::new(),
            variables: Vec::new(),
        }
    }
}

fn assign<T: Numeric>(entry: &mut Option<Tensor<T>>, variable: &Variable, data: &[T]) -> Result<()> {
    if data.len() != variable.element_count() {
        return Err(Error::shape_mismatch(variable.dimensions(), &[data.len()]));
    }
    match entry {
        Some(tensor) if tensor.dimensions() == variable.dimensions() => {
            tensor.data_mut().copy_from_slice(data);
        }
        _ => {
            *entry = Some(Tensor::new(data.to_vec(), variable.dimensions().to_vec())?);
        }
    }
    Ok(())
}

impl<T: Numeric> Storage<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh activation slot with the given shape.
    pub fn declare(&mut self, dimensions: Vec<usize>) -> Result<Variable> {
        let variable = Variable::new(self.slots.len(), dimensions)?;
        self.slots.push(Slot {
            value: None,
            gradient: None,
            trainable: false,
        });
        self.variables.push(variable.clone());
        Ok(variable)
    }

    /// Issues a trainable slot holding `initial`, with a zeroed gradient.
    pub fn declare_trainable(&mut self, initial: Tensor<T>) -> Result<Variable> {
        let variable = Variable::new(self.slots.len(), initial.dimensions().to_vec())?;
        let gradient = Tensor::zeros(initial.dimensions().to_vec())?;
        self.slots.push(Slot {
            value: Some(initial),
            gradient: Some(gradient),
            trainable: true,
        });
        self.variables.push(variable.clone());
        Ok(variable)
    }

    fn slot(&self, variable: &Variable) -> Result<&Slot<T>> {
        self.slots.get(variable.id()).ok_or_else(|| {
            Error::configuration(format!("variable {} is not declared in this storage", variable.id()))
        })
    }

    fn slot_mut(&mut self, variable: &Variable) -> Result<&mut Slot<T>> {
        self.slots.get_mut(variable.id()).ok_or_else(|| {
            Error::configuration(format!("variable {} is not declared in this storage", variable.id()))
        })
    }

    /// Overwrites the activation of `variable`, reusing the buffer when the
    /// shape is unchanged.
    pub fn assign_tensor(&mut self, variable: &Variable, data: &[T]) -> Result<()> {
        let slot = self.slot_mut(variable)?;
        assign(&mut slot.value, variable, data)
    }

    /// Overwrites the gradient of `variable`, reusing the buffer when the
    /// shape is unchanged.
    pub fn assign_gradient(&mut self, variable: &Variable, data: &[T]) -> Result<()> {
        let slot = self.slot_mut(variable)?;
        assign(&mut slot.gradient, variable, data)
    }

    pub fn get_tensor(&self, variable: &Variable) -> Result<&Tensor<T>> {
        let tensor = self.slot(variable)?.value.as_ref().ok_or_else(|| {
            Error::configuration(format!("no activation stored for variable {}", variable.id()))
        })?;
        check_current(tensor, variable)
    }

    pub fn get_gradient(&self, variable: &Variable) -> Result<&Tensor<T>> {
        let tensor = self.slot(variable)?.gradient.as_ref().ok_or_else(|| {
            Error::configuration(format!("no gradient stored for variable {}", variable.id()))
        })?;
        check_current(tensor, variable)
    }

    pub fn contains_tensor(&self, variable: &Variable) -> bool {
        matches!(self.slots.get(variable.id()), Some(Slot { value: Some(_), .. }))
    }

    /// Appends every trainable parameter, with its gradient, in declaration
    /// order.
    pub fn get_trainable_parameters<'a>(&'a mut self, parameters: &mut Vec<Parameter<'a, T>>) {
        for (slot, variable) in self.slots.iter_mut().zip(self.variables.iter()) {
            if let Slot {
                value: Some(value),
                gradient: Some(gradient),
                trainable: true,
            } = slot
            {
                parameters.push(Parameter {
                    variable,
                    value,
                    gradient,
                });
            }
        }
    }

    /// Drops every activation and gradient that is not a trainable parameter.
    pub fn clear_non_trainables(&mut self) {
        for slot in self.slots.iter_mut().filter(|slot| !slot.trainable) {
            slot.value = None;
            slot.gradient = None;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// An entry allocated for an older shape of the slot must not be read.
fn check_current<'a, T: Numeric>(tensor: &'a Tensor<T>, variable: &Variable) -> Result<&'a Tensor<T>> {
    if tensor.dimensions() != variable.dimensions() {
        return Err(Error::shape_mismatch(variable.dimensions(), tensor.dimensions()));
    }
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_then_get_round_trips() {
        let mut storage = Storage::new();
        let v = storage.declare(vec![2, 3]).unwrap();
        let data: Vec<f64> = (0..6).map(|i| i as f64).collect();
        storage.assign_tensor(&v, &data).unwrap();
        assert_eq!(storage.get_tensor(&v).unwrap().data(), data.as_slice());
        assert_eq!(storage.get_tensor(&v).unwrap().dimensions(), &[2, 3]);
    }

    #[test]
    fn test_reassign_keeps_buffer() {
        let mut storage = Storage::new();
        let v = storage.declare(vec![1, 3]).unwrap();
        storage.assign_tensor(&v, &[1.0, 2.0, 3.0]).unwrap();
        let before = storage.get_tensor(&v).unwrap().data().as_ptr();
        storage.assign_tensor(&v, &[4.0, 5.0, 6.0]).unwrap();
        let tensor = storage.get_tensor(&v).unwrap();
        assert_eq!(tensor.data().as_ptr(), before);
        assert_eq!(tensor.data(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_assign_checks_length() {
        let mut storage = Storage::<f32>::new();
        let v = storage.declare(vec![1, 3]).unwrap();
        assert_eq!(
            storage.assign_tensor(&v, &[1.0, 2.0]),
            Err(Error::shape_mismatch(&[1, 3], &[2]))
        );
        assert!(storage.assign_gradient(&v, &[1.0; 4]).is_err());
    }

    #[test]
    fn test_missing_entries_are_configuration_errors() {
        let mut storage = Storage::<f64>::new();
        let v = storage.declare(vec![1, 2]).unwrap();
        assert!(matches!(storage.get_tensor(&v), Err(Error::Configuration(_))));
        assert!(matches!(storage.get_gradient(&v), Err(Error::Configuration(_))));

        let mut other = Storage::<f64>::new();
        assert!(matches!(other.get_tensor(&v), Err(Error::Configuration(_))));
        assert!(matches!(
            other.assign_tensor(&v, &[0.0, 0.0]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_stale_entry_is_rejected() {
        let mut storage = Storage::<f64>::new();
        let v = storage.declare(vec![1, 2]).unwrap();
        storage.assign_tensor(&v, &[1.0, 2.0]).unwrap();
        let wider = v.with_batch_size(2).unwrap();
        assert!(matches!(
            storage.get_tensor(&wider),
            Err(Error::ShapeMismatch { .. })
        ));
        storage.assign_tensor(&wider, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(storage.get_tensor(&wider).unwrap().dimensions(), &[2, 2]);
    }

    #[test]
    fn test_clear_keeps_trainables() {
        let mut storage = Storage::new();
        let activation = storage.declare(vec![1, 2]).unwrap();
        let weights = storage
            .declare_trainable(Tensor::new(vec![0.5, -0.5], vec![2]).unwrap())
            .unwrap();
        storage.assign_tensor(&activation, &[1.0, 1.0]).unwrap();
        storage.assign_gradient(&activation, &[1.0, 1.0]).unwrap();
        storage.assign_gradient(&weights, &[0.1, 0.2]).unwrap();

        storage.clear_non_trainables();

        assert!(!storage.contains_tensor(&activation));
        assert!(storage.get_gradient(&activation).is_err());
        assert_eq!(storage.get_tensor(&weights).unwrap().data(), &[0.5, -0.5]);
        assert_eq!(storage.get_gradient(&weights).unwrap().data(), &[0.1, 0.2]);
    }

    #[test]
    fn test_trainable_parameters_in_declaration_order() {
        let mut storage = Storage::new();
        let first = storage
            .declare_trainable(Tensor::new_with_filler(vec![2], 1.0).unwrap())
            .unwrap();
        storage.declare(vec![1, 1]).unwrap();
        let second = storage
            .declare_trainable(Tensor::new_with_filler(vec![3], 2.0).unwrap())
            .unwrap();

        let mut parameters = Vec::new();
        storage.get_trainable_parameters(&mut parameters);
        assert_eq!(parameters.len(), 2);
        assert!(parameters[0].variable.same_slot(&first));
        assert!(parameters[1].variable.same_slot(&second));
        assert_eq!(parameters[1].gradient.data(), &[0.0, 0.0, 0.0]);

        parameters[0].value.data_mut()[0] = 9.0;
        drop(parameters);
        assert_eq!(storage.get_tensor(&first).unwrap().data(), &[9.0, 1.0]);
    }
}
