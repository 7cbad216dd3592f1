use std::cmp::PartialEq;

use super::numeric::*;
use crate::error::{Error, Result};

/// Rejects dimension vectors that are empty or contain a zero.
pub fn check_dimensions(dimensions: &[usize]) -> Result<()> {
    if dimensions.is_empty() || dimensions.contains(&0) {
        return Err(Error::InvalidShape(dimensions.to_vec()));
    }
    Ok(())
}

/// A shape-tagged, row-major buffer. Axis 0 is the batch axis.
///
/// `data.len()` always equals the product of `dimensions`.
#[derive(Debug, PartialEq, Clone)]
pub struct Tensor<T>
where
    T: Numeric,
{
    data: Vec<T>,
    dimensions: Vec<usize>,
}

impl<T> Tensor<T>
where
    T: Numeric,
{
    /// ```
    /// # use light_net::tensor::*;
    /// let matrix = Tensor::new((0..6).collect(), vec![2, 3]).unwrap();
    /// assert_eq!(matrix.batch_size(), 2);
    /// assert_eq!(matrix.row_len(), 3);
    /// assert!(Tensor::new(vec![0, 1], vec![3]).is_err());
    /// ```
    pub fn new(data: Vec<T>, dimensions: Vec<usize>) -> Result<Tensor<T>> {
        check_dimensions(&dimensions)?;
        let len: usize = dimensions.iter().product();
        if len != data.len() {
            return Err(Error::shape_mismatch(&[len], &[data.len()]));
        }
        Ok(Tensor { data, dimensions })
    }

    pub fn new_with_filler(dimensions: Vec<usize>, filler: T) -> Result<Tensor<T>> {
        check_dimensions(&dimensions)?;
        let total = dimensions.iter().product();
        Ok(Tensor {
            data: vec![filler; total],
            dimensions,
        })
    }

    pub fn zeros(dimensions: Vec<usize>) -> Result<Tensor<T>> {
        Self::new_with_filler(dimensions, T::zero())
    }

    /// Stacks equally long rows into a `[rows.len(), row_len]` tensor.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Tensor<T>> {
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.len() != width {
                return Err(Error::shape_mismatch(&[width], &[row.len()]));
            }
            data.extend_from_slice(row);
        }
        Tensor::new(data, vec![rows.len(), width])
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    pub fn batch_size(&self) -> usize {
        self.dimensions[0]
    }

    /// Number of elements in one batch entry.
    pub fn row_len(&self) -> usize {
        self.dimensions[1..].iter().product()
    }

    pub fn row(&self, index: usize) -> Result<&[T]> {
        if index >= self.batch_size() {
            return Err(Error::shape_mismatch(&[self.batch_size()], &[index + 1]));
        }
        let width = self.row_len();
        Ok(&self.data[index * width..(index + 1) * width])
    }

    pub fn same_shape(&self, other: &Tensor<T>) -> bool {
        self.dimensions == other.dimensions
    }

    fn global_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.dimensions.len() {
            return Err(Error::shape_mismatch(&self.dimensions, index));
        }
        let mut global_idx = 0;
        let mut multiplier = 1;
        for (&dim, &idx_dim) in self.dimensions.iter().zip(index.iter()).rev() {
            if dim <= idx_dim {
                return Err(Error::shape_mismatch(&self.dimensions, index));
            }
            global_idx += idx_dim * multiplier;
            multiplier *= dim;
        }
        Ok(global_idx)
    }

    pub fn get(&self, index: &[usize]) -> Result<&T> {
        let global_idx = self.global_index(index)?;
        Ok(&self.data[global_idx])
    }

    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let global_idx = self.global_index(index)?;
        self.data[global_idx] = value;
        Ok(())
    }

    /// Copies `length` batch entries starting at `start` into `destination`.
    ///
    /// `destination` must already have shape `[length, trailing..]`; its buffer
    /// is overwritten in place.
    pub fn slice_copy(&self, start: usize, length: usize, destination: &mut Tensor<T>) -> Result<()> {
        let mut expected = self.dimensions.clone();
        expected[0] = length;
        if destination.dimensions != expected {
            return Err(Error::shape_mismatch(&expected, &destination.dimensions));
        }
        if start + length > self.batch_size() {
            return Err(Error::shape_mismatch(&[self.batch_size()], &[start + length]));
        }
        let width = self.row_len();
        destination
            .data
            .copy_from_slice(&self.data[start * width..(start + length) * width]);
        Ok(())
    }

    /// Writes `source` into the batch entries starting at `index`.
    pub fn set_slice(&mut self, index: usize, source: &Tensor<T>) -> Result<()> {
        if source.dimensions[1..] != self.dimensions[1..] {
            let mut expected = self.dimensions.clone();
            expected[0] = source.batch_size();
            return Err(Error::shape_mismatch(&expected, &source.dimensions));
        }
        if index + source.batch_size() > self.batch_size() {
            return Err(Error::shape_mismatch(
                &[self.batch_size()],
                &[index + source.batch_size()],
            ));
        }
        let width = self.row_len();
        self.data[index * width..index * width + source.data.len()].copy_from_slice(&source.data);
        Ok(())
    }

    /// Gathers the given batch entries, in order, into a new tensor.
    pub fn rows(&self, indices: &[usize]) -> Result<Tensor<T>> {
        let mut dimensions = self.dimensions.clone();
        dimensions[0] = indices.len();
        let mut data = Vec::with_capacity(indices.len() * self.row_len());
        for &index in indices {
            data.extend_from_slice(self.row(index)?);
        }
        Tensor::new(data, dimensions)
    }
}
