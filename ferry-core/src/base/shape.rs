//! Shapes of observations and actions.
use crate::FerryError;
use serde::{Deserialize, Serialize};

/// Values with a fixed array shape.
///
/// The item encoder uses this to check observations and actions against the
/// signature of a table before anything is written.
pub trait Shaped {
    /// Shape of the value. Scalars return an empty shape.
    fn shape(&self) -> Vec<usize>;
}

impl Shaped for f32 {
    fn shape(&self) -> Vec<usize> {
        vec![]
    }
}

impl Shaped for i64 {
    fn shape(&self) -> Vec<usize> {
        vec![]
    }
}

impl Shaped for usize {
    fn shape(&self) -> Vec<usize> {
        vec![]
    }
}

impl Shaped for Vec<f32> {
    fn shape(&self) -> Vec<usize> {
        vec![self.len()]
    }
}

impl<const N: usize> Shaped for [f32; N] {
    fn shape(&self) -> Vec<usize> {
        vec![N]
    }
}

/// Dense `f32` array with an explicit shape.
///
/// Used for observations of higher rank and for the auxiliary tensors in
/// [`Extras`](crate::Extras).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Creates a tensor, checking that `data` fills `shape` exactly.
    pub fn new(data: Vec<f32>, shape: impl Into<Vec<usize>>) -> Result<Self, FerryError> {
        let shape = shape.into();
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(FerryError::InvalidConfig(format!(
                "tensor of shape {:?} needs {} elements, got {}",
                shape,
                numel,
                data.len()
            )));
        }
        Ok(Self { data, shape })
    }

    /// Tensor of zeros.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let numel = shape.iter().product();
        Self {
            data: vec![0.0; numel],
            shape,
        }
    }

    /// Flat view of the elements in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Shaped for Tensor {
    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_checked() {
        assert!(Tensor::new(vec![0.0; 6], [2, 3]).is_ok());
        assert!(Tensor::new(vec![0.0; 5], [2, 3]).is_err());
        assert_eq!(Tensor::zeros([4]).shape(), vec![4]);
        assert_eq!([1.0f32, 2.0].shape(), vec![2]);
        assert!(3.0f32.shape().is_empty());
    }
}
