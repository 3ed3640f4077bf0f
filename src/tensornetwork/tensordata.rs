use float_cmp::approx_eq;
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use crate::types::{CircuitError, Result};

/// Dense complex tensor payload exchanged with the storage backend.
///
/// The graph core never inspects payload contents except for rank and shape
/// bookkeeping; all arithmetic on payloads happens behind the
/// [`TensorBackend`](crate::backend::TensorBackend) contract.
#[derive(Debug, Clone)]
pub struct TensorData {
    data: ArrayD<Complex64>,
}

impl TensorData {
    /// Builds a tensor from its dimensions and a flat row-major element
    /// vector.
    ///
    /// # Examples
    /// ```
    /// use num_complex::Complex64;
    /// use tncircuit::tensornetwork::tensordata::TensorData;
    ///
    /// let ket0 = TensorData::new_from_flat(&[2], vec![Complex64::ONE, Complex64::ZERO]).unwrap();
    /// assert_eq!(ket0.shape(), &[2]);
    /// ```
    pub fn new_from_flat(dims: &[usize], data: Vec<Complex64>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(dims), data)
            .map(|data| Self { data })
            .map_err(|e| CircuitError::InvalidArgument(format!("tensor data does not fit shape: {e}")))
    }

    /// Shape of the tensor, one entry per axis.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Rank of the tensor.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the tensor holds no elements, which happens when some
    /// axis has size zero (e.g. a fully truncated bond).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at the given multi-index.
    #[inline]
    pub fn get(&self, index: &[usize]) -> Complex64 {
        self.data[index]
    }

    /// Borrows the underlying array.
    #[inline]
    pub fn array(&self) -> &ArrayD<Complex64> {
        &self.data
    }

    /// Reorders axes so that axis `k` of the result is axis `axes[k]` of
    /// `self`. `axes` must be a permutation of `0..self.ndim()`.
    pub fn permuted_axes(&self, axes: &[usize]) -> Self {
        Self {
            data: self.data.clone().permuted_axes(IxDyn(axes)),
        }
    }
}

impl From<ArrayD<Complex64>> for TensorData {
    fn from(data: ArrayD<Complex64>) -> Self {
        Self { data }
    }
}

impl PartialEq for TensorData {
    fn eq(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        self.data.iter().zip(other.data.iter()).all(|(a, b)| {
            approx_eq!(f64, a.re, b.re, epsilon = 1e-8) && approx_eq!(f64, a.im, b.im, epsilon = 1e-8)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(values: &[f64]) -> Vec<Complex64> {
        values.iter().map(|&v| Complex64::new(v, 0.0)).collect()
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let result = TensorData::new_from_flat(&[2, 2], real(&[1.0, 2.0, 3.0]));
        assert!(matches!(result, Err(CircuitError::InvalidArgument(_))));
    }

    #[test]
    fn permuted_axes_transposes_elements() {
        let t = TensorData::new_from_flat(&[2, 3], real(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
        let p = t.permuted_axes(&[1, 0]);
        assert_eq!(p.shape(), &[3, 2]);
        assert_eq!(p.get(&[0, 1]), t.get(&[1, 0]));
        assert_eq!(p.get(&[2, 0]), t.get(&[0, 2]));
    }

    #[test]
    fn approximate_equality_tolerates_rounding() {
        let a = TensorData::new_from_flat(&[2], real(&[1.0, 0.5])).unwrap();
        let b = TensorData::new_from_flat(&[2], real(&[1.0 + 1e-12, 0.5])).unwrap();
        let c = TensorData::new_from_flat(&[2], real(&[1.0, 0.6])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
