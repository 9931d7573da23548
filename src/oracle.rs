//! Reference constructions relating the separable and dense convolutions.
//!
//! A separable per-pixel kernel `(h, v)` is the dense kernel
//! `D[i * K + j] = h[j] * v[i]`. Expanding it and running the dense
//! convolution must give the separable output, and the dense kernel gradient
//! contracted back through the outer product must give the separable one:
//!
//! ```text
//! dL/dh[j] = Σ_i dL/dD[i * K + j] * v[i]
//! dL/dv[i] = Σ_j dL/dD[i * K + j] * h[j]
//! ```
//!
//! Both functions are plain loops over the tensors and never touch the
//! convolution kernels, which makes them usable as an independent check.

use crate::error::{Input, ShapeError};
use crate::geometry::KernelLayout;
use crate::tensors::{Ten64, Tensor};

fn separable_kernel_size(shape: &[usize]) -> Result<usize, ShapeError> {
    if shape.len() != 4 {
        return Err(ShapeError::AxisCount {
            input: Input::Kernel,
            axes: shape.len(),
        });
    }
    KernelLayout::Separable.kernel_size(shape[1])
}

/// Expands a separable kernel tensor `[N, 2K, H, W]` into the equivalent dense
/// kernel tensor `[N, K², H, W]`.
///
/// # Errors
/// If `kernel` is not a valid separable kernel tensor.
pub fn expand_separable(kernel: &Ten64) -> Result<Ten64, ShapeError> {
    let k = separable_kernel_size(&kernel.shape)?;
    let (n_batch, h, w) = (kernel.shape[0], kernel.shape[2], kernel.shape[3]);

    let mut dense = Tensor::zeros(vec![n_batch, k * k, h, w]);
    for n in 0..n_batch {
        for y in 0..h {
            for x in 0..w {
                for i in 0..k {
                    let vert = kernel.at(n, k + i, y, x);
                    for j in 0..k {
                        let at = dense.offset(n, i * k + j, y, x);
                        dense.data[at] = kernel.at(n, j, y, x) * vert;
                    }
                }
            }
        }
    }
    Ok(dense)
}

/// Contracts a dense kernel gradient `[N, K², H, W]` onto the two halves of
/// the separable kernel tensor `[N, 2K, H, W]` it was expanded from.
///
/// # Errors
/// If `kernel` is not a valid separable kernel tensor or `dense_grad` is not
/// shaped like its expansion.
pub fn contract_dense_gradient(dense_grad: &Ten64, kernel: &Ten64) -> Result<Ten64, ShapeError> {
    let k = separable_kernel_size(&kernel.shape)?;
    let (n_batch, h, w) = (kernel.shape[0], kernel.shape[2], kernel.shape[3]);
    let expected = vec![n_batch, k * k, h, w];
    if dense_grad.shape != expected {
        return Err(ShapeError::NotReshaped {
            input: Input::Kernel,
            expected,
            found: dense_grad.shape.clone(),
        });
    }

    let mut grad = Tensor::zeros(kernel.shape.clone());
    for n in 0..n_batch {
        for y in 0..h {
            for x in 0..w {
                for i in 0..k {
                    for j in 0..k {
                        let d = dense_grad.at(n, i * k + j, y, x);
                        let at_h = grad.offset(n, j, y, x);
                        let at_v = grad.offset(n, k + i, y, x);
                        grad.data[at_h] += d * kernel.at(n, k + i, y, x);
                        grad.data[at_v] += d * kernel.at(n, j, y, x);
                    }
                }
            }
        }
    }
    Ok(grad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_is_outer_product() {
        // one pixel, K = 3: h = [1, 2, 3], v = [10, 20, 30]
        let kernel = Tensor::new(vec![1, 6, 1, 1], vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        let dense = expand_separable(&kernel).unwrap();
        assert_eq!(dense.shape, vec![1, 9, 1, 1]);
        assert_eq!(
            dense.data,
            vec![10.0, 20.0, 30.0, 20.0, 40.0, 60.0, 30.0, 60.0, 90.0]
        );
    }

    #[test]
    fn contraction_follows_chain_rule() {
        let kernel = Tensor::new(vec![1, 2, 1, 1], vec![3.0, 5.0]);
        let dense_grad = Tensor::new(vec![1, 1, 1, 1], vec![2.0]);
        let grad = contract_dense_gradient(&dense_grad, &kernel).unwrap();
        assert_eq!(grad.data, vec![10.0, 6.0]);
    }

    #[test]
    fn rejects_dense_kernel_tensor() {
        let kernel = Tensor::zeros(vec![1, 9, 2, 2]);
        assert_eq!(
            expand_separable(&kernel),
            Err(ShapeError::OddChannels { channels: 9 })
        );
    }

    #[test]
    fn rejects_mismatched_gradient() {
        let kernel = Tensor::zeros(vec![1, 6, 2, 2]);
        let dense_grad = Tensor::zeros(vec![1, 9, 2, 3]);
        assert!(matches!(
            contract_dense_gradient(&dense_grad, &kernel),
            Err(ShapeError::NotReshaped { .. })
        ));
    }
}
