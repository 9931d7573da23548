//! Differentiable entry points in closure style.
//!
//! # Backpropagation Primitives
//!
//! For callers that do not keep a layer object around, each convolution is
//! also exposed as a single call that validates, runs the forward pass and
//! hands back a closure for the backward pass.
//!
//! ## Autograd Pattern
//!
//! 1. **Inputs** are the image and a `WithGrad<Ten64>` kernel tensor.
//! 2. **Forward Pass** computes the output on the active backend.
//! 3. **Backward Pass** returns a closure mapping `dL/d(out)` to `dL/d(kernel)`.
//! 4. **Gradient Application** uses [`WithGrad::accumulate`] on the kernel.
//!
//! The image never receives a gradient.
//!
//! ## Example
//!
//! ```rust
//! use briny_pac::backprop::pac;
//! use briny_pac::tensors::{Tensor, WithGrad};
//!
//! let image = Tensor::new(vec![1, 1, 1, 3], vec![1.0, 2.0, 3.0]);
//! let mut kernel = WithGrad::new(Tensor::full(vec![1, 1, 1, 3], 2.0));
//! let (out, back) = pac(&image, &kernel).unwrap();
//! assert_eq!(out.data, vec![2.0, 4.0, 6.0]);
//!
//! let grad = back(&Tensor::full(vec![1, 1, 1, 3], 1.0)).unwrap();
//! kernel.accumulate(&grad);
//! assert_eq!(kernel.grad.data, vec![1.0, 2.0, 3.0]);
//! ```

use crate::backend::get_backend;
use crate::error::Result;
use crate::geometry::{Geometry, KernelLayout};
use crate::ops::{dispatch, parallel::ParallelConfig};
use crate::tensors::{Ten64, WithGrad};

/// Dense pixel-adaptive convolution with its kernel gradient closure.
///
/// The closure owns a copy of the image, so the kernel can be updated while
/// it is alive.
///
/// # Errors
/// Shape errors from validation, or `Unsupported` when the active backend has
/// no dense implementation. The closure fails the same way for a malformed
/// upstream gradient.
pub fn pac(
    image: &Ten64,
    kernel: &WithGrad<Ten64>,
) -> Result<(Ten64, impl Fn(&Ten64) -> Result<Ten64> + use<>)> {
    let g = Geometry::validate(KernelLayout::Dense, &image.shape, &kernel.value.shape)?;
    let backend = get_backend();
    let out = dispatch::pac_forward(backend, &g, image, &kernel.value)?;

    // the dense gradient never reads the kernel values
    let image = image.clone();
    let back =
        move |grad_output: &Ten64| dispatch::pac_backward(backend, &g, grad_output, &image);

    Ok((out, back))
}

/// Separable pixel-adaptive convolution with its kernel gradient closure,
/// using the default [`ParallelConfig`].
///
/// # Errors
/// See [`sep_pac_with_config`].
pub fn sep_pac(
    image: &Ten64,
    kernel: &WithGrad<Ten64>,
) -> Result<(Ten64, impl Fn(&Ten64) -> Result<Ten64> + use<>)> {
    sep_pac_with_config(image, kernel, ParallelConfig::default())
}

/// Separable pixel-adaptive convolution with its kernel gradient closure.
///
/// `cfg` only affects the backward pass on [`crate::backend::Backend::Parallel`].
/// The closure owns copies of the image and of the kernel values at call time.
///
/// # Errors
/// Shape errors from validation. The closure fails for a malformed upstream
/// gradient.
pub fn sep_pac_with_config(
    image: &Ten64,
    kernel: &WithGrad<Ten64>,
    cfg: ParallelConfig,
) -> Result<(Ten64, impl Fn(&Ten64) -> Result<Ten64> + use<>)> {
    let g = Geometry::validate(KernelLayout::Separable, &image.shape, &kernel.value.shape)?;
    let backend = get_backend();
    let out = dispatch::sep_forward(backend, &g, image, &kernel.value)?;

    let image = image.clone();
    let weights = kernel.value.clone();
    let back = move |grad_output: &Ten64| {
        dispatch::sep_backward(backend, &g, &cfg, grad_output, &image, &weights)
    };

    Ok((out, back))
}
