//! Operation Dispatch Layer
//!
//! This module routes each convolution to the requested [`Backend`] after
//! checking the incoming tensors against the [`Geometry`] of the last
//! validation. Outputs and gradients are freshly zero-allocated here, so the
//! kernels only ever write into buffers of the right size.
//!
//! # Design Highlights
//! - **Explicit**: the backend is a parameter; layers pass in [`crate::backend::get_backend`]
//! - **No silent fallback**: asking for an accelerated path that does not
//!   exist is an [`PacError::Unsupported`] error
//! - **Shape-safe**: tensors that do not match the geometry, and geometries
//!   validated for the other convolution, are rejected before any numeric work
//!
//! # Example
//! ```rust
//! use briny_pac::backend::Backend;
//! use briny_pac::geometry::{Geometry, KernelLayout};
//! use briny_pac::ops::dispatch;
//! use briny_pac::tensors::Tensor;
//!
//! let g = Geometry::validate(KernelLayout::Dense, &[1, 1, 2, 2], &[1, 1, 2, 2]).unwrap();
//! let image = Tensor::new(vec![1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]);
//! let kernel = Tensor::full(vec![1, 1, 2, 2], 2.0);
//! let out = dispatch::pac_forward(Backend::Cpu, &g, &image, &kernel).unwrap();
//! assert_eq!(out.data, vec![2.0, 4.0, 6.0, 8.0]);
//! ```

use super::{cpu, parallel, parallel::ParallelConfig};
use crate::backend::Backend;
use crate::error::{Input, PacError, Result};
use crate::geometry::{Geometry, KernelLayout};
use crate::tensors::{Ten64, Tensor};

/// Dispatches the dense forward pass.
///
/// # Errors
/// - [`PacError::Shape`] if `g` is separable or `image`/`kernel` do not match it
/// - [`PacError::Unsupported`] for any backend but [`Backend::Cpu`]
pub fn pac_forward(backend: Backend, g: &Geometry, image: &Ten64, kernel: &Ten64) -> Result<Ten64> {
    g.expect_layout(KernelLayout::Dense)?;
    g.expect(Input::Image, &image.shape)?;
    g.expect(Input::Kernel, &kernel.shape)?;

    let mut out = Tensor::zeros(g.image_shape());
    match backend {
        Backend::Cpu => {
            log::trace!("pac forward on cpu, K={}", g.kernel());
            cpu::pac_forward(g, &image.data, &kernel.data, &mut out.data);
        }
        Backend::Parallel => {
            return Err(PacError::Unsupported {
                op: "pac forward",
                backend,
            });
        }
    }
    Ok(out)
}

/// Dispatches the dense backward pass and returns the kernel gradient.
///
/// # Errors
/// Same as [`pac_forward`], with `top_grad` checked against the image shape.
pub fn pac_backward(
    backend: Backend,
    g: &Geometry,
    top_grad: &Ten64,
    image: &Ten64,
) -> Result<Ten64> {
    g.expect_layout(KernelLayout::Dense)?;
    g.expect(Input::Image, &top_grad.shape)?;
    g.expect(Input::Image, &image.shape)?;

    let mut grad = Tensor::zeros(g.kernel_shape());
    match backend {
        Backend::Cpu => {
            log::trace!("pac backward on cpu, K={}", g.kernel());
            cpu::pac_backward(g, &top_grad.data, &image.data, &mut grad.data);
        }
        Backend::Parallel => {
            return Err(PacError::Unsupported {
                op: "pac backward",
                backend,
            });
        }
    }
    Ok(grad)
}

/// Dispatches the separable forward pass.
///
/// # Errors
/// [`PacError::Shape`] if `g` is dense or `image`/`kernel` do not match it.
pub fn sep_forward(backend: Backend, g: &Geometry, image: &Ten64, kernel: &Ten64) -> Result<Ten64> {
    g.expect_layout(KernelLayout::Separable)?;
    g.expect(Input::Image, &image.shape)?;
    g.expect(Input::Kernel, &kernel.shape)?;

    let mut out = Tensor::zeros(g.image_shape());
    log::trace!("sep-pac forward on {backend:?}, K={}", g.kernel());
    match backend {
        Backend::Cpu => cpu::sep_forward(g, &image.data, &kernel.data, &mut out.data),
        Backend::Parallel => parallel::sep_forward(g, &image.data, &kernel.data, &mut out.data),
    }
    Ok(out)
}

/// Dispatches the separable backward pass and returns the kernel gradient.
///
/// `cfg` only affects [`Backend::Parallel`].
///
/// # Errors
/// [`PacError::Shape`] if `g` is dense or any tensor does not match it.
pub fn sep_backward(
    backend: Backend,
    g: &Geometry,
    cfg: &ParallelConfig,
    top_grad: &Ten64,
    image: &Ten64,
    kernel: &Ten64,
) -> Result<Ten64> {
    g.expect_layout(KernelLayout::Separable)?;
    g.expect(Input::Image, &top_grad.shape)?;
    g.expect(Input::Image, &image.shape)?;
    g.expect(Input::Kernel, &kernel.shape)?;

    let mut grad = Tensor::zeros(g.kernel_shape());
    log::trace!("sep-pac backward on {backend:?}, K={}", g.kernel());
    match backend {
        Backend::Cpu => cpu::sep_backward(
            g,
            &top_grad.data,
            &image.data,
            &kernel.data,
            &mut grad.data,
        ),
        Backend::Parallel => parallel::sep_backward(
            g,
            cfg,
            &top_grad.data,
            &image.data,
            &kernel.data,
            &mut grad.data,
        ),
    }
    Ok(grad)
}
