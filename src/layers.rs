//! Graph-facing layers wrapping the two convolutions.
//!
//! A host graph drives every layer through the same sequence: `reshape` once
//! per shape change, then any number of `forward`/`backward` calls with
//! tensors of those shapes. Both layers take exactly two inputs (image, kernel
//! tensor) and produce exactly one output of the image's shape.
//!
//! # Example
//!
//! ```rust
//! use briny_pac::layers::{PacOp, PixelAdaptiveOp};
//! use briny_pac::tensors::Tensor;
//!
//! let mut layer = PacOp::by_name("SepPac").unwrap();
//! let out_shape = layer.reshape(&[1, 2, 4, 4], &[1, 6, 4, 4]).unwrap();
//! assert_eq!(out_shape, vec![1, 2, 4, 4]);
//!
//! let image = Tensor::full(out_shape.clone(), 1.0);
//! let kernel = Tensor::full(vec![1, 6, 4, 4], 1.0);
//! let out = layer.forward(&image, &kernel).unwrap();
//! // 3×3 box sum in the interior
//! assert_eq!(out.at(0, 0, 1, 1), 9.0);
//! ```

use crate::backend::{get_backend, Backend};
use crate::error::{Result, ShapeError};
use crate::geometry::{Geometry, KernelLayout};
use crate::ops::{dispatch, parallel::ParallelConfig};
use crate::tensors::Ten64;

/// Gradients produced by a backward pass.
///
/// The image is treated as non-differentiable data: `image` is always `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// Gradient w.r.t. the per-pixel kernel tensor, shaped like it.
    pub kernel: Ten64,
    /// Gradient w.r.t. the image. Never computed.
    pub image: Option<Ten64>,
}

/// Common contract of both pixel-adaptive convolutions.
pub trait PixelAdaptiveOp {
    /// Registered layer name.
    fn type_name(&self) -> &'static str;

    /// How the kernel tensor encodes the per-pixel kernel.
    fn layout(&self) -> KernelLayout;

    /// Number of input tensors: image and kernel.
    fn exact_num_inputs(&self) -> usize {
        2
    }

    /// Number of output tensors.
    fn exact_num_outputs(&self) -> usize {
        1
    }

    /// Whether [`Backend::Parallel`] is implemented.
    fn has_accelerated(&self) -> bool;

    /// Geometry of the last successful [`PixelAdaptiveOp::reshape`].
    fn geometry(&self) -> Option<&Geometry>;

    /// Validates the input shapes, stores the derived geometry and returns the output shape.
    ///
    /// # Errors
    /// The first violated [`ShapeError`] rule. The previous geometry is
    /// dropped, so later passes fail with [`ShapeError::Unvalidated`].
    fn reshape(
        &mut self,
        image_shape: &[usize],
        kernel_shape: &[usize],
    ) -> core::result::Result<Vec<usize>, ShapeError>;

    /// Forward pass on an explicit backend.
    ///
    /// # Errors
    /// Shape errors, or `Unsupported` if `backend` has no implementation.
    fn forward_on(&self, backend: Backend, image: &Ten64, kernel: &Ten64) -> Result<Ten64>;

    /// Backward pass on an explicit backend, kernel gradient only.
    ///
    /// # Errors
    /// Shape errors, or `Unsupported` if `backend` has no implementation.
    fn backward_on(
        &self,
        backend: Backend,
        top_grad: &Ten64,
        image: &Ten64,
        kernel: &Ten64,
    ) -> Result<Gradients>;

    /// Forward pass on the globally selected backend.
    ///
    /// # Errors
    /// See [`PixelAdaptiveOp::forward_on`].
    fn forward(&self, image: &Ten64, kernel: &Ten64) -> Result<Ten64> {
        self.forward_on(get_backend(), image, kernel)
    }

    /// Backward pass on the globally selected backend.
    ///
    /// # Errors
    /// See [`PixelAdaptiveOp::backward_on`].
    fn backward(&self, top_grad: &Ten64, image: &Ten64, kernel: &Ten64) -> Result<Gradients> {
        self.backward_on(get_backend(), top_grad, image, kernel)
    }
}

fn reshape_into(
    slot: &mut Option<Geometry>,
    name: &str,
    layout: KernelLayout,
    image_shape: &[usize],
    kernel_shape: &[usize],
) -> core::result::Result<Vec<usize>, ShapeError> {
    match Geometry::validate(layout, image_shape, kernel_shape) {
        Ok(g) => {
            log::debug!(
                "{name} reshape: K={} P={} N={} C={} H={} W={}",
                g.kernel(),
                g.padding(),
                g.batch(),
                g.channels(),
                g.height(),
                g.width()
            );
            *slot = Some(g);
            Ok(g.image_shape().to_vec())
        }
        Err(e) => {
            log::warn!("{name} rejected shapes {image_shape:?} / {kernel_shape:?}: {e}");
            *slot = None;
            Err(e)
        }
    }
}

/// Dense pixel-adaptive convolution, kernel tensor `[N, K², H, W]`.
#[derive(Debug, Clone, Default)]
pub struct Pac {
    geometry: Option<Geometry>,
}

impl Pac {
    pub fn new() -> Self {
        Self::default()
    }

    fn geometry_or_err(&self) -> core::result::Result<&Geometry, ShapeError> {
        self.geometry.as_ref().ok_or(ShapeError::Unvalidated)
    }
}

impl PixelAdaptiveOp for Pac {
    fn type_name(&self) -> &'static str {
        "Pac"
    }

    fn layout(&self) -> KernelLayout {
        KernelLayout::Dense
    }

    fn has_accelerated(&self) -> bool {
        false
    }

    fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    fn reshape(
        &mut self,
        image_shape: &[usize],
        kernel_shape: &[usize],
    ) -> core::result::Result<Vec<usize>, ShapeError> {
        reshape_into(&mut self.geometry, "Pac", KernelLayout::Dense, image_shape, kernel_shape)
    }

    fn forward_on(&self, backend: Backend, image: &Ten64, kernel: &Ten64) -> Result<Ten64> {
        dispatch::pac_forward(backend, self.geometry_or_err()?, image, kernel)
    }

    fn backward_on(
        &self,
        backend: Backend,
        top_grad: &Ten64,
        image: &Ten64,
        kernel: &Ten64,
    ) -> Result<Gradients> {
        let g = self.geometry_or_err()?;
        // the dense gradient does not read the kernel values, only its shape
        g.expect(crate::error::Input::Kernel, &kernel.shape)?;
        Ok(Gradients {
            kernel: dispatch::pac_backward(backend, g, top_grad, image)?,
            image: None,
        })
    }
}

/// Separable pixel-adaptive convolution, kernel tensor `[N, 2K, H, W]`.
#[derive(Debug, Clone, Default)]
pub struct SepPac {
    geometry: Option<Geometry>,
    config: ParallelConfig,
}

impl SepPac {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` for the accelerated path.
    pub fn with_config(config: ParallelConfig) -> Self {
        Self {
            geometry: None,
            config,
        }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    fn geometry_or_err(&self) -> core::result::Result<&Geometry, ShapeError> {
        self.geometry.as_ref().ok_or(ShapeError::Unvalidated)
    }
}

impl PixelAdaptiveOp for SepPac {
    fn type_name(&self) -> &'static str {
        "SepPac"
    }

    fn layout(&self) -> KernelLayout {
        KernelLayout::Separable
    }

    fn has_accelerated(&self) -> bool {
        true
    }

    fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    fn reshape(
        &mut self,
        image_shape: &[usize],
        kernel_shape: &[usize],
    ) -> core::result::Result<Vec<usize>, ShapeError> {
        reshape_into(
            &mut self.geometry,
            "SepPac",
            KernelLayout::Separable,
            image_shape,
            kernel_shape,
        )
    }

    fn forward_on(&self, backend: Backend, image: &Ten64, kernel: &Ten64) -> Result<Ten64> {
        dispatch::sep_forward(backend, self.geometry_or_err()?, image, kernel)
    }

    fn backward_on(
        &self,
        backend: Backend,
        top_grad: &Ten64,
        image: &Ten64,
        kernel: &Ten64,
    ) -> Result<Gradients> {
        let g = self.geometry_or_err()?;
        Ok(Gradients {
            kernel: dispatch::sep_backward(backend, g, &self.config, top_grad, image, kernel)?,
            image: None,
        })
    }
}

/// Either convolution behind one type, for hosts that pick layers by name.
#[derive(Debug, Clone)]
pub enum PacOp {
    Dense(Pac),
    Separable(SepPac),
}

impl PacOp {
    /// Looks a layer up by its registered name (`"Pac"` or `"SepPac"`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "Pac" => Some(Self::Dense(Pac::new())),
            "SepPac" => Some(Self::Separable(SepPac::new())),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn PixelAdaptiveOp {
        match self {
            Self::Dense(op) => op,
            Self::Separable(op) => op,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PixelAdaptiveOp {
        match self {
            Self::Dense(op) => op,
            Self::Separable(op) => op,
        }
    }
}

impl PixelAdaptiveOp for PacOp {
    fn type_name(&self) -> &'static str {
        self.inner().type_name()
    }

    fn layout(&self) -> KernelLayout {
        self.inner().layout()
    }

    fn has_accelerated(&self) -> bool {
        self.inner().has_accelerated()
    }

    fn geometry(&self) -> Option<&Geometry> {
        self.inner().geometry()
    }

    fn reshape(
        &mut self,
        image_shape: &[usize],
        kernel_shape: &[usize],
    ) -> core::result::Result<Vec<usize>, ShapeError> {
        self.inner_mut().reshape(image_shape, kernel_shape)
    }

    fn forward_on(&self, backend: Backend, image: &Ten64, kernel: &Ten64) -> Result<Ten64> {
        self.inner().forward_on(backend, image, kernel)
    }

    fn backward_on(
        &self,
        backend: Backend,
        top_grad: &Ten64,
        image: &Ten64,
        kernel: &Ten64,
    ) -> Result<Gradients> {
        self.inner().backward_on(backend, top_grad, image, kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PacError;
    use crate::tensors::Tensor;

    #[test]
    fn lookup_by_name() {
        assert_eq!(PacOp::by_name("Pac").unwrap().type_name(), "Pac");
        let sep = PacOp::by_name("SepPac").unwrap();
        assert_eq!(sep.layout(), KernelLayout::Separable);
        assert!(sep.has_accelerated());
        assert!(PacOp::by_name("Conv").is_none());
    }

    #[test]
    fn arity_is_two_in_one_out() {
        let op = Pac::new();
        assert_eq!((op.exact_num_inputs(), op.exact_num_outputs()), (2, 1));
    }

    #[test]
    fn forward_before_reshape_fails() {
        let op = Pac::new();
        let t = Tensor::zeros(vec![1, 1, 1, 1]);
        assert_eq!(
            op.forward_on(Backend::Cpu, &t, &t),
            Err(PacError::Shape(ShapeError::Unvalidated))
        );
    }

    #[test]
    fn failed_reshape_drops_previous_geometry() {
        let mut op = SepPac::new();
        op.reshape(&[1, 1, 3, 3], &[1, 6, 3, 3]).unwrap();
        assert!(op.geometry().is_some());
        assert!(op.reshape(&[1, 1, 3, 3], &[1, 5, 3, 3]).is_err());
        assert!(op.geometry().is_none());
    }

    #[test]
    fn backward_leaves_image_gradient_empty() {
        let mut op = Pac::new();
        op.reshape(&[1, 2, 3, 3], &[1, 9, 3, 3]).unwrap();
        let image = Tensor::full(vec![1, 2, 3, 3], 1.0);
        let kernel = Tensor::full(vec![1, 9, 3, 3], 1.0);
        let grads = op.backward_on(Backend::Cpu, &image, &image, &kernel).unwrap();
        assert!(grads.image.is_none());
        assert_eq!(grads.kernel.shape, vec![1, 9, 3, 3]);
    }

    #[test]
    fn dense_layer_reports_missing_accelerated_path() {
        let mut op = PacOp::by_name("Pac").unwrap();
        op.reshape(&[1, 1, 2, 2], &[1, 1, 2, 2]).unwrap();
        let t = Tensor::zeros(vec![1, 1, 2, 2]);
        assert!(!op.has_accelerated());
        assert!(matches!(
            op.forward_on(Backend::Parallel, &t, &t),
            Err(PacError::Unsupported { .. })
        ));
    }
}
