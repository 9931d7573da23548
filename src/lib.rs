//! briny_pac: Pixel-adaptive convolutions with exact kernel gradients.
//!
//! A pixel-adaptive convolution (PAC) filters every output pixel with its own
//! kernel. The kernels are not learned parameters; they arrive as a second
//! input tensor next to the image, one kernel per pixel and batch entry,
//! shared by all image channels.
//!
//! # Features
//!
//! - Dense PAC: kernel tensor `[N, K², H, W]`, a full `K×K` neighborhood per pixel.
//! - Separable PAC: kernel tensor `[N, 2K, H, W]`, a horizontal and a vertical
//!   1D filter per pixel, equivalent to their outer product.
//! - Forward passes with implicit zero padding; the output has the image's shape.
//! - Backward passes w.r.t. the kernel tensor. The image is never differentiated.
//! - Sequential reference kernels plus a `rayon` path for the separable variant.
//!
//! # Modules
//!
//! - [`tensors`]: Row-major tensor buffers and gradient wrappers.
//! - [`geometry`]: Shape validation and derived scalars.
//! - [`ops`]: Backend kernels and the dispatch layer.
//! - [`layers`]: Graph-facing layer objects behind one trait.
//! - [`backprop`]: Closure-style differentiable entry points.
//! - [`oracle`]: Dense expansion of separable kernels, used to cross-check the two variants.
//!
//! # Example
//!
//! ```rust
//! use briny_pac::layers::{Pac, PixelAdaptiveOp};
//! use briny_pac::tensor;
//! use briny_pac::tensors::Tensor;
//!
//! let image = tensor!([[[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]]]);
//!
//! // identity kernel at every pixel: 1 at the centre tap
//! let mut kernel = Tensor::zeros(vec![1, 9, 3, 3]);
//! for pix in 0..9 {
//!     kernel.data[4 * 9 + pix] = 1.0;
//! }
//!
//! let mut layer = Pac::new();
//! layer.reshape(&image.shape, &kernel.shape).unwrap();
//! let out = layer.forward(&image, &kernel).unwrap();
//! assert_eq!(out, image);
//! ```

pub mod backend;
pub mod backprop;
pub mod error;
pub mod geometry;
pub mod layers;
pub mod ops;
pub mod oracle;
pub mod tensors;

pub use error::{PacError, Result, ShapeError};
