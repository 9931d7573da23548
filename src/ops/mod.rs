//! # Operation Dispatch Layer
//!
//! This module holds the convolution kernels for each execution backend and
//! the layer that routes calls between them.
//!
//! ## Submodules
//!
//! - [`window`]: valid neighborhood offsets along one axis, shared by every loop nest
//! - [`cpu`]: sequential reference kernels (default backend)
//! - [`parallel`]: `rayon` kernels, separable convolution only
//! - [`dispatch`]: backend switching and shape checks
//!
//! ## Extending the Backend
//!
//! To add a new path for an operation:
//!
//! 1. Implement it in a backend module (e.g. `parallel::pac_forward`)
//! 2. Route it in [`dispatch`] in place of the `Unsupported` arm
//! 3. Report it through `PixelAdaptiveOp::has_accelerated`
//!
//! ## Notes
//!
//! - Every path must agree with [`cpu`] within floating-point tolerance
//! - Only the kernel tensor receives a gradient; the image is treated as data

pub mod cpu;
pub mod dispatch;
pub mod parallel;
pub mod window;
