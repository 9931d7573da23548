//! Error types for shape validation and backend dispatch.

use thiserror::Error;

/// Which of the two inputs a shape complaint is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Image,
    Kernel,
}

impl core::fmt::Display for Input {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Kernel => f.write_str("kernel"),
        }
    }
}

/// A structurally malformed pair of input shapes.
///
/// Always fatal to the operation that raised it: nothing is computed and no
/// output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("{input} input must have exactly 4 axes, got {axes}")]
    AxisCount { input: Input, axes: usize },

    #[error("both inputs must have the same batch length (image {image}, kernel {kernel})")]
    BatchMismatch { image: usize, kernel: usize },

    #[error("kernel channel count {channels} must be the square of an integer")]
    NotSquare { channels: usize },

    #[error("kernel channel count {channels} must be even")]
    OddChannels { channels: usize },

    #[error("kernel size {kernel} must be an odd integer")]
    EvenKernel { kernel: usize },

    #[error("inputs must have the same height (image {image}, kernel {kernel})")]
    HeightMismatch { image: usize, kernel: usize },

    #[error("inputs must have the same width (image {image}, kernel {kernel})")]
    WidthMismatch { image: usize, kernel: usize },

    #[error("geometry validated for the {found:?} layout used by a {expected:?} operation")]
    LayoutMismatch {
        expected: crate::geometry::KernelLayout,
        found: crate::geometry::KernelLayout,
    },

    #[error("operation used before its input shapes were validated")]
    Unvalidated,

    #[error("{input} shape {found:?} does not match the reshaped {expected:?}")]
    NotReshaped {
        input: Input,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// Top-level error of every fallible operation in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacError {
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("{op} has no {backend:?} implementation")]
    Unsupported {
        op: &'static str,
        backend: crate::backend::Backend,
    },
}

pub type Result<T> = core::result::Result<T, PacError>;
