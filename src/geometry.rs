//! Shape validation and the scalars derived from it.
//!
//! Both convolutions take an image `[N, C, H, W]` and a per-pixel kernel
//! tensor `[N, B, H, W]`. They differ only in how the kernel channel count
//! `B` encodes the kernel size `K`:
//!
//! - dense: `B = K * K`, a flattened `K×K` neighborhood per pixel
//! - separable: `B = 2 * K`, a horizontal then a vertical 1D filter per pixel
//!
//! [`Geometry::validate`] runs the checks in a fixed order and either derives
//! `(K, P, N, C, H, W)` or reports the first violated rule.

use crate::error::{Input, ShapeError};

/// How the kernel tensor's channel axis encodes the per-pixel kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelLayout {
    /// `K²` channels, entry `(i, j)` of the neighborhood at channel `i * K + j`.
    Dense,
    /// `2K` channels, horizontal weights in `[0, K)`, vertical in `[K, 2K)`.
    Separable,
}

impl KernelLayout {
    /// Number of kernel channels needed for kernel size `k`.
    #[inline]
    pub const fn kernel_channels(self, k: usize) -> usize {
        match self {
            Self::Dense => k * k,
            Self::Separable => 2 * k,
        }
    }

    pub(crate) fn kernel_size(self, channels: usize) -> Result<usize, ShapeError> {
        let k = match self {
            Self::Dense => {
                let k = channels.isqrt();
                if k * k != channels {
                    return Err(ShapeError::NotSquare { channels });
                }
                k
            }
            Self::Separable => {
                if channels % 2 != 0 {
                    return Err(ShapeError::OddChannels { channels });
                }
                channels / 2
            }
        };
        if k % 2 != 1 {
            return Err(ShapeError::EvenKernel { kernel: k });
        }
        Ok(k)
    }
}

/// Scalars derived from a successful validation.
///
/// Only [`Geometry::validate`] builds one, so `K` is odd and `P = (K - 1) / 2`
/// for every value in circulation. Valid until the next validation; the
/// kernels re-check incoming tensors against [`Geometry::image_shape`] and
/// [`Geometry::kernel_shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    layout: KernelLayout,
    kernel: usize,
    padding: usize,
    batch: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl Geometry {
    /// Checks an image/kernel shape pair and derives the geometry.
    ///
    /// # Errors
    ///
    /// In order: either input not rank 4, batch disagreement, kernel channel
    /// count not encoding an odd `K`, height disagreement, width disagreement.
    pub fn validate(
        layout: KernelLayout,
        image_shape: &[usize],
        kernel_shape: &[usize],
    ) -> Result<Self, ShapeError> {
        if image_shape.len() != 4 {
            return Err(ShapeError::AxisCount {
                input: Input::Image,
                axes: image_shape.len(),
            });
        }
        if kernel_shape.len() != 4 {
            return Err(ShapeError::AxisCount {
                input: Input::Kernel,
                axes: kernel_shape.len(),
            });
        }
        if image_shape[0] != kernel_shape[0] {
            return Err(ShapeError::BatchMismatch {
                image: image_shape[0],
                kernel: kernel_shape[0],
            });
        }
        let kernel = layout.kernel_size(kernel_shape[1])?;
        if image_shape[2] != kernel_shape[2] {
            return Err(ShapeError::HeightMismatch {
                image: image_shape[2],
                kernel: kernel_shape[2],
            });
        }
        if image_shape[3] != kernel_shape[3] {
            return Err(ShapeError::WidthMismatch {
                image: image_shape[3],
                kernel: kernel_shape[3],
            });
        }

        Ok(Self {
            layout,
            kernel,
            padding: (kernel - 1) / 2,
            batch: image_shape[0],
            channels: image_shape[1],
            height: image_shape[2],
            width: image_shape[3],
        })
    }

    #[inline]
    pub fn layout(&self) -> KernelLayout {
        self.layout
    }

    /// Kernel size `K`, always odd.
    #[inline]
    pub fn kernel(&self) -> usize {
        self.kernel
    }

    /// Padding `P = (K - 1) / 2`.
    #[inline]
    pub fn padding(&self) -> usize {
        self.padding
    }

    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rejects use of this geometry by the other convolution.
    pub fn expect_layout(&self, layout: KernelLayout) -> Result<(), ShapeError> {
        if self.layout != layout {
            return Err(ShapeError::LayoutMismatch {
                expected: layout,
                found: self.layout,
            });
        }
        Ok(())
    }

    /// `[N, C, H, W]`, also the output shape.
    #[inline]
    pub fn image_shape(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }

    /// `[N, B, H, W]` with `B` given by the layout.
    #[inline]
    pub fn kernel_shape(&self) -> [usize; 4] {
        [
            self.batch,
            self.layout.kernel_channels(self.kernel),
            self.height,
            self.width,
        ]
    }

    /// Pixels in one channel plane (`H * W`).
    #[inline]
    pub fn plane(&self) -> usize {
        self.height * self.width
    }

    /// Elements of one batch entry of the image (`C * H * W`).
    #[inline]
    pub fn image_stride(&self) -> usize {
        self.channels * self.plane()
    }

    /// Elements of one batch entry of the kernel tensor (`B * H * W`).
    #[inline]
    pub fn kernel_stride(&self) -> usize {
        self.layout.kernel_channels(self.kernel) * self.plane()
    }

    /// Rejects a tensor whose shape is not the one this geometry was derived from.
    pub fn expect(&self, input: Input, shape: &[usize]) -> Result<(), ShapeError> {
        let expected = match input {
            Input::Image => self.image_shape(),
            Input::Kernel => self.kernel_shape(),
        };
        if shape != expected {
            return Err(ShapeError::NotReshaped {
                input,
                expected: expected.to_vec(),
                found: shape.to_vec(),
            });
        }
        Ok(())
    }
}
