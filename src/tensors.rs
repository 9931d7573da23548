//! Core tensor data structures.
//!
//! # Tensor Buffers
//!
//! The convolution kernels in this crate read and write plain row-major buffers.
//! A [`Tensor`] is nothing more than a shape and the flattened data behind it;
//! allocation and ownership stay with the caller.
//!
//! It supports:
//! - Construction of N-dimensional tensors with shape and row-major data layout
//! - Zero-filled allocation for outputs and gradients
//! - `[N, C, H, W]` offset computation for rank-4 tensors
//! - Autograd-compatible `WithGrad` wrappers
//! - `[N, C, H, W]` literals through the `tensor!` macro
//!
//! ## Limitations
//! - Row-major only, the last axis varies fastest
//! - No broadcasting, slicing, or views
//!
//! ## Example
//!
//! ```rust
//! use briny_pac::tensors::Tensor;
//! let t = Tensor::new(vec![1, 1, 2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![1, 1, 2, 3]);
//! assert_eq!(t.data[t.offset(0, 0, 1, 2)], 6.0);
//! ```

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 3, 4, 4]` for a batch of two
///   three-channel 4×4 images.
/// - `data` holds the flattened content in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

/// Double precision tensor, the element type every convolution in this crate uses.
pub type Ten64 = Tensor<f64>;

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// Number of elements held by the tensor.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` when the tensor holds no element (some axis is zero).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `(n, c, y, x)` in a rank-4 tensor.
    ///
    /// Only meaningful for rank-4 tensors; callers validate the rank first.
    #[inline]
    pub fn offset(&self, n: usize, c: usize, y: usize, x: usize) -> usize {
        ((n * self.shape[1] + c) * self.shape[2] + y) * self.shape[3] + x
    }

    /// Reads the element at `(n, c, y, x)` of a rank-4 tensor.
    #[inline]
    pub fn at(&self, n: usize, c: usize, y: usize, x: usize) -> T
    where
        T: Copy,
    {
        self.data[self.offset(n, c, y, x)]
    }
}

impl<T: Default + Clone> Tensor<T> {
    /// Allocates a tensor of the given shape filled with `T::default()`.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![T::default(); len],
        }
    }
}

impl<T: Clone> Tensor<T> {
    /// Allocates a tensor of the given shape with every element set to `value`.
    pub fn full(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![value; len],
        }
    }
}

/// A container for tracking gradients of values (used in autograd).
///
/// Typically used as `WithGrad<Ten64>` for a per-pixel kernel tensor.
#[derive(Debug, Clone)]
pub struct WithGrad<T> {
    pub value: T,
    pub grad: T,
}

impl<T: Default + Clone> WithGrad<Tensor<T>> {
    /// Wraps a tensor with a zeroed gradient of the same shape.
    pub fn new(value: Tensor<T>) -> Self {
        let grad = Tensor::zeros(value.shape.clone());
        Self { value, grad }
    }
}

impl WithGrad<Ten64> {
    /// Adds `grad` into the tracked gradient.
    ///
    /// # Panics
    /// Panics if `grad` does not have the shape of the tracked value.
    pub fn accumulate(&mut self, grad: &Ten64) {
        assert_eq!(self.grad.shape, grad.shape, "gradient shape mismatch");
        for (g, &d) in self.grad.data.iter_mut().zip(&grad.data) {
            *g += d;
        }
    }

    /// Resets the tracked gradient to zero.
    pub fn zero_grad(&mut self) {
        self.grad.data.iter_mut().for_each(|g| *g = 0.0);
    }
}

/// Builds an `[N, C, H, W]` tensor from four levels of nested array literals.
///
/// Every batch entry must hold the same number of channels, every channel the
/// same number of rows, and every row the same number of pixels.
///
/// # Example
/// ```
/// use briny_pac::tensor;
/// let t = tensor!([[[[1.0, 2.0], [3.0, 4.0]]]]);
/// assert_eq!(t.shape, vec![1, 1, 2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([ $( [ $( [ $( [ $( $x:expr ),* $(,)? ] ),* $(,)? ] ),* $(,)? ] ),* $(,)? ]) => {
        $crate::tensors::Ten64::from_nchw(vec![
            $( vec![ $( vec![ $( vec![ $( $x ),* ] ),* ] ),* ] ),*
        ])
    };
}

impl Ten64 {
    /// Flattens nested `batch -> channel -> row -> pixel` vectors.
    ///
    /// # Panics
    /// Panics if the nesting is ragged at any level.
    pub fn from_nchw(batch: Vec<Vec<Vec<Vec<f64>>>>) -> Self {
        let n = batch.len();
        let c = batch.first().map_or(0, Vec::len);
        let h = batch.first().and_then(|b| b.first()).map_or(0, Vec::len);
        let w = batch
            .first()
            .and_then(|b| b.first())
            .and_then(|p| p.first())
            .map_or(0, Vec::len);

        let mut data = Vec::with_capacity(n * c * h * w);
        for channels in batch {
            assert_eq!(channels.len(), c, "ragged tensor literal: channel count");
            for rows in channels {
                assert_eq!(rows.len(), h, "ragged tensor literal: row count");
                for row in rows {
                    assert_eq!(row.len(), w, "ragged tensor literal: row width");
                    data.extend(row);
                }
            }
        }
        Self::new(vec![n, c, h, w], data)
    }
}
