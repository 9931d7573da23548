//! Sequential CPU kernels
//!
//! # CPU Backend
//!
//! Reference implementations of both pixel-adaptive convolutions. Every
//! function writes into a caller-provided buffer laid out like the tensors in
//! [`crate::tensors`]; shapes are trusted, the dispatch layer checks them
//! against the [`Geometry`] before calling in.
//!
//! ## Implemented Ops
//!
//! - `pac_forward`: dense per-pixel `K×K` convolution
//! - `pac_backward`: gradient of the dense convolution w.r.t. the kernel tensor
//! - `sep_forward`: separable per-pixel convolution (horizontal then vertical)
//! - `sep_backward`: gradient of the separable convolution w.r.t. both filter halves
//!
//! ## Boundaries
//!
//! Neighbors outside the image are never read. Each loop walks a [`Window`],
//! which is exactly the accumulation of an explicitly zero-padded image.
//! Kernel-gradient entries that only ever multiply padding are never written,
//! so they keep the value of the zero-filled gradient buffer.

use super::window::Window;
use crate::geometry::Geometry;

/// Dense forward pass.
///
/// `out[n, c, y, x] = Σ img[n, c, y - P + i, x - P + j] * ker[n, i * K + j, y, x]`
/// over the in-bounds `(i, j)`, with the same per-pixel kernel for every channel.
pub fn pac_forward(g: &Geometry, img: &[f64], ker: &[f64], out: &mut [f64]) {
    let plane = g.plane();
    for n in 0..g.batch() {
        let ker_n = &ker[n * g.kernel_stride()..(n + 1) * g.kernel_stride()];
        for c in 0..g.channels() {
            let base = n * g.image_stride() + c * plane;
            pac_forward_plane(
                g,
                &img[base..base + plane],
                ker_n,
                &mut out[base..base + plane],
            );
        }
    }
}

/// One `(n, c)` output plane of the dense forward pass.
pub(crate) fn pac_forward_plane(g: &Geometry, img: &[f64], ker: &[f64], out: &mut [f64]) {
    let (k, w, plane) = (g.kernel(), g.width(), g.plane());
    for y in 0..g.height() {
        let rows = Window::new(y, g.padding(), k, g.height());
        for x in 0..w {
            let cols = Window::new(x, g.padding(), k, w);
            let pix = y * w + x;
            let mut v = 0.0;
            for (i_ker, i_img) in rows.iter() {
                for (j_ker, j_img) in cols.iter() {
                    v += img[i_img * w + j_img] * ker[(i_ker * k + j_ker) * plane + pix];
                }
            }
            out[pix] = v;
        }
    }
}

/// Dense backward pass, kernel gradient only.
///
/// `ker_grad[n, i * K + j, y, x] = Σ_c top_grad[n, c, y, x] * img[n, c, y - P + i, x - P + j]`
pub fn pac_backward(g: &Geometry, top_grad: &[f64], img: &[f64], ker_grad: &mut [f64]) {
    let (k, w, plane) = (g.kernel(), g.width(), g.plane());
    for n in 0..g.batch() {
        let top_n = &top_grad[n * g.image_stride()..(n + 1) * g.image_stride()];
        let img_n = &img[n * g.image_stride()..(n + 1) * g.image_stride()];
        let grad_n = &mut ker_grad[n * g.kernel_stride()..(n + 1) * g.kernel_stride()];
        for y in 0..g.height() {
            let rows = Window::new(y, g.padding(), k, g.height());
            for x in 0..w {
                let cols = Window::new(x, g.padding(), k, w);
                let pix = y * w + x;
                for (i_ker, i_img) in rows.iter() {
                    for (j_ker, j_img) in cols.iter() {
                        grad_n[(i_ker * k + j_ker) * plane + pix] =
                            channel_dot(g, top_n, img_n, pix, i_img * w + j_img);
                    }
                }
            }
        }
    }
}

/// Separable forward pass.
///
/// Each in-bounds row of the neighborhood is first reduced with the horizontal
/// weights (channels `[0, K)`), then the row sums are combined with the
/// vertical weights (channels `[K, 2K)`). The kernel tensor stays factored.
pub fn sep_forward(g: &Geometry, img: &[f64], ker: &[f64], out: &mut [f64]) {
    let plane = g.plane();
    for n in 0..g.batch() {
        let ker_n = &ker[n * g.kernel_stride()..(n + 1) * g.kernel_stride()];
        for c in 0..g.channels() {
            let base = n * g.image_stride() + c * plane;
            sep_forward_plane(
                g,
                &img[base..base + plane],
                ker_n,
                &mut out[base..base + plane],
            );
        }
    }
}

/// One `(n, c)` output plane of the separable forward pass.
///
/// Horizontal reduction inside, vertical outside; the order is fixed.
pub(crate) fn sep_forward_plane(g: &Geometry, img: &[f64], ker: &[f64], out: &mut [f64]) {
    let (k, w, plane) = (g.kernel(), g.width(), g.plane());
    for y in 0..g.height() {
        let rows = Window::new(y, g.padding(), k, g.height());
        for x in 0..w {
            let cols = Window::new(x, g.padding(), k, w);
            let pix = y * w + x;
            let mut v = 0.0;
            for (i_ker, i_img) in rows.iter() {
                let mut row = 0.0;
                for (j_ker, j_img) in cols.iter() {
                    row += img[i_img * w + j_img] * ker[j_ker * plane + pix];
                }
                v += row * ker[(k + i_ker) * plane + pix];
            }
            out[pix] = v;
        }
    }
}

/// Separable backward pass, kernel gradient only.
///
/// The horizontal half of the gradient is weighted by the vertical filter and
/// the vertical half by the horizontal filter, so the two halves get separate
/// loop nests.
pub fn sep_backward(
    g: &Geometry,
    top_grad: &[f64],
    img: &[f64],
    ker: &[f64],
    ker_grad: &mut [f64],
) {
    for n in 0..g.batch() {
        let top_n = &top_grad[n * g.image_stride()..(n + 1) * g.image_stride()];
        let img_n = &img[n * g.image_stride()..(n + 1) * g.image_stride()];
        let ker_n = &ker[n * g.kernel_stride()..(n + 1) * g.kernel_stride()];
        let grad_n = &mut ker_grad[n * g.kernel_stride()..(n + 1) * g.kernel_stride()];
        for y in 0..g.height() {
            for x in 0..g.width() {
                sep_backward_pixel(g, top_n, img_n, ker_n, grad_n, y, x);
            }
        }
    }
}

/// Kernel gradient of one pixel of one batch entry, both halves.
pub(crate) fn sep_backward_pixel(
    g: &Geometry,
    top: &[f64],
    img: &[f64],
    ker: &[f64],
    grad: &mut [f64],
    y: usize,
    x: usize,
) {
    let (k, w, plane) = (g.kernel(), g.width(), g.plane());
    let rows = Window::new(y, g.padding(), k, g.height());
    let cols = Window::new(x, g.padding(), k, w);
    let pix = y * w + x;

    // horizontal
    for (j_ker, j_img) in cols.iter() {
        let mut v = 0.0;
        for (i_ker, i_img) in rows.iter() {
            let t = channel_dot(g, top, img, pix, i_img * w + j_img);
            v += t * ker[(k + i_ker) * plane + pix];
        }
        grad[j_ker * plane + pix] = v;
    }

    // vertical
    for (i_ker, i_img) in rows.iter() {
        let mut v = 0.0;
        for (j_ker, j_img) in cols.iter() {
            let t = channel_dot(g, top, img, pix, i_img * w + j_img);
            v += t * ker[j_ker * plane + pix];
        }
        grad[(k + i_ker) * plane + pix] = v;
    }
}

/// `Σ_c top[c, out_pix] * img[c, in_pix]` within one batch entry.
#[inline]
pub(crate) fn channel_dot(
    g: &Geometry,
    top: &[f64],
    img: &[f64],
    out_pix: usize,
    in_pix: usize,
) -> f64 {
    let plane = g.plane();
    (0..g.channels())
        .map(|c| top[c * plane + out_pix] * img[c * plane + in_pix])
        .sum()
}
