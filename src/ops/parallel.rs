//! Multi-threaded CPU kernels using [`rayon`](https://docs.rs/rayon).
//!
//! Only the separable convolution has an accelerated path. The forward pass
//! splits the output into `(n, c)` planes; the backward pass splits the kernel
//! gradient by batch entry, since one pixel writes across all `2K` channels.
//!
//! Forward results are bit-identical to [`super::cpu`]. Backward results agree
//! within floating-point tolerance: for `K <= fast_kernel_limit` the channel
//! sums of each neighborhood are computed once into a `K×K` table shared by
//! both filter halves, which changes the summation grouping.

use super::{cpu, window::Window};
use crate::geometry::Geometry;
use rayon::prelude::*;

/// Largest kernel size the cached-product backward handles by default.
pub const DEFAULT_FAST_KERNEL_LIMIT: usize = 101;

/// Tuning of the accelerated separable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Kernel sizes up to this use the cached-product backward; larger ones
    /// recompute the channel sums per filter half.
    pub fast_kernel_limit: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            fast_kernel_limit: DEFAULT_FAST_KERNEL_LIMIT,
        }
    }
}

/// Separable forward pass, one rayon task per `(n, c)` plane.
pub fn sep_forward(g: &Geometry, img: &[f64], ker: &[f64], out: &mut [f64]) {
    let plane = g.plane();
    if plane == 0 {
        return;
    }
    out.par_chunks_mut(plane)
        .zip(img.par_chunks(plane))
        .enumerate()
        .for_each(|(nc, (out_p, img_p))| {
            let n = nc / g.channels();
            let ker_n = &ker[n * g.kernel_stride()..(n + 1) * g.kernel_stride()];
            cpu::sep_forward_plane(g, img_p, ker_n, out_p);
        });
}

/// Separable backward pass, one rayon task per batch entry.
pub fn sep_backward(
    g: &Geometry,
    cfg: &ParallelConfig,
    top_grad: &[f64],
    img: &[f64],
    ker: &[f64],
    ker_grad: &mut [f64],
) {
    let (img_stride, ker_stride) = (g.image_stride(), g.kernel_stride());
    if ker_stride == 0 {
        return;
    }
    let cached = g.kernel() <= cfg.fast_kernel_limit;
    if !cached {
        log::debug!(
            "kernel size {} exceeds fast limit {}, using direct backward",
            g.kernel(),
            cfg.fast_kernel_limit
        );
    }

    ker_grad
        .par_chunks_mut(ker_stride)
        .enumerate()
        .for_each(|(n, grad_n)| {
            let top_n = &top_grad[n * img_stride..(n + 1) * img_stride];
            let img_n = &img[n * img_stride..(n + 1) * img_stride];
            let ker_n = &ker[n * ker_stride..(n + 1) * ker_stride];
            let mut table = Vec::new();
            for y in 0..g.height() {
                for x in 0..g.width() {
                    if cached {
                        sep_backward_pixel_cached(g, top_n, img_n, ker_n, grad_n, &mut table, y, x);
                    } else {
                        cpu::sep_backward_pixel(g, top_n, img_n, ker_n, grad_n, y, x);
                    }
                }
            }
        });
}

/// Same result as [`cpu::sep_backward_pixel`], computing each channel sum once.
#[allow(clippy::too_many_arguments)]
fn sep_backward_pixel_cached(
    g: &Geometry,
    top: &[f64],
    img: &[f64],
    ker: &[f64],
    grad: &mut [f64],
    table: &mut Vec<f64>,
    y: usize,
    x: usize,
) {
    let (k, w, plane) = (g.kernel(), g.width(), g.plane());
    let rows = Window::new(y, g.padding(), k, g.height());
    let cols = Window::new(x, g.padding(), k, w);
    let pix = y * w + x;

    // table[r * cols.len + s] holds the channel sum for the r-th valid row
    // and s-th valid column of the neighborhood
    table.clear();
    for (_, i_img) in rows.iter() {
        for (_, j_img) in cols.iter() {
            table.push(cpu::channel_dot(g, top, img, pix, i_img * w + j_img));
        }
    }

    for (s, (j_ker, _)) in cols.iter().enumerate() {
        let mut v = 0.0;
        for (r, (i_ker, _)) in rows.iter().enumerate() {
            v += table[r * cols.len + s] * ker[(k + i_ker) * plane + pix];
        }
        grad[j_ker * plane + pix] = v;
    }

    for (r, (i_ker, _)) in rows.iter().enumerate() {
        let mut v = 0.0;
        for (s, (j_ker, _)) in cols.iter().enumerate() {
            v += table[r * cols.len + s] * ker[j_ker * plane + pix];
        }
        grad[(k + i_ker) * plane + pix] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::KernelLayout;

    fn filled(len: usize, seed: u64) -> Vec<f64> {
        // small deterministic LCG, enough to break symmetry
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64
            })
            .collect()
    }

    fn setup(kernel: usize) -> (Geometry, Vec<f64>, Vec<f64>, Vec<f64>) {
        let g = Geometry::validate(
            KernelLayout::Separable,
            &[2, 3, 5, 8],
            &[2, 2 * kernel, 5, 8],
        )
        .unwrap();
        let img = filled(2 * 3 * 40, 1);
        let ker = filled(2 * 2 * kernel * 40, 2);
        let top = filled(2 * 3 * 40, 3);
        (g, img, ker, top)
    }

    #[test]
    fn forward_matches_sequential_exactly() {
        let (g, img, ker, _) = setup(5);
        let mut seq = vec![0.0; img.len()];
        let mut par = vec![0.0; img.len()];
        cpu::sep_forward(&g, &img, &ker, &mut seq);
        sep_forward(&g, &img, &ker, &mut par);
        assert_eq!(seq, par);
    }

    #[test]
    fn cached_backward_matches_sequential() {
        for kernel in [1, 3, 7, 11] {
            let (g, img, ker, top) = setup(kernel);
            let mut seq = vec![0.0; ker.len()];
            let mut par = vec![0.0; ker.len()];
            cpu::sep_backward(&g, &top, &img, &ker, &mut seq);
            sep_backward(&g, &ParallelConfig::default(), &top, &img, &ker, &mut par);
            for (a, b) in seq.iter().zip(&par) {
                assert!((a - b).abs() < 1e-9, "K={kernel}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn direct_fallback_above_limit_is_exact() {
        let (g, img, ker, top) = setup(7);
        let cfg = ParallelConfig { fast_kernel_limit: 5 };
        let mut seq = vec![0.0; ker.len()];
        let mut par = vec![0.0; ker.len()];
        cpu::sep_backward(&g, &top, &img, &ker, &mut seq);
        sep_backward(&g, &cfg, &top, &img, &ker, &mut par);
        assert_eq!(seq, par);
    }
}
