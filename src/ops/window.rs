//! Valid neighborhood offsets along one image axis.
//!
//! For an output coordinate `pos` the kernel offset `k` in `[0, K)` reads the
//! image at `pos - P + k`. Offsets landing outside `[0, extent)` would read the
//! implicit zero padding, so they are skipped altogether: the range starts at
//! `k = max(P - pos, 0)` and stops as soon as either `k` reaches `K` or the
//! image coordinate reaches `extent`.
//!
//! Every forward and backward loop nest in [`crate::ops`] walks its
//! neighborhoods through this type.

/// Paired start of the kernel and image coordinates plus the number of valid steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First valid kernel offset.
    pub ker: usize,
    /// Image coordinate read by `ker`.
    pub img: usize,
    /// Number of valid offsets, advancing both coordinates together.
    pub len: usize,
}

impl Window {
    /// Window of a `kernel`-wide neighborhood centred on `pos` along an axis of `extent` pixels.
    ///
    /// `pos` must lie inside `[0, extent)` and `padding` must be `(kernel - 1) / 2`.
    #[inline]
    pub fn new(pos: usize, padding: usize, kernel: usize, extent: usize) -> Self {
        let ker = padding.saturating_sub(pos);
        let img = pos + ker - padding;
        let len = (kernel - ker).min(extent - img);
        Self { ker, img, len }
    }

    /// `(kernel offset, image coordinate)` pairs in increasing order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        (self.ker..self.ker + self.len).zip(self.img..self.img + self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(pos: usize, kernel: usize, extent: usize) -> Vec<(usize, usize)> {
        let padding = (kernel - 1) / 2;
        (0..kernel)
            .filter_map(|k| {
                let img = pos as isize - padding as isize + k as isize;
                (img >= 0 && (img as usize) < extent).then_some((k, img as usize))
            })
            .collect()
    }

    #[test]
    fn interior_pixel_sees_whole_kernel() {
        let w = Window::new(4, 1, 3, 10);
        assert_eq!(w, Window { ker: 0, img: 3, len: 3 });
    }

    #[test]
    fn leading_edge_skips_padding() {
        let w = Window::new(0, 2, 5, 10);
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![(2, 0), (3, 1), (4, 2)]);
    }

    #[test]
    fn trailing_edge_stops_at_extent() {
        let w = Window::new(9, 2, 5, 10);
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![(0, 7), (1, 8), (2, 9)]);
    }

    #[test]
    fn kernel_wider_than_image_is_clipped_both_sides() {
        let w = Window::new(1, 12, 25, 3);
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![(11, 0), (12, 1), (13, 2)]);
    }

    #[test]
    fn matches_explicit_bounds_checks() {
        for kernel in [1, 3, 5, 7, 11, 25] {
            for extent in 1..12 {
                for pos in 0..extent {
                    let padding = (kernel - 1) / 2;
                    let got: Vec<_> = Window::new(pos, padding, kernel, extent).iter().collect();
                    let want = brute_force(pos, kernel, extent);
                    assert_eq!(got, want, "K={kernel} extent={extent} pos={pos}");
                }
            }
        }
    }
}
