use briny_pac::error::{Input, ShapeError};
use briny_pac::layers::{Pac, PixelAdaptiveOp, SepPac};
use proptest::prelude::*;

fn both_layers() -> [Box<dyn PixelAdaptiveOp>; 2] {
    [Box::new(Pac::new()), Box::new(SepPac::new())]
}

fn kernel_channels(op: &dyn PixelAdaptiveOp, k: usize) -> usize {
    op.layout().kernel_channels(k)
}

#[test]
fn rank_is_checked_for_both_inputs() {
    for mut op in both_layers() {
        assert_eq!(
            op.reshape(&[1, 3, 4], &[1, 9, 3, 4]),
            Err(ShapeError::AxisCount { input: Input::Image, axes: 3 })
        );
        assert_eq!(
            op.reshape(&[1, 3, 3, 4], &[1, 9, 3, 4, 1]),
            Err(ShapeError::AxisCount { input: Input::Kernel, axes: 5 })
        );
    }
}

#[test]
fn sep_rejects_even_half() {
    let mut op = SepPac::new();
    assert_eq!(
        op.reshape(&[1, 1, 4, 4], &[1, 4, 4, 4]),
        Err(ShapeError::EvenKernel { kernel: 2 })
    );
}

proptest! {
    #[test]
    fn valid_shapes_keep_the_image_shape(
        n in 1usize..4,
        c in 1usize..5,
        h in 1usize..9,
        w in 1usize..9,
        half in 0usize..6,
    ) {
        let k = 2 * half + 1;
        for mut op in both_layers() {
            let kc = kernel_channels(op.as_ref(), k);
            let out = op.reshape(&[n, c, h, w], &[n, kc, h, w]).unwrap();
            prop_assert_eq!(out, vec![n, c, h, w]);
            let g = op.geometry().unwrap();
            prop_assert_eq!((g.kernel(), g.padding()), (k, half));
        }
    }

    #[test]
    fn non_square_dense_channels_are_rejected(channels in 1usize..200) {
        let root = channels.isqrt();
        prop_assume!(root * root != channels);
        let mut op = Pac::new();
        prop_assert_eq!(
            op.reshape(&[1, 1, 2, 2], &[1, channels, 2, 2]),
            Err(ShapeError::NotSquare { channels })
        );
    }

    #[test]
    fn odd_separable_channels_are_rejected(half in 0usize..50) {
        let channels = 2 * half + 1;
        let mut op = SepPac::new();
        prop_assert_eq!(
            op.reshape(&[1, 1, 2, 2], &[1, channels, 2, 2]),
            Err(ShapeError::OddChannels { channels })
        );
    }

    #[test]
    fn disagreeing_extents_are_rejected(
        n in 1usize..4,
        h in 1usize..9,
        w in 1usize..9,
        dn in 1usize..3,
        dh in 1usize..3,
        dw in 1usize..3,
    ) {
        for mut op in both_layers() {
            let kc = kernel_channels(op.as_ref(), 3);
            prop_assert_eq!(
                op.reshape(&[n, 2, h, w], &[n + dn, kc, h, w]),
                Err(ShapeError::BatchMismatch { image: n, kernel: n + dn })
            );
            prop_assert_eq!(
                op.reshape(&[n, 2, h, w], &[n, kc, h + dh, w]),
                Err(ShapeError::HeightMismatch { image: h, kernel: h + dh })
            );
            prop_assert_eq!(
                op.reshape(&[n, 2, h, w], &[n, kc, h, w + dw]),
                Err(ShapeError::WidthMismatch { image: w, kernel: w + dw })
            );
            prop_assert!(op.geometry().is_none());
        }
    }
}
