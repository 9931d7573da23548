#![allow(dead_code)]

use briny_pac::backend::Backend;
use briny_pac::layers::PixelAdaptiveOp;
use briny_pac::tensors::{Ten64, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Perturbation used for central differences.
pub const STEPSIZE: f64 = 1e-2;

/// Allowed disagreement, scaled by `max(|a|, |b|, 1)`.
pub const THRESHOLD: f64 = 1e-3;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Uniform `[0, 1)` filler.
pub fn uniform(shape: &[usize], seed: u64) -> Ten64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let len: usize = shape.iter().product();
    Tensor::new(shape.to_vec(), (0..len).map(|_| rng.random::<f64>()).collect())
}

pub fn assert_close(actual: &Ten64, expected: &Ten64, tol: f64) {
    assert_eq!(actual.shape, expected.shape);
    for (i, (a, e)) in actual.data.iter().zip(&expected.data).enumerate() {
        assert!((a - e).abs() <= tol, "element {i}: {a} vs {e}");
    }
}

/// Weighted sum of the forward output, the scalar loss the checks differentiate.
fn loss(op: &dyn PixelAdaptiveOp, image: &Ten64, kernel: &Ten64, top: &Ten64) -> f64 {
    let out = op.forward_on(Backend::Cpu, image, kernel).unwrap();
    out.data.iter().zip(&top.data).map(|(o, t)| o * t).sum()
}

/// Compares the analytic kernel gradient of `op` against central differences
/// at every element of the kernel tensor.
///
/// `op` must already be reshaped for `image` and `kernel`.
pub fn check_kernel_gradient(op: &dyn PixelAdaptiveOp, image: &Ten64, kernel: &Ten64, seed: u64) {
    let top = uniform(&image.shape, seed);
    let analytic = op
        .backward_on(Backend::Cpu, &top, image, kernel)
        .unwrap()
        .kernel;
    assert_eq!(analytic.shape, kernel.shape);

    let mut perturbed = kernel.clone();
    for idx in 0..kernel.len() {
        let orig = perturbed.data[idx];
        perturbed.data[idx] = orig + STEPSIZE;
        let plus = loss(op, image, &perturbed, &top);
        perturbed.data[idx] = orig - STEPSIZE;
        let minus = loss(op, image, &perturbed, &top);
        perturbed.data[idx] = orig;

        let estimated = (plus - minus) / (2.0 * STEPSIZE);
        let computed = analytic.data[idx];
        let scale = computed.abs().max(estimated.abs()).max(1.0);
        assert!(
            (computed - estimated).abs() <= THRESHOLD * scale,
            "{} kernel gradient at {idx}: analytic {computed}, numeric {estimated}",
            op.type_name()
        );
    }
}
