//! Tools for verifying derivatives.
//!
//! Analytic gradients and Hessian products of objective terms are easy to get
//! wrong. [`Gradient`] and [`HessianProduct`] approximate them by finite
//! differences and [`check_derivative`] verifies the convergence order of the
//! Taylor expansion.

use std::ops::Deref;

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::Objective;

/// Square root of double precision machine epsilon. This value is a standard
/// constant for epsilons in approximating first-order derivate-based concepts.
pub const EPSILON_SQRT: f64 = 0.000000014901161193847656;

/// Cubic root of double precision machine epsilon. This value is a standard
/// constant for epsilons in approximating second-order derivate-based concepts.
pub const EPSILON_CBRT: f64 = 0.0000060554544523933395;

fn step_size(xi: f64, scale: f64, eps: f64) -> f64 {
    // We would like to have the step as small as possible (to be as close to
    // the real derivative as possible). But at the same time, very small step
    // could cause f(x + e_i * step_i) ~= f(x) with very small number of good
    // digits.
    //
    // A reasonable way to balance these competing needs is to scale each
    // component by x_i itself. To avoid problems when x_i is close to zero,
    // it is modified to take the typical magnitude instead.
    let magnitude = 1.0 / scale;
    let step = eps * xi.abs().max(magnitude) * 1f64.copysign(xi);
    if step == 0.0 {
        eps
    } else {
        step
    }
}

/// Gradient vector of an objective approximated by central differences.
#[derive(Debug)]
pub struct Gradient {
    grad: DVector<f64>,
}

impl Gradient {
    /// Initializes the gradient with zeros.
    pub fn zeros<F: Objective + ?Sized>(f: &F) -> Self {
        Self {
            grad: DVector::zeros(f.dim()),
        }
    }

    /// Computes the gradient of the objective in given model with given scale
    /// of variables. See [`compute`](Gradient::compute) for more details.
    pub fn new<F: Objective + ?Sized>(f: &F, m: &mut DVector<f64>, scale: &DVector<f64>) -> Self {
        let mut grad = Self::zeros(f);
        grad.compute(f, m, scale);
        grad
    }

    /// Computes the gradient of the objective in given model with given scale
    /// of variables.
    ///
    /// The parameter `m` is mutable to allow temporary mutations avoiding
    /// unnecessary allocations, but after this method ends, the content of the
    /// vector is exactly the same as before.
    ///
    /// Information about variable scale is useful for problematic cases of
    /// finite differentiation (e.g., when the value is near zero).
    pub fn compute<F: Objective + ?Sized>(
        &mut self,
        f: &F,
        m: &mut DVector<f64>,
        scale: &DVector<f64>,
    ) -> &mut Self {
        for i in 0..f.dim() {
            let mi = m[i];
            let step = step_size(mi, scale[i], EPSILON_CBRT);

            m[i] = mi + step;
            let forward = f.apply(m);
            m[i] = mi - step;
            let backward = f.apply(m);

            self.grad[i] = (forward - backward) / (2.0 * step);

            m[i] = mi;
        }

        self
    }
}

impl Deref for Gradient {
    type Target = DVector<f64>;

    fn deref(&self) -> &Self::Target {
        &self.grad
    }
}

/// Approximates the gradient of the objective in given model by central
/// differences with unit scale of variables.
pub fn finite_difference_gradient<F: Objective + ?Sized>(f: &F, m: &DVector<f64>) -> DVector<f64> {
    let mut m = m.clone();
    let scale = DVector::from_element(m.len(), 1.0);
    Gradient::new(f, &mut m, &scale).grad
}

/// Hessian-vector product approximated by central differences of the
/// analytic gradient.
#[derive(Debug)]
pub struct HessianProduct {
    product: DVector<f64>,
}

impl HessianProduct {
    /// Computes `H(m) v` as `(g(m + h v) - g(m - h v)) / 2h`.
    pub fn new<F: Objective + ?Sized>(f: &F, m: &DVector<f64>, v: &DVector<f64>) -> Self {
        let norm = v.norm();

        if norm == 0.0 {
            return Self {
                product: DVector::zeros(m.len()),
            };
        }

        let h = EPSILON_CBRT * m.norm().max(1.0) / norm;
        let forward = f.gradient(&(m + v * h));
        let backward = f.gradient(&(m - v * h));

        Self {
            product: (forward - backward) / (2.0 * h),
        }
    }
}

impl Deref for HessianProduct {
    type Target = DVector<f64>;

    fn deref(&self) -> &Self::Target {
        &self.product
    }
}

/// Options for [`check_derivative`].
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct DerivativeCheckOptions {
    /// Number of step sizes. Default: `7`.
    num: usize,
    /// Largest step size. Subsequent steps are ten times smaller. Default:
    /// `0.1`.
    initial_step: f64,
    /// Expected order of the first-order Taylor remainder. Default: `2`.
    expected_order: f64,
    /// Fraction of the expected order an observed order must reach. Default:
    /// `0.85`.
    tolerance: f64,
}

impl Default for DerivativeCheckOptions {
    fn default() -> Self {
        Self {
            num: 7,
            initial_step: 0.1,
            expected_order: 2.0,
            tolerance: 0.85,
        }
    }
}

/// Result of [`check_derivative`].
#[derive(Debug, Clone)]
pub struct DerivativeCheck {
    /// Step sizes.
    pub steps: Vec<f64>,
    /// Zeroth-order remainders `|f(m + h dm) - f(m)|`.
    pub zeroth: Vec<f64>,
    /// First-order remainders `|f(m + h dm) - f(m) - h g(m) · dm|`.
    pub first: Vec<f64>,
    /// Observed orders between consecutive first-order remainders.
    pub orders: Vec<f64>,
    /// Whether the gradient passed the check.
    pub passed: bool,
}

/// Verifies the gradient of the objective along direction `dm`.
///
/// If the gradient is correct, the first-order Taylor remainder decreases
/// quadratically with the step size. The check passes when at least half of
/// the observed orders reach `tolerance * expected_order`, or when the
/// remainder is at the rounding level for all steps (the objective is linear
/// along `dm`).
pub fn check_derivative<F: Objective + ?Sized>(
    f: &F,
    m: &DVector<f64>,
    dm: &DVector<f64>,
    options: &DerivativeCheckOptions,
) -> DerivativeCheck {
    let f0 = f.apply(m);
    let slope = f.gradient(m).dot(dm);

    let mut steps = Vec::with_capacity(options.num);
    let mut zeroth = Vec::with_capacity(options.num);
    let mut first = Vec::with_capacity(options.num);

    let mut h = options.initial_step;
    for _ in 0..options.num {
        let ft = f.apply(&(m + dm * h));
        steps.push(h);
        zeroth.push((ft - f0).abs());
        first.push((ft - f0 - h * slope).abs());
        h /= 10.0;
    }

    let orders: Vec<_> = first
        .windows(2)
        .zip(steps.windows(2))
        .map(|(e, s)| (e[0] / e[1]).log10() / (s[0] / s[1]).log10())
        .collect();

    for (i, h) in steps.iter().enumerate() {
        let order = if i > 0 { orders[i - 1] } else { f64::NAN };
        debug!(
            "h = {:.3e}, |f(m + h dm) - f(m)| = {:.3e}, |f(m + h dm) - f(m) - h g dm| = {:.3e}, order = {:.3}",
            h, zeroth[i], first[i], order
        );
    }

    let rounding = 1e3 * f64::EPSILON * f0.abs().max(1.0);
    let exact = first.iter().all(|&e| e <= rounding);
    let good = orders
        .iter()
        .filter(|&&o| o > options.tolerance * options.expected_order)
        .count();
    let passed = exact || 2 * good >= orders.len();

    debug!("derivative check {}", if passed { "passed" } else { "failed" });

    DerivativeCheck {
        steps,
        zeroth,
        first,
        orders,
        passed,
    }
}
