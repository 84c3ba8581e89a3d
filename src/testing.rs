//! Testing objectives and utilities useful for benchmarking, debugging and
//! smoke testing.
//!
//! [`SumTarget`] and [`WeightedSphere`] have known minimizers and exact
//! Hessians, which makes them suitable for checking optimizers. The
//! [`toy_simulation`] is a tiny linear forward problem with a matching survey.

#![allow(unused)]

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rand::Rng;

use crate::core::{Domain, Objective, Optimizer};
use crate::simulation::LinearSimulation;
use crate::survey::{Receiver, Source, Survey};

/// Squared distance of the sum of all parameters from a target value.
///
/// `f(m) = 0.5 (Σ mᵢ - t)²`. The Hessian is the rank-one matrix of ones, so
/// the minimizer is not unique. A single Newton step from any model reaches
/// the minimum.
#[derive(Debug, Clone)]
pub struct SumTarget {
    n: usize,
    target: f64,
}

impl SumTarget {
    /// Initializes the objective with given dimension and target.
    pub fn new(n: usize, target: f64) -> Self {
        assert!(n > 0, "n must be greater than zero");
        Self { n, target }
    }
}

impl Objective for SumTarget {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        0.5 * (m.sum() - self.target).powi(2)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(self.n, m.sum() - self.target)
    }

    fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(self.n, v.sum())
    }
}

/// Paraboloid with diagonal weights, `f(m) = 0.5 Σ dᵢ mᵢ²`.
///
/// With positive weights the minimum is in the origin. Spread weights give an
/// ill-conditioned Hessian.
#[derive(Debug, Clone)]
pub struct WeightedSphere {
    weights: DVector<f64>,
}

impl WeightedSphere {
    /// Initializes the objective with given diagonal weights.
    pub fn new(weights: DVector<f64>) -> Self {
        assert!(!weights.is_empty(), "weights must not be empty");
        Self { weights }
    }
}

impl Objective for WeightedSphere {
    fn dim(&self) -> usize {
        self.weights.len()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        0.5 * m.component_mul(m).dot(&self.weights)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        m.component_mul(&self.weights)
    }

    fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        v.component_mul(&self.weights)
    }
}

/// Random vector with entries uniformly distributed in `[-1, 1]`.
pub fn random_vector<R: Rng + ?Sized>(n: usize, rng: &mut R) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.gen_range(-1.0..=1.0))
}

/// Linear forward problem with 2 parameters and 3 data, together with a
/// survey of one source and one receiver at 3 locations.
///
/// The operator is
///
/// ```text
/// | 1 2 |
/// | 2 1 |
/// | 1 1 |
/// ```
pub fn toy_simulation() -> (LinearSimulation, Survey) {
    let dense = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 1.0, 1.0, 1.0]);
    let g = CsrMatrix::from(&CooMatrix::from(&dense));

    let locations = DMatrix::from_row_slice(3, 1, &[0.25, 0.5, 0.75]);
    let receiver = Receiver::new(locations).expect("locations are not empty");
    let source = Source::new(vec![0.0], vec![Arc::new(receiver)]).expect("single receiver");
    let survey = Survey::new(vec![source]).expect("single source");

    (LinearSimulation::new(g), survey)
}

/// Runs the optimizer for at most `max_iter` iterations or until it stops
/// moving the model. Returns the final model.
pub fn optimize<F, O>(
    f: &F,
    dom: &Domain,
    optimizer: &mut O,
    mut m: DVector<f64>,
    max_iter: usize,
) -> Result<DVector<f64>, O::Error>
where
    F: Objective + ?Sized,
    O: Optimizer<F>,
{
    for _ in 0..max_iter {
        let progress = optimizer.opt_next(f, dom, &mut m)?;

        if !progress.moved() {
            break;
        }
    }

    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::derivatives::finite_difference_gradient;
    use crate::simulation::Simulation;

    #[test]
    fn test_objectives_have_consistent_gradients() {
        let mut rng = StdRng::seed_from_u64(42);
        let sum = SumTarget::new(3, 2.0);
        let sphere = WeightedSphere::new(dvector![1.0, 3.0, 0.5]);

        for _ in 0..3 {
            let m = random_vector(3, &mut rng);
            assert_abs_diff_eq!(sum.gradient(&m), finite_difference_gradient(&sum, &m), epsilon = 1e-6);
            assert_abs_diff_eq!(sphere.gradient(&m), finite_difference_gradient(&sphere, &m), epsilon = 1e-6);
        }
    }

    #[test]
    fn random_vector_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let v = random_vector(100, &mut rng);

        assert!(v.iter().all(|vi| (-1.0..=1.0).contains(vi)));
    }

    #[test]
    fn toy_survey_matches_simulation() {
        let (sim, survey) = toy_simulation();

        assert_eq!(survey.n_data(), sim.n_data());
        assert_eq!(sim.predict(&dvector![1.0, 0.0]), dvector![1.0, 2.0, 1.0]);
    }
}
