//! Projected Gauss-Newton method with conjugate gradient inner solves.
//!
//! Minimizes an objective subject to box constraints. A model outside of the
//! domain is first projected onto the bounds. Each iteration then
//!
//! 1. evaluates the value and gradient in the current model,
//! 2. determines the variables that are held at their bounds (the gradient
//!    pushes them outside of the domain),
//! 3. approximately solves the Newton system `H p = -g` on the remaining free
//!    variables by a few [conjugate gradient](super::conjugate_gradient)
//!    iterations, using only Hessian-vector products,
//! 4. searches along `p` with projection onto the domain, halving the step
//!    until the Armijo condition holds on the projected point.
//!
//! If the inner solve does not produce a descent direction, the projected
//! steepest descent direction is used instead. If no step length decreases the
//! objective, the model is left unchanged and a [`Stall::LineSearch`] is
//! reported.
//!
//! # References
//!
//! \[1\] [Numerical
//! Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)
//!
//! \[2\] [Projected Newton Methods for Optimization Problems with Simple
//! Constraints](https://epubs.siam.org/doi/10.1137/0320018)

use std::collections::VecDeque;

use getset::{CopyGetters, Setters};
use log::{debug, warn};
use nalgebra::DVector;

use super::conjugate_gradient::ConjugateGradient;
use crate::core::{Domain, Objective, Optimizer, ProblemError, Progress, Stall};

/// Options for [`ProjectedGncg`] optimizer.
///
/// None of the defaults is critical for correctness. They trade the cost of
/// an iteration for its quality and can be tuned freely.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct ProjectedGncgOptions {
    /// Maximum number of conjugate gradient iterations per Newton step.
    /// Default: `5`.
    max_iter_cg: usize,
    /// Relative residual at which the conjugate gradient stops. Default:
    /// `0.1`.
    tol_cg: f64,
    /// Maximum number of step length reductions in the line search. Default:
    /// `10`.
    max_iter_ls: usize,
    /// Sufficient decrease constant of the Armijo condition. Default: `1e-4`.
    ls_reduction: f64,
    /// Factor by which the step length is reduced. Default: `0.5`.
    ls_shorten: f64,
    /// Number of most recent models kept in the history. Zero disables the
    /// history. Default: `0`.
    remember: usize,
}

impl Default for ProjectedGncgOptions {
    fn default() -> Self {
        Self {
            max_iter_cg: 5,
            tol_cg: 1e-1,
            max_iter_ls: 10,
            ls_reduction: 1e-4,
            ls_shorten: 0.5,
            remember: 0,
        }
    }
}

/// Projected Gauss-Newton optimizer.
///
/// See [module](self) documentation for more details.
#[derive(Debug, Clone)]
pub struct ProjectedGncg {
    options: ProjectedGncgOptions,
    history: VecDeque<DVector<f64>>,
    iter: usize,
}

impl ProjectedGncg {
    /// Initializes the optimizer with default options.
    pub fn new(dom: &Domain) -> Self {
        Self::with_options(dom, ProjectedGncgOptions::default())
    }

    /// Initializes the optimizer with given options.
    pub fn with_options(_dom: &Domain, options: ProjectedGncgOptions) -> Self {
        Self {
            history: VecDeque::with_capacity(options.remember),
            options,
            iter: 0,
        }
    }

    /// Models after the most recent iterations, oldest first.
    pub fn history(&self) -> &VecDeque<DVector<f64>> {
        &self.history
    }

    /// Options of the optimizer.
    pub fn options(&self) -> &ProjectedGncgOptions {
        &self.options
    }

    /// Resets the internal state of the optimizer.
    pub fn reset(&mut self) {
        self.history.clear();
        self.iter = 0;
    }

    fn remember(&mut self, m: &DVector<f64>) {
        if self.options.remember == 0 {
            return;
        }

        if self.history.len() == self.options.remember {
            self.history.pop_front();
        }

        self.history.push_back(m.clone());
    }
}

impl<F: Objective + ?Sized> Optimizer<F> for ProjectedGncg {
    const NAME: &'static str = "Projected GNCG";

    type Error = ProblemError;

    fn opt_next(
        &mut self,
        f: &F,
        dom: &Domain,
        m: &mut DVector<f64>,
    ) -> Result<Progress, Self::Error> {
        let ProjectedGncgOptions {
            max_iter_cg,
            tol_cg,
            max_iter_ls,
            ls_reduction,
            ls_shorten,
            ..
        } = self.options;

        for actual in [f.dim(), dom.dim()] {
            if actual != m.len() {
                return Err(ProblemError::InvalidDimensionality {
                    expected: actual,
                    actual: m.len(),
                });
            }
        }

        self.iter += 1;

        if dom.project(m) {
            debug!("model outside of the domain, projected onto the bounds");
        }

        let value = f.apply(m);
        if !value.is_finite() {
            return Err(ProblemError::InvalidValue);
        }

        let grad = f.gradient(m);
        let projected = dom.projected_gradient(m, &grad);
        let free: Vec<bool> = dom.binding_set(m, &grad).into_iter().map(|b| !b).collect();
        let n_binding = free.iter().filter(|&&is_free| !is_free).count();

        debug!(
            "iteration {}: f = {}, |g| = {}, |pg| = {}, {} variables at bounds",
            self.iter,
            value,
            grad.norm(),
            projected.norm(),
            n_binding
        );

        // Newton direction on the free variables.
        let rhs = -&grad;
        let cg = ConjugateGradient::new(max_iter_cg, tol_cg).solve(|v| f.hessian_product(m, v), &rhs, &free);
        let mut stall = None;
        let mut direction = cg.x;

        if !cg.converged {
            debug!(
                "CG stopped after {} iterations with relative residual {}",
                cg.iterations, cg.relative_residual
            );
            stall = Some(Stall::ConjugateGradient);
        }

        let mut slope = grad.dot(&direction);
        if !(slope < 0.0) {
            // Not a descent direction, fall back to the steepest descent on the
            // free variables.
            direction = rhs;
            for (d, &is_free) in direction.iter_mut().zip(&free) {
                if !is_free {
                    *d = 0.0;
                }
            }

            slope = grad.dot(&direction);
            debug!("Newton direction is not a descent direction, take steepest descent");
        }

        let progress = |value: f64, step_length: f64, stall: Option<Stall>| Progress {
            value,
            gradient_norm: grad.norm(),
            projected_gradient_norm: projected.norm(),
            step_length,
            cg_iterations: cg.iterations,
            n_binding,
            stall,
        };

        if direction.norm() == 0.0 || slope == 0.0 {
            debug!("zero search direction, the model is stationary");
            self.remember(m);
            return Ok(progress(value, 0.0, stall));
        }

        // Projected backtracking line search.
        let mut alpha = 1.0;
        let mut best: Option<(f64, f64, DVector<f64>)> = None;
        let mut accepted = None;

        for _ in 0..max_iter_ls {
            let mut trial = &*m + &direction * alpha;
            dom.project(&mut trial);

            let trial_value = f.apply(&trial);
            let decrease = ls_reduction * grad.dot(&(&trial - &*m));

            debug!("line search: alpha = {}, f = {}", alpha, trial_value);

            if trial_value < value + decrease {
                accepted = Some((alpha, trial_value, trial));
                break;
            }

            let improves_best = match &best {
                Some((_, best_value, _)) => trial_value < *best_value,
                None => trial_value.is_finite(),
            };

            if improves_best {
                best = Some((alpha, trial_value, trial));
            }

            alpha *= ls_shorten;
        }

        let accepted = accepted.or_else(|| {
            best.filter(|(_, best_value, _)| *best_value < value)
                .map(|best| {
                    debug!("Armijo condition not satisfied, take the best trial point");
                    best
                })
        });

        match accepted {
            Some((alpha, trial_value, trial)) => {
                *m = trial;
                self.remember(m);
                Ok(progress(trial_value, alpha, stall))
            }
            None => {
                warn!(
                    "line search failed to decrease the objective after {} reductions",
                    max_iter_ls
                );
                Ok(progress(value, 0.0, Some(Stall::LineSearch)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;

    use crate::constraint::Volume;
    use crate::testing::{optimize, SumTarget, WeightedSphere};

    #[test]
    fn sum_target_in_one_newton_step() {
        let f = SumTarget::new(4, 10.0);
        let dom = Domain::unconstrained(4);
        let mut optimizer = ProjectedGncg::new(&dom);
        let mut m = DVector::zeros(4);

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        assert_abs_diff_eq!(m.sum(), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(progress.value, 0.0, epsilon = 1e-12);
        assert_eq!(progress.step_length, 1.0);
        assert_eq!(progress.stall, None);
    }

    #[test]
    fn bounds_are_respected() {
        let f = SumTarget::new(3, 10.0);
        let dom = Domain::uniform(3, 0.0, 1.0).unwrap();
        let mut optimizer = ProjectedGncg::new(&dom);
        let mut m = DVector::from_element(3, 0.5);
        let mut last = f.apply(&m);

        for _ in 0..5 {
            let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();
            assert!(dom.is_feasible(&m));
            assert!(progress.value <= last + 1e-12);
            last = progress.value;
        }

        assert_abs_diff_eq!(m, DVector::from_element(3, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn binding_variables_are_held() {
        // Minimum of the sphere is in the origin, the bound holds the first
        // variable at 1.
        let f = WeightedSphere::new(dvector![1.0, 2.0]);
        let dom = Domain::rect(vec![1.0, -5.0], vec![5.0, 5.0]).unwrap();
        let mut optimizer = ProjectedGncg::new(&dom);
        let mut m = dvector![1.0, 3.0];

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        assert_eq!(progress.n_binding, 1);
        assert_abs_diff_eq!(m, dvector![1.0, 0.0], epsilon = 1e-12);
    }

    #[test]
    fn history_is_bounded() {
        let f = WeightedSphere::new(dvector![1.0, 10.0, 100.0]);
        let dom = Domain::unconstrained(3);
        let mut options = ProjectedGncgOptions::default();
        options.set_remember(2).set_max_iter_cg(1);
        let mut optimizer = ProjectedGncg::with_options(&dom, options);

        let m = optimize(&f, &dom, &mut optimizer, dvector![1.0, 1.0, 1.0], 4).unwrap();

        assert_eq!(optimizer.history().len(), 2);
        assert_eq!(optimizer.history().back(), Some(&m));
    }

    #[test]
    fn cg_cap_is_reported_as_stall() {
        let f = WeightedSphere::new(dvector![1.0, 10.0, 100.0]);
        let dom = Domain::unconstrained(3);
        let mut options = ProjectedGncgOptions::default();
        options.set_max_iter_cg(1).set_tol_cg(1e-12);
        let mut optimizer = ProjectedGncg::with_options(&dom, options);
        let mut m = dvector![1.0, 1.0, 1.0];
        let before = f.apply(&m);

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        assert_eq!(progress.stall, Some(Stall::ConjugateGradient));
        assert_eq!(progress.cg_iterations, 1);
        assert!(progress.value < before);
    }

    #[test]
    fn stationary_model_is_not_moved() {
        let f = WeightedSphere::new(dvector![1.0, 1.0]);
        let dom = Domain::unconstrained(2);
        let mut optimizer = ProjectedGncg::new(&dom);
        let mut m = dvector![0.0, 0.0];

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        assert_eq!(progress.step_length, 0.0);
        assert_eq!(progress.stall, None);
        assert!(!progress.moved());
    }

    #[test]
    fn infeasible_model_is_projected() {
        // 0.5 (m + 2)^2 has its minimum below the lower bound.
        let f = SumTarget::new(1, -2.0);
        let dom = Domain::uniform(1, 0.0, 1.0).unwrap();
        let mut optimizer = ProjectedGncg::new(&dom);
        let mut m = dvector![-1.0];

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        assert!(dom.is_feasible(&m));
        assert_eq!(m, dvector![0.0]);
        assert_eq!(progress.n_binding, 1);
        assert_abs_diff_eq!(progress.value, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(progress.projected_gradient_norm, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn failed_line_search_keeps_model() {
        // The gradient points away from the minimum, no step decreases the
        // objective.
        let f = Volume::new(dvector![1.0, 1.0], 2.0).unwrap();
        let dom = Domain::unconstrained(2);
        let mut optimizer = ProjectedGncg::new(&dom);
        let mut m = dvector![0.0, 0.0];

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        assert_eq!(progress.stall, Some(Stall::LineSearch));
        assert_eq!(progress.step_length, 0.0);
        assert_abs_diff_eq!(progress.value, 2.0, epsilon = 1e-12);
        assert_eq!(m, dvector![0.0, 0.0]);
        assert!(!progress.moved());
    }

    #[test]
    fn best_trial_taken_without_sufficient_decrease() {
        let f = WeightedSphere::new(dvector![1.0]);
        let dom = Domain::unconstrained(1);
        let mut options = ProjectedGncgOptions::default();
        options.set_ls_reduction(0.9).set_max_iter_ls(3);
        let mut optimizer = ProjectedGncg::with_options(&dom, options);
        let mut m = dvector![1.0];

        let progress = optimizer.opt_next(&f, &dom, &mut m).unwrap();

        // Full Newton step reaches the minimum but misses the required
        // decrease of 0.9, it is still the best trial.
        assert_eq!(progress.stall, None);
        assert_eq!(progress.step_length, 1.0);
        assert_abs_diff_eq!(progress.value, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m, dvector![0.0], epsilon = 1e-12);
    }

    #[test]
    fn reset_clears_history() {
        let f = WeightedSphere::new(dvector![1.0, 10.0]);
        let dom = Domain::unconstrained(2);
        let mut options = ProjectedGncgOptions::default();
        options.set_remember(3).set_max_iter_cg(1);
        let mut optimizer = ProjectedGncg::with_options(&dom, options);

        optimize(&f, &dom, &mut optimizer, dvector![1.0, 1.0], 2).unwrap();
        assert!(!optimizer.history().is_empty());

        optimizer.reset();
        assert!(optimizer.history().is_empty());

        let m = optimize(&f, &dom, &mut optimizer, dvector![-1.0, 2.0], 1).unwrap();
        assert_eq!(optimizer.history().len(), 1);
        assert_eq!(optimizer.history().back(), Some(&m));
    }

    #[test]
    fn invalid_dimension() {
        let f = WeightedSphere::new(dvector![1.0, 1.0]);
        let dom = Domain::unconstrained(2);
        let mut optimizer = ProjectedGncg::new(&dom);

        assert_eq!(
            optimizer.opt_next(&f, &dom, &mut dvector![1.0]),
            Err(ProblemError::InvalidDimensionality {
                expected: 2,
                actual: 1
            })
        );
    }
}
