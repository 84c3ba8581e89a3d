use std::fmt;

use nalgebra::DVector;

use super::{domain::Domain, objective::Objective};

/// Numerical condition that prevented an iteration from doing its best.
///
/// Stalls are not errors. The optimizer degrades gracefully and reports what
/// happened so that the caller can decide about termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stall {
    /// The inner conjugate gradient solve did not reach its tolerance within
    /// the iteration cap. The best available direction was used instead.
    ConjugateGradient,
    /// The line search exhausted all step halvings without finding a point
    /// that decreases the objective. The step was rejected.
    LineSearch,
}

impl fmt::Display for Stall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stall::ConjugateGradient => f.write_str("conjugate gradient did not converge"),
            Stall::LineSearch => f.write_str("line search failed to decrease the objective"),
        }
    }
}

/// Summary of one optimizer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Objective value in the model after the iteration.
    pub value: f64,
    /// Norm of the gradient in the model before the step.
    pub gradient_norm: f64,
    /// Norm of the projected gradient in the model before the step.
    pub projected_gradient_norm: f64,
    /// Accepted step length (zero when the step was rejected).
    pub step_length: f64,
    /// Number of inner conjugate gradient iterations.
    pub cg_iterations: usize,
    /// Number of variables held fixed at their bounds.
    pub n_binding: usize,
    /// Numerical stall encountered in this iteration, if any.
    pub stall: Option<Stall>,
}

impl Progress {
    /// Determines whether the model was changed in this iteration.
    pub fn moved(&self) -> bool {
        self.stall != Some(Stall::LineSearch) && self.step_length > 0.0
    }
}

/// Interface of an optimizer.
///
/// An optimizer is an iterative algorithm which takes a model _m_ and computes
/// the next step in the minimization process. Repeated calls to the next step
/// should eventually converge into a (local) minimum inside the domain.
///
/// ## Implementing an optimizer
///
/// Here is a projected steepest descent with a fixed step size.
///
/// ```rust
/// use geoinv::nalgebra::DVector;
/// use geoinv::{Domain, Objective, Optimizer, Progress};
///
/// struct FixedStep(f64);
///
/// impl<F: Objective + ?Sized> Optimizer<F> for FixedStep {
///     const NAME: &'static str = "Fixed step";
///     type Error = std::convert::Infallible;
///
///     fn opt_next(
///         &mut self,
///         f: &F,
///         dom: &Domain,
///         m: &mut DVector<f64>,
///     ) -> Result<Progress, Self::Error> {
///         let grad = f.gradient(m);
///         let projected = dom.projected_gradient(m, &grad);
///
///         *m -= &grad * self.0;
///         dom.project(m);
///
///         Ok(Progress {
///             value: f.apply(m),
///             gradient_norm: grad.norm(),
///             projected_gradient_norm: projected.norm(),
///             step_length: self.0,
///             cg_iterations: 0,
///             n_binding: 0,
///             stall: None,
///         })
///     }
/// }
/// ```
pub trait Optimizer<F: Objective + ?Sized> {
    /// Name of the optimizer.
    const NAME: &'static str;

    /// Error while computing the next step.
    type Error;

    /// Computes the next step in the optimization process.
    ///
    /// The value of `m` is the current model. After the method returns, `m`
    /// should hold the model after the performed step (which is always
    /// feasible in `dom`) and the returned progress _must_ carry the objective
    /// value of that model as computed by [`Objective::apply`].
    ///
    /// The implementations _can_ assume that subsequent calls to `opt_next`
    /// pass the value of `m` as was returned in the previous iteration.
    fn opt_next(
        &mut self,
        f: &F,
        dom: &Domain,
        m: &mut DVector<f64>,
    ) -> Result<Progress, Self::Error>;
}
