//! High-level API for running an inversion.
//!
//! The [`Inversion`] driver minimizes the objective
//!
//! ```text
//! Φ(m) = φ_d(m) + β φ_m(m)
//! ```
//!
//! where `φ_d` is the data misfit (possibly combined with constraints into a
//! [`Composite`](crate::composite::Composite)), `φ_m` is the regularization
//! and `β` is the trade-off parameter. It owns the optimizer, calls
//! [directives](crate::directives) after each iteration and decides when to
//! stop.
//!
//! The simplest way of using the driver is to initialize it with the defaults:
//!
//! ```rust
//! use geoinv::driver::Inversion;
//! # use geoinv::nalgebra::DVector;
//! # use geoinv::Objective;
//! #
//! # struct Quadratic(DVector<f64>);
//! #
//! # impl Objective for Quadratic {
//! #     fn dim(&self) -> usize {
//! #         self.0.len()
//! #     }
//! #
//! #     fn apply(&self, m: &DVector<f64>) -> f64 {
//! #         0.5 * (m - &self.0).norm_squared()
//! #     }
//! #
//! #     fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
//! #         m - &self.0
//! #     }
//! #
//! #     fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
//! #         v.clone()
//! #     }
//! # }
//!
//! let dmis = Quadratic(DVector::from_vec(vec![1.0, 2.0]));
//! let reg = Quadratic(DVector::zeros(2));
//!
//! let mut inversion = Inversion::new(&dmis, &reg).expect("valid setup");
//! let result = inversion.run(DVector::zeros(2)).expect("no optimizer error");
//!
//! // With beta = 1 the minimum is halfway between both terms.
//! assert!((result.model[1] - 1.0).abs() < 1e-6);
//! ```
//!
//! If you need to specify additional settings, use the builder:
//!
//! ```rust
//! use geoinv::algo::ProjectedGncg;
//! use geoinv::directives::{BetaSchedule, TargetMisfit};
//! use geoinv::driver::Inversion;
//! use geoinv::Domain;
//! # use geoinv::nalgebra::DVector;
//! # use geoinv::Objective;
//! #
//! # struct Quadratic(DVector<f64>);
//! #
//! # impl Objective for Quadratic {
//! #     fn dim(&self) -> usize {
//! #         self.0.len()
//! #     }
//! #
//! #     fn apply(&self, m: &DVector<f64>) -> f64 {
//! #         0.5 * (m - &self.0).norm_squared()
//! #     }
//! #
//! #     fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
//! #         m - &self.0
//! #     }
//! #
//! #     fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
//! #         v.clone()
//! #     }
//! # }
//! #
//! # let dmis = Quadratic(DVector::from_vec(vec![1.0, 2.0]));
//! # let reg = Quadratic(DVector::zeros(2));
//!
//! let mut inversion = Inversion::builder(&dmis, &reg)
//!     .with_beta(10.0)
//!     .with_domain(Domain::uniform(2, 0.0, 1.5).expect("valid bounds"))
//!     .with_algo(ProjectedGncg::new)
//!     .with_directive(BetaSchedule::default())
//!     .with_directive(TargetMisfit::new(2))
//!     .build()
//!     .expect("valid setup");
//!
//! let result = inversion.run(DVector::zeros(2)).expect("no optimizer error");
//! println!("{} after {} iterations", result.termination, result.iterations);
//! ```

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use getset::{CopyGetters, Setters};
use log::{debug, info};
use nalgebra::DVector;
use thiserror::Error;

use crate::algo::ProjectedGncg;
use crate::core::{ConfigurationError, Domain, Objective, Optimizer, Stall};
use crate::directives::{Directive, InversionState};

/// The objective `φ_d + β φ_m` minimized in one iteration of the inversion.
#[derive(Debug)]
pub struct InverseProblem<'a, D, R> {
    data_misfit: &'a D,
    regularization: &'a R,
    beta: f64,
}

impl<'a, D: Objective, R: Objective> InverseProblem<'a, D, R> {
    /// Combines the data misfit and the regularization with given trade-off
    /// parameter.
    pub fn new(data_misfit: &'a D, regularization: &'a R, beta: f64) -> Self {
        Self {
            data_misfit,
            regularization,
            beta,
        }
    }

    /// The trade-off parameter.
    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl<'a, D: Objective, R: Objective> Objective for InverseProblem<'a, D, R> {
    fn dim(&self) -> usize {
        self.data_misfit.dim()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        self.data_misfit.apply(m) + self.beta * self.regularization.apply(m)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        let mut grad = self.data_misfit.gradient(m);
        grad.axpy(self.beta, &self.regularization.gradient(m), 1.0);
        grad
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let mut hv = self.data_misfit.hessian_product(m, v);
        hv.axpy(self.beta, &self.regularization.hessian_product(m, v), 1.0);
        hv
    }
}

/// Options for the [`Inversion`] driver.
///
/// The tolerances follow the usual optimality test: the run is converged when
/// the change of the objective, the change of the model and the projected
/// gradient are all small.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct InversionOptions {
    /// Maximum number of iterations. Default: `20`.
    max_iter: usize,
    /// Tolerance on the change of the objective relative to `1 + |Φ(m0)|`.
    /// Default: `0.1`.
    tol_f: f64,
    /// Tolerance on the change of the model relative to `1 + ||m0||`.
    /// Default: `0.1`.
    tol_x: f64,
    /// Tolerance on the norm of the projected gradient. Default: `0.1`.
    tol_g: f64,
    /// The run stops when the norm of the projected gradient drops below
    /// `1e3 * eps * (1 + |Φ(m0)|)`. Default: machine epsilon.
    eps: f64,
    /// Initial trade-off parameter. Default: `1`.
    beta: f64,
}

impl Default for InversionOptions {
    fn default() -> Self {
        Self {
            max_iter: 20,
            tol_f: 1e-1,
            tol_x: 1e-1,
            tol_g: 1e-1,
            eps: f64::EPSILON,
            beta: 1.0,
        }
    }
}

impl InversionOptions {
    fn validate(&self) -> Result<(), ConfigurationError> {
        ConfigurationError::check_nonnegative("tol_f", self.tol_f)?;
        ConfigurationError::check_nonnegative("tol_x", self.tol_x)?;
        ConfigurationError::check_nonnegative("tol_g", self.tol_g)?;
        ConfigurationError::check_nonnegative("eps", self.eps)?;
        ConfigurationError::check_nonnegative("beta", self.beta)?;
        Ok(())
    }
}

/// Why the inversion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The maximum number of iterations was reached.
    MaxIterations,
    /// Changes of the objective and the model as well as the projected
    /// gradient are below the tolerances.
    Converged,
    /// The projected gradient vanished.
    ProjectedGradient,
    /// The optimizer could not decrease the objective.
    Stalled,
    /// A directive requested the stop.
    DirectiveStop,
    /// The run was cancelled from outside.
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TerminationReason::MaxIterations => "maximum number of iterations reached",
            TerminationReason::Converged => "converged",
            TerminationReason::ProjectedGradient => "projected gradient vanished",
            TerminationReason::Stalled => "optimizer stalled",
            TerminationReason::DirectiveStop => "stopped by a directive",
            TerminationReason::Cancelled => "cancelled",
        };

        f.write_str(reason)
    }
}

/// Outcome of [`Inversion::run`].
#[derive(Debug, Clone)]
pub struct InversionResult {
    /// The recovered model.
    pub model: DVector<f64>,
    /// Why the run stopped.
    pub termination: TerminationReason,
    /// Number of performed iterations.
    pub iterations: usize,
    /// Data misfit of the recovered model.
    pub phi_d: f64,
    /// Regularization of the recovered model.
    pub phi_m: f64,
    /// Trade-off parameter at the end of the run.
    pub beta: f64,
    /// Objective value after each iteration.
    pub values: Vec<f64>,
}

/// Error of an inversion run.
#[derive(Debug, Error)]
pub enum InversionError<E> {
    /// The components of the inversion do not fit together.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
    /// The optimizer failed.
    #[error("optimizer failed: {0}")]
    Algorithm(E),
}

/// Builder for the [`Inversion`].
pub struct InversionBuilder<'a, D, R, A> {
    data_misfit: &'a D,
    regularization: &'a R,
    dom: Domain,
    algo: A,
    options: InversionOptions,
    directives: Vec<Box<dyn Directive + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, D: Objective, R: Objective> InversionBuilder<'a, D, R, ProjectedGncg> {
    fn new(data_misfit: &'a D, regularization: &'a R) -> Self {
        let dom = Domain::unconstrained(data_misfit.dim());
        let algo = ProjectedGncg::new(&dom);

        Self {
            data_misfit,
            regularization,
            dom,
            algo,
            options: InversionOptions::default(),
            directives: Vec::new(),
            cancel: None,
        }
    }
}

impl<'a, D: Objective, R: Objective, A> InversionBuilder<'a, D, R, A> {
    /// Sets the initial trade-off parameter.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.options.set_beta(beta);
        self
    }

    /// Sets the bounds of the model. Call before
    /// [`with_algo`](InversionBuilder::with_algo) if the algorithm depends on
    /// the domain.
    pub fn with_domain(mut self, dom: Domain) -> Self {
        self.dom = dom;
        self
    }

    /// Sets specific optimizer to be used.
    ///
    /// This builder method accepts a closure that takes the reference to the
    /// domain. For the optimizers in this crate, you can simply pass the `new`
    /// constructor directly (e.g., `ProjectedGncg::new`).
    pub fn with_algo<A2, FA>(self, factory: FA) -> InversionBuilder<'a, D, R, A2>
    where
        FA: FnOnce(&Domain) -> A2,
    {
        let algo = factory(&self.dom);

        InversionBuilder {
            data_misfit: self.data_misfit,
            regularization: self.regularization,
            dom: self.dom,
            algo,
            options: self.options,
            directives: self.directives,
            cancel: self.cancel,
        }
    }

    /// Sets the options. This overrides a beta set earlier.
    pub fn with_options(mut self, options: InversionOptions) -> Self {
        self.options = options;
        self
    }

    /// Appends a directive. Directives are invoked in the order in which they
    /// were added.
    pub fn with_directive<T: Directive + 'a>(mut self, directive: T) -> Self {
        self.directives.push(Box::new(directive));
        self
    }

    /// Sets a flag which, once raised, stops the run before the next
    /// iteration.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Builds the [`Inversion`].
    pub fn build(self) -> Result<Inversion<'a, D, R, A>, ConfigurationError> {
        let n = self.data_misfit.dim();
        ConfigurationError::check_dim("regularization", n, self.regularization.dim())?;
        ConfigurationError::check_dim("domain", n, self.dom.dim())?;
        self.options.validate()?;

        Ok(Inversion {
            data_misfit: self.data_misfit,
            regularization: self.regularization,
            dom: self.dom,
            algo: self.algo,
            options: self.options,
            directives: self.directives,
            cancel: self.cancel,
        })
    }
}

/// The driver of an inversion.
///
/// For default settings, use [`Inversion::new`]. For more flexibility, use
/// [`Inversion::builder`]. For the usage of the driver, see [module](self)
/// documentation.
pub struct Inversion<'a, D, R, A> {
    data_misfit: &'a D,
    regularization: &'a R,
    dom: Domain,
    algo: A,
    options: InversionOptions,
    directives: Vec<Box<dyn Directive + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, D: Objective, R: Objective> Inversion<'a, D, R, ProjectedGncg> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(data_misfit: &'a D, regularization: &'a R) -> InversionBuilder<'a, D, R, ProjectedGncg> {
        InversionBuilder::new(data_misfit, regularization)
    }

    /// Initializes the driver with the default settings.
    pub fn new(data_misfit: &'a D, regularization: &'a R) -> Result<Self, ConfigurationError> {
        Inversion::builder(data_misfit, regularization).build()
    }
}

impl<'a, D: Objective, R: Objective, A> Inversion<'a, D, R, A> {
    /// Returns reference to the optimizer.
    pub fn algo(&self) -> &A {
        &self.algo
    }

    /// Returns reference to the domain.
    pub fn domain(&self) -> &Domain {
        &self.dom
    }

    /// Returns reference to the options.
    pub fn options(&self) -> &InversionOptions {
        &self.options
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

impl<'a, D, R, A> Inversion<'a, D, R, A>
where
    D: Objective,
    R: Objective,
    A: Optimizer<InverseProblem<'a, D, R>>,
{
    /// Runs the inversion from given initial model until a stopping criterion
    /// is met.
    ///
    /// The initial model is not projected onto the domain. The optimizer
    /// does that in its first step.
    pub fn run(&mut self, m0: DVector<f64>) -> Result<InversionResult, InversionError<A::Error>> {
        ConfigurationError::check_dim("initial model", self.data_misfit.dim(), m0.len())?;

        let data_misfit = self.data_misfit;
        let regularization = self.regularization;
        let mut beta = self.options.beta;
        let mut m = m0;

        {
            let mut state = InversionState::new(&m, data_misfit, regularization, 0, beta);
            for directive in self.directives.iter_mut() {
                debug!("initialize directive {}", directive.name());
                directive.initialize(&mut state);
            }
            beta = state.beta;

            if state.stop {
                return Ok(self.finish(m, TerminationReason::DirectiveStop, 0, beta, Vec::new()));
            }
        }

        let f0 = InverseProblem::new(data_misfit, regularization, beta).apply(&m);
        let m0_norm = m.norm();
        let mut f_last = f0;
        let mut m_last = m.clone();
        let mut values = Vec::new();
        let mut iter = 0;

        info!(
            "{} started: beta = {:.3e}, Φ(m0) = {:.3e}",
            A::NAME,
            beta,
            f0
        );

        let termination = loop {
            if self.cancelled() {
                break TerminationReason::Cancelled;
            }

            if iter >= self.options.max_iter {
                break TerminationReason::MaxIterations;
            }

            let problem = InverseProblem::new(data_misfit, regularization, beta);
            let progress = self
                .algo
                .opt_next(&problem, &self.dom, &mut m)
                .map_err(InversionError::Algorithm)?;
            iter += 1;
            values.push(progress.value);

            let mut state = InversionState::new(&m, data_misfit, regularization, iter, beta);

            info!(
                "iteration {}: beta = {:.3e}, phi_d = {:.3e}, phi_m = {:.3e}, f = {:.3e}, |proj(x - g) - x| = {:.3e}, step = {:.3e}, CG iterations = {}",
                iter,
                beta,
                state.phi_d,
                state.phi_m,
                progress.value,
                progress.projected_gradient_norm,
                progress.step_length,
                progress.cg_iterations
            );

            for directive in self.directives.iter_mut() {
                directive.end_iteration(&mut state);
            }
            beta = state.beta;
            let stop = state.stop;

            if progress.stall == Some(Stall::LineSearch) {
                break TerminationReason::Stalled;
            }

            if stop {
                break TerminationReason::DirectiveStop;
            }

            let pg = progress.projected_gradient_norm;
            let scale_f = 1.0 + f0.abs();

            let converged = (f_last - progress.value).abs() <= self.options.tol_f * scale_f
                && (&m - &m_last).norm() <= self.options.tol_x * (1.0 + m0_norm)
                && pg <= self.options.tol_g;

            if converged {
                break TerminationReason::Converged;
            }

            if pg <= 1e3 * self.options.eps * scale_f {
                break TerminationReason::ProjectedGradient;
            }

            f_last = progress.value;
            m_last.copy_from(&m);
        };

        info!("{} finished after {} iterations: {}", A::NAME, iter, termination);

        Ok(self.finish(m, termination, iter, beta, values))
    }

    /// Returns the name of the used optimizer.
    pub fn name(&self) -> &str {
        A::NAME
    }

    fn finish(
        &self,
        model: DVector<f64>,
        termination: TerminationReason,
        iterations: usize,
        beta: f64,
        values: Vec<f64>,
    ) -> InversionResult {
        InversionResult {
            phi_d: self.data_misfit.apply(&model),
            phi_m: self.regularization.apply(&model),
            model,
            termination,
            iterations,
            beta,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::algo::ProjectedGncgOptions;
    use crate::composite::Composite;
    use crate::constraint::{GradientSign, Volume};
    use crate::data_misfit::L2DataMisfit;
    use crate::directives::{BetaSchedule, TargetMisfit};
    use crate::testing::{toy_simulation, SumTarget, WeightedSphere};

    struct Recorder(Rc<RefCell<Vec<DVector<f64>>>>);

    impl Directive for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn end_iteration(&mut self, state: &mut InversionState<'_>) {
            self.0.borrow_mut().push(state.model().clone());
        }
    }

    #[test]
    fn sum_target_converges() {
        let dmis = SumTarget::new(4, 10.0);
        let reg = WeightedSphere::new(DVector::zeros(4));
        let mut inversion = Inversion::builder(&dmis, &reg).with_beta(0.0).build().unwrap();

        let result = inversion.run(DVector::zeros(4)).unwrap();

        assert!(result.iterations <= 5);
        assert!(matches!(
            result.termination,
            TerminationReason::Converged | TerminationReason::ProjectedGradient
        ));
        assert_abs_diff_eq!(result.model.sum(), 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.phi_d, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn feasible_and_monotone_with_bounds() {
        let dmis = SumTarget::new(3, 10.0);
        let reg = WeightedSphere::new(dvector![1.0, 1.0, 1.0]);
        let dom = Domain::uniform(3, 0.0, 1.0).unwrap();
        let models = Rc::new(RefCell::new(Vec::new()));

        let mut inversion = Inversion::builder(&dmis, &reg)
            .with_beta(0.1)
            .with_domain(dom.clone())
            .with_directive(Recorder(Rc::clone(&models)))
            .build()
            .unwrap();

        let result = inversion.run(DVector::from_element(3, 0.5)).unwrap();

        let models = models.borrow();
        assert_eq!(models.len(), result.iterations);
        assert!(models.iter().all(|m| dom.is_feasible(m)));
        assert!(result.values.windows(2).all(|w| w[1] <= w[0]));
        assert_abs_diff_eq!(result.model, DVector::from_element(3, 1.0), epsilon = 1e-12);
    }

    fn recovered_volume(weight: Option<f64>) -> f64 {
        let (sim, mut survey) = toy_simulation();
        let mut rng = StdRng::seed_from_u64(11);
        let m_true = dvector![0.3, 0.7];
        let data = survey
            .make_synthetic_data(&sim, &m_true, 0.1, false, &mut rng)
            .unwrap()
            .clone();

        let vol = dvector![1.0, 1.0];
        let known = vol.dot(&m_true);
        let volume = Volume::new(vol, known)
            .unwrap()
            .with_gradient_sign(GradientSign::Derivative);

        let mut phi = Composite::leaf(L2DataMisfit::new(sim, &data).unwrap());
        if let Some(weight) = weight {
            phi = phi + weight * Composite::leaf(volume.clone());
        }

        let reg = WeightedSphere::new(dvector![1.0, 1.0]);
        let mut gncg = ProjectedGncgOptions::default();
        gncg.set_tol_cg(1e-10);

        let mut inversion = Inversion::builder(&phi, &reg)
            .with_beta(1e-4)
            .with_domain(Domain::uniform(2, 0.0, 1.0).unwrap())
            .with_algo(|dom| ProjectedGncg::with_options(dom, gncg))
            .build()
            .unwrap();

        let result = inversion.run(dvector![0.5, 0.5]).unwrap();
        (volume.estimated_volume(&result.model) - known).abs() / known
    }

    #[test]
    fn volume_term_recovers_known_volume() {
        let without = recovered_volume(None);
        let with = recovered_volume(Some(1e5));

        assert!(with < 1e-2);
        assert!(with < without);
    }

    #[test]
    fn max_iterations() {
        let dmis = SumTarget::new(2, 1.0);
        let reg = WeightedSphere::new(dvector![1.0, 1.0]);
        let mut options = InversionOptions::default();
        options.set_max_iter(1);

        let mut inversion = Inversion::builder(&dmis, &reg)
            .with_options(options)
            .build()
            .unwrap();
        let result = inversion.run(dvector![0.0, 0.0]).unwrap();

        assert_eq!(result.termination, TerminationReason::MaxIterations);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.values.len(), 1);
    }

    #[test]
    fn infeasible_initial_model_is_projected() {
        // 0.5 (m + 2)^2, the bounded minimum is at the lower bound.
        let dmis = SumTarget::new(1, -2.0);
        let reg = WeightedSphere::new(dvector![1.0]);
        let dom = Domain::uniform(1, 0.0, 1.0).unwrap();

        let mut inversion = Inversion::builder(&dmis, &reg)
            .with_beta(0.0)
            .with_domain(dom.clone())
            .build()
            .unwrap();
        let result = inversion.run(dvector![-1.0]).unwrap();

        assert!(dom.is_feasible(&result.model));
        assert_eq!(result.model, dvector![0.0]);
        assert_eq!(result.termination, TerminationReason::ProjectedGradient);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn failed_line_search_stalls_run() {
        // With the default sign the volume gradient points away from the
        // minimum.
        let dmis = Volume::new(dvector![1.0, 1.0], 2.0).unwrap();
        let reg = WeightedSphere::new(dvector![1.0, 1.0]);

        let mut inversion = Inversion::builder(&dmis, &reg).with_beta(0.0).build().unwrap();
        let result = inversion.run(dvector![0.0, 0.0]).unwrap();

        assert_eq!(result.termination, TerminationReason::Stalled);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.model, dvector![0.0, 0.0]);
        assert_abs_diff_eq!(result.phi_d, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn target_misfit_stops_run() {
        let dmis = SumTarget::new(2, 10.0);
        let reg = WeightedSphere::new(dvector![1.0, 1.0]);

        let mut inversion = Inversion::builder(&dmis, &reg)
            .with_beta(0.0)
            .with_directive(TargetMisfit::new(2))
            .build()
            .unwrap();
        let result = inversion.run(dvector![0.0, 0.0]).unwrap();

        assert_eq!(result.termination, TerminationReason::DirectiveStop);
        assert_eq!(result.iterations, 1);
        assert!(result.phi_d <= 1.0);
    }

    #[test]
    fn beta_schedule_changes_beta() {
        let dmis = SumTarget::new(2, 10.0);
        let reg = WeightedSphere::new(DVector::zeros(2));

        let mut inversion = Inversion::builder(&dmis, &reg)
            .with_directive(BetaSchedule::new(2.0, 1).unwrap())
            .build()
            .unwrap();
        let result = inversion.run(dvector![0.0, 0.0]).unwrap();

        assert_eq!(result.iterations, 2);
        assert_abs_diff_eq!(result.beta, 0.25);
    }

    #[test]
    fn cancelled_before_start() {
        let dmis = SumTarget::new(2, 10.0);
        let reg = WeightedSphere::new(dvector![1.0, 1.0]);
        let flag = Arc::new(AtomicBool::new(true));

        let mut inversion = Inversion::builder(&dmis, &reg)
            .with_cancellation(Arc::clone(&flag))
            .build()
            .unwrap();
        let result = inversion.run(dvector![0.2, 0.3]).unwrap();

        assert_eq!(result.termination, TerminationReason::Cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.model, dvector![0.2, 0.3]);
    }

    #[test]
    fn dimension_mismatch() {
        let dmis = SumTarget::new(2, 10.0);
        let reg = WeightedSphere::new(dvector![1.0, 1.0, 1.0]);

        assert!(matches!(
            Inversion::new(&dmis, &reg),
            Err(ConfigurationError::DimensionMismatch { .. })
        ));

        let reg = WeightedSphere::new(dvector![1.0, 1.0]);
        let mut inversion = Inversion::new(&dmis, &reg).unwrap();
        assert!(matches!(
            inversion.run(dvector![1.0]),
            Err(InversionError::Configuration(_))
        ));

        assert!(Inversion::builder(&dmis, &reg).with_beta(-1.0).build().is_err());
    }

    #[test]
    fn name() {
        let dmis = SumTarget::new(2, 10.0);
        let reg = WeightedSphere::new(dvector![1.0, 1.0]);
        let inversion = Inversion::new(&dmis, &reg).unwrap();

        assert_eq!(inversion.name(), "Projected GNCG");
    }
}
