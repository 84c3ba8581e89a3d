//! Pluggable control of an inversion run.
//!
//! Directives are invoked by the [`Inversion`](crate::driver::Inversion)
//! driver in the order in which they were added, once before the first
//! iteration and after every iteration. They can change the trade-off
//! parameter beta or request the run to stop. The model is read-only to them.

use nalgebra::DVector;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use log::{debug, info};

use crate::core::{ConfigurationError, Objective};

/// State of an inversion visible to directives.
pub struct InversionState<'a> {
    pub(crate) model: &'a DVector<f64>,
    pub(crate) data_misfit: &'a dyn Objective,
    pub(crate) regularization: &'a dyn Objective,
    pub(crate) iter: usize,
    pub(crate) phi_d: f64,
    pub(crate) phi_m: f64,
    pub(crate) beta: f64,
    pub(crate) stop: bool,
}

impl<'a> InversionState<'a> {
    pub(crate) fn new(
        model: &'a DVector<f64>,
        data_misfit: &'a dyn Objective,
        regularization: &'a dyn Objective,
        iter: usize,
        beta: f64,
    ) -> Self {
        Self {
            model,
            data_misfit,
            regularization,
            iter,
            phi_d: data_misfit.apply(model),
            phi_m: regularization.apply(model),
            beta,
            stop: false,
        }
    }

    /// Current model.
    pub fn model(&self) -> &DVector<f64> {
        self.model
    }

    /// The data misfit term.
    pub fn data_misfit(&self) -> &dyn Objective {
        self.data_misfit
    }

    /// The regularization term.
    pub fn regularization(&self) -> &dyn Objective {
        self.regularization
    }

    /// Number of finished iterations.
    pub fn iter(&self) -> usize {
        self.iter
    }

    /// Data misfit in the current model.
    pub fn phi_d(&self) -> f64 {
        self.phi_d
    }

    /// Regularization in the current model.
    pub fn phi_m(&self) -> f64 {
        self.phi_m
    }

    /// Current trade-off parameter.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Sets the trade-off parameter. It must be nonnegative.
    pub fn set_beta(&mut self, beta: f64) -> Result<(), ConfigurationError> {
        self.beta = ConfigurationError::check_nonnegative("beta", beta)?;
        Ok(())
    }

    /// Requests the inversion to stop after this iteration.
    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    /// Whether a stop was requested.
    pub fn stop_requested(&self) -> bool {
        self.stop
    }
}

/// Interface of a directive.
pub trait Directive {
    /// Name of the directive, used in logs.
    fn name(&self) -> &str;

    /// Called once before the first iteration.
    fn initialize(&mut self, _state: &mut InversionState<'_>) {}

    /// Called after every iteration.
    fn end_iteration(&mut self, _state: &mut InversionState<'_>) {}
}

/// Reduces beta by a constant factor every few iterations.
#[derive(Debug, Clone)]
pub struct BetaSchedule {
    cooling_factor: f64,
    cooling_rate: usize,
}

impl BetaSchedule {
    /// Creates the schedule dividing beta by `cooling_factor` every
    /// `cooling_rate` iterations.
    pub fn new(cooling_factor: f64, cooling_rate: usize) -> Result<Self, ConfigurationError> {
        if !(cooling_factor > 0.0) {
            return Err(ConfigurationError::Negative {
                name: "cooling factor",
                value: cooling_factor,
            });
        }

        if cooling_rate == 0 {
            return Err(ConfigurationError::Missing("cooling rate"));
        }

        Ok(Self {
            cooling_factor,
            cooling_rate,
        })
    }
}

impl Default for BetaSchedule {
    /// Divides beta by 8 every 3 iterations.
    fn default() -> Self {
        Self {
            cooling_factor: 8.0,
            cooling_rate: 3,
        }
    }
}

impl Directive for BetaSchedule {
    fn name(&self) -> &str {
        "beta schedule"
    }

    fn end_iteration(&mut self, state: &mut InversionState<'_>) {
        if state.iter > 0 && state.iter % self.cooling_rate == 0 {
            state.beta /= self.cooling_factor;
            debug!("beta cooled down to {:.3e}", state.beta);
        }
    }
}

/// Stops the inversion once the data misfit reaches its expected value.
///
/// For data with correctly estimated Gaussian noise, the expected value of
/// `0.5 ||W (F(m) - dobs)||²` is `0.5 nD`. The target is this value
/// multiplied by `chi_factor`.
#[derive(Debug, Clone)]
pub struct TargetMisfit {
    target: f64,
}

impl TargetMisfit {
    /// Creates the directive for given number of data with chi factor 1.
    pub fn new(n_data: usize) -> Self {
        Self::with_chi_factor(n_data, 1.0)
    }

    /// Creates the directive for given number of data and chi factor.
    pub fn with_chi_factor(n_data: usize, chi_factor: f64) -> Self {
        Self {
            target: 0.5 * chi_factor * n_data as f64,
        }
    }

    /// Target value of the data misfit.
    pub fn target(&self) -> f64 {
        self.target
    }
}

impl Directive for TargetMisfit {
    fn name(&self) -> &str {
        "target misfit"
    }

    fn end_iteration(&mut self, state: &mut InversionState<'_>) {
        if state.phi_d <= self.target {
            info!(
                "target misfit reached: phi_d = {:.3e} <= {:.3e}",
                state.phi_d, self.target
            );
            state.request_stop();
        }
    }
}

/// Estimates the initial beta from the ratio of the curvatures of the data
/// misfit and the regularization.
///
/// For a random vector `x`, beta is set to `ratio * (x^T H_d x) / (x^T H_m x)`
/// where the Hessians are taken in the initial model.
#[derive(Debug, Clone)]
pub struct BetaEstimate {
    ratio: f64,
    seed: u64,
}

impl BetaEstimate {
    /// Creates the directive with given ratio and seed of the random vector.
    pub fn new(ratio: f64, seed: u64) -> Result<Self, ConfigurationError> {
        let ratio = ConfigurationError::check_nonnegative("beta ratio", ratio)?;
        Ok(Self { ratio, seed })
    }
}

impl Default for BetaEstimate {
    /// Ratio `100` and seed `0`.
    fn default() -> Self {
        Self {
            ratio: 1e2,
            seed: 0,
        }
    }
}

impl Directive for BetaEstimate {
    fn name(&self) -> &str {
        "beta estimate"
    }

    fn initialize(&mut self, state: &mut InversionState<'_>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = state.model.len();
        let x = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));

        let t = x.dot(&state.data_misfit.hessian_product(state.model, &x));
        let b = x.dot(&state.regularization.hessian_product(state.model, &x));

        if b > 0.0 && t.is_finite() {
            state.beta = self.ratio * t / b;
            info!("estimated initial beta = {:.3e}", state.beta);
        } else {
            debug!("regularization has no curvature along the random direction, beta unchanged");
        }
    }
}
