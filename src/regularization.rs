//! Regularization terms.
//!
//! All regularizations here are quadratic forms `0.5 ||W (m - mref)||^2` with
//! a sparse weighting operator `W`. They differ only in how `W` is
//! assembled. [`Tikhonov`] blends smallness with first-order smoothness along
//! each axis of a [`TensorMesh`].

use getset::{CopyGetters, Setters};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::core::{ConfigurationError, Objective};
use crate::mesh::{Mesh, TensorMesh};
use crate::sparse;

/// Quadratic penalty `0.5 ||W (m - mref)||^2`.
#[derive(Debug, Clone)]
pub struct Quadratic {
    w: CsrMatrix<f64>,
    w_t: CsrMatrix<f64>,
    mref: DVector<f64>,
}

impl Quadratic {
    /// Creates the penalty with zero reference model.
    pub fn new(w: CsrMatrix<f64>) -> Self {
        let mref = DVector::zeros(w.ncols());
        let w_t = w.transpose();
        Self { w, w_t, mref }
    }

    /// Sets the reference model.
    pub fn with_reference(mut self, mref: DVector<f64>) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_dim("reference model", self.w.ncols(), mref.len())?;
        self.mref = mref;
        Ok(self)
    }

    /// The weighting operator.
    pub fn operator(&self) -> &CsrMatrix<f64> {
        &self.w
    }

    /// The reference model.
    pub fn reference(&self) -> &DVector<f64> {
        &self.mref
    }

    fn weighted(&self, m: &DVector<f64>) -> DVector<f64> {
        &self.w * &(m - &self.mref)
    }
}

impl Objective for Quadratic {
    fn dim(&self) -> usize {
        self.w.ncols()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        0.5 * self.weighted(m).norm_squared()
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        &self.w_t * &self.weighted(m)
    }

    fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        &self.w_t * &(&self.w * v)
    }
}

/// Options for [`Tikhonov`] regularization.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct TikhonovOptions {
    /// Weight of the smallness term. Default: `1e-6`.
    alpha_s: f64,
    /// Weight of the smoothness along the first axis. Default: `1`.
    alpha_x: f64,
    /// Weight of the smoothness along the second axis (ignored on 1-D
    /// meshes). Default: `1`.
    alpha_y: f64,
}

impl Default for TikhonovOptions {
    fn default() -> Self {
        Self {
            alpha_s: 1e-6,
            alpha_x: 1.0,
            alpha_y: 1.0,
        }
    }
}

/// Smallness and first-order smoothness regularization on a tensor mesh.
///
/// The operator stacks `sqrt(alpha_s) diag(sqrt(vol))` with
/// `sqrt(alpha_i) diag(sqrt(vol_i)) D_i` for each axis `i`, where `D_i` is the
/// cell difference and `vol_i` the average volume of the neighboring cells.
/// Hence the penalty approximates
///
/// ```text
/// alpha_s/2 ∫ (m - mref)² dV + Σ_i alpha_i/2 ∫ (∂_i (m - mref))² dV
/// ```
#[derive(Debug, Clone)]
pub struct Tikhonov {
    options: TikhonovOptions,
    quadratic: Quadratic,
}

impl Tikhonov {
    /// Creates the regularization with default options.
    pub fn new(mesh: &TensorMesh) -> Self {
        Self::assemble(mesh, TikhonovOptions::default())
    }

    /// Creates the regularization with given options. The weights must be
    /// nonnegative.
    pub fn with_options(mesh: &TensorMesh, options: TikhonovOptions) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_nonnegative("alpha_s", options.alpha_s)?;
        ConfigurationError::check_nonnegative("alpha_x", options.alpha_x)?;
        ConfigurationError::check_nonnegative("alpha_y", options.alpha_y)?;
        Ok(Self::assemble(mesh, options))
    }

    /// Sets the reference model.
    pub fn with_reference(mut self, mref: DVector<f64>) -> Result<Self, ConfigurationError> {
        self.quadratic = self.quadratic.with_reference(mref)?;
        Ok(self)
    }

    /// Options of the regularization.
    pub fn options(&self) -> &TikhonovOptions {
        &self.options
    }

    /// The underlying quadratic form.
    pub fn quadratic(&self) -> &Quadratic {
        &self.quadratic
    }

    fn assemble(mesh: &TensorMesh, options: TikhonovOptions) -> Self {
        let alphas = [options.alpha_x, options.alpha_y];
        let mut blocks = vec![sparse::diagonal(
            &mesh.cell_volumes().map(|v| (options.alpha_s * v).sqrt()),
        )];

        for (axis, alpha) in alphas.iter().enumerate().take(mesh.dim()) {
            let weights = mesh.pair_volumes(axis).map(|v| (alpha * v).sqrt());
            blocks.push(sparse::scale_rows(&mesh.cell_difference(axis), &weights));
        }

        Self {
            options,
            quadratic: Quadratic::new(sparse::vstack(&blocks)),
        }
    }
}

impl Objective for Tikhonov {
    fn dim(&self) -> usize {
        self.quadratic.dim()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        self.quadratic.apply(m)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        self.quadratic.gradient(m)
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        self.quadratic.hessian_product(m, v)
    }
}
