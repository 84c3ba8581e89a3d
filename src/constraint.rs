//! Physical property constraints.

use nalgebra::{DMatrix, DVector};

use crate::core::{ConfigurationError, Objective};
use crate::mesh::Mesh;

/// Sign convention of the [`Volume`] gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientSign {
    /// `vol (known - vol · m)`. Points towards increasing the volume when it is
    /// below the target. This is the negated derivative of the penalty value,
    /// so a minimizer following it moves the volume away from the target.
    #[default]
    TowardTarget,
    /// `vol (vol · m - known)`, the derivative of the penalty value. Use this
    /// when the constraint is minimized together with other terms.
    Derivative,
}

/// Penalty on the deviation of the model volume from a known value.
///
/// The model volume is the integral `vol · m` where `vol` holds the cell
/// volumes. The penalty is
///
/// ```text
/// 0.5 (vol · m - known)²
/// ```
///
/// with Hessian `vol ⊗ vol`. The gradient convention is selected by
/// [`GradientSign`] and defaults to [`GradientSign::TowardTarget`].
#[derive(Debug, Clone)]
pub struct Volume {
    vol: DVector<f64>,
    known: f64,
    sign: GradientSign,
}

impl Volume {
    /// Creates the constraint from cell volumes and the target volume. The
    /// target must be nonnegative.
    pub fn new(vol: DVector<f64>, known: f64) -> Result<Self, ConfigurationError> {
        let known = ConfigurationError::check_nonnegative("known volume", known)?;
        Ok(Self {
            vol,
            known,
            sign: GradientSign::default(),
        })
    }

    /// Creates the constraint on the cells of a mesh.
    pub fn on_mesh<M: Mesh + ?Sized>(mesh: &M, known: f64) -> Result<Self, ConfigurationError> {
        Self::new(mesh.cell_volumes().clone(), known)
    }

    /// Sets the gradient sign convention.
    pub fn with_gradient_sign(mut self, sign: GradientSign) -> Self {
        self.sign = sign;
        self
    }

    /// Target volume.
    pub fn known_volume(&self) -> f64 {
        self.known
    }

    /// Gradient sign convention.
    pub fn gradient_sign(&self) -> GradientSign {
        self.sign
    }

    /// Volume of the model, `vol · m`.
    pub fn estimated_volume(&self, m: &DVector<f64>) -> f64 {
        self.vol.dot(m)
    }
}

impl Objective for Volume {
    fn dim(&self) -> usize {
        self.vol.len()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        0.5 * (self.estimated_volume(m) - self.known).powi(2)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        let deficit = self.known - self.estimated_volume(m);
        match self.sign {
            GradientSign::TowardTarget => &self.vol * deficit,
            GradientSign::Derivative => &self.vol * -deficit,
        }
    }

    fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        &self.vol * self.vol.dot(v)
    }

    /// Dense `vol ⊗ vol`. Needs `O(n²)` memory, prefer
    /// [`hessian_product`](Objective::hessian_product).
    fn hessian(&self, _m: &DVector<f64>) -> DMatrix<f64> {
        &self.vol * self.vol.transpose()
    }
}
