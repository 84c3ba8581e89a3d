//! Forward simulation collaborator.
//!
//! A [`Simulation`] predicts data from a model and exposes the sensitivity
//! (Jacobian) as matrix-free products. The physics behind it is not part of
//! this crate. [`LinearSimulation`] is a reference implementation with an
//! explicit sparse forward operator, optionally applied after a
//! [`Mapping`](crate::mapping::Mapping).

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::core::ConfigurationError;
use crate::mapping::Mapping;

/// Interface of a forward simulation.
pub trait Simulation {
    /// Number of model parameters.
    fn n_params(&self) -> usize;

    /// Number of predicted data.
    fn n_data(&self) -> usize;

    /// Predicts data for given model.
    fn predict(&self, m: &DVector<f64>) -> DVector<f64>;

    /// Computes `J(m) v` where `J` is the sensitivity matrix.
    fn sensitivity_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64>;

    /// Computes `J(m)^T v` where `J` is the sensitivity matrix.
    fn sensitivity_transpose_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64>;
}

impl<S: Simulation + ?Sized> Simulation for &S {
    fn n_params(&self) -> usize {
        S::n_params(self)
    }

    fn n_data(&self) -> usize {
        S::n_data(self)
    }

    fn predict(&self, m: &DVector<f64>) -> DVector<f64> {
        S::predict(self, m)
    }

    fn sensitivity_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        S::sensitivity_product(self, m, v)
    }

    fn sensitivity_transpose_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        S::sensitivity_transpose_product(self, m, v)
    }
}

/// Simulation `d = G map(m)` with a sparse forward operator `G`.
///
/// Typical example is straight-ray travel-time tomography where the row of `G`
/// holds the lengths of the ray in each cell and the mapped property is
/// slowness.
pub struct LinearSimulation {
    g: CsrMatrix<f64>,
    g_t: CsrMatrix<f64>,
    map: Option<Box<dyn Mapping>>,
}

impl LinearSimulation {
    /// Creates the simulation acting directly on the model.
    pub fn new(g: CsrMatrix<f64>) -> Self {
        let g_t = g.transpose();
        Self { g, g_t, map: None }
    }

    /// Creates the simulation acting on the mapped model.
    pub fn with_mapping<M: Mapping + 'static>(
        g: CsrMatrix<f64>,
        map: M,
    ) -> Result<Self, ConfigurationError> {
        let mut sim = Self::new(g);
        // Mappings do not declare their output size.
        let mapped = map.apply(&DVector::zeros(map.n_params()));
        ConfigurationError::check_dim("mapped model", sim.g.ncols(), mapped.len())?;
        sim.map = Some(Box::new(map));
        Ok(sim)
    }

    /// The forward operator.
    pub fn operator(&self) -> &CsrMatrix<f64> {
        &self.g
    }

    fn property(&self, m: &DVector<f64>) -> DVector<f64> {
        match &self.map {
            Some(map) => map.apply(m),
            None => m.clone(),
        }
    }
}

impl Simulation for LinearSimulation {
    fn n_params(&self) -> usize {
        match &self.map {
            Some(map) => map.n_params(),
            None => self.g.ncols(),
        }
    }

    fn n_data(&self) -> usize {
        self.g.nrows()
    }

    fn predict(&self, m: &DVector<f64>) -> DVector<f64> {
        &self.g * &self.property(m)
    }

    fn sensitivity_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        match &self.map {
            Some(map) => &self.g * &(&map.derivative(m) * v),
            None => &self.g * v,
        }
    }

    fn sensitivity_transpose_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let gtv = &self.g_t * v;
        match &self.map {
            Some(map) => &map.derivative(m).transpose() * &gtv,
            None => gtv,
        }
    }
}

impl std::fmt::Debug for LinearSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearSimulation")
            .field("n_data", &self.g.nrows())
            .field("n_params", &self.n_params())
            .field("mapped", &self.map.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};
    use nalgebra_sparse::CooMatrix;

    use crate::mapping::{ExpMap, IdentityMap};

    fn operator() -> CsrMatrix<f64> {
        CsrMatrix::from(&CooMatrix::from(&dmatrix![
            1.0, 0.0, 2.0;
            0.5, 1.5, 0.0
        ]))
    }

    #[test]
    fn transpose_product_is_adjoint() {
        let sim = LinearSimulation::with_mapping(operator(), ExpMap::new(3)).unwrap();
        let m = dvector![0.1, -0.3, 0.2];
        let v = dvector![0.4, 1.0, -2.0];
        let w = dvector![1.5, -0.7];

        let lhs = w.dot(&sim.sensitivity_product(&m, &v));
        let rhs = v.dot(&sim.sensitivity_transpose_product(&m, &w));

        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12);
    }

    #[test]
    fn sensitivity_is_derivative_of_prediction() {
        let sim = LinearSimulation::with_mapping(operator(), ExpMap::new(3)).unwrap();
        let m = dvector![0.1, -0.3, 0.2];
        let v = dvector![1.0, 0.0, -1.0];
        let h = 1e-6;

        let fd = (sim.predict(&(&m + &v * h)) - sim.predict(&(&m - &v * h))) / (2.0 * h);
        assert_abs_diff_eq!(sim.sensitivity_product(&m, &v), fd, epsilon = 1e-6);
    }

    #[test]
    fn mapping_dimension_checked() {
        assert!(LinearSimulation::with_mapping(operator(), IdentityMap::new(4)).is_err());
        let sim = LinearSimulation::new(operator());
        assert_eq!((sim.n_params(), sim.n_data()), (3, 2));
    }
}
