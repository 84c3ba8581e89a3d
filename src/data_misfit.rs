//! Data misfit term.

use nalgebra::DVector;

use crate::core::{ConfigurationError, Objective};
use crate::simulation::Simulation;
use crate::survey::Data;

/// Weighted least-squares data misfit, `0.5 ||W (F(m) - dobs)||^2`.
///
/// The weights are the reciprocals of the data uncertainties. The Hessian
/// action uses the Gauss-Newton approximation `J^T W^T W J`, which drops the
/// second derivatives of the simulation.
#[derive(Debug, Clone)]
pub struct L2DataMisfit<S> {
    simulation: S,
    dobs: DVector<f64>,
    weights: DVector<f64>,
}

impl<S: Simulation> L2DataMisfit<S> {
    /// Creates the misfit of the simulation against the data, weighted by the
    /// reciprocal of [`Data::uncertainty`].
    pub fn new(simulation: S, data: &Data) -> Result<Self, ConfigurationError> {
        let uncertainty = data.uncertainty();

        if uncertainty.iter().any(|&u| !(u > 0.0)) {
            return Err(ConfigurationError::Negative {
                name: "data uncertainty",
                value: uncertainty.min(),
            });
        }

        Self::with_weights(simulation, data.dobs().clone(), uncertainty.map(f64::recip))
    }

    /// Creates the misfit with explicit data weights.
    pub fn with_weights(
        simulation: S,
        dobs: DVector<f64>,
        weights: DVector<f64>,
    ) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_dim("observed data", simulation.n_data(), dobs.len())?;
        ConfigurationError::check_dim("data weights", simulation.n_data(), weights.len())?;

        Ok(Self {
            simulation,
            dobs,
            weights,
        })
    }

    /// Number of data.
    pub fn n_data(&self) -> usize {
        self.dobs.len()
    }

    /// The simulation.
    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    /// Data weights.
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Weighted residual `W (F(m) - dobs)`.
    pub fn residual(&self, m: &DVector<f64>) -> DVector<f64> {
        (self.simulation.predict(m) - &self.dobs).component_mul(&self.weights)
    }
}

impl<S: Simulation> Objective for L2DataMisfit<S> {
    fn dim(&self) -> usize {
        self.simulation.n_params()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        0.5 * self.residual(m).norm_squared()
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        let r = self.residual(m).component_mul(&self.weights);
        self.simulation.sensitivity_transpose_product(m, &r)
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let w2jv = self
            .simulation
            .sensitivity_product(m, v)
            .component_mul(&self.weights)
            .component_mul(&self.weights);
        self.simulation.sensitivity_transpose_product(m, &w2jv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::derivatives::finite_difference_gradient;
    use crate::mapping::ExpMap;
    use crate::simulation::LinearSimulation;
    use crate::testing::{random_vector, toy_simulation};

    #[test]
    fn zero_at_noiseless_data() {
        let (sim, _) = toy_simulation();
        let m = dvector![0.3, 0.7];
        let data = Data::new(sim.predict(&m), 0.05).unwrap();
        let dmis = L2DataMisfit::new(&sim, &data).unwrap();

        assert_abs_diff_eq!(dmis.apply(&m), 0.0);
        assert_abs_diff_eq!(dmis.gradient(&m), DVector::zeros(2));
        assert_eq!(dmis.n_data(), sim.n_data());
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let (sim, _) = toy_simulation();
        let sim = LinearSimulation::with_mapping(sim.operator().clone(), ExpMap::new(2)).unwrap();
        let data = Data::new(dvector![1.0, 2.0, 1.5], 0.1).unwrap();
        let dmis = L2DataMisfit::new(sim, &data).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..3 {
            let m = random_vector(2, &mut rng);
            let fd = finite_difference_gradient(&dmis, &m);
            assert_abs_diff_eq!(dmis.gradient(&m), fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn gauss_newton_hessian_of_linear_problem_is_exact() {
        let (sim, _) = toy_simulation();
        let data = Data::new(dvector![1.0, 2.0, 1.5], 0.1).unwrap();
        let dmis = L2DataMisfit::new(&sim, &data).unwrap();
        let m = dvector![0.2, 0.1];
        let v = dvector![1.0, -1.0];
        let h = 1e-6;

        let fd = (dmis.gradient(&(&m + &v * h)) - dmis.gradient(&(&m - &v * h))) / (2.0 * h);
        assert_abs_diff_eq!(dmis.hessian_product(&m, &v), fd, epsilon = 1e-4);
    }

    #[test]
    fn mismatched_data_rejected() {
        let (sim, _) = toy_simulation();
        let data = Data::new(dvector![1.0, 2.0], 0.1).unwrap();
        assert!(L2DataMisfit::new(&sim, &data).is_err());

        let data = Data::new(dvector![0.0, 0.0, 0.0], 0.1).unwrap();
        assert!(matches!(
            L2DataMisfit::new(&sim, &data),
            Err(ConfigurationError::Negative { .. })
        ));
    }
}
