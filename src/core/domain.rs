//! Bound constraints on the model vector.

use nalgebra::{storage::StorageMut, DVector, Dim, Vector};

use super::base::ConfigurationError;

/// Domain for a problem: elementwise lower and upper bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl Domain {
    /// Creates unconstrained domain with given dimensionality.
    pub fn unconstrained(dim: usize) -> Self {
        Self {
            lower: DVector::from_element(dim, f64::NEG_INFINITY),
            upper: DVector::from_element(dim, f64::INFINITY),
        }
    }

    /// Creates rectangular domain with given lower and upper bounds.
    ///
    /// Positive and negative infinity can be used to indicate a value unbounded
    /// in that dimension and direction. If the entire domain is unconstrained,
    /// use [`Domain::unconstrained`] instead.
    pub fn rect(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_dim("upper bounds", lower.len(), upper.len())?;

        for (index, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if l.is_nan() || u.is_nan() || l > u {
                return Err(ConfigurationError::InvalidBounds {
                    index,
                    lower: l,
                    upper: u,
                });
            }
        }

        Ok(Self {
            lower: DVector::from_vec(lower),
            upper: DVector::from_vec(upper),
        })
    }

    /// Creates domain with the same bounds for all variables.
    pub fn uniform(dim: usize, lower: f64, upper: f64) -> Result<Self, ConfigurationError> {
        Self::rect(vec![lower; dim], vec![upper; dim])
    }

    /// Gets the dimensionality of the domain.
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Lower bounds.
    pub fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    /// Upper bounds.
    pub fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    /// Projects given point into the domain.
    ///
    /// Returns `true` if the point was not feasible before the projection.
    pub fn project<D, Sx>(&self, x: &mut Vector<f64, D, Sx>) -> bool
    where
        D: Dim,
        Sx: StorageMut<f64, D>,
    {
        let mut not_feasible = false;

        self.lower
            .iter()
            .zip(self.upper.iter())
            .zip(x.iter_mut())
            .for_each(|((li, ui), xi)| {
                if *xi < *li {
                    *xi = *li;
                    not_feasible = true;
                } else if *xi > *ui {
                    *xi = *ui;
                    not_feasible = true;
                }
            });

        not_feasible
    }

    /// Determines whether the point satisfies all bounds.
    pub fn is_feasible(&self, x: &DVector<f64>) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(xi, (li, ui))| li <= xi && xi <= ui)
    }

    /// Indices that are held fixed in a projected Newton step.
    ///
    /// A variable is binding when it sits on a bound and the negative gradient
    /// points out of the domain, so that any step would be projected back.
    pub fn binding_set(&self, x: &DVector<f64>, grad: &DVector<f64>) -> Vec<bool> {
        x.iter()
            .zip(grad.iter())
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|((&xi, &gi), (&li, &ui))| (xi <= li && gi >= 0.0) || (xi >= ui && gi <= 0.0))
            .collect()
    }

    /// Computes the projected gradient `x - P(x - grad)`.
    ///
    /// Its norm is zero exactly at the stationary points of the bound
    /// constrained problem.
    pub fn projected_gradient(&self, x: &DVector<f64>, grad: &DVector<f64>) -> DVector<f64> {
        let mut stepped = x - grad;
        self.project(&mut stepped);
        x - stepped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn inverted_bounds_rejected() {
        assert!(matches!(
            Domain::rect(vec![0.0, 2.0], vec![1.0, 1.0]),
            Err(ConfigurationError::InvalidBounds { index: 1, .. })
        ));
        assert!(Domain::rect(vec![0.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn projection() {
        let dom = Domain::uniform(3, 0.0, 1.0).unwrap();
        let mut x = dvector![-1.0, 0.5, 3.0];

        assert!(dom.project(&mut x));
        assert_eq!(x, dvector![0.0, 0.5, 1.0]);
        assert!(!dom.project(&mut x));
        assert!(dom.is_feasible(&x));
    }

    #[test]
    fn binding_only_when_pushed_outward() {
        let dom = Domain::uniform(4, 0.0, 1.0).unwrap();
        let x = dvector![0.0, 0.0, 1.0, 0.5];
        let g = dvector![1.0, -1.0, -1.0, 1.0];

        assert_eq!(dom.binding_set(&x, &g), vec![true, false, true, false]);
    }

    #[test]
    fn projected_gradient_vanishes_at_bound_optimum() {
        let dom = Domain::uniform(2, 0.0, 1.0).unwrap();
        let x = dvector![0.0, 0.5];
        let g = dvector![2.0, 0.0];

        assert_eq!(dom.projected_gradient(&x, &g), dvector![0.0, 0.0]);
    }

    #[test]
    fn unconstrained_projected_gradient_is_gradient() {
        let dom = Domain::unconstrained(2);
        let x = dvector![3.0, -4.0];
        let g = dvector![1.0, -2.0];

        assert_eq!(dom.projected_gradient(&x, &g), g);
    }
}
