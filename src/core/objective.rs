use std::rc::Rc;

use nalgebra::{DMatrix, DVector};

/// Definition of a scalar objective function of the model vector.
///
/// ## Defining an objective
///
/// An objective must be able to compute its value, the gradient and the action
/// of its Hessian on a direction. The dense Hessian has a default
/// implementation assembled from Hessian-vector products.
///
/// ```rust
/// use geoinv::nalgebra::DVector;
/// use geoinv::Objective;
///
/// // f(m) = 0.5 * || m ||^2
/// struct HalfNormSquared {
///     n: usize,
/// }
///
/// impl Objective for HalfNormSquared {
///     fn dim(&self) -> usize {
///         self.n
///     }
///
///     fn apply(&self, m: &DVector<f64>) -> f64 {
///         0.5 * m.norm_squared()
///     }
///
///     fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
///         m.clone()
///     }
///
///     fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
///         v.clone()
///     }
/// }
/// ```
pub trait Objective {
    /// Number of model parameters the objective expects.
    fn dim(&self) -> usize;

    /// Calculates the objective value in given model.
    fn apply(&self, m: &DVector<f64>) -> f64;

    /// Calculates the gradient in given model.
    fn gradient(&self, m: &DVector<f64>) -> DVector<f64>;

    /// Calculates the action of the Hessian in model `m` on the direction
    /// `v`.
    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64>;

    /// Assembles the dense Hessian matrix in given model.
    ///
    /// **Expensive.** The matrix has O(n²) entries and the default
    /// implementation makes `n` calls to
    /// [`hessian_product`](Objective::hessian_product). Prefer the product form
    /// whenever possible.
    fn hessian(&self, m: &DVector<f64>) -> DMatrix<f64> {
        let n = self.dim();
        let mut hes = DMatrix::zeros(n, n);
        let mut e = DVector::zeros(n);

        for j in 0..n {
            e[j] = 1.0;
            hes.set_column(j, &self.hessian_product(m, &e));
            e[j] = 0.0;
        }

        hes
    }
}

impl<T: Objective + ?Sized> Objective for &T {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        (**self).apply(m)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        (**self).gradient(m)
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        (**self).hessian_product(m, v)
    }

    fn hessian(&self, m: &DVector<f64>) -> DMatrix<f64> {
        (**self).hessian(m)
    }
}

impl<T: Objective + ?Sized> Objective for Box<T> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        (**self).apply(m)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        (**self).gradient(m)
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        (**self).hessian_product(m, v)
    }

    fn hessian(&self, m: &DVector<f64>) -> DMatrix<f64> {
        (**self).hessian(m)
    }
}

impl<T: Objective + ?Sized> Objective for Rc<T> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        (**self).apply(m)
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        (**self).gradient(m)
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        (**self).hessian_product(m, v)
    }

    fn hessian(&self, m: &DVector<f64>) -> DMatrix<f64> {
        (**self).hessian(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    // f(x, y) = x^2 + x y + 3 y^2
    struct Mixed;

    impl Objective for Mixed {
        fn dim(&self) -> usize {
            2
        }

        fn apply(&self, m: &DVector<f64>) -> f64 {
            m[0].powi(2) + m[0] * m[1] + 3.0 * m[1].powi(2)
        }

        fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
            dvector![2.0 * m[0] + m[1], m[0] + 6.0 * m[1]]
        }

        fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
            dvector![2.0 * v[0] + v[1], v[0] + 6.0 * v[1]]
        }
    }

    #[test]
    fn default_dense_hessian() {
        let hes = Mixed.hessian(&dvector![1.0, -1.0]);
        assert_abs_diff_eq!(hes, dmatrix![2.0, 1.0; 1.0, 6.0]);
    }

    #[test]
    fn forwarding_impls() {
        let m = dvector![0.5, 2.0];
        let boxed: Box<dyn Objective> = Box::new(Mixed);
        let shared = Rc::new(Mixed);

        assert_eq!(boxed.apply(&m), Mixed.apply(&m));
        assert_eq!(shared.gradient(&m), Mixed.gradient(&m));
        assert_eq!(boxed.dim(), 2);
    }
}
