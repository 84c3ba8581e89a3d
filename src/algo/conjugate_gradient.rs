//! Matrix-free conjugate gradient restricted to a subset of variables.
//!
//! Solves `A x = b` where `A` is only available through its action on a
//! vector. Variables outside of the free set are held at zero, which solves
//! the reduced system `A_ff x_f = b_f` without assembling it.
//!
//! # References
//!
//! \[1\] [Numerical
//! Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)

use log::debug;
use nalgebra::DVector;

/// Result of [`ConjugateGradient::solve`].
#[derive(Debug, Clone)]
pub struct CgSolution {
    /// Approximate solution. Zero outside of the free set.
    pub x: DVector<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Relative residual `||b - A x|| / ||b||` on the free set.
    pub relative_residual: f64,
    /// Whether the relative residual reached the tolerance.
    pub converged: bool,
    /// Whether a direction of nonpositive curvature was encountered.
    pub nonpositive_curvature: bool,
}

/// Conjugate gradient solver.
#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradient {
    max_iter: usize,
    tol: f64,
}

impl ConjugateGradient {
    /// Creates the solver with iteration cap and relative residual tolerance.
    pub fn new(max_iter: usize, tol: f64) -> Self {
        Self { max_iter, tol }
    }

    /// Solves the system on the free variables.
    ///
    /// Stops when the relative residual drops below the tolerance, when the
    /// iteration cap is reached or when the operator shows nonpositive
    /// curvature along the search direction. In the last case the iterate
    /// computed so far is returned, or the right-hand side if that happened
    /// in the first iteration.
    pub fn solve<A>(&self, mut apply: A, b: &DVector<f64>, free: &[bool]) -> CgSolution
    where
        A: FnMut(&DVector<f64>) -> DVector<f64>,
    {
        let mask = |v: &mut DVector<f64>| {
            for (vi, &is_free) in v.iter_mut().zip(free) {
                if !is_free {
                    *vi = 0.0;
                }
            }
        };

        let mut x = DVector::zeros(b.len());
        let mut r = b.clone();
        mask(&mut r);

        let b_norm = r.norm();
        if b_norm == 0.0 {
            return CgSolution {
                x,
                iterations: 0,
                relative_residual: 0.0,
                converged: true,
                nonpositive_curvature: false,
            };
        }

        let mut p = r.clone();
        let mut rs = r.norm_squared();
        let mut iterations = 0;
        let mut nonpositive_curvature = false;

        while iterations < self.max_iter {
            let mut ap = apply(&p);
            mask(&mut ap);

            let curvature = p.dot(&ap);
            if curvature <= 0.0 {
                debug!("nonpositive curvature {} in CG iteration {}", curvature, iterations);
                nonpositive_curvature = true;

                if iterations == 0 {
                    x.copy_from(&r);
                }
                break;
            }

            let alpha = rs / curvature;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            iterations += 1;

            let rs_new = r.norm_squared();
            if rs_new.sqrt() <= self.tol * b_norm {
                rs = rs_new;
                break;
            }

            p *= rs_new / rs;
            p += &r;
            rs = rs_new;
        }

        let relative_residual = rs.sqrt() / b_norm;
        let converged = !nonpositive_curvature && relative_residual <= self.tol;

        debug!(
            "CG: {} iterations, relative residual = {:.3e}",
            iterations, relative_residual
        );

        CgSolution {
            x,
            iterations,
            relative_residual,
            converged,
            nonpositive_curvature,
        }
    }
}
