//! Weighted sums of objective functions.
//!
//! Composite objectives are trees of three kinds of nodes: a leaf wrapping a
//! concrete [`Objective`], a scaled node multiplying its child by a
//! [`Weight`] and a sum node adding its children. All of them are evaluated
//! by recursively accumulating the value, gradient and Hessian action of the
//! children in the same model.
//!
//! ```rust
//! use geoinv::composite::Composite;
//! use geoinv::constraint::Volume;
//! use geoinv::nalgebra::dvector;
//! use geoinv::Objective;
//!
//! let vol = dvector![1.0, 1.0];
//! let a = Volume::new(vol.clone(), 1.0).unwrap();
//! let b = Volume::new(vol, 3.0).unwrap();
//!
//! let joint = Composite::leaf(a) + 1e2 * Composite::leaf(b);
//! let m = dvector![0.5, 0.5];
//!
//! assert_eq!(joint.apply(&m), 0.0 + 1e2 * 0.5 * 4.0);
//! ```

use std::{
    fmt,
    ops::{Add, Mul},
    rc::Rc,
};

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::core::{ConfigurationError, Objective};

/// Multiplier of a scaled node.
#[derive(Clone)]
pub enum Weight {
    /// Nonnegative constant.
    Constant(f64),
    /// A weight that is itself a function of the model. The product rule
    /// applies for derivatives.
    Function(Rc<dyn Objective>),
}

impl Weight {
    /// Creates a constant weight, rejecting negative values.
    pub fn constant(weight: f64) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_nonnegative("weight", weight).map(Weight::Constant)
    }

    /// Creates a model-dependent weight.
    pub fn function<W: Objective + 'static>(weight: W) -> Self {
        Weight::Function(Rc::new(weight))
    }
}

impl fmt::Debug for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Constant(w) => write!(f, "Constant({w})"),
            Weight::Function(w) => write!(f, "Function(dim = {})", w.dim()),
        }
    }
}

/// A composite objective.
#[derive(Clone)]
pub enum Composite {
    /// A concrete objective.
    Leaf(Rc<dyn Objective>),
    /// A child multiplied by a weight.
    Scaled(Weight, Box<Composite>),
    /// Sum of all children.
    Sum(Vec<Composite>),
}

impl Composite {
    /// Wraps a concrete objective.
    pub fn leaf<F: Objective + 'static>(f: F) -> Self {
        Composite::Leaf(Rc::new(f))
    }

    /// Wraps a shared objective, so that it can be evaluated on its own after
    /// being composed.
    pub fn shared(f: Rc<dyn Objective>) -> Self {
        Composite::Leaf(f)
    }

    /// Multiplies the objective by a weight.
    ///
    /// Negative constant weights are rejected.
    pub fn try_scaled(self, weight: Weight) -> Result<Self, ConfigurationError> {
        if let Weight::Constant(w) = weight {
            ConfigurationError::check_nonnegative("weight", w)?;
        }

        Ok(Composite::Scaled(weight, Box::new(self)))
    }

    /// Multiplies the objective by a constant.
    ///
    /// # Panics
    ///
    /// If the weight is negative.
    pub fn scaled(self, weight: f64) -> Self {
        assert!(weight >= 0.0, "weight must be nonnegative");
        Composite::Scaled(Weight::Constant(weight), Box::new(self))
    }

    /// Adds another objective. Nested sums are flattened.
    pub fn plus(self, other: Composite) -> Self {
        let mut terms = match self {
            Composite::Sum(terms) => terms,
            single => vec![single],
        };

        match other {
            Composite::Sum(other) => terms.extend(other),
            single => terms.push(single),
        }

        Composite::Sum(terms)
    }

    /// Number of concrete objectives in the tree.
    pub fn n_leaves(&self) -> usize {
        match self {
            Composite::Leaf(_) => 1,
            Composite::Scaled(_, child) => child.n_leaves(),
            Composite::Sum(terms) => terms.iter().map(Composite::n_leaves).sum(),
        }
    }

    fn accumulate(&self, m: &DVector<f64>, what: Accumulate<'_>, acc: &mut Accumulator) {
        match self {
            Composite::Leaf(f) => match what {
                Accumulate::Value => acc.value += f.apply(m),
                Accumulate::Gradient => acc.vector += f.gradient(m),
                Accumulate::HessianProduct(v) => acc.vector += f.hessian_product(m, v),
            },
            Composite::Scaled(Weight::Constant(w), child) => {
                let mut inner = Accumulator::zeros(acc.vector.len());
                child.accumulate(m, what, &mut inner);
                acc.value += *w * inner.value;
                acc.vector.axpy(*w, &inner.vector, 1.0);
            }
            Composite::Scaled(Weight::Function(w), child) => {
                let n = acc.vector.len();
                let wm = w.apply(m);

                match what {
                    Accumulate::Value => {
                        let mut fv = Accumulator::zeros(n);
                        child.accumulate(m, Accumulate::Value, &mut fv);
                        acc.value += wm * fv.value;
                    }
                    Accumulate::Gradient => {
                        // (w f)' = w f' + f w'
                        let mut fv = Accumulator::zeros(n);
                        let mut fg = Accumulator::zeros(n);
                        child.accumulate(m, Accumulate::Value, &mut fv);
                        child.accumulate(m, Accumulate::Gradient, &mut fg);

                        acc.vector.axpy(wm, &fg.vector, 1.0);
                        acc.vector.axpy(fv.value, &w.gradient(m), 1.0);
                    }
                    Accumulate::HessianProduct(v) => {
                        // (w f)'' v = w f'' v + (w'.v) f' + (f'.v) w' + f w'' v
                        let mut fv = Accumulator::zeros(n);
                        let mut fg = Accumulator::zeros(n);
                        let mut fh = Accumulator::zeros(n);
                        child.accumulate(m, Accumulate::Value, &mut fv);
                        child.accumulate(m, Accumulate::Gradient, &mut fg);
                        child.accumulate(m, Accumulate::HessianProduct(v), &mut fh);

                        let wg = w.gradient(m);

                        acc.vector.axpy(wm, &fh.vector, 1.0);
                        acc.vector.axpy(wg.dot(v), &fg.vector, 1.0);
                        acc.vector.axpy(fg.vector.dot(v), &wg, 1.0);
                        acc.vector.axpy(fv.value, &w.hessian_product(m, v), 1.0);
                    }
                }
            }
            Composite::Sum(terms) => {
                for term in terms {
                    term.accumulate(m, what, acc);
                }
            }
        }
    }

    fn first_dim(&self) -> Option<usize> {
        match self {
            Composite::Leaf(f) => Some(f.dim()),
            Composite::Scaled(_, child) => child.first_dim(),
            Composite::Sum(terms) => terms.iter().find_map(Composite::first_dim),
        }
    }
}

#[derive(Clone, Copy)]
enum Accumulate<'a> {
    Value,
    Gradient,
    HessianProduct(&'a DVector<f64>),
}

struct Accumulator {
    value: f64,
    vector: DVector<f64>,
}

impl Accumulator {
    fn zeros(n: usize) -> Self {
        Self {
            value: 0.0,
            vector: DVector::zeros(n),
        }
    }
}

impl Objective for Composite {
    fn dim(&self) -> usize {
        self.first_dim().unwrap_or(0)
    }

    fn apply(&self, m: &DVector<f64>) -> f64 {
        let mut acc = Accumulator::zeros(0);
        self.accumulate(m, Accumulate::Value, &mut acc);
        acc.value
    }

    fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
        let mut acc = Accumulator::zeros(m.len());
        self.accumulate(m, Accumulate::Gradient, &mut acc);
        acc.vector
    }

    fn hessian_product(&self, m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let mut acc = Accumulator::zeros(m.len());
        self.accumulate(m, Accumulate::HessianProduct(v), &mut acc);
        acc.vector
    }

    fn hessian(&self, m: &DVector<f64>) -> DMatrix<f64> {
        match self {
            Composite::Leaf(f) => f.hessian(m),
            Composite::Scaled(Weight::Constant(w), child) => child.hessian(m) * *w,
            Composite::Sum(terms) => {
                let n = m.len();
                terms
                    .iter()
                    .fold(DMatrix::zeros(n, n), |hes, term| hes + term.hessian(m))
            }
            Composite::Scaled(Weight::Function(_), _) => {
                debug!("assembling dense Hessian of a model-dependent weight from products");
                let n = m.len();
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
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Composite::Leaf(leaf) => write!(f, "Leaf(dim = {})", leaf.dim()),
            Composite::Scaled(w, child) => f.debug_tuple("Scaled").field(w).field(child).finish(),
            Composite::Sum(terms) => f.debug_tuple("Sum").field(terms).finish(),
        }
    }
}

impl Add for Composite {
    type Output = Composite;

    fn add(self, rhs: Composite) -> Self::Output {
        self.plus(rhs)
    }
}

impl Mul<Composite> for f64 {
    type Output = Composite;

    fn mul(self, rhs: Composite) -> Self::Output {
        rhs.scaled(self)
    }
}

impl Mul<f64> for Composite {
    type Output = Composite;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scaled(rhs)
    }
}
