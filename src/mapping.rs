//! Differentiable maps from model parameters to physical properties.
//!
//! A forward simulation usually does not work with the model parameters
//! directly. For example, a model of log-conductivity is mapped to
//! conductivity with [`ExpMap`]. Maps compose with [`Mapping::compose`] (or
//! [`ComposedMap::new`]) and the derivative of the composition follows the
//! chain rule.

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::core::ConfigurationError;
use crate::sparse;

/// Interface of a differentiable mapping.
pub trait Mapping {
    /// Number of model parameters the mapping accepts.
    fn n_params(&self) -> usize;

    /// Maps the model to the property vector.
    fn apply(&self, m: &DVector<f64>) -> DVector<f64>;

    /// Derivative (Jacobian) of the mapping in given model.
    fn derivative(&self, m: &DVector<f64>) -> CsrMatrix<f64>;

    /// Composes the mapping after `inner`, that is, `self(inner(m))`.
    fn compose<M>(self, inner: M) -> ComposedMap
    where
        Self: Sized + 'static,
        M: Mapping + 'static,
    {
        ComposedMap {
            outer: Box::new(self),
            inner: Box::new(inner),
        }
    }
}

impl<M: Mapping + ?Sized> Mapping for Box<M> {
    fn n_params(&self) -> usize {
        M::n_params(self)
    }

    fn apply(&self, m: &DVector<f64>) -> DVector<f64> {
        M::apply(self, m)
    }

    fn derivative(&self, m: &DVector<f64>) -> CsrMatrix<f64> {
        M::derivative(self, m)
    }
}

/// Identity mapping.
#[derive(Debug, Clone)]
pub struct IdentityMap {
    n: usize,
}

impl IdentityMap {
    /// Creates the identity on `n` parameters.
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Mapping for IdentityMap {
    fn n_params(&self) -> usize {
        self.n
    }

    fn apply(&self, m: &DVector<f64>) -> DVector<f64> {
        m.clone()
    }

    fn derivative(&self, _: &DVector<f64>) -> CsrMatrix<f64> {
        CsrMatrix::identity(self.n)
    }
}

/// Elementwise exponential, `exp(m)`.
#[derive(Debug, Clone)]
pub struct ExpMap {
    n: usize,
}

impl ExpMap {
    /// Creates the mapping on `n` parameters.
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Mapping for ExpMap {
    fn n_params(&self) -> usize {
        self.n
    }

    fn apply(&self, m: &DVector<f64>) -> DVector<f64> {
        m.map(f64::exp)
    }

    fn derivative(&self, m: &DVector<f64>) -> CsrMatrix<f64> {
        sparse::diagonal(&m.map(f64::exp))
    }
}

/// Elementwise natural logarithm, `ln(m)`.
///
/// Only defined for positive models.
#[derive(Debug, Clone)]
pub struct LogMap {
    n: usize,
}

impl LogMap {
    /// Creates the mapping on `n` parameters.
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Mapping for LogMap {
    fn n_params(&self) -> usize {
        self.n
    }

    fn apply(&self, m: &DVector<f64>) -> DVector<f64> {
        m.map(f64::ln)
    }

    fn derivative(&self, m: &DVector<f64>) -> CsrMatrix<f64> {
        sparse::diagonal(&m.map(f64::recip))
    }
}

/// Elementwise affine mapping, `scale * m + offset`.
#[derive(Debug, Clone)]
pub struct AffineMap {
    scale: DVector<f64>,
    offset: DVector<f64>,
}

impl AffineMap {
    /// Creates the mapping with per-parameter scale and offset.
    pub fn new(scale: DVector<f64>, offset: DVector<f64>) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_dim("affine map offset", scale.len(), offset.len())?;
        Ok(Self { scale, offset })
    }

    /// Creates the mapping with the same scale and offset for all `n`
    /// parameters.
    pub fn uniform(n: usize, scale: f64, offset: f64) -> Self {
        Self {
            scale: DVector::from_element(n, scale),
            offset: DVector::from_element(n, offset),
        }
    }
}

impl Mapping for AffineMap {
    fn n_params(&self) -> usize {
        self.scale.len()
    }

    fn apply(&self, m: &DVector<f64>) -> DVector<f64> {
        m.component_mul(&self.scale) + &self.offset
    }

    fn derivative(&self, _: &DVector<f64>) -> CsrMatrix<f64> {
        sparse::diagonal(&self.scale)
    }
}

/// Composition of two mappings, `outer(inner(m))`.
pub struct ComposedMap {
    outer: Box<dyn Mapping>,
    inner: Box<dyn Mapping>,
}

impl ComposedMap {
    /// Composes `outer` after `inner`.
    ///
    /// The number of properties produced by `inner` must match the number of
    /// parameters accepted by `outer`. Mappings do not declare their output
    /// size, so this is only asserted in debug builds.
    pub fn new<O, I>(outer: O, inner: I) -> Self
    where
        O: Mapping + 'static,
        I: Mapping + 'static,
    {
        outer.compose(inner)
    }
}

impl Mapping for ComposedMap {
    fn n_params(&self) -> usize {
        self.inner.n_params()
    }

    fn apply(&self, m: &DVector<f64>) -> DVector<f64> {
        let inner = self.inner.apply(m);
        debug_assert_eq!(inner.len(), self.outer.n_params());
        self.outer.apply(&inner)
    }

    fn derivative(&self, m: &DVector<f64>) -> CsrMatrix<f64> {
        let inner = self.inner.apply(m);
        let outer_d = self.outer.derivative(&inner);
        let inner_d = self.inner.derivative(m);
        &outer_d * &inner_d
    }
}

impl std::fmt::Debug for ComposedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMap")
            .field("n_params", &self.n_params())
            .finish_non_exhaustive()
    }
}
