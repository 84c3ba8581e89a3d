//! The collection of implemented algorithms.

pub mod conjugate_gradient;
pub mod projected_gncg;

pub use conjugate_gradient::ConjugateGradient;
pub use projected_gncg::{ProjectedGncg, ProjectedGncgOptions};
