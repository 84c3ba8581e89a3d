//! Core abstractions and types.
//!
//! *Users* are mainly interested in implementing the [`Objective`] trait for
//! their own terms and bounding the model with a [`Domain`].
//!
//! Algorithms *developers* are interested in implementing the [`Optimizer`]
//! trait.

mod base;
mod domain;
mod objective;
mod optimizer;

pub use base::*;
pub use domain::*;
pub use objective::*;
pub use optimizer::*;
