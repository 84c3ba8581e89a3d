#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Geoinv
//!
//! A pure Rust framework for geophysical inverse problems.
//!
//! Given observed data `dobs` and a forward simulation `F`, the goal is to
//! recover a model `m` of physical properties on a mesh. The problem is
//! ill-posed, so the recovered model minimizes a combination of a data misfit
//! and a regularization
//!
//! ```text
//! Φ(m) = φ_d(m) + β φ_m(m),
//!
//! where φ_d(m) = 0.5 || W (F(m) - dobs) ||²
//! ```
//!
//! subject to bounds `lower <= m <= upper`. Prior knowledge such as the total
//! volume of an anomalous body enters the objective as an additional weighted
//! term.
//!
//! ## Components
//!
//! * [`Objective`] -- Scalar function of the model with gradient and
//!   Hessian-vector product. Objectives combine into weighted sums with the
//!   [`Composite`](composite::Composite) algebra.
//! * [Data misfit](data_misfit) -- Weighted least squares between predicted and
//!   observed data.
//! * [Regularization](regularization) -- Tikhonov smallness and smoothness
//!   on a [tensor mesh](mesh::TensorMesh).
//! * [Volume constraint](constraint) -- Penalty on the deviation of the model
//!   volume from a known value.
//! * [Survey](survey) -- Sources, receivers and their projection onto the
//!   mesh, and synthetic data generation.
//! * [Projected GN-CG](algo::projected_gncg) -- Projected Gauss-Newton
//!   optimizer with conjugate gradient inner solves.
//! * [Driver](driver) -- Runs the optimizer, invokes
//!   [directives](directives) and decides when to stop.
//!
//! ## Inverting
//!
//! ```rust
//! use geoinv::nalgebra::DVector;
//! use geoinv::composite::Composite;
//! use geoinv::constraint::{GradientSign, Volume};
//! use geoinv::driver::Inversion;
//! use geoinv::mesh::TensorMesh;
//! use geoinv::regularization::Tikhonov;
//! use geoinv::Domain;
//! # use geoinv::Objective;
//! #
//! # // Stand-in for a data misfit that prefers the model 0.5 everywhere.
//! # struct Misfit(usize);
//! #
//! # impl Objective for Misfit {
//! #     fn dim(&self) -> usize {
//! #         self.0
//! #     }
//! #
//! #     fn apply(&self, m: &DVector<f64>) -> f64 {
//! #         0.5 * m.map(|mi| mi - 0.5).norm_squared()
//! #     }
//! #
//! #     fn gradient(&self, m: &DVector<f64>) -> DVector<f64> {
//! #         m.map(|mi| mi - 0.5)
//! #     }
//! #
//! #     fn hessian_product(&self, _m: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
//! #         v.clone()
//! #     }
//! # }
//!
//! let mesh = TensorMesh::uniform(&[4, 4], &[1.0, 1.0]).expect("valid mesh");
//! let n = 16;
//!
//! let volume = Volume::on_mesh(&mesh, 0.25)
//!     .expect("valid volume")
//!     .with_gradient_sign(GradientSign::Derivative);
//! let phi = Composite::leaf(Misfit(n)) + 10.0 * Composite::leaf(volume);
//! let reg = Tikhonov::new(&mesh);
//!
//! let mut inversion = Inversion::builder(&phi, &reg)
//!     .with_beta(1e-3)
//!     .with_domain(Domain::uniform(n, 0.0, 1.0).expect("valid bounds"))
//!     .build()
//!     .expect("valid setup");
//!
//! let result = inversion.run(DVector::zeros(n)).expect("no optimizer error");
//! println!("{}: phi_d = {}", result.termination, result.phi_d);
//! ```
//!
//! ## License
//!
//! Licensed under MIT.

pub mod algo;
pub mod composite;
pub mod constraint;
mod core;
pub mod data_misfit;
pub mod derivatives;
pub mod directives;
pub mod driver;
pub mod mapping;
pub mod mesh;
pub mod regularization;
pub mod simulation;
pub mod sparse;
pub mod survey;

pub use core::*;
pub use driver::Inversion;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
pub use nalgebra_sparse;
