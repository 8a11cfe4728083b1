//! Iterative inversion of coordinate transforms, one point at a time, using
//! [nalgebra](https://nalgebra.org).
//!
//! Given a forward transform `$F\!:\R^n\to\R^n$` and a target `$\vec{y}$`,
//! this crate estimates a preimage by solving
//! ```math
//! \min_{\vec{x}\in\R^n}\ \|F(\vec{x}) - \vec{y}\|^2
//! ```
//! with a damped descent: each iteration picks a unit direction
//! `$\vec{u}$` and moves `$\vec{x}\leftarrow\vec{x}+t\vec{u}$`, where the step
//! `$t$` comes from a backtracking line search with an Armijo-style
//! sufficient-decrease test.
//!
//! # Inputs
//!
//! You must provide an implementation of [`ForwardTransform`]. The direction
//! `$\vec{u}$` comes from a [`JacobianSource`]:
//!
//! - [`JacobianSource::Exact`] uses the Jacobian returned by the transform and
//!   points along `$\mathbf{J}^{-1}(\vec{y} - F(\vec{x}))$`,
//! - [`JacobianSource::FiniteDifference`] estimates `$\mathbf{J}$` with forward
//!   differences first,
//! - [`JacobianSource::DisplacementField`] skips the Jacobian and follows the
//!   negated displacement `$-\vec{d}(\vec{x})$` of a deformation field
//!   `$F(\vec{x}) = \vec{x} + \vec{d}(\vec{x})$`.
//!
//! The hyperparameters live in [`SolverConfig`]. Inversions never panic on a
//! bad estimate: they return the best point found together with an
//! [`InversionReport`] whose [`Termination`] tells whether the tolerance was
//! reached. [`InverseError`] is reserved for broken preconditions and numeric
//! degeneracy.
//!
//! # Usage Example
//!
//! We invert `$F(x_1, x_2) \coloneqq (x_1 + \frac{1}{10}x_2^2,\ x_2 - \frac{1}{5}x_1)$`,
//! a smooth non-linear map with no convenient closed-form inverse.
//!
//! ```
//! # use approx::assert_relative_eq;
//! # use nalgebra::DVector;
//! use inverse_transform::{ForwardTransform, IterativeInverse};
//!
//! struct Bend;
//!
//! impl ForwardTransform<f64> for Bend {
//!     fn dimensions(&self) -> (usize, usize) {
//!         (2, 2)
//!     }
//!
//!     fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
//!         DVector::from_vec(vec![x[0] + 0.1 * x[1] * x[1], x[1] - 0.2 * x[0]])
//!     }
//! }
//!
//! // forward differences, since `Bend` has no analytic Jacobian
//! let invertible = IterativeInverse::new(Bend);
//! let p = DVector::from_vec(vec![1.0, 2.0]);
//! let y = invertible.apply(&p);
//! let (x, report) = invertible.apply_inverse(&y).unwrap();
//! assert!(report.is_converged());
//! assert_relative_eq!(x, p, epsilon = 1e-4);
//! ```
//!
//! # Deformation fields
//!
//! [`DeformationField`] and [`BSplineTransform`] describe a transform by its
//! displacement. [`InverseSolver::deformation_field`] inverts them in pixel
//! units without ever forming a Jacobian; switch to
//! [`InverseSolver::finite_difference`] when sub-pixel accuracy matters.
//!
//! # Derivative checking
//!
//! Use [`differentiate_numerically`] to compare a hand-written
//! [`ForwardTransform::jacobian`] against forward differences.

mod affine;
mod bspline;
mod direction;
mod error;
mod field;
mod grid;
mod invertible;
mod jacobian;
mod line_search;
mod solver;
mod transform;
mod utils;

pub use affine::Affine;
pub use bspline::{BSplineKernel, BSplineTransform};
pub use direction::{Direction, JacobianSource};
pub use error::{InverseError, Result};
pub use field::{scaling_field, DeformationField};
pub use grid::Grid;
pub use invertible::{InverseView, IterativeInverse};
pub use jacobian::Jacobian;
pub use line_search::{BacktrackingLineSearch, LineSearchResult, Trial};
pub use solver::{InverseSolver, InversionReport, SolverConfig, SufficientDecrease, Termination};
pub use transform::{ForwardTransform, Identity};

pub use utils::differentiate_numerically;
