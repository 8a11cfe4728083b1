use nalgebra::{DVector, RealField};

use crate::error::Result;
use crate::{ForwardTransform, Jacobian};

pub(crate) mod finite_difference;

/// Compute a forward-difference approximation of the Jacobian of `transform` at `x`.
///
/// Column `$i$` is `$\bigl(F(\vec{x} + h\vec{e}_i) - F(\vec{x})\bigr)/h$`,
/// which costs `$n+1$` evaluations of `$F$`. The translation column is left at zero.
///
/// The step `$h$` has to be small compared to the curvature of `$F$` and large
/// compared to the floating point noise in its evaluation. For affine
/// transforms any reasonable step gives the exact derivative up to rounding,
/// which makes this a convenient check for hand-written Jacobians.
///
/// # Example
///
/// ```
/// # use approx::assert_relative_eq;
/// # use nalgebra::DVector;
/// use inverse_transform::{differentiate_numerically, Affine, ForwardTransform};
///
/// #[rustfmt::skip]
/// let affine = Affine::from_row_slice(2, &[
///     2.0, 1.0, 0.5,
///     0.0, 3.0, -1.0,
/// ]).unwrap();
/// let x = DVector::from_vec(vec![0.3, -0.7]);
/// let numeric = differentiate_numerically(&affine, &x, 1e-6).unwrap();
/// let exact = affine.jacobian(&x).unwrap();
/// assert_relative_eq!(numeric.linear(), exact.linear(), epsilon = 1e-8);
/// ```
pub fn differentiate_numerically<F, T>(transform: &T, x: &DVector<F>, step: F) -> Result<Jacobian<F>>
where
    F: RealField + Copy,
    T: ForwardTransform<F> + ?Sized,
{
    finite_difference::forward_difference_jacobian(transform, x, step)
}

/// `$\|\vec{a} - \vec{b}\|^2$`.
pub(crate) fn squared_distance<F: RealField + Copy>(a: &DVector<F>, b: &DVector<F>) -> F {
    a.iter()
        .zip(b.iter())
        .fold(F::zero(), |acc, (&ai, &bi)| acc + (ai - bi) * (ai - bi))
}

pub(crate) fn all_finite<F: RealField>(v: &DVector<F>) -> bool {
    v.iter().all(|x| x.is_finite())
}
