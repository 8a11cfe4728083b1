//! Descent directions for the inverse search.
use nalgebra::{DVector, RealField};

use crate::error::{InverseError, Result};
use crate::utils::{all_finite, finite_difference::forward_difference_jacobian};
use crate::{ForwardTransform, Jacobian};

/// Where the solver gets its local derivative information from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum JacobianSource<F> {
    /// Use [`ForwardTransform::jacobian`].
    Exact,
    /// Estimate the Jacobian with forward differences of the given step.
    FiniteDifference { step: F },
    /// Use the negated displacement [`ForwardTransform::displacement`] at the
    /// current estimate as the search direction, without any Jacobian.
    ///
    /// For a deformation field `$F(\vec{x}) = \vec{x} + \vec{d}(\vec{x})$` the
    /// displacement at the current estimate approximates the correction that
    /// moves its image back toward the target.
    DisplacementField,
}

impl<F: RealField + Copy> JacobianSource<F> {
    /// Forward differences with step `$0.01$`.
    pub fn finite_difference() -> Self {
        Self::FiniteDifference {
            step: nalgebra::convert(0.01),
        }
    }

    /// Forward differences with a custom step.
    ///
    /// # Panics
    ///
    /// Panics if `$\mathtt{step} \leq 0$` or `step` is not finite.
    pub fn with_step(step: F) -> Self {
        assert!(
            step > F::zero() && step.is_finite(),
            "finite difference step must be > 0"
        );
        Self::FiniteDifference { step }
    }

    /// The Jacobian of `transform` at `x`.
    ///
    /// Returns `Ok(None)` for [`JacobianSource::DisplacementField`], which
    /// never builds one.
    pub fn jacobian<T>(&self, transform: &T, x: &DVector<F>) -> Result<Option<Jacobian<F>>>
    where
        T: ForwardTransform<F> + ?Sized,
    {
        match *self {
            Self::Exact => {
                let jacobian = transform
                    .jacobian(x)
                    .ok_or(InverseError::MissingJacobian)?;
                InverseError::check_len(x.len(), jacobian.dimension())?;
                Ok(Some(jacobian))
            }
            Self::FiniteDifference { step } => {
                forward_difference_jacobian(transform, x, step).map(Some)
            }
            Self::DisplacementField => Ok(None),
        }
    }

    /// Compute the unit direction in which to move `x` so that its image
    /// `fx` gets closer to `target`.
    pub fn direction_toward<T>(
        &self,
        transform: &T,
        x: &DVector<F>,
        fx: &DVector<F>,
        target: &DVector<F>,
    ) -> Result<Direction<F>>
    where
        T: ForwardTransform<F> + ?Sized,
    {
        match self.jacobian(transform, x)? {
            Some(jacobian) => Direction::from_jacobian(&jacobian, fx, target),
            None => {
                let displacement = transform
                    .displacement(x)
                    .ok_or(InverseError::MissingDisplacement)?;
                InverseError::check_len(x.len(), displacement.len())?;
                Direction::from_displacement(displacement)
            }
        }
    }
}

/// A normalized search direction together with the directional derivative
/// of the transform along it.
#[derive(Clone, Debug, PartialEq)]
pub struct Direction<F: RealField> {
    /// Unit vector in source space.
    pub unit: DVector<F>,
    /// `$\mathbf{J}\vec{u}$`, the rate of change of `$F$` along `unit`.
    pub derivative: DVector<F>,
}

impl<F: RealField + Copy> Direction<F> {
    /// `$\vec{u} = \mathbf{J}^{-1}(\vec{y} - F(\vec{x}))$`, normalized.
    pub fn from_jacobian(
        jacobian: &Jacobian<F>,
        fx: &DVector<F>,
        target: &DVector<F>,
    ) -> Result<Self> {
        InverseError::check_len(jacobian.dimension(), target.len())?;
        InverseError::check_len(jacobian.dimension(), fx.len())?;
        let err = target - fx;
        let dir = jacobian.inverse()?.apply_linear(&err);
        let unit = normalize(dir)?;
        let derivative = jacobian.apply_linear(&unit);
        Ok(Self { unit, derivative })
    }

    /// `$\vec{u} = -\vec{d}(\vec{x})$`, normalized. The transform is taken to
    /// be locally the identity plus a constant shift, so the derivative along
    /// `$\vec{u}$` is `$\vec{u}$` itself.
    pub fn from_displacement(displacement: DVector<F>) -> Result<Self> {
        let unit = normalize(-displacement)?;
        Ok(Self {
            derivative: unit.clone(),
            unit,
        })
    }

    /// The rate `$-\tfrac{d}{dt}\|F(\vec{x}+t\vec{u}) - \vec{y}\|^2$` at `$t=0$`,
    /// i.e. `$2\,(\vec{y}-F(\vec{x}))\cdot\mathbf{J}\vec{u}$`, clamped at zero.
    pub fn expected_decrease(&self, fx: &DVector<F>, target: &DVector<F>) -> F {
        let two: F = nalgebra::convert(2.0);
        let rate = two * (target - fx).dot(&self.derivative);
        if rate > F::zero() {
            rate
        } else {
            F::zero()
        }
    }
}

fn normalize<F: RealField + Copy>(v: DVector<F>) -> Result<DVector<F>> {
    let norm = v.norm();
    if norm.is_zero() || !norm.is_finite() {
        return Err(InverseError::DegenerateDirection);
    }
    let unit = v / norm;
    if !all_finite(&unit) {
        return Err(InverseError::DegenerateDirection);
    }
    Ok(unit)
}
