use nalgebra::{DVector, RealField};

use crate::Jacobian;

/// A forward coordinate transform `$F\!:\R^n\to\R^m$`.
///
/// This is all [`InverseSolver`](struct.InverseSolver.html) needs to
/// estimate `$F^{-1}$`. See the [module documentation](index.html) for a
/// usage example.
///
/// Implementations must be pure with respect to `apply`: the solver calls it
/// many times per inversion and never mutates the transform, so a transform
/// backed by shared, immutable data can be inverted from several threads at
/// once.
pub trait ForwardTransform<F: RealField> {
    /// Number of source and target dimensions `$(n, m)$`.
    fn dimensions(&self) -> (usize, usize);

    /// Compute `$F(\vec{x})$`.
    fn apply(&self, x: &DVector<F>) -> DVector<F>;

    /// The exact Jacobian of `$F$` at `$\vec{x}$`, if the transform knows it.
    ///
    /// Affine-family transforms return their linear part with a zero
    /// translation column.
    fn jacobian(&self, _x: &DVector<F>) -> Option<Jacobian<F>> {
        None
    }

    /// The displacement `$F(\vec{x}) - \vec{x}$` read directly from the
    /// transform's field, for deformation-field transforms.
    fn displacement(&self, _x: &DVector<F>) -> Option<DVector<F>> {
        None
    }
}

impl<F: RealField, T: ForwardTransform<F> + ?Sized> ForwardTransform<F> for &T {
    fn dimensions(&self) -> (usize, usize) {
        (**self).dimensions()
    }

    fn apply(&self, x: &DVector<F>) -> DVector<F> {
        (**self).apply(x)
    }

    fn jacobian(&self, x: &DVector<F>) -> Option<Jacobian<F>> {
        (**self).jacobian(x)
    }

    fn displacement(&self, x: &DVector<F>) -> Option<DVector<F>> {
        (**self).displacement(x)
    }
}

/// The identity map on `$\R^n$`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub dimensions: usize,
}

impl Identity {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl<F: RealField + Copy> ForwardTransform<F> for Identity {
    fn dimensions(&self) -> (usize, usize) {
        (self.dimensions, self.dimensions)
    }

    fn apply(&self, x: &DVector<F>) -> DVector<F> {
        x.clone()
    }

    fn jacobian(&self, x: &DVector<F>) -> Option<Jacobian<F>> {
        Some(Jacobian::identity(x.len()))
    }
}
