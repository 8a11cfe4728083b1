//! Affine transforms with an exact Jacobian.
use nalgebra::{DMatrix, DVector, RealField};

use crate::error::{InverseError, Result};
use crate::{ForwardTransform, Jacobian};

/// `$F(\vec{x}) = \mathbf{A}\vec{x} + \vec{b}$` on `$\R^n$`.
#[derive(Clone, Debug, PartialEq)]
pub struct Affine<F: RealField> {
    matrix: DMatrix<F>,
    translation: DVector<F>,
}

impl<F: RealField + Copy> Affine<F> {
    pub fn new(matrix: DMatrix<F>, translation: DVector<F>) -> Result<Self> {
        InverseError::check_len(matrix.nrows(), matrix.ncols())?;
        InverseError::check_len(matrix.nrows(), translation.len())?;
        Ok(Self {
            matrix,
            translation,
        })
    }

    /// Build from the `$n(n+1)$` entries of `$[\mathbf{A}\,|\,\vec{b}]$` in row-major order.
    pub fn from_row_slice(n: usize, data: &[F]) -> Result<Self> {
        let augmented = Jacobian::from_row_slice(n, data)?;
        Ok(Self {
            matrix: augmented.linear(),
            translation: augmented.translation(),
        })
    }

    pub fn matrix(&self) -> &DMatrix<F> {
        &self.matrix
    }

    pub fn translation(&self) -> &DVector<F> {
        &self.translation
    }

    /// The analytic inverse `$\vec{y}\mapsto\mathbf{A}^{-1}(\vec{y} - \vec{b})$`.
    pub fn try_inverse(&self) -> Result<Self> {
        let matrix = self
            .matrix
            .clone()
            .try_inverse()
            .ok_or(InverseError::SingularJacobian)?;
        let translation = -(&matrix * &self.translation);
        Ok(Self {
            matrix,
            translation,
        })
    }
}

impl<F: RealField + Copy> ForwardTransform<F> for Affine<F> {
    fn dimensions(&self) -> (usize, usize) {
        (self.matrix.ncols(), self.matrix.nrows())
    }

    fn apply(&self, x: &DVector<F>) -> DVector<F> {
        &self.matrix * x + &self.translation
    }

    fn jacobian(&self, _x: &DVector<F>) -> Option<Jacobian<F>> {
        Jacobian::from_linear(&self.matrix).ok()
    }
}
