//! Augmented Jacobian matrices.
use nalgebra::{DMatrix, DVector, RealField};

use crate::error::{InverseError, Result};

/// The Jacobian of a transform at a point, stored as an augmented affine map.
///
/// For `$F\!:\R^n\to\R^n$` this is the `$n\times(n+1)$` matrix
/// `$[\mathbf{J}\,|\,\vec{b}]$` whose left block is the derivative
/// `$\mathbf{J} = \partial F/\partial\vec{x}$` and whose last column
/// `$\vec{b}$` is the image of `$\vec{0}$` under the linearization.
/// Exact Jacobians of affine transforms have `$\vec{b} = \vec{0}$` because
/// their derivative does not depend on the position.
#[derive(Clone, Debug, PartialEq)]
pub struct Jacobian<F: RealField> {
    matrix: DMatrix<F>,
}

impl<F: RealField> Jacobian<F> {
    /// The zero Jacobian on `$\R^n$`.
    pub fn zeros(n: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(n, n + 1),
        }
    }

    /// The Jacobian of the identity map on `$\R^n$`.
    pub fn identity(n: usize) -> Self {
        Self {
            matrix: DMatrix::identity(n, n + 1),
        }
    }

    /// Wrap an `$n\times n$` derivative with a zero translation column.
    pub fn from_linear(linear: &DMatrix<F>) -> Result<Self> {
        let n = linear.nrows();
        InverseError::check_len(n, linear.ncols())?;
        let mut jacobian = Self::zeros(n);
        jacobian.matrix.columns_mut(0, n).copy_from(linear);
        Ok(jacobian)
    }

    /// The tangent affine map of `$F$` at `$\vec{x}$`:
    /// `$\vec{z}\mapsto F(\vec{x}) + \mathbf{J}(\vec{z}-\vec{x})$`.
    pub fn from_linear_at(linear: &DMatrix<F>, x: &DVector<F>, fx: &DVector<F>) -> Result<Self> {
        let mut jacobian = Self::from_linear(linear)?;
        let n = jacobian.dimension();
        InverseError::check_len(n, x.len())?;
        InverseError::check_len(n, fx.len())?;
        let translation = fx - linear * x;
        jacobian.matrix.column_mut(n).copy_from(&translation);
        Ok(jacobian)
    }

    /// Build from the `$n(n+1)$` entries of the augmented matrix in row-major order.
    pub fn from_row_slice(n: usize, data: &[F]) -> Result<Self> {
        InverseError::check_len(n * (n + 1), data.len())?;
        Ok(Self {
            matrix: DMatrix::from_row_slice(n, n + 1, data),
        })
    }

    /// The dimension `$n$`.
    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    /// Entry at row `r` and column `c`; column `$n$` is the translation.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn get(&self, r: usize, c: usize) -> F {
        self.matrix[(r, c)].clone()
    }

    /// Set the entry at row `r` and column `c`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, r: usize, c: usize, value: F) {
        self.matrix[(r, c)] = value;
    }

    /// The derivative block `$\mathbf{J}$`.
    pub fn linear(&self) -> DMatrix<F> {
        let n = self.dimension();
        self.matrix.columns(0, n).into_owned()
    }

    /// The translation column `$\vec{b}$`.
    pub fn translation(&self) -> DVector<F> {
        self.matrix.column(self.dimension()).into_owned()
    }

    /// The full augmented matrix.
    pub fn as_matrix(&self) -> &DMatrix<F> {
        &self.matrix
    }

    /// Compute `$\mathbf{J}\vec{v} + \vec{b}$`.
    pub fn apply(&self, v: &DVector<F>) -> DVector<F> {
        let mut out = self.apply_linear(v);
        out += self.matrix.column(self.dimension());
        out
    }

    /// Compute `$\mathbf{J}\vec{v}$`, e.g. the directional derivative along `$\vec{v}$`.
    pub fn apply_linear(&self, v: &DVector<F>) -> DVector<F> {
        let n = self.dimension();
        self.matrix.columns(0, n) * v
    }

    /// The inverse affine map `$[\mathbf{J}^{-1}\,|\,-\mathbf{J}^{-1}\vec{b}]$`.
    ///
    /// Fails with [`InverseError::SingularJacobian`] if `$\mathbf{J}$` has no
    /// inverse or the inverse is not finite.
    pub fn inverse(&self) -> Result<Self> {
        let n = self.dimension();
        let inv = self
            .linear()
            .try_inverse()
            .ok_or(InverseError::SingularJacobian)?;
        if !inv.iter().all(|v| v.is_finite()) {
            return Err(InverseError::SingularJacobian);
        }
        let translation = -(&inv * self.translation());
        let mut inverse = Self::zeros(n);
        inverse.matrix.columns_mut(0, n).copy_from(&inv);
        inverse.matrix.column_mut(n).copy_from(&translation);
        Ok(inverse)
    }
}
