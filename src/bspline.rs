//! Deformations given by B-spline weighted coefficient grids.
use nalgebra::{convert, try_convert, DVector, RealField};

use crate::error::{InverseError, Result};
use crate::grid::{Grid, Odometer};
use crate::ForwardTransform;

/// Centered B-spline basis function of order 0 to 3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BSplineKernel {
    order: usize,
}

impl BSplineKernel {
    /// # Panics
    ///
    /// Panics if `$\mathtt{order} > 3$`.
    pub fn new(order: usize) -> Self {
        assert!(order <= 3, "B-spline order must be at most 3");
        Self { order }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Half-width of the support, `$(\mathtt{order}+1)/2$`.
    pub fn support_radius<F: RealField>(&self) -> F {
        convert((self.order as f64 + 1.0) / 2.0)
    }

    /// Number of grid nodes with non-zero weight along one axis.
    pub fn support_width(&self) -> usize {
        self.order + 1
    }

    pub fn evaluate<F: RealField + Copy>(&self, u: F) -> F {
        let a = u.abs();
        let c = |v: f64| -> F { convert(v) };
        match self.order {
            0 => {
                if a < c(0.5) {
                    F::one()
                } else if a == c(0.5) {
                    c(0.5)
                } else {
                    F::zero()
                }
            }
            1 => {
                if a < F::one() {
                    F::one() - a
                } else {
                    F::zero()
                }
            }
            2 => {
                if a < c(0.5) {
                    c(0.75) - a * a
                } else if a < c(1.5) {
                    (c(1.5) - a) * (c(1.5) - a) / c(2.0)
                } else {
                    F::zero()
                }
            }
            _ => {
                let sq = u * u;
                if a < F::one() {
                    (c(4.0) - c(6.0) * sq + c(3.0) * sq * a) / c(6.0)
                } else if a < c(2.0) {
                    (c(8.0) - c(12.0) * a + c(6.0) * sq - sq * a) / c(6.0)
                } else {
                    F::zero()
                }
            }
        }
    }
}

/// `$F(\vec{x}) = \vec{x} + \sum_{\vec{k}} \vec{c}_{\vec{k}}\prod_d B\bigl((x_d - o_d)/s_d - k_d\bigr)$`
/// for a grid of coefficient vectors `$\vec{c}_{\vec{k}}$` with spacing `$\vec{s}$`
/// and offset `$\vec{o}$`.
///
/// # Identity fallback
///
/// Only points whose whole kernel support lies on the coefficient grid are
/// displaced. Everywhere else `apply` returns its input unchanged and
/// `displacement` returns zero.
#[derive(Clone, Debug, PartialEq)]
pub struct BSplineTransform<F> {
    kernel: BSplineKernel,
    coefficients: Grid<F>,
    spacing: DVector<F>,
    offset: DVector<F>,
}

impl<F: RealField + Copy> BSplineTransform<F> {
    /// `coefficients` must hold one `$n$`-vector per node of an
    /// `$n$`-dimensional grid.
    ///
    /// # Panics
    ///
    /// Panics if `$\mathtt{order} > 3$`.
    pub fn new(
        order: usize,
        coefficients: Grid<F>,
        spacing: DVector<F>,
        offset: DVector<F>,
    ) -> Result<Self> {
        let n = coefficients.ndim();
        InverseError::check_len(n, coefficients.components())?;
        InverseError::check_len(n, spacing.len())?;
        InverseError::check_len(n, offset.len())?;
        Ok(Self {
            kernel: BSplineKernel::new(order),
            coefficients,
            spacing,
            offset,
        })
    }

    pub fn kernel(&self) -> BSplineKernel {
        self.kernel
    }

    /// First support node and the point relative to it, in grid units;
    /// `None` if the support leaves the grid.
    fn support(&self, x: &DVector<F>) -> Option<(Vec<isize>, Vec<F>)> {
        let radius: F = self.kernel.support_radius();
        let width: F = convert(self.kernel.support_width() as f64);
        let mut start = Vec::with_capacity(x.len());
        let mut relative = Vec::with_capacity(x.len());
        for d in 0..x.len() {
            let p = (x[d] - self.offset[d]) / self.spacing[d];
            let first = (p - radius).ceil();
            let size: F = convert(self.coefficients.shape()[d] as f64);
            if !first.is_finite() || first < F::zero() || first + width > size {
                return None;
            }
            start.push(try_convert::<F, f64>(first)? as isize);
            relative.push(p - first);
        }
        Some((start, relative))
    }

    fn displacement_at(&self, x: &DVector<F>) -> DVector<F> {
        let n = x.len();
        let mut displacement = DVector::zeros(n);
        let Some((start, relative)) = self.support(x) else {
            return displacement;
        };
        let mut node = vec![0isize; n];
        for k in Odometer::new(&vec![self.kernel.support_width(); n]) {
            let mut weight = F::one();
            for d in 0..n {
                weight *= self.kernel.evaluate(relative[d] - convert(k[d] as f64));
                node[d] = start[d] + k[d] as isize;
            }
            if let Some(coefficient) = self.coefficients.get(&node) {
                for d in 0..n {
                    displacement[d] += weight * coefficient[d];
                }
            }
        }
        displacement
    }
}

impl<F: RealField + Copy> ForwardTransform<F> for BSplineTransform<F> {
    fn dimensions(&self) -> (usize, usize) {
        let n = self.coefficients.ndim();
        (n, n)
    }

    fn apply(&self, x: &DVector<F>) -> DVector<F> {
        x + self.displacement_at(x)
    }

    fn displacement(&self, x: &DVector<F>) -> Option<DVector<F>> {
        Some(self.displacement_at(x))
    }
}
