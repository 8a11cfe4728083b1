//! Dense displacement fields.
use nalgebra::{convert, try_convert, DVector, RealField};

use crate::error::{InverseError, Result};
use crate::grid::{Grid, Odometer};
use crate::ForwardTransform;

/// `$F(\vec{x}) = \vec{x} + \vec{d}(\vec{x})$` for a displacement field
/// `$\vec{d}$` sampled on the integer grid.
///
/// Between nodes the field is interpolated n-linearly. Nodes outside the
/// grid count as zero displacement, so the transform fades to the identity
/// within one node of the border and is the identity beyond it.
#[derive(Clone, Debug, PartialEq)]
pub struct DeformationField<F> {
    field: Grid<F>,
}

impl<F: RealField + Copy> DeformationField<F> {
    /// `field` must hold one `$n$`-vector per node of an `$n$`-dimensional grid.
    pub fn new(field: Grid<F>) -> Result<Self> {
        InverseError::check_len(field.ndim(), field.components())?;
        Ok(Self { field })
    }

    /// Sample the displacement `d(index)` at every node of a grid of the given shape.
    pub fn from_fn<G>(shape: Vec<usize>, d: G) -> Result<Self>
    where
        G: FnMut(&[usize]) -> DVector<F>,
    {
        let n = shape.len();
        Self::new(Grid::from_fn(shape, n, d)?)
    }

    pub fn grid(&self) -> &Grid<F> {
        &self.field
    }

    /// The interpolated displacement at `x`.
    pub fn displacement_at(&self, x: &DVector<F>) -> DVector<F> {
        let n = self.field.ndim();
        let mut displacement = DVector::zeros(n);
        let mut base = Vec::with_capacity(n);
        let mut frac = Vec::with_capacity(n);
        for d in 0..n {
            let floor = x[d].floor();
            // no corner of this cell is a node
            let size: F = convert(self.field.shape()[d] as f64);
            if !floor.is_finite() || floor < -F::one() || floor >= size {
                return displacement;
            }
            let Some(index) = try_convert::<F, f64>(floor) else {
                return displacement;
            };
            base.push(index as isize);
            frac.push(x[d] - floor);
        }

        let mut node = vec![0isize; n];
        for corner in Odometer::new(&vec![2; n]) {
            let mut weight = F::one();
            for d in 0..n {
                node[d] = base[d] + corner[d] as isize;
                weight *= if corner[d] == 1 {
                    frac[d]
                } else {
                    F::one() - frac[d]
                };
            }
            if weight.is_zero() {
                continue;
            }
            if let Some(value) = self.field.get(&node) {
                for d in 0..n {
                    displacement[d] += weight * value[d];
                }
            }
        }
        displacement
    }
}

impl<F: RealField + Copy> ForwardTransform<F> for DeformationField<F> {
    fn dimensions(&self) -> (usize, usize) {
        let n = self.field.ndim();
        (n, n)
    }

    fn apply(&self, x: &DVector<F>) -> DVector<F> {
        x + self.displacement_at(x)
    }

    fn displacement(&self, x: &DVector<F>) -> Option<DVector<F>> {
        Some(self.displacement_at(x))
    }
}

/// A field scaling the grid by `$1+s$` about `center`, i.e.
/// `$\vec{d}(\vec{x}) = s(\vec{x} - \vec{c})$`.
pub fn scaling_field<F: RealField + Copy>(
    shape: Vec<usize>,
    center: &DVector<F>,
    s: F,
) -> Result<DeformationField<F>> {
    InverseError::check_len(shape.len(), center.len())?;
    DeformationField::from_fn(shape, |index| {
        DVector::from_iterator(
            index.len(),
            index
                .iter()
                .zip(center.iter())
                .map(|(&i, &c)| s * (convert::<f64, F>(i as f64) - c)),
        )
    })
}
