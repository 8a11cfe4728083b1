//! Forward-difference Jacobian estimation.
use nalgebra::{DVector, RealField};

use crate::error::{InverseError, Result};
use crate::utils::all_finite;
use crate::{ForwardTransform, Jacobian};

/// Estimate the Jacobian of a square transform with forward differences.
///
/// Evaluates `$F(\vec{x})$` once and `$F(\vec{x} + h\vec{e}_i)$` once per
/// axis. The perturbed point is rebuilt from `x` for every axis, so nothing
/// accumulates between columns.
pub fn forward_difference_jacobian<F, T>(
    transform: &T,
    x: &DVector<F>,
    step: F,
) -> Result<Jacobian<F>>
where
    F: RealField + Copy,
    T: ForwardTransform<F> + ?Sized,
{
    let (n, m) = transform.dimensions();
    if n != m {
        return Err(InverseError::NotSquare {
            source_dims: n,
            target_dims: m,
        });
    }
    InverseError::check_len(n, x.len())?;

    let qc = transform.apply(x);
    InverseError::check_len(n, qc.len())?;
    if !all_finite(&qc) {
        return Err(InverseError::NonFinite("transform output"));
    }

    let mut jacobian = Jacobian::zeros(n);
    let mut p = x.clone();
    for i in 0..n {
        p[i] = x[i] + step;
        let q = transform.apply(&p);
        p[i] = x[i];
        for j in 0..n {
            jacobian.set(j, i, (q[j] - qc[j]) / step);
        }
    }
    if !jacobian.as_matrix().iter().all(|v| v.is_finite()) {
        return Err(InverseError::NonFinite("finite differences"));
    }
    Ok(jacobian)
}
