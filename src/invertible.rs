use nalgebra::{DVector, RealField};
use num_traits::Float;
use tracing::warn;

use crate::error::Result;
use crate::{ForwardTransform, InverseSolver, InversionReport, Jacobian, Termination};

/// A forward transform paired with the solver that inverts it.
///
/// `apply` is the forward transform; `apply_inverse` runs the
/// [`InverseSolver`] seeded with the target itself. Use
/// [`inverse`](#method.inverse) to get a view with the two roles swapped.
///
/// # Example
///
/// ```
/// # use approx::assert_relative_eq;
/// # use nalgebra::DVector;
/// use inverse_transform::{Affine, ForwardTransform, IterativeInverse};
///
/// #[rustfmt::skip]
/// let affine = Affine::from_row_slice(2, &[
///     1.5, 0.2, 4.0,
///     -0.1, 0.8, -2.0,
/// ]).unwrap();
/// let invertible = IterativeInverse::with_exact_jacobian(affine);
/// let p = DVector::from_vec(vec![1.0, 2.0]);
/// let y = invertible.apply(&p);
/// let (x, report) = invertible.apply_inverse(&y).unwrap();
/// assert!(report.is_converged());
/// assert_relative_eq!(x, p, epsilon = 1e-5);
/// ```
#[derive(Clone, Debug)]
pub struct IterativeInverse<T, F> {
    transform: T,
    solver: InverseSolver<F>,
}

impl<T, F> IterativeInverse<T, F>
where
    F: RealField + Float,
    T: ForwardTransform<F>,
{
    /// Invert with forward-difference Jacobians.
    pub fn new(transform: T) -> Self {
        Self::with_solver(transform, InverseSolver::finite_difference())
    }

    /// Invert with the transform's own Jacobian.
    pub fn with_exact_jacobian(transform: T) -> Self {
        Self::with_solver(transform, InverseSolver::exact())
    }

    /// Invert a displacement-field transform with [`InverseSolver::deformation_field`].
    pub fn deformation_field(transform: T) -> Self {
        Self::with_solver(transform, InverseSolver::deformation_field())
    }

    pub fn with_solver(transform: T, solver: InverseSolver<F>) -> Self {
        Self { transform, solver }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn into_inner(self) -> T {
        self.transform
    }

    pub fn solver(&self) -> &InverseSolver<F> {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut InverseSolver<F> {
        &mut self.solver
    }

    /// See [`SolverConfig::set_tolerance`](crate::SolverConfig::set_tolerance).
    pub fn set_tolerance(&mut self, tolerance: F) {
        self.solver.set_tolerance(tolerance);
    }

    /// See [`SolverConfig::set_max_iterations`](crate::SolverConfig::set_max_iterations).
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.solver.set_max_iterations(max_iterations);
    }

    /// Estimate the preimage of `target`, starting at `target`.
    pub fn apply_inverse(&self, target: &DVector<F>) -> Result<(DVector<F>, InversionReport<F>)> {
        self.apply_inverse_from(target, target, self.solver.config().initial_step_size())
    }

    /// Estimate the preimage of `target` from an explicit guess and initial step size.
    pub fn apply_inverse_from(
        &self,
        target: &DVector<F>,
        guess: &DVector<F>,
        initial_step_size: F,
    ) -> Result<(DVector<F>, InversionReport<F>)> {
        let (x, report) =
            self.solver
                .solve_from(&self.transform, target, guess, initial_step_size)?;
        if report.termination != Termination::Converged {
            warn!(
                termination = ?report.termination,
                iterations = report.iterations,
                residual = ?report.residual,
                "inverse did not converge, returning best estimate"
            );
        }
        Ok((x, report))
    }

    /// Like [`apply_inverse`](#method.apply_inverse) but fails with
    /// [`InverseError::NotConverged`](crate::InverseError::NotConverged)
    /// unless the residual reached the tolerance.
    pub fn apply_inverse_converged(&self, target: &DVector<F>) -> Result<DVector<F>> {
        let (x, report) = self.apply_inverse(target)?;
        report.check_converged()?;
        Ok(x)
    }

    /// The inverse view, whose `apply` estimates the preimage.
    pub fn inverse(&self) -> InverseView<'_, T, F> {
        InverseView { forward: self }
    }
}

impl<T, F> ForwardTransform<F> for IterativeInverse<T, F>
where
    F: RealField + Float,
    T: ForwardTransform<F>,
{
    fn dimensions(&self) -> (usize, usize) {
        self.transform.dimensions()
    }

    fn apply(&self, x: &DVector<F>) -> DVector<F> {
        self.transform.apply(x)
    }

    fn jacobian(&self, x: &DVector<F>) -> Option<Jacobian<F>> {
        self.transform.jacobian(x)
    }

    fn displacement(&self, x: &DVector<F>) -> Option<DVector<F>> {
        self.transform.displacement(x)
    }
}

/// `$F^{-1}$` as seen through an [`IterativeInverse`].
///
/// Nothing is solved in advance: every call to [`apply`](#method.apply)
/// runs the solver of the underlying adapter.
#[derive(Debug)]
pub struct InverseView<'a, T, F> {
    forward: &'a IterativeInverse<T, F>,
}

impl<T, F> Clone for InverseView<'_, T, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, F> Copy for InverseView<'_, T, F> {}

impl<'a, T, F> InverseView<'a, T, F>
where
    F: RealField + Float,
    T: ForwardTransform<F>,
{
    /// `$(m, n)$` for a forward transform with dimensions `$(n, m)$`.
    pub fn dimensions(&self) -> (usize, usize) {
        let (n, m) = self.forward.dimensions();
        (m, n)
    }

    /// Estimate `$F^{-1}(\vec{y})$`.
    pub fn apply(&self, y: &DVector<F>) -> Result<(DVector<F>, InversionReport<F>)> {
        self.forward.apply_inverse(y)
    }

    /// `$F(\vec{x})$`, the exact inverse of this view.
    pub fn apply_inverse(&self, x: &DVector<F>) -> DVector<F> {
        self.forward.apply(x)
    }

    pub fn inverse(&self) -> &'a IterativeInverse<T, F> {
        self.forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InverseError;
    use crate::{Affine, Identity, SolverConfig};
    use approx::assert_relative_eq;

    fn v(data: &[f64]) -> DVector<f64> {
        DVector::from_row_slice(data)
    }

    fn shear() -> Affine<f64> {
        #[rustfmt::skip]
        let affine = Affine::from_row_slice(2, &[
            1.0, 0.5, -1.0,
            0.0, 1.0, 2.0,
        ])
        .unwrap();
        affine
    }

    #[test]
    fn forward_and_inverse() {
        let invertible = IterativeInverse::new(shear());
        let p = v(&[2.0, -3.0]);
        let y = invertible.apply(&p);
        assert_relative_eq!(y, v(&[-0.5, -1.0]));
        let (x, report) = invertible.apply_inverse(&y).unwrap();
        assert!(report.is_converged());
        assert_relative_eq!(x, p, epsilon = 1e-5);
        assert_relative_eq!(invertible.apply_inverse_converged(&y).unwrap(), x);
    }

    #[test]
    fn explicit_guess() {
        let invertible = IterativeInverse::with_exact_jacobian(shear());
        let y = v(&[-0.5, -1.0]);
        let (x, report) = invertible
            .apply_inverse_from(&y, &v(&[2.0, -3.0]), 1.0)
            .unwrap();
        assert_eq!(report.iterations, 1);
        assert_eq!(x, v(&[2.0, -3.0]));
    }

    #[test]
    fn view_swaps_roles() {
        let invertible = IterativeInverse::with_exact_jacobian(shear());
        let view = invertible.inverse();
        let p = v(&[0.25, 4.0]);
        let y = view.apply_inverse(&p);
        assert_eq!(y, invertible.apply(&p));
        let (x, _) = view.apply(&y).unwrap();
        assert_relative_eq!(x, p, epsilon = 1e-5);
        assert_eq!(view.inverse().apply(&p), y);
        assert_eq!(view.dimensions(), (2, 2));
    }

    #[test]
    fn not_converged() {
        let mut invertible = IterativeInverse::with_exact_jacobian(Identity::new(1));
        invertible.set_max_iterations(2);
        invertible.solver_mut().config_mut().set_tolerance(1e-3);
        // start far from the target with a unit step
        let (x, report) = invertible
            .apply_inverse_from(&v(&[10.0]), &v(&[0.0]), 1.0)
            .unwrap();
        assert_eq!(report.termination, Termination::Exhausted);
        assert_relative_eq!(x, v(&[2.0]));

        invertible.solver_mut().config_mut().set_max_iterations(1);
        assert!(invertible.apply_inverse_converged(&v(&[0.0])).is_ok());
        let bounded = IterativeInverse::with_solver(
            Identity::new(1),
            InverseSolver::exact().with_config(SolverConfig::new().with_max_iterations(1)),
        );
        assert_eq!(
            bounded.apply_inverse_from(&v(&[5.0]), &v(&[0.0]), 1.0).unwrap().1.residual,
            4.0
        );
    }

    #[test]
    fn missing_jacobian() {
        struct Opaque;
        impl ForwardTransform<f64> for Opaque {
            fn dimensions(&self) -> (usize, usize) {
                (1, 1)
            }
            fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
                x * 2.0
            }
        }

        let invertible = IterativeInverse::with_exact_jacobian(Opaque);
        assert_eq!(
            invertible.apply_inverse(&v(&[1.0])),
            Err(InverseError::MissingJacobian)
        );
        let invertible = IterativeInverse::new(invertible.into_inner());
        assert_relative_eq!(
            invertible.apply_inverse_converged(&v(&[1.0])).unwrap(),
            v(&[0.5]),
            epsilon = 1e-6
        );
    }
}
