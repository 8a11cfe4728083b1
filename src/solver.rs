use nalgebra::{convert, DVector, RealField};
use num_traits::{Float, ToPrimitive};
use tracing::debug;

use crate::error::{InverseError, Result};
use crate::line_search::{BacktrackingLineSearch, Trial};
use crate::utils::{all_finite, squared_distance};
use crate::{ForwardTransform, JacobianSource};

#[cfg(test)]
mod test_examples;
#[cfg(test)]
pub(crate) mod test_helpers;

/// How the line search computes the expected decrease `$m$` in its
/// sufficient-decrease test `$f(\vec{x}+t\vec{u}) < f(\vec{x}) - c\,t\,m$`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SufficientDecrease<F> {
    /// A fixed `$m$`, independent of the current point.
    ///
    /// `Constant(1)` is the simplified test commonly used for inverting
    /// deformation fields. Because `$m$` does not scale with the residual,
    /// the test becomes unsatisfiable once `$f(\vec{x}) < c\,t$`, so small
    /// tolerances need correspondingly small steps.
    Constant(F),
    /// `$m = 2\,(\vec{y} - F(\vec{x}))\cdot\mathbf{J}\vec{u}$`, the actual rate
    /// of decrease of the squared error along the direction, which makes the
    /// test the classical Armijo condition.
    DirectionalDerivative,
}

/// Hyperparameters of [`InverseSolver`].
///
/// Set once, then read by every inversion call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverConfig<F> {
    max_line_search_tries: usize,
    armijo_c: F,
    beta: F,
    max_iterations: usize,
    tolerance: F,
    initial_step_size: F,
    sufficient_decrease: SufficientDecrease<F>,
}

impl<F: RealField + Float> SolverConfig<F> {
    pub fn new() -> Self {
        Self {
            max_line_search_tries: 16,
            armijo_c: convert(1e-4),
            beta: convert(0.5),
            max_iterations: 1000,
            tolerance: convert(1e-6),
            initial_step_size: F::one(),
            sufficient_decrease: SufficientDecrease::DirectionalDerivative,
        }
    }

    /// Settings for inverting deformation fields in pixel units: stop once
    /// the residual drops below a quarter pixel, using the simplified
    /// constant sufficient-decrease test.
    pub fn deformation_field() -> Self {
        Self {
            max_line_search_tries: 16,
            armijo_c: convert(0.5),
            beta: convert(0.5),
            max_iterations: 200,
            tolerance: convert(0.25),
            initial_step_size: F::one(),
            sufficient_decrease: SufficientDecrease::Constant(F::one()),
        }
    }

    /// Set the maximal number of step sizes tried per line search.
    ///
    /// # Panics
    ///
    /// Panics if `$\mathtt{tries} = 0$`.
    pub fn with_max_line_search_tries(self, tries: usize) -> Self {
        assert!(tries > 0, "max_line_search_tries must be > 0");
        Self {
            max_line_search_tries: tries,
            ..self
        }
    }

    /// Set the constant `$c$` of the sufficient-decrease test.
    ///
    /// # Panics
    ///
    /// Panics unless `$0 < c < 1$`.
    pub fn with_armijo_c(self, armijo_c: F) -> Self {
        assert!(
            armijo_c > F::zero() && armijo_c < F::one(),
            "armijo_c must be in (0, 1)"
        );
        Self { armijo_c, ..self }
    }

    /// Set the factor `$\beta$` by which a rejected step is shrunk.
    ///
    /// # Panics
    ///
    /// Panics unless `$0 < \beta < 1$`.
    pub fn with_beta(self, beta: F) -> Self {
        assert!(
            beta > F::zero() && beta < F::one(),
            "beta must be in (0, 1)"
        );
        Self { beta, ..self }
    }

    /// Set the maximal number of iterations.
    ///
    /// # Panics
    ///
    /// Panics if `$\mathtt{max\_iterations} = 0$`.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.set_max_iterations(max_iterations);
        self
    }

    /// Set the residual `$\|F(\vec{x}) - \vec{y}\|$` below which the estimate
    /// counts as converged.
    ///
    /// # Panics
    ///
    /// Panics if `$\mathtt{tolerance} \leq 0$` or it is not finite.
    pub fn with_tolerance(mut self, tolerance: F) -> Self {
        self.set_tolerance(tolerance);
        self
    }

    /// Set the step size of the first line search.
    ///
    /// # Panics
    ///
    /// Panics if `$\mathtt{step} \leq 0$` or it is not finite.
    pub fn with_initial_step_size(self, step: F) -> Self {
        assert_positive(step, "initial_step_size must be > 0");
        Self {
            initial_step_size: step,
            ..self
        }
    }

    /// Choose how the expected decrease `$m$` is computed.
    ///
    /// # Panics
    ///
    /// Panics if a constant `$m$` is negative.
    pub fn with_sufficient_decrease(self, sufficient_decrease: SufficientDecrease<F>) -> Self {
        if let SufficientDecrease::Constant(m) = sufficient_decrease {
            assert!(!m.is_negative(), "constant sufficient decrease must be >= 0");
        }
        Self {
            sufficient_decrease,
            ..self
        }
    }

    pub fn set_tolerance(&mut self, tolerance: F) {
        assert_positive(tolerance, "tolerance must be > 0");
        self.tolerance = tolerance;
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        assert!(max_iterations > 0, "max_iterations must be > 0");
        self.max_iterations = max_iterations;
    }

    pub fn max_line_search_tries(&self) -> usize {
        self.max_line_search_tries
    }

    pub fn armijo_c(&self) -> F {
        self.armijo_c
    }

    pub fn beta(&self) -> F {
        self.beta
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn initial_step_size(&self) -> F {
        self.initial_step_size
    }

    pub fn sufficient_decrease(&self) -> SufficientDecrease<F> {
        self.sufficient_decrease
    }
}

impl<F: RealField + Float> Default for SolverConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

fn assert_positive<F: RealField + Float>(value: F, msg: &str) {
    assert!(value > F::zero() && Float::is_finite(value), "{}", msg);
}

/// Terminal state of an inversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The residual dropped below the tolerance.
    Converged,
    /// A step failed to reduce the residual; the estimate before that step is kept.
    Stalled,
    /// The iteration limit was hit.
    Exhausted,
}

/// Information about an inversion.
///
/// Every terminal state comes with the best estimate found, so check
/// `termination` (or [`is_converged`](#method.is_converged)) before trusting it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InversionReport<F> {
    pub termination: Termination,
    /// Number of iterations started.
    pub iterations: usize,
    /// `$\|F(\vec{x}) - \vec{y}\|$` at the returned estimate.
    pub residual: F,
    /// Number of forward evaluations, including the line searches but not
    /// the finite-difference Jacobians.
    pub number_of_evaluations: usize,
}

impl<F: RealField + Float> InversionReport<F> {
    pub fn is_converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Turn anything but [`Termination::Converged`] into [`InverseError::NotConverged`].
    pub fn check_converged(&self) -> Result<()> {
        if self.is_converged() {
            Ok(())
        } else {
            Err(InverseError::NotConverged {
                residual: ToPrimitive::to_f64(&self.residual).unwrap_or(f64::NAN),
                iterations: self.iterations,
            })
        }
    }
}

/// Iterative estimation of `$F^{-1}(\vec{y})$` for a single point.
///
/// Each iteration computes a unit descent direction from the configured
/// [`JacobianSource`], runs a [`BacktrackingLineSearch`] starting at the
/// previously accepted step size and moves the estimate if that lowers the
/// residual `$\|F(\vec{x}) - \vec{y}\|$`.
///
/// The solver holds only its configuration. All working vectors live on the
/// stack of [`solve`](#method.solve), so one solver may serve concurrent
/// inversions of the same transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InverseSolver<F> {
    config: SolverConfig<F>,
    source: JacobianSource<F>,
}

impl<F: RealField + Float> InverseSolver<F> {
    pub fn new(source: JacobianSource<F>) -> Self {
        Self {
            config: SolverConfig::new(),
            source,
        }
    }

    /// Solver using the transform's analytic Jacobian.
    pub fn exact() -> Self {
        Self::new(JacobianSource::Exact)
    }

    /// Solver estimating the Jacobian with forward differences.
    pub fn finite_difference() -> Self {
        Self::new(JacobianSource::finite_difference())
    }

    /// Solver following the negated displacement of a deformation field,
    /// configured with [`SolverConfig::deformation_field`].
    pub fn deformation_field() -> Self {
        Self {
            config: SolverConfig::deformation_field(),
            source: JacobianSource::DisplacementField,
        }
    }

    pub fn with_config(self, config: SolverConfig<F>) -> Self {
        Self { config, ..self }
    }

    pub fn config(&self) -> &SolverConfig<F> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SolverConfig<F> {
        &mut self.config
    }

    pub fn source(&self) -> JacobianSource<F> {
        self.source
    }

    /// See [`SolverConfig::set_tolerance`].
    pub fn set_tolerance(&mut self, tolerance: F) {
        self.config.set_tolerance(tolerance);
    }

    /// See [`SolverConfig::set_max_iterations`].
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.config.set_max_iterations(max_iterations);
    }

    /// Estimate `$F^{-1}(\vec{y})$`, starting at `$\vec{y}$` itself.
    pub fn solve<T>(&self, transform: &T, target: &DVector<F>) -> Result<(DVector<F>, InversionReport<F>)>
    where
        T: ForwardTransform<F> + ?Sized,
    {
        self.solve_from(transform, target, target, self.config.initial_step_size)
    }

    /// Estimate `$F^{-1}(\vec{y})$` from an explicit initial guess and step size.
    pub fn solve_from<T>(
        &self,
        transform: &T,
        target: &DVector<F>,
        guess: &DVector<F>,
        initial_step_size: F,
    ) -> Result<(DVector<F>, InversionReport<F>)>
    where
        T: ForwardTransform<F> + ?Sized,
    {
        let (n, m) = transform.dimensions();
        if n != m {
            return Err(InverseError::NotSquare {
                source_dims: n,
                target_dims: m,
            });
        }
        InverseError::check_len(n, target.len())?;
        InverseError::check_len(n, guess.len())?;

        let config = &self.config;
        let mut x = guess.clone();
        let mut fx = transform.apply(&x);
        InverseError::check_len(n, fx.len())?;
        if !all_finite(&fx) {
            return Err(InverseError::NonFinite("transform output"));
        }
        let mut squared_error = squared_distance(&fx, target);
        let mut step = initial_step_size;

        let mut report = InversionReport {
            termination: Termination::Exhausted,
            iterations: 0,
            residual: Float::sqrt(squared_error),
            number_of_evaluations: 1,
        };
        let line_search = BacktrackingLineSearch::new(
            transform,
            target,
            config.armijo_c,
            config.beta,
            config.max_line_search_tries,
        );

        while report.iterations < config.max_iterations {
            report.iterations += 1;
            if report.residual < config.tolerance {
                report.termination = Termination::Converged;
                break;
            }

            let direction = self.source.direction_toward(transform, &x, &fx, target)?;
            let m = match config.sufficient_decrease {
                SufficientDecrease::Constant(m) => m,
                SufficientDecrease::DirectionalDerivative => {
                    direction.expected_decrease(&fx, target)
                }
            };

            let search = line_search.search(&x, squared_error, &direction.unit, m, step);
            report.number_of_evaluations += search.evaluations();
            step = search.step;

            let trial = match search.accepted {
                Some(trial) => trial,
                None => {
                    let point = &x + &direction.unit * step;
                    let image = transform.apply(&point);
                    report.number_of_evaluations += 1;
                    let candidate_error = if all_finite(&image) {
                        squared_distance(&image, target)
                    } else {
                        Float::infinity()
                    };
                    Trial {
                        point,
                        image,
                        squared_error: candidate_error,
                    }
                }
            };

            if trial.squared_error >= squared_error {
                debug!(
                    iteration = report.iterations,
                    residual = ?report.residual,
                    step = ?step,
                    "no improvement along the search direction"
                );
                report.termination = Termination::Stalled;
                break;
            }

            x = trial.point;
            fx = trial.image;
            squared_error = trial.squared_error;
            report.residual = Float::sqrt(squared_error);
            debug!(
                iteration = report.iterations,
                residual = ?report.residual,
                step = ?step,
                shrinks = search.shrinks,
                "accepted step"
            );

            if report.residual < config.tolerance {
                report.termination = Termination::Converged;
                break;
            }
        }

        Ok((x, report))
    }
}

impl<F: RealField + Float> Default for InverseSolver<F> {
    fn default() -> Self {
        Self::finite_difference()
    }
}
