//! Small inversion problems with known answers.
use approx::assert_relative_eq;
use nalgebra::DVector;

use super::test_helpers::{Embedding, MockCall, MockTransform, Singularity, WrongWayShift};
use crate::error::InverseError;
use crate::{
    Affine, ForwardTransform, Identity, InverseSolver, JacobianSource, SolverConfig,
    SufficientDecrease, Termination,
};

fn v(data: &[f64]) -> DVector<f64> {
    DVector::from_row_slice(data)
}

#[test]
fn identity_converges_in_one_iteration() {
    let mut transform = MockTransform::new(Identity::new(3));
    let target = v(&[1.0, -2.0, 0.5]);
    let (x, report) = InverseSolver::exact().solve(&transform, &target).unwrap();
    assert_eq!(x, target);
    assert_eq!(report.termination, Termination::Converged);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.number_of_evaluations, 1);
    assert_eq!(report.residual, 0.0);
    assert_eq!(transform.calls(), [MockCall::Apply].as_ref());
}

#[test]
fn first_iteration_call_order() {
    let mut transform = MockTransform::new(Identity::new(2));
    let target = v(&[0.0, 0.0]);
    let guess = v(&[0.25, 0.0]);
    let solver = InverseSolver::exact().with_config(SolverConfig::new().with_max_iterations(1));
    let (x, report) = solver.solve_from(&transform, &target, &guess, 1.0).unwrap();
    // t = 1 and t = 0.5 overshoot, t = 0.25 lands on the target
    assert_eq!(
        transform.calls(),
        [
            MockCall::Apply,
            MockCall::Jacobian,
            MockCall::Apply,
            MockCall::Apply,
            MockCall::Apply,
        ]
        .as_ref()
    );
    assert_eq!(report.number_of_evaluations, 4);
    assert_eq!(report.termination, Termination::Converged);
    assert_relative_eq!(x, target);
}

#[test]
fn translated_affine() {
    #[rustfmt::skip]
    let affine = Affine::from_row_slice(2, &[
        1.0, 0.0, 3.0,
        0.0, 1.0, -4.0,
    ])
    .unwrap();
    let target = v(&[0.0, 0.0]);
    let (x, report) = InverseSolver::exact().solve(&affine, &target).unwrap();
    assert_eq!(report.termination, Termination::Converged);
    assert!(report.residual < 1e-6);
    assert_relative_eq!(x, v(&[-3.0, 4.0]), epsilon = 1e-6);
}

#[test]
fn exhausted_keeps_last_estimate() {
    let target = v(&[100.0]);
    let solver = InverseSolver::exact().with_config(SolverConfig::new().with_max_iterations(3));
    let (x, report) = solver.solve_from(&Identity::new(1), &target, &v(&[0.0]), 1.0).unwrap();
    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.iterations, 3);
    // unit steps toward the target
    assert_relative_eq!(x, v(&[3.0]));
    assert_relative_eq!(report.residual, 97.0);
    assert_eq!(
        report.check_converged(),
        Err(InverseError::NotConverged {
            residual: 97.0,
            iterations: 3
        })
    );
}

#[test]
fn stalled_keeps_previous_estimate() {
    let mut transform = MockTransform::new(WrongWayShift {
        shift: v(&[1.0, 0.0]),
    });
    let target = v(&[0.0, 0.0]);
    let (x, report) = InverseSolver::deformation_field()
        .solve(&transform, &target)
        .unwrap();
    assert_eq!(report.termination, Termination::Stalled);
    assert_eq!(report.iterations, 1);
    assert_eq!(x, target);
    assert_eq!(report.residual, 1.0);
    assert_eq!(transform.count(MockCall::Displacement), 1);
    assert_eq!(transform.count(MockCall::Jacobian), 0);
    // initial point, 16 rejected tries, one candidate
    assert_eq!(transform.count(MockCall::Apply), 18);
}

#[test]
fn constant_decrease_crawls_where_armijo_converges() {
    let target = v(&[0.0]);
    let guess = v(&[0.1]);
    let config = SolverConfig::new()
        .with_armijo_c(0.5)
        .with_tolerance(1e-8)
        .with_max_iterations(50);

    let solver = InverseSolver::exact()
        .with_config(config.with_sufficient_decrease(SufficientDecrease::Constant(1.0)));
    let (x, report) = solver.solve_from(&Identity::new(1), &target, &guess, 1.0).unwrap();
    // every line search runs out of tries until the step no longer moves x
    assert_eq!(report.termination, Termination::Stalled);
    assert!(x[0] < 0.1);
    assert!(report.residual > 0.09);

    let solver = InverseSolver::exact().with_config(config);
    let (x, report) = solver.solve_from(&Identity::new(1), &target, &guess, 1.0).unwrap();
    assert_eq!(report.termination, Termination::Converged);
    assert!(x[0].abs() < 1e-8);
}

#[test]
fn finite_difference_source() {
    #[rustfmt::skip]
    let affine = Affine::from_row_slice(2, &[
        2.0, 0.5, 1.0,
        -0.5, 1.5, 2.0,
    ])
    .unwrap();
    let p = v(&[0.7, -1.3]);
    let target = affine.apply(&p);
    let solver = InverseSolver::new(JacobianSource::with_step(1e-4));
    let (x, report) = solver.solve(&affine, &target).unwrap();
    assert!(report.is_converged());
    assert_relative_eq!(x, p, epsilon = 1e-5);
}

#[test]
fn precondition_errors() {
    let solver = InverseSolver::<f64>::finite_difference();
    assert_eq!(
        solver.solve(&Embedding, &v(&[0.0, 0.0])),
        Err(InverseError::NotSquare {
            source_dims: 2,
            target_dims: 3
        })
    );
    assert_eq!(
        solver.solve(&Identity::new(2), &v(&[0.0, 0.0, 0.0])),
        Err(InverseError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    );
    assert_eq!(
        solver.solve_from(&Identity::new(2), &v(&[0.0, 0.0]), &v(&[0.0]), 1.0),
        Err(InverseError::DimensionMismatch {
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(
        solver.solve(&Singularity, &v(&[1.0])),
        Err(InverseError::NonFinite("transform output"))
    );
}

#[test]
fn singular_jacobian_is_an_error() {
    #[rustfmt::skip]
    let collapse = Affine::from_row_slice(2, &[
        1.0, 0.0, 0.0,
        0.0, 0.0, 0.0,
    ])
    .unwrap();
    assert_eq!(
        InverseSolver::exact().solve(&collapse, &v(&[1.0, 1.0])),
        Err(InverseError::SingularJacobian)
    );
}

#[test]
#[should_panic(expected = "tolerance must be > 0")]
fn zero_tolerance() {
    InverseSolver::<f64>::exact().set_tolerance(0.0);
}

#[test]
#[should_panic(expected = "beta must be in (0, 1)")]
fn beta_out_of_range() {
    SolverConfig::<f64>::new().with_beta(1.0);
}
