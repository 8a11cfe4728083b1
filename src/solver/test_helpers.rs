use core::cell::RefCell;

use nalgebra::DVector;

use crate::{ForwardTransform, Jacobian};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Apply,
    Jacobian,
    Displacement,
}

/// Wraps a transform and records every call the solver makes.
pub struct MockTransform<T> {
    inner: T,
    call_history: RefCell<Vec<MockCall>>,
}

impl<T> MockTransform<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            call_history: RefCell::new(vec![]),
        }
    }

    pub fn calls(&mut self) -> &[MockCall] {
        self.call_history.get_mut().as_slice()
    }

    pub fn count(&mut self, call: MockCall) -> usize {
        self.calls().iter().filter(|&c| *c == call).count()
    }
}

impl<T: ForwardTransform<f64>> ForwardTransform<f64> for MockTransform<T> {
    fn dimensions(&self) -> (usize, usize) {
        self.inner.dimensions()
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        self.call_history.borrow_mut().push(MockCall::Apply);
        self.inner.apply(x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Option<Jacobian<f64>> {
        self.call_history.borrow_mut().push(MockCall::Jacobian);
        self.inner.jacobian(x)
    }

    fn displacement(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        self.call_history.borrow_mut().push(MockCall::Displacement);
        self.inner.displacement(x)
    }
}

/// `$F(\vec{x}) = \vec{x} + \vec{s}$` whose reported displacement has the wrong sign.
pub struct WrongWayShift {
    pub shift: DVector<f64>,
}

impl ForwardTransform<f64> for WrongWayShift {
    fn dimensions(&self) -> (usize, usize) {
        (self.shift.len(), self.shift.len())
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        x + &self.shift
    }

    fn displacement(&self, _x: &DVector<f64>) -> Option<DVector<f64>> {
        Some(-&self.shift)
    }
}

/// Maps `$\R^2$` to `$\R^3$`.
pub struct Embedding;

impl ForwardTransform<f64> for Embedding {
    fn dimensions(&self) -> (usize, usize) {
        (2, 3)
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![x[0], x[1], 0.0])
    }
}

/// Blows up away from the origin.
pub struct Singularity;

impl ForwardTransform<f64> for Singularity {
    fn dimensions(&self) -> (usize, usize) {
        (1, 1)
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        x.map(|v| if v == 0.0 { v } else { f64::NAN })
    }
}
