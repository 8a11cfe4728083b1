//! Backtracking line search with a sufficient-decrease test.
use nalgebra::{DVector, RealField};
use tracing::trace;

use crate::utils::{all_finite, squared_distance};
use crate::ForwardTransform;

/// A candidate that passed the sufficient-decrease test.
#[derive(Clone, Debug, PartialEq)]
pub struct Trial<F: RealField> {
    /// `$\vec{x} + t\vec{u}$`.
    pub point: DVector<F>,
    /// `$F(\vec{x} + t\vec{u})$`.
    pub image: DVector<F>,
    /// `$\|F(\vec{x} + t\vec{u}) - \vec{y}\|^2$`.
    pub squared_error: F,
}

/// Outcome of [`BacktrackingLineSearch::search`].
#[derive(Clone, Debug, PartialEq)]
pub struct LineSearchResult<F: RealField> {
    /// The last step size tried, `$t_0\beta^k$`.
    ///
    /// When every try was rejected this is the step *after* the final
    /// shrink, `$t_0\beta^{\mathtt{max\_tries}}$`, which has not been evaluated.
    pub step: F,
    /// Number of shrink operations `$k$`.
    pub shrinks: usize,
    /// The accepted candidate, if any.
    pub accepted: Option<Trial<F>>,
}

impl<F: RealField> LineSearchResult<F> {
    pub fn is_accepted(&self) -> bool {
        self.accepted.is_some()
    }

    /// Number of forward evaluations the search performed.
    pub fn evaluations(&self) -> usize {
        if self.is_accepted() {
            self.shrinks + 1
        } else {
            self.shrinks
        }
    }
}

/// Armijo-style backtracking along a fixed direction.
///
/// Starting from `$t = t_0$`, the step `$t$` is accepted once
/// ```math
///   \|F(\vec{x} + t\vec{u}) - \vec{y}\|^2 < \|F(\vec{x}) - \vec{y}\|^2 - c\,t\,m
/// ```
/// and multiplied by `$\beta$` otherwise, for at most `max_tries` evaluations.
/// The expected decrease rate `$m$` is supplied by the caller; see
/// [`SufficientDecrease`](enum.SufficientDecrease.html).
#[derive(Debug)]
pub struct BacktrackingLineSearch<'a, F: RealField, T: ?Sized> {
    transform: &'a T,
    target: &'a DVector<F>,
    c: F,
    beta: F,
    max_tries: usize,
}

impl<'a, F, T> BacktrackingLineSearch<'a, F, T>
where
    F: RealField + Copy,
    T: ForwardTransform<F> + ?Sized,
{
    pub fn new(transform: &'a T, target: &'a DVector<F>, c: F, beta: F, max_tries: usize) -> Self {
        Self {
            transform,
            target,
            c,
            beta,
            max_tries,
        }
    }

    /// Search along `direction` from `x`, whose squared error is `fx`.
    pub fn search(
        &self,
        x: &DVector<F>,
        fx: F,
        direction: &DVector<F>,
        m: F,
        t0: F,
    ) -> LineSearchResult<F> {
        let mut t = t0;
        for k in 0..self.max_tries {
            let point = x + direction * t;
            let image = self.transform.apply(&point);
            if all_finite(&image) {
                let squared_error = squared_distance(&image, self.target);
                trace!(attempt = k, step = ?t, squared_error = ?squared_error, "line search");
                if squared_error < fx - self.c * t * m {
                    return LineSearchResult {
                        step: t,
                        shrinks: k,
                        accepted: Some(Trial {
                            point,
                            image,
                            squared_error,
                        }),
                    };
                }
            }
            t *= self.beta;
        }
        LineSearchResult {
            step: t,
            shrinks: self.max_tries,
            accepted: None,
        }
    }
}
