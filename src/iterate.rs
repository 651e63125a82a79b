//! Bounded iterative refinement.
//!
//! The wavelength estimator, the n=1 length-scale search, the galaxy
//! optimizer and the orientation threshold search all share the same shape:
//! refine a state, measure how much it moved, stop once the residual drops
//! under tolerance or the iteration cap is hit. The cap is a hard failure,
//! never a silent fallback to the last iterate.

use crate::error::{Result, ShapeletError};

#[derive(Debug, Clone, Copy)]
pub struct Convergence {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Convergence {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

/// A converged state along with how it got there.
#[derive(Debug, Clone)]
pub struct Refined<T> {
    pub value: T,
    pub iterations: usize,
    pub residual: f64,
}

/// Drives `update` until `residual(prev, next) <= cfg.tolerance`.
///
/// `update` may fail (kernel construction, degenerate state); such errors
/// propagate immediately. Exceeding `cfg.max_iterations` yields
/// [`ShapeletError::NonConvergence`] tagged with `what`.
pub fn refine<T, U, R>(
    what: &'static str,
    initial: T,
    mut update: U,
    residual: R,
    cfg: &Convergence,
) -> Result<Refined<T>>
where
    U: FnMut(&T) -> Result<T>,
    R: Fn(&T, &T) -> f64,
{
    let mut current = initial;
    let mut last_residual = f64::INFINITY;

    for iteration in 1..=cfg.max_iterations {
        let next = update(&current)?;
        last_residual = residual(&current, &next);
        if last_residual <= cfg.tolerance {
            return Ok(Refined {
                value: next,
                iterations: iteration,
                residual: last_residual,
            });
        }
        current = next;
    }

    Err(ShapeletError::NonConvergence {
        what,
        iterations: cfg.max_iterations,
        residual: last_residual,
    })
}
