//! Local pattern orientation.
//!
//! Three stages: mask the orientation field where the response magnitude
//! clears an iteratively lowered threshold, grey-dilate to spread well-defined
//! orientations into the voids, then median-blend into a continuous field.
//! The threshold starts at the top of the normalized response range and drops
//! until the blended field has almost no undefined pixels left.

use log::debug;
use ndarray::{s, Array2};

use super::morphology::{grey_dilation, median_filter, trim_edges};
use crate::config::PatternOrder;
use crate::error::{Result, ShapeletError};
use crate::iterate::{refine, Convergence};
use crate::response::{convresponse_n0, NormMode, ShapeletOrder};

/// Orders carried by the filter bank; the pattern picks one plane out of it.
const ORIENTATION_ORDERS: u32 = 6;

const THRESHOLD_STEP: f32 = 0.01;
const VOID_TOLERANCE: f64 = 0.01;
const MAX_THRESHOLD_STEPS: usize = 101;

/// Output of the orientation pipeline. All fields are trimmed by half a
/// wavelength relative to the input image.
#[derive(Debug, Clone)]
pub struct Orientation {
    /// Orientation restricted to well-defined pixels, zero elsewhere.
    pub mask: Array2<f32>,
    /// Mask after grey dilation.
    pub dilated: Array2<f32>,
    /// Final blended orientation field, continuous modulo the pattern
    /// symmetry.
    pub field: Array2<f32>,
    /// Upper bound of the angular range, 2*pi / m.
    pub max_angle: f32,
    /// Response threshold the search accepted.
    pub threshold: f32,
}

#[derive(Clone)]
struct ThresholdState {
    threshold: f32,
    mask: Array2<f32>,
    dilated: Array2<f32>,
    field: Array2<f32>,
    void_fraction: f64,
}

/// Local pattern orientation of a single-symmetry image.
///
/// Images carrying more than one dominant symmetry are out of contract; the
/// result is unspecified for them.
pub fn orientation(image: &Array2<f32>, lambda: f64, pattern: PatternOrder) -> Result<Orientation> {
    let response = convresponse_n0(
        image,
        lambda,
        ShapeletOrder::Max(ORIENTATION_ORDERS),
        NormMode::Individual,
    )?;
    let idx = pattern.symmetry() as usize - 1;
    let orient = response.phi.slice(s![.., .., idx]).to_owned();
    let magnitude = response.omega.slice(s![.., .., idx]).to_owned();

    let dilation_size = (2.0 * lambda).round() as usize;
    let blend_size = (4.0 * lambda).round() as usize;

    let evaluate = |threshold: f32| -> Result<ThresholdState> {
        let masked = ndarray::Zip::from(&orient)
            .and(&magnitude)
            .map_collect(|&angle, &resp| if resp > threshold { angle } else { 0.0 });
        let mask = trim_edges(&masked, lambda)?;
        let dilated = grey_dilation(&mask, dilation_size);
        let field = median_filter(&dilated, blend_size);
        let void_fraction =
            field.iter().filter(|&&v| v == 0.0).count() as f64 / field.len() as f64;
        Ok(ThresholdState {
            threshold,
            mask,
            dilated,
            field,
            void_fraction,
        })
    };

    let initial = evaluate(1.0)?;
    let refined = refine(
        "orientation threshold search",
        initial,
        |state| {
            if state.void_fraction <= VOID_TOLERANCE {
                return Ok(state.clone());
            }
            let threshold = state.threshold - THRESHOLD_STEP;
            if threshold < -THRESHOLD_STEP / 2.0 {
                return Err(ShapeletError::NonConvergence {
                    what: "orientation threshold search",
                    iterations: MAX_THRESHOLD_STEPS,
                    residual: state.void_fraction,
                });
            }
            debug!(
                "orientation void fraction {:.4}, lowering threshold to {threshold:.2}",
                state.void_fraction
            );
            evaluate(threshold)
        },
        |_, next| next.void_fraction,
        &Convergence::new(VOID_TOLERANCE, MAX_THRESHOLD_STEPS),
    )?;

    let state = refined.value;
    debug!(
        "orientation successful with void fraction {:.4} at threshold {:.2}",
        state.void_fraction, state.threshold
    );
    Ok(Orientation {
        mask: state.mask,
        dilated: state.dilated,
        field: state.field,
        max_angle: pattern.max_angle(),
        threshold: state.threshold,
    })
}
