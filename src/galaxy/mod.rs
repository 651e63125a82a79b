//! # Galaxy decomposition
//!
//! The astronomy path: each extracted object (a postage stamp with a seed
//! centroid and scale from the source extractor) is refined, decomposed and
//! compressed independently. One object failing to converge never aborts the
//! rest of the batch.

use log::warn;
use ndarray::{s, Array2};

pub mod decompose;
pub mod optimize;

pub use decompose::{
    compressed_order_space, decompose, order_count, order_space, reconstruct, residual_energy,
};
pub use optimize::{refine_object, GalaxyDecomposition, OptimizerConfig};

use crate::error::{Result, ShapeletError};

/// One extracted object: corner bounds into the survey frame (lo inclusive,
/// hi exclusive, row-major), the object centroid in frame coordinates, and
/// the seed length scale.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub lo: [usize; 2],
    pub hi: [usize; 2],
    pub centroid: [f64; 2],
    pub beta: f64,
}

fn cut_stamp(data: &Array2<f32>, stamp: &Stamp) -> Result<Array2<f32>> {
    let (ny, nx) = data.dim();
    if stamp.lo[0] >= stamp.hi[0]
        || stamp.lo[1] >= stamp.hi[1]
        || stamp.hi[0] > ny
        || stamp.hi[1] > nx
    {
        return Err(ShapeletError::InvalidBounds(format!(
            "stamp {:?}..{:?} does not fit a {ny}x{nx} frame",
            stamp.lo, stamp.hi
        )));
    }
    Ok(data
        .slice(s![stamp.lo[0]..stamp.hi[0], stamp.lo[1]..stamp.hi[1]])
        .to_owned())
}

/// Decompose every stamp of a frame. Failures (bad bounds, non-convergent
/// refinement) are recorded per object and processing continues.
pub fn decompose_stamps(
    data: &Array2<f32>,
    stamps: &[Stamp],
    cfg: &OptimizerConfig,
) -> Vec<Result<GalaxyDecomposition>> {
    stamps
        .iter()
        .map(|stamp| {
            let image = cut_stamp(data, stamp)?;
            let relative = [
                stamp.centroid[0] - stamp.lo[0] as f64,
                stamp.centroid[1] - stamp.lo[1] as f64,
            ];
            refine_object(&image, stamp.beta, relative, cfg).map_err(|e| {
                warn!("object at {:?} failed: {e}", stamp.centroid);
                e
            })
        })
        .collect()
}
