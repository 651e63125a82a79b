//! Response distance: per-pixel minimum Euclidean distance to a reference
//! set of response vectors.
//!
//! The pairwise minimum scan is the hottest loop in the crate, so it lives
//! behind a narrow flat-buffer interface that a caller could swap for any
//! other compiled implementation without touching the orchestration above it.

use log::debug;
use ndarray::{Array2, Axis};
use rayon::prelude::*;

use super::cluster::kmeans;
use crate::error::{Result, ShapeletError};
use crate::response::{convresponse_n0, NormMode, ShapeletOrder};

/// Minimum distance from each test vector to the reference set.
///
/// Both buffers hold row-major vectors of length `dim`. No N x M distance
/// matrix is formed; each test vector streams over the references once.
/// Misaligned buffer lengths are rejected, never truncated.
pub fn min_distances(refs: &[f32], tests: &[f32], dim: usize) -> Result<Vec<f32>> {
    if dim == 0 || refs.is_empty() {
        return Err(ShapeletError::DimensionMismatch {
            expected: dim.max(1),
            actual: refs.len(),
        });
    }
    if refs.len() % dim != 0 {
        return Err(ShapeletError::DimensionMismatch {
            expected: dim,
            actual: refs.len(),
        });
    }
    if tests.len() % dim != 0 {
        return Err(ShapeletError::DimensionMismatch {
            expected: dim,
            actual: tests.len(),
        });
    }

    Ok(tests
        .par_chunks_exact(dim)
        .map(|t| {
            let mut best = f32::INFINITY;
            for r in refs.chunks_exact(dim) {
                let mut acc = 0.0f32;
                for (a, b) in r.iter().zip(t.iter()) {
                    let d = a - b;
                    acc += d * d;
                }
                best = best.min(acc);
            }
            best.sqrt()
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct ResponseDistanceConfig {
    pub shapelet_order: ShapeletOrder,
    /// Clusters formed over the reference region; 0 keeps the whole
    /// reference set.
    pub num_clusters: usize,
    /// Inclusive column bounds of the reference region.
    pub ux: [usize; 2],
    /// Inclusive row bounds of the reference region.
    pub uy: [usize; 2],
    pub seed: u64,
}

impl Default for ResponseDistanceConfig {
    fn default() -> Self {
        Self {
            shapelet_order: ShapeletOrder::Default,
            num_clusters: 20,
            ux: [0, 0],
            uy: [0, 0],
            seed: super::cluster::DEFAULT_SEED,
        }
    }
}

/// Response distance scalar field over the whole image. Larger values mark
/// pixels less like the reference region.
pub fn response_distance(
    image: &Array2<f32>,
    lambda: f64,
    cfg: &ResponseDistanceConfig,
) -> Result<Array2<f32>> {
    let (ny, nx) = image.dim();
    if cfg.ux[0] > cfg.ux[1] || cfg.uy[0] > cfg.uy[1] || cfg.ux[1] >= nx || cfg.uy[1] >= ny {
        return Err(ShapeletError::InvalidBounds(format!(
            "reference region x={:?} y={:?} does not fit a {ny}x{nx} image",
            cfg.ux, cfg.uy
        )));
    }

    let response = convresponse_n0(image, lambda, cfg.shapelet_order, NormMode::Vector)?;
    let dim = response.orders();

    let mut reference = Vec::with_capacity(
        (cfg.uy[1] - cfg.uy[0] + 1) * (cfg.ux[1] - cfg.ux[0] + 1) * dim,
    );
    for i in cfg.uy[0]..=cfg.uy[1] {
        for j in cfg.ux[0]..=cfg.ux[1] {
            for k in 0..dim {
                reference.push(response.omega[[i, j, k]]);
            }
        }
    }

    let reference = if cfg.num_clusters != 0 {
        let matrix =
            Array2::from_shape_vec((reference.len() / dim, dim), reference).expect("row-major");
        let clustering = kmeans(matrix.view(), cfg.num_clusters, cfg.seed)?;
        let distortion: f32 =
            clustering.distances.iter().sum::<f32>() / clustering.distances.len() as f32;
        debug!(
            "k-means complete with {} centroids, distortion {distortion:.3}",
            cfg.num_clusters
        );
        clustering.centroids.as_slice().expect("standard layout").to_vec()
    } else {
        debug!("computing response distance against the unclustered reference set");
        reference
    };

    let tests = response.vectors();
    let flat = min_distances(&reference, tests.as_slice().expect("standard layout"), dim)?;
    Ok(Array2::from_shape_vec((ny, nx), flat).expect("pixel count"))
}

/// Minimum distances of each row of `tests` against the rows of `refs`;
/// array-level wrapper over the flat kernel.
pub fn min_distances_2d(refs: &Array2<f32>, tests: &Array2<f32>) -> Result<Vec<f32>> {
    if refs.ncols() != tests.ncols() {
        return Err(ShapeletError::DimensionMismatch {
            expected: refs.ncols(),
            actual: tests.ncols(),
        });
    }
    let dim = refs.ncols();
    let r: Vec<f32> = refs.axis_iter(Axis(0)).flat_map(|v| v.to_vec()).collect();
    let t: Vec<f32> = tests.axis_iter(Axis(0)).flat_map(|v| v.to_vec()).collect();
    min_distances(&r, &t, dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn nearest_reference_by_euclidean_norm() {
        let refs = [2.0f32, 5.0, 9.0, 3.0, 4.0, 6.0, 1.0, 5.0, 7.0];
        let tests = [3.0f32, 4.0, 8.0, 5.0, 2.0, 7.0];
        let d = min_distances(&refs, &tests, 3).unwrap();
        assert_eq!(d.len(), 2);
        assert_relative_eq!(d[0], 1.7320508, epsilon = 1e-5);
        assert_relative_eq!(d[1], 3.0, epsilon = 1e-5);
    }

    #[test]
    fn self_distance_is_zero() {
        let refs = [2.0f32, 5.0, 9.0, 3.0, 4.0, 6.0, 1.0, 5.0, 7.0];
        let d = min_distances(&refs, &refs, 3).unwrap();
        assert!(d.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn misaligned_buffers_are_rejected() {
        let refs = [1.0f32, 2.0, 3.0, 4.0];
        let tests = [1.0f32, 2.0, 3.0];
        assert!(min_distances(&refs, &tests, 3).is_err());
        assert!(min_distances(&tests, &refs, 3).is_err());
        assert!(min_distances(&tests, &tests, 0).is_err());
        assert!(min_distances(&[], &tests, 3).is_err());
    }

    #[test]
    fn array_wrapper_checks_vector_lengths() {
        let refs = array![[1.0f32, 2.0], [3.0, 4.0]];
        let tests = array![[1.0f32, 2.0, 3.0]];
        let err = min_distances_2d(&refs, &tests).unwrap_err();
        assert!(matches!(
            err,
            ShapeletError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn unclustered_field_matches_flat_kernel() {
        use crate::test_fixtures::stripe_image;

        let image = stripe_image(40, 40, 8.0);
        let cfg = ResponseDistanceConfig {
            shapelet_order: ShapeletOrder::Max(4),
            num_clusters: 0,
            ux: [4, 14],
            uy: [4, 14],
            ..ResponseDistanceConfig::default()
        };
        let field = response_distance(&image, 8.0, &cfg).unwrap();
        assert_eq!(field.dim(), (40, 40));

        // pixels inside the reference region are themselves references
        for i in 4..=14 {
            for j in 4..=14 {
                assert_relative_eq!(field[[i, j]], 0.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn zero_clusters_equals_full_reference_set() {
        use crate::test_fixtures::stripe_image;

        let image = stripe_image(32, 32, 6.0);
        let cfg = ResponseDistanceConfig {
            shapelet_order: ShapeletOrder::Max(3),
            num_clusters: 0,
            ux: [3, 9],
            uy: [3, 9],
            ..ResponseDistanceConfig::default()
        };
        let field = response_distance(&image, 6.0, &cfg).unwrap();

        // recompute against the unclustered reference set by hand
        let response = convresponse_n0(&image, 6.0, cfg.shapelet_order, NormMode::Vector).unwrap();
        let dim = response.orders();
        let mut refs = Vec::new();
        for i in 3..=9 {
            for j in 3..=9 {
                for k in 0..dim {
                    refs.push(response.omega[[i, j, k]]);
                }
            }
        }
        let tests = response.vectors();
        let expected = min_distances(&refs, tests.as_slice().unwrap(), dim).unwrap();
        for (d, e) in field.iter().zip(expected.iter()) {
            assert_relative_eq!(*d, *e);
        }
    }

    #[test]
    fn bad_reference_bounds_are_rejected() {
        use crate::test_fixtures::stripe_image;

        let image = stripe_image(20, 20, 6.0);
        let cfg = ResponseDistanceConfig {
            ux: [5, 25],
            uy: [2, 8],
            ..ResponseDistanceConfig::default()
        };
        assert!(matches!(
            response_distance(&image, 6.0, &cfg),
            Err(ShapeletError::InvalidBounds(_))
        ));
    }
}
