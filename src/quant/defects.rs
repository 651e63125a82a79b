//! Defect identification: cluster the response field, then score each pixel
//! of the externally flagged clusters by its distance to the owning centroid.

use log::{debug, warn};
use ndarray::Array2;

use super::cluster::{kmeans, Clustering};
use crate::config::PatternOrder;
use crate::error::{Result, ShapeletError};
use crate::response::{convresponse_n0, NormMode, ShapeletOrder};
use crate::util::normalize_unit;

/// Clustered response field of one image. `labels` and `distances` carry the
/// image shape; `distances` is min-max normalized.
#[derive(Debug, Clone)]
pub struct DefectClustering {
    pub centroids: Array2<f32>,
    pub labels: Array2<usize>,
    pub distances: Array2<f32>,
}

impl DefectClustering {
    pub fn num_clusters(&self) -> usize {
        self.centroids.nrows()
    }
}

/// Cluster the per-pixel response vectors of a patterned image.
///
/// The cluster count has a floor set by the pattern symmetry; a request below
/// the floor (or none at all) silently becomes the floor. This is the one
/// place where an out-of-range parameter is corrected instead of rejected.
pub fn defect_clusters(
    image: &Array2<f32>,
    lambda: f64,
    pattern: PatternOrder,
    num_clusters: Option<usize>,
    seed: u64,
) -> Result<DefectClustering> {
    let floor = pattern.min_clusters();
    let k = match num_clusters {
        Some(k) if k < floor => {
            warn!("raising num_clusters from {k} to the {pattern:?} floor of {floor}");
            floor
        }
        Some(k) => k,
        None => floor,
    };

    let response = convresponse_n0(image, lambda, ShapeletOrder::Default, NormMode::Vector)?;
    let vectors = response.vectors();
    debug!("k-means over {} response vectors with k={k}", vectors.nrows());
    let Clustering {
        centroids,
        labels,
        distances,
    } = kmeans(vectors.view(), k, seed)?;

    let (ny, nx) = image.dim();
    let labels = Array2::from_shape_vec((ny, nx), labels).expect("pixel count");
    let distances = Array2::from_shape_vec((ny, nx), distances).expect("pixel count");
    Ok(DefectClustering {
        centroids,
        labels,
        distances: normalize_unit(&distances.view()),
    })
}

/// Defect response distance field: the centroid distance of every pixel whose
/// cluster was flagged as defect-like, zero elsewhere.
pub fn defect_distance(clustering: &DefectClustering, flagged: &[usize]) -> Result<Array2<f32>> {
    let k = clustering.num_clusters();
    if let Some(&bad) = flagged.iter().find(|&&c| c >= k) {
        return Err(ShapeletError::InvalidConfig(format!(
            "flagged cluster {bad} does not exist (have {k})"
        )));
    }

    let mut field = Array2::zeros(clustering.labels.raw_dim());
    ndarray::Zip::from(&mut field)
        .and(&clustering.labels)
        .and(&clustering.distances)
        .for_each(|out, &label, &dist| {
            if flagged.contains(&label) {
                *out = dist;
            }
        });
    Ok(field)
}
