//! # Response-vector quantification
//!
//! Turns per-pixel response vectors into scalar fields: distance to an
//! ordered reference region, defect scores within flagged clusters, and a
//! continuous local orientation field.

pub mod cluster;
pub mod defects;
pub mod morphology;
pub mod orientation;
pub mod rdistance;

pub use cluster::{kmeans, Clustering, DEFAULT_SEED};
pub use defects::{defect_clusters, defect_distance, DefectClustering};
pub use morphology::{grey_dilation, median_filter, trim_edges};
pub use orientation::{orientation, Orientation};
pub use rdistance::{min_distances, min_distances_2d, response_distance, ResponseDistanceConfig};
