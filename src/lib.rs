//! Shapelets - shapelet decomposition and pattern quantification in Rust.
//!
//! Decomposes 2-D intensity fields onto orthogonal, localized shapelet bases
//! and derives order/defect metrics from the resulting response vectors:
//!
//! - response distance against an ordered reference region
//! - defect identification over clustered response vectors
//! - local pattern orientation via masking, dilation and blending
//! - iterative galaxy decomposition with coefficient compression
//!
//! The caller owns all image I/O, configuration parsing and rendering; the
//! crate consumes in-memory arrays plus a resolved parameter record and hands
//! back scalar fields and coefficient sets.

pub mod config;
pub mod error;
pub mod functions;
pub mod galaxy;
pub mod iterate;
pub mod quant;
pub mod response;
pub mod wavelength;

mod util;

pub use config::{
    resolve, MethodConfig, MethodKind, PatternOrder, ReferenceRegion, ResolvedMethod,
};
pub use error::{Result, ShapeletError};
pub use galaxy::{decompose_stamps, GalaxyDecomposition, OptimizerConfig, Stamp};
pub use iterate::{refine, Convergence, Refined};
pub use quant::{
    defect_clusters, defect_distance, kmeans, min_distances, orientation, response_distance,
    Clustering, DefectClustering, Orientation, ResponseDistanceConfig,
};
pub use response::{convresponse_n0, convresponse_n1, NormMode, Response, ShapeletOrder};
pub use wavelength::{
    beta_n0, beta_n1, characteristic_wavelength, spectral_wavelength, WavelengthConfig,
};
