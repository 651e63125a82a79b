use thiserror::Error;

/// Errors surfaced by the decomposition and quantification pipeline.
///
/// Below-floor cluster counts are deliberately absent here: they are corrected
/// upward during configuration resolution, not rejected.
#[derive(Debug, Error)]
pub enum ShapeletError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid shapelet order: {0}")]
    InvalidOrder(String),

    #[error("{what} did not converge after {iterations} iterations (residual {residual:.4})")]
    NonConvergence {
        what: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("response vector length mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid region: {0}")]
    InvalidBounds(String),
}

pub type Result<T> = std::result::Result<T, ShapeletError>;
