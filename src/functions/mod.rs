//! # Shapelet function families
//!
//! Every family evaluates onto a caller-supplied coordinate grid at a given
//! length scale beta. Within one family and fixed beta, distinct orders are
//! mutually orthogonal under the discrete inner product used by the response
//! engine.

pub mod cartesian;
pub mod exponential;
pub mod polar;
pub mod poly;

pub use cartesian::{cartesian1d, cartesian2d};
pub use exponential::{exponential1d, exponential2d};
pub use polar::{orthonormal_polar2d_n0, orthonormal_polar2d_n1, polar2d};
