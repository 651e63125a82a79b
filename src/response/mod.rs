//! # Convolutional response engine
//!
//! The dominant cost of the pipeline: a bank convolution of the image with
//! shapelet filters, one complex plane per order, assembled into per-pixel
//! response vectors.

pub mod engine;
pub mod fft;
pub mod grid;

pub use engine::{convresponse_n0, convresponse_n1, NormMode, Response, ShapeletOrder};
pub use fft::fftconvolve_same;
pub use grid::{make_grid, optimal_kernel_n0, optimal_kernel_n1};
