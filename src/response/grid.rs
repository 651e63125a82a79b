//! Discrete kernel grids and filter-width optimization.
//!
//! Kernel widths are grown (n=0) or shrunk (n=1) until the sampled shapelet
//! carries negligible weight at the grid edge relative to its peak. Both
//! filter families peak on their central row, so the width search scans the
//! midline profile only and the full kernel is sampled once, at the accepted
//! width.

use ndarray::Array2;
use rustfft::num_complex::Complex;

use crate::error::{Result, ShapeletError};
use crate::functions::{orthonormal_polar2d_n0, orthonormal_polar2d_n1};

const MIN_KERNEL: usize = 9;
const MAX_KERNEL: usize = 2001;

/// Centered coordinate grids for an odd kernel width. Even widths are bumped
/// up by one; widths below 9 are rejected.
pub fn make_grid(width: usize) -> Result<(Array2<f64>, Array2<f64>)> {
    let n = if width % 2 == 0 { width + 1 } else { width };
    if n < MIN_KERNEL {
        return Err(ShapeletError::InvalidBounds(format!(
            "kernel width {n} is below the minimum of {MIN_KERNEL}"
        )));
    }
    let half = (n - 1) as f64 / 2.0;
    let x1 = Array2::from_shape_fn((n, n), |(_, j)| j as f64 - half);
    let x2 = Array2::from_shape_fn((n, n), |(i, _)| i as f64 - half);
    Ok((x1, x2))
}

fn midline_grid(width: usize) -> (Array2<f64>, Array2<f64>) {
    let half = (width - 1) as f64 / 2.0;
    let x1 = Array2::from_shape_fn((1, width), |(_, j)| j as f64 - half);
    let x2 = Array2::zeros((1, width));
    (x1, x2)
}

/// Real part of the filter along its central row.
pub(crate) fn midline_n1(m: u32, beta: f64, width: usize) -> Result<Vec<f64>> {
    let (x1, x2) = midline_grid(width);
    let row = orthonormal_polar2d_n1(m, &x1, &x2, beta)?;
    Ok(row.iter().map(|c| c.re).collect())
}

fn midline_n0(m: u32, beta: f64, width: usize) -> Result<Vec<f64>> {
    let (x1, x2) = midline_grid(width);
    let row = orthonormal_polar2d_n0(m, &x1, &x2, beta)?;
    Ok(row.iter().map(|c| c.re).collect())
}

fn edge_weight(midline: &[f64]) -> f64 {
    let peak = midline.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    midline.last().unwrap().abs() / peak
}

fn downcast(kernel: Array2<Complex<f64>>) -> Array2<Complex<f32>> {
    kernel.mapv(|c| Complex::new(c.re as f32, c.im as f32))
}

/// n=0 filter width: start small and widen until the edge weight drops below
/// 1e-4.
pub(crate) fn optimal_width_n0(m: u32, beta: f64) -> Result<usize> {
    let mut width = 21;
    loop {
        let weight = edge_weight(&midline_n0(m, beta, width)?);
        if weight <= 1e-4 {
            return Ok(width);
        }
        width += 4;
        if width > MAX_KERNEL {
            return Err(ShapeletError::NonConvergence {
                what: "n=0 kernel sizing",
                iterations: (MAX_KERNEL - 21) / 4,
                residual: weight,
            });
        }
    }
}

/// n=1 filter width: start wide and truncate while the edge weight stays
/// below 1e-3.
pub(crate) fn optimal_width_n1(m: u32, beta: f64) -> Result<usize> {
    let mut width = 501;
    loop {
        if edge_weight(&midline_n1(m, beta, width)?) >= 1e-3 || width - 4 < MIN_KERNEL {
            return Ok(width);
        }
        width -= 4;
    }
}

/// Sampled n=0 filter at its optimal width.
pub fn optimal_kernel_n0(m: u32, beta: f64) -> Result<Array2<Complex<f32>>> {
    let (x1, x2) = make_grid(optimal_width_n0(m, beta)?)?;
    Ok(downcast(orthonormal_polar2d_n0(m, &x1, &x2, beta)?))
}

/// Sampled n=1 filter at its optimal width.
pub fn optimal_kernel_n1(m: u32, beta: f64) -> Result<Array2<Complex<f32>>> {
    let (x1, x2) = make_grid(optimal_width_n1(m, beta)?)?;
    Ok(downcast(orthonormal_polar2d_n1(m, &x1, &x2, beta)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_grid_enforces_odd_widths() {
        let (x1, x2) = make_grid(10).unwrap();
        assert_eq!(x1.dim(), (11, 11));
        assert_eq!(x1[[0, 0]], -5.0);
        assert_eq!(x1[[0, 10]], 5.0);
        assert_eq!(x2[[10, 0]], 5.0);
        assert!(make_grid(5).is_err());
    }

    #[test]
    fn n0_kernel_edge_is_negligible() {
        let kernel = optimal_kernel_n0(2, 3.0).unwrap();
        assert!(kernel.nrows() >= 21);
        assert!(kernel.nrows() % 2 == 1);

        let mid = kernel.nrows() / 2;
        let peak = kernel.iter().map(|c| c.re).fold(f32::NEG_INFINITY, f32::max);
        let edge = kernel[[mid, kernel.ncols() - 1]].re.abs() / peak;
        assert!(edge <= 1e-4);
    }

    #[test]
    fn n0_kernel_grows_with_beta() {
        let small = optimal_kernel_n0(2, 2.0).unwrap();
        let large = optimal_kernel_n0(2, 8.0).unwrap();
        assert!(large.nrows() > small.nrows());
    }

    #[test]
    fn n1_kernel_is_truncated_from_above() {
        let kernel = optimal_kernel_n1(1, 2.0).unwrap();
        assert!(kernel.nrows() < 501);
        assert!(kernel.nrows() % 2 == 1);
    }
}
