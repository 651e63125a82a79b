//! Shapelet bank convolution.
//!
//! Projects every pixel neighborhood onto the orthonormal polar filters up to
//! a maximum degree of rotational symmetry, producing one response vector per
//! pixel. Coefficient i of every vector corresponds to m = i + 1; that
//! ordering is what makes the downstream Euclidean comparisons meaningful.

use log::{debug, warn};
use ndarray::{s, Array2, Array3, ArrayView1, Axis};
use rayon::prelude::*;
use rustfft::num_complex::Complex;

use super::fft::fftconvolve_same;
use super::grid::{optimal_kernel_n0, optimal_kernel_n1};
use crate::error::Result;
use crate::util::{min_max, EPS};
use crate::wavelength::{beta_n0, beta_n1};

/// Upper bound on the filter bank, either fixed or derived from the response
/// decay of successively higher orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeletOrder {
    /// Grow the bank until the newest order contributes less than 10% of the
    /// strongest total response seen so far.
    Default,
    /// Fixed bank m in [1, max].
    Max(u32),
}

/// Normalization applied to the magnitude planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormMode {
    /// Unit L2 norm across orders, per pixel. Response vectors compared by
    /// Euclidean distance must use this mode.
    Vector,
    /// Each order plane min-max rescaled onto [0, 1] independently.
    Individual,
}

/// Per-pixel response magnitudes and filter orientations, one plane per order.
#[derive(Debug, Clone)]
pub struct Response {
    pub omega: Array3<f32>,
    pub phi: Array3<f32>,
}

impl Response {
    pub fn orders(&self) -> usize {
        self.omega.len_of(Axis(2))
    }

    /// Response vectors flattened to (pixels, orders), row-major pixel order.
    pub fn vectors(&self) -> Array2<f32> {
        let (ny, nx, m) = self.omega.dim();
        Array2::from_shape_fn((ny * nx, m), |(p, k)| self.omega[[p / nx, p % nx, k]])
    }
}

const MIN_RESPONSE_TOL: f64 = 0.1;
const MAX_DEFAULT_ORDERS: usize = 200;

/// Complex response of the image to the n=0 filter of symmetry m.
pub(crate) fn response_plane_n0(
    image: &Array2<f32>,
    m: u32,
    lambda: f64,
) -> Result<Array2<Complex<f32>>> {
    let kernel = optimal_kernel_n0(m, beta_n0(m, lambda))?;
    Ok(fftconvolve_same(image, &kernel))
}

/// Convolve the image with the n=0 filter bank.
pub fn convresponse_n0(
    image: &Array2<f32>,
    lambda: f64,
    order: ShapeletOrder,
    norm: NormMode,
) -> Result<Response> {
    let planes = match order {
        ShapeletOrder::Max(0) => {
            return Err(crate::error::ShapeletError::InvalidOrder(
                "filter bank needs at least one order".into(),
            ))
        }
        ShapeletOrder::Max(mmax) => {
            let planes = (1..=mmax)
                .into_par_iter()
                .map(|m| response_plane_n0(image, m, lambda))
                .collect::<Result<Vec<_>>>()?;
            debug!("convolution complete for shapelets m <= {mmax}");
            planes
        }
        ShapeletOrder::Default => {
            let mut planes = Vec::new();
            let mut strongest = f64::NEG_INFINITY;
            while planes.len() < MAX_DEFAULT_ORDERS {
                let plane = response_plane_n0(image, planes.len() as u32 + 1, lambda)?;
                let total: f64 = plane.iter().map(|c| c.norm() as f64).sum();
                strongest = strongest.max(total);
                if total / strongest <= MIN_RESPONSE_TOL {
                    break;
                }
                planes.push(plane);
            }
            if planes.len() == MAX_DEFAULT_ORDERS {
                warn!("order growth stopped at the {MAX_DEFAULT_ORDERS}-plane cap");
            }
            debug!(
                "convolution complete for shapelets m <= {} before tolerance exceeded",
                planes.len()
            );
            planes
        }
    };
    Ok(assemble(&planes, norm))
}

/// Convolve the image with the n=1 filter bank. The optimal length scale per
/// order comes from the numerical midline search rather than a closed form.
pub fn convresponse_n1(image: &Array2<f32>, lambda: f64, mmax: u32) -> Result<Response> {
    if mmax == 0 {
        return Err(crate::error::ShapeletError::InvalidOrder(
            "filter bank needs at least one order".into(),
        ));
    }
    if mmax >= 10 {
        warn!("filter behaviour declines for m >= 10 with one radial extremum");
    }
    let planes = (1..=mmax)
        .into_par_iter()
        .map(|m| {
            let kernel = optimal_kernel_n1(m, beta_n1(m, lambda)?)?;
            Ok(fftconvolve_same(image, &kernel))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("convolution complete for shapelets m <= {mmax}");
    Ok(assemble(&planes, NormMode::Vector))
}

fn assemble(planes: &[Array2<Complex<f32>>], norm: NormMode) -> Response {
    let (ny, nx) = planes[0].dim();
    let orders = planes.len();
    let mut omega = Array3::zeros((ny, nx, orders));
    let mut phi = Array3::zeros((ny, nx, orders));

    for (k, plane) in planes.iter().enumerate() {
        let mut omega_k = omega.slice_mut(s![.., .., k]);
        let mut phi_k = phi.slice_mut(s![.., .., k]);
        ndarray::Zip::from(&mut omega_k)
            .and(&mut phi_k)
            .and(plane)
            .for_each(|o, p, &c| {
                *o = c.norm();
                *p = c.arg();
            });
    }

    match norm {
        NormMode::Vector => {
            let norms = omega.map_axis(Axis(2), |v| v.dot(&v).sqrt());
            for k in 0..orders {
                omega
                    .slice_mut(s![.., .., k])
                    .zip_mut_with(&norms, |o, &n| *o /= n.max(EPS));
            }
        }
        NormMode::Individual => {
            for k in 0..orders {
                let mut plane = omega.slice_mut(s![.., .., k]);
                let (lo, hi) = min_max(&plane.view());
                let span = (hi - lo).max(EPS);
                plane.mapv_inplace(|v| (v - lo) / span);
            }
        }
    }

    // steerable filter theory: optimal orientation lives on [0, 2pi/m)
    for k in 0..orders {
        let mut plane = phi.slice_mut(s![.., .., k]);
        let (lo, hi) = min_max(&plane.view());
        let span = (hi - lo).max(EPS);
        let max_angle = 2.0 * std::f32::consts::PI / (k as f32 + 1.0);
        plane.mapv_inplace(|v| (v - lo) / span * max_angle);
    }

    Response { omega, phi }
}
