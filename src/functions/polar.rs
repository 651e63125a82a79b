//! Polar shapelets: Laguerre polynomials under a gaussian envelope, with an
//! e^{-im\theta} angular factor. All functions in this module are
//! complex-valued; the response engine takes magnitude and argument.

use ndarray::Array2;
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use super::poly::{factorial, genlaguerre};
use crate::error::{Result, ShapeletError};

fn angular(m: i32, theta: f64) -> Complex<f64> {
    // e^{-i m theta}
    Complex::new((m as f64 * theta).cos(), -(m as f64 * theta).sin())
}

/// 2-D polar shapelet S_{n,m}(x1, x2; beta).
///
/// Requires |m| <= n with n and m of equal parity.
pub fn polar2d(
    n: u32,
    m: i32,
    x1: &Array2<f64>,
    x2: &Array2<f64>,
    beta: f64,
) -> Result<Array2<Complex<f64>>> {
    let m_abs = m.unsigned_abs();
    if m_abs > n {
        return Err(ShapeletError::InvalidOrder(format!(
            "m = {m} must lie in [-{n}, {n}]"
        )));
    }
    if (n % 2) != (m_abs % 2) {
        return Err(ShapeletError::InvalidOrder(format!(
            "m = {m} must share parity with n = {n}"
        )));
    }

    let nm = (n - m_abs) / 2;
    let nm2 = (n + m_abs) / 2;
    let sign = if nm % 2 == 0 { 1.0 } else { -1.0 };
    let c = sign / beta.powi(m_abs as i32 + 1) * factorial(nm).sqrt() / (PI * factorial(nm2));

    let mut out = Array2::zeros(x1.raw_dim());
    ndarray::Zip::from(&mut out)
        .and(x1)
        .and(x2)
        .for_each(|o, &x, &y| {
            let r = x.hypot(y);
            let theta = y.atan2(x);
            let u = (r / beta).powi(2);
            let radial = c * r.powi(m_abs as i32) * genlaguerre(nm, m_abs as f64, u) * (-u / 2.0).exp();
            *o = radial * angular(m, theta);
        });
    Ok(out)
}

/// Orthonormal polar shapelet with zero radial extrema, degree of rotational
/// symmetry m >= 1.
pub fn orthonormal_polar2d_n0(
    m: u32,
    x1: &Array2<f64>,
    x2: &Array2<f64>,
    beta: f64,
) -> Result<Array2<Complex<f64>>> {
    if m < 1 {
        return Err(ShapeletError::InvalidOrder(
            "rotational symmetry m must be >= 1".into(),
        ));
    }

    let c = 1.0 / (PI * factorial(m)).sqrt();

    let mut out = Array2::zeros(x1.raw_dim());
    ndarray::Zip::from(&mut out)
        .and(x1)
        .and(x2)
        .for_each(|o, &x, &y| {
            let r = x.hypot(y) / beta;
            let theta = y.atan2(x);
            let radial = (c / beta) * r.powi(m as i32) * (-r * r / 2.0).exp();
            *o = radial * angular(m as i32, theta);
        });
    Ok(out)
}

/// Orthonormal polar shapelet with one degree of radial extremum, degree of
/// rotational symmetry m >= 1.
pub fn orthonormal_polar2d_n1(
    m: u32,
    x1: &Array2<f64>,
    x2: &Array2<f64>,
    beta: f64,
) -> Result<Array2<Complex<f64>>> {
    if m < 1 {
        return Err(ShapeletError::InvalidOrder(
            "rotational symmetry m must be >= 1".into(),
        ));
    }

    let c = 1.0 / (PI * factorial(m) * (m as f64 + 1.0)).sqrt();

    let mut out = Array2::zeros(x1.raw_dim());
    ndarray::Zip::from(&mut out)
        .and(x1)
        .and(x2)
        .for_each(|o, &x, &y| {
            let r = x.hypot(y) / beta;
            let theta = y.atan2(x);
            let radial = (c / beta) * r.powi(m as i32) * (1.0 + m as f64 - r * r) * (-r * r / 2.0).exp();
            *o = radial * angular(m as i32, theta);
        });
    Ok(out)
}
