//! Exponential shapelets. Heavier-tailed than the gaussian families, defined
//! on the half line (1-D) or the full plane (2-D).

use ndarray::{Array1, Array2};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use super::poly::{factorial, genlaguerre};
use crate::error::{Result, ShapeletError};

/// 1-D exponential shapelet S_n(x; beta), n >= 1, defined for x >= 0.
pub fn exponential1d(n: u32, x: &Array1<f64>, beta: f64) -> Result<Array1<f64>> {
    if n < 1 {
        return Err(ShapeletError::InvalidOrder("n must be >= 1".into()));
    }
    if x.iter().any(|&v| v < 0.0) {
        return Err(ShapeletError::InvalidOrder(
            "exponential1d is defined for x >= 0 only".into(),
        ));
    }

    let nf = n as f64;
    let sign = if (n - 1) % 2 == 0 { 1.0 } else { -1.0 };
    let a = sign / (beta * nf.powi(3)).sqrt();

    Ok(x.mapv(|x| {
        let u = x / (nf * beta);
        a * 2.0 * u * genlaguerre(n - 1, 1.0, 2.0 * u) * (-u).exp()
    }))
}

/// 2-D exponential shapelet S_{n,m}(x1, x2; beta), |m| <= n.
pub fn exponential2d(
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

    let nm = n - m_abs;
    let nm2 = n + m_abs;
    let nm3 = 2.0 * n as f64 + 1.0;
    let b = 2.0 / (beta * nm3);
    let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
    let c = sign
        * (2.0 / (beta * PI) / nm3.powi(3)).sqrt()
        * (factorial(nm) / factorial(nm2)).sqrt();

    let mut out = Array2::zeros(x1.raw_dim());
    ndarray::Zip::from(&mut out)
        .and(x1)
        .and(x2)
        .for_each(|o, &x, &y| {
            let r = x.hypot(y);
            let theta = y.atan2(x);
            let radial = c
                * (r * b).powi(m_abs as i32)
                * genlaguerre(nm, 2.0 * m_abs as f64, r * b)
                * (-r / (beta * nm3)).exp();
            let phase = Complex::new((m as f64 * theta).cos(), -(m as f64 * theta).sin());
            *o = radial * phase;
        });
    Ok(out)
}
