//! Cartesian shapelets: Hermite polynomials under a gaussian envelope.

use ndarray::{Array1, Array2};

use super::poly::{factorial, hermite};

const SQRT_PI: f64 = 1.772453850905516;

/// 1-D cartesian shapelet S_n(x; beta), sampled over `x`.
pub fn cartesian1d(n: u32, x: &Array1<f64>, beta: f64) -> Array1<f64> {
    let a = 1.0 / (2f64.powi(n as i32) * SQRT_PI * factorial(n)).sqrt();
    let scale = a / beta.sqrt();
    x.mapv(|x| {
        let u = x / beta;
        scale * hermite(n, u) * (-u * u / 2.0).exp()
    })
}

/// 2-D cartesian shapelet S_{n1,n2}(x1, x2; beta), sampled over a grid.
///
/// Separable: the product of the two 1-D dimensionless basis functions with a
/// single 1/beta prefactor.
pub fn cartesian2d(n1: u32, n2: u32, x1: &Array2<f64>, x2: &Array2<f64>, beta: f64) -> Array2<f64> {
    let a1 = 1.0 / (2f64.powi(n1 as i32) * SQRT_PI * factorial(n1)).sqrt();
    let a2 = 1.0 / (2f64.powi(n2 as i32) * SQRT_PI * factorial(n2)).sqrt();
    let scale = a1 * a2 / beta;

    let mut out = Array2::zeros(x1.raw_dim());
    ndarray::Zip::from(&mut out)
        .and(x1)
        .and(x2)
        .for_each(|o, &x, &y| {
            let u = x / beta;
            let v = y / beta;
            *o = scale * hermite(n1, u) * hermite(n2, v) * (-(u * u + v * v) / 2.0).exp();
        });
    out
}
