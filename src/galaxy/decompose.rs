//! Per-object cartesian decomposition, reconstruction and coefficient
//! compression.

use log::debug;
use ndarray::{Array1, Array2};
use num_integer::binomial;

use crate::functions::cartesian1d;

/// Canonical (n1, n2) enumeration with n1 + n2 <= n_max, ascending n1 then
/// n2. Every coefficient consumer in this module iterates in this order.
pub fn order_space(n_max: u32) -> Vec<(u32, u32)> {
    let mut orders = Vec::with_capacity(order_count(n_max));
    for n1 in 0..=n_max {
        for n2 in 0..=(n_max - n1) {
            orders.push((n1, n2));
        }
    }
    orders
}

/// Number of coefficients up to n_max: C(n_max + 2, 2).
pub fn order_count(n_max: u32) -> usize {
    binomial(n_max as u64 + 2, 2) as usize
}

/// 1-D basis tables S_n(x_i) for n in 0..=n_max over a centered pixel axis.
fn basis_table(n_max: u32, len: usize, center: f64, beta: f64) -> Array2<f64> {
    let coords = Array1::from_shape_fn(len, |i| i as f64 - center);
    let mut table = Array2::zeros((n_max as usize + 1, len));
    for n in 0..=n_max {
        table.row_mut(n as usize).assign(&cartesian1d(n, &coords, beta));
    }
    table
}

/// Project an object image onto the cartesian kernels up to n_max.
///
/// The kernels are separable, so the projection reduces to two matrix
/// products against the 1-D basis tables. Entries outside the triangular
/// order space are zeroed.
pub fn decompose(image: &Array2<f32>, n_max: u32, beta: f64, centroid: [f64; 2]) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let sx = basis_table(n_max, rows, centroid[0], beta);
    let sy = basis_table(n_max, cols, centroid[1], beta);

    let data = image.mapv(|v| v as f64);
    let mut coefficients = sx.dot(&data).dot(&sy.t());
    for ((n1, n2), c) in coefficients.indexed_iter_mut() {
        if n1 + n2 > n_max as usize {
            *c = 0.0;
        }
    }
    coefficients
}

/// Rebuild an image from the coefficients of the given orders.
pub fn reconstruct(
    coefficients: &Array2<f64>,
    orders: &[(u32, u32)],
    beta: f64,
    centroid: [f64; 2],
    shape: (usize, usize),
) -> Array2<f64> {
    let n_max = coefficients.nrows() as u32 - 1;
    let sx = basis_table(n_max, shape.0, centroid[0], beta);
    let sy = basis_table(n_max, shape.1, centroid[1], beta);

    let mut masked = Array2::zeros(coefficients.raw_dim());
    for &(n1, n2) in orders {
        masked[[n1 as usize, n2 as usize]] = coefficients[[n1 as usize, n2 as usize]];
    }
    sx.t().dot(&masked).dot(&sy)
}

/// The orders of the n_compress largest coefficients by magnitude, row-major.
///
/// Selection is by threshold against the n_compress-th largest magnitude, so
/// exact ties can carry a few extra orders along. Asking for at least the
/// full count returns the complete order space.
pub fn compressed_order_space(coefficients: &Array2<f64>, n_compress: usize) -> Vec<(u32, u32)> {
    let n_max = coefficients.nrows() as u32 - 1;
    if n_compress == 0 {
        return Vec::new();
    }
    if n_compress >= order_count(n_max) {
        debug!("compression order covers all {} coefficients", order_count(n_max));
        return order_space(n_max);
    }

    let mut magnitudes: Vec<f64> = coefficients.iter().map(|c| c.abs()).collect();
    magnitudes.sort_unstable_by(|a, b| b.total_cmp(a));
    let threshold = magnitudes[n_compress - 1];

    coefficients
        .indexed_iter()
        .filter(|&((n1, n2), c)| n1 + n2 <= n_max as usize && c.abs() >= threshold)
        .map(|((n1, n2), _)| (n1 as u32, n2 as u32))
        .collect()
}

/// Residual energy of `approx` against `reference`, normalized by the energy
/// of `reference`.
pub fn residual_energy(reference: &Array2<f64>, approx: &Array2<f64>) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    ndarray::Zip::from(reference).and(approx).for_each(|&r, &a| {
        num += (r - a) * (r - a);
        den += r * r;
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::gaussian_image;
    use approx::assert_relative_eq;

    #[test]
    fn order_space_is_triangular_and_canonical() {
        let orders = order_space(3);
        assert_eq!(orders.len(), order_count(3));
        assert_eq!(orders.len(), 10);
        assert_eq!(orders[0], (0, 0));
        assert_eq!(orders[1], (0, 1));
        assert_eq!(*orders.last().unwrap(), (3, 0));
        assert!(orders.iter().all(|&(a, b)| a + b <= 3));
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn centered_gaussian_loads_the_zeroth_coefficient() {
        let image = gaussian_image(25, 25, 12.0, 12.0, 2.5);
        let coeff = decompose(&image, 4, 2.5, [12.0, 12.0]);
        let zeroth = coeff[[0, 0]].abs();
        for &(n1, n2) in &order_space(4) {
            if (n1, n2) != (0, 0) {
                assert!(coeff[[n1 as usize, n2 as usize]].abs() < zeroth);
            }
        }
    }

    #[test]
    fn reconstruction_error_decreases_with_compression_order() {
        let image = gaussian_image(24, 24, 11.3, 12.6, 2.2);
        let n_max = 4;
        let beta = 2.2;
        let centroid = [11.3, 12.6];
        let coeff = decompose(&image, n_max, beta, centroid);

        let full = reconstruct(&coeff, &order_space(n_max), beta, centroid, (24, 24));
        let total = order_count(n_max);

        let mut previous = f64::INFINITY;
        for k in 1..=total {
            let orders = compressed_order_space(&coeff, k);
            let compressed = reconstruct(&coeff, &orders, beta, centroid, (24, 24));
            let err = residual_energy(&full, &compressed);
            assert!(err >= 0.0);
            assert!(err <= previous + 1e-9, "error rose at k = {k}");
            previous = err;
        }

        // full count keeps every order, so the truncation error vanishes
        let orders = compressed_order_space(&coeff, total);
        assert_eq!(orders.len(), total);
        let compressed = reconstruct(&coeff, &orders, beta, centroid, (24, 24));
        assert_relative_eq!(residual_energy(&full, &compressed), 0.0);
    }

    #[test]
    fn compression_keeps_the_largest_magnitudes() {
        let image = gaussian_image(20, 20, 9.5, 9.5, 2.0);
        let coeff = decompose(&image, 3, 2.0, [9.5, 9.5]);
        let kept = compressed_order_space(&coeff, 3);
        assert!(kept.len() >= 3);
        assert!(kept.contains(&(0, 0)));
    }
}
