//! Grey-scale morphology over scalar fields: square-window dilation and
//! median smoothing with reflected edges, plus the post-convolution edge trim.

use ndarray::{s, Array2, Axis};
use rayon::prelude::*;

use crate::error::{Result, ShapeletError};

fn reflect(idx: isize, n: usize) -> usize {
    let n = n as isize;
    let mut i = idx;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// Maximum over a size x size window centered (left-heavy for even sizes)
/// on each pixel.
pub fn grey_dilation(field: &Array2<f32>, size: usize) -> Array2<f32> {
    let size = size.max(1);
    let (ny, nx) = field.dim();
    let offset = (size / 2) as isize;

    let mut out = Array2::zeros((ny, nx));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for j in 0..nx {
                let mut best = f32::NEG_INFINITY;
                for di in 0..size as isize {
                    let y = reflect(i as isize - offset + di, ny);
                    for dj in 0..size as isize {
                        let x = reflect(j as isize - offset + dj, nx);
                        best = best.max(field[[y, x]]);
                    }
                }
                row[j] = best;
            }
        });
    out
}

/// Median over a size x size window centered on each pixel.
pub fn median_filter(field: &Array2<f32>, size: usize) -> Array2<f32> {
    let size = size.max(1);
    let (ny, nx) = field.dim();
    let offset = (size / 2) as isize;
    let rank = (size * size) / 2;

    let mut out = Array2::zeros((ny, nx));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            let mut window = Vec::with_capacity(size * size);
            for j in 0..nx {
                window.clear();
                for di in 0..size as isize {
                    let y = reflect(i as isize - offset + di, ny);
                    for dj in 0..size as isize {
                        let x = reflect(j as isize - offset + dj, nx);
                        window.push(field[[y, x]]);
                    }
                }
                let (_, median, _) = window.select_nth_unstable_by(rank, f32::total_cmp);
                row[j] = *median;
            }
        });
    out
}

/// Crop half a wavelength from every edge; convolution padding makes the
/// outer band unreliable.
pub fn trim_edges(field: &Array2<f32>, lambda: f64) -> Result<Array2<f32>> {
    let trim = (lambda / 2.0).round() as usize;
    let (ny, nx) = field.dim();
    if trim == 0 {
        return Ok(field.clone());
    }
    if 2 * trim >= ny || 2 * trim >= nx {
        return Err(ShapeletError::InvalidBounds(format!(
            "cannot trim {trim} pixels from a {ny}x{nx} field"
        )));
    }
    Ok(field.slice(s![trim..ny - trim, trim..nx - trim]).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn dilation_spreads_the_maximum() {
        let mut field = Array2::zeros((7, 7));
        field[[3, 3]] = 5.0;
        let out = grey_dilation(&field, 3);
        for i in 2..=4 {
            for j in 2..=4 {
                assert_eq!(out[[i, j]], 5.0);
            }
        }
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[3, 5]], 0.0);
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut field = Array2::from_elem((9, 9), 1.0_f32);
        field[[4, 4]] = 100.0;
        let out = median_filter(&field, 3);
        assert_eq!(out[[4, 4]], 1.0);
    }

    #[test]
    fn median_of_known_window() {
        let field = array![
            [1.0_f32, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
        ];
        let out = median_filter(&field, 3);
        assert_eq!(out[[1, 1]], 5.0);
    }

    #[test]
    fn trim_removes_half_wavelength_border() {
        let field = Array2::from_elem((20, 24), 1.0_f32);
        let out = trim_edges(&field, 8.0).unwrap();
        assert_eq!(out.dim(), (12, 16));
        assert!(trim_edges(&field, 30.0).is_err());
    }
}
