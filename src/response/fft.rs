//! 2-D FFT helpers and FFT-based convolution.
//!
//! Row pass then column pass; rustfft plans are created per transform size.

use ndarray::{s, Array2};
use num_traits::Zero;
use rustfft::{num_complex::Complex, FftDirection, FftPlanner};

pub(crate) fn fft2(data: &mut Array2<Complex<f32>>, direction: FftDirection) {
    let (rows, cols) = data.dim();
    let mut planner = FftPlanner::new();

    let row_fft = planner.plan_fft(cols, direction);
    for mut row in data.outer_iter_mut() {
        let slice = row.as_slice_mut().expect("row-major layout");
        row_fft.process(slice);
    }

    let col_fft = planner.plan_fft(rows, direction);
    let mut column = vec![Complex::zero(); rows];
    for j in 0..cols {
        for i in 0..rows {
            column[i] = data[[i, j]];
        }
        col_fft.process(&mut column);
        for i in 0..rows {
            data[[i, j]] = column[i];
        }
    }
}

/// Convolution of a real image with a complex kernel, output cropped to the
/// image shape (centered, matching `same`-mode convolution).
pub fn fftconvolve_same(image: &Array2<f32>, kernel: &Array2<Complex<f32>>) -> Array2<Complex<f32>> {
    let (ny, nx) = image.dim();
    let (ky, kx) = kernel.dim();
    let (p, q) = (ny + ky - 1, nx + kx - 1);

    let mut a = Array2::<Complex<f32>>::zeros((p, q));
    a.slice_mut(s![..ny, ..nx])
        .assign(&image.mapv(|v| Complex::new(v, 0.0)));

    let mut b = Array2::<Complex<f32>>::zeros((p, q));
    b.slice_mut(s![..ky, ..kx]).assign(kernel);

    fft2(&mut a, FftDirection::Forward);
    fft2(&mut b, FftDirection::Forward);
    a.zip_mut_with(&b, |u, &v| *u *= v);
    fft2(&mut a, FftDirection::Inverse);

    let scale = 1.0 / (p * q) as f32;
    let (oy, ox) = ((ky - 1) / 2, (kx - 1) / 2);
    Array2::from_shape_fn((ny, nx), |(i, j)| a[[i + oy, j + ox]] * scale)
}
