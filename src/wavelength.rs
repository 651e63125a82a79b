//! Characteristic wavelength estimation and the length-scale maps derived
//! from it.
//!
//! The wavelength is the fundamental repeat distance of a (single-symmetry)
//! pattern. A first estimate comes from the radially averaged power spectrum;
//! the estimate is then iterated against the spectrum of the dominant-order
//! filter response until it stops moving. Every downstream method receives
//! its beta through one of the lambda-to-beta maps below.

use log::debug;
use ndarray::Array2;
use rustfft::{num_complex::Complex, FftDirection};

use crate::error::{Result, ShapeletError};
use crate::iterate::{refine, Convergence};
use crate::response::engine::response_plane_n0;
use crate::response::fft::fft2;
use crate::response::grid::{midline_n1, optimal_width_n1};

#[derive(Debug, Clone, Copy)]
pub struct WavelengthConfig {
    /// Wavelength window (pixels) searched for the spectral peak.
    pub range: (f64, f64),
    /// Bank size probed when locating the dominant-order response.
    pub probe_orders: u32,
    pub convergence: Convergence,
}

impl Default for WavelengthConfig {
    fn default() -> Self {
        Self {
            range: (0.0, 100.0),
            probe_orders: 6,
            convergence: Convergence::new(0.5, 10),
        }
    }
}

/// Radially averaged intensity, one value per integer radius starting at 1.
/// Non-square fields are averaged elliptically.
pub fn radial_average(field: &Array2<f64>) -> Vec<f64> {
    let (ny, nx) = field.dim();
    let cx = (nx - 1) as f64 / 2.0;
    let cy = (ny - 1) as f64 / 2.0;
    let length = cx.min(cy);

    let max_radius = (2.0_f64.sqrt() * length).round() as usize;
    let mut sums = vec![0.0; max_radius + 1];
    let mut counts = vec![0usize; max_radius + 1];

    for ((i, j), &v) in field.indexed_iter() {
        let x = (j as f64 - cx) * length / cx.max(1.0);
        let y = (i as f64 - cy) * length / cy.max(1.0);
        let r = x.hypot(y).round() as usize;
        if r >= 1 && r <= max_radius {
            sums[r] += v;
            counts[r] += 1;
        }
    }

    (1..=max_radius)
        .filter(|&r| counts[r] > 0)
        .map(|r| sums[r] / counts[r] as f64)
        .collect()
}

fn fftshift_mag(spectrum: &Array2<Complex<f32>>) -> Array2<f64> {
    let (ny, nx) = spectrum.dim();
    Array2::from_shape_fn((ny, nx), |(i, j)| {
        let si = (i + ny - ny / 2) % ny;
        let sj = (j + nx - nx / 2) % nx;
        spectrum[[si, sj]].norm() as f64
    })
}

fn fftfreq(n: usize, k: usize) -> f64 {
    let half = (n - 1) / 2;
    if k <= half {
        k as f64 / n as f64
    } else {
        (k as f64 - n as f64) / n as f64
    }
}

/// Single-shot estimate: peak of the radially averaged power spectrum inside
/// the wavelength window.
pub fn spectral_wavelength(field: &Array2<f32>, range: (f64, f64)) -> Result<f64> {
    let (ny, nx) = field.dim();

    let mut spectrum = field.mapv(|v| Complex::new(v, 0.0));
    fft2(&mut spectrum, FftDirection::Forward);
    // pin the DC component so a constant offset cannot win the peak search
    spectrum[[0, 0]] = Complex::new(0.1, 0.0);
    let density = fftshift_mag(&spectrum);

    let freq_field = Array2::from_shape_fn((ny, nx), |(i, j)| {
        let fy = fftfreq(ny, (i + ny - ny / 2) % ny);
        let fx = fftfreq(nx, (j + nx - nx / 2) % nx);
        fx.hypot(fy)
    });

    let spec = radial_average(&density);
    let wave: Vec<f64> = radial_average(&freq_field)
        .into_iter()
        .map(|f| 1.0 / f)
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (k, (&s, &w)) in spec.iter().zip(wave.iter()).enumerate() {
        if w >= range.0 && w <= range.1 && best.map_or(true, |(_, bs)| s > bs) {
            best = Some((k, s));
        }
    }
    match best {
        Some((k, _)) => Ok(wave[k]),
        None => Err(ShapeletError::InvalidBounds(format!(
            "no spectral bin inside the wavelength window [{}, {}]",
            range.0, range.1
        ))),
    }
}

/// Iteratively converged characteristic wavelength.
///
/// Each pass evaluates the filter bank at the current estimate, selects the
/// order with the strongest total response, and re-estimates the wavelength
/// from the spectrum of that band-passed field. Exceeding the iteration cap
/// is an estimation failure; the last iterate is never returned.
pub fn characteristic_wavelength(image: &Array2<f32>, cfg: &WavelengthConfig) -> Result<f64> {
    if cfg.probe_orders == 0 {
        return Err(ShapeletError::InvalidConfig(
            "probe_orders must be >= 1".into(),
        ));
    }
    let initial = spectral_wavelength(image, cfg.range)?;

    let refined = refine(
        "wavelength estimation",
        initial,
        |&lambda| {
            let mut dominant: Option<(f64, Array2<Complex<f32>>)> = None;
            for m in 1..=cfg.probe_orders {
                let plane = response_plane_n0(image, m, lambda)?;
                let total: f64 = plane.iter().map(|c| c.norm() as f64).sum();
                if dominant.as_ref().map_or(true, |(t, _)| total > *t) {
                    dominant = Some((total, plane));
                }
            }
            let (_, plane) = dominant.expect("probe_orders >= 1");
            let filtered = plane.mapv(|c| c.re);
            spectral_wavelength(&filtered, cfg.range)
        },
        |prev, next| (prev - next).abs(),
        &cfg.convergence,
    )?;

    debug!(
        "wavelength of image is {:.2} pixels ({} iterations)",
        refined.value, refined.iterations
    );
    Ok(refined.value)
}

/// Length scale for the n=0 orthonormal filters: beta = f(m) * lambda / sqrt(m)
/// with the geometric factor tuned per symmetry.
pub fn beta_n0(m: u32, lambda: f64) -> f64 {
    let f = match m {
        1 => 0.25,
        2 => 0.5,
        3 => 1.0 / 3f64.sqrt(),
        4 => 2f64.sqrt() / 2.0,
        _ => 1.0,
    };
    lambda / (m as f64).sqrt() * f
}

#[derive(Debug, Clone)]
struct BetaSearch {
    beta: f64,
    /// Signed miss of the lobe midpoint against the 1.5 * lambda target;
    /// NaN while the midline peaks cannot be paired.
    rel: f64,
}

fn midline_miss(m: u32, beta: f64, target: f64) -> Result<f64> {
    let width = optimal_width_n1(m, beta)?;
    let row = midline_n1(m, beta, width)?;
    let half = (width - 1) / 2;

    // interior extrema right of center: the inner and outer lobe of the filter
    let mut peaks = Vec::new();
    for p in (half + 1)..(row.len() - 1) {
        if (row[p - 1] < row[p] && row[p] > row[p + 1])
            || (row[p - 1] > row[p] && row[p] < row[p + 1])
        {
            peaks.push(p as f64);
        }
    }
    if peaks.len() != 2 {
        return Ok(f64::NAN);
    }
    let midpoint = ((peaks[1] - peaks[0]) / 2.0).round() + peaks[0];
    Ok(target - (midpoint - half as f64))
}

/// Length scale for the n=1 filters, found numerically: widen or narrow beta
/// until the midline lobe midpoint sits 1.5 * lambda from the filter center.
pub fn beta_n1(m: u32, lambda: f64) -> Result<f64> {
    let target = (lambda * 1.5).round();
    let initial = BetaSearch {
        beta: 1.0,
        rel: midline_miss(m, 1.0, target)?,
    };

    let refined = refine(
        "n=1 length-scale search",
        initial,
        |state| {
            if state.rel.abs() <= 1.0 {
                return Ok(state.clone());
            }
            let beta = if state.rel.is_nan() {
                state.beta + 0.2
            } else if state.rel > 0.0 {
                // undershot: adaptive growth
                state.beta + if state.rel < 2.0 { 0.1 } else { 0.3 * state.rel }
            } else {
                // overshot: step back down
                state.beta + state.rel * 0.1
            };
            let beta = beta.max(0.1);
            Ok(BetaSearch {
                beta,
                rel: midline_miss(m, beta, target)?,
            })
        },
        |_, next| next.rel.abs(),
        &Convergence::new(1.0, 100),
    )?;

    Ok(refined.value.beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::stripe_image;
    use approx::assert_relative_eq;

    #[test]
    fn radial_average_of_radius_field_is_identity() {
        let n = 21;
        let c = (n - 1) as f64 / 2.0;
        let field = Array2::from_shape_fn((n, n), |(i, j)| {
            (j as f64 - c).hypot(i as f64 - c)
        });
        let rai = radial_average(&field);
        // each bin averages radii that round to it
        for (k, &v) in rai.iter().take(8).enumerate() {
            assert_relative_eq!(v, (k + 1) as f64, epsilon = 0.5);
        }
    }

    #[test]
    fn spectral_peak_of_stripe_pattern() {
        let image = stripe_image(64, 64, 8.0);
        let lambda = spectral_wavelength(&image, (0.0, 100.0)).unwrap();
        assert_relative_eq!(lambda, 8.0, epsilon = 1.0);
    }

    #[test]
    fn wavelength_window_can_be_unsatisfiable() {
        let image = stripe_image(32, 32, 8.0);
        assert!(spectral_wavelength(&image, (500.0, 600.0)).is_err());
    }

    #[test]
    fn iterated_estimate_agrees_with_stripe_period() {
        let image = stripe_image(64, 64, 8.0);
        let cfg = WavelengthConfig {
            probe_orders: 2,
            ..WavelengthConfig::default()
        };
        let lambda = characteristic_wavelength(&image, &cfg).unwrap();
        assert_relative_eq!(lambda, 8.0, epsilon = 1.5);
    }

    #[test]
    fn beta_n0_factor_table() {
        let l = 10.0;
        assert_relative_eq!(beta_n0(1, l), 2.5);
        assert_relative_eq!(beta_n0(2, l), 5.0 / 2f64.sqrt());
        assert_relative_eq!(beta_n0(3, l), 10.0 / 3f64.sqrt() / 3f64.sqrt());
        assert_relative_eq!(beta_n0(4, l), 5.0 * 2f64.sqrt() / 2.0);
        assert_relative_eq!(beta_n0(7, l), 10.0 / 7f64.sqrt());
    }

    #[test]
    fn beta_n1_lands_near_target_spacing() {
        let lambda = 8.0;
        let beta = beta_n1(1, lambda).unwrap();
        assert!(beta > 0.0);
        // re-measure the midline spacing at the accepted beta
        let miss = midline_miss(1, beta, (lambda * 1.5).round()).unwrap();
        assert!(miss.abs() <= 1.0, "miss = {miss}");
    }
}
