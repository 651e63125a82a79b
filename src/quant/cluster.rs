//! K-means over response vectors.
//!
//! Lloyd iterations with a seeded initialization: identical seeds give
//! identical clusterings, run to run. Ties in the assignment step resolve to
//! the lowest centroid index.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::{Result, ShapeletError};

pub const DEFAULT_SEED: u64 = 42;

const MAX_LLOYD_ITERATIONS: usize = 300;

/// A partition of response vectors: one centroid per cluster, one label and
/// one Euclidean distance (to the owning centroid) per vector.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub centroids: Array2<f32>,
    pub labels: Vec<usize>,
    pub distances: Vec<f32>,
}

fn euclidean(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn assign(data: &ArrayView2<f32>, centroids: &Array2<f32>) -> (Vec<usize>, Vec<f32>) {
    let assignments: Vec<(usize, f32)> = data
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| {
            let mut best = (0usize, f32::INFINITY);
            for (c, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
                let d = euclidean(row, centroid);
                if d < best.1 {
                    best = (c, d);
                }
            }
            best
        })
        .collect();
    assignments.into_iter().unzip()
}

/// Partition `data` (one vector per row) into `k` clusters.
pub fn kmeans(data: ArrayView2<f32>, k: usize, seed: u64) -> Result<Clustering> {
    let n = data.nrows();
    if k == 0 {
        return Err(ShapeletError::InvalidConfig(
            "k-means requires at least one cluster".into(),
        ));
    }
    if k > n {
        return Err(ShapeletError::InvalidConfig(format!(
            "cannot form {k} clusters from {n} vectors"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let picks = rand::seq::index::sample(&mut rng, n, k);
    let mut centroids = Array2::zeros((k, data.ncols()));
    for (c, idx) in picks.iter().enumerate() {
        centroids.row_mut(c).assign(&data.row(idx));
    }

    let (mut labels, mut distances) = assign(&data, &centroids);
    for _ in 0..MAX_LLOYD_ITERATIONS {
        // recompute centroids sequentially so summation order is stable
        let mut sums = Array2::<f64>::zeros((k, data.ncols()));
        let mut counts = vec![0usize; k];
        for (i, row) in data.axis_iter(Axis(0)).enumerate() {
            let c = labels[i];
            counts[c] += 1;
            for (s, &v) in sums.row_mut(c).iter_mut().zip(row.iter()) {
                *s += v as f64;
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                // re-seed an empty cluster from the worst-fitting vector
                let worst = distances
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .expect("at least one vector");
                centroids.row_mut(c).assign(&data.row(worst));
            } else {
                let inv = 1.0 / counts[c] as f64;
                for (dst, &s) in centroids.row_mut(c).iter_mut().zip(sums.row(c).iter()) {
                    *dst = (s * inv) as f32;
                }
            }
        }

        let (next_labels, next_distances) = assign(&data, &centroids);
        let stable = next_labels == labels;
        labels = next_labels;
        distances = next_distances;
        if stable {
            break;
        }
    }

    Ok(Clustering {
        centroids,
        labels,
        distances,
    })
}
