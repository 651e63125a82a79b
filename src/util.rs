use ndarray::{Array2, ArrayView2};

pub(crate) const EPS: f32 = 1e-12;

pub(crate) fn min_max(field: &ArrayView2<f32>) -> (f32, f32) {
    field.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Min-max rescale onto [0, 1]. A constant field maps to all zeros.
pub(crate) fn normalize_unit(field: &ArrayView2<f32>) -> Array2<f32> {
    let (lo, hi) = min_max(field);
    let span = (hi - lo).max(EPS);
    field.mapv(|v| (v - lo) / span)
}
