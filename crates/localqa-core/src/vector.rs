//! Small dense-vector helpers used at query time.

use crate::types::Metric;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let n = norm(v);
    if n > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
}

impl Metric {
    /// Similarity of `candidate` to `query`; higher is nearer for every metric.
    pub fn similarity(self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Metric::Dot => dot(query, candidate),
            Metric::L2 => -squared_l2(query, candidate),
        }
    }
}
