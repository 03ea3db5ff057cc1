//! Dense vector kernels over the belief simplex.
//!
//! Every value function evaluation in the planner reduces to dot products
//! between value vectors and beliefs, so these helpers stay allocation-free
//! and deterministic: reductions run left to right and ties resolve to the
//! earliest index.

/// Default tolerance when checking whether a vector is a probability distribution.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Inner product of two equally sized slices.
///
/// Extra trailing entries of the longer slice are ignored; callers are
/// responsible for matching lengths.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Sum of all entries.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Element-wise `acc += other`.
pub fn add_assign(acc: &mut [f64], other: &[f64]) {
    for (a, b) in acc.iter_mut().zip(other.iter()) {
        *a += b;
    }
}

/// Divide every entry by the total mass.
///
/// Returns the mass that was divided out. When the mass is zero or not
/// finite the slice is left untouched and `None` is returned.
pub fn normalize_in_place(values: &mut [f64]) -> Option<f64> {
    let total = sum(values);
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    for v in values.iter_mut() {
        *v /= total;
    }
    Some(total)
}

/// Index of the first maximal element according to `score`.
///
/// Only a strictly greater score replaces the current best, so ties keep the
/// earlier index. NaN scores never win. Returns `None` for an empty iterator
/// or when every score is NaN.
pub fn argmax_by<T, I, F>(items: I, mut score: F) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, item) in items.into_iter().enumerate() {
        let value = score(item);
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((idx, value)),
        }
    }
    best
}

/// Index of the vector whose dot product with `point` is largest (first wins).
pub fn argmax_dot<V: AsRef<[f64]>>(vectors: &[V], point: &[f64]) -> Option<(usize, f64)> {
    argmax_by(vectors.iter(), |v| dot(v.as_ref(), point))
}

/// Largest absolute element-wise difference; infinite when lengths differ.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Element-wise equality within `tol`.
///
/// With `tol == 0.0` this is exact equality (so `-0.0 == 0.0` and NaN never
/// matches).
pub fn approx_eq_slices(a: &[f64], b: &[f64], tol: f64) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if tol == 0.0 {
        return a == b;
    }
    max_abs_diff(a, b) <= tol
}

/// Whether `values` is a finite, non-negative vector summing to one within `tol`.
pub fn is_distribution(values: &[f64], tol: f64) -> bool {
    !values.is_empty()
        && values.iter().all(|p| p.is_finite() && *p >= 0.0)
        && (sum(values) - 1.0).abs() <= tol
}
