use std::cmp::Ordering;
use std::fmt;

use super::TOLERANCE;

/// Compares two scalars, treating them as equal when `|s - t| <= tol`.
///
/// The induced equality is not transitive: a chain of points spaced just
/// under `tol` apart compares equal pairwise without the ends being equal.
#[must_use]
pub fn compare(s: f64, t: f64, tol: f64) -> Ordering {
    if s > t + tol {
        Ordering::Greater
    } else if s < t - tol {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// A coordinate compared with the absolute tolerance [`TOLERANCE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Float(f64);

impl Float {
    /// Wraps a raw value.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Tolerant three-way comparison.
    #[must_use]
    pub fn cmp_tol(self, other: Self) -> Ordering {
        compare(self.0, other.0, TOLERANCE)
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_tol(*other) == Ordering::Equal
    }
}

impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_tol(*other))
    }
}

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Float> for f64 {
    fn from(value: Float) -> Self {
        value.0
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Removes approximate duplicates, keeping the first representative of each
/// class, and returns the survivors in ascending order.
///
/// Membership is tested against the survivors collected so far, so a value
/// within tolerance of an earlier survivor is absorbed by it.
#[must_use]
pub fn unique(values: impl IntoIterator<Item = Float>) -> Vec<Float> {
    let mut survivors: Vec<Float> = Vec::new();
    for v in values {
        if !survivors.contains(&v) {
            survivors.push(v);
        }
    }
    survivors.sort_by(|a, b| a.value().total_cmp(&b.value()));
    survivors
}
