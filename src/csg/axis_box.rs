use std::fmt;
use std::str::FromStr;

use crate::error::{GeometryError, PoregeoError, Result};
use crate::math::Float;

use super::shape::{union, Shape};

/// A `d`-dimensional axis-aligned box `[a_0, b_0] x ... x [a_{d-1}, b_{d-1}]`.
///
/// Endpoints are sorted on construction, so `a_i <= b_i` always holds. A box
/// whose interval is degenerate in `k` axes stands for a `(d - k)`-facet.
/// Equality is tolerant, see [`Float`].
#[derive(Debug, Clone, PartialEq)]
pub struct AxisBox {
    intervals: Vec<(Float, Float)>,
}

impl AxisBox {
    /// Creates a box from two opposite corners.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::DimensionMismatch` if the corners differ in
    /// length and `GeometryError::ZeroDimension` if they are empty.
    pub fn new(a: &[f64], b: &[f64]) -> Result<Self> {
        if a.len() != b.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: a.len(),
                found: b.len(),
            }
            .into());
        }
        let intervals: Vec<(f64, f64)> = a.iter().copied().zip(b.iter().copied()).collect();
        Self::from_intervals(&intervals)
    }

    /// Creates a box from one `(a, b)` pair per axis.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroDimension` if no interval is given.
    pub fn from_intervals(intervals: &[(f64, f64)]) -> Result<Self> {
        if intervals.is_empty() {
            return Err(GeometryError::ZeroDimension.into());
        }
        let intervals = intervals
            .iter()
            .map(|&(a, b)| (Float::new(a.min(b)), Float::new(a.max(b))))
            .collect();
        Ok(Self { intervals })
    }

    /// One-dimensional box `[a, b]`.
    #[must_use]
    pub fn interval(a: f64, b: f64) -> Self {
        Self {
            intervals: vec![(Float::new(a.min(b)), Float::new(a.max(b)))],
        }
    }

    /// Box with the given center and side lengths (`l`, `w`, `h`, ...).
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::DimensionMismatch` if `lengths` does not match
    /// the dimension of `center`.
    pub fn centered(center: &[f64], lengths: &[f64]) -> Result<Self> {
        if center.len() != lengths.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: center.len(),
                found: lengths.len(),
            }
            .into());
        }
        let intervals: Vec<(f64, f64)> = center
            .iter()
            .zip(lengths)
            .map(|(&c, &l)| (c - 0.5 * l, c + 0.5 * l))
            .collect();
        Self::from_intervals(&intervals)
    }

    /// Embedding dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.intervals.len()
    }

    /// Topological dimension, i.e. the number of non-degenerate axes.
    #[must_use]
    pub fn dimt(&self) -> usize {
        self.intervals.iter().filter(|(a, b)| a != b).count()
    }

    /// The per-axis intervals.
    #[must_use]
    pub fn intervals(&self) -> &[(Float, Float)] {
        &self.intervals
    }

    /// Lower corner.
    #[must_use]
    pub fn a(&self) -> Vec<f64> {
        self.intervals.iter().map(|(a, _)| a.value()).collect()
    }

    /// Upper corner.
    #[must_use]
    pub fn b(&self) -> Vec<f64> {
        self.intervals.iter().map(|(_, b)| b.value()).collect()
    }

    /// The `2 * dim` facets, ordered lower then upper per axis.
    #[must_use]
    pub fn facets(&self) -> Vec<AxisBox> {
        let mut facets = Vec::with_capacity(2 * self.dim());
        for (i, &(a, b)) in self.intervals.iter().enumerate() {
            for x in [a, b] {
                let mut intervals = self.intervals.clone();
                intervals[i] = (x, x);
                facets.push(AxisBox { intervals });
            }
        }
        facets
    }

    /// Union of the named facets; all facets if `sides` is empty.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::SideNotInDimension` if a side does not exist
    /// for this box's dimension.
    pub fn boundary(&self, sides: &[Side]) -> Result<Shape> {
        let facets = self.facets();
        let picked: Vec<AxisBox> = if sides.is_empty() {
            facets
        } else {
            sides
                .iter()
                .map(|side| side.facet_index(self.dim()).map(|i| facets[i].clone()))
                .collect::<Result<_>>()?
        };
        union(picked)
    }

    /// Like [`AxisBox::boundary`], with sides given by name.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::UnknownSide` for a malformed name.
    pub fn boundary_named(&self, names: &[&str]) -> Result<Shape> {
        let sides: Vec<Side> = names.iter().map(|s| s.parse()).collect::<Result<_>>()?;
        self.boundary(&sides)
    }
}

impl fmt::Display for AxisBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|(a, b)| format!("[{a}, {b}]"))
            .collect();
        write!(f, "Box({})", parts.join("x"))
    }
}

/// Named side of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Front,
    Back,
    Bottom,
    Top,
}

impl Side {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Front => "front",
            Side::Back => "back",
            Side::Bottom => "bottom",
            Side::Top => "top",
        }
    }

    /// Index of this side in [`AxisBox::facets`] for a box of dimension `dim`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::SideNotInDimension` if the side has no meaning
    /// in `dim` (e.g. `top` of an interval).
    pub fn facet_index(self, dim: usize) -> Result<usize> {
        let index = match (dim, self) {
            (1..=3, Side::Left) => Some(0),
            (1..=3, Side::Right) => Some(1),
            (2, Side::Bottom) | (3, Side::Front) => Some(2),
            (2, Side::Top) | (3, Side::Back) => Some(3),
            (3, Side::Bottom) => Some(4),
            (3, Side::Top) => Some(5),
            _ => None,
        };
        index.ok_or_else(|| {
            GeometryError::SideNotInDimension {
                side: self.as_str(),
                dim,
            }
            .into()
        })
    }
}

impl FromStr for Side {
    type Err = PoregeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "front" => Ok(Side::Front),
            "back" => Ok(Side::Back),
            "bottom" => Ok(Side::Bottom),
            "top" => Ok(Side::Top),
            other => Err(GeometryError::UnknownSide(other.to_owned()).into()),
        }
    }
}
