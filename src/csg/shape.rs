use std::ops::{BitAnd, BitOr, Sub};

use crate::error::{GeometryError, Result};

use super::axis_box::AxisBox;
use super::collection::BoxCollection;
use super::decompose::Decomposition;
use super::expr::{CsgEvaluator, CsgExpr, SetOp};
use super::interval::IndexSet;
use super::registry::BoxStore;

/// Operand of the set algebra: either a single box or a composed collection.
#[derive(Debug, Clone)]
pub enum Shape {
    Box(AxisBox),
    Collection(BoxCollection),
}

impl Shape {
    /// The set expression this shape stands for.
    #[must_use]
    pub fn csg(&self) -> CsgExpr {
        match self {
            Shape::Box(b) => CsgExpr::leaf(b.clone()),
            Shape::Collection(c) => c.csg().clone(),
        }
    }

    /// The constituent boxes.
    #[must_use]
    pub fn boxes(&self) -> &[AxisBox] {
        match self {
            Shape::Box(b) => std::slice::from_ref(b),
            Shape::Collection(c) => c.boxes(),
        }
    }

    /// Cells of this shape in a decomposition: a box's native index set, or a
    /// collection's evaluated expression.
    ///
    /// # Errors
    ///
    /// Returns an error if a constituent box was not part of the decomposition.
    pub fn index_set(&self, store: &BoxStore, decomposition: &Decomposition) -> Result<IndexSet> {
        CsgEvaluator::new(store, decomposition).eval(&self.csg())
    }

    pub(crate) fn combine(self, op: SetOp, other: Shape) -> BoxCollection {
        let mut boxes = self.boxes().to_vec();
        for b in other.boxes() {
            if !boxes.contains(b) {
                boxes.push(b.clone());
            }
        }
        let csg = CsgExpr::combine(op, self.csg(), other.csg());
        BoxCollection::compose(boxes, csg)
    }
}

impl From<AxisBox> for Shape {
    fn from(b: AxisBox) -> Self {
        Shape::Box(b)
    }
}

impl From<&AxisBox> for Shape {
    fn from(b: &AxisBox) -> Self {
        Shape::Box(b.clone())
    }
}

impl From<BoxCollection> for Shape {
    fn from(c: BoxCollection) -> Self {
        Shape::Collection(c)
    }
}

impl From<&BoxCollection> for Shape {
    fn from(c: &BoxCollection) -> Self {
        Shape::Collection(c.clone())
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}

macro_rules! impl_set_ops {
    ($($ty:ty),*) => {$(
        impl<T: Into<Shape>> BitOr<T> for $ty {
            type Output = BoxCollection;
            fn bitor(self, rhs: T) -> BoxCollection {
                Shape::from(self).combine(SetOp::Union, rhs.into())
            }
        }

        impl<T: Into<Shape>> BitAnd<T> for $ty {
            type Output = BoxCollection;
            fn bitand(self, rhs: T) -> BoxCollection {
                Shape::from(self).combine(SetOp::Intersect, rhs.into())
            }
        }

        impl<T: Into<Shape>> Sub<T> for $ty {
            type Output = BoxCollection;
            fn sub(self, rhs: T) -> BoxCollection {
                Shape::from(self).combine(SetOp::Difference, rhs.into())
            }
        }
    )*};
}

impl_set_ops!(Shape, &Shape, AxisBox, &AxisBox, BoxCollection, &BoxCollection);

fn fold(seq: impl IntoIterator<Item = impl Into<Shape>>, op: SetOp) -> Result<Shape> {
    let mut iter = seq.into_iter().map(Into::<Shape>::into);
    let first = iter.next().ok_or(GeometryError::EmptySequence)?;
    Ok(iter.fold(first, |acc, next| Shape::Collection(acc.combine(op, next))))
}

/// Union of a non-empty sequence of shapes. A single shape is returned as is.
///
/// # Errors
///
/// Returns `GeometryError::EmptySequence` if `seq` is empty.
pub fn union(seq: impl IntoIterator<Item = impl Into<Shape>>) -> Result<Shape> {
    fold(seq, SetOp::Union)
}

/// Intersection of a non-empty sequence of shapes.
///
/// # Errors
///
/// Returns `GeometryError::EmptySequence` if `seq` is empty.
pub fn intersection(seq: impl IntoIterator<Item = impl Into<Shape>>) -> Result<Shape> {
    fold(seq, SetOp::Intersect)
}
