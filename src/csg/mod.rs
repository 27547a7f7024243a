//! Constructive solid geometry over axis-aligned boxes.
//!
//! Boxes are combined with `|`, `&` and `-` into [`BoxCollection`]s. A
//! collection is decomposed into disjoint atomic entities of every dimension
//! by [`multi_box_union`], after which set expressions and named regions are
//! evaluated to index sets into that decomposition.

pub mod axis_box;
pub mod collection;
pub mod decompose;
pub mod expr;
pub mod interval;
pub mod registry;
pub mod shape;

pub use axis_box::{AxisBox, Side};
pub use collection::{BoxCollection, Region, REST};
pub use decompose::{entity_facets, multi_box_union, Decomposition, Entity, EntityComplex, Piece};
pub use expr::{CsgEvaluator, CsgExpr, SetOp};
pub use interval::{multi_interval_union, IndexSet, IntervalUnion};
pub use registry::{BoxData, BoxId, BoxRole, BoxStore};
pub use shape::{intersection, union, Shape};
