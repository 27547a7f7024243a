//! Polygon clipping and assembly of axisymmetric 2D pore geometries.
//!
//! Polygons live in the `(r, z)` half plane with the symmetry axis at
//! `r = 0`. A pore is built by cutting a protein outline into named regions
//! (membrane, pore sections, bulk fluids, molecule) and collecting the
//! boundary edges between them.

pub mod clip;
pub mod multi;
pub mod node;
pub mod params;
pub mod pore;
pub mod region;
pub mod union;

pub use clip::{Context, Corners, Direction, Polygon};
pub use multi::MultiPolygonPore;
pub use node::{nodes_to_edges, Edge, EdgeSet, Node};
pub use params::PoreParams;
pub use pore::{Pore, PoreLayout, PolygonPore, BULKFLUID_BOTTOM, BULKFLUID_TOP, MEMBRANE, MOLECULE};
pub use region::{HalfCircle, NamedMap, PoreRegion};
pub use union::{compute_disjoint_union, compute_lower_boundary, compute_upper_boundary, is_a_hole};
