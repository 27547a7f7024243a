pub mod csg;
pub mod error;
pub mod gmsh;
pub mod math;
pub mod polygon;

pub use csg::{AxisBox, BoxCollection, Shape};
pub use error::{PoregeoError, Result};
pub use gmsh::{GeoScript, Geometry, MesherConfig};
pub use polygon::{MultiPolygonPore, Polygon, PolygonPore, Pore, PoreParams};
