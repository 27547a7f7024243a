//! Emission of box decompositions as gmsh geometry scripts, and the call-out
//! to the external mesher.

pub mod emit;
pub mod mesher;
pub mod script;

pub use emit::{entities_to_gmsh, physical_to_gmsh, Emission};
pub use mesher::{geo_from_meshdir, to_mesh, Geometry, MeshFiles, MesherConfig};
pub use script::{GeoScript, Oriented, PhysicalMeta};
