pub mod tolerance;

pub use tolerance::{compare, unique, Float};

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// Absolute tolerance for box coordinate comparisons.
pub const TOLERANCE: f64 = 1e-10;
