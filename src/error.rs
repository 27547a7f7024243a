use thiserror::Error;

/// Top-level error type for the pore geometry toolkit.
#[derive(Debug, Error)]
pub enum PoregeoError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Csg(#[from] CsgError),

    #[error(transparent)]
    Polygon(#[from] PolygonError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while constructing boxes and their facets.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("a box needs at least one axis")]
    ZeroDimension,

    #[error("unknown boundary side: {0}")]
    UnknownSide(String),

    #[error("side {side} does not exist in dimension {dim}")]
    SideNotInDimension { side: &'static str, dim: usize },

    #[error("cannot combine an empty sequence of shapes")]
    EmptySequence,
}

/// Errors related to decomposition and set-expression evaluation.
#[derive(Debug, Error)]
pub enum CsgError {
    #[error("box {0} was not registered with the decomposition")]
    UnregisteredBox(String),

    #[error("endpoint {0} is not an atomic node")]
    MissingNode(f64),

    #[error("entities have not been computed yet")]
    NotComputed,

    #[error("subdomains leave {missing} cells of the domain uncovered")]
    CoverageViolation { missing: usize },

    #[error("entity {index} of dimension {dim} does not exist")]
    EntityNotFound { dim: usize, index: usize },
}

/// Errors raised by polygon clipping and pore assembly.
#[derive(Debug, Error)]
pub enum PolygonError {
    #[error("node ({x}, {y}) is not part of the polygon")]
    NodeNotFound { x: f64, y: f64 },

    #[error("no intersection with the line z = {z}")]
    NoIntersection { z: f64 },

    #[error("cross-section z = {z} lies outside ({zbot}, {ztop})")]
    CrossSectionOutOfRange { z: f64, zbot: f64, ztop: f64 },

    #[error("boundary walk got stuck at ({x}, {y})")]
    DeadEnd { x: f64, y: f64 },

    #[error("no node on the symmetry axis")]
    NoAxisNode,

    #[error("expected a simply connected union, found {0} boundary loops")]
    NotSimplyConnected(usize),

    #[error("region not found: {0}")]
    MissingRegion(String),

    #[error("region {0} carries no corner annotation")]
    MissingCorners(String),

    #[error("polygons have not been built yet")]
    NotBuilt,
}

/// Errors from writing geometry scripts and invoking the external mesher.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Metadata(#[from] serde_json::Error),

    #[error("{program} failed in generating this geometry (status {status})")]
    ToolFailed { program: String, status: String },

    #[error("no mesh entity was emitted for {dim}-entity {index}")]
    MissingEntity { dim: usize, index: usize },

    #[error("gmsh output is not available in dimension {0}")]
    UnsupportedDimension(usize),
}

/// Errors related to parameter sets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for results using [`PoregeoError`].
pub type Result<T> = std::result::Result<T, PoregeoError>;
