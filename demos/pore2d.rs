//! Builds a small 2D pore from a TOML parameter block and prints its regions
//! and boundaries, then emits the gmsh script of a box geometry with a
//! channel through a membrane.
//!
//! ```text
//! cargo run --example pore2d
//! RUST_LOG=poregeo=debug cargo run --example pore2d
//! ```

use poregeo::csg::Side;
use poregeo::polygon::Pore;
use poregeo::{AxisBox, PolygonPore, PoreParams, Result};

const PARAMS: &str = r"
    R = 10.0
    H = 20.0
    hmem = 1.0
    zmem = 0.0
    cs = [0.5]
    x0 = [0.0, 0.0, -0.75]
    rMolecule = 0.5
";

const PROTEIN: [(f64, f64); 4] = [(1.0, -2.0), (1.0, 2.0), (3.0, 2.0), (3.0, -2.0)];

fn polygon_pore() -> Result<()> {
    let params = PoreParams::from_toml(PARAMS)?;
    let mut pore = PolygonPore::new(PROTEIN, "protein", params)?;
    pore.build_boundaries()?;

    println!("regions:");
    for (name, region) in pore.polygons().iter() {
        println!("  {name}: {} nodes", region.nodes().len());
    }
    println!("boundaries:");
    for (name, edges) in pore.boundaries().iter() {
        println!("  {name}: {} edges", edges.len());
    }
    if let Some(domain) = pore.where_is_molecule()? {
        println!("molecule sits in {domain}");
    }
    Ok(())
}

fn box_geometry() -> Result<()> {
    let domain = AxisBox::new(&[0.0, -5.0], &[5.0, 5.0])?;
    let membrane = AxisBox::new(&[1.0, -0.5], &[5.0, 0.5])?;
    let channel = AxisBox::new(&[0.0, -0.5], &[1.0, 0.5])?;

    let mut geo = &domain - &membrane;
    geo.add_subdomain(&channel, "pore");
    geo.add_boundary(domain.boundary(&[Side::Top, Side::Bottom])?, "outer");
    geo.add_boundary(membrane.boundary(&[Side::Top, Side::Bottom])?, "membrane");
    geo.set_param("lc", 0.5);

    let emission = geo.emit(0.5)?;
    println!("{}", emission.script.code());
    Ok(())
}

fn main() -> Result<()> {
    // Default: WARN for everything, INFO for poregeo.
    // Override with RUST_LOG env var (e.g. RUST_LOG=poregeo=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("pore2d=info".parse().unwrap_or_default())
        .add_directive("poregeo=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    polygon_pore()?;
    box_geometry()
}
