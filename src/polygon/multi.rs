use tracing::debug;

use crate::error::{PolygonError, Result};

use super::clip::Polygon;
use super::node::{EdgeSet, Node};
use super::params::PoreParams;
use super::pore::{Pore, PoreLayout, MEMBRANE};
use super::region::{NamedMap, PoreRegion};
use super::union::compute_disjoint_union;

/// Pore whose solid part is made of several named polygons with disjoint
/// interiors, e.g. a protein together with a coating.
///
/// The polygons keep their names as regions. Their union must be simply
/// connected; it takes the place of the single protein outline.
#[derive(Debug, Clone)]
pub struct MultiPolygonPore {
    proteinb: NamedMap<EdgeSet>,
    layout: PoreLayout,
}

impl MultiPolygonPore {
    /// # Errors
    ///
    /// Returns `ConfigError::MissingParameter` for an incomplete molecule.
    pub fn new(params: PoreParams) -> Result<Self> {
        Ok(Self {
            proteinb: NamedMap::new(),
            layout: PoreLayout::new(params, Polygon::new(Vec::<Node>::new()))?,
        })
    }

    /// Adds solid polygons; their order is the region order.
    pub fn add_polygons<S: Into<String>>(&mut self, polygons: impl IntoIterator<Item = (S, Polygon)>) {
        for (name, polygon) in polygons {
            self.layout.polygons.insert(name, PoreRegion::Polygon(polygon));
        }
    }

    fn add_union(&mut self) -> Result<()> {
        let (names, parts): (Vec<&str>, Vec<&Polygon>) = self
            .layout
            .polygons
            .iter()
            .filter_map(|(name, region)| region.as_polygon().map(|p| (name, p)))
            .unzip();
        let (loops, owned) = compute_disjoint_union(&parts)?;
        let [protein]: [Polygon; 1] = loops
            .try_into()
            .map_err(|loops: Vec<Polygon>| PolygonError::NotSimplyConnected(loops.len()))?;
        self.proteinb = names
            .iter()
            .map(|name| format!("{name}b"))
            .zip(owned)
            .collect();
        self.layout.protein = protein;
        Ok(())
    }
}

impl Pore for MultiPolygonPore {
    fn layout(&self) -> &PoreLayout {
        &self.layout
    }

    fn build_polygons(&mut self) -> Result<&NamedMap<PoreRegion>> {
        if !self.layout.built {
            self.add_union()?;
            if self.layout.params().no_membrane {
                self.layout.add_empty_membrane();
            } else {
                self.layout.add_membrane()?;
            }
            self.layout.build_fluids()?;
        }
        Ok(&self.layout.polygons)
    }

    /// Like [`super::PolygonPore`], but the membrane and protein boundaries
    /// only keep edges that face a fluid region. Protein edges split by the
    /// cuts are credited to the polygon whose edge they lie on.
    fn build_boundaries(&mut self) -> Result<&NamedMap<EdgeSet>> {
        self.build_polygons()?;
        let layout = &self.layout;
        let (upperb, lowerb, sideb) = layout.outer_boundaries()?;
        let fluid = layout.fluid_edges()?;
        let memb = match layout.polygons.get(MEMBRANE) {
            Some(PoreRegion::Polygon(_)) => {
                let mut memb = layout.membrane_boundary()?;
                memb.retain(|e| fluid.contains(e));
                Some(memb)
            }
            _ => None,
        };
        let protein: Vec<(String, EdgeSet)> = self
            .proteinb
            .iter()
            .map(|(name, owned)| {
                let set = layout
                    .protein
                    .edges()
                    .iter()
                    .copied()
                    .filter(|e| fluid.contains(e) && owned.iter().any(|o| o.covers(*e)))
                    .collect();
                (name.to_owned(), set)
            })
            .collect();
        let moleculeb = layout.molecule_boundary();

        let boundaries = &mut self.layout.boundaries;
        boundaries.insert("upperb", upperb);
        boundaries.insert("lowerb", lowerb);
        boundaries.insert("sideb", sideb);
        if let Some(memb) = memb {
            boundaries.insert("memb", memb);
        }
        for (name, set) in protein {
            boundaries.insert(name, set);
        }
        boundaries.insert("moleculeb", moleculeb);
        debug!(count = boundaries.len(), "built pore boundaries");
        Ok(&self.layout.boundaries)
    }
}
