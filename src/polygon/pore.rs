use tracing::debug;

use crate::error::{PolygonError, Result};

use super::clip::{Context, Corners, Polygon};
use super::node::{Edge, EdgeSet, Node};
use super::params::PoreParams;
use super::region::{HalfCircle, NamedMap, PoreRegion};
use super::union::{compute_lower_boundary, compute_upper_boundary};

pub const MEMBRANE: &str = "membrane";
pub const BULKFLUID_TOP: &str = "bulkfluid_top";
pub const BULKFLUID_BOTTOM: &str = "bulkfluid_bottom";
pub const MOLECULE: &str = "molecule";

/// Cross-sections closer than this to the molecule are dropped.
const MOLECULE_MARGIN: f64 = 0.5;

fn section_name(i: usize) -> String {
    format!("pore{i}")
}

fn check_cross_sections(cs: &[f64], zbot: f64, ztop: f64) -> Result<()> {
    match cs.iter().find(|&&z| z <= zbot || z >= ztop) {
        Some(&z) => Err(PolygonError::CrossSectionOutOfRange { z, zbot, ztop }.into()),
        None => Ok(()),
    }
}

/// Regions and boundaries shared by the pore builders, together with the
/// state of the build pipeline.
#[derive(Debug, Clone)]
pub struct PoreLayout {
    params: PoreParams,
    molecule: Option<(f64, f64)>,
    pub(crate) protein: Polygon,
    pub(crate) polygons: NamedMap<PoreRegion>,
    pub(crate) boundaries: NamedMap<EdgeSet>,
    cs: Option<Vec<f64>>,
    nsections: usize,
    lpore: f64,
    pub(crate) built: bool,
}

impl PoreLayout {
    pub(crate) fn new(params: PoreParams, protein: Polygon) -> Result<Self> {
        let molecule = params.molecule()?;
        Ok(Self {
            params,
            molecule,
            protein,
            polygons: NamedMap::new(),
            boundaries: NamedMap::new(),
            cs: None,
            nsections: 0,
            lpore: 0.0,
            built: false,
        })
    }

    #[must_use]
    pub fn params(&self) -> &PoreParams {
        &self.params
    }

    /// The outline all other regions are cut from.
    #[must_use]
    pub fn protein(&self) -> &Polygon {
        &self.protein
    }

    #[must_use]
    pub fn polygons(&self) -> &NamedMap<PoreRegion> {
        &self.polygons
    }

    #[must_use]
    pub fn boundaries(&self) -> &NamedMap<EdgeSet> {
        &self.boundaries
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of pore sections, zero before building.
    #[must_use]
    pub fn nsections(&self) -> usize {
        self.nsections
    }

    /// Height of the protein outline, zero before building.
    #[must_use]
    pub fn pore_length(&self) -> f64 {
        self.lpore
    }

    /// Heights separating the bulk fluids and the pore sections, bottom to top.
    #[must_use]
    pub fn cross_sections(&self) -> Option<&[f64]> {
        self.cs.as_deref()
    }

    /// Whether a cut at height `z` would pass through or close by the molecule.
    #[must_use]
    pub fn molecule_intersects(&self, z: f64) -> bool {
        self.molecule.is_some_and(|(z0, r)| {
            z0 - r - MOLECULE_MARGIN <= z && z <= z0 + r + MOLECULE_MARGIN
        })
    }

    /// Name of the region holding the molecule, judged by its height only.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NotBuilt` if a molecule is configured but the
    /// pore sections have not been cut yet.
    pub fn where_is_molecule(&self) -> Result<Option<String>> {
        let Some((z, _)) = self.molecule else {
            return Ok(None);
        };
        let cs = self.cs.as_deref().ok_or(PolygonError::NotBuilt)?;
        let i = cs.partition_point(|&c| c <= z);
        let name = if i == 0 {
            BULKFLUID_BOTTOM.to_owned()
        } else if i > self.nsections {
            BULKFLUID_TOP.to_owned()
        } else {
            section_name(i - 1)
        };
        Ok(Some(name))
    }

    pub(crate) fn protein_range(&self) -> Result<(f64, f64)> {
        self.protein
            .y_range()
            .ok_or_else(|| PolygonError::MissingRegion("protein".to_owned()).into())
    }

    pub(crate) fn region(&self, name: &str) -> Result<&Polygon> {
        self.polygons
            .get(name)
            .and_then(PoreRegion::as_polygon)
            .ok_or_else(|| PolygonError::MissingRegion(name.to_owned()).into())
    }

    pub(crate) fn add_membrane(&mut self) -> Result<()> {
        let (zbot, ztop) = self.params.membrane()?;
        let r = self.params.radius()?;
        let membrane = self.protein.clip_from_right(zbot, ztop, r)?;
        self.polygons.insert(MEMBRANE, PoreRegion::Polygon(membrane));
        Ok(())
    }

    pub(crate) fn add_empty_membrane(&mut self) {
        self.polygons.insert(MEMBRANE, PoreRegion::Empty);
    }

    /// Cuts the pore interior between the axis and the protein into sections
    /// at the configured heights, skipping cuts through the molecule.
    pub(crate) fn add_poresections(&mut self) -> Result<Vec<String>> {
        let (zbot, ztop) = self.protein_range()?;
        let mut cs = self.params.cs.clone();
        check_cross_sections(&cs, zbot, ztop)?;
        cs.sort_by(f64::total_cmp);
        cs.insert(0, zbot);
        cs.push(ztop);
        cs.retain(|&z| !self.molecule_intersects(z));

        let mut names = Vec::with_capacity(cs.len().saturating_sub(1));
        for (i, pair) in cs.windows(2).enumerate() {
            let section = self.protein.clip_from_left(pair[0], pair[1], 0.0)?;
            let name = section_name(i);
            self.polygons.insert(name.clone(), PoreRegion::Polygon(section));
            names.push(name);
        }
        self.nsections = names.len();
        self.lpore = ztop - zbot;
        self.cs = Some(cs);
        Ok(names)
    }

    /// Adds the fluid reservoirs above and below, bounded by the silhouette
    /// of the sections, the protein and the membrane.
    pub(crate) fn add_bulkfluids(&mut self, sections: &[String]) -> Result<()> {
        let r = self.params.radius()?;
        let (htop, hbot) = self.params.heights()?;

        let mut parts: Vec<&Polygon> = sections
            .iter()
            .filter_map(|name| self.polygons.get(name).and_then(PoreRegion::as_polygon))
            .collect();
        parts.push(&self.protein);
        if let Some(membrane) = self.polygons.get(MEMBRANE).and_then(PoreRegion::as_polygon) {
            parts.push(membrane);
        }
        let upper = compute_upper_boundary(&parts)?;
        let lower = compute_lower_boundary(&parts)?;

        let (Some(&ufirst), Some(&ulast)) = (upper.first(), upper.last()) else {
            return Err(PolygonError::NoAxisNode.into());
        };
        let (b, c) = (Node::new(0.0, htop), Node::new(r, htop));
        let mut nodes = vec![b, c];
        nodes.extend(upper);
        let btop = Polygon::new(nodes).with_corners(Corners {
            a: ulast,
            b,
            c,
            d: ufirst,
        });

        let (Some(&lfirst), Some(&llast)) = (lower.first(), lower.last()) else {
            return Err(PolygonError::NoAxisNode.into());
        };
        let (d, a) = (Node::new(r, -hbot), Node::new(0.0, -hbot));
        let mut nodes = lower;
        nodes.extend([d, a]);
        let bbot = Polygon::new(nodes).with_corners(Corners {
            a,
            b: lfirst,
            c: llast,
            d,
        });

        self.polygons.insert(BULKFLUID_TOP, PoreRegion::Polygon(btop));
        self.polygons.insert(BULKFLUID_BOTTOM, PoreRegion::Polygon(bbot));
        Ok(())
    }

    /// Places the molecule half disc on the axis edge of the region holding
    /// it. Moves the molecule to the front of the region list; the first
    /// region's mesh size wins where regions meet.
    pub(crate) fn add_molecule(&mut self) -> Result<()> {
        if self.params.is_3d() {
            return Ok(());
        }
        let (Some((z, r)), Some(name)) = (self.molecule, self.where_is_molecule()?) else {
            self.polygons.insert(MOLECULE, PoreRegion::Empty);
            return Ok(());
        };
        let molecule = HalfCircle::new(z, r);
        let domain = self
            .polygons
            .get_mut(&name)
            .and_then(PoreRegion::as_polygon_mut)
            .ok_or_else(|| PolygonError::MissingRegion(name.clone()))?;
        let Corners { a, b, .. } = domain.require_corners(&name)?;
        let [x1, x2, x3] = molecule.nodes();
        domain.add(x1, Context::Between(a, b))?;
        domain.add(x3, Context::Between(x1, b))?;
        domain.replace_edge(Edge::Segment(x1, x3), Edge::Arc(x1, x2, x3))?;
        self.polygons.insert_first(MOLECULE, PoreRegion::HalfCircle(molecule));
        debug!(domain = %name, z, r, "placed molecule");
        Ok(())
    }

    /// Membrane edges facing the bulk fluids; empty without a membrane.
    pub(crate) fn membrane_boundary(&self) -> Result<EdgeSet> {
        match self.polygons.get(MEMBRANE) {
            Some(PoreRegion::Polygon(membrane)) => {
                let c = membrane.require_corners(MEMBRANE)?;
                let mut memb = membrane.edgerange(c.b, c.c)?;
                memb.extend(membrane.edgerange(c.d, c.a)?);
                Ok(memb)
            }
            Some(_) => Ok(EdgeSet::new()),
            None => Err(PolygonError::MissingRegion(MEMBRANE.to_owned()).into()),
        }
    }

    /// `(upperb, lowerb, sideb)`: the top lid, the bottom lid and the two
    /// outer walls of the bulk fluids.
    pub(crate) fn outer_boundaries(&self) -> Result<(EdgeSet, EdgeSet, EdgeSet)> {
        let btop = self.region(BULKFLUID_TOP)?;
        let bbot = self.region(BULKFLUID_BOTTOM)?;
        let t = btop.require_corners(BULKFLUID_TOP)?;
        let b = bbot.require_corners(BULKFLUID_BOTTOM)?;
        let upperb = btop.edgerange(t.b, t.c)?;
        let lowerb = bbot.edgerange(b.d, b.a)?;
        let mut sideb = btop.edgerange(t.c, t.d)?;
        sideb.extend(bbot.edgerange(b.c, b.d)?);
        Ok((upperb, lowerb, sideb))
    }

    /// Reversed edges of all fluid regions, i.e. the edges a solid region
    /// shares with the fluid.
    pub(crate) fn fluid_edges(&self) -> Result<EdgeSet> {
        let mut fluid = EdgeSet::new();
        let names = [BULKFLUID_TOP.to_owned(), BULKFLUID_BOTTOM.to_owned()]
            .into_iter()
            .chain((0..self.nsections).map(section_name));
        for name in names {
            fluid.extend(self.region(&name)?.edges().iter().map(|e| e.reversed()));
        }
        Ok(fluid)
    }

    pub(crate) fn molecule_boundary(&self) -> EdgeSet {
        self.polygons
            .get(MOLECULE)
            .map(PoreRegion::boundary)
            .unwrap_or_default()
    }

    /// Runs the shared part of the pipeline once the protein outline and the
    /// membrane are in place.
    pub(crate) fn build_fluids(&mut self) -> Result<()> {
        let sections = self.add_poresections()?;
        self.add_bulkfluids(&sections)?;
        self.add_molecule()?;
        self.built = true;
        debug!(
            regions = self.polygons.len(),
            sections = self.nsections,
            "built pore regions"
        );
        Ok(())
    }
}

/// A 2D pore geometry assembled from a protein outline.
pub trait Pore {
    fn layout(&self) -> &PoreLayout;

    /// Cuts the named regions, once.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is missing or a cut fails.
    fn build_polygons(&mut self) -> Result<&NamedMap<PoreRegion>>;

    /// Derives the named boundary edge sets, building the regions first if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if building fails or a region lacks its corners.
    fn build_boundaries(&mut self) -> Result<&NamedMap<EdgeSet>>;

    fn polygons(&self) -> &NamedMap<PoreRegion> {
        self.layout().polygons()
    }

    fn boundaries(&self) -> &NamedMap<EdgeSet> {
        self.layout().boundaries()
    }

    /// # Errors
    ///
    /// Returns `PolygonError::NotBuilt` before the regions are built.
    fn where_is_molecule(&self) -> Result<Option<String>> {
        self.layout().where_is_molecule()
    }
}

/// Pore around a single protein outline.
///
/// The pipeline clips the membrane off the protein, splits the pore interior
/// into sections, adds the bulk fluids and finally the molecule.
#[derive(Debug, Clone)]
pub struct PolygonPore {
    name: String,
    proteincs: Vec<f64>,
    layout: PoreLayout,
}

impl PolygonPore {
    /// Creates the pore and inserts the `proteincs` cuts into the outline.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::CrossSectionOutOfRange` for a cut outside the
    /// outline and `ConfigError::MissingParameter` for an incomplete molecule.
    pub fn new(
        poly: impl IntoIterator<Item = impl Into<Node>>,
        name: &str,
        params: PoreParams,
    ) -> Result<Self> {
        let mut proteincs = params.proteincs.clone();
        proteincs.sort_by(f64::total_cmp);
        let mut layout = PoreLayout::new(params, Polygon::new(poly))?;
        if !proteincs.is_empty() {
            let (zbot, ztop) = layout.protein_range()?;
            check_cross_sections(&proteincs, zbot, ztop)?;
            for &z in &proteincs {
                layout.protein.all_intersections(z)?;
            }
        }
        layout
            .polygons
            .insert(name, PoreRegion::Polygon(layout.protein.clone()));
        Ok(Self {
            name: name.to_owned(),
            proteincs,
            layout,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protein edges, whole or split by the height of their lower end, minus
    /// the interface with the membrane.
    fn protein_boundary(&self) -> Result<Vec<(String, EdgeSet)>> {
        let protein = &self.layout.protein;
        let mut parts = if self.proteincs.is_empty() {
            vec![(format!("{}b", self.name), protein.edge_set())]
        } else {
            let (zbot, ztop) = self.layout.protein_range()?;
            let mut cs = vec![zbot];
            cs.extend(&self.proteincs);
            cs.push(ztop);
            let npart = cs.len() - 1;
            let mut sets = vec![EdgeSet::new(); npart];
            for &edge in protein.edges() {
                let y = edge.lowest().y;
                let i = cs.partition_point(|&c| c <= y).saturating_sub(1).min(npart - 1);
                sets[i].insert(edge);
            }
            sets.into_iter()
                .enumerate()
                .map(|(i, set)| (format!("{}b{i}", self.name), set))
                .collect()
        };

        let membrane = self.layout.region(MEMBRANE)?;
        let c = membrane.require_corners(MEMBRANE)?;
        let interface = protein.edgerange(c.b, c.a)?;
        for (_, set) in &mut parts {
            set.retain(|e| !interface.contains(e));
        }
        Ok(parts)
    }
}

impl Pore for PolygonPore {
    fn layout(&self) -> &PoreLayout {
        &self.layout
    }

    fn build_polygons(&mut self) -> Result<&NamedMap<PoreRegion>> {
        if !self.layout.built {
            self.layout.add_membrane()?;
            self.layout.build_fluids()?;
            let protein = PoreRegion::Polygon(self.layout.protein.clone());
            self.layout.polygons.insert(self.name.clone(), protein);
        }
        Ok(&self.layout.polygons)
    }

    fn build_boundaries(&mut self) -> Result<&NamedMap<EdgeSet>> {
        self.build_polygons()?;
        let memb = self.layout.membrane_boundary()?;
        let (upperb, lowerb, sideb) = self.layout.outer_boundaries()?;
        let protein = self.protein_boundary()?;
        let moleculeb = self.layout.molecule_boundary();

        let boundaries = &mut self.layout.boundaries;
        boundaries.insert("memb", memb);
        boundaries.insert("upperb", upperb);
        boundaries.insert("lowerb", lowerb);
        boundaries.insert("sideb", sideb);
        for (name, set) in protein {
            boundaries.insert(name, set);
        }
        boundaries.insert("moleculeb", moleculeb);
        debug!(count = boundaries.len(), "built pore boundaries");
        Ok(&self.layout.boundaries)
    }
}
