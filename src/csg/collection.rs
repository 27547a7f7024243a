use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::error::{CsgError, Result};
use crate::gmsh::{entities_to_gmsh, geo_from_meshdir, physical_to_gmsh, to_mesh, Emission, Geometry, MesherConfig};

use super::axis_box::AxisBox;
use super::decompose::{multi_box_union, Decomposition};
use super::expr::{CsgEvaluator, CsgExpr};
use super::interval::IndexSet;
use super::registry::{BoxId, BoxRole, BoxStore};
use super::shape::Shape;

/// Name of the subdomain synthesised for uncovered cells.
pub const REST: &str = "rest";

/// A named subdomain or boundary of a [`BoxCollection`].
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    shape: Shape,
    index_set: IndexSet,
    synthetic: bool,
}

impl Region {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Cells of the region; empty until entities are computed.
    #[must_use]
    pub fn index_set(&self) -> &IndexSet {
        &self.index_set
    }

    /// Whether the region was added by [`BoxCollection::compute_entities`].
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

#[derive(Debug, Clone)]
struct Computed {
    store: BoxStore,
    decomposition: Decomposition,
    index_set: IndexSet,
    index_sets: Vec<IndexSet>,
}

/// A set expression over boxes together with named subdomains and boundaries.
///
/// Composition with `|`, `&` and `-` produces new collections and never
/// modifies the operands. After [`BoxCollection::compute_entities`] the
/// collection holds the decomposition of all its boxes and facets and the
/// index set of every region.
#[derive(Debug, Clone)]
pub struct BoxCollection {
    boxes: Vec<AxisBox>,
    facets: Vec<AxisBox>,
    csg: CsgExpr,
    subdomains: Vec<Region>,
    boundaries: Vec<Region>,
    params: BTreeMap<String, f64>,
    synonymes: BTreeMap<String, BTreeSet<String>>,
    computed: Option<Computed>,
}

fn merge(into: &mut Vec<AxisBox>, boxes: &[AxisBox]) {
    for b in boxes {
        if !into.contains(b) {
            into.push(b.clone());
        }
    }
}

impl BoxCollection {
    pub(crate) fn compose(boxes: Vec<AxisBox>, csg: CsgExpr) -> Self {
        Self {
            boxes,
            facets: Vec::new(),
            csg,
            subdomains: Vec::new(),
            boundaries: Vec::new(),
            params: BTreeMap::new(),
            synonymes: BTreeMap::new(),
            computed: None,
        }
    }

    #[must_use]
    pub fn csg(&self) -> &CsgExpr {
        &self.csg
    }

    /// Every bulk box, including those contributed by subdomains.
    #[must_use]
    pub fn boxes(&self) -> &[AxisBox] {
        &self.boxes
    }

    /// Facet boxes contributed by boundaries.
    #[must_use]
    pub fn facets(&self) -> &[AxisBox] {
        &self.facets
    }

    #[must_use]
    pub fn subdomains(&self) -> &[Region] {
        &self.subdomains
    }

    #[must_use]
    pub fn boundaries(&self) -> &[Region] {
        &self.boundaries
    }

    #[must_use]
    pub fn subdomain(&self, name: &str) -> Option<&Region> {
        self.subdomains.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn boundary(&self, name: &str) -> Option<&Region> {
        self.boundaries.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, f64> {
        &self.params
    }

    pub fn set_param(&mut self, name: &str, value: f64) {
        self.params.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn synonymes(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.synonymes
    }

    /// Declares `name` as an alias for the union of `regions`.
    pub fn add_synonyme<'r>(&mut self, name: &str, regions: impl IntoIterator<Item = &'r str>) {
        self.synonymes
            .entry(name.to_owned())
            .or_default()
            .extend(regions.into_iter().map(str::to_owned));
    }

    /// Registers a named subdomain and adds its boxes to the collection.
    pub fn add_subdomain(&mut self, sub: impl Into<Shape>, name: &str) {
        let shape = sub.into();
        merge(&mut self.boxes, shape.boxes());
        self.subdomains.push(Region {
            name: name.to_owned(),
            shape,
            index_set: IndexSet::new(),
            synthetic: false,
        });
        self.computed = None;
    }

    pub fn add_subdomains<'n, S: Into<Shape>>(&mut self, subdomains: impl IntoIterator<Item = (&'n str, S)>) {
        for (name, sub) in subdomains {
            self.add_subdomain(sub, name);
        }
    }

    /// Registers a named boundary; its boxes join the decomposition as facets.
    pub fn add_boundary(&mut self, sub: impl Into<Shape>, name: &str) {
        let shape = sub.into();
        merge(&mut self.facets, shape.boxes());
        self.boundaries.push(Region {
            name: name.to_owned(),
            shape,
            index_set: IndexSet::new(),
            synthetic: false,
        });
        self.computed = None;
    }

    pub fn add_boundaries<'n, S: Into<Shape>>(&mut self, boundaries: impl IntoIterator<Item = (&'n str, S)>) {
        for (name, sub) in boundaries {
            self.add_boundary(sub, name);
        }
    }

    /// Decomposes all boxes and facets and evaluates every region.
    ///
    /// Subdomains are clipped to the collection. If they leave cells
    /// uncovered, a synthetic subdomain named [`REST`] takes the remainder;
    /// a previously synthesised one is dropped first, so calling this again
    /// gives the same regions.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::DimensionMismatch` if the boxes differ in
    /// dimension and `CsgError::CoverageViolation` if the subdomains still do
    /// not cover the collection.
    pub fn compute_entities(&mut self) -> Result<()> {
        self.subdomains.retain(|r| !r.synthetic);

        let mut store = BoxStore::new();
        let boxes: Vec<BoxId> = self
            .boxes
            .iter()
            .map(|b| store.register(b, BoxRole::Bulk))
            .collect();
        let facets: Vec<BoxId> = self
            .facets
            .iter()
            .map(|b| store.register(b, BoxRole::Facet))
            .collect();
        let decomposition = multi_box_union(&store, &boxes, &facets)?;

        let mut ev = CsgEvaluator::new(&store, &decomposition);
        let index_set = ev.eval(&self.csg)?;
        let index_sets = ev.evalsets(&self.csg)?;
        for sub in &mut self.subdomains {
            sub.index_set = &ev.eval(&sub.shape.csg())? & &index_set;
        }
        for sub in &mut self.boundaries {
            sub.index_set = ev.eval(&sub.shape.csg())?;
        }

        let covered = self
            .subdomains
            .iter()
            .map(|r| r.shape.csg())
            .reduce(|acc, next| acc.union(&next));
        if let Some(covered) = covered {
            let rest = self.csg.difference(&covered);
            let rest_set = ev.eval(&rest)?;
            if !rest_set.is_empty() {
                debug!(cells = rest_set.len(), "adding synthetic rest subdomain");
                self.subdomains.push(Region {
                    name: REST.to_owned(),
                    shape: Shape::Collection(Self::compose(self.boxes.clone(), rest)),
                    index_set: rest_set,
                    synthetic: true,
                });
            }

            let union: IndexSet = self
                .subdomains
                .iter()
                .flat_map(|r| r.index_set.iter().copied())
                .collect();
            let missing = index_set.difference(&union).count();
            if missing > 0 {
                return Err(CsgError::CoverageViolation { missing }.into());
            }
        }

        debug!(
            cells = index_set.len(),
            subdomains = self.subdomains.len(),
            boundaries = self.boundaries.len(),
            "computed entities"
        );
        self.computed = Some(Computed {
            store,
            decomposition,
            index_set,
            index_sets,
        });
        Ok(())
    }

    fn computed(&self) -> Result<&Computed> {
        self.computed.as_ref().ok_or_else(|| CsgError::NotComputed.into())
    }

    /// Cells of the collection at its own dimension.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::NotComputed` before [`BoxCollection::compute_entities`].
    pub fn index_set(&self) -> Result<&IndexSet> {
        Ok(&self.computed()?.index_set)
    }

    /// Entities of the collection for every dimension.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::NotComputed` before [`BoxCollection::compute_entities`].
    pub fn index_sets(&self) -> Result<&[IndexSet]> {
        Ok(&self.computed()?.index_sets)
    }

    /// # Errors
    ///
    /// Returns `CsgError::NotComputed` before [`BoxCollection::compute_entities`].
    pub fn decomposition(&self) -> Result<&Decomposition> {
        Ok(&self.computed()?.decomposition)
    }

    /// # Errors
    ///
    /// Returns `CsgError::NotComputed` before [`BoxCollection::compute_entities`].
    pub fn store(&self) -> Result<&BoxStore> {
        Ok(&self.computed()?.store)
    }

    /// Computes entities and writes them, with physical groups for every
    /// region, into a gmsh script.
    ///
    /// # Errors
    ///
    /// Propagates decomposition and emission errors.
    pub fn emit(&mut self, lc: f64) -> Result<Emission> {
        self.compute_entities()?;
        let computed = self.computed()?;
        let complex = computed.decomposition.complex();
        let mut sets = computed.index_sets.clone();
        if let Some(facet_dim) = complex.dimt().and_then(|d| d.checked_sub(1)) {
            for b in &self.boundaries {
                sets[facet_dim].extend(b.index_set.iter().copied());
            }
        }
        let mut emission = entities_to_gmsh(complex, &sets, lc)?;
        physical_to_gmsh(
            &mut emission,
            self.subdomains.iter().map(|r| (r.name.as_str(), &r.index_set)),
            self.boundaries.iter().map(|r| (r.name.as_str(), &r.index_set)),
        )?;
        Ok(emission)
    }

    /// Builds the mesh for this collection with the external mesher.
    ///
    /// # Errors
    ///
    /// Propagates emission errors and mesher failures.
    pub fn create_geometry(&mut self, lc: f64, config: &MesherConfig) -> Result<Geometry> {
        let emission = self.emit(lc)?;
        let files = to_mesh(emission.script, config)?;
        Ok(self.geometry(files))
    }

    /// Reloads the mesh last generated in the work directory of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata sidecar cannot be read.
    pub fn recreate_geometry(&self, config: &MesherConfig) -> Result<Geometry> {
        let files = geo_from_meshdir(config)?;
        Ok(self.geometry(files))
    }

    fn geometry(&self, files: crate::gmsh::MeshFiles) -> Geometry {
        Geometry {
            files,
            params: self.params.clone(),
            synonymes: self.synonymes.clone(),
        }
    }
}

impl From<AxisBox> for BoxCollection {
    fn from(b: AxisBox) -> Self {
        let csg = CsgExpr::leaf(b.clone());
        Self::compose(vec![b], csg)
    }
}

impl From<Shape> for BoxCollection {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Box(b) => b.into(),
            Shape::Collection(c) => c,
        }
    }
}

impl fmt::Display for BoxCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.csg)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::csg::axis_box::Side;

    fn unit(x: f64, y: f64) -> AxisBox {
        AxisBox::new(&[x, y], &[x + 1.0, y + 1.0]).unwrap()
    }

    #[test]
    fn two_boxes_sharing_an_edge() {
        let mut c = unit(0.0, 0.0) | unit(1.0, 0.0);
        c.compute_entities().unwrap();
        assert_eq!(c.index_set().unwrap().len(), 2);
        let edges = &c.index_sets().unwrap()[1];
        assert_eq!(edges.len(), 7);

        let parents = c.decomposition().unwrap().complex().parents(1);
        let exterior = edges.iter().filter(|&&i| parents[i].len() == 1).count();
        let shared = edges.iter().filter(|&&i| parents[i].len() == 2).count();
        assert_eq!(exterior, 6);
        assert_eq!(shared, 1);
    }

    #[test]
    fn uncovered_cells_become_rest() {
        let left = unit(0.0, 0.0);
        let mut c = &left | unit(1.0, 0.0);
        c.add_subdomain(&left, "left");
        c.compute_entities().unwrap();

        let names: Vec<&str> = c.subdomains().iter().map(Region::name).collect();
        assert_eq!(names, vec!["left", REST]);
        assert!(c.subdomain(REST).unwrap().is_synthetic());

        let union: IndexSet = c
            .subdomains()
            .iter()
            .flat_map(|r| r.index_set().iter().copied())
            .collect();
        assert_eq!(&union, c.index_set().unwrap());
        assert!(c.subdomain("left").unwrap().index_set().is_disjoint(c.subdomain(REST).unwrap().index_set()));
    }

    #[test]
    fn full_cover_needs_no_rest() {
        let (a, b) = (unit(0.0, 0.0), unit(1.0, 0.0));
        let mut c = &a | &b;
        c.add_subdomains([("a", &a), ("b", &b)]);
        c.compute_entities().unwrap();
        assert_eq!(c.subdomains().len(), 2);
        assert!(c.subdomain(REST).is_none());
    }

    #[test]
    fn recomputing_is_idempotent() {
        let left = unit(0.0, 0.0);
        let mut c = &left | unit(1.0, 0.0) | unit(2.0, 0.0);
        c.add_subdomain(&left, "left");
        c.compute_entities().unwrap();
        let first: Vec<IndexSet> = c.subdomains().iter().map(|r| r.index_set().clone()).collect();
        c.compute_entities().unwrap();
        let second: Vec<IndexSet> = c.subdomains().iter().map(|r| r.index_set().clone()).collect();
        assert_eq!(first, second);
        assert_eq!(c.subdomains().len(), 2);
    }

    #[test]
    fn subdomains_are_clipped_to_the_domain() {
        let big = AxisBox::new(&[0.0, 0.0], &[2.0, 1.0]).unwrap();
        let hole = AxisBox::new(&[0.5, 0.0], &[1.5, 1.0]).unwrap();
        let mut c = &big - &hole;
        c.add_subdomain(&big, "all");
        c.compute_entities().unwrap();
        assert_eq!(c.index_set().unwrap().len(), 2);
        assert_eq!(c.subdomain("all").unwrap().index_set(), c.index_set().unwrap());
    }

    #[test]
    fn side_boundary_is_one_edge() {
        let a = unit(0.0, 0.0);
        let mut c = &a | unit(1.0, 0.0);
        c.add_boundary(a.boundary(&[Side::Left]).unwrap(), "inlet");
        c.compute_entities().unwrap();
        let inlet = c.boundary("inlet").unwrap().index_set();
        assert_eq!(inlet.len(), 1);

        let complex = c.decomposition().unwrap().complex();
        let edge = complex.as_box(&complex.entities(1)[*inlet.first().unwrap()]).unwrap();
        assert_eq!(edge.a(), vec![0.0, 0.0]);
        assert_eq!(edge.b(), vec![0.0, 1.0]);
    }

    #[test]
    fn single_box_round_trip() {
        let cube = AxisBox::new(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).unwrap();
        let mut c = BoxCollection::from(cube.clone());
        let sides = [Side::Left, Side::Right, Side::Front, Side::Back, Side::Bottom, Side::Top];
        for side in sides {
            c.add_boundary(cube.boundary(&[side]).unwrap(), side.as_str());
        }
        c.compute_entities().unwrap();
        assert_eq!(c.index_set().unwrap().len(), 1);
        assert_eq!(c.index_sets().unwrap()[2].len(), 6);

        let complex = c.decomposition().unwrap().complex();
        for (side, facet) in sides.iter().zip(cube.facets()) {
            let set = c.boundary(side.as_str()).unwrap().index_set();
            assert_eq!(set.len(), 1);
            let found = complex.as_box(&complex.entities(2)[*set.first().unwrap()]).unwrap();
            assert_eq!(found, facet);
        }
    }

    #[test]
    fn shape_index_sets_follow_set_algebra() {
        let (a, b) = (unit(0.0, 0.0), AxisBox::new(&[0.5, 0.0], &[1.5, 1.0]).unwrap());
        let mut c = &a | &b;
        c.compute_entities().unwrap();
        let (store, dec) = (c.store().unwrap(), c.decomposition().unwrap());
        let sa = Shape::from(&a).index_set(store, dec).unwrap();
        let sb = Shape::from(&b).index_set(store, dec).unwrap();
        let diff = Shape::from(&a - &b).index_set(store, dec).unwrap();
        let meet = Shape::from(&a & &b).index_set(store, dec).unwrap();
        assert_eq!(diff, &sa - &sb);
        assert_eq!(meet, &sa & &sb);
        assert_eq!(meet.len(), 1);
    }

    #[test]
    fn mismatched_subdomain_fails() {
        let mut c = BoxCollection::from(unit(0.0, 0.0));
        c.add_subdomain(AxisBox::interval(0.0, 1.0), "line");
        assert!(c.compute_entities().is_err());
    }

    #[test]
    fn results_need_computation() {
        let mut c = BoxCollection::from(unit(0.0, 0.0));
        assert!(c.index_set().is_err());
        c.compute_entities().unwrap();
        assert!(c.index_set().is_ok());
        c.add_subdomain(unit(0.0, 0.0), "all");
        assert!(c.decomposition().is_err());
    }

    #[test]
    fn emission_tags_every_region() {
        let left = unit(0.0, 0.0);
        let mut c = &left | unit(1.0, 0.0);
        c.add_subdomain(&left, "left");
        c.add_boundary(left.boundary_named(&["left", "bottom"]).unwrap(), "wall");
        let emission = c.emit(0.2).unwrap();
        let meta = emission.script.meta();
        assert_eq!(meta.physical_domain.keys().collect::<Vec<_>>(), vec!["left", REST]);
        assert_eq!(meta.physical_boundary["wall"], vec![3]);
        assert!(emission.script.code().contains("Physical Line(3)"));
    }

    #[cfg(unix)]
    #[test]
    fn create_and_recreate_geometry() {
        let config = MesherConfig {
            gmsh: "true".to_owned(),
            converter: "true".to_owned(),
            meshdir: std::env::temp_dir().join(format!("poregeo-{}-collection", std::process::id())),
            ..MesherConfig::default()
        };
        let a = unit(0.0, 0.0);
        let mut c = &a | unit(1.0, 0.0);
        c.add_subdomain(&a, "a");
        c.set_param("lc", 0.2);
        c.add_synonyme("fluid", ["a", REST]);
        let geo = c.create_geometry(0.2, &config).unwrap();
        assert_eq!(geo.physical_domain("fluid"), vec![1, 2]);
        approx::assert_relative_eq!(geo.params["lc"], 0.2);

        let again = c.recreate_geometry(&config).unwrap();
        assert_eq!(again, geo);
    }

    #[test]
    fn display_shows_expression() {
        let c = AxisBox::interval(0.0, 1.0) | AxisBox::interval(2.0, 3.0);
        assert_eq!(c.to_string(), "(Box([0, 1]) | Box([2, 3]))");
    }
}
