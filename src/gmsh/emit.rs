use tracing::debug;

use crate::csg::{entity_facets, EntityComplex, IndexSet};
use crate::error::{CsgError, MeshError, Result};

use super::script::{GeoScript, Oriented};

/// Reversal flags of the `2k` facets of a `k`-entity, lower then upper per axis.
const ORIENTATIONS: [bool; 6] = [true, false, false, true, true, false];

/// Facet order that closes the boundary loop of a 2-entity: lower second
/// axis, upper first axis, upper second axis, lower first axis.
const LOOP_ORDER: [usize; 4] = [2, 1, 3, 0];

/// Script produced by [`entities_to_gmsh`] together with the elementary tag
/// assigned to every emitted entity.
#[derive(Debug, Clone)]
pub struct Emission {
    pub script: GeoScript,
    tags: Vec<Vec<Option<usize>>>,
    dimt: usize,
}

impl Emission {
    /// Highest dimension containing entities.
    #[must_use]
    pub fn dimt(&self) -> usize {
        self.dimt
    }

    /// Elementary tag of `k`-entity `index`, if it was emitted.
    #[must_use]
    pub fn tag(&self, k: usize, index: usize) -> Option<usize> {
        self.tags.get(k)?.get(index).copied().flatten()
    }

    /// Number of emitted `k`-entities.
    #[must_use]
    pub fn emitted(&self, k: usize) -> usize {
        self.tags.get(k).map_or(0, |level| level.iter().flatten().count())
    }

    fn tags_of(&self, k: usize, set: &IndexSet) -> Result<Vec<usize>> {
        set.iter()
            .map(|&index| {
                self.tag(k, index)
                    .ok_or_else(|| MeshError::MissingEntity { dim: k, index }.into())
            })
            .collect()
    }
}

struct Emitter<'a> {
    complex: &'a EntityComplex,
    script: GeoScript,
    tags: Vec<Vec<Option<usize>>>,
}

impl Emitter<'_> {
    fn ensure(&mut self, k: usize, index: usize) -> Result<usize> {
        let complex = self.complex;
        let missing = MeshError::MissingEntity { dim: k, index };
        match self.tags.get(k).and_then(|level| level.get(index)) {
            Some(Some(tag)) => return Ok(*tag),
            Some(None) if k > 0 => {}
            _ => return Err(missing.into()),
        }
        let entity = &complex.entities(k)[index];
        let mut facets = Vec::with_capacity(2 * k);
        for facet in entity_facets(entity) {
            let j = complex
                .find(k - 1, &facet)
                .ok_or(CsgError::EntityNotFound { dim: k - 1, index })?;
            facets.push(self.ensure(k - 1, j)?);
        }
        let tag = match k {
            1 => self.script.line(facets[0], facets[1]),
            2 => {
                let lines: Vec<Oriented> = LOOP_ORDER
                    .iter()
                    .map(|&i| Oriented::new(facets[i], ORIENTATIONS[i]))
                    .collect();
                let ll = self.script.line_loop(&lines);
                self.script.plane_surface(ll)
            }
            3 => {
                let surfaces: Vec<Oriented> = facets
                    .iter()
                    .zip(ORIENTATIONS)
                    .map(|(&tag, reversed)| Oriented::new(tag, reversed))
                    .collect();
                let sl = self.script.surface_loop(&surfaces);
                self.script.volume(sl)
            }
            _ => return Err(MeshError::UnsupportedDimension(k).into()),
        };
        self.tags[k][index] = Some(tag);
        Ok(tag)
    }
}

/// Writes the decomposition into a fresh script.
///
/// Every vertex is emitted as a point; an entity of dimension `k >= 1` is
/// emitted when it is listed in `index_sets[k]`, and its bounding facets are
/// emitted on demand.
///
/// # Errors
///
/// Returns `MeshError::UnsupportedDimension` for embedding dimensions above 3.
pub fn entities_to_gmsh(complex: &EntityComplex, index_sets: &[IndexSet], lc: f64) -> Result<Emission> {
    let dim = complex.dim();
    if dim > 3 {
        return Err(MeshError::UnsupportedDimension(dim).into());
    }
    let mut emitter = Emitter {
        complex,
        script: GeoScript::new(),
        tags: (0..=dim).map(|k| vec![None; complex.entities(k).len()]).collect(),
    };

    for (i, vertex) in complex.entities(0).iter().enumerate() {
        let p = complex.point(vertex)?;
        emitter.tags[0][i] = Some(emitter.script.point(p, lc));
    }
    for (k, set) in index_sets.iter().enumerate().take(dim + 1).skip(1) {
        for &index in set {
            emitter.ensure(k, index)?;
        }
    }

    let emission = Emission {
        script: emitter.script,
        tags: emitter.tags,
        dimt: complex.dimt().unwrap_or(0),
    };
    debug!(
        entities = ?(0..=dim).map(|k| emission.emitted(k)).collect::<Vec<_>>(),
        "emitted gmsh entities"
    );
    Ok(emission)
}

/// Tags every subdomain at `dimt` and every boundary at `dimt - 1`.
///
/// Regions with an empty index set are skipped.
///
/// # Errors
///
/// Returns `MeshError::MissingEntity` if a region refers to an entity that
/// was not emitted.
pub fn physical_to_gmsh<'n>(
    emission: &mut Emission,
    subdomains: impl IntoIterator<Item = (&'n str, &'n IndexSet)>,
    boundaries: impl IntoIterator<Item = (&'n str, &'n IndexSet)>,
) -> Result<()> {
    let dimt = emission.dimt;
    for (name, set) in subdomains {
        if set.is_empty() {
            debug!(name, "skipping empty subdomain");
            continue;
        }
        let tags = emission.tags_of(dimt, set)?;
        emission.script.physical_domain(name, dimt, &tags);
    }
    let Some(facet_dim) = dimt.checked_sub(1) else {
        return Ok(());
    };
    for (name, set) in boundaries {
        if set.is_empty() {
            debug!(name, "skipping empty boundary");
            continue;
        }
        let tags = emission.tags_of(facet_dim, set)?;
        emission.script.physical_boundary(name, facet_dim, &tags);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::csg::{multi_box_union, AxisBox, BoxRole, BoxStore};

    fn decompose(boxes: &[AxisBox]) -> (BoxStore, crate::csg::Decomposition) {
        let mut store = BoxStore::new();
        let ids: Vec<_> = boxes.iter().map(|b| store.register(b, BoxRole::Bulk)).collect();
        let dec = multi_box_union(&store, &ids, &[]).unwrap();
        (store, dec)
    }

    #[test]
    fn unit_square_emits_closed_loop() {
        let (_, dec) = decompose(&[AxisBox::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap()]);
        let complex = dec.complex();
        let sets: Vec<IndexSet> = vec![
            IndexSet::new(),
            IndexSet::new(),
            (0..complex.entities(2).len()).collect(),
        ];
        let emission = entities_to_gmsh(complex, &sets, 0.5).unwrap();
        assert_eq!(emission.emitted(0), 4);
        assert_eq!(emission.emitted(1), 4);
        assert_eq!(emission.emitted(2), 1);

        let code = emission.script.code();
        assert!(code.contains("Line Loop("));
        assert!(code.contains("Plane Surface("));
        assert!(!code.contains("Volume("));
    }

    #[test]
    fn loop_is_connected() {
        let (_, dec) = decompose(&[AxisBox::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap()]);
        let complex = dec.complex();
        let face = &complex.entities(2)[0];
        let facets = entity_facets(face);
        let ends = |i: usize| {
            let b = complex.as_box(&facets[i]).unwrap();
            (b.a(), b.b())
        };
        // walk the loop in LOOP_ORDER, honouring reversal
        let mut walk = Vec::new();
        for &i in &LOOP_ORDER {
            let (a, b) = ends(i);
            walk.push(if ORIENTATIONS[i] { (b, a) } else { (a, b) });
        }
        for pair in walk.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        assert_eq!(walk[3].1, walk[0].0);
    }

    #[test]
    fn cube_emits_a_volume() {
        let (_, dec) = decompose(&[AxisBox::new(&[0.0; 3], &[1.0; 3]).unwrap()]);
        let complex = dec.complex();
        let mut sets = vec![IndexSet::new(); 4];
        sets[3].insert(0);
        let emission = entities_to_gmsh(complex, &sets, 0.1).unwrap();
        assert_eq!(emission.emitted(2), 6);
        assert_eq!(emission.emitted(1), 12);
        assert_eq!(emission.emitted(3), 1);
        assert!(emission.script.code().contains("Surface Loop("));
    }

    #[test]
    fn physical_groups_use_emitted_tags() {
        let a = AxisBox::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        let b = AxisBox::new(&[1.0, 0.0], &[2.0, 1.0]).unwrap();
        let (store, dec) = decompose(&[a.clone(), b.clone()]);
        let complex = dec.complex();
        let ia = dec.index_sets(store.find(&a).unwrap()).unwrap().to_vec();
        let all: IndexSet = (0..complex.entities(2).len()).collect();
        let boundary: IndexSet = complex
            .parents(1)
            .iter()
            .enumerate()
            .filter(|(_, p)| p.len() == 1)
            .map(|(i, _)| i)
            .collect();
        let sets = vec![IndexSet::new(), boundary.clone(), all.clone()];
        let mut emission = entities_to_gmsh(complex, &sets, 0.5).unwrap();
        physical_to_gmsh(
            &mut emission,
            [("left", &ia[2]), ("empty", &IndexSet::new())],
            [("outer", &boundary)],
        )
        .unwrap();
        let meta = emission.script.meta();
        assert_eq!(meta.physical_domain.len(), 1);
        assert_eq!(meta.physical_boundary["outer"], vec![2]);
        assert!(emission.script.code().contains("Physical Line(2)"));
    }

    #[test]
    fn unemitted_boundary_is_an_error() {
        let (_, dec) = decompose(&[AxisBox::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap()]);
        let complex = dec.complex();
        let sets = vec![IndexSet::new(); 3];
        let mut emission = entities_to_gmsh(complex, &sets, 0.5).unwrap();
        let edges: IndexSet = [0].into_iter().collect();
        assert!(physical_to_gmsh(&mut emission, [], [("b", &edges)]).is_err());
    }
}
