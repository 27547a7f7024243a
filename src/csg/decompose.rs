use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::{CsgError, GeometryError, Result};
use crate::math::Point3;

use super::axis_box::AxisBox;
use super::interval::{multi_interval_union, IndexSet, IntervalUnion};
use super::registry::{BoxId, BoxRole, BoxStore};

/// Per-axis component of an atomic entity.
///
/// `Node(j)` fixes the axis at atomic node `j`; `Span(j)` covers the atomic
/// subinterval between nodes `j` and `j + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Piece {
    Node(usize),
    Span(usize),
}

/// An atomic entity: one [`Piece`] per axis. Its dimension is the number of spans.
pub type Entity = Vec<Piece>;

/// Returns the `2k` bounding facets of a `k`-entity, lower then upper per spanned axis.
#[must_use]
pub fn entity_facets(entity: &[Piece]) -> Vec<Entity> {
    let mut facets = Vec::new();
    for (i, piece) in entity.iter().enumerate() {
        if let Piece::Span(j) = *piece {
            for node in [j, j + 1] {
                let mut facet = entity.to_vec();
                facet[i] = Piece::Node(node);
                facets.push(facet);
            }
        }
    }
    facets
}

/// Atomic entities of dimensions `0..=d` with the boxes containing each.
///
/// Entities of one dimension have pairwise disjoint interiors.
#[derive(Debug, Clone)]
pub struct EntityComplex {
    axes: Vec<IntervalUnion>,
    entities: Vec<Vec<Entity>>,
    parents: Vec<Vec<BTreeSet<BoxId>>>,
    lookup: Vec<HashMap<Entity, usize>>,
}

impl EntityComplex {
    /// Embedding dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Highest dimension that has at least one entity.
    #[must_use]
    pub fn dimt(&self) -> Option<usize> {
        self.entities.iter().rposition(|level| !level.is_empty())
    }

    /// Atomic interval decomposition of axis `i`, `None` past the last axis.
    #[must_use]
    pub fn axis(&self, i: usize) -> Option<&IntervalUnion> {
        self.axes.get(i)
    }

    /// All `k`-entities in index order.
    #[must_use]
    pub fn entities(&self, k: usize) -> &[Entity] {
        self.entities.get(k).map_or(&[][..], Vec::as_slice)
    }

    /// Boxes containing each `k`-entity.
    #[must_use]
    pub fn parents(&self, k: usize) -> &[BTreeSet<BoxId>] {
        self.parents.get(k).map_or(&[][..], Vec::as_slice)
    }

    /// Index of `entity` among the `k`-entities.
    #[must_use]
    pub fn find(&self, k: usize, entity: &[Piece]) -> Option<usize> {
        self.lookup.get(k)?.get(entity).copied()
    }

    /// `(lo, hi)` coordinates per axis; `lo == hi` on fixed axes.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::EntityNotFound` if a piece points past the atomic nodes.
    pub fn coordinates(&self, entity: &[Piece]) -> Result<Vec<(f64, f64)>> {
        entity
            .iter()
            .zip(&self.axes)
            .map(|(piece, axis)| {
                let (lo, hi) = match *piece {
                    Piece::Node(j) => (j, j),
                    Piece::Span(j) => (j, j + 1),
                };
                match (axis.nodes.get(lo), axis.nodes.get(hi)) {
                    (Some(a), Some(b)) => Ok((a.value(), b.value())),
                    _ => Err(CsgError::EntityNotFound {
                        dim: entity.len(),
                        index: hi,
                    }
                    .into()),
                }
            })
            .collect()
    }

    /// The entity as a (possibly degenerate) box.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not belong to this complex.
    pub fn as_box(&self, entity: &[Piece]) -> Result<AxisBox> {
        AxisBox::from_intervals(&self.coordinates(entity)?)
    }

    /// Position of a vertex padded to three coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not belong to this complex.
    pub fn point(&self, entity: &[Piece]) -> Result<Point3> {
        let mut xyz = [0.0; 3];
        for (slot, (lo, _)) in xyz.iter_mut().zip(self.coordinates(entity)?) {
            *slot = lo;
        }
        Ok(Point3::new(xyz[0], xyz[1], xyz[2]))
    }
}

/// Result of [`multi_box_union`]: the entity complex and, per box, the
/// entities it contains in every dimension.
#[derive(Debug, Clone)]
pub struct Decomposition {
    complex: EntityComplex,
    membership: SecondaryMap<BoxId, Vec<IndexSet>>,
}

impl Decomposition {
    #[must_use]
    pub fn complex(&self) -> &EntityComplex {
        &self.complex
    }

    /// Entities contained in box `id`, one set per dimension.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::UnregisteredBox` if the box took no part in the decomposition.
    pub fn index_sets(&self, id: BoxId) -> Result<&[IndexSet]> {
        self.membership
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| CsgError::UnregisteredBox(format!("{id:?}")).into())
    }

    /// The box's cells at its own topological dimension.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::UnregisteredBox` if the box is unknown.
    pub fn native_index_set(&self, store: &BoxStore, id: BoxId) -> Result<&IndexSet> {
        let dimt = store.get(id)?.shape.dimt();
        self.index_sets(id)?
            .get(dimt)
            .ok_or_else(|| CsgError::UnregisteredBox(format!("{id:?}")).into())
    }
}

/// Decomposes the union of `boxes` and `facets` into disjoint atomic entities.
///
/// Each axis is split by [`multi_interval_union`]. For every `k` and every
/// choice of `k` free axes, the product of atomic subintervals (free axes)
/// and atomic nodes (fixed axes) is enumerated; a candidate is kept iff some
/// input box contains it, and the containing boxes become its parents.
///
/// # Errors
///
/// Returns `GeometryError::EmptySequence` if there is nothing to decompose
/// and `GeometryError::DimensionMismatch` if the boxes differ in dimension.
pub fn multi_box_union(store: &BoxStore, boxes: &[BoxId], facets: &[BoxId]) -> Result<Decomposition> {
    let mut all: Vec<BoxId> = Vec::with_capacity(boxes.len() + facets.len());
    for &id in boxes.iter().chain(facets) {
        if !all.contains(&id) {
            all.push(id);
        }
    }
    let shapes: Vec<&AxisBox> = all
        .iter()
        .map(|&id| store.get(id).map(|data| &data.shape))
        .collect::<std::result::Result<_, _>>()?;

    let dim = shapes.first().ok_or(GeometryError::EmptySequence)?.dim();
    if let Some(bad) = shapes.iter().find(|b| b.dim() != dim) {
        return Err(GeometryError::DimensionMismatch {
            expected: dim,
            found: bad.dim(),
        }
        .into());
    }

    let axes: Vec<IntervalUnion> = (0..dim)
        .map(|i| {
            let column: Vec<_> = shapes.iter().map(|b| b.intervals()[i]).collect();
            multi_interval_union(&column)
        })
        .collect::<Result<_>>()?;

    let mut entities = vec![Vec::new(); dim + 1];
    let mut parents = vec![Vec::new(); dim + 1];
    let mut lookup = vec![HashMap::new(); dim + 1];
    let mut membership: SecondaryMap<BoxId, Vec<IndexSet>> = SecondaryMap::new();
    for &id in &all {
        membership.insert(id, vec![IndexSet::new(); dim + 1]);
    }

    for k in 0..=dim {
        for free in (0..dim).combinations(k) {
            let choices: Vec<Vec<(Piece, &IndexSet)>> = axes
                .iter()
                .enumerate()
                .map(|(i, axis)| {
                    if free.contains(&i) {
                        axis.interval_parents
                            .iter()
                            .enumerate()
                            .map(|(j, p)| (Piece::Span(j), p))
                            .collect()
                    } else {
                        axis.node_parents
                            .iter()
                            .enumerate()
                            .map(|(j, p)| (Piece::Node(j), p))
                            .collect()
                    }
                })
                .collect();

            for candidate in choices.iter().map(|c| c.iter()).multi_cartesian_product() {
                let common = intersect_all(candidate.iter().map(|(_, p)| *p));
                if common.is_empty() {
                    continue;
                }
                let entity: Entity = candidate.iter().map(|(piece, _)| *piece).collect();
                let index = entities[k].len();
                for &position in &common {
                    if let Some(sets) = membership.get_mut(all[position]) {
                        sets[k].insert(index);
                    }
                }
                lookup[k].insert(entity.clone(), index);
                entities[k].push(entity);
                parents[k].push(common.iter().map(|&position| all[position]).collect());
            }
        }
    }

    let facet_count = all
        .iter()
        .filter(|&&id| store.get(id).is_ok_and(|data| data.role == BoxRole::Facet))
        .count();
    debug!(
        boxes = all.len() - facet_count,
        facets = facet_count,
        entities = ?entities.iter().map(Vec::len).collect::<Vec<_>>(),
        "decomposed box union"
    );

    Ok(Decomposition {
        complex: EntityComplex {
            axes,
            entities,
            parents,
            lookup,
        },
        membership,
    })
}

fn intersect_all<'a>(mut sets: impl Iterator<Item = &'a IndexSet>) -> IndexSet {
    let Some(first) = sets.next() else {
        return IndexSet::new();
    };
    let mut common = first.clone();
    for s in sets {
        common.retain(|i| s.contains(i));
        if common.is_empty() {
            break;
        }
    }
    common
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::csg::registry::BoxRole;

    fn register(store: &mut BoxStore, a: &[f64], b: &[f64]) -> BoxId {
        store.register(&AxisBox::new(a, b).unwrap(), BoxRole::Bulk)
    }

    #[test]
    fn single_square() {
        let mut store = BoxStore::new();
        let id = register(&mut store, &[0.0, 0.0], &[1.0, 2.0]);
        let dec = multi_box_union(&store, &[id], &[]).unwrap();
        let complex = dec.complex();
        assert_eq!(complex.entities(0).len(), 4);
        assert_eq!(complex.entities(1).len(), 4);
        assert_eq!(complex.entities(2).len(), 1);
        assert_eq!(complex.dimt(), Some(2));

        let cell = complex.as_box(&complex.entities(2)[0]).unwrap();
        assert_eq!(cell.a(), vec![0.0, 0.0]);
        assert_eq!(cell.b(), vec![1.0, 2.0]);
        assert_eq!(dec.native_index_set(&store, id).unwrap().len(), 1);

        assert_eq!(complex.axis(1).unwrap().nodes.len(), 2);
        assert!(complex.axis(2).is_none());
    }

    #[test]
    fn single_cube_has_six_faces() {
        let mut store = BoxStore::new();
        let id = register(&mut store, &[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]);
        let dec = multi_box_union(&store, &[id], &[]).unwrap();
        let counts: Vec<usize> = (0..=3).map(|k| dec.complex().entities(k).len()).collect();
        assert_eq!(counts, vec![8, 12, 6, 1]);
    }

    #[test]
    fn two_squares_sharing_an_edge() {
        let mut store = BoxStore::new();
        let a = register(&mut store, &[0.0, 0.0], &[1.0, 1.0]);
        let b = register(&mut store, &[1.0, 0.0], &[2.0, 1.0]);
        let dec = multi_box_union(&store, &[a, b], &[]).unwrap();
        let complex = dec.complex();
        assert_eq!(complex.entities(2).len(), 2);
        assert_eq!(complex.entities(1).len(), 7);

        let shared: Vec<_> = complex.parents(1).iter().filter(|p| p.len() == 2).collect();
        let exterior = complex.parents(1).iter().filter(|p| p.len() == 1).count();
        assert_eq!(shared.len(), 1);
        assert_eq!(exterior, 6);

        let common = &dec.index_sets(a).unwrap()[1] & &dec.index_sets(b).unwrap()[1];
        assert_eq!(common.len(), 1);
        let edge = complex.as_box(&complex.entities(1)[*common.first().unwrap()]).unwrap();
        assert_eq!(edge.a(), vec![1.0, 0.0]);
        assert_eq!(edge.b(), vec![1.0, 1.0]);
    }

    #[test]
    fn overlapping_squares_split_into_cells() {
        let mut store = BoxStore::new();
        let a = register(&mut store, &[0.0, 0.0], &[2.0, 2.0]);
        let b = register(&mut store, &[1.0, 1.0], &[3.0, 3.0]);
        let dec = multi_box_union(&store, &[a, b], &[]).unwrap();
        // 3x3 grid minus the two empty corners
        assert_eq!(dec.complex().entities(2).len(), 7);
        assert_eq!(dec.index_sets(a).unwrap()[2].len(), 4);
        assert_eq!(dec.index_sets(b).unwrap()[2].len(), 4);
        let overlap = &dec.index_sets(a).unwrap()[2] & &dec.index_sets(b).unwrap()[2];
        assert_eq!(overlap.len(), 1);
    }

    #[test]
    fn facet_boxes_get_native_sets_one_dimension_down() {
        let mut store = BoxStore::new();
        let bulk = AxisBox::new(&[0.0, 0.0], &[2.0, 1.0]).unwrap();
        let a = store.register(&bulk, BoxRole::Bulk);
        let facet = AxisBox::new(&[0.0, 1.0], &[1.0, 1.0]).unwrap();
        let f = store.register(&facet, BoxRole::Facet);
        let dec = multi_box_union(&store, &[a], &[f]).unwrap();
        // the facet splits the top edge of the bulk box
        assert_eq!(dec.complex().entities(2).len(), 2);
        assert_eq!(dec.native_index_set(&store, f).unwrap().len(), 1);
        assert_eq!(dec.index_sets(f).unwrap()[2].len(), 0);
    }

    #[test]
    fn mismatched_dimensions_fail_fast() {
        let mut store = BoxStore::new();
        let a = register(&mut store, &[0.0, 0.0], &[1.0, 1.0]);
        let b = store.register(&AxisBox::interval(0.0, 1.0), BoxRole::Bulk);
        assert!(multi_box_union(&store, &[a, b], &[]).is_err());
        assert!(multi_box_union(&store, &[], &[]).is_err());
    }

    #[test]
    fn facets_of_a_face() {
        let entity = vec![Piece::Span(0), Piece::Node(3), Piece::Span(1)];
        let facets = entity_facets(&entity);
        assert_eq!(
            facets,
            vec![
                vec![Piece::Node(0), Piece::Node(3), Piece::Span(1)],
                vec![Piece::Node(1), Piece::Node(3), Piece::Span(1)],
                vec![Piece::Span(0), Piece::Node(3), Piece::Node(1)],
                vec![Piece::Span(0), Piece::Node(3), Piece::Node(2)],
            ]
        );
    }
}
