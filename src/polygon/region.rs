use super::clip::Polygon;
use super::node::{Edge, EdgeSet, Node};

/// Molecule cross-section: a half disc of radius `r` centered on the axis at
/// height `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfCircle {
    pub z: f64,
    pub r: f64,
}

impl HalfCircle {
    #[must_use]
    pub fn new(z: f64, r: f64) -> Self {
        Self { z, r }
    }

    /// Bottom, center and top node on the axis.
    #[must_use]
    pub fn nodes(&self) -> [Node; 3] {
        [
            Node::new(0.0, self.z - self.r),
            Node::new(0.0, self.z),
            Node::new(0.0, self.z + self.r),
        ]
    }

    #[must_use]
    pub fn arc(&self) -> Edge {
        let [x1, x2, x3] = self.nodes();
        Edge::Arc(x1, x2, x3)
    }

    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        let [x1, x2, x3] = self.nodes();
        vec![Edge::Segment(x3, x2), Edge::Segment(x2, x1), self.arc()]
    }
}

/// A named region of a pore cross-section.
#[derive(Debug, Clone, PartialEq)]
pub enum PoreRegion {
    Polygon(Polygon),
    HalfCircle(HalfCircle),
    Empty,
}

impl PoreRegion {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, PoreRegion::Empty)
    }

    #[must_use]
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            PoreRegion::Polygon(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_polygon_mut(&mut self) -> Option<&mut Polygon> {
        match self {
            PoreRegion::Polygon(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        match self {
            PoreRegion::Polygon(p) => p.nodes().to_vec(),
            PoreRegion::HalfCircle(h) => h.nodes().to_vec(),
            PoreRegion::Empty => Vec::new(),
        }
    }

    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        match self {
            PoreRegion::Polygon(p) => p.edges().to_vec(),
            PoreRegion::HalfCircle(h) => h.edges(),
            PoreRegion::Empty => Vec::new(),
        }
    }

    /// Edges exposed to the surrounding fluid: the arc of a molecule, all
    /// edges of a polygon, nothing for the empty set.
    #[must_use]
    pub fn boundary(&self) -> EdgeSet {
        match self {
            PoreRegion::Polygon(p) => p.edge_set(),
            PoreRegion::HalfCircle(h) => std::iter::once(h.arc()).collect(),
            PoreRegion::Empty => EdgeSet::new(),
        }
    }
}

/// Insertion-ordered map from region names to values.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for NamedMap<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> NamedMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, keeping the position of an existing entry.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Moves or inserts `name` to the front.
    pub fn insert_first(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        self.remove(&name);
        self.entries.insert(0, (name, value));
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for NamedMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_circle_boundary_is_its_arc() {
        let h = HalfCircle::new(-0.75, 0.5);
        let region = PoreRegion::HalfCircle(h);
        let boundary = region.boundary();
        assert_eq!(boundary.len(), 1);
        assert!(boundary.contains(&Edge::Arc(
            Node::new(0.0, -1.25),
            Node::new(0.0, -0.75),
            Node::new(0.0, -0.25)
        )));
        assert_eq!(region.edges().len(), 3);
        assert!(PoreRegion::Empty.boundary().is_empty());
    }

    #[test]
    fn named_map_keeps_order() {
        let mut map = NamedMap::new();
        map.insert("protein", 1);
        map.insert("membrane", 2);
        map.insert("protein", 3);
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["protein", "membrane"]);
        assert_eq!(map.get("protein"), Some(&3));

        map.insert_first("molecule", 0);
        map.insert_first("membrane", 5);
        assert_eq!(
            map.names().collect::<Vec<_>>(),
            vec!["membrane", "molecule", "protein"]
        );
        assert_eq!(map.remove("molecule"), Some(0));
        assert_eq!(map.len(), 2);
    }
}
