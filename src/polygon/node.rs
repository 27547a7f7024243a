use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::math::Point2;

/// Relative slack of [`Edge::covers`].
const COVER_EPS: f64 = 1e-9;

/// A polygon vertex in the `(r, z)` half plane.
///
/// Nodes compare exactly; tolerance is applied only when new nodes are
/// created by [`super::Polygon::intersections`].
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub x: f64,
    pub y: f64,
}

impl Node {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn to_point(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Whether `other` lies strictly within `tol` of this node.
    #[must_use]
    pub fn is_close(self, other: Node, tol: f64) -> bool {
        (self.to_point() - other.to_point()).norm_squared() < tol * tol
    }

    fn key(self) -> (u64, u64) {
        // -0.0 and 0.0 are the same node
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<(f64, f64)> for Node {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A directed boundary piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Segment(Node, Node),
    /// Circular arc `(start, center, end)`.
    Arc(Node, Node, Node),
}

impl Edge {
    #[must_use]
    pub fn start(self) -> Node {
        match self {
            Edge::Segment(a, _) | Edge::Arc(a, _, _) => a,
        }
    }

    #[must_use]
    pub fn end(self) -> Node {
        match self {
            Edge::Segment(_, b) | Edge::Arc(_, _, b) => b,
        }
    }

    #[must_use]
    pub fn reversed(self) -> Edge {
        match self {
            Edge::Segment(a, b) => Edge::Segment(b, a),
            Edge::Arc(a, c, b) => Edge::Arc(b, c, a),
        }
    }

    /// Endpoint with the smaller `y`, the start on ties.
    #[must_use]
    pub fn lowest(self) -> Node {
        let (a, b) = (self.start(), self.end());
        if b.y < a.y {
            b
        } else {
            a
        }
    }

    /// Whether `piece` is this edge or a same-direction part of this segment.
    #[must_use]
    pub fn covers(self, piece: Edge) -> bool {
        if self == piece {
            return true;
        }
        let (Edge::Segment(a, b), Edge::Segment(p, q)) = (self, piece) else {
            return false;
        };
        let ab = b.to_point() - a.to_point();
        let len2 = ab.norm_squared();
        if len2 <= 0.0 {
            return false;
        }
        let on_segment = |n: Node| {
            let an = n.to_point() - a.to_point();
            let t = an.dot(&ab) / len2;
            let off = an - ab * t;
            (-COVER_EPS..=1.0 + COVER_EPS).contains(&t)
                && off.norm_squared() <= COVER_EPS * COVER_EPS * len2
        };
        on_segment(p) && on_segment(q) && (q.to_point() - p.to_point()).dot(&ab) > 0.0
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Segment(a, b) => write!(f, "{a} -> {b}"),
            Edge::Arc(a, c, b) => write!(f, "{a} ~({c})~> {b}"),
        }
    }
}

/// Unordered set of boundary edges.
pub type EdgeSet = HashSet<Edge>;

/// Segments between consecutive nodes; `closed` adds the edge back to the first node.
#[must_use]
pub fn nodes_to_edges(nodes: &[Node], closed: bool) -> Vec<Edge> {
    let mut edges: Vec<Edge> = nodes.windows(2).map(|w| Edge::Segment(w[0], w[1])).collect();
    if closed {
        if let (Some(&last), Some(&first)) = (nodes.last(), nodes.first()) {
            edges.push(Edge::Segment(last, first));
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_zero_is_one_node() {
        let a = Node::new(0.0, 1.0);
        let b = Node::new(-0.0, 1.0);
        assert_eq!(a, b);
        let set: HashSet<Node> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn closeness_is_strict() {
        let a = Node::new(0.0, 0.0);
        assert!(a.is_close(Node::new(0.05, 0.05), 0.1));
        assert!(!a.is_close(Node::new(0.1, 0.0), 0.1));
    }

    #[test]
    fn reversed_arc_keeps_center() {
        let arc = Edge::Arc(Node::new(0.0, -1.0), Node::new(0.0, 0.0), Node::new(0.0, 1.0));
        let rev = arc.reversed();
        assert_eq!(rev.start(), Node::new(0.0, 1.0));
        assert_eq!(rev.end(), Node::new(0.0, -1.0));
        assert_eq!(rev.reversed(), arc);
    }

    #[test]
    fn split_segment_is_covered() {
        let whole = Edge::Segment(Node::new(3.0, 0.0), Node::new(3.0, -2.0));
        assert!(whole.covers(Edge::Segment(Node::new(3.0, -0.5), Node::new(3.0, -2.0))));
        assert!(whole.covers(whole));
        assert!(!whole.covers(whole.reversed()));
        assert!(!whole.covers(Edge::Segment(Node::new(3.0, 0.5), Node::new(3.0, 0.0))));
        assert!(!whole.covers(Edge::Segment(Node::new(1.0, -0.5), Node::new(1.0, -2.0))));
    }

    #[test]
    fn open_and_closed_chains() {
        let nodes = [Node::new(0.0, 0.0), Node::new(1.0, 0.0), Node::new(1.0, 1.0)];
        assert_eq!(nodes_to_edges(&nodes, false).len(), 2);
        let closed = nodes_to_edges(&nodes, true);
        assert_eq!(closed.len(), 3);
        assert_eq!(closed[2], Edge::Segment(nodes[2], nodes[0]));
    }
}
