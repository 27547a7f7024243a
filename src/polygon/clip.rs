use std::fmt;

use tracing::warn;

use crate::error::{PolygonError, Result};

use super::node::{nodes_to_edges, Edge, EdgeSet, Node};

/// Iteration cap of [`Polygon::all_intersections`].
const MAX_INSERTIONS: usize = 100;

/// How a crossing point relates to the existing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// The point is already a node.
    Existing,
    /// The point is within tolerance of this node and replaces it.
    Replace(Node),
    /// The point splits the edge between these two nodes.
    Between(Node, Node),
}

/// Walking direction along the node cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increasing node index.
    Forward,
    /// Decreasing node index.
    Backward,
}

/// Corner annotation `a - b - c - d` of a clipped polygon, numbered from the
/// lower left in clockwise direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corners {
    pub a: Node,
    pub b: Node,
    pub c: Node,
    pub d: Node,
}

/// Simple polygon given by its node cycle.
///
/// `edges[i]` always joins `nodes[i]` to the next node. Insertions keep both
/// lists in step, and an edge may be turned into an arc after the fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    corners: Option<Corners>,
}

impl Polygon {
    /// Distance under which a crossing snaps to an existing node.
    pub const TOL: f64 = 0.1;

    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = impl Into<Node>>) -> Self {
        let nodes: Vec<Node> = nodes.into_iter().map(Into::into).collect();
        let edges = nodes_to_edges(&nodes, true);
        Self {
            nodes,
            edges,
            corners: None,
        }
    }

    #[must_use]
    pub fn with_corners(mut self, corners: Corners) -> Self {
        self.corners = Some(corners);
        self
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn edge_set(&self) -> EdgeSet {
        self.edges.iter().copied().collect()
    }

    #[must_use]
    pub fn corners(&self) -> Option<Corners> {
        self.corners
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of `node` in the cycle.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NodeNotFound` if `node` is not a vertex.
    pub fn index(&self, node: Node) -> Result<usize> {
        self.nodes
            .iter()
            .position(|&n| n == node)
            .ok_or_else(|| PolygonError::NodeNotFound { x: node.x, y: node.y }.into())
    }

    /// Lowest and highest `y` of all nodes.
    #[must_use]
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let ys = self.nodes.iter().map(|n| n.y);
        let lo = ys.clone().reduce(f64::min)?;
        let hi = ys.reduce(f64::max)?;
        Some((lo, hi))
    }

    /// Crossings of the line `y = z` with the boundary, in edge order.
    ///
    /// A point reached from two edges is listed once, with the context of the
    /// later edge.
    #[must_use]
    pub fn intersections(&self, z: f64) -> Vec<(Node, Context)> {
        let mut found: Vec<(Node, Context)> = Vec::new();
        for edge in &self.edges {
            for (v, context) in self.intersect_edge(*edge, z) {
                match found.iter_mut().find(|(w, _)| *w == v) {
                    Some(slot) => slot.1 = context,
                    None => found.push((v, context)),
                }
            }
        }
        found
    }

    fn intersect_edge(&self, edge: Edge, z: f64) -> Vec<(Node, Context)> {
        let Edge::Segment(x, y) = edge else {
            return Vec::new();
        };
        #[allow(clippy::float_cmp)]
        let horizontal_at_z = x.y == z && y.y == z;
        if horizontal_at_z {
            return vec![(x, Context::Existing), (y, Context::Existing)];
        }
        if !((x.y <= z && z < y.y) || (y.y < z && z <= x.y)) {
            return Vec::new();
        }
        if (y.y - x.y).abs() < 1e-3 * Self::TOL {
            return vec![(x, Context::Existing), (y, Context::Existing)];
        }
        let t = (z - x.y) / (y.y - x.y);
        let v = Node::new(x.x + (y.x - x.x) * t, z);
        let context = if x.is_close(v, Self::TOL) {
            if x == v {
                Context::Existing
            } else {
                Context::Replace(x)
            }
        } else if y.is_close(v, Self::TOL) {
            if y == v {
                Context::Existing
            } else {
                Context::Replace(y)
            }
        } else {
            Context::Between(x, y)
        };
        vec![(v, context)]
    }

    /// Commits a crossing returned by [`Polygon::intersections`].
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NodeNotFound` if the context refers to a node
    /// that is no longer part of the polygon.
    pub fn add(&mut self, v: Node, context: Context) -> Result<()> {
        match context {
            Context::Existing => {}
            Context::Replace(x) => {
                let n = self.len();
                let i = self.index(x)?;
                self.nodes[i] = v;
                let prev = (i + n - 1) % n;
                self.edges[prev] = Edge::Segment(self.edges[prev].start(), v);
                self.edges[i] = Edge::Segment(v, self.edges[i].end());
            }
            Context::Between(x, y) => {
                let n = self.len();
                let i = self.index(y)?;
                let prev = (i + n - 1) % n;
                self.nodes.insert(i, v);
                self.edges[prev] = Edge::Segment(x, v);
                self.edges.insert(i, Edge::Segment(v, y));
            }
        }
        Ok(())
    }

    fn commit_extreme(&mut self, z: f64, rightmost: bool) -> Result<Node> {
        let (v, context) = self
            .intersections(z)
            .into_iter()
            .reduce(|best, next| {
                let better = if rightmost { next.0.x > best.0.x } else { next.0.x < best.0.x };
                if better {
                    next
                } else {
                    best
                }
            })
            .ok_or(PolygonError::NoIntersection { z })?;
        self.add(v, context)?;
        Ok(v)
    }

    /// Inserts and returns the leftmost crossing with `y = z`.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NoIntersection` if the line misses the polygon.
    pub fn left_intersection(&mut self, z: f64) -> Result<Node> {
        self.commit_extreme(z, false)
    }

    /// Inserts and returns the rightmost crossing with `y = z`.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NoIntersection` if the line misses the polygon.
    pub fn right_intersection(&mut self, z: f64) -> Result<Node> {
        self.commit_extreme(z, true)
    }

    /// Inserts every crossing with `y = z` and returns all of them.
    ///
    /// Gives up silently after a fixed number of insertions.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Polygon::add`].
    pub fn all_intersections(&mut self, z: f64) -> Result<Vec<Node>> {
        let mut found = self.intersections(z);
        for _ in 0..MAX_INSERTIONS {
            let Some(&(v, context)) = found.iter().find(|(_, c)| *c != Context::Existing) else {
                return Ok(found.into_iter().map(|(v, _)| v).collect());
            };
            self.add(v, context)?;
            found = self.intersections(z);
        }
        if found.iter().any(|(_, c)| *c != Context::Existing) {
            warn!(z, "stopped inserting crossings after {MAX_INSERTIONS} rounds");
        }
        Ok(found.into_iter().map(|(v, _)| v).collect())
    }

    /// Cuts off the polygon `a - b - c - d` whose left side `a - b` follows
    /// this polygon between the heights `a1` and `b1`, and whose right side
    /// lies at `x = c0`. The cut points are inserted into `self`.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NoIntersection` if a cut misses the polygon.
    pub fn clip_from_right(&mut self, a1: f64, b1: f64, c0: f64) -> Result<Polygon> {
        let a = self.right_intersection(a1)?;
        let b = self.right_intersection(b1)?;
        let c = Node::new(c0, b1);
        let d = Node::new(c0, a1);
        let mut nodes = self.nrange(a, b, Direction::Backward)?;
        nodes.extend([c, d]);
        Ok(Polygon::new(nodes).with_corners(Corners { a, b, c, d }))
    }

    /// Cuts off the polygon `a - b - c - d` whose right side `c - d` follows
    /// this polygon between the heights `d1` and `c1`, and whose left side
    /// lies at `x = a0`. The cut points are inserted into `self`.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NoIntersection` if a cut misses the polygon.
    pub fn clip_from_left(&mut self, d1: f64, c1: f64, a0: f64) -> Result<Polygon> {
        let c = self.left_intersection(c1)?;
        let d = self.left_intersection(d1)?;
        let a = Node::new(a0, d1);
        let b = Node::new(a0, c1);
        let mut nodes = vec![a, b];
        nodes.extend(self.nrange(c, d, Direction::Backward)?);
        Ok(Polygon::new(nodes).with_corners(Corners { a, b, c, d }))
    }

    /// Nodes from `a` to `b`, both included, walking in `direction`.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NodeNotFound` if `a` or `b` is not a vertex.
    pub fn nrange(&self, a: Node, b: Node, direction: Direction) -> Result<Vec<Node>> {
        let n = self.len();
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        let indices: Vec<usize> = match direction {
            Direction::Forward => {
                let mut stop = (ib + 1) % n;
                if ia >= stop {
                    stop += n;
                }
                (ia..stop).collect()
            }
            Direction::Backward => {
                let stop = (ib + n - 1) % n;
                let start = if stop >= ia { ia + n } else { ia };
                (stop + 1..=start).rev().collect()
            }
        };
        Ok(indices.into_iter().map(|i| self.nodes[i % n]).collect())
    }

    /// Segments along the boundary from `a` to `b` in forward direction.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NodeNotFound` if `a` or `b` is not a vertex.
    pub fn edgerange(&self, a: Node, b: Node) -> Result<EdgeSet> {
        let nodes = self.nrange(a, b, Direction::Forward)?;
        Ok(nodes_to_edges(&nodes, false).into_iter().collect())
    }

    /// Replaces the edge `edge` by `with`, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::NodeNotFound` if `edge` is not part of the boundary.
    pub(crate) fn replace_edge(&mut self, edge: Edge, with: Edge) -> Result<()> {
        let i = self.edges.iter().position(|&e| e == edge).ok_or_else(|| {
            let start = edge.start();
            PolygonError::NodeNotFound {
                x: start.x,
                y: start.y,
            }
        })?;
        self.edges[i] = with;
        Ok(())
    }

    /// Corner annotation, required by the pore pipeline.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::MissingCorners` naming `name`.
    pub(crate) fn require_corners(&self, name: &str) -> Result<Corners> {
        self.corners
            .ok_or_else(|| PolygonError::MissingCorners(name.to_owned()).into())
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<String> = self.nodes.iter().map(ToString::to_string).collect();
        write!(f, "Polygon([{}])", nodes.join(", "))
    }
}
