use std::collections::HashSet;

use crate::error::{PolygonError, Result};

use super::clip::Polygon;
use super::node::{Edge, EdgeSet, Node};

/// Boundary loops of the union of polygons with disjoint interiors.
///
/// Edges that occur in both orientations are interior and cancel. The
/// remaining edges are chained into closed loops; loops that are holes run
/// clockwise and can be told apart with [`is_a_hole`]. Also returns, per
/// input polygon, the part of its boundary that survives.
///
/// # Errors
///
/// Returns `PolygonError::DeadEnd` if the surviving edges do not close up.
pub fn compute_disjoint_union(polygons: &[&Polygon]) -> Result<(Vec<Polygon>, Vec<EdgeSet>)> {
    let mut open: Vec<(Edge, usize)> = Vec::new();
    let mut boundaries = vec![EdgeSet::new(); polygons.len()];
    for (i, polygon) in polygons.iter().enumerate() {
        for &e in polygon.edges() {
            let reversed = e.reversed();
            if let Some(pos) = open.iter().position(|(f, _)| *f == reversed) {
                let (f, owner) = open.remove(pos);
                boundaries[owner].remove(&f);
            } else {
                open.push((e, i));
                boundaries[i].insert(e);
            }
        }
    }

    let mut loops = Vec::new();
    while !open.is_empty() {
        let (first, _) = open.remove(0);
        let start = first.start();
        let mut v = first.end();
        let mut nodes = vec![start];
        while v != start {
            nodes.push(v);
            let pos = open
                .iter()
                .position(|(e, _)| e.start() == v)
                .ok_or(PolygonError::DeadEnd { x: v.x, y: v.y })?;
            let (e, _) = open.remove(pos);
            v = e.end();
        }
        loops.push(Polygon::new(nodes));
    }
    Ok((loops, boundaries))
}

/// Whether the edges of `polygon` run clockwise, by the shoelace formula.
#[must_use]
pub fn is_a_hole(polygon: &Polygon) -> bool {
    let twice_area: f64 = polygon
        .edges()
        .iter()
        .map(|e| {
            let (a, b) = (e.start(), e.end());
            (b.x - a.x) * (b.y + a.y)
        })
        .sum();
    twice_area > 0.0
}

fn join(polygons: &[&Polygon]) -> (Vec<Node>, Vec<Edge>) {
    let mut seen_nodes = HashSet::new();
    let mut seen_edges = HashSet::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for polygon in polygons {
        for &n in polygon.nodes() {
            if seen_nodes.insert(n) {
                nodes.push(n);
            }
        }
        for &e in polygon.edges() {
            if seen_edges.insert(e) {
                edges.push(e);
            }
        }
    }
    (nodes, edges)
}

#[allow(clippy::float_cmp)]
fn axis_extreme(nodes: &[Node], top: bool) -> Result<Node> {
    nodes
        .iter()
        .copied()
        .filter(|n| n.x == 0.0)
        .reduce(|best, n| {
            let better = if top { n.y > best.y } else { n.y < best.y };
            if better {
                n
            } else {
                best
            }
        })
        .ok_or_else(|| PolygonError::NoAxisNode.into())
}

fn rmax(nodes: &[Node]) -> f64 {
    nodes.iter().map(|n| n.x).fold(f64::NEG_INFINITY, f64::max)
}

/// Upper silhouette of the union, from `x = rmax` back to the highest node
/// on the axis `x = 0`.
///
/// The walk starts at that axis node and always follows the outgoing edge
/// whose end is highest.
///
/// # Errors
///
/// Returns `PolygonError::NoAxisNode` if no node lies on the axis and
/// `PolygonError::DeadEnd` if the walk cannot continue.
pub fn compute_upper_boundary(polygons: &[&Polygon]) -> Result<Vec<Node>> {
    let (nodes, edges) = join(polygons);
    let mut x0 = axis_extreme(&nodes, true)?;
    let rmax = rmax(&nodes);
    let mut walk = vec![x0];
    while x0.x < rmax {
        let dead_end = PolygonError::DeadEnd { x: x0.x, y: x0.y };
        if walk.len() > edges.len() {
            return Err(dead_end.into());
        }
        let next = edges
            .iter()
            .filter(|e| e.start() == x0)
            .reduce(|best, e| if e.end().y > best.end().y { e } else { best })
            .ok_or(dead_end)?;
        x0 = next.end();
        walk.push(x0);
    }
    walk.reverse();
    Ok(walk)
}

/// Lower silhouette of the union, from the lowest node on the axis `x = 0`
/// to `x = rmax`.
///
/// The walk follows, backwards, the incoming edge whose start is lowest.
///
/// # Errors
///
/// Returns `PolygonError::NoAxisNode` if no node lies on the axis and
/// `PolygonError::DeadEnd` if the walk cannot continue.
pub fn compute_lower_boundary(polygons: &[&Polygon]) -> Result<Vec<Node>> {
    let (nodes, edges) = join(polygons);
    let mut x0 = axis_extreme(&nodes, false)?;
    let rmax = rmax(&nodes);
    let mut walk = vec![x0];
    while x0.x < rmax {
        let dead_end = PolygonError::DeadEnd { x: x0.x, y: x0.y };
        if walk.len() > edges.len() {
            return Err(dead_end.into());
        }
        let next = edges
            .iter()
            .filter(|e| e.end() == x0)
            .reduce(|best, e| if e.start().y < best.start().y { e } else { best })
            .ok_or(dead_end)?;
        x0 = next.start();
        walk.push(x0);
    }
    Ok(walk)
}
