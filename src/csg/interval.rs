use std::collections::BTreeSet;

use crate::error::{CsgError, Result};
use crate::math::{unique, Float};

/// Indices into an input list or into an entity list.
pub type IndexSet = BTreeSet<usize>;

/// Disjoint decomposition of a list of 1D intervals.
///
/// `nodes` are the sorted distinct endpoints; `intervals[j]` spans
/// `nodes[j]..nodes[j + 1]`. The parent sets record which input intervals
/// contain each node and each atomic subinterval.
#[derive(Debug, Clone, Default)]
pub struct IntervalUnion {
    pub nodes: Vec<Float>,
    pub node_parents: Vec<IndexSet>,
    pub intervals: Vec<(Float, Float)>,
    pub interval_parents: Vec<IndexSet>,
}

impl IntervalUnion {
    /// Position of `x` among the atomic nodes.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::MissingNode` if `x` is not within tolerance of a node.
    pub fn node_index(&self, x: Float) -> Result<usize> {
        self.nodes
            .binary_search_by(|node| node.cmp_tol(x))
            .map_err(|_| CsgError::MissingNode(x.value()).into())
    }
}

/// Decomposes intervals `(a, b)` with `a <= b` into atomic pieces.
///
/// Degenerate intervals (`a == b`) contribute a node but no subinterval.
///
/// # Errors
///
/// Returns an error if an endpoint cannot be located among the atomic nodes,
/// which only happens when tolerant equality chains break down.
pub fn multi_interval_union(intervals: &[(Float, Float)]) -> Result<IntervalUnion> {
    let nodes = unique(intervals.iter().flat_map(|&(a, b)| [a, b]));
    let atoms: Vec<(Float, Float)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();

    let mut union = IntervalUnion {
        node_parents: vec![IndexSet::new(); nodes.len()],
        interval_parents: vec![IndexSet::new(); atoms.len()],
        nodes,
        intervals: atoms,
    };

    for (i, &(a, b)) in intervals.iter().enumerate() {
        let ia = union.node_index(a)?;
        let ib = union.node_index(b)?;
        for j in ia..ib {
            union.node_parents[j].insert(i);
            union.interval_parents[j].insert(i);
        }
        union.node_parents[ib].insert(i);
    }

    Ok(union)
}
