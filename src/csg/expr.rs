use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{CsgError, Result};

use super::axis_box::AxisBox;
use super::decompose::Decomposition;
use super::interval::IndexSet;
use super::registry::{BoxId, BoxStore};

/// Set operation at an inner node of a [`CsgExpr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
    Difference,
}

impl SetOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            SetOp::Union => "|",
            SetOp::Intersect => "&",
            SetOp::Difference => "-",
        }
    }

    #[must_use]
    pub fn apply(self, a: &IndexSet, b: &IndexSet) -> IndexSet {
        match self {
            SetOp::Union => a | b,
            SetOp::Intersect => a & b,
            SetOp::Difference => a - b,
        }
    }
}

#[derive(Debug)]
enum CsgNode {
    Leaf(AxisBox),
    Op {
        op: SetOp,
        lhs: CsgExpr,
        rhs: CsgExpr,
    },
}

/// Symbolic set expression over boxes.
///
/// Nodes are shared between expressions, so composing never copies subtrees.
/// Evaluation happens against a [`Decomposition`] through [`CsgEvaluator`].
#[derive(Debug, Clone)]
pub struct CsgExpr(Rc<CsgNode>);

impl CsgExpr {
    #[must_use]
    pub fn leaf(b: AxisBox) -> Self {
        Self(Rc::new(CsgNode::Leaf(b)))
    }

    #[must_use]
    pub fn combine(op: SetOp, lhs: CsgExpr, rhs: CsgExpr) -> Self {
        Self(Rc::new(CsgNode::Op { op, lhs, rhs }))
    }

    #[must_use]
    pub fn union(&self, other: &CsgExpr) -> Self {
        Self::combine(SetOp::Union, self.clone(), other.clone())
    }

    #[must_use]
    pub fn intersect(&self, other: &CsgExpr) -> Self {
        Self::combine(SetOp::Intersect, self.clone(), other.clone())
    }

    #[must_use]
    pub fn difference(&self, other: &CsgExpr) -> Self {
        Self::combine(SetOp::Difference, self.clone(), other.clone())
    }

    /// Leaf boxes in left-to-right order, repeats included.
    #[must_use]
    pub fn leaves(&self) -> Vec<&AxisBox> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a AxisBox>) {
        match &*self.0 {
            CsgNode::Leaf(b) => out.push(b),
            CsgNode::Op { lhs, rhs, .. } => {
                lhs.collect_leaves(out);
                rhs.collect_leaves(out);
            }
        }
    }

    fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Display for CsgExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            CsgNode::Leaf(b) => write!(f, "{b}"),
            CsgNode::Op { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

/// Evaluates expressions against one decomposition, memoizing every node.
///
/// Cached nodes are kept alive by the cache itself, so their addresses can
/// serve as keys for the lifetime of the evaluator.
pub struct CsgEvaluator<'a> {
    store: &'a BoxStore,
    decomposition: &'a Decomposition,
    native: HashMap<usize, (CsgExpr, IndexSet)>,
    per_dim: HashMap<usize, (CsgExpr, Vec<IndexSet>)>,
}

impl<'a> CsgEvaluator<'a> {
    #[must_use]
    pub fn new(store: &'a BoxStore, decomposition: &'a Decomposition) -> Self {
        Self {
            store,
            decomposition,
            native: HashMap::new(),
            per_dim: HashMap::new(),
        }
    }

    /// Index set of `expr`, using each leaf box's cells at its own
    /// topological dimension.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::UnregisteredBox` if a leaf box is not in the store.
    pub fn eval(&mut self, expr: &CsgExpr) -> Result<IndexSet> {
        if let Some((_, set)) = self.native.get(&expr.key()) {
            return Ok(set.clone());
        }
        let set = match &*expr.0 {
            CsgNode::Leaf(b) => {
                let id = self.resolve(b)?;
                self.decomposition.native_index_set(self.store, id)?.clone()
            }
            CsgNode::Op { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                op.apply(&a, &b)
            }
        };
        self.native.insert(expr.key(), (expr.clone(), set.clone()));
        Ok(set)
    }

    /// Index sets of `expr` for every dimension `0..=d`.
    ///
    /// # Errors
    ///
    /// Returns `CsgError::UnregisteredBox` if a leaf box is not in the store.
    pub fn evalsets(&mut self, expr: &CsgExpr) -> Result<Vec<IndexSet>> {
        if let Some((_, sets)) = self.per_dim.get(&expr.key()) {
            return Ok(sets.clone());
        }
        let sets = match &*expr.0 {
            CsgNode::Leaf(b) => {
                let id = self.resolve(b)?;
                self.decomposition.index_sets(id)?.to_vec()
            }
            CsgNode::Op { op, lhs, rhs } => {
                let a = self.evalsets(lhs)?;
                let b = self.evalsets(rhs)?;
                a.iter().zip(&b).map(|(x, y)| op.apply(x, y)).collect()
            }
        };
        self.per_dim.insert(expr.key(), (expr.clone(), sets.clone()));
        Ok(sets)
    }

    fn resolve(&self, b: &AxisBox) -> Result<BoxId> {
        self.store
            .find(b)
            .ok_or_else(|| CsgError::UnregisteredBox(b.to_string()).into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::csg::decompose::multi_box_union;
    use crate::csg::registry::BoxRole;

    struct Fixture {
        store: BoxStore,
        decomposition: Decomposition,
        a: AxisBox,
        b: AxisBox,
        c: AxisBox,
    }

    fn fixture() -> Fixture {
        let a = AxisBox::new(&[0.0, 0.0], &[2.0, 2.0]).unwrap();
        let b = AxisBox::new(&[1.0, 1.0], &[3.0, 3.0]).unwrap();
        let c = AxisBox::new(&[0.0, 1.0], &[3.0, 2.0]).unwrap();
        let mut store = BoxStore::new();
        let ids: Vec<_> = [&a, &b, &c]
            .iter()
            .map(|x| store.register(x, BoxRole::Bulk))
            .collect();
        let decomposition = multi_box_union(&store, &ids, &[]).unwrap();
        Fixture {
            store,
            decomposition,
            a,
            b,
            c,
        }
    }

    #[test]
    fn operators_follow_set_algebra() {
        let f = fixture();
        let mut ev = CsgEvaluator::new(&f.store, &f.decomposition);
        let (a, b) = (CsgExpr::leaf(f.a.clone()), CsgExpr::leaf(f.b.clone()));
        let sa = ev.eval(&a).unwrap();
        let sb = ev.eval(&b).unwrap();
        assert_eq!(ev.eval(&a.union(&b)).unwrap(), &sa | &sb);
        assert_eq!(ev.eval(&a.intersect(&b)).unwrap(), &sa & &sb);
        assert_eq!(ev.eval(&a.difference(&b)).unwrap(), &sa - &sb);
    }

    #[test]
    fn union_and_intersection_commute_and_associate() {
        let f = fixture();
        let mut ev = CsgEvaluator::new(&f.store, &f.decomposition);
        let (a, b, c) = (
            CsgExpr::leaf(f.a.clone()),
            CsgExpr::leaf(f.b.clone()),
            CsgExpr::leaf(f.c.clone()),
        );
        assert_eq!(ev.eval(&a.union(&b)).unwrap(), ev.eval(&b.union(&a)).unwrap());
        assert_eq!(
            ev.eval(&a.union(&b).union(&c)).unwrap(),
            ev.eval(&a.union(&b.union(&c))).unwrap()
        );
        assert_eq!(
            ev.eval(&a.intersect(&b).intersect(&c)).unwrap(),
            ev.eval(&c.intersect(&b).intersect(&a)).unwrap()
        );
    }

    #[test]
    fn self_difference_is_empty() {
        let f = fixture();
        let mut ev = CsgEvaluator::new(&f.store, &f.decomposition);
        let ab = CsgExpr::leaf(f.a.clone()).union(&CsgExpr::leaf(f.b.clone()));
        assert!(ev.eval(&ab.difference(&ab)).unwrap().is_empty());
    }

    #[test]
    fn evalsets_agree_with_eval_at_full_dimension() {
        let f = fixture();
        let mut ev = CsgEvaluator::new(&f.store, &f.decomposition);
        let expr = CsgExpr::leaf(f.a.clone()).difference(&CsgExpr::leaf(f.c.clone()));
        let sets = ev.evalsets(&expr).unwrap();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[2], ev.eval(&expr).unwrap());
        // the shared edges at y = 1 and y = 2 lie in c, so they are removed
        assert!(!sets[1].is_empty());
    }

    #[test]
    fn unknown_leaf_is_an_error() {
        let f = fixture();
        let mut ev = CsgEvaluator::new(&f.store, &f.decomposition);
        let stranger = CsgExpr::leaf(AxisBox::new(&[5.0, 5.0], &[6.0, 6.0]).unwrap());
        assert!(ev.eval(&stranger).is_err());
    }

    #[test]
    fn leaves_in_order() {
        let f = fixture();
        let expr = CsgExpr::leaf(f.a.clone()).union(&CsgExpr::leaf(f.b.clone()));
        let leaves = expr.leaves();
        assert_eq!(leaves, vec![&f.a, &f.b]);
    }
}
