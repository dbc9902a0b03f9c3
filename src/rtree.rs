//! An R-tree over arbitrary bounded values.
//!
//! Nodes live in an arena indexed by stable handles; the parent link is
//! an index rather than a pointer, so upward walks are O(1) and child
//! ownership flows strictly downward from the root. A node is either a
//! leaf carrying one value or a page carrying children together with the
//! cached union of their bounds.

pub mod split;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::marker::PhantomData;

use num::Float;

use crate::bound::Bound;
use crate::index::{HasBound, SpatialIndex};
use crate::multiset::TruncatedMultiSet;
use crate::predicate::{DistancePredicate, SpatialPredicate};
use split::{Side, SplitStrategy};

type NodeId = usize;

enum NodeKind<T, const N: usize, V> {
    Leaf(V),
    Page {
        children: Vec<NodeId>,
        bound: Bound<T, N>,
    },
}

struct Node<T, const N: usize, V> {
    parent: Option<NodeId>,
    kind: NodeKind<T, N, V>,
}

/// R-tree spatial index with a pluggable split strategy.
pub struct RTree<T, const N: usize, V, S> {
    nodes: Vec<Node<T, N, V>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
    _strategy: PhantomData<S>,
}

/// The R-tree used throughout the distributed pipeline.
pub type RTree3<V, S = split::Quadratic<
    { crate::constants::DEFAULT_MAX_CHILDREN },
    { crate::constants::DEFAULT_MIN_CHILDREN },
>> = RTree<f64, 3, V, S>;

/// Entry of the best-first candidate queue in distance queries.
struct Candidate<T> {
    dist: T,
    node: NodeId,
}

impl<T: Float> PartialEq for Candidate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.node == other.node
    }
}

impl<T: Float> Eq for Candidate<T> {}

impl<T: Float> PartialOrd for Candidate<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Float> Ord for Candidate<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Distances are finite; the node id settles exact ties so the
        // traversal order is deterministic.
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl<T, const N: usize, V, S> Default for RTree<T, N, V, S>
where
    T: Float,
    V: HasBound<T, N> + Clone + PartialEq,
    S: SplitStrategy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, V, S> RTree<T, N, V, S>
where
    T: Float,
    V: HasBound<T, N> + Clone + PartialEq,
    S: SplitStrategy,
{
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            _strategy: PhantomData,
        }
    }

    fn alloc(&mut self, node: Node<T, N, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn dealloc(&mut self, id: NodeId) {
        // Overwrite with an empty page so the slot holds no stale value.
        self.nodes[id] = Node {
            parent: None,
            kind: NodeKind::Page {
                children: Vec::new(),
                bound: Bound::empty(),
            },
        };
        self.free.push(id);
    }

    fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Leaf(_))
    }

    fn node_bound(&self, id: NodeId) -> Bound<T, N> {
        match &self.nodes[id].kind {
            NodeKind::Leaf(value) => value.bound(),
            NodeKind::Page { bound, .. } => *bound,
        }
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id].kind {
            NodeKind::Page { children, .. } => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Attach `child` to the page `parent`, stretching the cached bound.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let child_bound = self.node_bound(child);
        self.nodes[child].parent = Some(parent);
        match &mut self.nodes[parent].kind {
            NodeKind::Page { children, bound } => {
                children.push(child);
                bound.stretch(&child_bound);
            }
            NodeKind::Leaf(_) => unreachable!("leaves carry no children"),
        }
    }

    /// Detach `child` from the page `parent` without re-stretching.
    fn detach(&mut self, parent: NodeId, child: NodeId) {
        match &mut self.nodes[parent].kind {
            NodeKind::Page { children, .. } => {
                children.retain(|&c| c != child);
            }
            NodeKind::Leaf(_) => unreachable!("leaves carry no children"),
        }
        self.nodes[child].parent = None;
    }

    /// Recompute the cached bound of `page` from its current children.
    fn restretch(&mut self, page: NodeId) {
        let mut fresh = Bound::empty();
        for child in self.children(page).to_vec() {
            fresh.stretch(&self.node_bound(child));
        }
        match &mut self.nodes[page].kind {
            NodeKind::Page { bound, .. } => *bound = fresh,
            NodeKind::Leaf(_) => unreachable!("leaves carry no cached bound"),
        }
    }

    /// Descend from the root to the page whose children are leaves,
    /// choosing at each level the child needing the least area growth.
    ///
    /// Ties resolve toward the smaller current area, then the smaller
    /// child count.
    fn choose_leaf_page(&self, bound: &Bound<T, N>) -> NodeId {
        let mut current = self.root.expect("descent requires a root");

        loop {
            let children = self.children(current);
            if children.is_empty() || self.is_leaf(children[0]) {
                return current;
            }

            let mut best = children[0];
            let mut best_increase = T::infinity();
            for &child in children {
                let child_bound = self.node_bound(child);
                let increase = child_bound.increase_to_hold(bound);
                if increase < best_increase {
                    best_increase = increase;
                    best = child;
                } else if increase == best_increase
                    && (child_bound.area() < self.node_bound(best).area()
                        || self.child_count(child) < self.child_count(best))
                {
                    best = child;
                }
            }
            current = best;
        }
    }

    /// Split an oversized page into two pages within the capacity band.
    ///
    /// The original page is left empty and freed by the caller.
    fn split_page(&mut self, page: NodeId) -> (NodeId, NodeId) {
        let children = match &mut self.nodes[page].kind {
            NodeKind::Page { children, .. } => std::mem::take(children),
            NodeKind::Leaf(_) => unreachable!("only pages split"),
        };
        let parent_bound = self.node_bound(page);
        let child_bounds: Vec<_> = children.iter().map(|&c| self.node_bound(c)).collect();

        let (seed_a, seed_b) = S::pick_seeds(&parent_bound, &child_bounds);

        let a_page = self.alloc(Node {
            parent: None,
            kind: NodeKind::Page {
                children: Vec::new(),
                bound: Bound::empty(),
            },
        });
        let b_page = self.alloc(Node {
            parent: None,
            kind: NodeKind::Page {
                children: Vec::new(),
                bound: Bound::empty(),
            },
        });
        self.attach(a_page, children[seed_a]);
        self.attach(b_page, children[seed_b]);

        let mut remaining: Vec<NodeId> = children
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != seed_a && i != seed_b)
            .map(|(_, &c)| c)
            .collect();

        // Place children until assigning more to either side would
        // starve the other below the minimum fill.
        while !remaining.is_empty()
            && remaining.len() + self.child_count(a_page) > S::MIN_CHILDREN
            && remaining.len() + self.child_count(b_page) > S::MIN_CHILDREN
        {
            let remaining_bounds: Vec<_> =
                remaining.iter().map(|&c| self.node_bound(c)).collect();
            let (index, side) = S::pick_next(
                &remaining_bounds,
                &self.node_bound(a_page),
                &self.node_bound(b_page),
            );
            let chosen = remaining.swap_remove(index);
            match side {
                Side::A => self.attach(a_page, chosen),
                Side::B => self.attach(b_page, chosen),
            }
        }

        // Whatever is left belongs wholesale to the starved side.
        if !remaining.is_empty() {
            let target = if self.child_count(a_page) < S::MIN_CHILDREN {
                a_page
            } else {
                b_page
            };
            for child in remaining {
                self.attach(target, child);
            }
        }

        assert!(self.child_count(a_page) >= S::MIN_CHILDREN);
        assert!(self.child_count(b_page) >= S::MIN_CHILDREN);
        assert!(self.child_count(a_page) <= S::MAX_CHILDREN);
        assert!(self.child_count(b_page) <= S::MAX_CHILDREN);
        (a_page, b_page)
    }

    /// Ascend from `start` to the root, splitting oversized pages and
    /// stretching ancestor bounds by `inserted_bound`.
    fn expand(&mut self, start: NodeId, inserted_bound: &Bound<T, N>) {
        let mut current = start;

        while let Some(parent) = self.nodes[current].parent {
            if self.child_count(current) > S::MAX_CHILDREN {
                let (a_page, b_page) = self.split_page(current);
                self.detach(parent, current);
                self.dealloc(current);
                self.attach(parent, a_page);
                self.attach(parent, b_page);
            }
            current = parent;
            match &mut self.nodes[current].kind {
                NodeKind::Page { bound, .. } => bound.stretch(inserted_bound),
                NodeKind::Leaf(_) => unreachable!("parents are pages"),
            }
        }

        // Root overflow grows the tree by one level.
        if self.child_count(current) > S::MAX_CHILDREN {
            let (a_page, b_page) = self.split_page(current);
            self.dealloc(current);
            let new_root = self.alloc(Node {
                parent: None,
                kind: NodeKind::Page {
                    children: Vec::new(),
                    bound: Bound::empty(),
                },
            });
            self.attach(new_root, a_page);
            self.attach(new_root, b_page);
            self.root = Some(new_root);
        }
    }

    /// Ascend from `start`, dissolving underfilled pages and collecting
    /// the values beneath them for reinsertion from the root.
    fn condense(&mut self, start: NodeId) {
        let mut orphan_values = Vec::new();
        let mut current = start;

        while let Some(parent) = self.nodes[current].parent {
            if self.child_count(current) < S::MIN_CHILDREN {
                for child in self.children(current).to_vec() {
                    self.collect_values(child, &mut orphan_values);
                }
                self.detach(parent, current);
                self.dealloc(current);
            }
            current = parent;
            self.restretch(current);
        }

        for value in orphan_values {
            let bound = value.bound();
            let leaf = self.alloc(Node {
                parent: None,
                kind: NodeKind::Leaf(value),
            });
            let target = self.choose_leaf_page(&bound);
            self.attach(target, leaf);
            self.expand(target, &bound);
        }

        // Collapse a root left with a single page child.
        let root = self.root.expect("condense requires a root");
        if self.child_count(root) == 1 {
            let only = self.children(root)[0];
            if !self.is_leaf(only) {
                self.detach(root, only);
                self.dealloc(root);
                self.root = Some(only);
            }
        }
    }

    /// Free a subtree, moving every value beneath it into `values`.
    fn collect_values(&mut self, id: NodeId, values: &mut Vec<V>) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match &mut self.nodes[node].kind {
                NodeKind::Leaf(_) => {
                    let kind = std::mem::replace(
                        &mut self.nodes[node].kind,
                        NodeKind::Page {
                            children: Vec::new(),
                            bound: Bound::empty(),
                        },
                    );
                    if let NodeKind::Leaf(value) = kind {
                        values.push(value);
                    }
                    self.dealloc(node);
                }
                NodeKind::Page { children, .. } => {
                    stack.extend(std::mem::take(children));
                    self.dealloc(node);
                }
            }
        }
    }

    /// Log page and leaf counts plus the child-count histogram.
    pub fn diagnostics(&self) {
        let mut leaf_count = 0usize;
        let mut page_count = 0usize;
        let mut child_counts = vec![0usize; S::MAX_CHILDREN + 1];

        let mut queue = VecDeque::new();
        if let Some(root) = self.root {
            queue.push_back(root);
        }
        while let Some(node) = queue.pop_front() {
            if self.is_leaf(node) {
                leaf_count += 1;
            } else {
                page_count += 1;
                child_counts[self.child_count(node)] += 1;
                queue.extend(self.children(node).iter().copied());
            }
        }

        log::info!("pages = {page_count}, leafs = {leaf_count}");
        for (count, pages) in child_counts.iter().enumerate() {
            if *pages > 0 {
                log::info!("pages with {count} children = {pages}");
            }
        }
    }
}

impl<T, const N: usize, V, S> SpatialIndex<T, N, V> for RTree<T, N, V, S>
where
    T: Float,
    V: HasBound<T, N> + Clone + PartialEq,
    S: SplitStrategy,
{
    fn insert(&mut self, value: V) {
        let bound = value.bound();
        let leaf = self.alloc(Node {
            parent: None,
            kind: NodeKind::Leaf(value),
        });

        if self.root.is_none() {
            let root = self.alloc(Node {
                parent: None,
                kind: NodeKind::Page {
                    children: Vec::new(),
                    bound: Bound::empty(),
                },
            });
            self.root = Some(root);
        }

        let target = self.choose_leaf_page(&bound);
        self.attach(target, leaf);
        self.len += 1;
        self.expand(target, &bound);
    }

    fn remove(&mut self, value: &V) {
        if self.root.is_none() {
            return;
        }

        let bound = value.bound();
        let target = self.choose_leaf_page(&bound);

        let matches: Vec<NodeId> = self
            .children(target)
            .iter()
            .copied()
            .filter(|&child| match &self.nodes[child].kind {
                NodeKind::Leaf(stored) => stored.bound() == bound && stored == value,
                NodeKind::Page { .. } => false,
            })
            .collect();

        for leaf in matches {
            self.detach(target, leaf);
            self.dealloc(leaf);
            self.len -= 1;
        }
        self.restretch(target);
        self.condense(target);
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn bounds(&self) -> Bound<T, N> {
        match self.root {
            Some(root) => self.node_bound(root),
            None => Bound::empty(),
        }
    }

    fn query(&self, predicate: &SpatialPredicate<T, N>) -> Vec<V> {
        let mut found = Vec::new();
        let Some(root) = self.root else {
            return found;
        };

        let mut candidates = VecDeque::new();
        candidates.push_back(root);
        while let Some(node) = candidates.pop_front() {
            let is_leaf = self.is_leaf(node);
            if predicate.evaluate(&self.node_bound(node), is_leaf) {
                match &self.nodes[node].kind {
                    NodeKind::Leaf(value) => found.push(value.clone()),
                    NodeKind::Page { children, .. } => {
                        candidates.extend(children.iter().copied())
                    }
                }
            }
        }
        found
    }

    fn query_nearest(&self, predicate: &DistancePredicate<T, N>) -> Vec<V> {
        let Some(root) = self.root else {
            return Vec::new();
        };

        let mut candidate_nodes = BinaryHeap::new();
        let mut candidate_leafs = TruncatedMultiSet::new(predicate.count());
        let mut threshold = T::infinity();

        let dist = predicate.evaluate(&self.node_bound(root), self.is_leaf(root));
        candidate_nodes.push(std::cmp::Reverse(Candidate { dist, node: root }));

        while let Some(std::cmp::Reverse(candidate)) = candidate_nodes.pop() {
            if candidate.dist > threshold {
                continue;
            }
            match &self.nodes[candidate.node].kind {
                NodeKind::Leaf(_) => {
                    candidate_leafs.insert(candidate.dist, candidate.node);
                    if candidate_leafs.len() >= predicate.count() {
                        threshold = candidate_leafs
                            .last_key()
                            .expect("count leafs accumulated");
                    }
                }
                NodeKind::Page { children, .. } => {
                    for &child in children {
                        let dist =
                            predicate.evaluate(&self.node_bound(child), self.is_leaf(child));
                        candidate_nodes.push(std::cmp::Reverse(Candidate { dist, node: child }));
                    }
                }
            }
        }

        candidate_leafs
            .into_values()
            .map(|node| match &self.nodes[node].kind {
                NodeKind::Leaf(value) => value.clone(),
                NodeKind::Page { .. } => unreachable!("only leaves accumulate"),
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::split::{Linear, Quadratic};
    use super::*;
    use crate::predicate;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    type Box3 = Bound<f64, 3>;
    type Value = (Box3, usize);
    type Tree = RTree<f64, 3, Value, Quadratic<10, 4>>;

    fn random_points(n: usize, rng: &mut ChaCha8Rng) -> Vec<Value> {
        (0..n)
            .map(|i| {
                let p = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
                (Box3::from_point(p), i)
            })
            .collect()
    }

    impl<T, const N: usize, V, S> RTree<T, N, V, S>
    where
        T: Float,
        V: HasBound<T, N> + Clone + PartialEq,
        S: SplitStrategy,
    {
        /// Walk the whole tree checking the structural invariants.
        fn assert_invariants(&self) {
            let Some(root) = self.root else {
                assert_eq!(self.len, 0);
                return;
            };
            assert!(self.nodes[root].parent.is_none());

            let mut leaf_count = 0;
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                match &self.nodes[node].kind {
                    NodeKind::Leaf(_) => leaf_count += 1,
                    NodeKind::Page { children, bound } => {
                        if node != root {
                            assert!(children.len() >= S::MIN_CHILDREN);
                        }
                        assert!(children.len() <= S::MAX_CHILDREN);

                        let mut expected = Bound::empty();
                        for &child in children {
                            assert_eq!(self.nodes[child].parent, Some(node));
                            let child_bound = self.node_bound(child);
                            assert!(bound.contains(&child_bound));
                            expected.stretch(&child_bound);
                            stack.push(child);
                        }
                        if !children.is_empty() {
                            assert_eq!(*bound, expected);
                        }
                    }
                }
            }
            assert_eq!(leaf_count, self.len);
        }
    }

    #[test]
    fn test_empty_tree_queries() {
        let tree = Tree::new();
        let probe = Box3::new([0.0; 3], [1.0; 3]);
        assert!(tree.query(&predicate::intersects(probe)).is_empty());
        assert!(tree.query_nearest(&predicate::nearest(probe, 5)).is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_insert_maintains_invariants() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut tree = Tree::new();
        for value in random_points(200, &mut rng) {
            tree.insert(value);
        }
        assert_eq!(tree.len(), 200);
        tree.assert_invariants();
    }

    #[test]
    fn test_spatial_query_finds_all_contained() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut tree = Tree::new();
        let values = random_points(300, &mut rng);
        for value in &values {
            tree.insert(value.clone());
        }

        let probe = Box3::new([0.25; 3], [0.75; 3]);
        let mut found: Vec<usize> = tree
            .query(&predicate::contained_by(probe))
            .into_iter()
            .map(|(_, i)| i)
            .collect();
        found.sort_unstable();

        let mut expected: Vec<usize> = values
            .iter()
            .filter(|(b, _)| probe.contains(b))
            .map(|&(_, i)| i)
            .collect();
        expected.sort_unstable();

        assert_eq!(found, expected);
    }

    #[test]
    fn test_insert_remove_parity() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut tree = Tree::new();
        let values = random_points(50, &mut rng);
        for value in &values {
            tree.insert(value.clone());
        }

        // Remove a pseudo random 20 of them.
        let mut removed = std::collections::HashSet::new();
        while removed.len() < 20 {
            removed.insert(rng.gen_range(0..values.len()));
        }
        for &index in &removed {
            tree.remove(&values[index]);
        }

        assert_eq!(tree.len(), 30);
        tree.assert_invariants();

        // A full traversal returns the remaining values exactly once.
        let everything = Box3::new([-1.0; 3], [2.0; 3]);
        let mut left: Vec<usize> = tree
            .query(&predicate::contained_by(everything))
            .into_iter()
            .map(|(_, i)| i)
            .collect();
        left.sort_unstable();

        let mut expected: Vec<usize> = (0..values.len())
            .filter(|i| !removed.contains(i))
            .collect();
        expected.sort_unstable();
        assert_eq!(left, expected);
    }

    #[test]
    fn test_nearest_matches_exhaustive_scan() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut tree = Tree::new();
        let values = random_points(200, &mut rng);
        for value in &values {
            tree.insert(value.clone());
        }

        for _ in 0..50 {
            let probe = Box3::from_point([
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
            ]);
            let found = tree.query_nearest(&predicate::nearest(probe, 7));
            assert_eq!(found.len(), 7);

            // Distances must be sorted and match the best seven overall.
            let found_dists: Vec<f64> =
                found.iter().map(|(b, _)| probe.nearest(b)).collect();
            assert!(found_dists.windows(2).all(|w| w[0] <= w[1]));

            let mut all_dists: Vec<f64> =
                values.iter().map(|(b, _)| probe.nearest(b)).collect();
            all_dists.sort_by(|a, b| a.partial_cmp(b).unwrap());
            for (actual, expected) in found_dists.iter().zip(all_dists.iter()) {
                assert_eq!(actual, expected);
            }
        }
    }

    #[test]
    fn test_linear_strategy_builds_valid_tree() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut tree: RTree<f64, 3, Value, Linear<10, 4>> = RTree::new();
        let values = random_points(150, &mut rng);
        for value in &values {
            tree.insert(value.clone());
        }
        tree.assert_invariants();

        let probe = Box3::from_point([0.5; 3]);
        let found = tree.query_nearest(&predicate::nearest(probe, 5));
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn test_duplicate_values_all_removed() {
        let mut tree = Tree::new();
        let value = (Box3::from_point([0.5; 3]), 7);
        for _ in 0..3 {
            tree.insert(value.clone());
        }
        for i in 0..10 {
            tree.insert((Box3::from_point([0.1 * i as f64, 0.0, 0.0]), 100 + i));
        }
        assert_eq!(tree.len(), 13);

        tree.remove(&value);
        assert_eq!(tree.len(), 10);
        tree.assert_invariants();

        let probe = Box3::from_point([0.5; 3]);
        let found = tree.query(&predicate::equals(probe));
        assert!(found.iter().all(|&(_, i)| i != 7));
    }
}
