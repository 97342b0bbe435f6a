//! Single-index AVL engine.
//!
//! A [`LinkSet`] is one index's view of the shared node pool: a root handle
//! plus a parallel array of `{left, right, parent, balance}` link records,
//! one per arena slot. The engine implements ordered-tree search, placement,
//! insertion rebalancing, unlinking with deletion rebalancing, and
//! parent-link traversal. It never owns or moves element values; comparisons
//! read them out of the arena through the probe or comparator it is handed.
//!
//! Balance factors are `height(right) - height(left)` and stay in
//! `{-1, 0, +1}` between operations. Insertion rebalancing stops at the
//! first rotation (the rotated subtree regains its pre-insert height);
//! deletion rebalancing must keep walking up past rotations, because a
//! rotation after a removal can leave the subtree one shorter than before.

use crate::arena::{Arena, NodeId};
use std::cmp::Ordering;

/// Which child slot of a parent a node occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// The left child slot.
    Left,
    /// The right child slot.
    Right,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Per-node link record for one index.
#[derive(Debug, Clone, Copy, Default)]
struct Links {
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
    balance: i8,
}

/// Where a new node attaches to the tree.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Placement {
    /// The tree is empty; the node becomes the root.
    Root,
    /// The node becomes a leaf child of `parent` on `side`.
    Under {
        /// The insertion parent found by descent.
        parent: NodeId,
        /// The vacant child slot the descent ended at.
        side: Side,
    },
}

/// One index's intrusive link structure over the shared pool.
pub(crate) struct LinkSet {
    root: Option<NodeId>,
    links: Vec<Links>,
}

impl LinkSet {
    pub(crate) const fn new() -> Self {
        Self {
            root: None,
            links: Vec::new(),
        }
    }

    pub(crate) const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Grows the link array to cover `slot`.
    pub(crate) fn ensure_slot(&mut self, slot: usize) {
        if self.links.len() <= slot {
            self.links.resize_with(slot + 1, Links::default);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.root = None;
        self.links.clear();
    }

    fn links(&self, id: NodeId) -> &Links {
        &self.links[id.slot()]
    }

    fn links_mut(&mut self, id: NodeId) -> &mut Links {
        &mut self.links[id.slot()]
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).parent
    }

    pub(crate) fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.links(id).left,
            Side::Right => self.links(id).right,
        }
    }

    pub(crate) fn balance(&self, id: NodeId) -> i8 {
        self.links(id).balance
    }

    fn set_child(&mut self, id: NodeId, side: Side, child: Option<NodeId>) {
        match side {
            Side::Left => self.links_mut(id).left = child,
            Side::Right => self.links_mut(id).right = child,
        }
    }

    /// The child slot `id` occupies under its parent. `id` must not be root.
    fn side_of(&self, id: NodeId) -> Side {
        let parent = self.links(id).parent.unwrap();
        if self.links(parent).left == Some(id) {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Points `parent`'s child slot (or the root) at `new`.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let side = if self.links(p).left == Some(old) {
                    Side::Left
                } else {
                    Side::Right
                };
                self.set_child(p, side, new);
            }
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Leftmost node of the subtree rooted at `from`.
    pub(crate) fn minimum(&self, from: NodeId) -> NodeId {
        let mut cur = from;
        while let Some(next) = self.links(cur).left {
            cur = next;
        }
        cur
    }

    /// Rightmost node of the subtree rooted at `from`.
    pub(crate) fn maximum(&self, from: NodeId) -> NodeId {
        let mut cur = from;
        while let Some(next) = self.links(cur).right {
            cur = next;
        }
        cur
    }

    /// First node in sort order, if any.
    pub(crate) fn first(&self) -> Option<NodeId> {
        self.root.map(|root| self.minimum(root))
    }

    /// Last node in sort order, if any.
    pub(crate) fn last(&self) -> Option<NodeId> {
        self.root.map(|root| self.maximum(root))
    }

    /// In-order successor: leftmost of the right subtree, else the first
    /// ancestor reached through a left-child link.
    pub(crate) fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.links(id).right {
            return Some(self.minimum(right));
        }
        let mut cur = id;
        while let Some(parent) = self.links(cur).parent {
            if self.links(parent).left == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    /// In-order predecessor; mirror of [`Self::successor`].
    pub(crate) fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(left) = self.links(id).left {
            return Some(self.maximum(left));
        }
        let mut cur = id;
        while let Some(parent) = self.links(cur).parent {
            if self.links(parent).right == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Descends for an element whose key compares equal under `probe`.
    ///
    /// `probe` reports how the sought key compares to the probed element's
    /// key. Returns the first equal node the descent reaches.
    pub(crate) fn find<T>(
        &self,
        arena: &Arena<T>,
        probe: impl Fn(&T) -> Ordering,
    ) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            match probe(arena.resolve(id)) {
                Ordering::Less => cur = self.links(id).left,
                Ordering::Greater => cur = self.links(id).right,
                Ordering::Equal => return Some(id),
            }
        }
        None
    }

    /// First node whose key is not less than the sought key.
    pub(crate) fn lower_bound<T>(
        &self,
        arena: &Arena<T>,
        probe: impl Fn(&T) -> Ordering,
    ) -> Option<NodeId> {
        let mut cur = self.root;
        let mut candidate = None;
        while let Some(id) = cur {
            if probe(arena.resolve(id)) == Ordering::Greater {
                cur = self.links(id).right;
            } else {
                candidate = Some(id);
                cur = self.links(id).left;
            }
        }
        candidate
    }

    /// First node whose key is strictly greater than the sought key.
    pub(crate) fn upper_bound<T>(
        &self,
        arena: &Arena<T>,
        probe: impl Fn(&T) -> Ordering,
    ) -> Option<NodeId> {
        let mut cur = self.root;
        let mut candidate = None;
        while let Some(id) = cur {
            if probe(arena.resolve(id)) == Ordering::Less {
                candidate = Some(id);
                cur = self.links(id).left;
            } else {
                cur = self.links(id).right;
            }
        }
        candidate
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Finds where `value` would attach, without mutating the tree.
    ///
    /// Under the unique policy an equal key aborts the descent and the
    /// blocking node is returned as the error. Under the non-unique policy
    /// equal keys descend right, so duplicates land after existing equals.
    pub(crate) fn locate<T>(
        &self,
        arena: &Arena<T>,
        cmp: impl Fn(&T, &T) -> Ordering,
        unique: bool,
        value: &T,
    ) -> Result<Placement, NodeId> {
        let mut cur = match self.root {
            Some(root) => root,
            None => return Ok(Placement::Root),
        };
        loop {
            let side = match cmp(value, arena.resolve(cur)) {
                Ordering::Less => Side::Left,
                Ordering::Equal if unique => return Err(cur),
                Ordering::Equal | Ordering::Greater => Side::Right,
            };
            match self.child(cur, side) {
                Some(next) => cur = next,
                None => return Ok(Placement::Under { parent: cur, side }),
            }
        }
    }

    /// Links `node` as a leaf at a placement computed by [`Self::locate`]
    /// and restores the balance invariant.
    ///
    /// The placement must still describe a vacant child slot; the
    /// coordinator guarantees no mutation happens between the two calls.
    pub(crate) fn attach_leaf(&mut self, node: NodeId, placement: Placement) {
        self.ensure_slot(node.slot());
        *self.links_mut(node) = Links::default();
        match placement {
            Placement::Root => {
                self.root = Some(node);
            }
            Placement::Under { parent, side } => {
                self.links_mut(node).parent = Some(parent);
                self.set_child(parent, side, Some(node));
                self.rebalance_after_insert(node);
            }
        }
    }

    /// Bubbles balance factors up from a freshly linked leaf.
    fn rebalance_after_insert(&mut self, node: NodeId) {
        let mut child = node;
        while let Some(parent) = self.links(child).parent {
            let grown = self.side_of(child);
            let bf = self.links(parent).balance
                + match grown {
                    Side::Left => -1,
                    Side::Right => 1,
                };
            match bf {
                // The lighter side caught up; subtree height is unchanged.
                0 => {
                    self.links_mut(parent).balance = 0;
                    break;
                }
                // Height grew by one but the node is still within bounds.
                1 | -1 => {
                    self.links_mut(parent).balance = bf;
                    child = parent;
                }
                // Height invariant violated; one rotation restores the
                // pre-insert subtree height, so bubbling terminates here.
                _ => {
                    self.restore_balance(parent, grown);
                    break;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Splices `node` out of the tree and restores the balance invariant.
    ///
    /// A node with two children is replaced by its in-order successor via
    /// pointer surgery. The value itself never moves: it is linked into
    /// every other index simultaneously, so only this index's links may
    /// change.
    pub(crate) fn unlink(&mut self, node: NodeId) {
        let Links {
            left,
            right,
            parent,
            ..
        } = *self.links(node);

        let start = match (left, right) {
            (None, None) => {
                let at = parent.map(|p| (p, self.side_of(node)));
                self.replace_child(parent, node, None);
                at
            }
            (Some(child), None) | (None, Some(child)) => {
                let at = parent.map(|p| (p, self.side_of(node)));
                self.links_mut(child).parent = parent;
                self.replace_child(parent, node, Some(child));
                at
            }
            (Some(left), Some(right)) => {
                let succ = self.minimum(right);
                let start = if succ == right {
                    // Successor is the node's own right child: it rises in
                    // place, keeping its right subtree.
                    (succ, Side::Right)
                } else {
                    // Detach the successor (a left child with no left
                    // subtree) and hand it the node's right subtree.
                    let succ_parent = self.links(succ).parent.unwrap();
                    let succ_right = self.links(succ).right;
                    self.set_child(succ_parent, Side::Left, succ_right);
                    if let Some(sr) = succ_right {
                        self.links_mut(sr).parent = Some(succ_parent);
                    }
                    self.links_mut(succ).right = Some(right);
                    self.links_mut(right).parent = Some(succ);
                    (succ_parent, Side::Left)
                };
                // The successor takes over the node's position wholesale.
                let node_balance = self.links(node).balance;
                self.links_mut(succ).left = Some(left);
                self.links_mut(left).parent = Some(succ);
                self.links_mut(succ).parent = parent;
                self.links_mut(succ).balance = node_balance;
                self.replace_child(parent, node, Some(succ));
                Some(start)
            }
        };

        if let Some((at, side)) = start {
            self.rebalance_after_remove(at, side);
        }
        *self.links_mut(node) = Links::default();
    }

    /// Bubbles balance factors up after the subtree on `side` of `at`
    /// lost one unit of height.
    fn rebalance_after_remove(&mut self, at: NodeId, side: Side) {
        let mut cur = at;
        let mut shrunk = side;
        loop {
            let bf = self.links(cur).balance
                + match shrunk {
                    Side::Left => 1,
                    Side::Right => -1,
                };
            match bf {
                // The node tilted but its overall height is unchanged, so
                // no ancestor can be affected.
                1 | -1 => {
                    self.links_mut(cur).balance = bf;
                    break;
                }
                // Both sides are now even; the subtree as a whole is one
                // shorter and the loss propagates upward.
                0 => {
                    self.links_mut(cur).balance = 0;
                    match self.links(cur).parent {
                        None => break,
                        Some(parent) => {
                            shrunk = self.side_of(cur);
                            cur = parent;
                        }
                    }
                }
                // Invariant violated on the side that did NOT shrink.
                // Unlike insertion, the rotation may leave this subtree one
                // shorter, in which case the walk continues at the new
                // subtree root's parent.
                _ => {
                    let (new_root, height_shrank) = self.restore_balance(cur, shrunk.opposite());
                    if !height_shrank {
                        break;
                    }
                    match self.links(new_root).parent {
                        None => break,
                        Some(parent) => {
                            shrunk = self.side_of(new_root);
                            cur = parent;
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Rotations
    // ------------------------------------------------------------------

    /// Resolves a ±2 violation at `node`, whose `heavy` side is two taller.
    ///
    /// Returns the node now rooting the subtree and whether the subtree as
    /// a whole lost one unit of height relative to before the rotation.
    fn restore_balance(&mut self, node: NodeId, heavy: Side) -> (NodeId, bool) {
        let tall = self.child(node, heavy).unwrap();
        let tall_bf = self.links(tall).balance;
        let inward = match heavy {
            Side::Right => -1,
            Side::Left => 1,
        };

        if tall_bf != inward {
            // Single rotation: the heavy child leans the same way as its
            // parent (or is even, which only occurs after a removal).
            self.rotate(node, heavy.opposite());
            if tall_bf == 0 {
                let lean = match heavy {
                    Side::Right => 1,
                    Side::Left => -1,
                };
                self.links_mut(node).balance = lean;
                self.links_mut(tall).balance = -lean;
                (tall, false)
            } else {
                self.links_mut(node).balance = 0;
                self.links_mut(tall).balance = 0;
                (tall, true)
            }
        } else {
            // Double rotation: the heavy child leans inward, so its inner
            // child is promoted to subtree root. The promoted node's old
            // lean decides which of the two demoted nodes ends up light.
            let pivot = self.child(tall, heavy.opposite()).unwrap();
            let pivot_bf = self.links(pivot).balance;
            self.rotate(tall, heavy);
            self.rotate(node, heavy.opposite());

            let outward = -inward;
            self.links_mut(node).balance = if pivot_bf == outward { inward } else { 0 };
            self.links_mut(tall).balance = if pivot_bf == inward { outward } else { 0 };
            self.links_mut(pivot).balance = 0;
            (pivot, true)
        }
    }

    /// Test-only corruption hook for exercising the invariant checker.
    #[cfg(test)]
    pub(crate) fn force_balance(&mut self, id: NodeId, balance: i8) {
        self.links_mut(id).balance = balance;
    }

    /// Rotates `node` toward `dir`; its child on the opposite side rises.
    ///
    /// Balance factors are the caller's responsibility.
    fn rotate(&mut self, node: NodeId, dir: Side) {
        let rising = self.child(node, dir.opposite()).unwrap();
        let transfer = self.child(rising, dir);
        let parent = self.links(node).parent;

        self.set_child(node, dir.opposite(), transfer);
        if let Some(t) = transfer {
            self.links_mut(t).parent = Some(node);
        }
        self.set_child(rising, dir, Some(node));
        self.links_mut(node).parent = Some(rising);
        self.links_mut(rising).parent = parent;
        self.replace_child(parent, node, Some(rising));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn cmp(a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }

    fn insert(set: &mut LinkSet, arena: &mut Arena<i32>, value: i32) -> NodeId {
        let placement = set.locate(arena, &cmp, false, &value).unwrap();
        let id = arena.insert(value);
        set.ensure_slot(id.slot());
        set.attach_leaf(id, placement);
        id
    }

    fn inorder(set: &LinkSet, arena: &Arena<i32>) -> Vec<i32> {
        let mut out = Vec::new();
        let mut cur = set.first();
        while let Some(id) = cur {
            out.push(*arena.resolve(id));
            cur = set.successor(id);
        }
        out
    }

    /// Recomputes heights bottom-up and checks stored balance factors.
    fn check_balanced(set: &LinkSet, arena: &Arena<i32>) {
        fn height(set: &LinkSet, arena: &Arena<i32>, node: Option<NodeId>) -> i32 {
            match node {
                None => -1,
                Some(id) => {
                    let lh = height(set, arena, set.child(id, Side::Left));
                    let rh = height(set, arena, set.child(id, Side::Right));
                    assert_eq!(
                        i32::from(set.balance(id)),
                        rh - lh,
                        "balance factor mismatch at {}",
                        arena.resolve(id)
                    );
                    assert!((rh - lh).abs() <= 1, "unbalanced at {}", arena.resolve(id));
                    lh.max(rh) + 1
                }
            }
        }
        height(set, arena, set.root());
    }

    fn build(values: &[i32]) -> (LinkSet, Arena<i32>) {
        let mut set = LinkSet::new();
        let mut arena = Arena::new();
        for &v in values {
            insert(&mut set, &mut arena, v);
            check_balanced(&set, &arena);
        }
        (set, arena)
    }

    #[test]
    fn insert_produces_sorted_order() {
        let (set, arena) = build(&[2, 1, 3, 4, 0]);
        assert_eq!(inorder(&set, &arena), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn single_rotations() {
        // Ascending forces left rotations, descending forces right ones.
        let (set, arena) = build(&[1, 2, 3]);
        assert_eq!(inorder(&set, &arena), vec![1, 2, 3]);

        let (set, arena) = build(&[3, 2, 1]);
        assert_eq!(inorder(&set, &arena), vec![1, 2, 3]);
    }

    #[test]
    fn double_rotations() {
        // Zig-zag shapes force double rotations in both directions.
        let (set, arena) = build(&[1, 3, 2]);
        assert_eq!(inorder(&set, &arena), vec![1, 2, 3]);

        let (set, arena) = build(&[3, 1, 2]);
        assert_eq!(inorder(&set, &arena), vec![1, 2, 3]);
    }

    #[test]
    fn sorted_insert_stays_logarithmic() {
        let (set, arena) = build(&[1, 2, 3, 4, 5, 6, 7]);
        // A perfectly filled tree of seven nodes has height two.
        fn depth(set: &LinkSet, node: Option<NodeId>) -> i32 {
            match node {
                None => -1,
                Some(id) => depth(set, set.child(id, Side::Left))
                    .max(depth(set, set.child(id, Side::Right)))
                    .saturating_add(1),
            }
        }
        assert_eq!(depth(&set, set.root()), 2);
        assert_eq!(inorder(&set, &arena), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn duplicate_keys_keep_arrival_order() {
        let mut set = LinkSet::new();
        let mut arena = Arena::new();
        let first = insert(&mut set, &mut arena, 5);
        insert(&mut set, &mut arena, 3);
        let second = insert(&mut set, &mut arena, 5);

        assert_eq!(inorder(&set, &arena), vec![3, 5, 5]);
        // The earlier duplicate sorts before the later one.
        let lb = set.lower_bound(&arena, |v| 5.cmp(v)).unwrap();
        assert_eq!(lb, first);
        assert_eq!(set.successor(lb), Some(second));
    }

    #[test]
    fn unique_locate_reports_conflict() {
        let (set, arena) = build(&[1, 2, 3]);
        let conflict = set.locate(&arena, &cmp, true, &2).unwrap_err();
        assert_eq!(*arena.resolve(conflict), 2);
    }

    #[test]
    fn bounds() {
        let (set, arena) = build(&[10, 20, 30, 40]);

        let lb = set.lower_bound(&arena, |v| 20.cmp(v)).unwrap();
        assert_eq!(*arena.resolve(lb), 20);

        let ub = set.upper_bound(&arena, |v| 20.cmp(v)).unwrap();
        assert_eq!(*arena.resolve(ub), 30);

        assert!(set.lower_bound(&arena, |v| 41.cmp(v)).is_none());
        let lb = set.lower_bound(&arena, |v| 5.cmp(v)).unwrap();
        assert_eq!(*arena.resolve(lb), 10);
    }

    #[test]
    fn unlink_leaf_and_inner_nodes() {
        let values = [8, 4, 12, 2, 6, 10, 14, 1];
        let (mut set, mut arena) = build(&values);

        for &v in &[1, 12, 8, 4] {
            let id = set.find(&arena, |x| v.cmp(x)).unwrap();
            set.unlink(id);
            arena.remove(id);
            check_balanced(&set, &arena);
        }
        assert_eq!(inorder(&set, &arena), vec![2, 6, 10, 14]);
    }

    #[test]
    fn unlink_root_of_left_heavy_tree() {
        let (mut set, mut arena) = build(&[2, 1, 3, 0]);
        // Root is 2 with a taller left side.
        let root = set.root().unwrap();
        assert_eq!(*arena.resolve(root), 2);
        set.unlink(root);
        arena.remove(root);

        check_balanced(&set, &arena);
        assert_eq!(inorder(&set, &arena), vec![0, 1, 3]);
        assert!(set.find(&arena, |v| 0.cmp(v)).is_some());
        assert!(set.find(&arena, |v| 3.cmp(v)).is_some());
    }

    #[test]
    fn deletion_rebalance_continues_past_rotation() {
        // Fibonacci-shaped tree: every interior node left-heavy. Removing
        // the shallow rightmost leaf triggers a rotation whose subtree
        // loses height, which forces a second rotation at the root.
        let (mut set, mut arena) = build(&[8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1]);
        let id = set.find(&arena, |v| 12.cmp(v)).unwrap();
        set.unlink(id);
        arena.remove(id);
        check_balanced(&set, &arena);
        assert_eq!(
            inorder(&set, &arena),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]
        );
    }

    #[test]
    fn drain_in_random_order() {
        let values = [6, 3, 9, 1, 5, 7, 11, 0, 2, 4, 8, 10, 12];
        let (mut set, mut arena) = build(&values);
        let drain = [5, 0, 12, 6, 3, 9, 1, 11, 7, 2, 10, 4, 8];
        let mut remaining: Vec<i32> = values.to_vec();
        for &v in &drain {
            let id = set.find(&arena, |x| v.cmp(x)).unwrap();
            set.unlink(id);
            arena.remove(id);
            remaining.retain(|&x| x != v);
            remaining.sort_unstable();
            check_balanced(&set, &arena);
            assert_eq!(inorder(&set, &arena), remaining);
        }
        assert!(set.root().is_none());
    }

    #[test]
    fn successor_predecessor_roundtrip() {
        let (set, arena) = build(&[4, 2, 6, 1, 3, 5, 7]);
        let mut cur = set.first();
        let mut walked = Vec::new();
        while let Some(id) = cur {
            walked.push(id);
            cur = set.successor(id);
        }
        let mut back = Vec::new();
        let mut cur = set.last();
        while let Some(id) = cur {
            back.push(id);
            cur = set.predecessor(id);
        }
        back.reverse();
        assert_eq!(walked, back);
        assert_eq!(walked.len(), arena.len());
    }
}
