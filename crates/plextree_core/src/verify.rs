//! Tree-shape invariant checker.
//!
//! Separately invocable verification for tests and fuzzing. Nothing here
//! runs as part of normal operations: shape corruption is unreachable
//! through the public contract, and the checker exists to prove exactly
//! that. All walks are iterative with explicit stacks, so deep (corrupt)
//! trees cannot overflow the call stack before being diagnosed.

use crate::arena::NodeId;
use crate::error::{CoreError, CoreResult};
use crate::index::{IndexId, Side};
use crate::set::MultiIndexSet;
use std::cmp::Ordering;

impl<T: 'static> MultiIndexSet<T> {
    /// Verifies every structural invariant of every index.
    ///
    /// Checks, per index: parent-pointer consistency, absence of cycles and
    /// double-links, stored balance factors against independently recomputed
    /// subtree heights (and that every factor is in `{-1, 0, +1}`), sorted
    /// order under the index's comparator (strict for unique indexes), and
    /// that the index reaches exactly the pool's live node set.
    ///
    /// Intended for test suites and fuzz harnesses; any error indicates a
    /// bug in the engine, not misuse by the caller.
    pub fn check_invariants(&self) -> CoreResult<()> {
        for i in 0..self.tables.len() {
            self.check_index(IndexId::new(i as u32))?;
        }
        Ok(())
    }

    /// Length of the longest root-to-leaf path in `index`, in links.
    ///
    /// Diagnostic: an empty or single-element index has height zero. By the
    /// balance invariant this stays within ~1.44·log2(n).
    #[must_use]
    pub fn height(&self, index: IndexId) -> usize {
        let table = &self.tables[index.as_usize()];
        let root = match table.root() {
            Some(root) => root,
            None => return 0,
        };
        let mut max_depth = 0usize;
        let mut stack = vec![(root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for side in [Side::Left, Side::Right] {
                if let Some(child) = table.child(node, side) {
                    stack.push((child, depth + 1));
                }
            }
        }
        max_depth
    }

    fn check_index(&self, index: IndexId) -> CoreResult<()> {
        let table = &self.tables[index.as_usize()];
        let name = self.specs[index.as_usize()].name();
        let fail = |message: String| Err(CoreError::invariant_violation(name, message));

        let root = match table.root() {
            Some(root) => root,
            None => {
                if self.arena.is_empty() {
                    return Ok(());
                }
                return fail(format!(
                    "index is empty but the pool holds {} nodes",
                    self.arena.len()
                ));
            }
        };
        if table.parent(root).is_some() {
            return fail(format!("root {root:?} has a parent link"));
        }

        // Structural pass: parent pointers, cycles, double links, reach.
        let mut seen = vec![false; self.arena.slot_count()];
        let mut reached = 0usize;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.arena.get(node).is_none() {
                return fail(format!("link to freed node {node:?}"));
            }
            if std::mem::replace(&mut seen[node.slot()], true) {
                return fail(format!("node {node:?} is reached twice"));
            }
            reached += 1;
            for side in [Side::Left, Side::Right] {
                if let Some(child) = table.child(node, side) {
                    if table.parent(child) != Some(node) {
                        return fail(format!(
                            "child {child:?} does not point back at parent {node:?}"
                        ));
                    }
                    stack.push(child);
                }
            }
        }
        if reached != self.arena.len() {
            return fail(format!(
                "index reaches {reached} of {} pool nodes",
                self.arena.len()
            ));
        }
        for (id, _) in self.arena.iter() {
            if !seen[id.slot()] {
                return fail(format!("pool node {id:?} is not linked into the index"));
            }
        }

        // Height pass: recompute bottom-up and compare with stored factors.
        let mut heights = vec![-1i32; self.arena.slot_count()];
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if !expanded {
                stack.push((node, true));
                for side in [Side::Left, Side::Right] {
                    if let Some(child) = table.child(node, side) {
                        stack.push((child, false));
                    }
                }
                continue;
            }
            let left = table
                .child(node, Side::Left)
                .map_or(-1, |c| heights[c.slot()]);
            let right = table
                .child(node, Side::Right)
                .map_or(-1, |c| heights[c.slot()]);
            let factor = right - left;
            if factor.abs() > 1 {
                return fail(format!(
                    "node {node:?} has subtree heights {left} and {right}"
                ));
            }
            if i32::from(table.balance(node)) != factor {
                return fail(format!(
                    "node {node:?} stores balance {} but heights give {factor}",
                    table.balance(node)
                ));
            }
            heights[node.slot()] = left.max(right) + 1;
        }

        // Order pass: in-order traversal must be sorted, strictly so for a
        // unique index. The structural pass ruled out cycles, so the
        // successor walk terminates.
        let spec = &self.specs[index.as_usize()];
        let mut prev: Option<NodeId> = None;
        let mut cur = table.first();
        while let Some(node) = cur {
            if let Some(p) = prev {
                match spec.compare(self.arena.resolve(p), self.arena.resolve(node)) {
                    Ordering::Greater => {
                        return fail(format!("nodes {p:?} and {node:?} are out of order"));
                    }
                    Ordering::Equal if spec.unique() => {
                        return fail(format!(
                            "unique index holds equal keys at {p:?} and {node:?}"
                        ));
                    }
                    _ => {}
                }
            }
            prev = Some(node);
            cur = table.successor(node);
        }

        Ok(())
    }
}
