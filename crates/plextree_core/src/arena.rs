//! Generational node pool.
//!
//! Every element of a multi-index set lives in exactly one arena slot; the
//! per-index link sets refer to slots by [`NodeId`] and never own the value.
//! Freed slots are recycled through an intrusive free list, and each slot
//! carries a generation counter that is bumped on free, so a handle held
//! across an erase can never silently alias a recycled slot.

use std::fmt;

/// Stable handle to a node in the pool.
///
/// A `NodeId` stays valid until the node it names is erased. Using it after
/// that is a contract violation detected by [`Arena::resolve`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

impl NodeId {
    /// Returns the slot index within the pool.
    #[inline]
    #[must_use]
    pub(crate) const fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.slot, self.generation)
    }
}

enum Slot<T> {
    Occupied { value: T, generation: u32 },
    Vacant { next_free: Option<u32>, generation: u32 },
}

/// Pool of values addressed by generational handles.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Creates an empty pool.
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of live values.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// True if the pool holds no live values.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated, live or vacant.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Stores a value, reusing a vacant slot when one exists.
    pub(crate) fn insert(&mut self, value: T) -> NodeId {
        self.len += 1;
        match self.free_head {
            Some(slot) => {
                let generation = match self.slots[slot as usize] {
                    Slot::Vacant {
                        next_free,
                        generation,
                    } => {
                        self.free_head = next_free;
                        generation
                    }
                    Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
                };
                self.slots[slot as usize] = Slot::Occupied { value, generation };
                NodeId { slot, generation }
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot::Occupied {
                    value,
                    generation: 0,
                });
                NodeId {
                    slot,
                    generation: 0,
                }
            }
        }
    }

    /// Removes a value, returning it and retiring the handle's generation.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale — the slot was already freed or recycled.
    pub(crate) fn remove(&mut self, id: NodeId) -> T {
        assert!(self.contains(id), "stale node handle: {id:?}");
        let next = Slot::Vacant {
            next_free: self.free_head,
            generation: id.generation.wrapping_add(1),
        };
        let old = std::mem::replace(&mut self.slots[id.slot()], next);
        self.free_head = Some(id.slot);
        self.len -= 1;
        match old {
            Slot::Occupied { value, .. } => value,
            Slot::Vacant { .. } => unreachable!("contains() checked occupancy"),
        }
    }

    /// True if `id` names a live value.
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        matches!(
            self.slots.get(id.slot()),
            Some(Slot::Occupied { generation, .. }) if *generation == id.generation
        )
    }

    /// Returns the value named by `id`, or `None` for a stale handle.
    pub(crate) fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.slot()) {
            Some(Slot::Occupied { value, generation }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Mutable access to the value named by `id`.
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.slot()) {
            Some(Slot::Occupied { value, generation }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Returns the value named by `id`, failing fast on a stale handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a live value. Dereferencing an erased
    /// cursor is a precondition violation, not a recoverable error.
    pub(crate) fn resolve(&self, id: NodeId) -> &T {
        self.get(id)
            .unwrap_or_else(|| panic!("stale node handle: {id:?}"))
    }

    /// Drops every value and forgets all handles.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.len = 0;
    }

    /// Iterates live slots in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied { value, generation } => Some((
                    NodeId {
                        slot: slot as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Vacant { .. } => None,
            })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
