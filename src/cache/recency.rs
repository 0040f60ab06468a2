//! Recency List Module
//!
//! Index-arena doubly linked list ordering cache entries by last use.

/// Link value marking the end of the list or an unlinked slot.
const NIL: usize = usize::MAX;

struct Node<K, V> {
    /// `None` while the slot sits on the free list.
    entry: Option<(K, V)>,
    /// Toward the front (more recently used).
    prev: usize,
    /// Toward the back (less recently used).
    next: usize,
}

// == Recency List ==
/// Orders entries by access time.
///
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Every entry is addressed by the slot index returned from `push_front`, so
/// moving, removing and evicting are all O(1). Freed slots are reused.
pub(crate) struct RecencyList<K, V> {
    nodes: Vec<Node<K, V>>,
    head: usize,
    tail: usize,
    free: Vec<usize>,
    len: usize,
}

impl<K, V> RecencyList<K, V> {
    // == Constructor ==
    /// Creates an empty list with room for `capacity` entries.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            free: Vec::new(),
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts an entry as most recently used and returns its slot.
    pub(crate) fn push_front(&mut self, key: K, value: V) -> usize {
        let node = Node {
            entry: Some((key, value)),
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        idx
    }

    // == Touch ==
    /// Marks a slot as most recently used.
    pub(crate) fn touch(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    // == Remove ==
    /// Removes a slot and returns its entry.
    ///
    /// Returns None if the slot is not occupied.
    pub(crate) fn remove(&mut self, idx: usize) -> Option<(K, V)> {
        let entry = self.nodes.get_mut(idx)?.entry.take()?;
        self.unlink(idx);
        self.free.push(idx);
        self.len -= 1;
        Some(entry)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub(crate) fn pop_back(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        self.remove(self.tail)
    }

    // == Peek Back ==
    /// Returns the least recently used entry without removing it.
    #[cfg(test)]
    pub(crate) fn peek_back(&self) -> Option<(&K, &V)> {
        self.entry(self.tail)
    }

    pub(crate) fn entry(&self, idx: usize) -> Option<(&K, &V)> {
        self.nodes
            .get(idx)?
            .entry
            .as_ref()
            .map(|(key, value)| (key, value))
    }

    pub(crate) fn value_mut(&mut self, idx: usize) -> Option<&mut V> {
        self.nodes
            .get_mut(idx)?
            .entry
            .as_mut()
            .map(|(_, value)| value)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every entry and releases the arena.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    /// Iterates front (most recent) to back (least recent).
    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = old_head;
        if old_head != NIL {
            self.nodes[old_head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }
}

// == Iterator ==
pub(crate) struct Iter<'a, K, V> {
    list: &'a RecencyList<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = &self.list.nodes[self.cursor];
        self.cursor = node.next;
        node.entry.as_ref().map(|(key, value)| (key, value))
    }
}
