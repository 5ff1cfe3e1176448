use index_vec::{IndexVec, index_vec};

use crate::scene::PrimId;

use super::{Link, LinkId, Node, NodeId};

/// Pooled storage for one tree instance.
///
/// Tree nodes are handed out as adjacent sibling pairs from a bump cursor;
/// object links come from a free list so leaf chains can be recycled while
/// the build narrows boxes. Neither pool ever reallocates after `reserve`,
/// keeping the general-purpose allocator out of the build recursion.
pub(super) struct NodeArena {
    nodes: IndexVec<NodeId, Node>,
    next_node: usize,
    links: IndexVec<LinkId, Link>,
    free_link: Option<LinkId>,
}

impl NodeArena {
    pub fn reserve(node_capacity: usize, link_capacity: usize) -> NodeArena {
        let mut arena = NodeArena {
            nodes: index_vec![Node::Leaf { head: None }; node_capacity],
            next_node: 0,
            links: index_vec![
                Link {
                    prim: PrimId::from_usize(0),
                    next: None,
                };
                link_capacity
            ],
            free_link: None,
        };
        arena.reset();
        arena
    }

    /// Returns both pools to fully free state without touching capacity.
    pub fn reset(&mut self) {
        self.next_node = 0;
        for node in self.nodes.iter_mut() {
            *node = Node::Leaf { head: None };
        }

        let count = self.links.len();
        for (i, link) in self.links.iter_mut().enumerate() {
            link.next = if i + 1 < count {
                Some(LinkId::from_usize(i + 1))
            } else {
                None
            };
        }
        self.free_link = if count > 0 { Some(LinkId::from_usize(0)) } else { None };
    }

    /// Allocates two adjacent fresh leaf nodes and returns the left one;
    /// the right sibling is `id + 1`. `None` once fewer than two slots remain.
    pub fn alloc_node_pair(&mut self) -> Option<NodeId> {
        if self.next_node + 2 > self.nodes.len() {
            return None;
        }
        let id = NodeId::from_usize(self.next_node);
        self.nodes[id] = Node::Leaf { head: None };
        self.nodes[id + 1] = Node::Leaf { head: None };
        self.next_node += 2;
        Some(id)
    }

    pub fn alloc_link(&mut self, prim: PrimId) -> Option<LinkId> {
        let id = self.free_link?;
        self.free_link = self.links[id].next;
        self.links[id] = Link { prim, next: None };
        Some(id)
    }

    /// Pushes a whole chain back onto the free list in O(chain length).
    pub fn release_chain(&mut self, head: LinkId) {
        let mut tail = head;
        while let Some(next) = self.links[tail].next {
            tail = next;
        }
        self.links[tail].next = self.free_link;
        self.free_link = Some(head);
    }

    /// Prepends an allocated link to a leaf's object list.
    pub fn push_front(&mut self, node: NodeId, link: LinkId) {
        match self.nodes[node] {
            Node::Leaf { head } => {
                self.links[link].next = head;
                self.nodes[node] = Node::Leaf { head: Some(link) };
            }
            Node::Interior { .. } => unreachable!("object links can only be attached to leaves"),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id]
    }

    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_capacity(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};

    #[test]
    fn node_pairs_are_adjacent_and_bounded() {
        let mut arena = NodeArena::reserve(4, 0);

        let_assert!(Some(first) = arena.alloc_node_pair());
        let_assert!(Some(second) = arena.alloc_node_pair());
        assert!(second == first + 2);

        // Capacity is spent; further requests must fail deterministically.
        assert!(arena.alloc_node_pair() == None);
        assert!(arena.alloc_node_pair() == None);
    }

    #[test]
    fn odd_capacity_leaves_last_slot_unused() {
        let mut arena = NodeArena::reserve(3, 0);
        assert!(arena.alloc_node_pair().is_some());
        assert!(arena.alloc_node_pair() == None);
    }

    #[test]
    fn links_exhaust_and_recycle() {
        let mut arena = NodeArena::reserve(2, 3);
        let node = arena.alloc_node_pair().unwrap();

        for i in 0..3 {
            let_assert!(Some(link) = arena.alloc_link(PrimId::from_usize(i)));
            arena.push_front(node, link);
        }
        assert!(arena.alloc_link(PrimId::from_usize(9)) == None);

        let_assert!(Node::Leaf { head: Some(head) } = *arena.node(node));
        arena.release_chain(head);

        // The full chain is usable again
        assert!(arena.alloc_link(PrimId::from_usize(0)).is_some());
        assert!(arena.alloc_link(PrimId::from_usize(1)).is_some());
        assert!(arena.alloc_link(PrimId::from_usize(2)).is_some());
        assert!(arena.alloc_link(PrimId::from_usize(3)) == None);
    }

    #[test]
    fn push_front_builds_lifo_chain() {
        let mut arena = NodeArena::reserve(2, 4);
        let node = arena.alloc_node_pair().unwrap();

        for i in 0..3 {
            let link = arena.alloc_link(PrimId::from_usize(i)).unwrap();
            arena.push_front(node, link);
        }

        let_assert!(Node::Leaf { head: Some(mut cursor) } = *arena.node(node));
        let mut prims = vec![arena.link(cursor).prim.index()];
        while let Some(next) = arena.link(cursor).next {
            cursor = next;
            prims.push(arena.link(cursor).prim.index());
        }
        assert!(prims == vec![2, 1, 0]);
    }

    #[test]
    fn reset_restores_full_capacity() {
        let mut arena = NodeArena::reserve(2, 2);
        arena.alloc_node_pair().unwrap();
        arena.alloc_link(PrimId::from_usize(0)).unwrap();
        arena.alloc_link(PrimId::from_usize(1)).unwrap();
        assert!(arena.alloc_node_pair() == None);
        assert!(arena.alloc_link(PrimId::from_usize(2)) == None);

        arena.reset();

        assert!(arena.alloc_node_pair().is_some());
        assert!(arena.alloc_link(PrimId::from_usize(0)).is_some());
        assert!(arena.alloc_link(PrimId::from_usize(1)).is_some());
    }
}
