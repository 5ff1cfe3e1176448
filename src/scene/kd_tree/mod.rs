mod arena;
mod building;
mod split_list;
mod statistics;
mod traversal;

use thiserror::Error;

use crate::geometry::{Aabb, Axis, FloatType};

use super::PrimId;
use arena::NodeArena;

pub use statistics::TreeStatistics;

index_vec::define_index_type! {
    struct NodeId = u32;
}

index_vec::define_index_type! {
    struct LinkId = u32;
}

/// A kd-tree node is either a leaf holding a chain of object links or an
/// interior node with a split plane. Children are allocated as an adjacent
/// pair, so only the left child is stored; `right = left + 1`.
#[derive(Copy, Clone, Debug)]
enum Node {
    Leaf {
        head: Option<LinkId>,
    },
    Interior {
        axis: Axis,
        split: FloatType,
        left: NodeId,
    },
}

/// One entry of a leaf's object list, drawn from the arena's free list.
#[derive(Copy, Clone, Debug)]
struct Link {
    prim: PrimId,
    next: Option<LinkId>,
}

/// Spatial index over the scene's primitives.
///
/// Built once per primitive set with [`KdTree::build`]; read-only afterwards
/// and therefore safe to query from many threads at once. Geometry changes
/// require a full rebuild.
pub struct KdTree {
    arena: NodeArena,
    root: NodeId,
    bounds: Aabb,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("kd-tree node pool exhausted while subdividing")]
    NodePoolExhausted,

    #[error("kd-tree object link pool exhausted ({capacity} links reserved)")]
    LinkPoolExhausted { capacity: usize },

    #[error("kd-tree depth {requested} exceeds the supported maximum of {max}")]
    DepthOutOfRange { requested: usize, max: usize },
}

impl KdTree {
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }
}

#[cfg(test)]
impl KdTree {
    /// Checks the structural invariants of the tree: every reachable node is
    /// referenced exactly once, leaf chains terminate and reference valid
    /// primitives, interior children are in bounds.
    pub(crate) fn validate(&self, prim_count: usize) {
        use assert2::assert;

        let mut visited = vec![false; self.arena.node_capacity()];
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            assert!(node_id.index() < self.arena.node_capacity());
            assert!(!visited[node_id.index()], "node referenced twice");
            visited[node_id.index()] = true;

            match *self.arena.node(node_id) {
                Node::Leaf { head } => {
                    let mut cursor = head;
                    let mut steps = 0usize;
                    while let Some(link_id) = cursor {
                        let link = self.arena.link(link_id);
                        assert!(link.prim.index() < prim_count);
                        steps += 1;
                        assert!(steps <= self.arena.link_capacity(), "link chain cycles");
                        cursor = link.next;
                    }
                }
                Node::Interior { left, .. } => {
                    stack.push(left);
                    stack.push(left + 1);
                }
            }
        }
    }
}
