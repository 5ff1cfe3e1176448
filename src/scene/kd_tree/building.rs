use index_vec::IndexVec;

use crate::geometry::{Aabb, FloatType};
use crate::scene::{PrimId, Primitive};

use super::{BuildError, KdTree, Node, NodeArena, NodeId, split_list::SplitList};

/// Stop recursing once a side holds this few primitives.
const MIN_SPLIT_PRIMS: usize = 2;

/// Link slots reserved per primitive. Split planes can be shared between
/// leaves, so a primitive may sit in several chains at once.
const LINKS_PER_PRIM: usize = 10;

/// Candidate slots per primitive; a triangle contributes at most 3 distinct
/// coordinates per axis.
const CANDIDATES_PER_PRIM: usize = 3;

/// Deeper trees would demand an absurd node pool; the capacity formula is
/// exponential in depth.
const MAX_TREE_DEPTH: usize = 24;

#[derive(Copy, Clone)]
struct WorkEntry {
    prim: PrimId,
    /// Extent of the primitive on the current split axis.
    min: FloatType,
    max: FloatType,
    /// Cleared once the primitive has been proven to miss the right half at
    /// an earlier (smaller) plane; later planes skip its right-side test.
    right: bool,
}

impl KdTree {
    /// Builds the index over `primitives` covering `bounds`, subdividing at
    /// most `max_depth` levels below the root.
    ///
    /// Pool exhaustion fails the whole build; a partially subdivided tree is
    /// never returned.
    pub fn build(
        primitives: &IndexVec<PrimId, Primitive>,
        bounds: Aabb,
        max_depth: usize,
    ) -> Result<KdTree, BuildError> {
        if max_depth > MAX_TREE_DEPTH {
            return Err(BuildError::DepthOutOfRange {
                requested: max_depth,
                max: MAX_TREE_DEPTH,
            });
        }

        // Every node at depth d can spend one sibling pair on depth d+1,
        // plus one pair up front for the root and its unused sibling.
        let node_capacity = 2 + (0..=max_depth).map(|d| 2usize << d).sum::<usize>();
        let link_capacity = primitives.len() * LINKS_PER_PRIM;

        let mut arena = NodeArena::reserve(node_capacity, link_capacity);
        let root = arena
            .alloc_node_pair()
            .ok_or(BuildError::NodePoolExhausted)?;

        for (id, _) in primitives.iter_enumerated() {
            add_primitive(&mut arena, root, id, link_capacity)?;
        }

        let mut builder = Builder {
            split_list: SplitList::reserve(primitives.len() * CANDIDATES_PER_PRIM),
            work: Vec::with_capacity(primitives.len()),
            max_depth,
            link_capacity,
        };
        builder.subdivide(&mut arena, primitives, root, &bounds, 0, primitives.len())?;

        let tree = KdTree {
            arena,
            root,
            bounds,
        };
        log::debug!(
            "kd-tree built over {} primitives: {}",
            primitives.len(),
            tree.statistics()
        );
        Ok(tree)
    }
}

fn add_primitive(
    arena: &mut NodeArena,
    node: NodeId,
    prim: PrimId,
    link_capacity: usize,
) -> Result<(), BuildError> {
    let link = arena
        .alloc_link(prim)
        .ok_or(BuildError::LinkPoolExhausted {
            capacity: link_capacity,
        })?;
    arena.push_front(node, link);
    Ok(())
}

/// Scratch state shared by the whole recursion; the work buffer and the
/// candidate list are consumed before either child recursion starts, so both
/// can be reused at every level.
struct Builder {
    split_list: SplitList,
    work: Vec<WorkEntry>,
    max_depth: usize,
    link_capacity: usize,
}

impl Builder {
    fn subdivide(
        &mut self,
        arena: &mut NodeArena,
        primitives: &IndexVec<PrimId, Primitive>,
        node: NodeId,
        aabb: &Aabb,
        depth: usize,
        num_prims: usize,
    ) -> Result<(), BuildError> {
        self.split_list.clear();

        let axis = aabb.longest_axis();
        let a = axis.index();
        let axis_min = aabb.min[a];
        let axis_max = aabb.max[a];

        // Gather the node's primitives and enumerate candidate planes within
        // the node's extent.
        self.work.clear();
        let head = match *arena.node(node) {
            Node::Leaf { head } => head,
            Node::Interior { .. } => unreachable!("subdivide starts from a leaf"),
        };
        let mut cursor = head;
        while let Some(link_id) = cursor {
            let link = *arena.link(link_id);
            let prim = &primitives[link.prim];
            let (min, max) = prim.axis_range(axis);
            self.work.push(WorkEntry {
                prim: link.prim,
                min,
                max,
                right: true,
            });
            for split in prim.split_candidates(axis) {
                if split >= axis_min && split <= axis_max {
                    self.split_list.insert(split);
                }
            }
            cursor = link.next;
        }

        // Sweep the planes in increasing order, counting how many primitives
        // actually overlap each shrunk half.
        let mut l_aabb = aabb.clone();
        let mut r_aabb = aabb.clone();
        let mut candidate = self.split_list.head();
        while let Some(id) = candidate {
            let split = self.split_list.position(id);
            l_aabb.max[a] = split;
            r_aabb.min[a] = split;

            let mut l_count = 0;
            let mut r_count = 0;
            for w in &mut self.work {
                if !w.right {
                    l_count += 1;
                    continue;
                }
                let prim = &primitives[w.prim];
                if w.min <= split && w.max >= axis_min && prim.overlaps_box(&l_aabb) {
                    l_count += 1;
                }
                if w.min <= axis_max && w.max >= split {
                    if prim.overlaps_box(&r_aabb) {
                        r_count += 1;
                    } else {
                        w.right = false;
                    }
                }
            }
            self.split_list.set_counts(id, l_count, r_count);
            candidate = self.split_list.next(id);
        }

        // Surface area heuristic: pick the cheapest plane. A degenerate node
        // box produces NaN costs which never win, leaving the node a leaf.
        let inv_sa = 1.0 / aabb.surface_area();
        let mut best_cost = FloatType::INFINITY;
        let mut best_pos = 0.0;
        candidate = self.split_list.head();
        while let Some(id) = candidate {
            let split = self.split_list.position(id);
            l_aabb.max[a] = split;
            r_aabb.min[a] = split;
            let (l_count, r_count) = self.split_list.counts(id);
            let cost = inv_sa
                * (l_aabb.surface_area() * l_count as FloatType
                    + r_aabb.surface_area() * r_count as FloatType);
            if cost < best_cost {
                best_cost = cost;
                best_pos = split;
            }
            candidate = self.split_list.next(id);
        }

        // Splitting must beat leaving all primitives in one leaf.
        let leaf_cost = num_prims as FloatType;
        if best_cost >= leaf_cost {
            return Ok(());
        }

        // Commit: recycle the node's list, partition into a fresh child pair.
        if let Some(head) = head {
            arena.release_chain(head);
        }
        let children = arena
            .alloc_node_pair()
            .ok_or(BuildError::NodePoolExhausted)?;
        *arena.node_mut(node) = Node::Interior {
            axis,
            split: best_pos,
            left: children,
        };

        l_aabb.max[a] = best_pos;
        r_aabb.min[a] = best_pos;
        let mut l_count = 0;
        let mut r_count = 0;
        for i in 0..self.work.len() {
            let w = self.work[i];
            let prim = &primitives[w.prim];
            if w.min <= best_pos && w.max >= axis_min && prim.overlaps_box(&l_aabb) {
                add_primitive(arena, children, w.prim, self.link_capacity)?;
                l_count += 1;
            }
            if w.min <= axis_max && w.max >= best_pos && prim.overlaps_box(&r_aabb) {
                add_primitive(arena, children + 1, w.prim, self.link_capacity)?;
                r_count += 1;
            }
        }

        if depth < self.max_depth {
            if l_count > MIN_SPLIT_PRIMS {
                self.subdivide(arena, primitives, children, &l_aabb, depth + 1, l_count)?;
            }
            if r_count > MIN_SPLIT_PRIMS {
                self.subdivide(arena, primitives, children + 1, &r_aabb, depth + 1, r_count)?;
            }
        }
        Ok(())
    }
}
