use std::fmt::Display;

use super::{KdTree, Node, NodeId};

/// Shape summary of a built tree, for logging and sanity checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStatistics {
    pub interior_nodes: usize,
    pub leaf_nodes: usize,
    /// Levels below the root; a root-only tree has depth 0.
    pub max_depth: usize,
    /// Object links over all leaves; larger than the primitive count when
    /// primitives straddle split planes.
    pub total_links: usize,
    pub largest_leaf: usize,
}

impl Display for TreeStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} interior / {} leaf nodes, depth {}, {} links, largest leaf {}",
            self.interior_nodes, self.leaf_nodes, self.max_depth, self.total_links, self.largest_leaf
        )
    }
}

impl KdTree {
    pub fn statistics(&self) -> TreeStatistics {
        let mut stats = TreeStatistics::default();
        self.collect(self.root, 0, &mut stats);
        stats
    }

    fn collect(&self, node: NodeId, depth: usize, stats: &mut TreeStatistics) {
        stats.max_depth = stats.max_depth.max(depth);
        match *self.arena.node(node) {
            Node::Leaf { head } => {
                stats.leaf_nodes += 1;
                let mut links = 0;
                let mut cursor = head;
                while let Some(link_id) = cursor {
                    links += 1;
                    cursor = self.arena.link(link_id).next;
                }
                stats.total_links += links;
                stats.largest_leaf = stats.largest_leaf.max(links);
            }
            Node::Interior { left, .. } => {
                stats.interior_nodes += 1;
                self.collect(left, depth + 1, stats);
                self.collect(left + 1, depth + 1, stats);
            }
        }
    }
}
