use assert2::let_assert;
use index_vec::{IndexVec, index_vec};

use crate::geometry::FloatType;

index_vec::define_index_type! {
    pub(super) struct CandidateId = u32;
}

#[derive(Copy, Clone, Debug)]
struct Candidate {
    position: FloatType,
    left_count: usize,
    right_count: usize,
    next: Option<CandidateId>,
}

/// Sorted, duplicate-free list of candidate split positions with per-plane
/// left/right primitive counts.
///
/// Backed by a pooled free list so one subdivision step can fill it and the
/// next can reuse the same storage through `clear`. Capacity must be sized by
/// the caller (3 per primitive covers triangles, the worst case); inserting
/// past capacity is a caller bug and asserts.
pub(super) struct SplitList {
    pool: IndexVec<CandidateId, Candidate>,
    free: Option<CandidateId>,
    head: Option<CandidateId>,
}

impl SplitList {
    pub fn reserve(capacity: usize) -> SplitList {
        let mut list = SplitList {
            pool: index_vec![
                Candidate {
                    position: 0.0,
                    left_count: 0,
                    right_count: 0,
                    next: None,
                };
                capacity
            ],
            free: None,
            head: None,
        };
        list.thread_free_list();
        list
    }

    fn thread_free_list(&mut self) {
        let count = self.pool.len();
        for (i, candidate) in self.pool.iter_mut().enumerate() {
            candidate.next = if i + 1 < count {
                Some(CandidateId::from_usize(i + 1))
            } else {
                None
            };
        }
        self.free = if count > 0 {
            Some(CandidateId::from_usize(0))
        } else {
            None
        };
        self.head = None;
    }

    /// Returns all nodes to the free pool without deallocating.
    pub fn clear(&mut self) {
        let Some(head) = self.head else {
            return;
        };
        let mut tail = head;
        while let Some(next) = self.pool[tail].next {
            tail = next;
        }
        self.pool[tail].next = self.free;
        self.free = Some(head);
        self.head = None;
    }

    /// Inserts a position keeping the chain sorted; exact duplicates are
    /// silently discarded (a duplicate plane would double count primitives).
    pub fn insert(&mut self, position: FloatType) {
        let_assert!(Some(entry) = self.free, "split candidate pool exhausted");
        self.free = self.pool[entry].next;
        self.pool[entry] = Candidate {
            position,
            left_count: 0,
            right_count: 0,
            next: None,
        };

        let Some(head) = self.head else {
            self.head = Some(entry);
            return;
        };

        if position < self.pool[head].position {
            self.pool[entry].next = Some(head);
            self.head = Some(entry);
            return;
        }
        if position == self.pool[head].position {
            self.discard(entry);
            return;
        }

        let mut node = head;
        while let Some(next) = self.pool[node].next {
            if position < self.pool[next].position {
                break;
            }
            if position == self.pool[next].position {
                self.discard(entry);
                return;
            }
            node = next;
        }
        self.pool[entry].next = self.pool[node].next;
        self.pool[node].next = Some(entry);
    }

    fn discard(&mut self, entry: CandidateId) {
        self.pool[entry].next = self.free;
        self.free = Some(entry);
    }

    pub fn head(&self) -> Option<CandidateId> {
        self.head
    }

    pub fn next(&self, id: CandidateId) -> Option<CandidateId> {
        self.pool[id].next
    }

    pub fn position(&self, id: CandidateId) -> FloatType {
        self.pool[id].position
    }

    pub fn counts(&self, id: CandidateId) -> (usize, usize) {
        (self.pool[id].left_count, self.pool[id].right_count)
    }

    pub fn set_counts(&mut self, id: CandidateId, left: usize, right: usize) {
        self.pool[id].left_count = left;
        self.pool[id].right_count = right;
    }

    #[cfg(test)]
    fn positions(&self) -> Vec<FloatType> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push(self.pool[id].position);
            cursor = self.pool[id].next;
        }
        out
    }
}
