use crate::state::SimState;
use immuno_common::{ParticleId, SimParams};
use log::trace;
use std::collections::HashMap;

/// Disjoint-set forest over antigen slots with union by rank and path halving.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(size: usize) -> Self {
        DisjointSet {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        if self.rank[root_a] < self.rank[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b] = root_a;
        if self.rank[root_a] == self.rank[root_b] {
            self.rank[root_a] += 1;
        }
    }
}

/// Result of one cluster pass: the root of every antigen and the member count per root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterSummary {
    /// Cluster root id per antigen slot.
    pub roots: Vec<ParticleId>,
    /// Member count per cluster root id.
    pub sizes: HashMap<ParticleId, usize>,
}

impl ClusterSummary {
    /// Sizes of clusters with at least `min_size` members.
    pub fn sizes_at_least(&self, min_size: usize) -> impl Iterator<Item = usize> + '_ {
        self.sizes.values().copied().filter(move |&s| s >= min_size)
    }

    pub fn size_of(&self, root: ParticleId) -> usize {
        self.sizes.get(&root).copied().unwrap_or(1)
    }
}

/// Rebuilds cluster membership from the current binding graph: two antigens
/// share a cluster when some chain of antibodies bridges them. Writes each
/// antigen's cluster root and precipitated flag.
pub fn detect(state: &mut SimState, params: &SimParams) -> ClusterSummary {
    let mut sets = DisjointSet::new(state.antigens.len());

    for antibody in &state.antibodies {
        let slots: Vec<usize> = antibody
            .bridged_antigens()
            .into_iter()
            .filter_map(|id| state.antigen_slot(id))
            .collect();
        if let Some((&first, rest)) = slots.split_first() {
            for &other in rest {
                sets.union(first, other);
            }
        }
    }

    let mut summary = ClusterSummary {
        roots: Vec::with_capacity(state.antigens.len()),
        sizes: HashMap::new(),
    };
    for slot in 0..state.antigens.len() {
        let root = state.antigens[sets.find(slot)].body.id;
        summary.roots.push(root);
        *summary.sizes.entry(root).or_insert(0) += 1;
    }

    for (antigen, &root) in state.antigens.iter_mut().zip(&summary.roots) {
        antigen.cluster = root;
        antigen.precipitated = summary.size_of(root) >= params.lattice_threshold;
    }

    trace!(
        "Cluster pass: {} antigens in {} clusters.",
        summary.roots.len(),
        summary.sizes.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_find_merges_transitively() {
        let mut sets = DisjointSet::new(6);
        sets.union(0, 1);
        sets.union(2, 3);
        sets.union(1, 3);
        assert_eq!(sets.find(0), sets.find(2));
        assert_ne!(sets.find(0), sets.find(4));
        assert_ne!(sets.find(4), sets.find(5));
    }

    #[test]
    fn union_is_idempotent() {
        let mut sets = DisjointSet::new(3);
        sets.union(0, 1);
        sets.union(1, 0);
        sets.union(0, 1);
        assert_eq!(sets.find(0), sets.find(1));
        assert_ne!(sets.find(1), sets.find(2));
    }
}
