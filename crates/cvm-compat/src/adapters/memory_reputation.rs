//! # In-Memory Reputation Store
//!
//! Backs the migration checks in tests and tooling. Production nodes
//! implement [`ReputationStore`] over their own database.

use crate::domain::entities::TrustEdge;
use crate::domain::value_objects::Address;
use crate::ports::outbound::ReputationStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Trust edges and scores held in memory.
#[derive(Debug, Default)]
pub struct InMemoryReputationStore {
    edges: RwLock<Vec<TrustEdge>>,
    scores: RwLock<BTreeMap<Address, i32>>,
}

impl InMemoryReputationStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trust edge. Values are stored as given; validation is the
    /// checker's job.
    pub fn add_edge(&self, edge: TrustEdge) {
        self.edges.write().push(edge);
    }

    /// Set the score for an address.
    pub fn set_score(&self, address: Address, score: i32) {
        self.scores.write().insert(address, score);
    }

    /// Remove a score.
    pub fn remove_score(&self, address: &Address) -> Option<i32> {
        self.scores.write().remove(address)
    }
}

impl ReputationStore for InMemoryReputationStore {
    fn trust_edges(&self) -> Vec<TrustEdge> {
        self.edges.read().clone()
    }

    fn reputation_scores(&self) -> Vec<(Address, i32)> {
        self.scores.read().iter().map(|(a, s)| (*a, *s)).collect()
    }

    fn reputation_score(&self, address: &Address) -> Option<i32> {
        self.scores.read().get(address).copied()
    }
}
