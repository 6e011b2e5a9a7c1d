//! # Reputation Compatibility Checker
//!
//! Confirms that legacy trust edges and reputation scores survive the
//! move to HAT v2 scoring.

use crate::domain::entities::{ReputationDataStatus, TrustGraphStatus};
use crate::domain::invariants::{is_valid_reputation_score, limits::DEFAULT_SCORE_TOLERANCE};
use crate::domain::value_objects::Address;
use crate::ports::outbound::ReputationStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Migration checks over a [`ReputationStore`].
#[derive(Clone)]
pub struct ReputationCompatChecker {
    store: Arc<dyn ReputationStore>,
}

impl fmt::Debug for ReputationCompatChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReputationCompatChecker").finish_non_exhaustive()
    }
}

impl ReputationCompatChecker {
    /// Checker reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReputationStore>) -> Self {
        Self { store }
    }

    /// Validate every trust edge.
    #[must_use]
    pub fn check_trust_graph_preservation(&self) -> TrustGraphStatus {
        let edges = self.store.trust_edges();
        let issues: Vec<String> = edges.iter().filter_map(|e| e.validation_issue()).collect();
        let status = TrustGraphStatus {
            is_preserved: issues.is_empty(),
            total_edges: edges.len(),
            valid_edges: edges.len() - issues.len(),
            issues,
        };
        if !status.is_preserved {
            warn!(
                invalid = status.issues.len(),
                total = status.total_edges,
                "trust graph has invalid edges"
            );
        }
        status
    }

    /// Check every stored score is within `[0, 100]`.
    #[must_use]
    pub fn check_reputation_data(&self) -> ReputationDataStatus {
        let scores = self.store.reputation_scores();
        let issues: Vec<String> = scores
            .iter()
            .filter(|(_, score)| !is_valid_reputation_score(*score))
            .map(|(addr, score)| format!("{addr} has score {score} outside [0, 100]"))
            .collect();
        let status = ReputationDataStatus {
            is_valid: issues.is_empty(),
            total_scores: scores.len(),
            valid_scores: scores.len() - issues.len(),
            issues,
        };
        debug!(
            total = status.total_scores,
            valid = status.valid_scores,
            "reputation data checked"
        );
        status
    }

    /// HAT v2 can score the address: it has no score yet, or one in range.
    #[must_use]
    pub fn is_hat_v2_compatible(&self, address: &Address) -> bool {
        self.store
            .reputation_score(address)
            .map_or(true, is_valid_reputation_score)
    }

    /// HAT v2 compatible and every outgoing edge is valid.
    #[must_use]
    pub fn can_migrate_to_hat_v2(&self, address: &Address) -> bool {
        self.is_hat_v2_compatible(address)
            && self
                .store
                .outgoing_edges(address)
                .iter()
                .all(|edge| edge.is_valid())
    }

    /// Stored score is within `tolerance` of `expected`. Missing scores and
    /// negative tolerances fail.
    #[must_use]
    pub fn verify_score_preservation(&self, address: &Address, expected: i32, tolerance: i32) -> bool {
        let Ok(tolerance) = u32::try_from(tolerance) else {
            return false;
        };
        self.store
            .reputation_score(address)
            .is_some_and(|actual| actual.abs_diff(expected) <= tolerance)
    }

    /// [`verify_score_preservation`](Self::verify_score_preservation) with
    /// the default tolerance of 5.
    #[must_use]
    pub fn verify_score_preservation_default(&self, address: &Address, expected: i32) -> bool {
        self.verify_score_preservation(address, expected, DEFAULT_SCORE_TOLERANCE)
    }
}
