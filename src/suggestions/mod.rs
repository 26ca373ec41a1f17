//! Vote-annotated pattern suggestions for a location.
//!
//! [`SuggestionAggregator`] joins each of a location's suggestions with its
//! catalog entry, the community tally, and the caller's own vote. The
//! reported confidence is the stored algorithmic prior; votes never feed
//! back into it.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::storage::{Pattern, PatternSuggestion, SharedStorage, VoteType};
use crate::votes::VoteLedger;

/// A pattern as seen from one location by one session.
///
/// Computed on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternWithVotes {
    /// Catalog entry the suggestion points to.
    #[serde(flatten)]
    pub pattern: Pattern,
    /// Up-vote rows on the suggestion.
    pub upvotes: u64,
    /// Down-vote rows on the suggestion.
    pub downvotes: u64,
    /// Stored algorithmic confidence.
    pub confidence: f64,
    /// Suggestion this entry was built from.
    pub suggestion_id: String,
    /// The requesting session's latest vote, if any.
    pub user_vote: Option<VoteType>,
}

impl PatternWithVotes {
    /// Up-votes minus down-votes.
    pub fn net_votes(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}

/// Orderings callers may apply to aggregated suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternOrdering {
    /// Highest stored confidence first.
    Confidence,
    /// Highest up-minus-down first.
    NetVotes,
}

/// Sort aggregated suggestions in place. Ties keep their relative order.
pub fn sort_patterns(patterns: &mut [PatternWithVotes], ordering: PatternOrdering) {
    match ordering {
        PatternOrdering::Confidence => {
            patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence))
        }
        PatternOrdering::NetVotes => patterns.sort_by_key(|p| std::cmp::Reverse(p.net_votes())),
    }
}

/// Decode the stored confidence text of a suggestion.
pub fn parse_confidence(suggestion: &PatternSuggestion) -> AppResult<f64> {
    suggestion
        .confidence
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|c| c.is_finite())
        .ok_or_else(|| AppError::InvalidValue {
            field: "confidence".to_string(),
            value: suggestion.confidence.clone(),
        })
}

/// Builds [`PatternWithVotes`] lists.
#[derive(Clone)]
pub struct SuggestionAggregator {
    storage: SharedStorage,
    ledger: VoteLedger,
}

impl SuggestionAggregator {
    /// Create an aggregator reading votes through `ledger`
    pub fn new(storage: SharedStorage, ledger: VoteLedger) -> Self {
        Self { storage, ledger }
    }

    /// Vote-annotated patterns suggested for a location, as seen by a session.
    ///
    /// One entry per suggestion whose pattern still exists, in suggestion
    /// order. Per-suggestion vote reads run concurrently. A stored
    /// confidence that fails to parse fails the whole call.
    pub async fn get_patterns_for_location(
        &self,
        location_id: &str,
        session_id: &str,
    ) -> AppResult<Vec<PatternWithVotes>> {
        let rows = self
            .storage
            .get_location_suggestions_with_patterns(location_id)
            .await?;

        debug!(
            location_id,
            session_id,
            suggestions = rows.len(),
            "Aggregating suggestions"
        );

        let entries = rows
            .into_iter()
            .map(|(suggestion, pattern)| self.annotate(suggestion, pattern, session_id));

        try_join_all(entries).await
    }

    async fn annotate(
        &self,
        suggestion: PatternSuggestion,
        pattern: Pattern,
        session_id: &str,
    ) -> AppResult<PatternWithVotes> {
        let confidence = match parse_confidence(&suggestion) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    suggestion_id = %suggestion.id,
                    confidence = %suggestion.confidence,
                    "Stored confidence is not a number"
                );
                return Err(e);
            }
        };

        let (tally, user_vote) = futures::try_join!(
            self.ledger.tally(&suggestion.id),
            self.ledger.get_user_vote(&suggestion.id, session_id),
        )?;

        Ok(PatternWithVotes {
            pattern,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            confidence,
            suggestion_id: suggestion.id,
            user_vote: user_vote.map(|v| v.vote_type),
        })
    }
}
