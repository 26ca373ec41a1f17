//! Vote ledger for pattern suggestions.
//!
//! Votes are append-only rows carrying a weight derived from time spent at
//! the location. Tallies count rows; [`VoteLedger::weighted_tally`] sums
//! weights separately and is not used when annotating suggestions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::VoteMode;
use crate::error::{AppResult, StorageResult, ValidationError};
use crate::storage::{SharedStorage, Vote, VoteType};

/// Minutes over which the weight curve grows by one natural-log step.
const WEIGHT_TIME_SCALE_MINUTES: f64 = 30.0;

/// Vote weight for the time a session spent at a location.
///
/// 1.0 at zero minutes, non-decreasing in `minutes`.
pub fn weight_for_time_spent(minutes: u32) -> f64 {
    1.0 + (f64::from(minutes) / WEIGHT_TIME_SCALE_MINUTES).ln_1p()
}

/// Parameters for casting a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteInput {
    /// Suggestion being voted on
    pub suggestion_id: String,
    /// Voting session
    pub session_id: String,
    /// Direction
    pub vote_type: VoteType,
    /// Significance of the vote
    pub weight: f64,
    /// Location the vote was cast from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Minutes spent at the location
    #[serde(default)]
    pub time_spent_minutes: u32,
}

impl VoteInput {
    /// Create a unit-weight vote with no time spent.
    pub fn new(
        suggestion_id: impl Into<String>,
        session_id: impl Into<String>,
        vote_type: VoteType,
    ) -> Self {
        Self {
            suggestion_id: suggestion_id.into(),
            session_id: session_id.into(),
            vote_type,
            weight: 1.0,
            location_id: None,
            time_spent_minutes: 0,
        }
    }

    /// Set time spent and derive the weight from it.
    pub fn with_time_spent(mut self, minutes: u32) -> Self {
        self.time_spent_minutes = minutes;
        self.weight = weight_for_time_spent(minutes);
        self
    }

    /// Override the weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the location
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.suggestion_id.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "suggestion_id",
            });
        }
        if self.session_id.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "session_id",
            });
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ValidationError::InvalidWeight { value: self.weight });
        }
        Ok(())
    }

    fn into_vote(self) -> Vote {
        Vote {
            id: Uuid::new_v4().to_string(),
            suggestion_id: self.suggestion_id,
            session_id: self.session_id,
            vote_type: self.vote_type,
            weight: self.weight,
            location_id: self.location_id,
            time_spent_minutes: self.time_spent_minutes,
            created_at: Utc::now(),
        }
    }
}

/// Row counts of votes by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Number of up-vote rows
    pub upvotes: u64,
    /// Number of down-vote rows
    pub downvotes: u64,
}

impl VoteTally {
    /// Count vote rows by direction.
    pub fn from_votes(votes: &[Vote]) -> Self {
        votes.iter().fold(Self::default(), |mut tally, vote| {
            match vote.vote_type {
                VoteType::Up => tally.upvotes += 1,
                VoteType::Down => tally.downvotes += 1,
            }
            tally
        })
    }

    /// Up-votes minus down-votes.
    pub fn net(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}

/// Summed vote weights by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedTally {
    /// Sum of up-vote weights
    pub up_weight: f64,
    /// Sum of down-vote weights
    pub down_weight: f64,
}

/// Records and tallies votes.
#[derive(Clone)]
pub struct VoteLedger {
    storage: SharedStorage,
    mode: VoteMode,
}

impl VoteLedger {
    /// Create a ledger that appends every vote
    pub fn new(storage: SharedStorage) -> Self {
        Self::with_mode(storage, VoteMode::Append)
    }

    /// Create a ledger with an explicit duplicate-vote policy
    pub fn with_mode(storage: SharedStorage, mode: VoteMode) -> Self {
        Self { storage, mode }
    }

    /// The duplicate-vote policy in effect.
    pub fn mode(&self) -> VoteMode {
        self.mode
    }

    /// Record a vote according to the ledger's [`VoteMode`].
    ///
    /// In `Append` mode a second vote by the same session on the same
    /// suggestion is a second row.
    pub async fn record_vote(&self, input: VoteInput) -> AppResult<Vote> {
        match self.mode {
            VoteMode::Append => self.append_vote(input).await,
            VoteMode::Upsert => self.upsert_vote(input).await,
        }
    }

    /// Append a new ledger row unconditionally.
    pub async fn append_vote(&self, input: VoteInput) -> AppResult<Vote> {
        input.validate()?;
        let vote = input.into_vote();
        self.storage.create_vote(&vote).await?;

        info!(
            vote_id = %vote.id,
            suggestion_id = %vote.suggestion_id,
            session_id = %vote.session_id,
            vote_type = %vote.vote_type,
            weight = vote.weight,
            "Vote recorded"
        );
        Ok(vote)
    }

    /// Replace the session's existing vote on the suggestion, or append one.
    ///
    /// Not atomic: two concurrent first votes from one session can still
    /// both append.
    pub async fn upsert_vote(&self, input: VoteInput) -> AppResult<Vote> {
        input.validate()?;

        let existing = self
            .storage
            .get_user_vote(&input.suggestion_id, &input.session_id)
            .await?;

        let Some(existing) = existing else {
            return self.append_vote(input).await;
        };

        let vote = Vote {
            id: existing.id,
            ..input.into_vote()
        };
        self.storage.update_vote(&vote).await?;

        info!(
            vote_id = %vote.id,
            suggestion_id = %vote.suggestion_id,
            session_id = %vote.session_id,
            vote_type = %vote.vote_type,
            "Vote replaced"
        );
        Ok(vote)
    }

    /// Every vote on a suggestion, unordered.
    pub async fn get_votes_for_suggestion(&self, suggestion_id: &str) -> StorageResult<Vec<Vote>> {
        self.storage.get_suggestion_votes(suggestion_id).await
    }

    /// The session's most recent vote on a suggestion.
    pub async fn get_user_vote(
        &self,
        suggestion_id: &str,
        session_id: &str,
    ) -> StorageResult<Option<Vote>> {
        self.storage.get_user_vote(suggestion_id, session_id).await
    }

    /// Row counts by direction. Weights are ignored.
    pub async fn tally(&self, suggestion_id: &str) -> StorageResult<VoteTally> {
        let votes = self.get_votes_for_suggestion(suggestion_id).await?;
        let tally = VoteTally::from_votes(&votes);
        debug!(
            suggestion_id,
            upvotes = tally.upvotes,
            downvotes = tally.downvotes,
            "Tallied votes"
        );
        Ok(tally)
    }

    /// Summed weights by direction.
    pub async fn weighted_tally(&self, suggestion_id: &str) -> StorageResult<WeightedTally> {
        let votes = self.get_votes_for_suggestion(suggestion_id).await?;
        Ok(votes
            .iter()
            .fold(WeightedTally::default(), |mut tally, vote| {
                match vote.vote_type {
                    VoteType::Up => tally.up_weight += vote.weight,
                    VoteType::Down => tally.down_weight += vote.weight,
                }
                tally
            }))
    }
}
