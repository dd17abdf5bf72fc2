use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{
    api::{election::ElectionDescription, id::ApiId},
    common::tally::{CandidateTally, Tally},
};

/// One candidate's share of an election.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub candidate_id: ApiId,
    pub name: String,
    pub party: String,
    pub votes: u64,
    pub percentage: f64,
}

impl From<CandidateTally> for CandidateResult {
    fn from(tally: CandidateTally) -> Self {
        Self {
            candidate_id: tally.candidate_id.into(),
            name: tally.name,
            party: tally.party,
            votes: tally.votes,
            percentage: tally.percentage,
        }
    }
}

/// The results page of an election.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionResults {
    pub election: ElectionDescription,
    pub total_votes: u64,
    /// The candidate with the most votes, if any votes were cast.
    pub leader: Option<CandidateResult>,
    /// Sorted by votes descending.
    pub candidates: Vec<CandidateResult>,
}

impl ElectionResults {
    pub fn new(election: ElectionDescription, tally: Tally) -> Self {
        let candidates: Vec<CandidateResult> =
            tally.candidates.into_iter().map(Into::into).collect();
        Self {
            election,
            total_votes: tally.total_votes,
            leader: candidates.first().cloned(),
            candidates,
        }
    }
}

/// A single vote in the detailed results view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteDetail {
    pub id: ApiId,
    pub voter: String,
    pub candidate_name: String,
    pub candidate_party: String,
    pub voted_at: DateTime<Utc>,
}

/// Results plus every vote behind them, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedResults {
    #[serde(flatten)]
    pub results: ElectionResults,
    pub votes: Vec<VoteDetail>,
}
