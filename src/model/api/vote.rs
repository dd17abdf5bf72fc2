use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{geography::RegionDescription, id::ApiId},
    db::vote::Vote,
    mongodb::Id,
};

/// A voter's choice in one election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSpec {
    pub candidate_id: Id,
}

/// Proof of a cast vote, returned to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub voted_at: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            election_id: vote.election_id.into(),
            candidate_id: vote.candidate_id.into(),
            voted_at: vote.voted_at,
        }
    }
}

/// Vote counters shown after voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteStats {
    /// Votes cast across all elections.
    pub total_votes: u64,
    /// Has the caller voted in any election?
    pub has_voted: bool,
}

/// A vote record created or edited by an administrator on behalf of a voter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecordSpec {
    pub user_email: String,
    pub election_id: Id,
    pub candidate_id: Id,
}

/// How a voter is shown in vote records: their email, or an abbreviated ID
/// if their profile cannot be found.
pub fn voter_label(email: Option<&str>, voter_id: Id) -> String {
    match email {
        Some(email) => email.to_string(),
        None => format!("{}...", &voter_id.to_hex()[..8]),
    }
}

/// A vote, resolved for display in the admin vote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub id: ApiId,
    pub voter_id: ApiId,
    pub voter: String,
    pub election_id: ApiId,
    pub election_title: Option<String>,
    pub candidate_id: ApiId,
    pub candidate_name: Option<String>,
    pub candidate_party: Option<String>,
    /// Region of the candidate voted for.
    pub region: Option<RegionDescription>,
    pub voted_at: DateTime<Utc>,
}
