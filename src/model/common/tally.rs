use std::collections::HashMap;

use crate::model::{db::candidate::Candidate, mongodb::Id};

/// Display name for votes whose candidate no longer exists.
pub const UNKNOWN_CANDIDATE: &str = "Unknown";
/// Display party for candidates standing without one.
pub const INDEPENDENT: &str = "Independent";

/// Vote count for a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTally {
    pub candidate_id: Id,
    pub name: String,
    pub party: String,
    pub votes: u64,
    /// Share of all votes, in percent, rounded to one decimal place.
    pub percentage: f64,
}

/// The counted result of an election.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub total_votes: u64,
    /// Sorted by votes descending, then by name.
    pub candidates: Vec<CandidateTally>,
}

impl Tally {
    /// The candidate with the most votes, if any votes were cast.
    pub fn leader(&self) -> Option<&CandidateTally> {
        self.candidates.first()
    }
}

/// Group votes (given by candidate ID) by candidate and count them.
///
/// Only candidates with at least one vote appear. The counts always sum to
/// the number of votes given.
pub fn tally(
    votes: impl IntoIterator<Item = Id>,
    candidates: &HashMap<Id, Candidate>,
) -> Tally {
    let mut counts: HashMap<Id, u64> = HashMap::new();
    let mut total_votes = 0;
    for candidate_id in votes {
        *counts.entry(candidate_id).or_default() += 1;
        total_votes += 1;
    }

    let mut results = counts
        .into_iter()
        .map(|(candidate_id, votes)| {
            let candidate = candidates.get(&candidate_id);
            CandidateTally {
                candidate_id,
                name: candidate
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string()),
                party: candidate
                    .and_then(|c| c.party.clone())
                    .unwrap_or_else(|| INDEPENDENT.to_string()),
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect::<Vec<_>>();
    results.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });

    Tally {
        total_votes,
        candidates: results,
    }
}

fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}
