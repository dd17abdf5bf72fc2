use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub election_id: Id,
    /// The constituency this candidate stands in, if any.
    pub constituency_id: Option<Id>,
    pub name: String,
    pub party: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example(election_id: Id) -> Self {
            Self {
                election_id,
                constituency_id: None,
                name: "Alice Appleby".to_string(),
                party: Some("Orchard Party".to_string()),
                bio: Some("Twenty years on the parish council.".to_string()),
                photo_url: None,
            }
        }

        pub fn example2(election_id: Id) -> Self {
            Self {
                election_id,
                constituency_id: None,
                name: "Bob Bramley".to_string(),
                party: None,
                bio: None,
                photo_url: Some("https://example.com/bob.png".to_string()),
            }
        }
    }
}
