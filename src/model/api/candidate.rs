use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{geography::RegionDescription, id::ApiId},
        common::region::Geography,
        db::candidate::{Candidate, NewCandidate},
        mongodb::Id,
    },
};

/// A candidate specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub election_id: Id,
    #[serde(default)]
    pub constituency_id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<CandidateSpec> for NewCandidate {
    type Error = Error;

    /// Requires a name; blank optional fields are stored as absent.
    fn try_from(spec: CandidateSpec) -> Result<Self> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::bad_request("Candidate name is required"));
        }
        Ok(Self {
            election_id: spec.election_id,
            constituency_id: spec.constituency_id,
            name,
            party: non_blank(spec.party),
            bio: non_blank(spec.bio),
            photo_url: non_blank(spec.photo_url),
        })
    }
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub name: String,
    pub party: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub region: Option<RegionDescription>,
}

impl CandidateDescription {
    pub fn new(candidate: Candidate, geography: &Geography) -> Self {
        let region = RegionDescription::of(candidate.constituency_id, geography);
        Self {
            id: candidate.id.into(),
            election_id: candidate.election_id.into(),
            name: candidate.candidate.name,
            party: candidate.candidate.party,
            bio: candidate.candidate.bio,
            photo_url: candidate.candidate.photo_url,
            region,
        }
    }
}
