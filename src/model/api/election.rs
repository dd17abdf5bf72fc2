use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{geography::RegionDescription, id::ApiId},
        common::{election::ElectionStatus, region::Geography},
        db::election::{Election, NewElection},
        mongodb::Id,
    },
};

fn default_active() -> bool {
    true
}

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Restrict the election to one constituency.
    #[serde(default)]
    pub constituency_id: Option<Id>,
}

impl ElectionSpec {
    /// Check the title is present and the window is well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::bad_request("Election title is required"));
        }
        if self.start_time >= self.end_time {
            return Err(Error::bad_request("End time must be after start time"));
        }
        Ok(())
    }

    /// Convert this spec into an election created at `created_at`.
    pub fn into_election(self, created_at: DateTime<Utc>) -> NewElection {
        NewElection {
            title: self.title.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
            constituency_id: self.constituency_id,
            created_at,
        }
    }
}

/// An API-friendly election description, with its current status and the
/// names of the region it is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub status: ElectionStatus,
    /// `None` for nationwide elections.
    pub region: Option<RegionDescription>,
    pub created_at: DateTime<Utc>,
}

impl ElectionDescription {
    pub fn new(election: Election, geography: &Geography, now: DateTime<Utc>) -> Self {
        let status = election.status_at(now);
        let region = RegionDescription::of(election.constituency_id, geography);
        Self {
            id: election.id.into(),
            title: election.election.title,
            description: election.election.description,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            is_active: election.election.is_active,
            status,
            region,
            created_at: election.election.created_at,
        }
    }
}

/// An election as seen by a signed-in voter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoterElection {
    #[serde(flatten)]
    pub election: ElectionDescription,
    pub has_voted: bool,
    /// The election is open and the voter has not voted in it yet.
    pub can_vote: bool,
}

impl VoterElection {
    pub fn new(election: ElectionDescription, has_voted: bool) -> Self {
        Self {
            can_vote: election.status.accepts_votes() && !has_voted,
            election,
            has_voted,
        }
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn validation() {
        assert!(ElectionSpec::example().validate().is_ok());

        let untitled = ElectionSpec {
            title: "   ".to_string(),
            ..ElectionSpec::example()
        };
        assert_eq!(
            untitled.validate().unwrap_err().public_message(),
            "Election title is required"
        );

        let spec = ElectionSpec::example();
        let backwards = ElectionSpec {
            end_time: spec.start_time - Duration::seconds(1),
            ..spec.clone()
        };
        assert!(backwards.validate().is_err());
        let empty_window = ElectionSpec {
            end_time: spec.start_time,
            ..spec
        };
        assert!(empty_window.validate().is_err());
    }

    #[test]
    fn defaults_when_deserializing() {
        let spec: ElectionSpec = serde_json::from_value(serde_json::json!({
            "title": "Minimal",
            "start_time": "2024-01-01T00:00:00Z",
            "end_time": "2024-01-02T00:00:00Z",
        }))
        .unwrap();
        assert!(spec.is_active);
        assert!(spec.description.is_none());
        assert!(spec.constituency_id.is_none());
    }

    #[test]
    fn can_vote_requires_open_and_not_voted() {
        let now = Utc::now();
        let election = Election {
            id: Id::new(),
            election: ElectionSpec::example().into_election(now),
        };
        let description = ElectionDescription::new(election, &Geography::default(), now);
        assert_eq!(description.status, ElectionStatus::Open);
        assert!(description.region.is_none());

        assert!(VoterElection::new(description.clone(), false).can_vote);
        assert!(!VoterElection::new(description.clone(), true).can_vote);

        let closed = ElectionDescription {
            status: ElectionStatus::Closed,
            ..description
        };
        assert!(!VoterElection::new(closed, false).can_vote);
    }

    #[test]
    fn flattens_voter_annotations() {
        let now = Utc::now();
        let election = Election {
            id: Id::new(),
            election: ElectionSpec::example().into_election(now),
        };
        let description = ElectionDescription::new(election.clone(), &Geography::default(), now);
        let json = serde_json::to_value(VoterElection::new(description, true)).unwrap();
        assert_eq!(json["id"], election.id.to_hex());
        assert_eq!(json["status"], "open");
        assert_eq!(json["has_voted"], true);
        assert_eq!(json["can_vote"], false);
    }
}
