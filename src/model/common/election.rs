use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an election is in its lifecycle at a given instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Switched off by an administrator, regardless of its dates.
    Inactive,
    /// Active, but voting has not started yet.
    Upcoming,
    /// Active and within its voting window.
    Open,
    /// Active, but the voting window has ended.
    Closed,
}

impl ElectionStatus {
    /// Compute the status of an election at the instant `now`.
    /// Both ends of the window are inclusive.
    pub fn at(
        is_active: bool,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        if !is_active {
            Self::Inactive
        } else if now < start_time {
            Self::Upcoming
        } else if now > end_time {
            Self::Closed
        } else {
            Self::Open
        }
    }

    /// Can votes be cast right now?
    pub fn accepts_votes(self) -> bool {
        self == Self::Open
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Upcoming => "upcoming",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn window_boundaries() {
        let start = Utc::now();
        let end = start + Duration::days(1);

        let before = start - Duration::seconds(1);
        let after = end + Duration::seconds(1);
        assert_eq!(ElectionStatus::at(true, start, end, before), ElectionStatus::Upcoming);
        assert_eq!(ElectionStatus::at(true, start, end, start), ElectionStatus::Open);
        assert_eq!(ElectionStatus::at(true, start, end, end), ElectionStatus::Open);
        assert_eq!(ElectionStatus::at(true, start, end, after), ElectionStatus::Closed);
    }

    #[test]
    fn inactive_overrides_window() {
        let start = Utc::now() - Duration::hours(1);
        let end = start + Duration::days(1);
        let status = ElectionStatus::at(false, start, end, Utc::now());
        assert_eq!(status, ElectionStatus::Inactive);
        assert!(!status.accepts_votes());
    }

    #[test]
    fn only_open_accepts_votes() {
        assert!(ElectionStatus::Open.accepts_votes());
        assert!(!ElectionStatus::Upcoming.accepts_votes());
        assert!(!ElectionStatus::Closed.accepts_votes());
        assert!(!ElectionStatus::Inactive.accepts_votes());
    }

    #[test]
    fn serializes_lowercase() {
        let json = rocket::serde::json::serde_json::to_string(&ElectionStatus::Open).unwrap();
        assert_eq!(json, "\"open\"");
        assert_eq!(ElectionStatus::Closed.to_string(), "closed");
    }
}
