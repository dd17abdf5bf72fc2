use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::profile::Profile};

/// A profile holding admin rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminDescription {
    pub id: ApiId,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for AdminDescription {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id.into(),
            email: profile.profile.email,
            full_name: profile.profile.full_name,
            created_at: profile.profile.created_at,
        }
    }
}

/// A request to grant admin rights to an existing profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminGrant {
    pub email: String,
}
