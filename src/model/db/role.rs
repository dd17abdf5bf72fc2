use std::ops::{Deref, DerefMut};

use mongodb::{
    bson::{doc, Document},
    Database,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::auth::Credentials,
        db::profile::{NewProfile, Profile, ProfileCore},
        mongodb::{Coll, Id},
    },
};

/// Roles that can be granted to a profile. Profiles without a grant are
/// ordinary voters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
        }
    }
}

/// A role granted to a profile, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrantCore {
    pub user_id: Id,
    pub role: Role,
}

impl RoleGrantCore {
    pub fn admin(user_id: Id) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// A filter matching the admin grant of the given user.
    pub fn admin_filter(user_id: Id) -> Document {
        doc! { "user_id": user_id, "role": Role::Admin.as_str() }
    }

    /// A filter matching every admin grant.
    pub fn any_admin() -> Document {
        doc! { "role": Role::Admin.as_str() }
    }
}

/// A role grant without an ID.
pub type NewRoleGrant = RoleGrantCore;

/// A role grant from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrant {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub grant: RoleGrantCore,
}

impl Deref for RoleGrant {
    type Target = RoleGrantCore;

    fn deref(&self) -> &Self::Target {
        &self.grant
    }
}

impl DerefMut for RoleGrant {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.grant
    }
}

/// Does the given user hold an admin grant?
pub async fn is_admin(grants: &Coll<RoleGrant>, user_id: Id) -> Result<bool> {
    let grant = grants
        .find_one(RoleGrantCore::admin_filter(user_id), None)
        .await?;
    Ok(grant.is_some())
}

/// Make sure at least one administrator exists, creating (or promoting) the
/// profile with the given email if there is none.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(db: &Database, email: &str, password: &str) -> Result<()> {
    let grants = Coll::<RoleGrant>::from_db(db);
    if grants
        .find_one(RoleGrantCore::any_admin(), None)
        .await?
        .is_some()
    {
        debug!("At least one administrator exists");
        return Ok(());
    }

    let credentials = Credentials {
        email: email.to_string(),
        password: password.to_string(),
    };
    let email = credentials.normalized_email()?;
    let profiles = Coll::<Profile>::from_db(db);
    let user_id = match profiles
        .find_one(ProfileCore::with_email(&email), None)
        .await?
    {
        Some(profile) => profile.id,
        None => {
            let profile = Profile {
                id: Id::new(),
                profile: NewProfile::try_from(credentials)?,
            };
            profiles.insert_one(&profile, None).await?;
            profile.id
        }
    };

    Coll::<NewRoleGrant>::from_db(db)
        .insert_one(NewRoleGrant::admin(user_id), None)
        .await?;
    warn!("No administrator found; granted admin rights to {email}");
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RoleGrantCore {
        pub fn example(user_id: Id) -> Self {
            Self::admin(user_id)
        }
    }
}
