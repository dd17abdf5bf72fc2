use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core account data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCore {
    /// Normalised (trimmed, lower-case) email address. Unique.
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ProfileCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    /// A filter matching the profile with the given (already normalised) email.
    pub fn with_email(email: &str) -> Document {
        doc! { "email": email }
    }
}

/// A profile without an ID.
pub type NewProfile = ProfileCore;

/// A profile from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub profile: ProfileCore,
}

impl Deref for Profile {
    type Target = ProfileCore;

    fn deref(&self) -> &Self::Target {
        &self.profile
    }
}

impl DerefMut for Profile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.profile
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::TimeZone;

    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "correct horse";
    pub const EXAMPLE_ADMIN_PASSWORD: &str = "admin password";

    fn hash(password: &str) -> String {
        argon2::hash_encoded(
            password.as_bytes(),
            b"example salt 123",
            &argon2::Config::default(),
        )
        .unwrap()
    }

    impl ProfileCore {
        /// A voter whose password is [`EXAMPLE_PASSWORD`].
        pub fn example() -> Self {
            Self {
                email: "voter@example.com".to_string(),
                full_name: Some("Valerie Voter".to_string()),
                password_hash: hash(EXAMPLE_PASSWORD),
                created_at: Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap(),
            }
        }

        pub fn example2() -> Self {
            Self {
                email: "second@example.com".to_string(),
                full_name: None,
                password_hash: hash(EXAMPLE_PASSWORD),
                created_at: Utc.with_ymd_and_hms(2023, 1, 2, 9, 0, 0).unwrap(),
            }
        }

        /// An administrator whose password is [`EXAMPLE_ADMIN_PASSWORD`].
        pub fn example_admin() -> Self {
            Self {
                email: "admin@example.com".to_string(),
                full_name: Some("Ada Admin".to_string()),
                password_hash: hash(EXAMPLE_ADMIN_PASSWORD),
                created_at: Utc.with_ymd_and_hms(2023, 1, 1, 8, 0, 0).unwrap(),
            }
        }
    }
}

#[cfg(test)]
pub use examples::{EXAMPLE_ADMIN_PASSWORD, EXAMPLE_PASSWORD};
