use argon2::Config as Argon2Config;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{api::id::ApiId, db::profile::{NewProfile, Profile}},
};

use super::user::Rights;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw sign-in credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// The email as it is stored: trimmed and lower-case.
    pub fn normalized_email(&self) -> Result<String> {
        normalize_email(&self.email)
    }
}

/// A sign-up request.
#[derive(Clone, Deserialize, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::bad_request("Please enter a valid email address"));
    }
    Ok(email)
}

fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Argon2Config::default(),
    )?)
}

impl TryFrom<Registration> for NewProfile {
    type Error = Error;

    /// Create a new profile by normalising the email and hashing the password.
    fn try_from(registration: Registration) -> Result<Self> {
        let email = normalize_email(&registration.email)?;
        let password_hash = hash_password(&registration.password)?;
        let full_name = registration
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(Self {
            email,
            full_name,
            password_hash,
            created_at: Utc::now(),
        })
    }
}

impl TryFrom<Credentials> for NewProfile {
    type Error = Error;

    fn try_from(credentials: Credentials) -> Result<Self> {
        Registration {
            email: credentials.email,
            password: credentials.password,
            full_name: None,
        }
        .try_into()
    }
}

/// The current session, as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDescription {
    pub id: ApiId,
    pub email: String,
    pub full_name: Option<String>,
    /// `voter` or `admin`.
    pub rights: String,
}

impl SessionDescription {
    pub fn new(profile: Profile, rights: Rights) -> Self {
        Self {
            id: profile.id.into(),
            email: profile.profile.email,
            full_name: profile.profile.full_name,
            rights: rights.to_string(),
        }
    }
}
