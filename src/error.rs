use std::fmt::Display;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{logging::RequestId, model::mongodb::Id};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    /// The voter already has a vote recorded for this election.
    #[error("Voter {voter_id} has already voted in election {election_id}")]
    AlreadyVoted { voter_id: Id, election_id: Id },
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::AlreadyVoted { .. } => Status::Conflict,
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to the client. Internal details are never exposed.
    pub fn public_message(&self) -> String {
        match self {
            Self::Db(_) | Self::Argon2(_) => "Internal server error".to_string(),
            Self::Jwt(_) => "Invalid session token".to_string(),
            Self::AlreadyVoted { .. } => "You have already voted in this election".to_string(),
            Self::Status(_, msg) => msg.clone(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let id = RequestId::of(req);
        let status = self.status();
        if status.code >= 500 {
            error!("req{id}: {self}");
        } else {
            warn!("req{id}: {self}");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        Custom(status, Json(body)).respond_to(req)
    }
}
