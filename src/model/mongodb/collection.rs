use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    candidate::{Candidate, NewCandidate},
    election::{Election, NewElection},
    geography::{Constituency, District, NewConstituency, NewDistrict, NewState, State as Region},
    profile::{NewProfile, Profile},
    role::{NewRoleGrant, RoleGrant},
    vote::{NewVote, Vote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

macro_rules! collection {
    ($name:expr => $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

pub(crate) const PROFILES: &str = "profiles";
pub(crate) const USER_ROLES: &str = "user_roles";
pub(crate) const ELECTIONS: &str = "elections";
pub(crate) const CANDIDATES: &str = "candidates";
pub(crate) const VOTES: &str = "votes";
pub(crate) const STATES: &str = "states";
pub(crate) const DISTRICTS: &str = "districts";
pub(crate) const CONSTITUENCIES: &str = "constituencies";

collection!(PROFILES => Profile, NewProfile);
collection!(USER_ROLES => RoleGrant, NewRoleGrant);
collection!(ELECTIONS => Election, NewElection);
collection!(CANDIDATES => Candidate, NewCandidate);
collection!(VOTES => Vote, NewVote);
collection!(STATES => Region, NewState);
collection!(DISTRICTS => District, NewDistrict);
collection!(CONSTITUENCIES => Constituency, NewConstituency);

/// Ensure that all the required indexes exist on the given database.
///
/// The unique `(voter_id, election_id)` index on votes is what enforces one
/// vote per voter per election.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Profiles: one account per email.
    let profile_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Profile>::from_db(db)
        .create_index(profile_index, None)
        .await?;

    // Role grants: at most one grant of each role per user.
    let role_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "role": 1})
        .options(unique.clone())
        .build();
    Coll::<RoleGrant>::from_db(db)
        .create_index(role_index, None)
        .await?;

    // Votes: one vote per voter per election, plus lookup by election.
    let votes = Coll::<Vote>::from_db(db);
    let one_vote_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique.clone())
        .build();
    votes.create_index(one_vote_index, None).await?;
    let by_election = IndexModel::builder()
        .keys(doc! {"election_id": 1, "voted_at": -1})
        .build();
    votes.create_index(by_election, None).await?;

    // Candidates: lookup by election.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "constituency_id": 1})
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // States: codes are unique.
    let state_index = IndexModel::builder()
        .keys(doc! {"code": 1})
        .options(unique)
        .build();
    Coll::<Region>::from_db(db)
        .create_index(state_index, None)
        .await?;

    Ok(())
}
