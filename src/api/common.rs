//! Lookups shared by several route modules.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::{
    error::{Error, Result},
    model::{
        api::{election::ElectionDescription, results::ElectionResults},
        common::{region::Geography, tally::tally},
        db::{
            candidate::Candidate,
            election::Election,
            geography::{Constituency, District, State},
            profile::Profile,
            vote::Vote,
        },
        mongodb::{Coll, Id, MongoCollection},
    },
};

/// Fetch every document matching `filter`, in the given order.
pub async fn find_all<T>(
    coll: &Coll<T>,
    filter: impl Into<Option<Document>>,
    sort: Document,
) -> Result<Vec<T>>
where
    T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(sort).build();
    Ok(coll.find(filter, options).await?.try_collect().await?)
}

/// Get an election by ID, or 404.
pub async fn election_by_id(elections: &Coll<Election>, election_id: Id) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("Election"))
}

/// Get the profile behind a token's ID, or 404.
pub async fn profile_by_id(profiles: &Coll<Profile>, profile_id: Id) -> Result<Profile> {
    profiles
        .find_one(profile_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("Profile"))
}

/// Load the whole geographic hierarchy.
pub async fn load_geography(db: &Database) -> Result<Geography> {
    let states = find_all(&Coll::<State>::from_db(db), None, doc! { "name": 1 }).await?;
    let districts = find_all(&Coll::<District>::from_db(db), None, doc! { "name": 1 }).await?;
    let constituencies =
        find_all(&Coll::<Constituency>::from_db(db), None, doc! { "name": 1 }).await?;
    Ok(Geography::new(states, districts, constituencies))
}

/// Index candidates by ID.
pub async fn candidates_by_id(
    candidates: &Coll<Candidate>,
    filter: impl Into<Option<Document>>,
) -> Result<HashMap<Id, Candidate>> {
    let candidates = find_all(candidates, filter, doc! { "name": 1 }).await?;
    Ok(candidates.into_iter().map(|c| (c.id, c)).collect())
}

/// Email addresses of the given profiles, by ID.
pub async fn emails_by_id(
    profiles: &Coll<Profile>,
    ids: impl IntoIterator<Item = Id>,
) -> Result<HashMap<Id, String>> {
    let ids = ids.into_iter().collect::<Vec<_>>();
    let filter = doc! { "_id": { "$in": ids } };
    let profiles = find_all(profiles, filter, doc! { "email": 1 }).await?;
    Ok(profiles
        .into_iter()
        .map(|p| (p.id, p.profile.email))
        .collect())
}

/// Count an election's votes, together with the votes themselves (newest
/// first) and the election's candidates.
pub async fn count_votes(
    db: &Database,
    election: Election,
    now: DateTime<Utc>,
) -> Result<(ElectionResults, Vec<Vote>, HashMap<Id, Candidate>)> {
    let by_election = doc! { "election_id": election.id };
    let votes = find_all(
        &Coll::<Vote>::from_db(db),
        by_election.clone(),
        doc! { "voted_at": -1 },
    )
    .await?;
    let candidates = candidates_by_id(&Coll::<Candidate>::from_db(db), by_election).await?;

    let tally = tally(votes.iter().map(|v| v.candidate_id), &candidates);
    let geography = load_geography(db).await?;
    let description = ElectionDescription::new(election, &geography, now);
    Ok((ElectionResults::new(description, tally), votes, candidates))
}
