use std::collections::HashSet;

use chrono::Utc;
use mongodb::{bson::doc, Database};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Voter},
            election::{ElectionDescription, VoterElection},
            vote::{BallotSpec, VoteReceipt, VoteStats},
        },
        db::{
            candidate::Candidate,
            election::Election,
            vote::{NewVote, Vote},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

use super::common::{election_by_id, find_all, load_geography};

pub fn routes() -> Vec<Route> {
    routes![get_elections, get_election, get_votes, cast_vote, get_stats]
}

/// Active elections, most recently started first.
#[get("/voter/elections")]
async fn get_elections(
    token: AuthToken<Voter>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    db: &State<Database>,
) -> Result<Json<Vec<VoterElection>>> {
    let geography = load_geography(db).await?;
    let active = find_all(
        &elections,
        doc! { "is_active": true },
        doc! { "start_time": -1 },
    )
    .await?;
    let voted: HashSet<Id> = find_all(&votes, doc! { "voter_id": token.id }, doc! {})
        .await?
        .into_iter()
        .map(|v| v.election_id)
        .collect();

    let now = Utc::now();
    Ok(Json(
        active
            .into_iter()
            .map(|election| {
                let has_voted = voted.contains(&election.id);
                VoterElection::new(ElectionDescription::new(election, &geography, now), has_voted)
            })
            .collect(),
    ))
}

#[get("/voter/elections/<election_id>")]
async fn get_election(
    token: AuthToken<Voter>,
    election_id: Id,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    db: &State<Database>,
) -> Result<Json<VoterElection>> {
    let election = election_by_id(&elections, election_id).await?;
    let has_voted = votes
        .find_one(doc! { "voter_id": token.id, "election_id": election_id }, None)
        .await?
        .is_some();
    let geography = load_geography(db).await?;
    let description = ElectionDescription::new(election, &geography, Utc::now());
    Ok(Json(VoterElection::new(description, has_voted)))
}

/// The caller's own votes, newest first.
#[get("/voter/votes")]
async fn get_votes(token: AuthToken<Voter>, votes: Coll<Vote>) -> Result<Json<Vec<VoteReceipt>>> {
    let votes = find_all(&votes, doc! { "voter_id": token.id }, doc! { "voted_at": -1 }).await?;
    Ok(Json(votes.into_iter().map(Into::into).collect()))
}

#[post("/voter/elections/<election_id>/vote", data = "<ballot>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    ballot: Json<BallotSpec>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<VoteReceipt>> {
    let election = election_by_id(&elections, election_id).await?;
    let status = election.status();
    if !status.accepts_votes() {
        return Err(Error::bad_request(format!(
            "This election is {status} and is not accepting votes"
        )));
    }

    let candidate_filter = doc! { "_id": ballot.candidate_id, "election_id": election_id };
    if candidates.find_one(candidate_filter, None).await?.is_none() {
        return Err(Error::not_found("Candidate"));
    }

    let vote = Vote {
        id: Id::new(),
        vote: NewVote::new(token.id, election_id, ballot.candidate_id),
    };
    insert_vote(&votes, &vote).await?;
    info!("Vote {} cast in election {election_id}", vote.id);

    Ok(Json(vote.into()))
}

/// Insert a vote, reporting a second vote by the same voter in the same
/// election as [`Error::AlreadyVoted`].
pub(crate) async fn insert_vote(votes: &Coll<Vote>, vote: &Vote) -> Result<()> {
    match votes.insert_one(vote, None).await {
        Ok(_) => Ok(()),
        Err(e) if is_duplicate_key_error(&e) => Err(Error::AlreadyVoted {
            voter_id: vote.voter_id,
            election_id: vote.election_id,
        }),
        Err(e) => Err(e.into()),
    }
}

#[get("/voter/stats")]
async fn get_stats(token: AuthToken<Voter>, votes: Coll<Vote>) -> Result<Json<VoteStats>> {
    let total_votes = votes.count_documents(None, None).await?;
    let has_voted = votes
        .find_one(doc! { "voter_id": token.id }, None)
        .await?
        .is_some();
    Ok(Json(VoteStats {
        total_votes,
        has_voted,
    }))
}
