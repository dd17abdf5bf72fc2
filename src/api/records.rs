//! Administrator access to individual votes.

use std::collections::HashMap;

use chrono::Utc;
use mongodb::{bson::doc, Database};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            geography::RegionDescription,
            pagination::{Paginated, Pagination},
            results::{DetailedResults, VoteDetail},
            vote::{voter_label, VoteReceipt, VoteRecord, VoteRecordSpec},
        },
        common::{
            region::RegionFilter,
            tally::{INDEPENDENT, UNKNOWN_CANDIDATE},
        },
        db::{
            candidate::Candidate,
            election::Election,
            profile::{Profile, ProfileCore},
            vote::{NewVote, Vote},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

use super::{
    common::{
        candidates_by_id, count_votes, election_by_id, emails_by_id, find_all, load_geography,
    },
    voter::insert_vote,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_votes,
        create_vote,
        modify_vote,
        delete_vote,
        get_detailed_results,
    ]
}

/// Resolve a vote record to the voter, election and candidate it names.
///
/// Unlike voters, administrators may record votes outside the voting window,
/// but the candidate must still stand in the election.
async fn resolve_record(spec: &VoteRecordSpec, db: &Database) -> Result<NewVote> {
    let email = spec.user_email.trim().to_lowercase();
    let voter = Coll::<Profile>::from_db(db)
        .find_one(ProfileCore::with_email(&email), None)
        .await?
        .ok_or_else(|| {
            Error::Status(Status::NotFound, "User not found with this email".to_string())
        })?;
    election_by_id(&Coll::<Election>::from_db(db), spec.election_id).await?;
    let candidate_filter = doc! { "_id": spec.candidate_id, "election_id": spec.election_id };
    Coll::<Candidate>::from_db(db)
        .find_one(candidate_filter, None)
        .await?
        .ok_or_else(|| Error::not_found("Candidate"))?;

    Ok(NewVote::new(voter.id, spec.election_id, spec.candidate_id))
}

/// Every vote, newest first, optionally narrowed down to one election and to
/// the region of the candidate voted for.
#[get("/admin/votes?<election>&<region..>")]
async fn get_votes(
    _token: AuthToken<Admin>,
    election: Option<Id>,
    region: RegionFilter,
    pagination: Pagination,
    votes: Coll<Vote>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    profiles: Coll<Profile>,
    db: &State<Database>,
) -> Result<Json<Paginated<VoteRecord>>> {
    let geography = load_geography(db).await?;
    let region = region.normalized(&geography);

    let filter = election.map(|id| doc! { "election_id": id });
    let votes = find_all(&votes, filter, doc! { "voted_at": -1 }).await?;
    let candidates = candidates_by_id(&candidates, None).await?;
    let titles = find_all(&elections, None, doc! {})
        .await?
        .into_iter()
        .map(|e| (e.id, e.election.title))
        .collect::<HashMap<_, _>>();
    let emails = emails_by_id(&profiles, votes.iter().map(|v| v.voter_id)).await?;

    let records = votes
        .into_iter()
        .filter_map(|vote| {
            let candidate = candidates.get(&vote.candidate_id);
            let constituency = candidate.and_then(|c| c.constituency_id);
            if !region.admits_record(constituency, &geography) {
                return None;
            }
            Some(VoteRecord {
                id: vote.id.into(),
                voter_id: vote.voter_id.into(),
                voter: voter_label(emails.get(&vote.voter_id).map(String::as_str), vote.voter_id),
                election_id: vote.election_id.into(),
                election_title: titles.get(&vote.election_id).cloned(),
                candidate_id: vote.candidate_id.into(),
                candidate_name: candidate.map(|c| c.name.clone()),
                candidate_party: candidate.and_then(|c| c.party.clone()),
                region: RegionDescription::of(constituency, &geography),
                voted_at: vote.voted_at,
            })
        })
        .collect();

    Ok(Json(pagination.page(records)))
}

#[post("/admin/votes", data = "<spec>", format = "json")]
async fn create_vote(
    _token: AuthToken<Admin>,
    spec: Json<VoteRecordSpec>,
    votes: Coll<Vote>,
    db: &State<Database>,
) -> Result<Json<VoteReceipt>> {
    let vote = Vote {
        id: Id::new(),
        vote: resolve_record(&spec, db).await?,
    };
    insert_vote(&votes, &vote).await?;
    info!("Recorded vote {} in election {}", vote.id, vote.election_id);

    Ok(Json(vote.into()))
}

/// Point an existing vote at a different voter, election or candidate. The
/// original time of voting is kept.
#[put("/admin/votes/<vote_id>", data = "<spec>", format = "json")]
async fn modify_vote(
    _token: AuthToken<Admin>,
    vote_id: Id,
    spec: Json<VoteRecordSpec>,
    votes: Coll<Vote>,
    db: &State<Database>,
) -> Result<Json<VoteReceipt>> {
    let existing = votes
        .find_one(vote_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("Vote"))?;
    let vote = Vote {
        id: vote_id,
        vote: NewVote {
            voted_at: existing.voted_at,
            ..resolve_record(&spec, db).await?
        },
    };

    match votes.replace_one(vote_id.as_doc(), &vote, None).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::AlreadyVoted {
                voter_id: vote.voter_id,
                election_id: vote.election_id,
            });
        }
        Err(e) => return Err(e.into()),
    }
    info!("Modified vote {vote_id}");

    Ok(Json(vote.into()))
}

#[delete("/admin/votes/<vote_id>")]
async fn delete_vote(_token: AuthToken<Admin>, vote_id: Id, votes: Coll<Vote>) -> Result<()> {
    let result = votes.delete_one(vote_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found("Vote"));
    }
    info!("Deleted vote {vote_id}");
    Ok(())
}

/// Results of an election together with every vote behind them.
#[get("/admin/elections/<election_id>/results")]
async fn get_detailed_results(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
    profiles: Coll<Profile>,
    db: &State<Database>,
) -> Result<Json<DetailedResults>> {
    let election = election_by_id(&elections, election_id).await?;
    let (results, votes, candidates) = count_votes(db, election, Utc::now()).await?;
    let emails = emails_by_id(&profiles, votes.iter().map(|v| v.voter_id)).await?;

    let votes = votes
        .into_iter()
        .map(|vote| {
            let candidate = candidates.get(&vote.candidate_id);
            VoteDetail {
                id: vote.id.into(),
                voter: voter_label(emails.get(&vote.voter_id).map(String::as_str), vote.voter_id),
                candidate_name: candidate
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string()),
                candidate_party: candidate
                    .and_then(|c| c.party.clone())
                    .unwrap_or_else(|| INDEPENDENT.to_string()),
                voted_at: vote.voted_at,
            }
        })
        .collect();

    Ok(Json(DetailedResults { results, votes }))
}
