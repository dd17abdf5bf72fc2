use chrono::Utc;
use mongodb::{bson::doc, Client, Database};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminDescription, AdminGrant},
            auth::{Admin, AuthToken},
            candidate::{CandidateDescription, CandidateSpec},
            election::{ElectionDescription, ElectionSpec},
        },
        common::region::RegionFilter,
        db::{
            candidate::{Candidate, NewCandidate},
            election::Election,
            geography::Constituency,
            profile::{Profile, ProfileCore},
            role::{NewRoleGrant, RoleGrant, RoleGrantCore},
            vote::Vote,
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

use super::common::{election_by_id, find_all, load_geography};

pub fn routes() -> Vec<Route> {
    routes![
        get_elections,
        create_election,
        modify_election,
        toggle_election,
        delete_election,
        get_candidates,
        create_candidate,
        modify_candidate,
        delete_candidate,
        get_admins,
        grant_admin,
        revoke_admin,
    ]
}

/// Fail with 404 unless the given constituency exists.
async fn check_constituency(db: &Database, constituency_id: Option<Id>) -> Result<()> {
    if let Some(id) = constituency_id {
        Coll::<Constituency>::from_db(db)
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found("Constituency"))?;
    }
    Ok(())
}

/// All elections, newest first, narrowed down by region.
#[get("/admin/elections?<region..>")]
async fn get_elections(
    _token: AuthToken<Admin>,
    region: RegionFilter,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let geography = load_geography(db).await?;
    let region = region.normalized(&geography);
    let now = Utc::now();
    let elections = find_all(&elections, None, doc! { "created_at": -1 }).await?;
    Ok(Json(
        elections
            .into_iter()
            .filter(|e| region.admits_scope(e.constituency_id, &geography))
            .map(|e| ElectionDescription::new(e, &geography, now))
            .collect(),
    ))
}

#[post("/admin/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    spec.validate()?;
    check_constituency(db, spec.constituency_id).await?;

    let now = Utc::now();
    let election = Election {
        id: Id::new(),
        election: spec.0.into_election(now),
    };
    elections.insert_one(&election, None).await?;
    info!("Created election {} ({})", election.id, election.title);

    let geography = load_geography(db).await?;
    Ok(Json(ElectionDescription::new(election, &geography, now)))
}

#[put("/admin/elections/<election_id>", data = "<spec>", format = "json")]
async fn modify_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    spec.validate()?;
    check_constituency(db, spec.constituency_id).await?;
    let existing = election_by_id(&elections, election_id).await?;

    // Replace with the new spec, keeping the creation time.
    let election = Election {
        id: election_id,
        election: spec.0.into_election(existing.created_at),
    };
    elections
        .replace_one(election_id.as_doc(), &election, None)
        .await?;

    let geography = load_geography(db).await?;
    Ok(Json(ElectionDescription::new(election, &geography, Utc::now())))
}

/// Flip the active flag of an election.
#[post("/admin/elections/<election_id>/toggle")]
async fn toggle_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let mut election = election_by_id(&elections, election_id).await?;
    election.is_active = !election.is_active;
    let update = doc! { "$set": { "is_active": election.is_active } };
    elections
        .update_one(election_id.as_doc(), update, None)
        .await?;
    info!(
        "Election {election_id} is now {}",
        if election.is_active { "active" } else { "inactive" }
    );

    let geography = load_geography(db).await?;
    Ok(Json(ElectionDescription::new(election, &geography, Utc::now())))
}

#[delete("/admin/elections/<election_id>")]
async fn delete_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<()> {
    // Atomically delete the election and everything cast or standing in it.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = elections
        .delete_one_with_session(election_id.as_doc(), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found("Election"));
    }

    let filter = doc! { "election_id": election_id };
    let deleted_votes = votes
        .delete_many_with_session(filter.clone(), None, &mut session)
        .await?
        .deleted_count;
    let deleted_candidates = candidates
        .delete_many_with_session(filter, None, &mut session)
        .await?
        .deleted_count;

    session.commit_transaction().await?;
    info!(
        "Deleted election {election_id} with {deleted_candidates} candidates and {deleted_votes} votes"
    );
    Ok(())
}

/// Candidates, optionally of one election, narrowed down by region. Once a
/// region is selected, candidates without one are hidden.
#[get("/admin/candidates?<election>&<region..>")]
async fn get_candidates(
    _token: AuthToken<Admin>,
    election: Option<Id>,
    region: RegionFilter,
    candidates: Coll<Candidate>,
    db: &State<Database>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let geography = load_geography(db).await?;
    let region = region.normalized(&geography);
    let filter = election.map(|id| doc! { "election_id": id });
    let candidates = find_all(&candidates, filter, doc! { "name": 1 }).await?;
    Ok(Json(
        candidates
            .into_iter()
            .filter(|c| region.admits_record(c.constituency_id, &geography))
            .map(|c| CandidateDescription::new(c, &geography))
            .collect(),
    ))
}

/// Validate a candidate spec against the database.
async fn check_candidate(spec: CandidateSpec, db: &Database) -> Result<NewCandidate> {
    let candidate = NewCandidate::try_from(spec)?;
    election_by_id(&Coll::from_db(db), candidate.election_id).await?;
    check_constituency(db, candidate.constituency_id).await?;
    Ok(candidate)
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    candidates: Coll<Candidate>,
    db: &State<Database>,
) -> Result<Json<CandidateDescription>> {
    let candidate = Candidate {
        id: Id::new(),
        candidate: check_candidate(spec.0, db).await?,
    };
    candidates.insert_one(&candidate, None).await?;

    let geography = load_geography(db).await?;
    Ok(Json(CandidateDescription::new(candidate, &geography)))
}

#[put("/admin/candidates/<candidate_id>", data = "<spec>", format = "json")]
async fn modify_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    spec: Json<CandidateSpec>,
    candidates: Coll<Candidate>,
    db: &State<Database>,
) -> Result<Json<CandidateDescription>> {
    let candidate = Candidate {
        id: candidate_id,
        candidate: check_candidate(spec.0, db).await?,
    };
    let result = candidates
        .replace_one(candidate_id.as_doc(), &candidate, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found("Candidate"));
    }

    let geography = load_geography(db).await?;
    Ok(Json(CandidateDescription::new(candidate, &geography)))
}

#[delete("/admin/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = candidates
        .delete_one_with_session(candidate_id.as_doc(), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found("Candidate"));
    }
    let deleted_votes = votes
        .delete_many_with_session(doc! { "candidate_id": candidate_id }, None, &mut session)
        .await?
        .deleted_count;

    session.commit_transaction().await?;
    info!("Deleted candidate {candidate_id} and {deleted_votes} votes cast for them");
    Ok(())
}

#[get("/admin/admins")]
async fn get_admins(
    _token: AuthToken<Admin>,
    grants: Coll<RoleGrant>,
    profiles: Coll<Profile>,
) -> Result<Json<Vec<AdminDescription>>> {
    let admin_ids = find_all(&grants, RoleGrantCore::any_admin(), doc! {})
        .await?
        .into_iter()
        .map(|grant| grant.user_id)
        .collect::<Vec<_>>();
    let admins = find_all(
        &profiles,
        doc! { "_id": { "$in": admin_ids } },
        doc! { "email": 1 },
    )
    .await?;
    Ok(Json(admins.into_iter().map(Into::into).collect()))
}

#[post("/admin/admins", data = "<grant>", format = "json")]
async fn grant_admin(
    _token: AuthToken<Admin>,
    grant: Json<AdminGrant>,
    profiles: Coll<Profile>,
    new_grants: Coll<NewRoleGrant>,
) -> Result<Json<AdminDescription>> {
    let email = grant.email.trim().to_lowercase();
    let profile = profiles
        .find_one(ProfileCore::with_email(&email), None)
        .await?
        .ok_or_else(|| Error::not_found("User with this email"))?;

    match new_grants
        .insert_one(NewRoleGrant::admin(profile.id), None)
        .await
    {
        Ok(_) => {}
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::bad_request(format!("{email} is already an admin")));
        }
        Err(e) => return Err(e.into()),
    }
    info!("Granted admin rights to {email}");
    Ok(Json(profile.into()))
}

#[delete("/admin/admins/<user_id>")]
async fn revoke_admin(
    _token: AuthToken<Admin>,
    user_id: Id,
    grants: Coll<RoleGrant>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = grants
        .delete_one_with_session(RoleGrantCore::admin_filter(user_id), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found("Admin"));
    }

    // Writing to every remaining grant makes concurrent revocations conflict,
    // so two of them can never both see the other's admin as still present.
    let remaining = grants
        .update_many_with_session(
            RoleGrantCore::any_admin(),
            doc! { "$currentDate": { "checked_at": true } },
            None,
            &mut session,
        )
        .await?
        .matched_count;
    if remaining == 0 {
        session.abort_transaction().await?;
        return Err(Error::Status(
            Status::UnprocessableEntity,
            "Cannot remove the last admin".to_string(),
        ));
    }

    session.commit_transaction().await?;
    info!("Revoked admin rights of {user_id}, {remaining} admins remain");
    Ok(())
}
