//! Administration of the state → district → constituency hierarchy.

use mongodb::{bson::doc, Client, ClientSession, Database};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            geography::{
                ConstituencyDescription, ConstituencySpec, DistrictDescription, DistrictSpec,
                StateDescription, StateSpec,
            },
        },
        common::region::RegionFilter,
        db::{
            candidate::Candidate,
            election::Election,
            geography::{
                Constituency, District, NewConstituency, NewDistrict, NewState, State as Region,
            },
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

use super::common::{find_all, load_geography};

pub fn routes() -> Vec<Route> {
    routes![
        get_states,
        create_state,
        modify_state,
        delete_state,
        get_districts,
        create_district,
        modify_district,
        delete_district,
        get_constituencies,
        create_constituency,
        modify_constituency,
        delete_constituency,
    ]
}

fn duplicate_code(err: mongodb::error::Error, code: &str) -> Error {
    if is_duplicate_key_error(&err) {
        Error::bad_request(format!("A state with code {code} already exists"))
    } else {
        err.into()
    }
}

async fn check_state(db: &Database, state_id: Id) -> Result<()> {
    Coll::<Region>::from_db(db)
        .find_one(state_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("State"))?;
    Ok(())
}

async fn check_district(db: &Database, district_id: Id) -> Result<()> {
    Coll::<District>::from_db(db)
        .find_one(district_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("District"))?;
    Ok(())
}

/// Delete the given constituencies, and clear every election and candidate
/// reference to them so they become unscoped.
async fn remove_constituencies(
    db: &Database,
    ids: Vec<Id>,
    session: &mut ClientSession,
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let scoped = doc! { "constituency_id": { "$in": ids.clone() } };
    let unscope = doc! { "$set": { "constituency_id": null } };
    Coll::<Election>::from_db(db)
        .update_many_with_session(scoped.clone(), unscope.clone(), None, session)
        .await?;
    Coll::<Candidate>::from_db(db)
        .update_many_with_session(scoped, unscope, None, session)
        .await?;
    let result = Coll::<Constituency>::from_db(db)
        .delete_many_with_session(doc! { "_id": { "$in": ids } }, None, session)
        .await?;
    Ok(result.deleted_count)
}

/// IDs of every constituency in the given districts.
async fn constituencies_of(
    db: &Database,
    district_ids: Vec<Id>,
    session: &mut ClientSession,
) -> Result<Vec<Id>> {
    let filter = doc! { "district_id": { "$in": district_ids } };
    let mut cursor = Coll::<Constituency>::from_db(db)
        .find_with_session(filter, None, session)
        .await?;
    let constituencies: Vec<Constituency> = cursor.stream(session).try_collect().await?;
    Ok(constituencies.into_iter().map(|c| c.id).collect())
}

#[get("/admin/states")]
async fn get_states(
    _token: AuthToken<Admin>,
    states: Coll<Region>,
) -> Result<Json<Vec<StateDescription>>> {
    let states = find_all(&states, None, doc! { "name": 1 }).await?;
    Ok(Json(states.into_iter().map(Into::into).collect()))
}

#[post("/admin/states", data = "<spec>", format = "json")]
async fn create_state(
    _token: AuthToken<Admin>,
    spec: Json<StateSpec>,
    states: Coll<Region>,
) -> Result<Json<StateDescription>> {
    let state = Region {
        id: Id::new(),
        state: NewState::try_from(spec.0)?,
    };
    states
        .insert_one(&state, None)
        .await
        .map_err(|e| duplicate_code(e, &state.code))?;
    Ok(Json(state.into()))
}

#[put("/admin/states/<state_id>", data = "<spec>", format = "json")]
async fn modify_state(
    _token: AuthToken<Admin>,
    state_id: Id,
    spec: Json<StateSpec>,
    states: Coll<Region>,
) -> Result<Json<StateDescription>> {
    let state = Region {
        id: state_id,
        state: NewState::try_from(spec.0)?,
    };
    let result = states
        .replace_one(state_id.as_doc(), &state, None)
        .await
        .map_err(|e| duplicate_code(e, &state.code))?;
    if result.matched_count == 0 {
        return Err(Error::not_found("State"));
    }
    Ok(Json(state.into()))
}

#[delete("/admin/states/<state_id>")]
async fn delete_state(
    _token: AuthToken<Admin>,
    state_id: Id,
    states: Coll<Region>,
    districts: Coll<District>,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = states
        .delete_one_with_session(state_id.as_doc(), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found("State"));
    }

    let mut cursor = districts
        .find_with_session(doc! { "state_id": state_id }, None, &mut session)
        .await?;
    let district_ids: Vec<Id> = cursor
        .stream(&mut session)
        .try_collect::<Vec<District>>()
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();
    let constituency_ids = constituencies_of(db, district_ids, &mut session).await?;
    let deleted_constituencies = remove_constituencies(db, constituency_ids, &mut session).await?;
    let deleted_districts = districts
        .delete_many_with_session(doc! { "state_id": state_id }, None, &mut session)
        .await?
        .deleted_count;

    session.commit_transaction().await?;
    info!(
        "Deleted state {state_id} with {deleted_districts} districts and {deleted_constituencies} constituencies"
    );
    Ok(())
}

/// Districts, optionally of one state.
#[get("/admin/districts?<state>")]
async fn get_districts(
    _token: AuthToken<Admin>,
    state: Option<Id>,
    districts: Coll<District>,
    db: &State<Database>,
) -> Result<Json<Vec<DistrictDescription>>> {
    let geography = load_geography(db).await?;
    let filter = state.map(|id| doc! { "state_id": id });
    let districts = find_all(&districts, filter, doc! { "name": 1 }).await?;
    Ok(Json(
        districts
            .into_iter()
            .map(|d| DistrictDescription::new(d, &geography))
            .collect(),
    ))
}

#[post("/admin/districts", data = "<spec>", format = "json")]
async fn create_district(
    _token: AuthToken<Admin>,
    spec: Json<DistrictSpec>,
    districts: Coll<District>,
    db: &State<Database>,
) -> Result<Json<DistrictDescription>> {
    let district = District {
        id: Id::new(),
        district: NewDistrict::try_from(spec.0)?,
    };
    check_state(db, district.state_id).await?;
    districts.insert_one(&district, None).await?;

    let geography = load_geography(db).await?;
    Ok(Json(DistrictDescription::new(district, &geography)))
}

#[put("/admin/districts/<district_id>", data = "<spec>", format = "json")]
async fn modify_district(
    _token: AuthToken<Admin>,
    district_id: Id,
    spec: Json<DistrictSpec>,
    districts: Coll<District>,
    db: &State<Database>,
) -> Result<Json<DistrictDescription>> {
    let district = District {
        id: district_id,
        district: NewDistrict::try_from(spec.0)?,
    };
    check_state(db, district.state_id).await?;
    let result = districts
        .replace_one(district_id.as_doc(), &district, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found("District"));
    }

    let geography = load_geography(db).await?;
    Ok(Json(DistrictDescription::new(district, &geography)))
}

#[delete("/admin/districts/<district_id>")]
async fn delete_district(
    _token: AuthToken<Admin>,
    district_id: Id,
    districts: Coll<District>,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = districts
        .delete_one_with_session(district_id.as_doc(), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found("District"));
    }
    let constituency_ids = constituencies_of(db, vec![district_id], &mut session).await?;
    let deleted = remove_constituencies(db, constituency_ids, &mut session).await?;

    session.commit_transaction().await?;
    info!("Deleted district {district_id} with {deleted} constituencies");
    Ok(())
}

/// Constituencies, narrowed down by state and district, with the names of
/// both.
#[get("/admin/constituencies?<region..>")]
async fn get_constituencies(
    _token: AuthToken<Admin>,
    region: RegionFilter,
    constituencies: Coll<Constituency>,
    db: &State<Database>,
) -> Result<Json<Vec<ConstituencyDescription>>> {
    let geography = load_geography(db).await?;
    let region = region.normalized(&geography);
    let constituencies = find_all(&constituencies, None, doc! { "name": 1 }).await?;
    Ok(Json(
        constituencies
            .into_iter()
            .filter(|c| region.admits_record(Some(c.id), &geography))
            .map(|c| ConstituencyDescription::new(c, &geography))
            .collect(),
    ))
}

#[post("/admin/constituencies", data = "<spec>", format = "json")]
async fn create_constituency(
    _token: AuthToken<Admin>,
    spec: Json<ConstituencySpec>,
    constituencies: Coll<Constituency>,
    db: &State<Database>,
) -> Result<Json<ConstituencyDescription>> {
    let constituency = Constituency {
        id: Id::new(),
        constituency: NewConstituency::try_from(spec.0)?,
    };
    check_district(db, constituency.district_id).await?;
    constituencies.insert_one(&constituency, None).await?;

    let geography = load_geography(db).await?;
    Ok(Json(ConstituencyDescription::new(constituency, &geography)))
}

#[put("/admin/constituencies/<constituency_id>", data = "<spec>", format = "json")]
async fn modify_constituency(
    _token: AuthToken<Admin>,
    constituency_id: Id,
    spec: Json<ConstituencySpec>,
    constituencies: Coll<Constituency>,
    db: &State<Database>,
) -> Result<Json<ConstituencyDescription>> {
    let constituency = Constituency {
        id: constituency_id,
        constituency: NewConstituency::try_from(spec.0)?,
    };
    check_district(db, constituency.district_id).await?;
    let result = constituencies
        .replace_one(constituency_id.as_doc(), &constituency, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found("Constituency"));
    }

    let geography = load_geography(db).await?;
    Ok(Json(ConstituencyDescription::new(constituency, &geography)))
}

#[delete("/admin/constituencies/<constituency_id>")]
async fn delete_constituency(
    _token: AuthToken<Admin>,
    constituency_id: Id,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let deleted = remove_constituencies(db, vec![constituency_id], &mut session).await?;
    if deleted == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found("Constituency"));
    }

    session.commit_transaction().await?;
    info!("Deleted constituency {constituency_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json, Value},
    };

    use crate::model::db::{
        candidate::NewCandidate,
        election::NewElection,
        geography::{ConstituencyCore, DistrictCore, StateCore},
    };

    use super::*;

    async fn post_json(client: &Client, uri: String, body: Value) -> (Status, Value) {
        let response = client
            .post(uri)
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        let status = response.status();
        let text = response.into_string().await.unwrap_or_default();
        (status, serde_json::from_str(&text).unwrap_or_default())
    }

    #[backend_test(admin)]
    async fn create_hierarchy(client: Client) {
        let (status, state) =
            post_json(&client, uri!(create_state).to_string(), json!(StateSpec::example())).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(state["code"], "TN");

        // Codes are unique.
        let (status, body) =
            post_json(&client, uri!(create_state).to_string(), json!(StateSpec::example())).await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!(body["error"], "A state with code TN already exists");

        // Districts need an existing state.
        let (status, _) = post_json(
            &client,
            uri!(create_district).to_string(),
            json!({ "state_id": Id::new().to_hex(), "name": "Chennai" }),
        )
        .await;
        assert_eq!(Status::NotFound, status);

        let (status, district) = post_json(
            &client,
            uri!(create_district).to_string(),
            json!({ "state_id": state["id"], "name": "Chennai" }),
        )
        .await;
        assert_eq!(Status::Ok, status);
        assert_eq!(district["state_name"], "Tamil Nadu");

        let (status, constituency) = post_json(
            &client,
            uri!(create_constituency).to_string(),
            json!({ "district_id": district["id"], "name": "Mylapore" }),
        )
        .await;
        assert_eq!(Status::Ok, status);
        assert_eq!(constituency["state_name"], "Tamil Nadu");
        assert_eq!(constituency["district_name"], "Chennai");

        let uri = format!("/admin/constituencies?state={}", state["id"].as_str().unwrap());
        let response = client.get(uri).dispatch().await;
        let listed: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let uri = format!("/admin/constituencies?state={}", Id::new());
        let response = client.get(uri).dispatch().await;
        let listed: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[backend_test(admin)]
    async fn delete_state_cascades(
        client: Client,
        states: Coll<Region>,
        districts: Coll<District>,
        constituencies: Coll<Constituency>,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
    ) {
        let state = Region {
            id: Id::new(),
            state: StateCore::example(),
        };
        let other_state = Region {
            id: Id::new(),
            state: StateCore::example2(),
        };
        let district = District {
            id: Id::new(),
            district: DistrictCore::example(state.id),
        };
        let other_district = District {
            id: Id::new(),
            district: DistrictCore::example(other_state.id),
        };
        let constituency = Constituency {
            id: Id::new(),
            constituency: ConstituencyCore::example(district.id),
        };
        let other_constituency = Constituency {
            id: Id::new(),
            constituency: ConstituencyCore::example(other_district.id),
        };
        states.insert_many([&state, &other_state], None).await.unwrap();
        districts.insert_many([&district, &other_district], None).await.unwrap();
        constituencies
            .insert_many([&constituency, &other_constituency], None)
            .await
            .unwrap();

        let election = Election {
            id: Id::new(),
            election: NewElection {
                constituency_id: Some(constituency.id),
                ..NewElection::example()
            },
        };
        elections.insert_one(&election, None).await.unwrap();
        let candidate = Candidate {
            id: Id::new(),
            candidate: NewCandidate {
                constituency_id: Some(constituency.id),
                ..NewCandidate::example(election.id)
            },
        };
        candidates.insert_one(&candidate, None).await.unwrap();

        let response = client.delete(uri!(delete_state(state.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        assert_eq!(states.count_documents(None, None).await.unwrap(), 1);
        assert_eq!(districts.count_documents(None, None).await.unwrap(), 1);
        let remaining = constituencies.find_one(None, None).await.unwrap().unwrap();
        assert_eq!(remaining.id, other_constituency.id);

        // References to the removed constituency are cleared, not deleted.
        let election = elections.find_one(election.id.as_doc(), None).await.unwrap().unwrap();
        assert_eq!(election.constituency_id, None);
        let candidate = candidates.find_one(candidate.id.as_doc(), None).await.unwrap().unwrap();
        assert_eq!(candidate.constituency_id, None);
    }

    #[backend_test(admin)]
    async fn delete_district_cascades(
        client: Client,
        states: Coll<Region>,
        districts: Coll<District>,
        constituencies: Coll<Constituency>,
    ) {
        let state = Region {
            id: Id::new(),
            state: StateCore::example(),
        };
        let district = District {
            id: Id::new(),
            district: DistrictCore::example(state.id),
        };
        let constituency = Constituency {
            id: Id::new(),
            constituency: ConstituencyCore::example(district.id),
        };
        states.insert_one(&state, None).await.unwrap();
        districts.insert_one(&district, None).await.unwrap();
        constituencies.insert_one(&constituency, None).await.unwrap();

        let response = client.delete(uri!(delete_district(district.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(states.count_documents(None, None).await.unwrap(), 1);
        assert_eq!(districts.count_documents(None, None).await.unwrap(), 0);
        assert_eq!(constituencies.count_documents(None, None).await.unwrap(), 0);

        let response = client.delete(uri!(delete_district(district.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client
            .delete(uri!(delete_constituency(constituency.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
