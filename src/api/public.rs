use chrono::Utc;
use mongodb::{bson::doc, Database};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{
            candidate::CandidateDescription,
            election::ElectionDescription,
            geography::{ConstituencyDescription, DistrictDescription, StateDescription},
            results::ElectionResults,
        },
        common::region::RegionFilter,
        db::{
            candidate::Candidate,
            election::Election,
            geography::{Constituency, District, State as Region},
        },
        mongodb::{Coll, Id},
    },
};

use super::common::{count_votes, election_by_id, find_all, load_geography};

pub fn routes() -> Vec<Route> {
    routes![
        get_states,
        get_districts,
        get_constituencies,
        get_candidates,
        get_results,
        get_election_results,
    ]
}

#[get("/states")]
async fn get_states(states: Coll<Region>) -> Result<Json<Vec<StateDescription>>> {
    let states = find_all(&states, None, doc! { "name": 1 }).await?;
    Ok(Json(states.into_iter().map(Into::into).collect()))
}

#[get("/states/<state_id>/districts")]
async fn get_districts(
    state_id: Id,
    districts: Coll<District>,
    db: &State<Database>,
) -> Result<Json<Vec<DistrictDescription>>> {
    let geography = load_geography(db).await?;
    let districts = find_all(&districts, doc! { "state_id": state_id }, doc! { "name": 1 }).await?;
    Ok(Json(
        districts
            .into_iter()
            .map(|d| DistrictDescription::new(d, &geography))
            .collect(),
    ))
}

#[get("/districts/<district_id>/constituencies")]
async fn get_constituencies(
    district_id: Id,
    constituencies: Coll<Constituency>,
    db: &State<Database>,
) -> Result<Json<Vec<ConstituencyDescription>>> {
    let geography = load_geography(db).await?;
    let filter = doc! { "district_id": district_id };
    let constituencies = find_all(&constituencies, filter, doc! { "name": 1 }).await?;
    Ok(Json(
        constituencies
            .into_iter()
            .map(|c| ConstituencyDescription::new(c, &geography))
            .collect(),
    ))
}

#[get("/elections/<election_id>/candidates?<constituency>")]
async fn get_candidates(
    election_id: Id,
    constituency: Option<Id>,
    candidates: Coll<Candidate>,
    db: &State<Database>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let mut filter = doc! { "election_id": election_id };
    if let Some(constituency) = constituency {
        filter.insert("constituency_id", constituency);
    }
    let geography = load_geography(db).await?;
    let candidates = find_all(&candidates, filter, doc! { "name": 1 }).await?;
    Ok(Json(
        candidates
            .into_iter()
            .map(|c| CandidateDescription::new(c, &geography))
            .collect(),
    ))
}

/// All elections, newest first, narrowed down by region.
#[get("/results/elections?<region..>")]
async fn get_results(
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

#[get("/results/elections/<election_id>")]
async fn get_election_results(
    election_id: Id,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionResults>> {
    let election = election_by_id(&elections, election_id).await?;
    let (results, _, _) = count_votes(db, election, Utc::now()).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::serde_json::{self, Value},
    };

    use crate::model::db::{
        candidate::NewCandidate,
        election::NewElection,
        geography::{
            ConstituencyCore, DistrictCore, NewConstituency, NewDistrict, NewState, StateCore,
        },
        vote::{NewVote, VoteCore},
    };

    use super::*;

    async fn get_json(client: &Client, uri: String) -> Value {
        let response = client.get(uri).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    struct Hierarchy {
        state: Region,
        district: District,
        constituency: Constituency,
    }

    async fn insert_hierarchy(db: &Database) -> Hierarchy {
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
        Coll::<Region>::from_db(db)
            .insert_one(&state, None)
            .await
            .unwrap();
        Coll::<District>::from_db(db)
            .insert_one(&district, None)
            .await
            .unwrap();
        Coll::<Constituency>::from_db(db)
            .insert_one(&constituency, None)
            .await
            .unwrap();
        Hierarchy {
            state,
            district,
            constituency,
        }
    }

    #[backend_test]
    async fn browse_geography(
        client: Client,
        db: Database,
        new_states: Coll<NewState>,
        new_districts: Coll<NewDistrict>,
        new_constituencies: Coll<NewConstituency>,
    ) {
        let h = insert_hierarchy(&db).await;
        new_states
            .insert_one(NewState::example2(), None)
            .await
            .unwrap();
        new_districts
            .insert_one(NewDistrict::example(Id::new()), None)
            .await
            .unwrap();
        new_constituencies
            .insert_one(NewConstituency::example(Id::new()), None)
            .await
            .unwrap();

        let states = get_json(&client, uri!(get_states).to_string()).await;
        let names: Vec<_> = states
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Karnataka", "Kerala"]);

        let districts = get_json(&client, uri!(get_districts(h.state.id)).to_string()).await;
        assert_eq!(districts.as_array().unwrap().len(), 1);
        assert_eq!(districts[0]["id"], h.district.id.to_hex());
        assert_eq!(districts[0]["state_name"], "Karnataka");

        let constituencies =
            get_json(&client, uri!(get_constituencies(h.district.id)).to_string()).await;
        assert_eq!(constituencies.as_array().unwrap().len(), 1);
        assert_eq!(constituencies[0]["id"], h.constituency.id.to_hex());
        assert_eq!(constituencies[0]["district_name"], "Mysuru");
    }

    #[backend_test]
    async fn candidates_by_constituency(
        client: Client,
        db: Database,
        new_candidates: Coll<NewCandidate>,
    ) {
        let h = insert_hierarchy(&db).await;
        let election_id = Id::new();
        let scoped = NewCandidate {
            constituency_id: Some(h.constituency.id),
            ..NewCandidate::example(election_id)
        };
        new_candidates.insert_one(&scoped, None).await.unwrap();
        new_candidates
            .insert_one(NewCandidate::example2(election_id), None)
            .await
            .unwrap();
        new_candidates
            .insert_one(NewCandidate::example(Id::new()), None)
            .await
            .unwrap();

        let all = get_json(&client, uri!(get_candidates(election_id, _)).to_string()).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(all[0]["name"], "Alice Appleby");
        assert_eq!(all[0]["region"]["state_name"], "Karnataka");
        assert_eq!(all[1]["region"], Value::Null);

        let uri = uri!(get_candidates(election_id, Some(h.constituency.id))).to_string();
        let scoped = get_json(&client, uri).await;
        assert_eq!(scoped.as_array().unwrap().len(), 1);
    }

    #[backend_test]
    async fn results_filtered_by_region(client: Client, db: Database, elections: Coll<Election>) {
        let h = insert_hierarchy(&db).await;
        let nationwide = Election {
            id: Id::new(),
            election: NewElection::example(),
        };
        let local = Election {
            id: Id::new(),
            election: NewElection {
                constituency_id: Some(h.constituency.id),
                ..NewElection::example_closed()
            },
        };
        elections.insert_one(&nationwide, None).await.unwrap();
        elections.insert_one(&local, None).await.unwrap();

        // Newest first.
        let all = get_json(&client, "/results/elections".to_string()).await;
        let ids: Vec<_> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec![nationwide.id.to_hex(), local.id.to_hex()]);
        assert_eq!(all[1]["status"], "closed");
        assert_eq!(all[1]["region"]["constituency_name"], "Chamundeshwari");

        // Nationwide elections are always shown.
        let other_state = get_json(&client, format!("/results/elections?state={}", Id::new())).await;
        assert_eq!(other_state.as_array().unwrap().len(), 1);
        assert_eq!(other_state[0]["id"], nationwide.id.to_hex());

        let this_state = get_json(&client, format!("/results/elections?state={}", h.state.id)).await;
        assert_eq!(this_state.as_array().unwrap().len(), 2);

        // A stale district is dropped rather than matching nothing.
        let stale = format!(
            "/results/elections?state={}&district={}",
            h.state.id,
            Id::new()
        );
        assert_eq!(get_json(&client, stale).await.as_array().unwrap().len(), 2);
    }

    #[backend_test]
    async fn election_results(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        new_votes: Coll<NewVote>,
    ) {
        let election = Election {
            id: Id::new(),
            election: NewElection::example(),
        };
        elections.insert_one(&election, None).await.unwrap();
        let alice = Candidate {
            id: Id::new(),
            candidate: NewCandidate::example(election.id),
        };
        let bob = Candidate {
            id: Id::new(),
            candidate: NewCandidate::example2(election.id),
        };
        candidates.insert_one(&alice, None).await.unwrap();
        candidates.insert_one(&bob, None).await.unwrap();
        for candidate in [&bob, &alice, &bob] {
            let vote = VoteCore::new(Id::new(), election.id, candidate.id);
            new_votes.insert_one(vote, None).await.unwrap();
        }

        let results = get_json(
            &client,
            uri!(get_election_results(election.id)).to_string(),
        )
        .await;
        assert_eq!(results["total_votes"], 3);
        assert_eq!(results["leader"]["name"], "Bob Bramley");
        assert_eq!(results["leader"]["party"], "Independent");
        assert_eq!(results["candidates"][0]["votes"], 2);
        assert_eq!(results["candidates"][0]["percentage"], 66.7);
        assert_eq!(results["candidates"][1]["name"], "Alice Appleby");
        assert_eq!(results["election"]["status"], "open");

        let response = client
            .get(uri!(get_election_results(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
