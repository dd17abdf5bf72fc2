use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::id::ApiId,
        common::region::{Geography, RegionPath},
        db::geography::{
            Constituency, District, NewConstituency, NewDistrict, NewState, State,
        },
        mongodb::Id,
    },
};

fn required(value: String, what: &str) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(Error::bad_request(format!("{what} is required")));
    }
    Ok(value)
}

/// A request to create or rename a state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    pub code: String,
}

impl TryFrom<StateSpec> for NewState {
    type Error = Error;

    /// Trims both fields and upper-cases the code.
    fn try_from(spec: StateSpec) -> Result<Self> {
        Ok(Self {
            name: required(spec.name, "State name")?,
            code: required(spec.code, "State code")?.to_uppercase(),
        })
    }
}

/// A request to create or modify a district.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictSpec {
    pub state_id: Id,
    pub name: String,
}

impl TryFrom<DistrictSpec> for NewDistrict {
    type Error = Error;

    fn try_from(spec: DistrictSpec) -> Result<Self> {
        Ok(Self {
            state_id: spec.state_id,
            name: required(spec.name, "District name")?,
        })
    }
}

/// A request to create or modify a constituency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituencySpec {
    pub district_id: Id,
    pub name: String,
}

impl TryFrom<ConstituencySpec> for NewConstituency {
    type Error = Error;

    fn try_from(spec: ConstituencySpec) -> Result<Self> {
        Ok(Self {
            district_id: spec.district_id,
            name: required(spec.name, "Constituency name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateDescription {
    pub id: ApiId,
    pub name: String,
    pub code: String,
}

impl From<State> for StateDescription {
    fn from(state: State) -> Self {
        Self {
            id: state.id.into(),
            name: state.state.name,
            code: state.state.code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictDescription {
    pub id: ApiId,
    pub state_id: ApiId,
    pub name: String,
    pub state_name: Option<String>,
}

impl DistrictDescription {
    pub fn new(district: District, geography: &Geography) -> Self {
        Self {
            id: district.id.into(),
            state_id: district.state_id.into(),
            state_name: geography.state_name(district.state_id).map(str::to_string),
            name: district.district.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstituencyDescription {
    pub id: ApiId,
    pub district_id: ApiId,
    pub name: String,
    pub district_name: Option<String>,
    pub state_id: Option<ApiId>,
    pub state_name: Option<String>,
}

impl ConstituencyDescription {
    pub fn new(constituency: Constituency, geography: &Geography) -> Self {
        let district_id = constituency.district_id;
        let state_id = geography.state_of(district_id);
        Self {
            id: constituency.id.into(),
            district_id: district_id.into(),
            name: constituency.constituency.name,
            district_name: geography.district_name(district_id).map(str::to_string),
            state_id: state_id.map(ApiId::from),
            state_name: state_id
                .and_then(|id| geography.state_name(id))
                .map(str::to_string),
        }
    }
}

/// Where an election, candidate or vote is scoped, with display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionDescription {
    pub state_id: Option<ApiId>,
    pub state_name: Option<String>,
    pub district_id: Option<ApiId>,
    pub district_name: Option<String>,
    pub constituency_id: ApiId,
    pub constituency_name: String,
}

impl RegionDescription {
    /// Describe the given constituency, if it still exists.
    pub fn of(constituency: Option<Id>, geography: &Geography) -> Option<Self> {
        constituency
            .and_then(|id| geography.path(id))
            .map(Self::from)
    }
}

impl From<RegionPath> for RegionDescription {
    fn from(path: RegionPath) -> Self {
        Self {
            state_id: path.state_id.map(ApiId::from),
            state_name: path.state_name,
            district_id: path.district_id.map(ApiId::from),
            district_name: path.district_name,
            constituency_id: path.constituency_id.into(),
            constituency_name: path.constituency_name,
        }
    }
}
