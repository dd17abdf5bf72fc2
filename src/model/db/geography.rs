//! The geographic hierarchy: states contain districts, which contain
//! constituencies.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core state data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCore {
    pub name: String,
    /// Short unique code, e.g. `KA`.
    pub code: String,
}

/// A state without an ID.
pub type NewState = StateCore;

/// A state from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub state: StateCore,
}

impl Deref for State {
    type Target = StateCore;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for State {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

/// Core district data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictCore {
    pub state_id: Id,
    pub name: String,
}

/// A district without an ID.
pub type NewDistrict = DistrictCore;

/// A district from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub district: DistrictCore,
}

impl Deref for District {
    type Target = DistrictCore;

    fn deref(&self) -> &Self::Target {
        &self.district
    }
}

impl DerefMut for District {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.district
    }
}

/// Core constituency data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstituencyCore {
    pub district_id: Id,
    pub name: String,
}

/// A constituency without an ID.
pub type NewConstituency = ConstituencyCore;

/// A constituency from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituency {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub constituency: ConstituencyCore,
}

impl Deref for Constituency {
    type Target = ConstituencyCore;

    fn deref(&self) -> &Self::Target {
        &self.constituency
    }
}

impl DerefMut for Constituency {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.constituency
    }
}
