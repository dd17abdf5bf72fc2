//! The state → district → constituency hierarchy, and the cascading filters
//! used to browse elections, candidates and votes by region.

use std::collections::HashMap;

use rocket::FromForm;

use crate::model::{
    db::geography::{Constituency, District, State},
    mongodb::Id,
};

/// In-memory index of the whole geographic hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Geography {
    states: HashMap<Id, String>,
    districts: HashMap<Id, (Id, String)>,
    constituencies: HashMap<Id, (Id, String)>,
}

/// A constituency resolved to its ancestors. Ancestors are `None` if the
/// hierarchy is dangling (e.g. a district was removed mid-request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionPath {
    pub state_id: Option<Id>,
    pub state_name: Option<String>,
    pub district_id: Option<Id>,
    pub district_name: Option<String>,
    pub constituency_id: Id,
    pub constituency_name: String,
}

impl Geography {
    pub fn new(
        states: impl IntoIterator<Item = State>,
        districts: impl IntoIterator<Item = District>,
        constituencies: impl IntoIterator<Item = Constituency>,
    ) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|s| (s.id, s.state.name))
                .collect(),
            districts: districts
                .into_iter()
                .map(|d| (d.id, (d.district.state_id, d.district.name)))
                .collect(),
            constituencies: constituencies
                .into_iter()
                .map(|c| (c.id, (c.constituency.district_id, c.constituency.name)))
                .collect(),
        }
    }

    /// The state a district belongs to.
    pub fn state_of(&self, district: Id) -> Option<Id> {
        self.districts.get(&district).map(|(state, _)| *state)
    }

    /// The district a constituency belongs to.
    pub fn district_of(&self, constituency: Id) -> Option<Id> {
        self.constituencies
            .get(&constituency)
            .map(|(district, _)| *district)
    }

    pub fn state_name(&self, state: Id) -> Option<&str> {
        self.states.get(&state).map(String::as_str)
    }

    pub fn district_name(&self, district: Id) -> Option<&str> {
        self.districts.get(&district).map(|(_, name)| name.as_str())
    }

    /// Resolve a constituency to its full path, if it exists.
    pub fn path(&self, constituency: Id) -> Option<RegionPath> {
        let (district_id, constituency_name) = self.constituencies.get(&constituency)?;
        let district = self.districts.get(district_id);
        let state_id = district.map(|(state, _)| *state);
        Some(RegionPath {
            state_name: state_id.and_then(|s| self.state_name(s)).map(str::to_string),
            state_id,
            district_id: district.map(|_| *district_id),
            district_name: district.map(|(_, name)| name.clone()),
            constituency_id: constituency,
            constituency_name: constituency_name.clone(),
        })
    }
}

/// A cascading region selection. Selecting an ancestor clears every
/// selection below it, so a filter never names a district outside its state
/// or a constituency outside its district.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromForm)]
pub struct RegionFilter {
    pub state: Option<Id>,
    pub district: Option<Id>,
    pub constituency: Option<Id>,
}

impl RegionFilter {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.district.is_none() && self.constituency.is_none()
    }

    /// Select a state, resetting the district and constituency.
    pub fn select_state(&mut self, state: Option<Id>) {
        self.state = state;
        self.district = None;
        self.constituency = None;
    }

    /// Select a district, resetting the constituency.
    pub fn select_district(&mut self, district: Option<Id>) {
        self.district = district;
        self.constituency = None;
    }

    pub fn select_constituency(&mut self, constituency: Option<Id>) {
        self.constituency = constituency;
    }

    /// Drop stale dependent selections, as if the ancestors had just been
    /// re-selected. Used for filters arriving as independent query parameters.
    pub fn normalized(mut self, geography: &Geography) -> Self {
        if let (Some(state), Some(district)) = (self.state, self.district) {
            if geography.state_of(district) != Some(state) {
                self.select_state(Some(state));
            }
        }
        if let Some(constituency) = self.constituency {
            let district = geography.district_of(constituency);
            let stale = match (self.state, self.district) {
                (_, Some(selected)) => district != Some(selected),
                (Some(selected), None) => {
                    district.and_then(|d| geography.state_of(d)) != Some(selected)
                }
                (None, None) => false,
            };
            if stale {
                self.select_constituency(None);
            }
        }
        self
    }

    /// Election semantics: unscoped (nationwide) elections are always
    /// admitted, scoped ones must lie within the selection.
    pub fn admits_scope(&self, constituency: Option<Id>, geography: &Geography) -> bool {
        match constituency {
            None => true,
            Some(c) => self.contains(c, geography),
        }
    }

    /// Record semantics: once any region is selected, unscoped records
    /// (candidates, votes) are excluded.
    pub fn admits_record(&self, constituency: Option<Id>, geography: &Geography) -> bool {
        if self.is_empty() {
            return true;
        }
        match constituency {
            None => false,
            Some(c) => self.contains(c, geography),
        }
    }

    /// Is the constituency within the most specific selection?
    fn contains(&self, constituency: Id, geography: &Geography) -> bool {
        if let Some(selected) = self.constituency {
            return constituency == selected;
        }
        let district = geography.district_of(constituency);
        if let Some(selected) = self.district {
            return district == Some(selected);
        }
        if let Some(selected) = self.state {
            return district.and_then(|d| geography.state_of(d)) == Some(selected);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::geography::{ConstituencyCore, DistrictCore, StateCore};

    use super::*;

    struct Fixture {
        geography: Geography,
        north: Id,
        south: Id,
        north_east: Id,
        north_west: Id,
        south_central: Id,
        ne_1: Id,
        ne_2: Id,
        nw_1: Id,
        sc_1: Id,
    }

    fn fixture() -> Fixture {
        let (north, south) = (Id::new(), Id::new());
        let (north_east, north_west, south_central) = (Id::new(), Id::new(), Id::new());
        let (ne_1, ne_2, nw_1, sc_1) = (Id::new(), Id::new(), Id::new(), Id::new());

        let state = |id, name: &str, code: &str| State {
            id,
            state: StateCore {
                name: name.to_string(),
                code: code.to_string(),
            },
        };
        let district = |id, state_id, name: &str| District {
            id,
            district: DistrictCore {
                state_id,
                name: name.to_string(),
            },
        };
        let constituency = |id, district_id, name: &str| Constituency {
            id,
            constituency: ConstituencyCore {
                district_id,
                name: name.to_string(),
            },
        };

        let geography = Geography::new(
            vec![state(north, "North", "NO"), state(south, "South", "SO")],
            vec![
                district(north_east, north, "North East"),
                district(north_west, north, "North West"),
                district(south_central, south, "South Central"),
            ],
            vec![
                constituency(ne_1, north_east, "NE-1"),
                constituency(ne_2, north_east, "NE-2"),
                constituency(nw_1, north_west, "NW-1"),
                constituency(sc_1, south_central, "SC-1"),
            ],
        );

        Fixture {
            geography,
            north,
            south,
            north_east,
            north_west,
            south_central,
            ne_1,
            ne_2,
            nw_1,
            sc_1,
        }
    }

    #[test]
    fn selecting_state_resets_descendants() {
        let f = fixture();
        let mut filter = RegionFilter::default();
        filter.select_state(Some(f.north));
        filter.select_district(Some(f.north_east));
        filter.select_constituency(Some(f.ne_1));

        filter.select_state(Some(f.south));
        assert_eq!(
            filter,
            RegionFilter {
                state: Some(f.south),
                district: None,
                constituency: None,
            }
        );
    }

    #[test]
    fn selecting_district_resets_constituency() {
        let f = fixture();
        let mut filter = RegionFilter::default();
        filter.select_state(Some(f.north));
        filter.select_district(Some(f.north_east));
        filter.select_constituency(Some(f.ne_2));

        filter.select_district(Some(f.north_west));
        assert_eq!(filter.state, Some(f.north));
        assert_eq!(filter.district, Some(f.north_west));
        assert_eq!(filter.constituency, None);

        filter.select_district(None);
        assert_eq!(filter.state, Some(f.north));
        assert!(filter.district.is_none());
    }

    #[test]
    fn normalization_drops_stale_selections() {
        let f = fixture();

        // District from another state: district and constituency are stale.
        let filter = RegionFilter {
            state: Some(f.south),
            district: Some(f.north_east),
            constituency: Some(f.ne_1),
        }
        .normalized(&f.geography);
        assert_eq!(
            filter,
            RegionFilter {
                state: Some(f.south),
                district: None,
                constituency: None,
            }
        );

        // Constituency from another district.
        let filter = RegionFilter {
            state: Some(f.north),
            district: Some(f.north_east),
            constituency: Some(f.nw_1),
        }
        .normalized(&f.geography);
        assert_eq!(filter.district, Some(f.north_east));
        assert_eq!(filter.constituency, None);

        // Constituency from another state, no district selected.
        let filter = RegionFilter {
            state: Some(f.north),
            district: None,
            constituency: Some(f.sc_1),
        }
        .normalized(&f.geography);
        assert_eq!(filter.constituency, None);

        // Consistent selections survive untouched.
        let consistent = RegionFilter {
            state: Some(f.north),
            district: Some(f.north_east),
            constituency: Some(f.ne_2),
        };
        assert_eq!(consistent.normalized(&f.geography), consistent);
    }

    #[test]
    fn scope_admission() {
        let f = fixture();
        let g = &f.geography;

        let everything = RegionFilter::default();
        assert!(everything.admits_scope(None, g));
        assert!(everything.admits_scope(Some(f.sc_1), g));

        let north = RegionFilter {
            state: Some(f.north),
            ..Default::default()
        };
        assert!(north.admits_scope(None, g));
        assert!(north.admits_scope(Some(f.ne_1), g));
        assert!(north.admits_scope(Some(f.nw_1), g));
        assert!(!north.admits_scope(Some(f.sc_1), g));
        assert!(!north.admits_scope(Some(Id::new()), g));

        let north_east = RegionFilter {
            state: Some(f.north),
            district: Some(f.north_east),
            constituency: None,
        };
        assert!(north_east.admits_scope(Some(f.ne_2), g));
        assert!(!north_east.admits_scope(Some(f.nw_1), g));

        let ne_1 = RegionFilter {
            state: Some(f.north),
            district: Some(f.north_east),
            constituency: Some(f.ne_1),
        };
        assert!(ne_1.admits_scope(Some(f.ne_1), g));
        assert!(!ne_1.admits_scope(Some(f.ne_2), g));
        assert!(ne_1.admits_scope(None, g));
    }

    #[test]
    fn record_admission_excludes_unscoped() {
        let f = fixture();
        let g = &f.geography;

        assert!(RegionFilter::default().admits_record(None, g));

        let south = RegionFilter {
            state: Some(f.south),
            ..Default::default()
        };
        assert!(!south.admits_record(None, g));
        assert!(south.admits_record(Some(f.sc_1), g));
        assert!(!south.admits_record(Some(f.ne_1), g));

        let south_central = RegionFilter {
            district: Some(f.south_central),
            ..Default::default()
        };
        assert!(south_central.admits_record(Some(f.sc_1), g));
    }

    #[test]
    fn resolves_paths() {
        let f = fixture();
        let path = f.geography.path(f.nw_1).unwrap();
        assert_eq!(path.state_id, Some(f.north));
        assert_eq!(path.state_name.as_deref(), Some("North"));
        assert_eq!(path.district_id, Some(f.north_west));
        assert_eq!(path.district_name.as_deref(), Some("North West"));
        assert_eq!(path.constituency_name, "NW-1");
        assert!(f.geography.path(Id::new()).is_none());
    }
}
