//! Host state channel
//!
//! Paging position and the refresh marker travel through the host's own
//! state bag between builds. Only three keys are read or written:
//! `refresh`, `currentPage` and `pageSize`.

use crate::form_data::TableConfig;
use crate::query::PagingState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The chart's own state as stored by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnState {
    /// Millisecond timestamp of the last refresh tick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

impl OwnState {
    /// Read the known keys from an opaque state bag, ignoring everything else
    pub fn from_bag(bag: &Map<String, Value>) -> Self {
        let read = |key: &str| bag.get(key).and_then(Value::as_u64);
        Self {
            refresh: bag.get("refresh").and_then(Value::as_i64),
            current_page: read("currentPage").map(|n| n as usize),
            page_size: read("pageSize").map(|n| n as usize),
        }
    }

    /// Write the known keys into a state bag
    pub fn write_to(&self, bag: &mut Map<String, Value>) {
        if let Some(refresh) = self.refresh {
            bag.insert("refresh".into(), refresh.into());
        }
        if let Some(page) = self.current_page {
            bag.insert("currentPage".into(), page.into());
        }
        if let Some(size) = self.page_size {
            bag.insert("pageSize".into(), size.into());
        }
    }

    /// Overlay the keys set in `other`
    pub fn merge(&mut self, other: OwnState) {
        self.refresh = other.refresh.or(self.refresh);
        self.current_page = other.current_page.or(self.current_page);
        self.page_size = other.page_size.or(self.page_size);
    }

    /// Concrete paging state, falling back to page 0 and the configured page length
    pub fn paging(&self, config: &TableConfig) -> PagingState {
        PagingState::new(
            self.current_page.unwrap_or(0),
            self.page_size.unwrap_or(config.server_page_length),
        )
    }
}

impl From<PagingState> for OwnState {
    fn from(paging: PagingState) -> Self {
        Self {
            refresh: None,
            current_page: Some(paging.current_page),
            page_size: Some(paging.page_size),
        }
    }
}

/// An update pushed into the host's state channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMask {
    /// Cross-filter state; an empty map clears it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_state: Option<Map<String, Value>>,
    pub own_state: OwnState,
}

impl DataMask {
    /// Mask emitted by a refresh tick: back to page 0 with a fresh timestamp
    pub fn refresh_tick(page_size: usize) -> Self {
        Self {
            filter_state: Some(Map::new()),
            own_state: OwnState {
                refresh: Some(chrono::Utc::now().timestamp_millis()),
                current_page: Some(0),
                page_size: Some(page_size),
            },
        }
    }

    /// Mask emitted when the user navigates to another page
    pub fn page_change(page: usize, page_size: usize) -> Self {
        Self {
            filter_state: None,
            own_state: OwnState {
                refresh: None,
                current_page: Some(page),
                page_size: Some(page_size),
            },
        }
    }

    /// Whether this mask came from a refresh tick
    pub fn is_refresh(&self) -> bool {
        self.own_state.refresh.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_own_state_from_bag() {
        let bag = json!({"currentPage": 3, "pageSize": 25, "refresh": 1700000000000_i64, "other": true});
        let state = OwnState::from_bag(bag.as_object().unwrap());

        assert_eq!(state.current_page, Some(3));
        assert_eq!(state.page_size, Some(25));
        assert_eq!(state.refresh, Some(1_700_000_000_000));
    }

    #[test]
    fn test_own_state_bag_roundtrip_keeps_foreign_keys() {
        let mut bag = json!({"sortBy": "name"}).as_object().unwrap().clone();
        OwnState::from(PagingState::new(2, 10)).write_to(&mut bag);

        assert_eq!(bag["sortBy"], "name");
        assert_eq!(bag["currentPage"], 2);
        assert_eq!(bag["pageSize"], 10);
        assert!(!bag.contains_key("refresh"));
    }

    #[test]
    fn test_merge_keeps_unset_keys() {
        let mut state = OwnState {
            refresh: Some(1),
            current_page: Some(3),
            page_size: Some(20),
        };
        state.merge(DataMask::page_change(5, 20).own_state);

        assert_eq!(state.current_page, Some(5));
        assert_eq!(state.refresh, Some(1));
    }

    #[test]
    fn test_paging_fallbacks() {
        let config = TableConfig {
            server_page_length: 40,
            ..Default::default()
        };

        assert_eq!(OwnState::default().paging(&config), PagingState::new(0, 40));

        let state = OwnState {
            current_page: Some(2),
            ..Default::default()
        };
        assert_eq!(state.paging(&config), PagingState::new(2, 40));
    }

    #[test]
    fn test_refresh_tick_mask() {
        let mask = DataMask::refresh_tick(50);

        assert!(mask.is_refresh());
        assert_eq!(mask.own_state.current_page, Some(0));
        assert_eq!(mask.own_state.page_size, Some(50));

        let value = serde_json::to_value(&mask).unwrap();
        assert_eq!(value["filterState"], json!({}));
        assert_eq!(value["ownState"]["currentPage"], 0);
    }

    #[test]
    fn test_page_change_mask() {
        let mask = DataMask::page_change(4, 50);
        assert!(!mask.is_refresh());

        let value = serde_json::to_value(&mask).unwrap();
        assert_eq!(value, json!({"ownState": {"currentPage": 4, "pageSize": 50}}));
    }
}
