//! Authoritative pane map and its persisted encoding.
//!
//! The settings key `saved-panes` holds
//! `{"version": 1, "panes": {"<id>": {...}}}`. Each pane record has
//! `command` and `visible`, plus the optional `windowId`, `creationToken`,
//! `lastPosition` and `lastSize`, which are omitted when unset. An
//! unversioned bare map of pane records (which may use the old
//! `stableSequenceId` key) is read as version 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geometry::{Position, Size};
use crate::pane::{Pane, PaneId, WindowRef};
use crate::settings::{KEY_SAVED_PANES, SettingsError, SettingsStore};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("saved panes use schema version {found}, newest supported is {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },
    #[error("saved panes are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedPane {
    command: String,
    #[serde(default)]
    visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_id: Option<String>,
    #[serde(default, alias = "stableSequenceId", skip_serializing_if = "Option::is_none")]
    creation_token: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_size: Option<Size>,
}

impl From<&Pane> for SavedPane {
    fn from(pane: &Pane) -> Self {
        Self {
            command: pane.command.clone(),
            visible: pane.visible,
            window_id: pane.window.map(|w| w.to_string()),
            creation_token: pane.creation_token.map(Value::from),
            last_position: pane.last_position,
            last_size: pane.last_size,
        }
    }
}

impl SavedPane {
    fn into_pane(self, id: PaneId) -> Pane {
        let window = self.window_id.as_deref().and_then(|raw| match raw.parse::<WindowRef>() {
            Ok(window) => Some(window),
            Err(err) => {
                tracing::warn!(pane = %id, error = %err, "dropping unreadable window id");
                None
            }
        });
        let creation_token = self.creation_token.and_then(|raw| {
            let token = raw.as_u64().and_then(|token| u32::try_from(token).ok());
            if token.is_none() {
                tracing::warn!(pane = %id, token = %raw, "dropping unreadable creation token");
            }
            token
        });
        Pane {
            id,
            command: self.command,
            visible: self.visible,
            window,
            creation_token,
            last_position: self.last_position,
            last_size: self.last_size,
            launched_at: None,
        }
    }
}

/// Pane records keyed by id, remembering insertion order for display.
#[derive(Debug, Default, Clone)]
pub struct PaneStore {
    panes: BTreeMap<PaneId, Pane>,
    order: Vec<PaneId>,
}

impl PaneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a pane. Replacing keeps its display position.
    pub fn insert(&mut self, pane: Pane) {
        if !self.panes.contains_key(&pane.id) {
            self.order.push(pane.id.clone());
        }
        self.panes.insert(pane.id.clone(), pane);
    }

    pub fn remove(&mut self, id: &PaneId) -> Option<Pane> {
        let removed = self.panes.remove(id)?;
        self.order.retain(|other| other != id);
        Some(removed)
    }

    pub fn get(&self, id: &PaneId) -> Option<&Pane> {
        self.panes.get(id)
    }

    pub fn get_mut(&mut self, id: &PaneId) -> Option<&mut Pane> {
        self.panes.get_mut(id)
    }

    pub fn contains(&self, id: &PaneId) -> bool {
        self.panes.contains_key(id)
    }

    pub fn ids(&self) -> Vec<PaneId> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pane> {
        self.order.iter().filter_map(|id| self.panes.get(id))
    }

    pub fn snapshot(&self) -> Vec<Pane> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// The pane whose window reference is `window`, if any.
    pub fn find_by_window(&self, window: WindowRef) -> Option<&Pane> {
        self.iter().find(|pane| pane.window == Some(window))
    }

    /// Ids starting with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<PaneId> {
        self.order
            .iter()
            .filter(|id| id.as_str().starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Encode in display order.
    pub fn encode(&self) -> Value {
        let mut panes = Map::new();
        for pane in self.iter() {
            match serde_json::to_value(SavedPane::from(pane)) {
                Ok(record) => {
                    panes.insert(pane.id.to_string(), record);
                }
                Err(err) => tracing::error!(pane = %pane.id, error = %err, "failed to encode pane"),
            }
        }
        let mut saved = Map::new();
        saved.insert("version".to_string(), Value::from(SCHEMA_VERSION));
        saved.insert("panes".to_string(), Value::Object(panes));
        Value::Object(saved)
    }

    /// Decode a persisted value. Individual unreadable pane records are
    /// skipped; a structurally wrong envelope or a newer schema is an error.
    pub fn decode(value: Value) -> Result<Self, StoreError> {
        let records = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(mut map) if map.contains_key("version") => {
                let version = map
                    .get("version")
                    .and_then(Value::as_u64)
                    .unwrap_or(u64::MAX);
                if version > u64::from(SCHEMA_VERSION) {
                    return Err(StoreError::UnsupportedVersion {
                        found: version,
                        supported: SCHEMA_VERSION,
                    });
                }
                let panes = map.remove("panes").unwrap_or(Value::Null);
                serde_json::from_value::<Map<String, Value>>(panes)?
            }
            other => serde_json::from_value::<Map<String, Value>>(other)?,
        };

        let mut store = Self::new();
        for (id, record) in records {
            if id.is_empty() {
                continue;
            }
            let id = PaneId::from(id);
            match serde_json::from_value::<SavedPane>(record) {
                Ok(saved) => store.insert(saved.into_pane(id)),
                Err(err) => tracing::warn!(pane = %id, error = %err, "skipping unreadable pane"),
            }
        }
        Ok(store)
    }

    pub fn load(settings: &dyn SettingsStore) -> Result<Self, StoreError> {
        match settings.get(KEY_SAVED_PANES) {
            Some(value) => Self::decode(value),
            None => Ok(Self::new()),
        }
    }

    /// Write the whole map as one snapshot.
    pub fn flush(&self, settings: &mut dyn SettingsStore) -> Result<(), StoreError> {
        settings.set(KEY_SAVED_PANES, self.encode())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;
    use serde_json::json;

    fn full_pane() -> Pane {
        let mut pane = Pane::new(PaneId::from("a"), "app https://x 'Title'");
        pane.visible = false;
        pane.window = Some(WindowRef::new(4242, 77));
        pane.creation_token = Some(19);
        pane.last_position = Some(Position::new(-10, 40));
        pane.last_size = Some(Size::new(900, 700));
        pane
    }

    #[test]
    fn round_trip_keeps_all_fields() {
        let mut store = PaneStore::new();
        store.insert(full_pane());
        let decoded = PaneStore::decode(store.encode()).unwrap();
        assert_eq!(decoded.snapshot(), vec![full_pane()]);
    }

    #[test]
    fn unset_optionals_stay_absent() {
        let mut store = PaneStore::new();
        store.insert(Pane::new(PaneId::from("b"), "xterm"));
        let encoded = store.encode();
        assert_eq!(
            encoded,
            json!({"version": 1, "panes": {"b": {"command": "xterm", "visible": true}}})
        );
        let pane = PaneStore::decode(encoded).unwrap().snapshot().remove(0);
        assert_eq!(pane.window, None);
        assert_eq!(pane.creation_token, None);
        assert_eq!(pane.last_position, None);
        assert_eq!(pane.last_size, None);
    }

    #[test]
    fn launch_time_is_never_persisted() {
        let mut pane = Pane::new(PaneId::from("c"), "xterm");
        pane.launched_at = Some(std::time::Instant::now());
        let mut store = PaneStore::new();
        store.insert(pane);
        let decoded = PaneStore::decode(store.encode()).unwrap();
        assert_eq!(decoded.get(&PaneId::from("c")).unwrap().launched_at, None);
    }

    #[test]
    fn legacy_unversioned_map_decodes() {
        let legacy = json!({
            "old": {
                "command": "xterm",
                "visible": true,
                "windowId": "12-34",
                "stableSequenceId": 5,
                "lastPosition": {"x": 1, "y": 2},
                "lastSize": {"width": 3, "height": 4}
            }
        });
        let store = PaneStore::decode(legacy).unwrap();
        let pane = store.get(&PaneId::from("old")).unwrap();
        assert_eq!(pane.window, Some(WindowRef::new(12, 34)));
        assert_eq!(pane.creation_token, Some(5));
        assert_eq!(pane.last_size, Some(Size::new(3, 4)));
    }

    #[test]
    fn bad_records_are_skipped_and_bad_window_ids_dropped() {
        let value = json!({"version": 1, "panes": {
            "good": {"command": "xterm", "visible": true, "windowId": "nonsense"},
            "bad": {"visible": "maybe"}
        }});
        let store = PaneStore::decode(value).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&PaneId::from("good")).unwrap().window, None);
    }

    #[test]
    fn unreadable_tokens_are_dropped_not_the_pane() {
        let legacy = json!({
            "neg": {"command": "xterm", "visible": true, "stableSequenceId": -4, "windowId": "1-2"},
            "text": {"command": "htop", "visible": false, "creationToken": "x"}
        });
        let store = PaneStore::decode(legacy).unwrap();
        assert_eq!(store.len(), 2);
        let neg = store.get(&PaneId::from("neg")).unwrap();
        assert_eq!(neg.creation_token, None);
        assert_eq!(neg.window, Some(WindowRef::new(1, 2)));
        assert_eq!(store.get(&PaneId::from("text")).unwrap().creation_token, None);
    }

    #[test]
    fn saved_order_survives_a_reload() {
        let mut store = PaneStore::new();
        for id in ["f3", "0a", "c7"] {
            store.insert(Pane::new(PaneId::from(id), "xterm"));
        }
        let text = serde_json::to_string(&store.encode()).unwrap();
        let reloaded = PaneStore::decode(serde_json::from_str(&text).unwrap()).unwrap();
        let ids: Vec<String> = reloaded.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["f3", "0a", "c7"]);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let err = PaneStore::decode(json!({"version": 2, "panes": {}})).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn insertion_order_and_prefix_lookup() {
        let mut store = PaneStore::new();
        for id in ["zz", "ab1", "ab2"] {
            store.insert(Pane::new(PaneId::from(id), "xterm"));
        }
        let ids: Vec<String> = store.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["zz", "ab1", "ab2"]);
        assert_eq!(store.find_by_prefix("ab").len(), 2);
        assert_eq!(store.find_by_prefix("z"), vec![PaneId::from("zz")]);
        store.remove(&PaneId::from("ab1"));
        assert_eq!(store.ids(), vec![PaneId::from("zz"), PaneId::from("ab2")]);
    }

    #[test]
    fn flush_and_load_through_settings() {
        let mut settings = MemorySettings::new();
        let mut store = PaneStore::new();
        store.insert(full_pane());
        store.flush(&mut settings).unwrap();
        let loaded = PaneStore::load(&settings).unwrap();
        assert_eq!(loaded.snapshot(), store.snapshot());

        settings.set_read_only(true);
        assert!(matches!(
            store.flush(&mut settings),
            Err(StoreError::Settings(SettingsError::ReadOnly))
        ));
    }
}
