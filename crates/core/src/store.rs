use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::event::{AttendanceAction, Event, EventId, MessageRef, Roster};
use crate::errors::DomainError;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not write snapshot `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum SnapshotLoadError {
    #[error("could not read snapshot `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse snapshot `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewEvent {
    pub id: EventId,
    pub event_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub description: String,
    pub title: Option<String>,
}

/// Keyed collection of events plus its durable snapshot.
///
/// The in-memory map is the source of truth for the process lifetime;
/// the snapshot is best-effort per write and replaced atomically
/// (temp file + rename) so a crash mid-write never corrupts data
/// already on disk.
#[derive(Debug, Default)]
pub struct EventStore {
    events: HashMap<EventId, Event>,
    snapshot_path: Option<PathBuf>,
}

impl EventStore {
    /// Store without a backing snapshot; `persist` becomes a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Empty store that will persist to `path`.
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Self {
        Self { events: HashMap::new(), snapshot_path: Some(path.into()) }
    }

    /// Reads the snapshot at `path` if present. A missing file yields an
    /// empty store; an unreadable or corrupt file is reported so the
    /// caller can log it and fall back to an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SnapshotLoadError> {
        let path = path.into();
        let events = load_snapshot(&path)?;
        Ok(Self { events, snapshot_path: Some(path) })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// Inserts a new event with empty rosters and no message reference.
    /// Rejects a deadline that is not strictly before the event and ids
    /// already in use.
    pub fn create(&mut self, new_event: NewEvent) -> Result<&Event, DomainError> {
        if new_event.deadline >= new_event.event_date {
            return Err(DomainError::DeadlineAfterEvent {
                event_date: new_event.event_date,
                deadline: new_event.deadline,
            });
        }
        if self.events.contains_key(&new_event.id) {
            return Err(DomainError::DuplicateEvent(new_event.id));
        }

        let id = new_event.id.clone();
        let event = Event {
            id: new_event.id,
            event_date: new_event.event_date,
            deadline: new_event.deadline,
            description: new_event.description,
            title: new_event.title,
            signed_up: Roster::default(),
            signed_off: Roster::default(),
            message_ref: None,
        };

        Ok(self.events.entry(id).or_insert(event))
    }

    /// Applies a sign-up/sign-off action. Unknown ids leave the store
    /// untouched.
    pub fn record(
        &mut self,
        id: &EventId,
        action: AttendanceAction,
        participant: &str,
    ) -> Result<&Event, DomainError> {
        let event = self
            .events
            .get_mut(id)
            .ok_or_else(|| DomainError::EventNotFound(id.clone()))?;
        event.record(action, participant);
        Ok(event)
    }

    /// Idempotent; a second attachment overwrites the first.
    pub fn attach_message_ref(
        &mut self,
        id: &EventId,
        message_ref: MessageRef,
    ) -> Result<&Event, DomainError> {
        let event = self
            .events
            .get_mut(id)
            .ok_or_else(|| DomainError::EventNotFound(id.clone()))?;
        event.message_ref = Some(message_ref);
        Ok(event)
    }

    /// Serializes the full collection and atomically replaces the
    /// snapshot file. Failures do not roll back in-memory state.
    pub fn persist(&self) -> Result<(), PersistError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let json = self.snapshot_json()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|source| PersistError::Write { path: parent.to_path_buf(), source })?;
            }
        }

        let staged = path.with_extension("tmp");
        fs::write(&staged, json)
            .map_err(|source| PersistError::Write { path: staged.clone(), source })?;
        fs::rename(&staged, path)
            .map_err(|source| PersistError::Write { path: path.clone(), source })?;

        Ok(())
    }

    /// The snapshot document as it would be written to disk.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        let records: BTreeMap<&str, SnapshotRecord> = self
            .events
            .values()
            .map(|event| (event.id.0.as_str(), SnapshotRecord::from(event)))
            .collect();
        serde_json::to_string_pretty(&records)
    }
}

/// On-disk record shape; field names are the snapshot contract.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord {
    date: DateTime<Utc>,
    deadline: DateTime<Utc>,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    signed_up: Vec<String>,
    signed_off: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_ref: Option<SnapshotMessageRef>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotMessageRef {
    channel_id: String,
    message_id: String,
}

impl From<&Event> for SnapshotRecord {
    fn from(event: &Event) -> Self {
        Self {
            date: event.event_date,
            deadline: event.deadline,
            description: event.description.clone(),
            title: event.title.clone(),
            signed_up: event.signed_up.names().to_vec(),
            signed_off: event.signed_off.names().to_vec(),
            message_ref: event.message_ref.as_ref().map(|message_ref| SnapshotMessageRef {
                channel_id: message_ref.channel_id.clone(),
                message_id: message_ref.message_id.clone(),
            }),
        }
    }
}

impl SnapshotRecord {
    fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            event_date: self.date,
            deadline: self.deadline,
            description: self.description,
            title: self.title,
            signed_up: Roster::from_names(self.signed_up),
            signed_off: Roster::from_names(self.signed_off),
            message_ref: self.message_ref.map(|message_ref| MessageRef {
                channel_id: message_ref.channel_id,
                message_id: message_ref.message_id,
            }),
        }
    }
}

fn load_snapshot(path: &Path) -> Result<HashMap<EventId, Event>, SnapshotLoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(SnapshotLoadError::Read { path: path.to_path_buf(), source })
        }
    };

    let records: BTreeMap<String, SnapshotRecord> = serde_json::from_str(&raw)
        .map_err(|source| SnapshotLoadError::Parse { path: path.to_path_buf(), source })?;

    Ok(records
        .into_iter()
        .map(|(id, record)| {
            let id = EventId(id);
            (id.clone(), record.into_event(id))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::domain::event::{AttendanceAction, EventId, MessageRef};
    use crate::errors::DomainError;

    use super::{EventStore, NewEvent};

    fn new_event(id: &str) -> NewEvent {
        let event_date = Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap();
        NewEvent {
            id: EventId(id.to_owned()),
            event_date,
            deadline: event_date - Duration::hours(24),
            description: "League night".to_owned(),
            title: None,
        }
    }

    #[test]
    fn create_rejects_deadline_at_or_after_the_event() {
        let mut store = EventStore::in_memory();
        let mut request = new_event("evt-1");
        request.deadline = request.event_date;

        let error = store.create(request.clone()).expect_err("equal deadline must fail");
        assert!(matches!(error, DomainError::DeadlineAfterEvent { .. }));

        request.deadline = request.event_date + Duration::minutes(1);
        let error = store.create(request).expect_err("later deadline must fail");
        assert!(matches!(error, DomainError::DeadlineAfterEvent { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn create_rejects_duplicate_ids() {
        let mut store = EventStore::in_memory();
        store.create(new_event("evt-1")).expect("first create");

        let error = store.create(new_event("evt-1")).expect_err("duplicate must fail");
        assert!(matches!(error, DomainError::DuplicateEvent(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn record_on_unknown_id_is_not_found_without_state_change() {
        let mut store = EventStore::in_memory();
        store.create(new_event("evt-1")).expect("create");

        let error = store
            .record(&EventId("nonexistent".to_owned()), AttendanceAction::SignUp, "Alice")
            .expect_err("unknown id must fail");

        assert!(matches!(error, DomainError::EventNotFound(_)));
        let event = store.get(&EventId("evt-1".to_owned())).expect("existing event");
        assert!(event.signed_up.is_empty());
        assert!(event.signed_off.is_empty());
    }

    #[test]
    fn attach_message_ref_overwrites_previous_reference() {
        let mut store = EventStore::in_memory();
        let id = EventId("evt-1".to_owned());
        store.create(new_event("evt-1")).expect("create");

        let first =
            MessageRef { channel_id: "C1".to_owned(), message_id: "M1".to_owned() };
        let second =
            MessageRef { channel_id: "C1".to_owned(), message_id: "M2".to_owned() };
        store.attach_message_ref(&id, first).expect("first attach");
        store.attach_message_ref(&id, second.clone()).expect("second attach");

        assert_eq!(store.get(&id).and_then(|event| event.message_ref.clone()), Some(second));
    }

    #[test]
    fn snapshot_round_trips_ids_memberships_and_instants() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("events.json");

        let mut store = EventStore::with_snapshot_path(&path);
        store.create(new_event("evt-1")).expect("create evt-1");
        store.create(new_event("evt-2")).expect("create evt-2");
        let id = EventId("evt-1".to_owned());
        store.record(&id, AttendanceAction::SignUp, "Alice").expect("sign up Alice");
        store.record(&id, AttendanceAction::SignUp, "Bob").expect("sign up Bob");
        store.record(&id, AttendanceAction::SignOff, "Bob").expect("sign off Bob");
        store
            .attach_message_ref(
                &id,
                MessageRef { channel_id: "C9".to_owned(), message_id: "M9".to_owned() },
            )
            .expect("attach");
        store.persist().expect("persist");

        let reloaded = EventStore::open(&path).expect("reload");
        assert_eq!(reloaded.len(), 2);

        let original = store.get(&id).expect("original event");
        let restored = reloaded.get(&id).expect("restored event");
        assert_eq!(restored, original);

        // Re-saving without mutation must produce a semantically identical
        // snapshot.
        let before: serde_json::Value =
            serde_json::from_str(&store.snapshot_json().expect("json")).expect("value");
        let after: serde_json::Value =
            serde_json::from_str(&reloaded.snapshot_json().expect("json")).expect("value");
        assert_eq!(before, after);
    }

    #[test]
    fn snapshot_uses_the_contract_field_names() {
        let mut store = EventStore::in_memory();
        let id = EventId("evt-1".to_owned());
        store.create(new_event("evt-1")).expect("create");
        store.record(&id, AttendanceAction::SignUp, "Alice").expect("sign up");
        store
            .attach_message_ref(
                &id,
                MessageRef { channel_id: "C1".to_owned(), message_id: "M1".to_owned() },
            )
            .expect("attach");

        let value: serde_json::Value =
            serde_json::from_str(&store.snapshot_json().expect("json")).expect("value");
        let record = &value["evt-1"];

        assert!(record["date"].is_string());
        assert!(record["deadline"].is_string());
        assert_eq!(record["description"], "League night");
        assert_eq!(record["signedUp"][0], "Alice");
        assert!(record["signedOff"].as_array().map(Vec::is_empty).unwrap_or(false));
        assert_eq!(record["messageRef"]["channelId"], "C1");
        assert_eq!(record["messageRef"]["messageId"], "M1");
    }

    #[test]
    fn open_returns_empty_store_for_missing_snapshot() {
        let dir = TempDir::new().expect("temp dir");
        let store = EventStore::open(dir.path().join("missing.json")).expect("open");
        assert!(store.is_empty());
    }

    #[test]
    fn open_reports_corrupt_snapshot() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(&path, "not json at all").expect("write corrupt file");

        assert!(EventStore::open(&path).is_err());
    }

    #[test]
    fn persist_leaves_no_staging_file_behind() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("events.json");

        let mut store = EventStore::with_snapshot_path(&path);
        store.create(new_event("evt-1")).expect("create");
        store.persist().expect("persist");

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn persist_without_snapshot_path_is_a_no_op() {
        let mut store = EventStore::in_memory();
        store.create(new_event("evt-1")).expect("create");
        store.persist().expect("in-memory persist");
    }

    #[test]
    fn load_deduplicates_roster_sequences() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"{
              "evt-1": {
                "date": "2025-03-10T18:00:00Z",
                "deadline": "2025-03-09T18:00:00Z",
                "description": "League night",
                "signedUp": ["Alice", "Alice", "Bob"],
                "signedOff": []
              }
            }"#,
        )
        .expect("write snapshot");

        let store = EventStore::open(&path).expect("open");
        let event = store.get(&EventId("evt-1".to_owned())).expect("event");
        assert_eq!(event.signed_up.names(), ["Alice".to_owned(), "Bob".to_owned()]);
    }
}
