use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::event::{AttendanceAction, Event, EventId, MessageRef};
use crate::errors::DomainError;
use crate::schedule::{compute_deadline, parse_event_datetime};
use crate::store::{EventStore, NewEvent};

/// Title shown on a poll whose creator did not pick one.
pub const DEFAULT_TITLE: &str = "Attendance poll";

/// Renders an instant in the same layout the create command accepts.
pub fn format_datetime(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M").to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateEventRequest {
    pub id_hint: Option<String>,
    pub date_text: String,
    pub description: String,
    pub title: Option<String>,
    pub explicit_deadline_minutes: Option<f64>,
}

/// Projection of one event handed to the presentation adapter. Name lists
/// keep insertion order; counts are taken from their lengths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterView {
    pub title: String,
    pub description: String,
    pub event_date_text: String,
    pub deadline_text: String,
    pub signed_up_names: Vec<String>,
    pub signed_off_names: Vec<String>,
}

/// Emitted when an action lands after the registration deadline. The engine
/// only states the fact; delivering it to a log channel is the adapter's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LateActionNotice {
    pub event_id: EventId,
    pub participant: String,
    pub action: AttendanceAction,
    pub event_date: DateTime<Utc>,
}

/// Whether the mutation that produced an outcome reached the durable
/// snapshot. A degraded write never rolls back in-memory state and never
/// fails the user-facing action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DurabilityStatus {
    Durable,
    Degraded(String),
}

impl DurabilityStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateOutcome {
    pub event_id: EventId,
    pub roster: RosterView,
    pub durability: DurabilityStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub roster: RosterView,
    pub message_ref: Option<MessageRef>,
    pub late_notice: Option<LateActionNotice>,
    pub durability: DurabilityStatus,
}

/// Applies create/sign-up/sign-off requests to the injected store.
///
/// Deadline state is re-derived from `now` on every action; callers pass
/// the clock in so tests can pin it.
#[derive(Debug)]
pub struct AttendanceEngine {
    store: EventStore,
}

impl AttendanceEngine {
    pub fn new(store: EventStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Validates the date text, computes the deadline, and inserts the
    /// event. A missing or blank id hint is replaced with a minted UUID.
    pub fn create_event(
        &mut self,
        request: CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<CreateOutcome, DomainError> {
        let event_date = parse_event_datetime(&request.date_text)?;
        let deadline = compute_deadline(event_date, request.explicit_deadline_minutes, now);

        let id = request
            .id_hint
            .filter(|hint| !hint.trim().is_empty())
            .map(EventId)
            .unwrap_or_else(|| EventId(Uuid::new_v4().to_string()));

        let roster = {
            let event = self.store.create(NewEvent {
                id: id.clone(),
                event_date,
                deadline,
                description: request.description,
                title: request.title,
            })?;
            Self::roster_view(event)
        };
        let durability = self.persist_status();

        Ok(CreateOutcome { event_id: id, roster, durability })
    }

    pub fn sign_up(
        &mut self,
        id: &EventId,
        participant: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, DomainError> {
        self.apply(id, AttendanceAction::SignUp, participant, now)
    }

    pub fn sign_off(
        &mut self,
        id: &EventId,
        participant: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, DomainError> {
        self.apply(id, AttendanceAction::SignOff, participant, now)
    }

    /// Idempotent; records where the rendered roster message lives so it
    /// can be edited in place after later actions.
    pub fn attach_message_ref(
        &mut self,
        id: &EventId,
        message_ref: MessageRef,
    ) -> Result<DurabilityStatus, DomainError> {
        self.store.attach_message_ref(id, message_ref)?;
        Ok(self.persist_status())
    }

    /// Pure projection of an event into its displayed roster.
    pub fn roster_view(event: &Event) -> RosterView {
        RosterView {
            title: event.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
            description: event.description.clone(),
            event_date_text: format_datetime(event.event_date),
            deadline_text: format_datetime(event.deadline),
            signed_up_names: event.signed_up.names().to_vec(),
            signed_off_names: event.signed_off.names().to_vec(),
        }
    }

    fn apply(
        &mut self,
        id: &EventId,
        action: AttendanceAction,
        participant: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, DomainError> {
        let (roster, message_ref, late_notice) = {
            let event = self.store.record(id, action, participant)?;
            let late_notice = event.is_past_deadline(now).then(|| LateActionNotice {
                event_id: id.clone(),
                participant: participant.to_owned(),
                action,
                event_date: event.event_date,
            });
            (Self::roster_view(event), event.message_ref.clone(), late_notice)
        };
        let durability = self.persist_status();

        Ok(ActionOutcome { roster, message_ref, late_notice, durability })
    }

    fn persist_status(&self) -> DurabilityStatus {
        match self.store.persist() {
            Ok(()) => DurabilityStatus::Durable,
            Err(error) => DurabilityStatus::Degraded(error.to_string()),
        }
    }
}
