pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod schedule;
pub mod store;

pub use domain::event::{AttendanceAction, Event, EventId, MessageRef, Roster};
pub use engine::{
    ActionOutcome, AttendanceEngine, CreateEventRequest, CreateOutcome, DurabilityStatus,
    LateActionNotice, RosterView,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use schedule::{compute_deadline, parse_event_datetime, ScheduleError};
pub use store::{EventStore, NewEvent, PersistError, SnapshotLoadError};
