use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel + message pair locating the rendered roster message, so the
/// roster can be edited in place after each action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttendanceAction {
    SignUp,
    SignOff,
}

impl AttendanceAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignUp => "signed up",
            Self::SignOff => "signed off",
        }
    }
}

/// Insertion-ordered set of participant display names.
///
/// Participants are keyed by display name, so two members sharing a
/// display name collapse into one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<String>);

impl Roster {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roster = Self::default();
        for name in names {
            roster.insert(&name.into());
        }
        roster
    }

    /// Returns `false` when the participant was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.0.push(name.to_owned());
        true
    }

    /// Returns `false` when the participant was not present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != name);
        self.0.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|existing| existing == name)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One attendance poll. Owned exclusively by the `EventStore`; mutated only
/// through sign-up/sign-off actions and message-reference attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub event_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub description: String,
    pub title: Option<String>,
    pub signed_up: Roster,
    pub signed_off: Roster,
    pub message_ref: Option<MessageRef>,
}

impl Event {
    /// Deadline state is derived on every action, never stored.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Moves the participant into the roster matching `action` and out of
    /// the opposite one. Repeating the same action is a no-op.
    pub fn record(&mut self, action: AttendanceAction, participant: &str) {
        match action {
            AttendanceAction::SignUp => {
                self.signed_off.remove(participant);
                self.signed_up.insert(participant);
            }
            AttendanceAction::SignOff => {
                self.signed_up.remove(participant);
                self.signed_off.insert(participant);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{AttendanceAction, Event, EventId, Roster};

    fn event() -> Event {
        let event_date = Utc::now() + Duration::days(2);
        Event {
            id: EventId("evt-1".to_owned()),
            event_date,
            deadline: event_date - Duration::hours(24),
            description: "League night".to_owned(),
            title: None,
            signed_up: Roster::default(),
            signed_off: Roster::default(),
            message_ref: None,
        }
    }

    #[test]
    fn roster_preserves_insertion_order_and_uniqueness() {
        let mut roster = Roster::default();
        assert!(roster.insert("Alice"));
        assert!(roster.insert("Bob"));
        assert!(!roster.insert("Alice"));

        assert_eq!(roster.names(), ["Alice".to_owned(), "Bob".to_owned()]);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn from_names_drops_duplicates() {
        let roster = Roster::from_names(["Alice", "Bob", "Alice"]);
        assert_eq!(roster.names(), ["Alice".to_owned(), "Bob".to_owned()]);
    }

    #[test]
    fn sign_up_then_sign_off_leaves_participant_in_one_roster() {
        let mut event = event();
        event.record(AttendanceAction::SignUp, "Alice");
        event.record(AttendanceAction::SignOff, "Alice");

        assert!(!event.signed_up.contains("Alice"));
        assert!(event.signed_off.contains("Alice"));
    }

    #[test]
    fn repeated_action_is_idempotent() {
        let mut event = event();
        event.record(AttendanceAction::SignUp, "Alice");
        let once = event.clone();
        event.record(AttendanceAction::SignUp, "Alice");

        assert_eq!(event, once);
    }

    #[test]
    fn rosters_stay_disjoint_across_action_sequences() {
        let mut event = event();
        for action in [
            AttendanceAction::SignUp,
            AttendanceAction::SignUp,
            AttendanceAction::SignOff,
            AttendanceAction::SignUp,
            AttendanceAction::SignOff,
        ] {
            event.record(action, "Alice");
            let in_both =
                event.signed_up.contains("Alice") && event.signed_off.contains("Alice");
            assert!(!in_both, "participant must never appear in both rosters");
        }
    }

    #[test]
    fn deadline_state_follows_the_clock() {
        let event = event();
        assert!(!event.is_past_deadline(event.deadline));
        assert!(event.is_past_deadline(event.deadline + Duration::seconds(1)));
    }
}
