use serde::{Serialize, Serializer};

use rollcall_core::domain::event::{AttendanceAction, EventId};
use rollcall_core::engine::RosterView;

/// Accent color of the roster embed.
pub const EMBED_COLOR: u32 = 0x007B_FF;

/// Discord marks ephemeral interaction replies with this message flag.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;

pub const EMPTY_SIGNED_UP_FALLBACK: &str = "No sign-ups yet";
pub const EMPTY_SIGNED_OFF_FALLBACK: &str = "No sign-offs yet";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl ButtonStyle {
    /// Discord's integer style code.
    pub fn code(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Success => 3,
            Self::Danger => 4,
        }
    }
}

impl Serialize for ButtonStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    pub custom_id: String,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            kind: COMPONENT_BUTTON,
            style,
            label: label.into(),
            custom_id: custom_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn buttons(components: Vec<Button>) -> Self {
        Self { kind: COMPONENT_ACTION_ROW, components }
    }
}

/// The public roster message: one embed plus the sign-up/sign-off row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RosterMessage {
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
}

/// Reply only the acting user sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EphemeralReply {
    pub content: String,
    pub flags: u64,
}

impl EphemeralReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), flags: EPHEMERAL_FLAG }
    }
}

pub fn signup_custom_id(event_id: &EventId) -> String {
    format!("signup_{event_id}")
}

pub fn signoff_custom_id(event_id: &EventId) -> String {
    format!("signoff_{event_id}")
}

pub fn roster_message(event_id: &EventId, view: &RosterView) -> RosterMessage {
    RosterMessage {
        embeds: vec![roster_embed(view)],
        components: vec![ActionRow::buttons(vec![
            Button::new(signup_custom_id(event_id), "Sign up", ButtonStyle::Success),
            Button::new(signoff_custom_id(event_id), "Sign off", ButtonStyle::Danger),
        ])],
    }
}

pub fn roster_embed(view: &RosterView) -> Embed {
    Embed {
        title: format!("📢 {} on {}", view.title, view.event_date_text),
        description: format!(
            "{}\nRegistration open until: {}",
            view.description, view.deadline_text
        ),
        color: EMBED_COLOR,
        fields: vec![
            EmbedField {
                name: format!("✅ Signed up ({})", view.signed_up_names.len()),
                value: joined_or(&view.signed_up_names, EMPTY_SIGNED_UP_FALLBACK),
                inline: true,
            },
            EmbedField {
                name: format!("❌ Signed off ({})", view.signed_off_names.len()),
                value: joined_or(&view.signed_off_names, EMPTY_SIGNED_OFF_FALLBACK),
                inline: true,
            },
        ],
    }
}

pub fn sign_up_confirmation(event_date_text: &str) -> EphemeralReply {
    EphemeralReply::new(format!("✅ You are signed up for the event on {event_date_text}!"))
}

pub fn sign_off_confirmation(event_date_text: &str) -> EphemeralReply {
    EphemeralReply::new(format!("❌ You are signed off from the event on {event_date_text}!"))
}

pub fn event_not_found_reply() -> EphemeralReply {
    EphemeralReply::new("Event not found.")
}

pub fn error_reply(message: &str) -> EphemeralReply {
    EphemeralReply::new(message)
}

/// Log-channel line for an action that landed after the deadline.
pub fn late_action_log_line(
    participant: &str,
    action: AttendanceAction,
    event_date_text: &str,
) -> String {
    format!(
        "{participant} {} **after the deadline** for the event on {event_date_text}.",
        action.label()
    )
}

fn joined_or(names: &[String], fallback: &str) -> String {
    if names.is_empty() {
        fallback.to_owned()
    } else {
        names.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use rollcall_core::domain::event::{AttendanceAction, EventId};
    use rollcall_core::engine::RosterView;

    use super::{
        late_action_log_line, roster_message, sign_up_confirmation, ButtonStyle, EPHEMERAL_FLAG,
    };

    fn view() -> RosterView {
        RosterView {
            title: "Attendance poll".to_owned(),
            description: "League night".to_owned(),
            event_date_text: "2025-03-10 18:00".to_owned(),
            deadline_text: "2025-03-09 18:00".to_owned(),
            signed_up_names: vec!["Alice".to_owned(), "Bob".to_owned()],
            signed_off_names: vec![],
        }
    }

    #[test]
    fn roster_message_carries_counts_and_empty_fallback() {
        let message = roster_message(&EventId("evt-1".to_owned()), &view());
        let embed = &message.embeds[0];

        assert_eq!(embed.fields[0].name, "✅ Signed up (2)");
        assert_eq!(embed.fields[0].value, "Alice\nBob");
        assert_eq!(embed.fields[1].name, "❌ Signed off (0)");
        assert_eq!(embed.fields[1].value, "No sign-offs yet");
        assert!(embed.description.contains("Registration open until: 2025-03-09 18:00"));
    }

    #[test]
    fn roster_buttons_encode_the_event_id() {
        let message = roster_message(&EventId("evt-1".to_owned()), &view());
        let row = &message.components[0];

        assert_eq!(row.components[0].custom_id, "signup_evt-1");
        assert_eq!(row.components[0].style, ButtonStyle::Success);
        assert_eq!(row.components[1].custom_id, "signoff_evt-1");
        assert_eq!(row.components[1].style, ButtonStyle::Danger);
    }

    #[test]
    fn wire_shapes_use_discord_integer_codes() {
        let message = roster_message(&EventId("evt-1".to_owned()), &view());
        let value = serde_json::to_value(&message).expect("serialize");

        let row = &value["components"][0];
        assert_eq!(row["type"], 1);
        assert_eq!(row["components"][0]["type"], 2);
        assert_eq!(row["components"][0]["style"], 3);
        assert_eq!(row["components"][1]["style"], 4);
        assert!(value["embeds"][0]["color"].is_u64());
    }

    #[test]
    fn confirmations_are_flagged_ephemeral() {
        let reply = sign_up_confirmation("2025-03-10 18:00");
        assert_eq!(reply.flags, EPHEMERAL_FLAG);
        assert!(reply.content.contains("2025-03-10 18:00"));
    }

    #[test]
    fn late_action_log_line_names_participant_and_action() {
        let line = late_action_log_line("Alice", AttendanceAction::SignOff, "2025-03-10 18:00");
        assert_eq!(
            line,
            "Alice signed off **after the deadline** for the event on 2025-03-10 18:00."
        );
    }
}
