use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use rollcall_core::domain::event::EventId;
use rollcall_core::engine::RosterView;

use crate::payloads::{self, EphemeralReply, RosterMessage};

pub const COMMAND_NAME: &str = "attendance";

pub const OPTION_DATE: &str = "date";
pub const OPTION_DESCRIPTION: &str = "description";
pub const OPTION_TITLE: &str = "title";
pub const OPTION_DEADLINE_MINUTES: &str = "deadline_minutes";

// Discord application-command option type codes.
const OPTION_TYPE_STRING: u8 = 3;
const OPTION_TYPE_NUMBER: u8 = 10;

/// Registration payload for one guild slash command. Sending it over REST
/// is the deployment script's job; this crate only defines the shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub options: Vec<CommandOptionDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandOptionDefinition {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub required: bool,
}

pub fn command_definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition {
        name: COMMAND_NAME.to_owned(),
        description: "Creates a new attendance poll".to_owned(),
        options: vec![
            CommandOptionDefinition {
                kind: OPTION_TYPE_STRING,
                name: OPTION_DATE.to_owned(),
                description: "Format: YYYY-MM-DD HH:MM".to_owned(),
                required: true,
            },
            CommandOptionDefinition {
                kind: OPTION_TYPE_STRING,
                name: OPTION_DESCRIPTION.to_owned(),
                description: "Description of the event".to_owned(),
                required: true,
            },
            CommandOptionDefinition {
                kind: OPTION_TYPE_STRING,
                name: OPTION_TITLE.to_owned(),
                description: "Optional: custom poll title".to_owned(),
                required: false,
            },
            CommandOptionDefinition {
                kind: OPTION_TYPE_NUMBER,
                name: OPTION_DEADLINE_MINUTES.to_owned(),
                description: "Optional: minutes until registration closes (default: 24h before)"
                    .to_owned(),
                required: false,
            },
        ],
    }]
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Text(String),
    Number(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

/// Inbound slash-command interaction, already stripped to the fields the
/// core cares about.
#[derive(Clone, Debug, PartialEq)]
pub struct SlashCommandPayload {
    pub command_name: String,
    pub interaction_id: String,
    pub channel_id: String,
    pub user_name: String,
    pub options: Vec<CommandOption>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateEventCommand {
    pub interaction_id: String,
    pub channel_id: String,
    pub user_name: String,
    pub date_text: String,
    pub description: String,
    pub title: Option<String>,
    pub deadline_minutes: Option<f64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),
    #[error("option `{0}` has the wrong type")]
    WrongOptionType(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn parse_create_command(
    payload: SlashCommandPayload,
) -> Result<CreateEventCommand, CommandParseError> {
    if payload.command_name != COMMAND_NAME {
        return Err(CommandParseError::UnsupportedCommand(payload.command_name));
    }

    let date_text = required_text(&payload.options, OPTION_DATE)?;
    let description = required_text(&payload.options, OPTION_DESCRIPTION)?;
    let title = optional_text(&payload.options, OPTION_TITLE)?;
    let deadline_minutes = optional_number(&payload.options, OPTION_DEADLINE_MINUTES)?;

    Ok(CreateEventCommand {
        interaction_id: payload.interaction_id,
        channel_id: payload.channel_id,
        user_name: payload.user_name,
        date_text,
        description,
        title,
        deadline_minutes,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateReply {
    pub event_id: EventId,
    pub message: RosterMessage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Created(CreateReply),
    Rejected(EphemeralReply),
}

#[async_trait]
pub trait AttendanceCommandService: Send + Sync {
    async fn create_event(
        &self,
        command: CreateEventCommand,
    ) -> Result<CommandOutcome, CommandRouteError>;
}

#[async_trait]
impl<T> AttendanceCommandService for Arc<T>
where
    T: AttendanceCommandService + ?Sized,
{
    async fn create_event(
        &self,
        command: CreateEventCommand,
    ) -> Result<CommandOutcome, CommandRouteError> {
        (**self).create_event(command).await
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: AttendanceCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Parse failures never escape as errors; they come back as ephemeral
    /// guidance for the invoking user.
    pub async fn route(
        &self,
        payload: SlashCommandPayload,
    ) -> Result<CommandOutcome, CommandRouteError> {
        let command = match parse_create_command(payload) {
            Ok(command) => command,
            Err(error) => {
                return Ok(CommandOutcome::Rejected(payloads::error_reply(&format!(
                    "❌ {error}"
                ))))
            }
        };

        self.service.create_event(command).await
    }
}

/// Echoes the command back as an unvalidated roster; stands in for the
/// real attendance service in tests and scaffolding.
#[derive(Default)]
pub struct NoopAttendanceCommandService;

#[async_trait]
impl AttendanceCommandService for NoopAttendanceCommandService {
    async fn create_event(
        &self,
        command: CreateEventCommand,
    ) -> Result<CommandOutcome, CommandRouteError> {
        let event_id = EventId(command.interaction_id);
        let view = RosterView {
            title: command.title.unwrap_or_else(|| "Attendance poll".to_owned()),
            description: command.description,
            event_date_text: command.date_text.clone(),
            deadline_text: command.date_text,
            signed_up_names: Vec::new(),
            signed_off_names: Vec::new(),
        };

        Ok(CommandOutcome::Created(CreateReply {
            message: payloads::roster_message(&event_id, &view),
            event_id,
        }))
    }
}

fn find_option<'a>(options: &'a [CommandOption], name: &str) -> Option<&'a OptionValue> {
    options.iter().find(|option| option.name == name).map(|option| &option.value)
}

fn required_text(
    options: &[CommandOption],
    name: &'static str,
) -> Result<String, CommandParseError> {
    match find_option(options, name) {
        Some(OptionValue::Text(value)) => Ok(value.clone()),
        Some(_) => Err(CommandParseError::WrongOptionType(name)),
        None => Err(CommandParseError::MissingOption(name)),
    }
}

fn optional_text(
    options: &[CommandOption],
    name: &'static str,
) -> Result<Option<String>, CommandParseError> {
    match find_option(options, name) {
        Some(OptionValue::Text(value)) => Ok(Some(value.clone())),
        Some(_) => Err(CommandParseError::WrongOptionType(name)),
        None => Ok(None),
    }
}

fn optional_number(
    options: &[CommandOption],
    name: &'static str,
) -> Result<Option<f64>, CommandParseError> {
    match find_option(options, name) {
        Some(OptionValue::Number(value)) => Ok(Some(*value)),
        Some(_) => Err(CommandParseError::WrongOptionType(name)),
        None => Ok(None),
    }
}
