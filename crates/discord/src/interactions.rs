use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use rollcall_core::domain::event::{AttendanceAction, EventId, MessageRef};

use crate::{
    commands::{
        AttendanceCommandService, CommandOutcome, CommandRouteError, CommandRouter, CreateReply,
        NoopAttendanceCommandService, SlashCommandPayload,
    },
    payloads::{self, EphemeralReply, RosterMessage},
};

#[derive(Clone, Debug, PartialEq)]
pub struct GatewayEnvelope {
    pub interaction_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GatewayEvent {
    SlashCommand(SlashCommandPayload),
    ComponentAction(ComponentActionEvent),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::SlashCommand(_) => GatewayEventType::SlashCommand,
            Self::ComponentAction(_) => GatewayEventType::ComponentAction,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    SlashCommand,
    ComponentAction,
    Unsupported,
}

/// Button click on a previously posted roster message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentActionEvent {
    pub custom_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub user_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// Splits a button custom id into its action and the event id it targets.
/// Only the first underscore separates the two, so event ids may contain
/// underscores themselves.
pub fn parse_action_custom_id(custom_id: &str) -> Option<(AttendanceAction, EventId)> {
    let (action, event_id) = custom_id.split_once('_')?;
    if event_id.is_empty() {
        return None;
    }

    let action = match action {
        "signup" => AttendanceAction::SignUp,
        "signoff" => AttendanceAction::SignOff,
        _ => return None,
    };

    Some((action, EventId(event_id.to_owned())))
}

/// Instruction to re-render the stored roster message in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterUpdate {
    pub message_ref: MessageRef,
    pub message: RosterMessage,
}

/// Line destined for the configured log channel; absent channel means the
/// notice is dropped after logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LateActionLog {
    pub channel_id: Option<String>,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionReply {
    pub confirmation: EphemeralReply,
    pub roster_update: Option<RosterUpdate>,
    pub late_notice: Option<LateActionLog>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionReply {
    EventCreated(CreateReply),
    Ephemeral(EphemeralReply),
    ActionApplied(ActionReply),
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandlerResult {
    Responded(InteractionReply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("component action handler failure: {0}")]
    ComponentAction(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopAttendanceCommandService));
    dispatcher.register(ComponentActionHandler::new(NoopComponentActionService));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: AttendanceCommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: AttendanceCommandService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let reply = match self.router.route(payload.clone()).await? {
            CommandOutcome::Created(reply) => InteractionReply::EventCreated(reply),
            CommandOutcome::Rejected(reply) => InteractionReply::Ephemeral(reply),
        };
        Ok(HandlerResult::Responded(reply))
    }
}

#[async_trait]
pub trait ComponentActionService: Send + Sync {
    async fn apply_action(
        &self,
        action: AttendanceAction,
        event_id: &EventId,
        event: &ComponentActionEvent,
        ctx: &EventContext,
    ) -> Result<ActionReply, EventHandlerError>;
}

#[async_trait]
impl<T> ComponentActionService for Arc<T>
where
    T: ComponentActionService + ?Sized,
{
    async fn apply_action(
        &self,
        action: AttendanceAction,
        event_id: &EventId,
        event: &ComponentActionEvent,
        ctx: &EventContext,
    ) -> Result<ActionReply, EventHandlerError> {
        (**self).apply_action(action, event_id, event, ctx).await
    }
}

pub struct ComponentActionHandler<S> {
    service: S,
}

impl<S> ComponentActionHandler<S>
where
    S: ComponentActionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ComponentActionHandler<S>
where
    S: ComponentActionService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::ComponentAction
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::ComponentAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        // Garbled custom ids come back as guidance, never as a crash.
        let Some((action, event_id)) = parse_action_custom_id(&event.custom_id) else {
            return Ok(HandlerResult::Responded(InteractionReply::Ephemeral(
                payloads::error_reply("This button is not wired to an attendance poll."),
            )));
        };

        let reply = self.service.apply_action(action, &event_id, event, ctx).await?;
        Ok(HandlerResult::Responded(InteractionReply::ActionApplied(reply)))
    }
}

/// Replies "Event not found." to every action; it knows no events.
#[derive(Default)]
pub struct NoopComponentActionService;

#[async_trait]
impl ComponentActionService for NoopComponentActionService {
    async fn apply_action(
        &self,
        _action: AttendanceAction,
        _event_id: &EventId,
        _event: &ComponentActionEvent,
        _ctx: &EventContext,
    ) -> Result<ActionReply, EventHandlerError> {
        Ok(ActionReply {
            confirmation: payloads::event_not_found_reply(),
            roster_update: None,
            late_notice: None,
        })
    }
}
