use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use rollcall_core::domain::event::{AttendanceAction, EventId, MessageRef};
use rollcall_core::engine::{self, AttendanceEngine, CreateEventRequest, DurabilityStatus};
use rollcall_core::errors::{ApplicationError, DomainError};

use crate::{
    commands::{
        AttendanceCommandService, CommandOutcome, CommandRouteError, CreateEventCommand,
        CreateReply,
    },
    interactions::{
        ActionReply, ComponentActionEvent, ComponentActionService, EventContext,
        EventHandlerError, LateActionLog, RosterUpdate,
    },
    payloads,
};

/// Bridges gateway requests to the attendance engine.
///
/// Every mutation runs while holding the one engine lock, so a second
/// request on the same event can never observe a half-applied first one,
/// even across await points.
pub struct AttendanceService {
    engine: Mutex<AttendanceEngine>,
    log_channel_id: Option<String>,
}

impl AttendanceService {
    pub fn new(engine: AttendanceEngine, log_channel_id: Option<String>) -> Self {
        Self { engine: Mutex::new(engine), log_channel_id }
    }

    /// Records where the posted roster message lives once the adapter has
    /// sent it, so later actions can edit it in place.
    pub async fn attach_roster_message(
        &self,
        event_id: &EventId,
        message_ref: MessageRef,
    ) -> Result<(), DomainError> {
        let mut engine = self.engine.lock().await;
        let durability = engine.attach_message_ref(event_id, message_ref)?;
        report_durability(&durability, event_id);
        Ok(())
    }

    pub async fn event_count(&self) -> usize {
        self.engine.lock().await.store().len()
    }
}

#[async_trait]
impl AttendanceCommandService for AttendanceService {
    async fn create_event(
        &self,
        command: CreateEventCommand,
    ) -> Result<CommandOutcome, CommandRouteError> {
        let now = Utc::now();
        let request = CreateEventRequest {
            id_hint: Some(command.interaction_id),
            date_text: command.date_text,
            description: command.description,
            title: command.title,
            explicit_deadline_minutes: command.deadline_minutes,
        };

        let mut engine = self.engine.lock().await;
        match engine.create_event(request, now) {
            Ok(outcome) => {
                report_durability(&outcome.durability, &outcome.event_id);
                info!(
                    event_name = "attendance.event.created",
                    event_id = %outcome.event_id,
                    user_name = %command.user_name,
                    event_date = %outcome.roster.event_date_text,
                    deadline = %outcome.roster.deadline_text,
                    "attendance poll created"
                );

                Ok(CommandOutcome::Created(CreateReply {
                    message: payloads::roster_message(&outcome.event_id, &outcome.roster),
                    event_id: outcome.event_id,
                }))
            }
            Err(DomainError::InvalidDateTime(error)) => {
                Ok(CommandOutcome::Rejected(payloads::error_reply(&format!("❌ {error}"))))
            }
            Err(DomainError::DeadlineAfterEvent { .. }) => {
                Ok(CommandOutcome::Rejected(payloads::error_reply(
                    "❌ The registration deadline must be **before** the event.",
                )))
            }
            Err(error) => Err(CommandRouteError::Service(error.to_string())),
        }
    }
}

#[async_trait]
impl ComponentActionService for AttendanceService {
    async fn apply_action(
        &self,
        action: AttendanceAction,
        event_id: &EventId,
        event: &ComponentActionEvent,
        ctx: &EventContext,
    ) -> Result<ActionReply, EventHandlerError> {
        let now = Utc::now();

        let mut engine = self.engine.lock().await;
        let outcome = match action {
            AttendanceAction::SignUp => engine.sign_up(event_id, &event.user_name, now),
            AttendanceAction::SignOff => engine.sign_off(event_id, &event.user_name, now),
        };

        match outcome {
            Ok(outcome) => {
                report_durability(&outcome.durability, event_id);

                let confirmation = match action {
                    AttendanceAction::SignUp => {
                        payloads::sign_up_confirmation(&outcome.roster.event_date_text)
                    }
                    AttendanceAction::SignOff => {
                        payloads::sign_off_confirmation(&outcome.roster.event_date_text)
                    }
                };

                let roster_update = outcome.message_ref.map(|message_ref| RosterUpdate {
                    message_ref,
                    message: payloads::roster_message(event_id, &outcome.roster),
                });

                let late_notice = outcome.late_notice.map(|notice| {
                    info!(
                        event_name = "attendance.action.late",
                        event_id = %notice.event_id,
                        user_name = %notice.participant,
                        correlation_id = %ctx.correlation_id,
                        "action recorded after the registration deadline"
                    );
                    LateActionLog {
                        channel_id: self.log_channel_id.clone(),
                        content: payloads::late_action_log_line(
                            &notice.participant,
                            notice.action,
                            &engine::format_datetime(notice.event_date),
                        ),
                    }
                });

                Ok(ActionReply { confirmation, roster_update, late_notice })
            }
            Err(error @ DomainError::EventNotFound(_)) => {
                info!(
                    event_name = "attendance.action.unknown_event",
                    event_id = %event_id,
                    user_name = %event.user_name,
                    correlation_id = %ctx.correlation_id,
                    "action on unknown event id"
                );
                let interface =
                    ApplicationError::from(error).into_interface(ctx.correlation_id.clone());
                Ok(ActionReply {
                    confirmation: payloads::error_reply(interface.user_message()),
                    roster_update: None,
                    late_notice: None,
                })
            }
            Err(error) => Err(EventHandlerError::ComponentAction(error.to_string())),
        }
    }
}

fn report_durability(durability: &DurabilityStatus, event_id: &EventId) {
    if let DurabilityStatus::Degraded(reason) = durability {
        warn!(
            event_name = "attendance.snapshot.degraded",
            event_id = %event_id,
            error = %reason,
            "snapshot write failed; in-memory state remains authoritative"
        );
    }
}
