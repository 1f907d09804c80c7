use std::sync::Arc;

use rollcall_core::config::{AppConfig, ConfigError, LoadOptions};
use rollcall_core::engine::AttendanceEngine;
use rollcall_core::store::EventStore;
use rollcall_discord::gateway::{GatewayRunner, NoopGatewayTransport, ReconnectPolicy};
use rollcall_discord::interactions::{
    ComponentActionHandler, EventDispatcher, SlashCommandHandler,
};
use rollcall_discord::service::AttendanceService;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub service: Arc<AttendanceService>,
    pub gateway_runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    // A missing snapshot means a first boot; an unreadable one is logged
    // and the process starts empty rather than refusing to come up.
    let store = match EventStore::open(&config.snapshot.path) {
        Ok(store) => {
            info!(
                event_name = "system.bootstrap.snapshot_loaded",
                correlation_id = "bootstrap",
                snapshot_path = %config.snapshot.path.display(),
                event_count = store.len(),
                "event snapshot loaded"
            );
            store
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.snapshot_unreadable",
                correlation_id = "bootstrap",
                snapshot_path = %config.snapshot.path.display(),
                error = %error,
                "event snapshot could not be loaded; starting with an empty store"
            );
            EventStore::with_snapshot_path(&config.snapshot.path)
        }
    };

    let engine = AttendanceEngine::new(store);
    let service =
        Arc::new(AttendanceService::new(engine, config.discord.log_channel_id.clone()));

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service.clone()));
    dispatcher.register(ComponentActionHandler::new(service.clone()));

    let gateway_runner = GatewayRunner::new(
        Arc::new(NoopGatewayTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, service, gateway_runner })
}
