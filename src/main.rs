use std::{process, sync::Arc};

use crudboard::{
    application::{
        console::{Console, ConsoleOptions},
        error::AppError,
        records::RecordsApi,
    },
    config,
    infra::{
        api::ApiClient,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let api = ApiClient::new(&settings.api)?;
    info!(
        api_url = %api.base_url(),
        timeout_ms = u64::try_from(settings.api.timeout.as_millis()).unwrap_or(u64::MAX),
        "API client configured"
    );
    let api: Arc<dyn RecordsApi> = Arc::new(api);
    let console = Console::new(api, ConsoleOptions::from(&settings));

    let sweeper = console
        .notifications()
        .spawn_sweeper(settings.notifications.sweep_interval);

    let result = serve_http(&settings, console).await;

    sweeper.abort();
    let _ = sweeper.await;

    result
}

async fn serve_http(settings: &config::Settings, console: Console) -> Result<(), AppError> {
    let router = http::build_router(HttpState::new(console));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Console listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("Console stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
