use masked_sms_conversation::ConversationService;
use masked_sms_provider::TwilioClient;
use masked_sms_server::{config::ServerConfig, routes, state::AppState};
use masked_sms_store::JsonStore;
use masked_sms_watchdog::{FixedDelay, InactivityWatchdog};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let store = Arc::new(
        JsonStore::open(config.data_path.clone())
            .await
            .expect("failed to open data store"),
    );
    tracing::info!(path = %config.data_path.display(), "Opened data store");

    let gateway =
        Arc::new(TwilioClient::new(config.twilio.clone()).expect("invalid Twilio configuration"));
    let service = Arc::new(ConversationService::new(
        store.clone(),
        gateway,
        config.conversation.friendly_name.clone(),
    ));

    // Spawn the inactivity watchdog
    let shutdown = CancellationToken::new();
    let watchdog = InactivityWatchdog::new(
        service.clone(),
        store,
        config.watchdog.expired_message.clone(),
    );
    let schedule = FixedDelay::new(config.watchdog.interval());
    let watchdog_cancel = shutdown.child_token();
    let watchdog_task =
        tokio::spawn(async move { schedule.run(&watchdog, watchdog_cancel).await });

    let app = routes::router(AppState::new(
        service,
        config.conversation.welcome_message.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("server error");

    shutdown.cancel();
    match watchdog_task.await {
        Ok(cycles) => tracing::info!(cycles, "Watchdog stopped"),
        Err(e) => tracing::warn!(error = %e, "Watchdog task failed"),
    }
}

/// Resolves on Ctrl-C and cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                shutdown.cancelled().await;
            }
            tracing::info!("Shutting down");
        }
        () = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
