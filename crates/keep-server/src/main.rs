mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use keep_api::auth::{AppState, AppStateInner, seed_admin};
use keep_db::Database;
use keep_reminders::push::{PushHub, PushSink};
use keep_reminders::{LogSink, NotificationSink, ReminderEngine};

use crate::config::{Config, SinkKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "keep=debug,keep_api=debug,keep_db=info,keep_reminders=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    if let Some(password) = &config.admin_password {
        if seed_admin(&db, password)? {
            info!("Seeded admin account");
        }
    }

    let push = PushHub::new();
    let sink: Arc<dyn NotificationSink> = match config.sink {
        SinkKind::Push => Arc::new(PushSink::new(push.clone())),
        SinkKind::Log => Arc::new(LogSink),
    };

    // Background reminder scan
    let shutdown = CancellationToken::new();
    let engine = ReminderEngine::new(
        db.clone(),
        sink,
        config.reminder_interval,
        config.delivery_timeout,
    );
    let engine_handle = tokio::spawn(engine.run(shutdown.clone()));

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        push,
    });
    let app = keep_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Keep server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    // Let an in-flight reminder cycle finish
    shutdown.cancel();
    engine_handle.await?;

    info!("Keep server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
