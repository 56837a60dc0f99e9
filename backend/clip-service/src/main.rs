/// Clip Service - HTTP Server
///
/// Accepts uploads, converts them in the background and serves the
/// per-conversation video feed.
use actix_web::{App, HttpServer};
use anyhow::Context;
use clip_service::db::SqliteStore;
use clip_service::middleware::RequestMetrics;
use clip_service::services::FfmpegTranscoder;
use clip_service::session::SessionStore;
use clip_service::{metrics, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        env = %config.app.env,
        videos_dir = %config.storage.videos_dir.display(),
        "starting clip-service"
    );

    tokio::fs::create_dir_all(&config.storage.videos_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create videos directory {}",
                config.storage.videos_dir.display()
            )
        })?;

    let store = SqliteStore::connect(&config.database)
        .await
        .context("failed to open database")?;

    metrics::init();

    let sessions = Arc::new(SessionStore::with_ttl(
        config.session.ttl_secs.map(Duration::from_secs),
    ));
    let transcoder = Arc::new(FfmpegTranscoder::new(
        &config.transcode.ffmpeg_path,
        config.transcode.timeout(),
    ));

    let state = AppState::new(&config, store.clone(), sessions, transcoder);

    match state.recover().await {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "re-enqueued pending videos"),
        Err(e) => tracing::error!(error = %e, "recovery sweep failed"),
    }

    let bind_address = config.bind_address();
    tracing::info!(address = %bind_address, "HTTP server listening");

    let grace = Duration::from_secs(config.app.shutdown_grace_secs);
    let app_state = state.clone();
    let server = HttpServer::new(move || {
        let app_state = app_state.clone();
        App::new()
            .wrap(RequestMetrics)
            .configure(move |cfg| app_state.configure(cfg))
    })
    .shutdown_timeout(grace.as_secs())
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run();

    let served = server.await;

    tracing::info!("HTTP server stopped, draining transcode queue");
    state.shutdown(grace).await;
    store.close().await;
    tracing::info!("clip-service shut down");

    served.context("HTTP server failed")
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info")),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}
