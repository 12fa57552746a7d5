use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use adrift_api::{AppState, AppStateInner, bottles, holds, memorials, players, replies};
use adrift_core::{BottleService, SWEEP_INTERVAL_SECS, sweep};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adrift=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("ADRIFT_DB_PATH").unwrap_or_else(|_| "adrift.db".into());
    let host = std::env::var("ADRIFT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ADRIFT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let sweep_secs: u64 = std::env::var("ADRIFT_SWEEP_SECS")
        .unwrap_or_else(|_| SWEEP_INTERVAL_SECS.to_string())
        .parse()?;

    // Store + lifecycle engine, built once and shared
    let db = Arc::new(adrift_db::Database::open(&PathBuf::from(&db_path))?);
    let service = BottleService::new(db.clone());
    let state: AppState = Arc::new(AppStateInner { service });

    // Background sweep with an explicit stop signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_task = tokio::spawn(sweep::run_sweep_loop(db, sweep_secs, shutdown_rx));

    let app = Router::new()
        .route(
            "/api/bottles",
            post(bottles::create_bottle).get(bottles::list_bottles),
        )
        .route("/api/bottles/fish", post(bottles::fish_bottle))
        .route("/api/bottles/{id}", get(bottles::get_bottle))
        .route("/api/bottles/{id}/replies", post(replies::reply_to_bottle))
        .route("/api/bottles/{id}/retrieve", post(bottles::retrieve_bottle))
        .route("/api/bottles/{id}/dredge", post(memorials::dredge))
        .route("/api/replies", post(replies::reply_direct))
        .route("/api/dredge/{id}", post(memorials::dredge_by_id))
        .route("/api/holds/{id}", delete(holds::release_hold))
        .route(
            "/api/players/{player}/holds",
            delete(holds::release_all_for_player),
        )
        .route(
            "/api/players/{player}/morality",
            get(players::get_morality).post(players::apply_morality),
        )
        .route("/api/limits", get(players::check_limits))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Adrift server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // stop the sweep before tearing the store down
    let _ = shutdown_tx.send(true);
    let _ = sweep_task.await;

    Ok(())
}
