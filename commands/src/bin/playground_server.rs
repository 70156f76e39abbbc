//! # Playground Dev Server
//!
//! An `axum` HTTP harness exposing the C6 command surface as JSON endpoints:
//! a `clap`-parsed `AppConfig`, a `tracing` `FmtSubscriber`, and a small
//! `axum::Router` with one route per command. This binary exists purely for
//! manual exercising and for `playground_tests` to drive over the wire; it
//! is not part of the stable command-surface contract itself.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use codezone_commands::Commands;
use codezone_core::{ExecutionRequest, PostgresConfig};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Dev HTTP harness for the CodeZone execution command surface.")]
struct AppConfig {
    #[clap(long, env = "PORT", default_value_t = 4000)]
    port: u16,
}

#[derive(Serialize)]
struct LanguagesResponse {
    languages: Vec<String>,
}

#[derive(Deserialize)]
struct RefreshRequest {
    language: String,
}

#[derive(Serialize)]
struct ConnectionResponse {
    connected: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    connected: bool,
}

#[derive(Serialize)]
struct GoVersionResponse {
    version: String,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

type SharedCommands = Arc<Commands>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set global default tracing subscriber");

    let app_config = AppConfig::parse();
    let commands = Arc::new(Commands::new());

    let app = Router::new()
        .route("/execute", post(execute_handler))
        .route("/languages", get(languages_handler))
        .route("/executors/refresh", post(refresh_handler))
        .route("/postgres/connect", post(connect_handler))
        .route("/postgres/config", post(set_config_handler))
        .route("/postgres/status", get(status_handler))
        .route("/postgres/disconnect", post(disconnect_handler))
        .route("/go/version", get(go_version_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(commands);

    let addr = SocketAddr::from(([127, 0, 0, 1], app_config.port));
    info!("starting playground dev server on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn execute_handler(
    State(commands): State<SharedCommands>,
    Json(request): Json<ExecutionRequest>,
) -> Json<codezone_core::ExecutionResult> {
    let language = request.language;
    match commands.execute(request).await {
        Ok(result) => Json(result),
        Err(e) => Json(codezone_core::ExecutionResult::failure(
            language,
            e.to_string(),
            codezone_core::exit_codes::GENERIC_FAILURE,
            std::time::Duration::ZERO,
        )),
    }
}

async fn languages_handler(State(commands): State<SharedCommands>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: commands.get_supported_languages().await,
    })
}

async fn refresh_handler(
    State(commands): State<SharedCommands>,
    Json(body): Json<RefreshRequest>,
) -> Json<OkResponse> {
    let ok = commands.refresh_executor(&body.language).await.is_ok();
    Json(OkResponse { ok })
}

async fn connect_handler(
    State(commands): State<SharedCommands>,
    Json(cfg): Json<PostgresConfig>,
) -> Json<ConnectionResponse> {
    let (connected, error) = commands.handle_connection(cfg).await;
    Json(ConnectionResponse { connected, error })
}

async fn set_config_handler(
    State(commands): State<SharedCommands>,
    Json(cfg): Json<PostgresConfig>,
) -> Json<OkResponse> {
    let ok = commands.set_postgresql_config(cfg).await.is_ok();
    Json(OkResponse { ok })
}

async fn status_handler(State(commands): State<SharedCommands>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connected: commands.get_postgresql_connection_status().await,
    })
}

async fn disconnect_handler(State(commands): State<SharedCommands>) -> Json<OkResponse> {
    let ok = commands.disconnect_postgresql().await.is_ok();
    Json(OkResponse { ok })
}

async fn go_version_handler(State(commands): State<SharedCommands>) -> Json<GoVersionResponse> {
    Json(GoVersionResponse {
        version: commands.get_go_version().await,
    })
}
