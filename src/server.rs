//! HTTP/WebSocket control plane.
//!
//! Three routes: `POST /simulate/start`, `POST /simulate/stop`,
//! `GET /ws/simulation`. A natural-language summarizer and persistence are
//! separate concerns and are not implemented here.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::SimConfig;
use crate::driver::{self, StopSignal, TelemetryRecord};

/// Shared state for one control-plane process: the telemetry broadcast
/// sender every `/ws/simulation` subscriber joins, and the stop signal for
/// whichever run is currently active (if any).
#[derive(Clone)]
pub struct AppState {
    sink: broadcast::Sender<TelemetryRecord>,
    stop: Arc<Mutex<Option<StopSignal>>>,
}

/// Body returned when `POST /simulate/start` is rejected for a bad config.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the control-plane router. `sink` is also the channel new
/// `/ws/simulation` connections subscribe to — callers keep a clone to feed
/// it into `driver::run` for a CLI-driven run, or let `start_simulation`
/// spawn the run itself.
#[must_use]
pub fn create_router(sink: broadcast::Sender<TelemetryRecord>) -> Router {
    let state = AppState {
        sink,
        stop: Arc::new(Mutex::new(None)),
    };

    Router::new()
        .route("/simulate/start", post(start_simulation))
        .route("/simulate/stop", post(stop_simulation))
        .route("/ws/simulation", get(simulation_ws))
        .with_state(state)
}

/// Validate the posted `SimConfig`, spawn the run as a background task, and
/// install its `StopSignal` so a subsequent `/simulate/stop` can reach it.
/// Responds immediately; the run's progress is only observable over
/// `/ws/simulation` — the control plane and the telemetry sink are separate
/// interfaces.
async fn start_simulation(State(state): State<AppState>, Json(config): Json<SimConfig>) -> impl IntoResponse {
    if let Err(err) = config.validate() {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: err.to_string() })).into_response();
    }

    let stop = StopSignal::new();
    *state.stop.lock().unwrap() = Some(stop.clone());

    let sink = state.sink.clone();
    tokio::spawn(async move {
        info!(nodes = config.nodes, duration = config.duration, "simulation run starting");
        if let Err(err) = driver::run(config, stop, sink).await {
            warn!(%err, "simulation run ended with an error");
        }
    });

    StatusCode::ACCEPTED.into_response()
}

/// Set the stop signal of whatever run is currently installed, if any. A run
/// already finished, or no run ever started, both answer `404`.
async fn stop_simulation(State(state): State<AppState>) -> impl IntoResponse {
    match state.stop.lock().unwrap().as_ref() {
        Some(stop) => {
            stop.stop();
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Upgrade to a WebSocket and forward every telemetry record published on
/// `sink` to this subscriber until it disconnects or the channel closes.
async fn simulation_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.sink.subscribe();
    ws.on_upgrade(move |socket| stream_telemetry(socket, rx))
}

async fn stream_telemetry(mut socket: WebSocket, mut rx: broadcast::Receiver<TelemetryRecord>) {
    loop {
        match rx.recv().await {
            Ok(record) => {
                let Ok(text) = serde_json::to_string(&record) else {
                    continue;
                };
                if socket.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Bind `addr` and return the listener plus its actual address (port `0`
/// lets the OS pick, useful for tests).
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> std::io::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await?;
    let actual = listener.local_addr()?;
    Ok((listener, actual))
}

/// Serve `router` on `listener` until the process is killed.
///
/// # Errors
///
/// Returns an error if the server fails while accepting or serving
/// connections.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(listener, router).await
}
