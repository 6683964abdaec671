//! HTTP + WebSocket gateway
//!
//! Endpoints:
//! - POST /publish/:channel - Scale publishes a raw reading payload
//! - GET /session - Session status
//! - POST /session/start - Start (or restart) listening
//! - POST /session/stop - Stop listening
//! - WS /ws - Live weight events
//! - GET /health - Health check

use axum::{
    body::Bytes,
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::config::ScaleConfig;
use crate::core::broker::Broker;
use crate::core::discovery::resolve_broker_addr;
use crate::core::observer::{BroadcastObserver, FanoutObserver, WeightObserver};
use crate::core::session::ScaleSession;
use crate::error::ConnectionError;
use crate::types::{ScalePhase, SessionStatus, WeightEvent};

/// Live events buffered per WebSocket client before it lags
const EVENT_CAPACITY: usize = 100;

/// App state
pub struct AppState {
    pub broker: Arc<Broker>,
    pub session: Mutex<ScaleSession<Arc<Broker>>>,
    pub events: BroadcastObserver,
    pub client_id: String,
}

impl AppState {
    /// State whose callbacks only feed WebSocket clients
    pub fn new(config: &ScaleConfig) -> Self {
        Self::with_observer(config, None)
    }

    /// State whose callbacks feed WebSocket clients and `observer`
    pub fn with_observer(config: &ScaleConfig, observer: Option<Arc<dyn WeightObserver>>) -> Self {
        let broker = Arc::new(Broker::new());
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        let events = BroadcastObserver::new(tx);

        let mut fanout = FanoutObserver::new().with(Arc::new(events.clone()));
        if let Some(observer) = observer {
            fanout = fanout.with(observer);
        }
        let session = ScaleSession::new(broker.clone(), config, Arc::new(fanout));

        Self {
            broker,
            session: Mutex::new(session),
            events,
            client_id: config.transport.client_id.clone(),
        }
    }

    fn session(&self) -> MutexGuard<'_, ScaleSession<Arc<Broker>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start_session(&self) -> Result<SessionStatus, ConnectionError> {
        let mut session = self.session();
        session.start()?;
        Ok(session.status())
    }

    pub fn stop_session(&self) -> SessionStatus {
        let mut session = self.session();
        session.stop();
        session.status()
    }

    pub fn status(&self) -> SessionStatus {
        self.session().status()
    }

    /// Stop listening and close the broker
    pub fn shutdown(&self) {
        self.session().stop();
        self.broker.close();
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub client_id: String,
    pub channel: String,
    pub phase: ScalePhase,
    pub subscribers: usize,
}

/// Publish response
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub channel: String,
    pub delivered: usize,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn unavailable(err: ConnectionError) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse { error: err.to_string() }),
    )
}

/// Create the gateway router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/publish/*channel", post(publish))
        .route("/session", get(get_session))
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = state.status();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        client_id: state.client_id.clone(),
        subscribers: state.broker.subscriber_count(&status.channel),
        channel: status.channel,
        phase: status.phase,
    })
}

/// Publish a raw payload on a channel
async fn publish(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let delivered = state
        .broker
        .publish(&channel, body.to_vec())
        .map_err(unavailable)?;
    Ok(Json(PublishResponse { channel, delivered }))
}

/// Get session status
async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.status())
}

/// Start or restart the session
async fn start_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionStatus>, ApiError> {
    state.start_session().map(Json).map_err(unavailable)
}

/// Stop the session
async fn stop_session(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.stop_session())
}

/// WebSocket handler for live events
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward events until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<WeightEvent>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(error) => {
                            warn!(%error, "event not encodable, skipped");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Run the gateway until Ctrl-C
pub async fn run_server(
    config: &ScaleConfig,
    observer: Option<Arc<dyn WeightObserver>>,
) -> crate::Result<()> {
    let addr = resolve_broker_addr(&config.transport)?;
    let state = Arc::new(AppState::with_observer(config, observer));
    state.start_session()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ConnectionError::Bind { addr, source })?;
    info!(%addr, channel = %config.transport.channel, "gateway listening");
    println!("⚖ scalewatch gateway running on {}", addr);
    println!("  POST /publish/{}  - Publish a reading", config.transport.channel);
    println!("  GET  /session          - Session status");
    println!("  POST /session/start    - Start / restart");
    println!("  POST /session/stop     - Stop");
    println!("  WS   /ws               - Live events");
    println!("  GET  /health           - Health check");

    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
