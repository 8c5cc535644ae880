use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use snap_core::config::SnapConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

mod session;

use session::{format_error, PickSession};

/// Dwell timers are advanced at this rate while a pick is running.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

// Application State
struct AppState {
    config: SnapConfig,
}

fn load_config() -> SnapConfig {
    let Some(path) = std::env::args().nth(1) else {
        return SnapConfig::default();
    };
    match SnapConfig::from_json_file(&path) {
        Ok(config) => {
            info!("Loaded snap settings from {}", path);
            config
        }
        Err(e) => {
            warn!("Ignoring snap settings {}: {}", path, e);
            SnapConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let shared_state = Arc::new(AppState { config: load_config() });

    // build our application with a route
    let app = Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on {}", addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        warn!("Server stopped: {}", e);
    }
}

async fn root() -> &'static str {
    "Hello from Snap Backend!"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    info!("Client connected: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let mut session = PickSession::new(state.config.clone());
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let frames = tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    debug!("[{}] <- {}", session_id, text);
                    session.handle_text(&text, Instant::now())
                }
                Some(Ok(Message::Binary(_))) => {
                    vec![format_error("UNSUPPORTED_FRAME", "Binary frames are not supported", "warning")]
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("[{}] Socket error: {}", session_id, e);
                    break;
                }
            },
            _ = ticker.tick() => {
                if !session.is_picking() {
                    continue;
                }
                session.tick(Instant::now())
            }
        };

        for frame in frames {
            if sender.send(Message::Text(frame)).await.is_err() {
                info!("Client disconnected: {}", session_id);
                return;
            }
        }
    }

    // Dropping the session tears down any running pick and its meshes
    info!("Client disconnected: {}", session_id);
}
