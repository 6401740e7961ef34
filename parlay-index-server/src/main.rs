use futures::{SinkExt, StreamExt};
use parlay_index::{GammaClient, IndexCache, IndexCompositor, RandomPolicy};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Client request frames.
///
/// ```json
/// { "op": "list" }
/// { "op": "index", "id": "ai-frontier" }
/// { "op": "history", "id": "ai-frontier" }
/// { "op": "book", "id": "ai-frontier" }
/// { "op": "candles", "id": "ai-frontier", "bucket_hours": 4.0 }
/// ```
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ClientRequest {
    List,
    Index { id: String },
    History { id: String },
    Book { id: String },
    Candles { id: String, bucket_hours: f64 },
}

#[tokio::main]
async fn main() {
    init_logging();

    info!("Starting parlay-index WebSocket server");

    let provider = match GammaClient::new() {
        Ok(client) => Arc::new(client),
        Err(error) => {
            error!(%error, "failed to construct provider client");
            return;
        }
    };
    let compositor = Arc::new(IndexCompositor::new(
        provider,
        Arc::new(IndexCache::new()),
        Arc::new(RandomPolicy),
    ));

    // Configurable via PARLAY_WS_ADDR env var (default: 0.0.0.0:9100)
    let addr_str =
        std::env::var("PARLAY_WS_ADDR").unwrap_or_else(|_| "0.0.0.0:9100".to_string());
    let addr = addr_str
        .parse::<SocketAddr>()
        .unwrap_or_else(|_| "0.0.0.0:9100".parse().unwrap());

    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind WebSocket server");

    info!("WebSocket server listening on ws://{}", addr);
    info!("Clients can request index snapshots, histories, books, and candles");

    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from {}", peer_addr);
        let compositor = compositor.clone();
        tokio::spawn(handle_client(stream, peer_addr, compositor));
    }
}

/// Handle one client: welcome frame, then request/response until close.
async fn handle_client(stream: TcpStream, peer_addr: SocketAddr, compositor: Arc<IndexCompositor>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(error) => {
            error!("WebSocket handshake failed for {}: {}", peer_addr, error);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let welcome = serde_json::json!({
        "type": "welcome",
        "message": "Connected to parlay-index feed",
    });
    if let Ok(frame) = serde_json::to_string(&welcome) {
        let _ = ws_sender.send(Message::Text(frame.into())).await;
    }

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientRequest>(&text) {
                    Ok(request) => respond(&compositor, request).await,
                    Err(error) => {
                        debug!("Bad request from {}: {}", peer_addr, error);
                        serde_json::json!({ "type": "error", "message": error.to_string() })
                    }
                };
                match serde_json::to_string(&reply) {
                    Ok(frame) => {
                        if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => warn!("Failed to serialize reply for {}: {}", peer_addr, error),
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) => {
                debug!("Received ping from {}", peer_addr);
            }
            Ok(_) => {}
            Err(error) => {
                error!("WebSocket error for {}: {}", peer_addr, error);
                break;
            }
        }
    }

    info!("WebSocket connection closed for {}", peer_addr);
}

async fn respond(compositor: &IndexCompositor, request: ClientRequest) -> serde_json::Value {
    match request {
        ClientRequest::List => {
            let indexes = compositor.resolve_all_basic().await;
            serde_json::json!({ "type": "list", "data": indexes })
        }
        ClientRequest::Index { id } => {
            let index = compositor.resolve_full(&id).await;
            serde_json::json!({ "type": "index", "data": index })
        }
        ClientRequest::History { id } => {
            let index = compositor.resolve_full(&id).await;
            let history = compositor.price_history(&index);
            serde_json::json!({ "type": "history", "id": id, "data": history })
        }
        ClientRequest::Book { id } => {
            let index = compositor.resolve_full(&id).await;
            let book = compositor.order_book(&index);
            serde_json::json!({ "type": "book", "id": id, "data": book })
        }
        ClientRequest::Candles { id, bucket_hours } => {
            let index = compositor.resolve_full(&id).await;
            let history = compositor.price_history(&index);
            let candles = parlay_index::generate_candles(&history, bucket_hours);
            serde_json::json!({ "type": "candles", "id": id, "data": candles })
        }
    }
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
