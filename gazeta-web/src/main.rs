//! Servidor web Axum com WebSocket para acompanhar a extração em tempo real

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use gazeta_core::{
    bundle,
    pipeline::{GazetaPipeline, PipelineEvent},
    samples::demo_texts,
    ExtractConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: GazetaPipeline,
}

#[derive(Deserialize)]
struct ExtractRequest {
    text: String,
    #[serde(default)]
    config: Option<ExtractConfig>,
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    text: String,
    #[serde(default)]
    config: Option<ExtractConfig>,
}

#[derive(Serialize)]
struct ExtractResponse {
    bundle: bundle::Bundle,
    processing_ms: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let pipeline = GazetaPipeline::new();
    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/extract", post(extract_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("🚀 Servidor de extração iniciado em http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}

/// Extração via HTTP POST (sem streaming); devolve o bundle completo
async fn extract_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Texto vazio"})),
        )
            .into_response();
    }

    let pipeline = match req.config {
        Some(config) => GazetaPipeline::with_config(config),
        None => state.pipeline.clone(),
    };
    let result = pipeline.extract(&req.text);
    let processing_ms = result.processing_ms;

    Json(ExtractResponse {
        bundle: bundle::assemble(&result),
        processing_ms,
    })
    .into_response()
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(title, text)| {
            serde_json::json!({
                "title": title,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Lógica do WebSocket: recebe texto, executa o pipeline e envia os eventos
/// de progresso em tempo real
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // Tenta parsear como JSON {text, config}; senão usa como texto puro
                let (text_str, config) =
                    if let Ok(req) = serde_json::from_str::<WsRequest>(&text) {
                        (req.text.trim().to_string(), req.config)
                    } else {
                        (text.trim().to_string(), None)
                    };

                if text_str.is_empty() {
                    continue;
                }

                info!("Extraindo via WebSocket: {} chars", text_str.len());

                // Executa o pipeline em spawn_blocking para não bloquear o runtime
                let (tx_std, rx_std) = std::sync::mpsc::channel::<PipelineEvent>();

                let pipeline = match config {
                    Some(cfg) => GazetaPipeline::with_config(cfg),
                    None => state.pipeline.clone(),
                };
                let text_for_thread = text_str.clone();

                let handle = tokio::task::spawn_blocking(move || {
                    pipeline.extract_streaming(&text_for_thread, tx_std);
                });
                handle.await.ok();

                // Coleta todos os eventos numa Vec (o rx_std não é Send)
                let events: Vec<PipelineEvent> = rx_std.try_iter().collect();

                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return; // cliente desconectou
                        }
                        // Pequena pausa para animação visual (passo a passo)
                        tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
