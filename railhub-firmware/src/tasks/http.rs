// HTTP Server Task - Serviert HTML, Status-API und WebSocket
use alloc::string::String;
use core::future::pending;
use defmt::{info, warn};
use embassy_futures::select::{Either, select};
use embassy_time::Duration;
use picoserve::{
    io::embedded_io_async,
    response::IntoResponse,
    response::ws,
    routing::{get, post},
};
use railhub_core::{CommandError, StatusSink};
use serde::Serialize;

use crate::config::*;
use crate::web::{
    INDEX_HTML,
    broadcast::StatusBroadcaster,
    protocol::{ClientRequest, MessageType, WsServerMessage},
};
use crate::{AppState, FirmwareSnapshot, StatusSubscriber, now_ms};

/// Response-Enum für WebSocket-Endpoint
/// Ermöglicht Rückgabe von entweder WebSocket-Upgrade oder HTTP-Fehler
enum WebSocketResponse {
    Upgrade(
        ws::UpgradedWebSocket<ws::UnspecifiedProtocol, ws::CallbackNotUsingState<WebSocketHandler>>,
    ),
    ServiceUnavailable,
}

impl IntoResponse for WebSocketResponse {
    async fn write_to<
        R: embedded_io_async::Read,
        W: picoserve::response::ResponseWriter<Error = R::Error>,
    >(
        self,
        connection: picoserve::response::Connection<'_, R>,
        response_writer: W,
    ) -> Result<picoserve::ResponseSent, W::Error> {
        match self {
            WebSocketResponse::Upgrade(ws) => ws.write_to(connection, response_writer).await,
            WebSocketResponse::ServiceUnavailable => {
                picoserve::response::Response::new(
                    picoserve::response::StatusCode::new(503),
                    "Service Unavailable: Too many WebSocket connections (max 10)",
                )
                .with_header("Retry-After", "5")
                .write_to(connection, response_writer)
                .await
            }
        }
    }
}

/// HTTP Server Task - läuft parallel zu anderen Tasks
///
/// - GET `/`: Web-UI (index.html)
/// - GET `/api/status`: aktueller Status-Snapshot als JSON
/// - GET `/ws`: WebSocket für Kommandos und Live-Status
/// - POST `/api/control`, `/api/name`, `/api/interval`, `/api/chasing/create`,
///   `/api/chasing/delete`, `/api/chasing/name`, `/api/reset`: dieselben
///   Kommandos als JSON-Body für Skripte
///
/// **Task Pool:** Wird `HTTP_TASK_COUNT`x gespawnt, damit HTML-Auslieferung
/// und offene WebSocket-Verbindungen sich nicht gegenseitig blockieren.
///
/// # Parameter
/// - `task_id`: Eindeutige ID für diese Server-Instanz
/// - `state`: Gemeinsamer Zustand (Controller, StatusChannel, Stack)
#[embassy_executor::task(pool_size = HTTP_TASK_COUNT)]
pub async fn http_server_task(task_id: usize, state: &'static AppState) {
    info!("HTTP: Server task {} starting on port 80...", task_id);

    let app = picoserve::Router::new()
        .route("/", get(serve_html))
        .route(
            "/api/status",
            get(move || async move { picoserve::response::Json(current_snapshot(state)) }),
        )
        .route(
            "/ws",
            get(move |upgrade: picoserve::response::WebSocketUpgrade| async move {
                info!("HTTP: WebSocket upgrade requested");

                // Bei mehr als 10 WebSocket-Clients schlägt die Subscriber-Allokation
                // fehl. Statt Panic bekommt der Client HTTP 503.
                match state.status.subscriber() {
                    Ok(subscriber) => {
                        let handler = WebSocketHandler { state, subscriber };
                        WebSocketResponse::Upgrade(upgrade.on_upgrade(handler))
                    }
                    Err(_) => {
                        warn!("HTTP: No subscriber slots available (10/10 in use), sending HTTP 503");
                        WebSocketResponse::ServiceUnavailable
                    }
                }
            }),
        )
        .route("/api/control", post(move |body: String| rest_command(state, MessageType::Control, body)))
        .route("/api/name", post(move |body: String| rest_command(state, MessageType::SetName, body)))
        .route("/api/interval", post(move |body: String| rest_command(state, MessageType::SetInterval, body)))
        .route(
            "/api/chasing/create",
            post(move |body: String| rest_command(state, MessageType::CreateGroup, body)),
        )
        .route(
            "/api/chasing/delete",
            post(move |body: String| rest_command(state, MessageType::DeleteGroup, body)),
        )
        .route(
            "/api/chasing/name",
            post(move |body: String| rest_command(state, MessageType::RenameGroup, body)),
        )
        .route("/api/reset", post(move |body: String| rest_command(state, MessageType::ResetStorage, body)));

    let config = picoserve::Config::new(picoserve::Timeouts {
        start_read_request: Some(Duration::from_secs(5)),
        read_request: Some(Duration::from_secs(1)),
        write: Some(Duration::from_secs(1)),
        persistent_start_read_request: Some(Duration::from_secs(5)),
    })
    .keep_connection_alive();

    let mut http_buffer = [0u8; HTTP_BUFFER_SIZE];
    let mut rx_buffer = [0u8; TCP_RX_BUFFER_SIZE];
    let mut tx_buffer = [0u8; TCP_TX_BUFFER_SIZE];

    let server = picoserve::Server::new(&app, &config, &mut http_buffer);

    // task_id ermöglicht mehrere concurrent Server-Instanzen auf Port 80
    let _ = server
        .listen_and_serve(task_id, state.stack, 80, &mut rx_buffer, &mut tx_buffer)
        .await;

    info!("HTTP: Server task {} ended", task_id);
}

/// Serviert die HTML-Hauptseite
async fn serve_html() -> impl IntoResponse {
    picoserve::response::Response::new(picoserve::response::StatusCode::OK, INDEX_HTML)
        .with_header("Content-Type", "text/html; charset=utf-8")
}

/// Baut einen Snapshot des aktuellen Zustands
fn current_snapshot(state: &AppState) -> FirmwareSnapshot {
    let runtime = StatusBroadcaster::new(state).runtime_info();
    state.controller.lock(|c| c.borrow().snapshot(&runtime))
}

/// WebSocket-Handler State
/// Ein Subscriber pro Verbindung, Kommandos laufen direkt über den Controller
struct WebSocketHandler {
    state: &'static AppState,
    subscriber: StatusSubscriber,
}

impl ws::WebSocketCallback for WebSocketHandler {
    async fn run<R: embedded_io_async::Read, W: embedded_io_async::Write<Error = R::Error>>(
        mut self,
        mut rx: ws::SocketRx<R>,
        mut tx: ws::SocketTx<W>,
    ) -> Result<(), W::Error> {
        info!("HTTP: WebSocket connection established");

        let mut buffer = [0u8; WEBSOCKET_BUFFER_SIZE];

        // Neuer Client bekommt sofort den vollen Zustand
        send_json::<_, _, JSON_STATUS_BUFFER_SIZE>(&mut tx, &current_snapshot(self.state)).await?;

        let close_reason = loop {
            // Gleichzeitig auf Browser-Nachrichten und Status-Broadcasts warten
            match select(
                rx.next_message(&mut buffer, pending()),
                self.subscriber.next_message_pure(),
            )
            .await
            {
                Either::First(ws_result) => {
                    let ws_result = ws_result?.ignore_never_b();

                    match ws_result {
                        Ok(ws::Message::Text(data)) => {
                            info!("HTTP: Received text message: {} bytes", data.len());
                            let reply = self.handle_text(data);
                            send_json::<_, _, JSON_REPLY_BUFFER_SIZE>(&mut tx, &reply).await?;
                        }
                        Ok(ws::Message::Binary(data)) => {
                            info!("HTTP: Received binary message: {} bytes (ignored)", data.len());
                        }
                        Ok(ws::Message::Ping(data)) => {
                            tx.send_pong(data).await?;
                        }
                        Ok(ws::Message::Pong(_)) => {}
                        Ok(ws::Message::Close(_reason)) => {
                            info!("HTTP: WebSocket close received");
                            break None;
                        }
                        Err(error) => {
                            warn!("HTTP: WebSocket error");
                            break Some((error.code(), "WebSocket Error"));
                        }
                    }
                }
                Either::Second(snapshot) => {
                    send_json::<_, _, JSON_STATUS_BUFFER_SIZE>(&mut tx, &snapshot).await?;
                }
            }
        };

        info!("HTTP: WebSocket connection closed");
        tx.close(close_reason).await
    }
}

impl WebSocketHandler {
    /// Führt ein WebSocket-Kommando aus
    ///
    /// Der neue Status geht über den StatusChannel an alle Clients,
    /// der Absender bekommt zusätzlich Ack oder Fehlermeldung.
    fn handle_text(&self, data: &str) -> WsServerMessage {
        match run_command(self.state, data, None) {
            Ok(()) => WsServerMessage::Ack,
            Err(rejection) => WsServerMessage::Error {
                message: rejection.message(),
            },
        }
    }
}

/// Grund für eine abgelehnte Anfrage
#[derive(Debug, Clone, Copy)]
enum Rejection {
    /// JSON kaputt oder Pflichtfeld fehlt
    Malformed(&'static str),
    /// Vom Controller abgelehnt
    Command(CommandError),
}

impl Rejection {
    fn message(self) -> &'static str {
        match self {
            Rejection::Malformed(message) => message,
            Rejection::Command(e) => e.message(),
        }
    }

    fn status_code(self) -> u16 {
        match self {
            Rejection::Command(CommandError::UnknownChannel | CommandError::NotFound) => 404,
            _ => 400,
        }
    }
}

/// Dekodiert ein Kommando und führt es über den Controller aus
///
/// `kind` kommt bei REST aus dem Pfad, bei WebSocket aus dem `type`-Feld.
fn run_command(state: &AppState, data: &str, kind: Option<MessageType>) -> Result<(), Rejection> {
    // Leerer Body ist für parameterlose REST-Kommandos erlaubt
    let data = if data.trim().is_empty() { "{}" } else { data };

    let message = match serde_json_core::from_str::<ClientRequest>(data) {
        Ok((message, _)) => message,
        Err(_) => {
            warn!("HTTP: JSON parse error");
            return Err(Rejection::Malformed("JSON parse error"));
        }
    };

    let command = message.to_command(kind).map_err(|reason| {
        warn!("HTTP: Rejected {}: {}", kind.or(message.msg_type), reason);
        Rejection::Malformed(reason)
    })?;

    let now = now_ms();
    state
        .controller
        .lock(|c| c.borrow_mut().execute(command, now, &mut StatusBroadcaster::new(state)))
        .map_err(|e| {
            warn!("HTTP: Command {} rejected: {}", kind.or(message.msg_type), e);
            Rejection::Command(e)
        })
}

/// REST-Variante eines Kommandos: JSON-Body rein, Ack/Error als JSON raus
async fn rest_command(
    state: &'static AppState,
    kind: MessageType,
    body: String,
) -> impl IntoResponse {
    info!("HTTP: POST {} ({} bytes)", kind, body.len());

    let (status, reply) = match run_command(state, &body, Some(kind)) {
        Ok(()) => (200, WsServerMessage::Ack),
        Err(rejection) => (
            rejection.status_code(),
            WsServerMessage::Error {
                message: rejection.message(),
            },
        ),
    };

    let json = serde_json_core::to_string::<_, JSON_REPLY_BUFFER_SIZE>(&reply)
        .map(|s| String::from(s.as_str()))
        .unwrap_or_default();

    picoserve::response::Response::new(picoserve::response::StatusCode::new(status), json)
        .with_header("Content-Type", "application/json")
}

/// Serialisiert `value` und sendet es als Text-Frame
///
/// Passt der Wert nicht in den Buffer, wird nichts gesendet.
async fn send_json<W: embedded_io_async::Write, T: Serialize, const SIZE: usize>(
    tx: &mut ws::SocketTx<W>,
    value: &T,
) -> Result<(), W::Error> {
    let mut json_buffer = [0u8; SIZE];
    match serde_json_core::to_slice(value, &mut json_buffer) {
        Ok(n) => {
            if let Ok(json_str) = core::str::from_utf8(&json_buffer[..n]) {
                tx.send_text(json_str).await?;
            }
        }
        Err(_) => warn!("HTTP: JSON buffer too small ({} bytes)", SIZE),
    }
    Ok(())
}
