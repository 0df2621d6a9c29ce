use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use castty_protocol::{ClientMessage, ServerMessage};
use tracing::{info, warn};

use crate::hub::HubHandle;

const PAGE_HTML: &str = include_str!("viewer.html");

/// Binds the page server and the push (WebSocket) server. A bind failure on
/// either socket is locally recovered: a warning is logged and recording
/// proceeds without fan-out, per the monitor's non-essential role.
pub async fn serve(hub: HubHandle, host: &str, page_port: u16, push_port: u16) {
    if let Err(e) = serve_page(host, page_port).await {
        warn!(event = "monitor.page_bind_failed", error = %e);
    }
    if let Err(e) = serve_push(hub, host, push_port).await {
        warn!(event = "monitor.push_bind_failed", error = %e);
    }
}

async fn serve_page(host: &str, port: u16) -> Result<(), std::io::Error> {
    let app = Router::new().route("/", get(page_handler));
    let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid monitor host/port")
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(event = "monitor.page_listening", addr = %addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            warn!(event = "monitor.page_server_exited", error = %e);
        }
    });
    Ok(())
}

async fn serve_push(hub: HubHandle, host: &str, port: u16) -> Result<(), std::io::Error> {
    let app = Router::new().route("/ws", get(ws_handler)).with_state(hub);
    let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid monitor host/port")
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(event = "monitor.push_listening", addr = %addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            warn!(event = "monitor.push_server_exited", error = %e);
        }
    });
    Ok(())
}

async fn page_handler() -> Html<&'static str> {
    Html(PAGE_HTML)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<HubHandle>) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_viewer(socket, hub))
}

async fn handle_viewer(mut socket: WebSocket, hub: HubHandle) {
    let Some(attach) = hub.attach().await else {
        warn!(event = "monitor.attach_failed");
        return;
    };
    let mut receiver = attach.receiver;

    if !send_json(&mut socket, &attach.sync).await {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        // Viewers have no meaningful commands; decode-or-ignore.
                        let _: Result<ClientMessage, _> = serde_json::from_str(&text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(event = "monitor.viewer_disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(event = "monitor.viewer_read_failed", error = %e);
                        break;
                    }
                    _ => {}
                }
            }
            live = receiver.recv() => {
                match live {
                    Ok(msg) => {
                        if !send_json(&mut socket, &msg).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(event = "monitor.viewer_evicted_lagging", skipped = skipped);
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> bool {
    let text = match serde_json::to_string(msg) {
        Ok(t) => t,
        Err(e) => {
            warn!(event = "monitor.serialize_failed", error = %e);
            return false;
        }
    };
    socket.send(Message::Text(text.into())).await.is_ok()
}
