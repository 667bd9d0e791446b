//! Real-time event channel: a WebSocket task that forwards chat events to the UI loop.

use std::{sync::mpsc::Sender, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{runtime::Runtime, sync::watch, time::sleep};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue, StatusCode},
        Error as WsError, Message as WsMessage,
    },
};

use crate::{
    domain::events::{AppEvent, ConnectivityStatus},
    infra::config::RealtimeConfig,
};

use super::wire::{parse_channel_frame, FrameOutcome};

const CHANNEL_STARTED: &str = "REALTIME_CHANNEL_STARTED";
const CHANNEL_STOPPED: &str = "REALTIME_CHANNEL_STOPPED";
const CHANNEL_CONNECTED: &str = "REALTIME_CHANNEL_CONNECTED";
const CHANNEL_CONNECT_FAILED: &str = "REALTIME_CHANNEL_CONNECT_FAILED";
const CHANNEL_REJECTED: &str = "REALTIME_CHANNEL_REJECTED";
const CHANNEL_DROPPED: &str = "REALTIME_CHANNEL_DROPPED";
const CHANNEL_FRAME_MALFORMED: &str = "REALTIME_CHANNEL_FRAME_MALFORMED";
const CHANNEL_EVENT_SEND_FAILED: &str = "REALTIME_CHANNEL_EVENT_SEND_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    pub url: String,
    pub token: String,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl ChannelSettings {
    pub fn new(base_url: &str, config: &RealtimeConfig, token: String) -> Self {
        Self {
            url: websocket_url(base_url, &config.path),
            token,
            reconnect_initial: Duration::from_millis(config.reconnect_initial_ms),
            reconnect_max: Duration::from_millis(config.reconnect_max_ms),
        }
    }
}

/// Maps the REST base URL onto the matching WebSocket scheme.
pub fn websocket_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };

    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Capped exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

#[derive(Debug)]
pub struct RealtimeChannel {
    stop_tx: Option<watch::Sender<bool>>,
}

impl RealtimeChannel {
    pub fn start(runtime: &Runtime, settings: ChannelSettings, event_tx: Sender<AppEvent>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        tracing::info!(
            code = CHANNEL_STARTED,
            url = %settings.url,
            "real-time channel started"
        );
        runtime.spawn(run_channel(settings, event_tx, stop_rx));

        Self {
            stop_tx: Some(stop_tx),
        }
    }

    #[cfg(test)]
    pub fn inert() -> Self {
        Self { stop_tx: None }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

#[derive(Debug)]
enum SessionEnd {
    ReceiverGone,
    Rejected,
    Closed { connected: bool },
    Failed { error: String, connected: bool },
}

async fn run_channel(
    settings: ChannelSettings,
    event_tx: Sender<AppEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::new(settings.reconnect_initial, settings.reconnect_max);

    loop {
        if !notify(&event_tx, ConnectivityStatus::Connecting) {
            break;
        }

        let end = tokio::select! {
            _ = stop_requested(&mut stop_rx) => break,
            end = run_session(&settings, &event_tx) => end,
        };

        match end {
            SessionEnd::ReceiverGone => break,
            SessionEnd::Rejected => {
                tracing::warn!(
                    code = CHANNEL_REJECTED,
                    "real-time channel rejected the session token"
                );
                notify(&event_tx, ConnectivityStatus::Error);
                break;
            }
            SessionEnd::Closed { connected } => {
                if connected {
                    backoff.reset();
                }
                tracing::info!(code = CHANNEL_DROPPED, "real-time channel closed");
                if !notify(&event_tx, ConnectivityStatus::Disconnected) {
                    break;
                }
            }
            SessionEnd::Failed { error, connected } => {
                if connected {
                    backoff.reset();
                }
                tracing::warn!(
                    code = CHANNEL_CONNECT_FAILED,
                    error = %error,
                    "real-time channel failed; reconnecting"
                );
                if !notify(&event_tx, ConnectivityStatus::Error) {
                    break;
                }
            }
        }

        let delay = backoff.next_delay();
        tokio::select! {
            _ = stop_requested(&mut stop_rx) => break,
            _ = sleep(delay) => {}
        }
    }

    tracing::info!(code = CHANNEL_STOPPED, "real-time channel stopped");
}

async fn run_session(settings: &ChannelSettings, event_tx: &Sender<AppEvent>) -> SessionEnd {
    let mut request = match settings.url.as_str().into_client_request() {
        Ok(request) => request,
        Err(error) => {
            return SessionEnd::Failed {
                error: error.to_string(),
                connected: false,
            }
        }
    };
    match HeaderValue::from_str(&format!("Bearer {}", settings.token)) {
        Ok(value) => {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(_) => return SessionEnd::Rejected,
    }

    let stream = match connect_async(request).await {
        Ok((stream, _)) => stream,
        Err(WsError::Http(response))
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            return SessionEnd::Rejected
        }
        Err(error) => {
            return SessionEnd::Failed {
                error: error.to_string(),
                connected: false,
            }
        }
    };

    tracing::info!(code = CHANNEL_CONNECTED, "real-time channel connected");
    if !notify(event_tx, ConnectivityStatus::Connected) {
        return SessionEnd::ReceiverGone;
    }

    let (mut sink, mut source) = stream.split();
    while let Some(frame) = source.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                if !forward_frame(text.as_str(), event_tx) {
                    return SessionEnd::ReceiverGone;
                }
            }
            Ok(WsMessage::Ping(data)) => {
                if let Err(error) = sink.send(WsMessage::Pong(data)).await {
                    return SessionEnd::Failed {
                        error: error.to_string(),
                        connected: true,
                    };
                }
            }
            Ok(WsMessage::Close(_)) => return SessionEnd::Closed { connected: true },
            Ok(_) => {}
            Err(error) => {
                return SessionEnd::Failed {
                    error: error.to_string(),
                    connected: true,
                }
            }
        }
    }

    SessionEnd::Closed { connected: true }
}

/// Returns false once the UI side has gone away.
fn forward_frame(text: &str, event_tx: &Sender<AppEvent>) -> bool {
    match parse_channel_frame(text) {
        FrameOutcome::Event(event) => {
            tracing::debug!(
                chat_id = %event.chat_id,
                message_id = %event.message_id,
                kind = event.update.kind(),
                "real-time event received"
            );
            if let Err(error) = event_tx.send(AppEvent::Channel(event)) {
                tracing::warn!(
                    code = CHANNEL_EVENT_SEND_FAILED,
                    error = %error,
                    "real-time channel failed to forward event"
                );
                return false;
            }
            true
        }
        FrameOutcome::Other { event } => {
            tracing::debug!(event = %event, "ignoring non-chat real-time frame");
            true
        }
        FrameOutcome::Malformed(error) => {
            tracing::warn!(
                code = CHANNEL_FRAME_MALFORMED,
                error = %error,
                "real-time frame could not be decoded"
            );
            true
        }
    }
}

fn notify(event_tx: &Sender<AppEvent>, status: ConnectivityStatus) -> bool {
    event_tx.send(AppEvent::ConnectivityChanged(status)).is_ok()
}

async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}
