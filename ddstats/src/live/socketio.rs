//! Socket.IO (Engine.IO v3) client over a websocket
//!
//! Only the subset the server needs: the open handshake, client pings, and
//! `42[...]` event packets. A reader task watches for the connection going
//! away and a writer task owns the sink; both reset the shared state to
//! `Disconnected` when they stop.

use async_trait::async_trait;
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::connect_async;
use url::Url;

use super::{events, LiveChannel, PresenceState};
use crate::domain::{LiveError, PlayerId};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);
/// How long a disconnect waits for the close frame to go out
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Packet framing
// ============================================================================

/// Parameters from the Engine.IO open packet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    /// Socket.IO connect for the default namespace (`40`)
    NamespaceConnect,
    /// Socket.IO disconnect (`41`)
    NamespaceDisconnect,
    /// Socket.IO event (`42`), raw JSON array
    Event(String),
    Other,
}

/// Classify one text frame
#[must_use]
pub fn parse_packet(text: &str) -> Packet {
    match text.as_bytes().first() {
        Some(b'0') => serde_json::from_str(&text[1..]).map_or(Packet::Other, Packet::Open),
        Some(b'1') => Packet::Close,
        Some(b'2') => Packet::Ping,
        Some(b'3') => Packet::Pong,
        Some(b'4') => match text.as_bytes().get(1) {
            Some(b'0') => Packet::NamespaceConnect,
            Some(b'1') => Packet::NamespaceDisconnect,
            Some(b'2') => Packet::Event(text[2..].to_string()),
            _ => Packet::Other,
        },
        _ => Packet::Other,
    }
}

/// Encode an event as `42["name",args...]`
///
/// # Errors
/// Fails only if an argument cannot be serialized.
pub fn event_packet(event: &str, args: Vec<Value>) -> Result<String, LiveError> {
    let mut body = Vec::with_capacity(args.len() + 1);
    body.push(Value::String(event.to_string()));
    body.extend(args);
    Ok(format!("42{}", serde_json::to_string(&body)?))
}

/// Websocket endpoint for an http(s) host
///
/// # Errors
/// Fails if `host` is not an absolute URL with a host part.
pub fn socket_url(host: &str) -> Result<Url, LiveError> {
    let parsed = Url::parse(host)?;
    let scheme = if parsed.scheme() == "https" { "wss" } else { "ws" };
    let name = parsed
        .host_str()
        .ok_or_else(|| LiveError::Handshake(format!("no host in {host}")))?;
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();

    let mut url = Url::parse(&format!("{scheme}://{name}{port}/socket.io/"))?;
    url.query_pairs_mut().append_pair("EIO", "3").append_pair("transport", "websocket");
    Ok(url)
}

// ============================================================================
// Shared state
// ============================================================================

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn get(&self) -> PresenceState {
        match self.0.load(Ordering::Acquire) {
            1 => PresenceState::Connecting,
            2 => PresenceState::Connected,
            3 => PresenceState::LoggedIn,
            _ => PresenceState::Disconnected,
        }
    }

    fn set(&self, state: PresenceState) {
        self.0.store(encode(state), Ordering::Release);
    }

    /// Move `from` -> `to` unless something else changed the state meanwhile
    fn advance(&self, from: PresenceState, to: PresenceState) -> bool {
        self.0
            .compare_exchange(encode(from), encode(to), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

fn encode(state: PresenceState) -> u8 {
    match state {
        PresenceState::Disconnected => 0,
        PresenceState::Connecting => 1,
        PresenceState::Connected => 2,
        PresenceState::LoggedIn => 3,
    }
}

// ============================================================================
// Channel
// ============================================================================

pub struct SocketIoChannel {
    url: Url,
    state: SharedState,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl SocketIoChannel {
    /// # Errors
    /// Fails if `host` cannot be turned into a websocket URL.
    pub fn new(host: &str) -> Result<Self, LiveError> {
        Ok(Self {
            url: socket_url(host)?,
            state: SharedState::default(),
            outbound: None,
            writer: None,
            reader: None,
        })
    }

    async fn open(&mut self, player: PlayerId) -> Result<(), LiveError> {
        let (ws, _) = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| LiveError::Handshake("timed out connecting".to_string()))??;
        let (mut sink, mut stream) = ws.split();

        let open = tokio::time::timeout(HANDSHAKE_TIMEOUT, read_open(&mut stream))
            .await
            .map_err(|_| LiveError::Handshake("no open packet".to_string()))??;
        debug!("Live channel open, sid {} ping {}ms", open.sid, open.ping_interval);
        self.state.set(PresenceState::Connected);

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let period = Duration::from_millis(open.ping_interval).max(MIN_PING_INTERVAL);

        let state = self.state.clone();
        let writer = tokio::spawn(async move {
            let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                let message = tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                    _ = ping.tick() => Message::Text("2".to_string()),
                };
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
            state.set(PresenceState::Disconnected);
        });

        let state = self.state.clone();
        let pong_tx = tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => match parse_packet(&text) {
                        Packet::Ping => {
                            let _ = pong_tx.send(Message::Text("3".to_string()));
                        }
                        Packet::Close | Packet::NamespaceDisconnect => break,
                        _ => {}
                    },
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        debug!("Live channel error: {e}");
                        break;
                    }
                    Ok(_) => {}
                }
            }
            info!("Live channel disconnected");
            state.set(PresenceState::Disconnected);
        });

        self.outbound = Some(tx);
        self.writer = Some(writer);
        self.reader = Some(reader);

        self.emit(events::LOGIN, vec![json!(player.0)]).await?;
        if !self.state.advance(PresenceState::Connected, PresenceState::LoggedIn) {
            return Err(LiveError::Handshake("connection dropped during login".to_string()));
        }
        info!("Live channel logged in as player {}", player.0);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Message::Close(None));
        }
        for task in [self.writer.take(), self.reader.take()].into_iter().flatten() {
            task.abort();
        }
        self.state.set(PresenceState::Disconnected);
    }
}

impl Drop for SocketIoChannel {
    fn drop(&mut self) {
        for task in [&self.writer, &self.reader].into_iter().flatten() {
            task.abort();
        }
    }
}

#[async_trait]
impl LiveChannel for SocketIoChannel {
    fn state(&self) -> PresenceState {
        self.state.get()
    }

    async fn connect(&mut self, player: PlayerId) -> Result<(), LiveError> {
        self.teardown();
        self.state.set(PresenceState::Connecting);
        let result = self.open(player).await;
        if result.is_err() {
            self.teardown();
        }
        result
    }

    async fn disconnect(&mut self) -> Result<(), LiveError> {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Message::Close(None));
            // the writer exits right after sending the close frame
            if let Some(writer) = self.writer.as_mut() {
                if tokio::time::timeout(CLOSE_TIMEOUT, writer).await.is_err() {
                    debug!("Close frame not flushed within {CLOSE_TIMEOUT:?}");
                }
            }
        }
        self.teardown();
        Ok(())
    }

    async fn emit(&mut self, event: &str, args: Vec<Value>) -> Result<(), LiveError> {
        if !matches!(self.state.get(), PresenceState::Connected | PresenceState::LoggedIn) {
            return Err(LiveError::NotConnected);
        }
        let packet = event_packet(event, args)?;
        self.outbound
            .as_ref()
            .ok_or(LiveError::NotConnected)?
            .send(Message::Text(packet))
            .map_err(|_| LiveError::NotConnected)
    }
}

async fn read_open<S>(stream: &mut S) -> Result<OpenInfo, LiveError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        if let Message::Text(text) = msg? {
            match parse_packet(&text) {
                Packet::Open(info) => return Ok(info),
                other => debug!("Ignoring {other:?} before open"),
            }
        }
    }
    Err(LiveError::Handshake("closed before open packet".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open() {
        let packet = parse_packet(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#);
        let Packet::Open(info) = packet else { panic!("expected an open packet") };
        assert_eq!(info.sid, "abc");
        assert_eq!(info.ping_interval, 25_000);
    }

    #[test]
    fn test_parse_control_packets() {
        assert_eq!(parse_packet("2"), Packet::Ping);
        assert_eq!(parse_packet("3"), Packet::Pong);
        assert_eq!(parse_packet("40"), Packet::NamespaceConnect);
        assert_eq!(parse_packet("41"), Packet::NamespaceDisconnect);
        assert_eq!(parse_packet(r#"42["hi",1]"#), Packet::Event(r#"["hi",1]"#.to_string()));
        assert_eq!(parse_packet(""), Packet::Other);
        assert_eq!(parse_packet("0not json"), Packet::Other);
    }

    #[test]
    fn test_event_packet() {
        let packet = event_packet("status_update", vec![json!(12), json!(4)]).unwrap();
        assert_eq!(packet, r#"42["status_update",12,4]"#);
    }

    #[test]
    fn test_socket_url() {
        assert_eq!(
            socket_url("https://ddstats.com").unwrap().as_str(),
            "wss://ddstats.com/socket.io/?EIO=3&transport=websocket"
        );
        assert_eq!(
            socket_url("http://localhost:5666").unwrap().as_str(),
            "ws://localhost:5666/socket.io/?EIO=3&transport=websocket"
        );
        assert!(socket_url("nonsense").is_err());
    }

    #[tokio::test]
    async fn test_emit_requires_connection() {
        let mut channel = SocketIoChannel::new("http://localhost:1").unwrap();
        assert_eq!(channel.state(), PresenceState::Disconnected);
        assert!(matches!(channel.emit("submit", vec![]).await, Err(LiveError::NotConnected)));
    }
}
