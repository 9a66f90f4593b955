//! Real-time messaging adapter
//!
//! Negotiates a session over HTTP, then upgrades to the websocket url the
//! service hands back. Frames travel as JSON text messages.

use std::time::Duration;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::ORIGIN, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::errors::{BotError, TransportError};
use crate::application::services::Bot;
use crate::domain::entities::Message;
use crate::domain::traits::{Dialer, FrameSink, FrameStream, Transport};
use crate::infrastructure::config::RtmConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Session start response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HandshakeResponse {
    ok: bool,
    error: String,
    url: String,
    #[serde(rename = "self")]
    identity: HandshakeIdentity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HandshakeIdentity {
    id: String,
}

/// A negotiated session, ready for the streaming upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub url: String,
}

/// Session negotiation client
pub struct RtmAdapter {
    client: Client,
    config: RtmConfig,
}

impl RtmAdapter {
    pub fn new(config: RtmConfig) -> Result<Self, BotError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .tcp_keepalive(config.tcp_keepalive())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BotError::ConnectFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Websocket dialer using the configured origin and timeouts
    pub fn dialer(&self) -> WebSocketDialer {
        WebSocketDialer::new(self.config.origin.clone(), self.config.upgrade_timeout())
    }

    /// Ask the service for a session and its streaming url
    pub async fn start_session(&self, token: &str) -> Result<Session, BotError> {
        let token_prefix: String = token.chars().take(8).collect();
        tracing::info!("Starting session (token: {}...)", token_prefix);

        let response = self
            .client
            .get(&self.config.api_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BotError::ConnectFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BotError::UnexpectedStatus { code: status.as_u16() });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BotError::MalformedResponse(format!("Failed to read body: {}", e)))?;

        parse_session(&body)
    }

    /// Negotiate a session and open its streaming connection.
    /// Nothing is dialed unless the service accepted the session.
    pub async fn connect(&self, token: &str, dialer: &dyn Dialer) -> Result<Bot, BotError> {
        let session = self.start_session(token).await?;
        tracing::debug!("Session {} granted, upgrading", session.id);

        let transport = dialer
            .dial(&session.url)
            .await
            .map_err(|e| BotError::UpgradeFailed(e.to_string()))?;

        tracing::info!("Connected as {}", session.id);
        Ok(Bot::new(session.id, transport))
    }
}

fn parse_session(body: &[u8]) -> Result<Session, BotError> {
    let response: HandshakeResponse = serde_json::from_slice(body)
        .map_err(|e| BotError::MalformedResponse(format!("Failed to unmarshal JSON: {}", e)))?;

    if !response.ok {
        return Err(BotError::SessionRejected { reason: response.error });
    }
    if response.url.is_empty() {
        return Err(BotError::MalformedResponse("missing streaming url".to_string()));
    }
    if response.identity.id.is_empty() {
        return Err(BotError::MalformedResponse("missing session identity".to_string()));
    }

    Ok(Session {
        id: response.identity.id,
        url: response.url,
    })
}

/// Opens websocket connections with a bounded handshake
pub struct WebSocketDialer {
    origin: String,
    timeout: Duration,
}

impl WebSocketDialer {
    pub fn new(origin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            origin: origin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Dialer for WebSocketDialer {
    async fn dial(&self, url: &str) -> Result<Transport, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let origin = HeaderValue::from_str(&self.origin)
            .map_err(|e| TransportError::Io(format!("invalid origin: {}", e)))?;
        request.headers_mut().insert(ORIGIN, origin);

        let (ws, _) = tokio::time::timeout(self.timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| TransportError::Io(format!("handshake timed out after {:?}", self.timeout)))?
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let (sink, stream) = ws.split();
        Ok(Transport::new(WsSink { sink }, WsFrames { stream }))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, WsMessage>,
}

struct WsFrames {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: &Message) -> Result<(), TransportError> {
        let json = serde_json::to_string(frame).map_err(|e| TransportError::Codec(e.to_string()))?;
        self.sink
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }
}

#[async_trait]
impl FrameStream for WsFrames {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return serde_json::from_str(text.as_str())
                        .map_err(|e| TransportError::Codec(e.to_string()));
                }
                Some(Ok(WsMessage::Close(_))) | None => return Err(TransportError::Closed),
                // control frames are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) => {
                    return Err(TransportError::Closed);
                }
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}
