//! Scripted management host speaking the agent protocol over a real socket.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::dispatch::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Listening side the agent dials into.
pub struct FakeHost {
    listener: TcpListener,
    url: String,
}

impl FakeHost {
    /// Binds an ephemeral loopback port.
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake host");
        Self::from_listener(listener)
    }

    /// Binds a specific loopback address.
    pub async fn bind_to(address: &str) -> Self {
        let listener = TcpListener::bind(address)
            .await
            .expect("bind fake host to address");
        Self::from_listener(listener)
    }

    fn from_listener(listener: TcpListener) -> Self {
        let address = listener.local_addr().expect("fake host address");
        Self {
            listener,
            url: format!("ws://{address}"),
        }
    }

    /// `ws://` URL of the listener.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Accepts the agent's WebSocket connection.
    pub async fn accept(&self) -> HostSession {
        let (tcp, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .expect("agent did not connect in time")
            .expect("accept agent connection");
        let stream = accept_async(tcp).await.expect("websocket upgrade");
        HostSession { stream }
    }
}

/// Returns a loopback URL on which nothing is listening.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let address = listener.local_addr().expect("probe address");
    drop(listener);
    format!("ws://{address}")
}

/// One accepted connection, seen from the management host.
pub struct HostSession {
    stream: WebSocketStream<TcpStream>,
}

impl HostSession {
    /// Next text frame, or `None` once the agent closed the connection.
    pub async fn recv_text(&mut self) -> Option<String> {
        tokio::time::timeout(WAIT, async {
            while let Some(frame) = self.stream.next().await {
                match frame {
                    Ok(Frame::Text(text)) => return Some(text),
                    Ok(Frame::Close(_)) | Err(_) => return None,
                    Ok(_) => {}
                }
            }
            None
        })
        .await
        .expect("timed out waiting for a frame from the agent")
    }

    /// Next decoded message from the agent.
    pub async fn recv(&mut self) -> Message {
        let text = self.recv_text().await.expect("agent closed the connection");
        Message::parse(&text).expect("agent sent a valid message")
    }

    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Frame::Text(text.to_owned()))
            .await
            .expect("send frame to agent");
    }

    pub async fn send(&mut self, message: &Message) {
        let text = message.to_text().expect("encode message");
        self.send_text(&text).await;
    }

    /// Reads the greeting and echoes it back unchanged.
    pub async fn complete_handshake(&mut self) -> Message {
        let hello = self.recv_text().await.expect("agent greeting");
        self.send_text(&hello).await;
        Message::parse(&hello).expect("greeting decodes")
    }

    /// Sends a request and waits for the next response.
    pub async fn request(&mut self, opid: &str, opnm: &str, opct: Value) -> Message {
        self.send(&Message::new(opid, opnm, opct)).await;
        self.recv().await
    }

    /// Whether the agent closes the connection without sending anything else.
    pub async fn closes(&mut self) -> bool {
        self.recv_text().await.is_none()
    }
}
