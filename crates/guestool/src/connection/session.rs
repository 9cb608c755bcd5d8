//! Handshake and read loop for one established connection.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::{self, Message as Frame};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::errors::ConnectionError;
use super::{CONNECTION_TARGET, ConnectionState};
use crate::dispatch::{Message, MessageRouter, Verb};

pub(super) type HostStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Responses waiting for the writer task before senders start to wait.
const OUTGOING_CAPACITY: usize = 64;

/// Sends the greeting and waits for the peer to echo it.
///
/// The echo is compared as a decoded message, so formatting differences in
/// the peer's JSON are accepted.
pub(super) async fn handshake(
    stream: &mut HostStream,
    deadline: Duration,
) -> Result<(), ConnectionError> {
    let hello = Message::hello();
    let text = hello.to_text().map_err(ConnectionError::invalid_frame)?;
    stream
        .send(Frame::Text(text))
        .await
        .map_err(ConnectionError::transport)?;

    let reply = tokio::time::timeout(deadline, next_text(stream))
        .await
        .map_err(|_| ConnectionError::HandshakeTimeout { timeout: deadline })??;

    match Message::parse(&reply) {
        Ok(echo) if echo == hello => Ok(()),
        _ => Err(ConnectionError::HandshakeMismatch { received: reply }),
    }
}

async fn next_text(stream: &mut HostStream) -> Result<String, ConnectionError> {
    while let Some(frame) = stream.next().await {
        match frame.map_err(ConnectionError::transport)? {
            Frame::Text(text) => return Ok(text),
            Frame::Close(_) => return Err(ConnectionError::Closed),
            other => trace!(
                target: CONNECTION_TARGET,
                frame = ?other,
                "ignoring non-text frame during handshake"
            ),
        }
    }
    Err(ConnectionError::Closed)
}

/// Closes a stream that never became active.
pub(super) async fn close(mut stream: HostStream) {
    if let Err(error) = stream.close(None).await {
        log_close_error(&error);
    }
}

fn log_close_error(error: &tungstenite::Error) {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {}
        other => debug!(target: CONNECTION_TARGET, error = %other, "failed to close transport"),
    }
}

/// Serves requests until the peer says bye, closes, fails, or `cancel` fires.
///
/// Each request runs in its own task so a slow provider never blocks the
/// loop. All responses funnel through one writer task. When the loop ends the
/// remaining request tasks are cancelled and awaited before this returns.
pub(super) async fn serve(
    stream: HostStream,
    router: Arc<MessageRouter>,
    state: &watch::Sender<ConnectionState>,
    cancel: &CancellationToken,
) -> Result<(), ConnectionError> {
    let (sink, mut source) = stream.split();
    let (outgoing, queue) = mpsc::channel(OUTGOING_CAPACITY);
    let writer = tokio::spawn(write_frames(sink, queue));
    let mut tasks = JoinSet::new();

    let outcome = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(target: CONNECTION_TARGET, "session cancelled");
                break Ok(());
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(error) = joined {
                    warn!(target: CONNECTION_TARGET, error = %error, "request task failed");
                }
            }
            frame = source.next() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    if handle_text(text, &router, &outgoing, &mut tasks).await.is_break() {
                        break Ok(());
                    }
                }
                Some(Ok(Frame::Close(reason))) => {
                    debug!(target: CONNECTION_TARGET, reason = ?reason, "peer closed connection");
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => break Err(ConnectionError::transport(error)),
                None => break Ok(()),
            },
        }
    };

    state.send_replace(ConnectionState::Draining);
    let pending = tasks.len();
    tasks.shutdown().await;
    drop(outgoing);
    if let Err(error) = writer.await {
        warn!(target: CONNECTION_TARGET, error = %error, "writer task failed");
    }
    debug!(target: CONNECTION_TARGET, cancelled_requests = pending, "session drained");
    outcome
}

enum Flow {
    Continue,
    Bye,
}

impl Flow {
    const fn is_break(&self) -> bool {
        matches!(self, Self::Bye)
    }
}

async fn handle_text(
    text: String,
    router: &Arc<MessageRouter>,
    outgoing: &mpsc::Sender<String>,
    tasks: &mut JoinSet<()>,
) -> Flow {
    let message = match Message::parse(&text) {
        Ok(message) => message,
        Err(error) => {
            warn!(target: CONNECTION_TARGET, error = %error, "dropping undecodable frame");
            return Flow::Continue;
        }
    };

    if message.verb() == Verb::Bye {
        debug!(target: CONNECTION_TARGET, opid = %message.opid, "management host said bye");
        if outgoing.send(text).await.is_err() {
            debug!(target: CONNECTION_TARGET, "writer gone before bye echo");
        }
        return Flow::Bye;
    }

    trace!(
        target: CONNECTION_TARGET,
        opid = %message.opid,
        opnm = %message.opnm,
        "request received"
    );
    let router = Arc::clone(router);
    let outgoing = outgoing.clone();
    tasks.spawn(async move {
        let response = router.route(message).await;
        match response.to_text() {
            Ok(text) => {
                if outgoing.send(text).await.is_err() {
                    debug!(
                        target: CONNECTION_TARGET,
                        opid = %response.opid,
                        "writer gone; response dropped"
                    );
                }
            }
            Err(error) => warn!(
                target: CONNECTION_TARGET,
                opid = %response.opid,
                error = %ConnectionError::invalid_frame(error),
                "failed to encode response"
            ),
        }
    });
    Flow::Continue
}

/// Owns the sink: writes queued frames in order, then closes the transport
/// once every sender is gone.
async fn write_frames(
    mut sink: SplitSink<HostStream, Frame>,
    mut queue: mpsc::Receiver<String>,
) {
    while let Some(text) = queue.recv().await {
        if let Err(error) = sink.send(Frame::Text(text)).await {
            warn!(target: CONNECTION_TARGET, error = %error, "failed to write frame");
            break;
        }
    }
    queue.close();
    if let Err(error) = sink.close().await {
        log_close_error(&error);
    }
}
