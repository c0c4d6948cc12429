//! Unix socket front end for a [`Broker`].
//!
//! One line of JSON per frame in each direction. On accept the server opens
//! a root channel for the connection and writes a [`Greeting`] naming it;
//! after that every [`Envelope`] line is answered by exactly one
//! [`Response`] line, in order. A connection can only address channels it
//! opened or cloned, and every one of them is closed when it goes away.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use capwd::{decode_envelope, Broker, CapwdError, ChannelId, Envelope, Reply, Response};
use capwd_lattice::RestrictionState;

use crate::error::NodeError;

/// Largest accepted request frame, newline excluded.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// First frame the server sends on a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Greeting {
    /// The root channel opened for this connection.
    Hello {
        /// Its id.
        channel: ChannelId,
    },
}

/// A running listener.
pub struct Server {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Server {
    /// Start accepting on `listener`. Each connection's root channel starts
    /// from `initial`.
    pub fn start(listener: UnixListener, broker: Arc<Broker>, initial: RestrictionState) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("capwd server shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, _)) => {
                                let broker = Arc::clone(&broker);
                                let initial = initial.clone();
                                tokio::spawn(async move {
                                    if let Err(err) = serve_connection(stream, broker, initial).await {
                                        warn!("capwd connection error: {err}");
                                    }
                                });
                            }
                            Err(err) => {
                                error!("capwd accept error: {err}");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    /// Stop accepting. Connections already being served run to completion.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

/// The channels one connection may address.
///
/// Every channel still owned is closed on drop, so a peer that vanishes
/// mid-conversation leaves nothing behind in the broker.
pub struct Connection {
    broker: Arc<Broker>,
    root: ChannelId,
    owned: HashSet<ChannelId>,
}

impl Connection {
    /// Open a root channel from `initial` and own it.
    pub fn open(broker: Arc<Broker>, initial: RestrictionState) -> Self {
        let root = broker.open_with(initial);
        Self {
            broker,
            root,
            owned: HashSet::from([root]),
        }
    }

    /// The root channel opened for this connection.
    pub fn root(&self) -> ChannelId {
        self.root
    }

    /// Whether `channel` may be addressed on this connection.
    pub fn owns(&self, channel: ChannelId) -> bool {
        self.owned.contains(&channel)
    }

    /// Answer one request frame.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Response {
        let result = decode_envelope(frame).and_then(|envelope| self.dispatch(envelope));
        Response::from(result)
    }

    fn dispatch(&mut self, envelope: Envelope) -> capwd::Result<Reply> {
        let Envelope { channel, request } = envelope;
        if !self.owns(channel) {
            return Err(CapwdError::ChannelClosed { channel });
        }

        let reply = self.broker.handle(channel, request)?;
        match &reply {
            Reply::Cloned(child) => {
                self.owned.insert(*child);
            }
            Reply::Closed => {
                self.owned.remove(&channel);
            }
            _ => {}
        }
        Ok(reply)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for channel in self.owned.drain() {
            let _ = self.broker.close(channel);
        }
    }
}

async fn serve_connection(
    stream: UnixStream,
    broker: Arc<Broker>,
    initial: RestrictionState,
) -> Result<(), NodeError> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut connection = Connection::open(broker, initial);
    info!(channel = %connection.root(), "connection accepted");

    write_frame(
        &mut write,
        &Greeting::Hello {
            channel: connection.root(),
        },
    )
    .await?;

    let mut frame = Vec::new();
    loop {
        frame.clear();
        let n = (&mut reader)
            .take(MAX_FRAME_LEN as u64 + 1)
            .read_until(b'\n', &mut frame)
            .await?;
        if n == 0 {
            break;
        }

        if frame.last() == Some(&b'\n') {
            frame.pop();
        } else if frame.len() > MAX_FRAME_LEN {
            warn!(channel = %connection.root(), "oversized frame, dropping connection");
            let response = Response::from(Err::<Reply, _>(CapwdError::MalformedRequest {
                reason: format!("frame exceeds {} bytes", MAX_FRAME_LEN),
            }));
            write_frame(&mut write, &response).await?;
            break;
        }
        if frame.last() == Some(&b'\r') {
            frame.pop();
        }

        let response = connection.handle_frame(&frame);
        write_frame(&mut write, &response).await?;
    }

    debug!(channel = %connection.root(), "connection closed by peer");
    Ok(())
}

async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<(), NodeError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
