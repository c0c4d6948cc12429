//! Async client for the capwd socket.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use capwd::{ChannelId, Envelope, Reply, Request, Response};

use crate::error::NodeError;
use crate::server::Greeting;

/// One connection to a capwd-node.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    root: ChannelId,
}

impl Client {
    /// Connect and read the greeting.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let stream = UnixStream::connect(path).await?;
        let (read, writer) = stream.into_split();
        let mut reader = BufReader::new(read);

        let line = read_line(&mut reader).await?;
        let Greeting::Hello { channel } = serde_json::from_str(&line)
            .map_err(|e| NodeError::Protocol(format!("bad greeting: {e}")))?;

        Ok(Self {
            reader,
            writer,
            root: channel,
        })
    }

    /// The root channel the server opened for this connection.
    pub fn root(&self) -> ChannelId {
        self.root
    }

    /// Send `request` on `channel` and wait for its answer. Error frames
    /// come back as [`NodeError::Remote`].
    pub async fn call(&mut self, channel: ChannelId, request: Request) -> Result<Reply, NodeError> {
        let frame = serde_json::to_vec(&Envelope { channel, request })?;
        match self.exchange(&frame).await? {
            Response::Ok(reply) => Ok(reply),
            Response::Error(frame) => Err(NodeError::Remote {
                kind: frame.kind,
                message: frame.message,
            }),
        }
    }

    /// Send one raw frame, newline appended, and read the response line.
    pub async fn exchange(&mut self, frame: &[u8]) -> Result<Response, NodeError> {
        let mut line = Vec::with_capacity(frame.len() + 1);
        line.extend_from_slice(frame);
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;

        let line = read_line(&mut self.reader).await?;
        Ok(serde_json::from_str(&line)?)
    }
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<String, NodeError> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(NodeError::Disconnected);
    }
    Ok(line)
}
