//! Backing-store connection.
//!
//! The pipeline drives a connection through two halves: a writer that sends
//! `GET` commands and a reader that yields replies in the order the commands
//! were sent. Replies carry no identifiers, so a transport plugged in here
//! must never reorder them.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{
    AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::info;

use crate::backend::resp::{self, Reply};
use crate::error::{ProxyError, Result};

/// Sending half of a backing-store connection.
#[async_trait]
pub trait CommandWriter: Send + 'static {
    /// Queues a read command for `key`. It may sit in a buffer until `flush`.
    async fn send_get(&mut self, key: &str) -> Result<()>;

    /// Pushes every queued command to the backing store.
    async fn flush(&mut self) -> Result<()>;
}

/// Receiving half of a backing-store connection.
#[async_trait]
pub trait ReplyReader: Send + 'static {
    /// Reads the reply to the oldest unanswered command.
    ///
    /// `Ok(None)` means the backing store has no value for the key.
    async fn receive(&mut self) -> Result<Option<Bytes>>;
}

// == RESP Writer ==
/// Writes RESP-encoded commands to a byte stream.
#[derive(Debug)]
pub struct RespWriter<W> {
    inner: BufWriter<W>,
    scratch: BytesMut,
}

impl<W: AsyncWrite + Unpin + Send + 'static> RespWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            scratch: BytesMut::with_capacity(256),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> CommandWriter for RespWriter<W> {
    async fn send_get(&mut self, key: &str) -> Result<()> {
        self.scratch.clear();
        resp::encode_get(&mut self.scratch, key.as_bytes());
        self.inner
            .write_all(&self.scratch)
            .await
            .map_err(ProxyError::io)
    }

    async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await.map_err(ProxyError::io)
    }
}

// == RESP Reader ==
/// Reads RESP replies from a byte stream.
#[derive(Debug)]
pub struct RespReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> RespReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send + 'static> ReplyReader for RespReader<R> {
    async fn receive(&mut self) -> Result<Option<Bytes>> {
        match resp::read_reply(&mut self.inner).await? {
            Reply::Bulk(value) => Ok(Some(value)),
            Reply::Nil => Ok(None),
            Reply::Error(message) => Err(ProxyError::Backend(message)),
            other => Err(ProxyError::UnexpectedReply(other.kind().to_string())),
        }
    }
}

/// Connection halves over a TCP stream.
pub type TcpConnection = (RespWriter<OwnedWriteHalf>, RespReader<OwnedReadHalf>);

/// Connects to the Redis server at `addr`.
pub async fn dial(addr: &str) -> Result<TcpConnection> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|err| ProxyError::Connect {
            addr: addr.to_string(),
            reason: err.to_string(),
        })?;
    // Commands are small and latency-bound; batching is done by the pipeline.
    stream.set_nodelay(true).map_err(|err| ProxyError::Connect {
        addr: addr.to_string(),
        reason: err.to_string(),
    })?;
    info!(addr, "backend: connected");

    let (read, write) = stream.into_split();
    Ok((RespWriter::new(write), RespReader::new(read)))
}

/// Splits any duplex stream into connection halves.
pub fn from_stream<S>(stream: S) -> (RespWriter<WriteHalf<S>>, RespReader<ReadHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read, write) = tokio::io::split(stream);
    (RespWriter::new(write), RespReader::new(read))
}
