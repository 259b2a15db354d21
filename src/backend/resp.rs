//! RESP2 codec for the Redis backing store.
//!
//! Only what the proxy needs: encoding `GET` and decoding any reply frame so
//! the stream stays in sync whatever the server sends back.

use std::future::Future;
use std::pin::Pin;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{ProxyError, Result};

/// Maximum bulk string size: 512MB (matches the Redis limit).
pub const MAX_BULK_STRING_LEN: usize = 512 * 1024 * 1024;

/// Maximum length of a reply header line.
const MAX_LINE_LEN: usize = 64 * 1024;

/// Maximum nesting of array replies.
pub const MAX_ARRAY_DEPTH: usize = 16;

/// Bulk buffers start at most this large and grow as data arrives.
const BULK_PREALLOC: usize = 64 * 1024;

/// A decoded RESP2 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Array(Vec<Reply>),
    Nil,
}

impl Reply {
    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Simple(_) => "simple string",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk string",
            Reply::Array(_) => "array",
            Reply::Nil => "nil",
        }
    }
}

/// Appends `GET key` to `buf` as a RESP array of bulk strings.
pub fn encode_get(buf: &mut BytesMut, key: &[u8]) {
    encode_command(buf, &[b"GET", key]);
}

fn encode_command(buf: &mut BytesMut, args: &[&[u8]]) {
    buf.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}

/// Reads one complete reply frame.
///
/// End of stream and malformed frames are reported as fatal errors: after
/// either, the position of the next reply is unknown.
pub fn read_reply<'a, R>(reader: &'a mut R) -> Pin<Box<dyn Future<Output = Result<Reply>> + Send + 'a>>
where
    R: AsyncBufRead + Unpin + Send,
{
    read_frame(reader, 0)
}

fn read_frame<'a, R>(
    reader: &'a mut R,
    depth: usize,
) -> Pin<Box<dyn Future<Output = Result<Reply>> + Send + 'a>>
where
    R: AsyncBufRead + Unpin + Send,
{
    Box::pin(async move {
        let line = read_line(reader).await?;
        let (prefix, body) = match line.split_first() {
            Some((prefix, body)) => (*prefix, body),
            None => return Err(ProxyError::Protocol("empty reply line".to_string())),
        };

        match prefix {
            b'+' => Ok(Reply::Simple(String::from_utf8_lossy(body).into_owned())),
            b'-' => Ok(Reply::Error(String::from_utf8_lossy(body).into_owned())),
            b':' => parse_integer(body).map(Reply::Integer),
            b'$' => {
                let len = parse_integer(body)?;
                if len < 0 {
                    return Ok(Reply::Nil);
                }
                let len = len as usize;
                if len > MAX_BULK_STRING_LEN {
                    return Err(ProxyError::Protocol(format!(
                        "bulk string of {} bytes exceeds limit",
                        len
                    )));
                }
                let mut data = Vec::with_capacity(len.min(BULK_PREALLOC));
                (&mut *reader)
                    .take(len as u64)
                    .read_to_end(&mut data)
                    .await
                    .map_err(ProxyError::io)?;
                if data.len() < len {
                    return Err(ProxyError::ConnectionLost(
                        "connection closed inside a bulk string".to_string(),
                    ));
                }

                let mut terminator = [0u8; 2];
                reader
                    .read_exact(&mut terminator)
                    .await
                    .map_err(ProxyError::io)?;
                if &terminator != b"\r\n" {
                    return Err(ProxyError::Protocol(
                        "bulk string not terminated by CRLF".to_string(),
                    ));
                }
                Ok(Reply::Bulk(Bytes::from(data)))
            }
            b'*' => {
                let count = parse_integer(body)?;
                if count < 0 {
                    return Ok(Reply::Nil);
                }
                if depth >= MAX_ARRAY_DEPTH {
                    return Err(ProxyError::Protocol(format!(
                        "arrays nested deeper than {}",
                        MAX_ARRAY_DEPTH
                    )));
                }
                let mut items = Vec::with_capacity((count as usize).min(1024));
                for _ in 0..count {
                    items.push(read_frame(reader, depth + 1).await?);
                }
                Ok(Reply::Array(items))
            }
            other => Err(ProxyError::Protocol(format!(
                "unknown reply type byte 0x{:02x}",
                other
            ))),
        }
    })
}

/// Reads a CRLF-terminated line and strips the terminator.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = (&mut *reader).take(MAX_LINE_LEN as u64);
    let read = limited
        .read_until(b'\n', &mut line)
        .await
        .map_err(ProxyError::io)?;

    if read == 0 {
        return Err(ProxyError::ConnectionLost(
            "connection closed by backing store".to_string(),
        ));
    }
    if !line.ends_with(b"\r\n") {
        return Err(ProxyError::Protocol("reply line not terminated by CRLF".to_string()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_integer(body: &[u8]) -> Result<i64> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            ProxyError::Protocol(format!(
                "invalid integer {:?}",
                String::from_utf8_lossy(body)
            ))
        })
}
