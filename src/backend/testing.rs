//! In-memory backing store for unit tests.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};

use crate::backend::{from_stream, PipelineAdapter};

/// Reads one `*2 $3 GET $n key` command off the server side of a stream.
pub(crate) async fn read_get<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut line = String::new();
    for _ in 0..4 {
        line.clear();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
    }
    let len: usize = line.trim_start_matches('$').trim_end().parse().ok()?;
    let mut key = vec![0u8; len + 2];
    reader.read_exact(&mut key).await.ok()?;
    key.truncate(len);
    String::from_utf8(key).ok()
}

/// Answers every command in order from `data`, nil for unknown keys and an
/// error reply for keys starting with `error:`.
pub(crate) fn spawn_server(server: DuplexStream, data: HashMap<String, String>) {
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut reader = BufReader::new(read);
        while let Some(key) = read_get(&mut reader).await {
            let reply = match data.get(&key) {
                Some(value) => format!("${}\r\n{}\r\n", value.len(), value),
                None if key.starts_with("error:") => format!("-ERR {}\r\n", key),
                None => "$-1\r\n".to_string(),
            };
            if write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });
}

/// A pipeline connected to an in-memory server holding `data`.
pub(crate) fn fake_backend(data: &[(&str, &str)]) -> PipelineAdapter {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let data = data
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    spawn_server(server, data);

    let (writer, reader) = from_stream(client);
    PipelineAdapter::spawn(writer, reader, 4, Duration::from_secs(5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::resp::encode_get;
    use bytes::BytesMut;

    #[tokio::test]
    async fn test_read_get_parses_encoded_commands() {
        let mut buf = BytesMut::new();
        encode_get(&mut buf, b"first");
        encode_get(&mut buf, b"a\r\nb");

        let mut input: &[u8] = &buf;
        assert_eq!(read_get(&mut input).await.as_deref(), Some("first"));
        assert_eq!(read_get(&mut input).await.as_deref(), Some("a\r\nb"));
        assert_eq!(read_get(&mut input).await, None);
    }
}
