//! Fake Redis server speaking just enough RESP for the proxy.
//!
//! Commands are answered strictly in arrival order. The server counts GETs
//! per key and records the largest number of commands it has seen without
//! having answered them yet.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Shared {
    data: Mutex<HashMap<String, String>>,
    gets: Mutex<HashMap<String, usize>>,
    outstanding: AtomicUsize,
    max_outstanding: AtomicUsize,
}

/// Handle to a running fake Redis.
#[derive(Debug, Clone)]
pub struct FakeRedis {
    pub addr: String,
    shared: Arc<Shared>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    /// Delay before each reply is written
    pub reply_delay: Duration,
    /// Read commands but never answer them
    pub silent: bool,
}

impl FakeRedis {
    pub async fn start(data: &[(&str, &str)]) -> Self {
        Self::start_with(data, Behavior::default()).await
    }

    pub async fn start_with(data: &[(&str, &str)], behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let shared = Arc::new(Shared::default());
        {
            let mut map = shared.data.lock();
            for (k, v) in data {
                map.insert(k.to_string(), v.to_string());
            }
        }

        let server_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                serve(stream, Arc::clone(&server_shared), behavior);
            }
        });

        Self { addr, shared }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.shared.data.lock().insert(key.to_string(), value.to_string());
    }

    /// Number of GETs received for `key`.
    pub fn gets(&self, key: &str) -> usize {
        self.shared.gets.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total_gets(&self) -> usize {
        self.shared.gets.lock().values().sum()
    }

    /// Largest number of unanswered commands observed.
    pub fn max_outstanding(&self) -> usize {
        self.shared.max_outstanding.load(Ordering::SeqCst)
    }
}

fn serve(stream: tokio::net::TcpStream, shared: Arc<Shared>, behavior: Behavior) {
    let (read, mut write) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let reader_shared = Arc::clone(&shared);
    tokio::spawn(async move {
        let mut reader = BufReader::new(read);
        while let Some(key) = read_get(&mut reader).await {
            *reader_shared.gets.lock().entry(key.clone()).or_insert(0) += 1;
            let outstanding = reader_shared.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            reader_shared
                .max_outstanding
                .fetch_max(outstanding, Ordering::SeqCst);
            if tx.send(key).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(key) = rx.recv().await {
            if behavior.silent {
                continue;
            }
            if !behavior.reply_delay.is_zero() {
                tokio::time::sleep(behavior.reply_delay).await;
            }
            let reply = match shared.data.lock().get(&key) {
                Some(value) => format!("${}\r\n{}\r\n", value.len(), value),
                None if key.starts_with("error:") => format!("-ERR {}\r\n", key),
                None => "$-1\r\n".to_string(),
            };
            shared.outstanding.fetch_sub(1, Ordering::SeqCst);
            if write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });
}

/// Reads one `*2 $3 GET $n key` command and returns the key.
async fn read_get<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
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
