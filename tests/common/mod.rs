//! In-process broker double speaking just enough RESP for the producer.
//!
//! Understands `RPUSHX`, `DUMP` and `LRANGE`. Anything else, including the
//! transport's own handshake commands, gets an error reply.

#![allow(dead_code)]

use bytes::Bytes;
use rafka_producer::{ProducerOptions, TransportOptions};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the broker reacts to `RPUSHX` and `DUMP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    /// Close the socket without replying.
    DropConnection,
    /// Reply with `-ERR injected failure`.
    ErrorReply,
    /// Never reply.
    Stall,
}

#[derive(Debug)]
struct BrokerState {
    topics: HashMap<String, Vec<Bytes>>,
    buffered: u64,
    behavior: Behavior,
}

pub struct FakeBroker {
    addr: SocketAddr,
    state: Arc<Mutex<BrokerState>>,
    accept_task: JoinHandle<()>,
}

impl FakeBroker {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(BrokerState {
            topics: HashMap::new(),
            buffered: 0,
            behavior: Behavior::Normal,
        }));

        let accept_state = state.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self {
            addr,
            state,
            accept_task,
        }
    }

    /// Options pointing at this broker, with a response timeout so a
    /// misbehaving test cannot hang.
    pub fn options(&self) -> ProducerOptions {
        ProducerOptions::new()
            .host(self.addr.ip().to_string())
            .port(self.addr.port())
            .transport_options(TransportOptions {
                connect_timeout_ms: Some(1000),
                response_timeout_ms: Some(2000),
                ..Default::default()
            })
    }

    pub fn create_topic(&self, topic: &str) {
        self.state
            .lock()
            .unwrap()
            .topics
            .entry(format!("topics:{}", topic))
            .or_default();
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .topics
            .contains_key(&format!("topics:{}", topic))
    }

    pub fn messages(&self, topic: &str) -> Vec<Bytes> {
        self.state
            .lock()
            .unwrap()
            .topics
            .get(&format!("topics:{}", topic))
            .cloned()
            .unwrap_or_default()
    }

    /// Sets how many messages `DUMP` reports as still buffered. A non-zero
    /// count never drains, so `DUMP` waits out its full timeout.
    pub fn set_buffered(&self, count: u64) {
        self.state.lock().unwrap().buffered = count;
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        self.state.lock().unwrap().behavior = behavior;
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

enum Reply {
    Integer(i64),
    Error(String),
    Array(Vec<Bytes>),
}

impl Reply {
    fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Integer(n) => format!(":{}\r\n", n).into_bytes(),
            Reply::Error(msg) => format!("-{}\r\n", msg).into_bytes(),
            Reply::Array(items) => {
                let mut out = format!("*{}\r\n", items.len()).into_bytes();
                for item in items {
                    out.extend_from_slice(format!("${}\r\n", item.len()).as_bytes());
                    out.extend_from_slice(item);
                    out.extend_from_slice(b"\r\n");
                }
                out
            }
        }
    }
}

async fn serve(stream: TcpStream, state: Arc<Mutex<BrokerState>>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(args) = read_command(&mut reader).await? {
        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();

        if name == "RPUSHX" || name == "DUMP" {
            let behavior = state.lock().unwrap().behavior;
            match behavior {
                Behavior::Normal => {}
                Behavior::DropConnection => return Ok(()),
                Behavior::ErrorReply => {
                    let reply = Reply::Error("ERR injected failure".to_string());
                    write_half.write_all(&reply.encode()).await?;
                    continue;
                }
                Behavior::Stall => std::future::pending::<()>().await,
            }
        }

        let reply = match name.as_str() {
            "RPUSHX" if args.len() == 3 => {
                let key = String::from_utf8_lossy(&args[1]).into_owned();
                let mut state = state.lock().unwrap();
                match state.topics.get_mut(&key) {
                    Some(queue) => {
                        queue.push(args[2].clone());
                        Reply::Integer(queue.len() as i64)
                    }
                    None => Reply::Integer(0),
                }
            }
            "DUMP" if args.len() == 2 => {
                let timeout_ms: u64 = String::from_utf8_lossy(&args[1]).parse().unwrap_or(0);
                let buffered = state.lock().unwrap().buffered;
                if buffered > 0 {
                    tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                }
                Reply::Integer(buffered as i64)
            }
            "LRANGE" if args.len() == 4 => {
                let key = String::from_utf8_lossy(&args[1]).into_owned();
                let state = state.lock().unwrap();
                Reply::Array(state.topics.get(&key).cloned().unwrap_or_default())
            }
            _ => Reply::Error(format!("ERR unknown command '{}'", name)),
        };

        write_half.write_all(&reply.encode()).await?;
    }

    Ok(())
}

async fn read_command<R>(reader: &mut R) -> io::Result<Option<Vec<Bytes>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let count = parse_header(&line, '*')?;
    let mut args = Vec::with_capacity(count);

    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = parse_header(&line, '$')?;

        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(Bytes::from(buf));
    }

    Ok(Some(args))
}

fn parse_header(line: &str, prefix: char) -> io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed RESP header: {:?}", line),
            )
        })
}
