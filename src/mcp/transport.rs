//! Client-side transports
//!
//! A transport carries one serialized request to the server and brings back
//! the serialized response. Framing and connection handling belong to each
//! implementation.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{ClientError, ClientResult};
use crate::mcp::server::{Connection, Server};

/// Request/response exchange with an MCP server
#[async_trait]
pub trait Transport: Send {
    /// Send one JSON-RPC message and wait for its reply
    async fn exchange(&mut self, message: String) -> ClientResult<String>;
}

/// Talks to a server living in the same process
pub struct InProcessTransport {
    connection: Connection,
}

impl InProcessTransport {
    pub fn new(server: &Server) -> Self {
        Self {
            connection: server.connect(),
        }
    }

    /// Server-side view of this connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn exchange(&mut self, message: String) -> ClientResult<String> {
        Ok(self.connection.handle(&message))
    }
}

/// Newline-delimited JSON over TCP
pub struct TcpTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpTransport {
    pub async fn connect(addr: impl ToSocketAddrs) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(&mut self, message: String) -> ClientResult<String> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::Transport(
                "server closed the connection".to_string(),
            ));
        }
        Ok(line.trim_end().to_string())
    }
}
