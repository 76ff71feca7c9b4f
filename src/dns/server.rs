// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! UDP and TCP listeners feeding the handler chain.

use super::response::{self, truncate};
use super::{Chain, Protocol, Request};
use crate::constants::{MAX_UDP_RESPONSE_SIZE, TCP_IDLE_TIMEOUT_SECS, UDP_RECV_BUFFER_SIZE};
use anyhow::{Context as _, Result};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// DNS server bound to one UDP socket and one TCP listener on the same port.
#[derive(Debug)]
pub struct DnsServer {
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    chain: Arc<Chain>,
}

impl DnsServer {
    /// Bind UDP and TCP on `addr`. With port 0 the TCP listener reuses the port the
    /// kernel picked for UDP.
    ///
    /// # Errors
    ///
    /// Returns an error if either socket cannot be bound.
    pub async fn bind(addr: SocketAddr, chain: Chain) -> Result<Self> {
        let udp = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("binding dns udp socket on {addr}"))?;
        let udp_addr = udp.local_addr()?;
        let tcp = TcpListener::bind(udp_addr)
            .await
            .with_context(|| format!("binding dns tcp listener on {udp_addr}"))?;
        Ok(Self {
            udp: Arc::new(udp),
            tcp,
            chain: Arc::new(chain),
        })
    }

    /// Address both listeners are bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    /// Serve until one of the listeners fails.
    ///
    /// # Errors
    ///
    /// Returns the first fatal listener error.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(addr = %addr, plugins = ?self.chain.names(), "Starting DNS server");
        tokio::try_join!(
            serve_udp(self.udp, self.chain.clone()),
            serve_tcp(self.tcp, self.chain),
        )?;
        Ok(())
    }
}

async fn serve_udp(socket: Arc<UdpSocket>, chain: Arc<Chain>) -> Result<()> {
    let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
    loop {
        let (n, src) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "UDP receive failed");
                continue;
            }
        };
        let packet = buf[..n].to_vec();
        let socket = socket.clone();
        let chain = chain.clone();
        tokio::spawn(async move {
            if let Some(reply) = handle_packet(&chain, &packet, src, Protocol::Udp).await {
                if let Err(e) = socket.send_to(&reply, src).await {
                    debug!(remote = %src, error = %e, "UDP send failed");
                }
            }
        });
    }
}

async fn serve_tcp(listener: TcpListener, chain: Arc<Chain>) -> Result<()> {
    loop {
        let (stream, src) = listener.accept().await.context("accepting dns tcp connection")?;
        let chain = chain.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, src, &chain).await {
                debug!(remote = %src, error = %e, "TCP connection closed");
            }
        });
    }
}

/// Answer length-prefixed messages in order until the peer closes or idles out.
async fn serve_connection(mut stream: TcpStream, src: SocketAddr, chain: &Chain) -> Result<()> {
    let idle = Duration::from_secs(TCP_IDLE_TIMEOUT_SECS);
    loop {
        let len = match timeout(idle, stream.read_u16()).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Ok(()),
        };
        let mut packet = vec![0u8; usize::from(len)];
        timeout(idle, stream.read_exact(&mut packet))
            .await
            .context("reading tcp frame timed out")??;

        let Some(reply) = handle_packet(chain, &packet, src, Protocol::Tcp).await else {
            continue;
        };
        let Ok(reply_len) = u16::try_from(reply.len()) else {
            error!(remote = %src, size = reply.len(), "Response too large for tcp frame");
            continue;
        };
        stream.write_u16(reply_len).await?;
        stream.write_all(&reply).await?;
        stream.flush().await?;
    }
}

/// Decode, dispatch and encode one request. `None` means the packet is dropped.
pub async fn handle_packet(
    chain: &Chain,
    packet: &[u8],
    src: SocketAddr,
    protocol: Protocol,
) -> Option<Vec<u8>> {
    let message = match Message::from_vec(packet) {
        Ok(message) => message,
        Err(e) => {
            debug!(remote = %src, error = %e, "Malformed request");
            return form_error(packet);
        }
    };
    if message.message_type() != MessageType::Query {
        return None;
    }

    let mut reply = if message.queries().len() != 1 {
        response::error(&message, ResponseCode::FormErr)
    } else if message.op_code() != OpCode::Query {
        response::error(&message, ResponseCode::NotImp)
    } else {
        let request = Request {
            message,
            src,
            protocol,
        };
        chain.handle(&request).await
    };

    if protocol == Protocol::Udp {
        if let Err(e) = truncate(&mut reply, MAX_UDP_RESPONSE_SIZE) {
            error!(remote = %src, error = %e, "Failed to truncate response");
            return encoding_failure(&reply);
        }
    }
    match reply.to_vec() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!(remote = %src, error = %e, "Failed to encode response");
            encoding_failure(&reply)
        }
    }
}

/// SERVFAIL in place of a reply whose records cannot be encoded.
fn encoding_failure(reply: &Message) -> Option<Vec<u8>> {
    let mut msg = Message::error_msg(reply.id(), reply.op_code(), ResponseCode::ServFail);
    msg.add_queries(reply.queries().to_vec());
    msg.to_vec().ok()
}

/// FORMERR reply built from the id of a request that does not decode.
fn form_error(packet: &[u8]) -> Option<Vec<u8>> {
    if packet.len() < 12 {
        return None;
    }
    let id = u16::from_be_bytes([packet[0], packet[1]]);
    Message::error_msg(id, OpCode::Query, ResponseCode::FormErr)
        .to_vec()
        .ok()
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
