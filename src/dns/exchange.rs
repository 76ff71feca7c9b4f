// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Single query/response exchanges with an upstream server.

use anyhow::{bail, Context as _, Result};
use hickory_proto::op::Message;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::constants::UDP_RECV_BUFFER_SIZE;

/// Send `msg` over UDP and wait for the reply carrying the same id.
///
/// # Errors
///
/// Returns an error on socket failures, undecodable replies or when `deadline` passes.
pub async fn udp(server: SocketAddr, msg: &Message, deadline: Duration) -> Result<Message> {
    let bind: SocketAddr = match server.ip() {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await.context("binding udp socket")?;
    socket.connect(server).await.context("connecting udp socket")?;
    let bytes = msg.to_vec().context("encoding query")?;

    timeout(deadline, async {
        socket.send(&bytes).await.context("sending query")?;
        let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
        loop {
            let n = socket.recv(&mut buf).await.context("receiving reply")?;
            let Ok(reply) = Message::from_vec(&buf[..n]) else {
                continue;
            };
            if reply.id() == msg.id() {
                return Ok::<_, anyhow::Error>(reply);
            }
        }
    })
    .await
    .with_context(|| format!("udp query to {server} timed out"))?
}

/// Send `msg` over a fresh TCP connection.
///
/// # Errors
///
/// Returns an error on connection failures, undecodable replies or when `deadline`
/// passes.
pub async fn tcp(server: SocketAddr, msg: &Message, deadline: Duration) -> Result<Message> {
    let bytes = msg.to_vec().context("encoding query")?;
    let Ok(len) = u16::try_from(bytes.len()) else {
        bail!("query of {} bytes does not fit a tcp frame", bytes.len());
    };

    timeout(deadline, async {
        let mut stream = TcpStream::connect(server)
            .await
            .with_context(|| format!("connecting to {server}"))?;
        stream.write_u16(len).await?;
        stream.write_all(&bytes).await?;
        stream.flush().await?;

        let reply_len = stream.read_u16().await.context("reading reply length")?;
        let mut buf = vec![0u8; usize::from(reply_len)];
        stream
            .read_exact(&mut buf)
            .await
            .context("reading reply")?;
        Message::from_vec(&buf).context("decoding reply")
    })
    .await
    .with_context(|| format!("tcp query to {server} timed out"))?
}

/// UDP first, TCP when the UDP exchange fails or comes back truncated.
///
/// # Errors
///
/// Returns the TCP error when both transports fail.
pub async fn udp_then_tcp(server: SocketAddr, msg: &Message, deadline: Duration) -> Result<Message> {
    match udp(server, msg, deadline).await {
        Ok(reply) if !reply.truncated() => Ok(reply),
        Ok(_) | Err(_) => tcp(server, msg, deadline).await,
    }
}
