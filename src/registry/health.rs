//! UDP connectivity probe used both for broadcaster registration
//! (spec.md §4.4 step 3) and general server-RTT measurement (spec.md
//! §6 UDP health-check wire, consumed by the lobby finder/backfill and
//! the client-facing `LobbyPingRequest`/`LobbyPingResponse` exchange).
//!
//! Grounded in the teacher's UDP tunnel handling idiom (datagram
//! send/recv over a bound `tokio::net::UdpSocket` with a bounded
//! timeout per attempt) but scoped down to a fixed request/response
//! pair rather than a full tunnel protocol, since that is all this
//! probe needs.

use std::net::SocketAddr;
use std::time::Duration;

use rand::RngCore;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Request symbol for the health-check wire (spec.md §6).
pub const PING_SYMBOL: u64 = 0x997279DE065A03B0;
/// Reply symbol for the health-check wire (spec.md §6).
pub const ACK_SYMBOL: u64 = 0x4F7AE556E0B77891;

const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(750);

/// Sends one health-check ping and waits for the matching ack. Returns
/// the round-trip time on success. `None` on timeout or a mismatched
/// reply (spec.md §6: "Any other reply is treated as failure; timeout
/// returns RTT = -1", represented here as `None`).
pub async fn probe_once(socket: &UdpSocket, target: SocketAddr) -> Option<Duration> {
    let mut token = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut token);

    let mut request = Vec::with_capacity(16);
    request.extend_from_slice(&PING_SYMBOL.to_le_bytes());
    request.extend_from_slice(&token);

    let started = tokio::time::Instant::now();
    if socket.send_to(&request, target).await.is_err() {
        return None;
    }

    let mut buf = [0u8; 16];
    let recv = timeout(PER_ATTEMPT_TIMEOUT, socket.recv_from(&mut buf)).await;
    let (len, from) = match recv {
        Ok(Ok(pair)) => pair,
        _ => return None,
    };

    if from != target || len != 16 {
        return None;
    }

    let reply_symbol = u64::from_le_bytes(buf[0..8].try_into().unwrap());
    let echoed = &buf[8..16];
    if reply_symbol != ACK_SYMBOL || echoed != token {
        return None;
    }

    Some(started.elapsed())
}

/// Probes `target` up to `attempts` times, returning the first
/// successful round-trip (spec.md §4.4 step 3: "up to 5 UDP ping-request
/// packets... Success requires one round-trip within a bounded
/// timeout").
pub async fn probe_with_retries(socket: &UdpSocket, target: SocketAddr, attempts: u32) -> Option<Duration> {
    for _ in 0..attempts {
        if let Some(rtt) = probe_once(socket, target).await {
            return Some(rtt);
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_probe_succeeds_against_a_loopback_echo_server() {
        let server = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let server_addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            if let Ok((len, from)) = server.recv_from(&mut buf).await {
                if len == 16 {
                    let mut reply = Vec::with_capacity(16);
                    reply.extend_from_slice(&ACK_SYMBOL.to_le_bytes());
                    reply.extend_from_slice(&buf[8..16]);
                    let _ = server.send_to(&reply, from).await;
                }
            }
        });

        let client = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let rtt = probe_with_retries(&client, server_addr, 5).await;
        assert!(rtt.is_some());
    }

    #[tokio::test]
    async fn test_probe_times_out_against_silent_target() {
        let silent = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let silent_addr = silent.local_addr().unwrap();
        let client = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let rtt = probe_once(&client, silent_addr).await;
        assert!(rtt.is_none());
    }
}
