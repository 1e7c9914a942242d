//! Echo responder: return every received datagram, unchanged, to its sender.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::wire::MAX_PAYLOAD;

/// Stateless echo service bound to one local address. Each datagram is
/// handled independently; no per-peer state is kept between them.
pub struct Responder {
    socket: UdpSocket,
}

impl Responder {
    /// Bind the listening endpoint. This is the only operation that may
    /// fail the service; [`Responder::run`] never does.
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }

    /// Address the responder is bound to. Reports the actual port when
    /// bound to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve forever: receive one datagram, echo the same bytes back to its
    /// source. Per-datagram receive or send failures are logged and the
    /// loop continues; a single failure never terminates the service.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut buf = vec![0u8; MAX_PAYLOAD];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "receive failed");
                    continue;
                }
            };
            info!(%peer, len, "datagram received");
            if let Err(e) = self.socket.send_to(&buf[..len], peer).await {
                warn!(%peer, error = %e, "echo failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffSchedule;
    use crate::exchange::{Exchanger, Outcome};
    use std::time::Duration;
    use tokio::time::timeout;

    const RECV_DEADLINE: Duration = Duration::from_secs(2);

    async fn spawn_responder() -> SocketAddr {
        let responder = Responder::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = responder.local_addr().unwrap();
        tokio::spawn(async move { responder.run().await });
        addr
    }

    #[tokio::test]
    async fn echoes_each_datagram_to_its_sender() {
        let addr = spawn_responder().await;
        let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        first.send_to(b"from first", addr).await.unwrap();
        second.send_to(b"from second", addr).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = timeout(RECV_DEADLINE, first.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"from first");
        assert_eq!(from, addr);

        let (len, from) = timeout(RECV_DEADLINE, second.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"from second");
        assert_eq!(from, addr);
    }

    #[tokio::test]
    async fn echoes_empty_datagram() {
        let addr = spawn_responder().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"", addr).await.unwrap();
        let mut buf = [0u8; 16];
        let (len, _) = timeout(RECV_DEADLINE, client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn truncates_oversized_datagram_to_payload_limit() {
        let addr = spawn_responder().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let oversized = vec![0x5Au8; MAX_PAYLOAD + 512];
        client.send_to(&oversized, addr).await.unwrap();
        let mut buf = vec![0u8; MAX_PAYLOAD + 512];
        let (len, _) = timeout(RECV_DEADLINE, client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(len, MAX_PAYLOAD);
        assert_eq!(&buf[..len], &oversized[..MAX_PAYLOAD]);
    }

    #[tokio::test]
    async fn roundtrip_through_exchanger() {
        let addr = spawn_responder().await;
        let schedule = BackoffSchedule::from_millis(50, 2, 200).unwrap();
        let exchanger = Exchanger::connect(addr, schedule, 2).await.unwrap();
        let outcome = exchanger.exchange(b"ping over the wire").await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Delivered {
                reply: b"ping over the wire".to_vec(),
                attempts: 1,
            }
        );
    }
}
