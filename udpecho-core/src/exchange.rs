//! Retrying request/response exchange over a connected UDP socket.
//!
//! One exchange is up to `max_retries + 1` send attempts. Each attempt sends
//! the payload and waits for the echoed reply, bounded by the current backoff
//! interval; the interval grows after every failed attempt. Transient
//! failures (send error, receive error, timeout) stay inside the loop and
//! surface only as [`Outcome::Exhausted`]; everything else here is fatal and
//! happens before the first send.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::backoff::BackoffSchedule;
use crate::wire::MAX_PAYLOAD;

/// Terminal outcome of one exchange. Exhaustion is an expected outcome the
/// caller must handle, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A reply arrived within the scheduled wait. The reply replaces the
    /// request content from the caller's perspective. `attempts` counts
    /// sends, starting at 1.
    Delivered { reply: Vec<u8>, attempts: u32 },
    /// All permitted attempts failed to produce a reply.
    Exhausted { attempts: u32 },
}

/// Conditions that cannot be retried away. Raised before the retry loop
/// starts; zero datagrams have been sent when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("bind local endpoint: {0}")]
    Bind(std::io::Error),
    #[error("associate endpoint with peer: {0}")]
    Connect(std::io::Error),
    #[error("payload is empty")]
    EmptyPayload,
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD}-byte limit")]
    PayloadTooLarge(usize),
}

/// Why a single attempt failed. Consumed by the retry loop, never returned.
#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error("send failed: {0}")]
    Send(std::io::Error),
    #[error("receive failed: {0}")]
    Recv(std::io::Error),
    #[error("timed out")]
    TimedOut,
}

/// One-shot exchanger: owns the local endpoint, the peer address, and the
/// backoff schedule for a single logical request/response exchange. Dropping
/// it releases the endpoint.
pub struct Exchanger {
    socket: UdpSocket,
    peer: SocketAddr,
    schedule: BackoffSchedule,
    max_retries: u32,
}

impl Exchanger {
    /// Bind an ephemeral local endpoint and associate it with `peer`. The
    /// association is local only: it fixes the default destination and
    /// filters inbound datagrams to that peer. No handshake occurs and the
    /// transport stays connectionless.
    pub async fn connect(
        peer: SocketAddr,
        schedule: BackoffSchedule,
        max_retries: u32,
    ) -> Result<Self, ExchangeError> {
        let local = if peer.is_ipv4() { ("0.0.0.0", 0) } else { ("::", 0) };
        let socket = UdpSocket::bind(local).await.map_err(ExchangeError::Bind)?;
        socket.connect(peer).await.map_err(ExchangeError::Connect)?;
        debug!(%peer, "endpoint associated");
        Ok(Self {
            socket,
            peer,
            schedule,
            max_retries,
        })
    }

    /// Perform the exchange: send, wait bounded by the current interval,
    /// grow the interval and retry on failure, up to `max_retries` retries.
    /// `max_retries = 0` means exactly one attempt.
    pub async fn exchange(&self, payload: &[u8]) -> Result<Outcome, ExchangeError> {
        if payload.is_empty() {
            return Err(ExchangeError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(ExchangeError::PayloadTooLarge(payload.len()));
        }

        let mut buf = vec![0u8; MAX_PAYLOAD];
        let mut attempt: u32 = 0;
        let mut current = self.schedule.base();
        loop {
            debug!(
                peer = %self.peer,
                attempt = attempt + 1,
                wait_ms = current.as_millis() as u64,
                "sending request"
            );
            match self.attempt_once(payload, &mut buf, current).await {
                Ok(len) => {
                    let attempts = attempt + 1;
                    info!(peer = %self.peer, attempts, len, "reply received");
                    return Ok(Outcome::Delivered {
                        reply: buf[..len].to_vec(),
                        attempts,
                    });
                }
                Err(cause) => {
                    warn!(peer = %self.peer, attempt = attempt + 1, %cause, "attempt failed");
                    if attempt == self.max_retries {
                        let attempts = attempt + 1;
                        warn!(peer = %self.peer, attempts, "retries exhausted");
                        return Ok(Outcome::Exhausted { attempts });
                    }
                    attempt += 1;
                    current = self.schedule.grow(current);
                }
            }
        }
    }

    /// One send-and-wait attempt. Every failure mode consumes exactly the
    /// scheduled `wait`: the receive timeout accounts for it naturally, and
    /// early-failing sends or receives sleep out the remainder so a broken
    /// transport cannot turn the backoff sequence into a busy loop.
    async fn attempt_once(
        &self,
        payload: &[u8],
        buf: &mut [u8],
        wait: Duration,
    ) -> Result<usize, AttemptFailure> {
        let started = Instant::now();
        if let Err(e) = self.socket.send(payload).await {
            sleep(wait.saturating_sub(started.elapsed())).await;
            return Err(AttemptFailure::Send(e));
        }
        match timeout(wait, self.socket.recv(buf)).await {
            Ok(Ok(len)) => Ok(len),
            Ok(Err(e)) => {
                sleep(wait.saturating_sub(started.elapsed())).await;
                Err(AttemptFailure::Recv(e))
            }
            Err(_) => Err(AttemptFailure::TimedOut),
        }
    }
}
