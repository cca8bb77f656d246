use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use crate::config::{DnsConfig, SelectionMode};
use crate::error::{DnsError, Result};

/// Something that can answer a DNS query: takes the raw query bytes, fills
/// the answer buffer, returns the answer length. The production source is
/// `DNSClient`; tests script this seam.
#[async_trait]
pub trait DnsSource: Send {
    async fn send_query(&mut self, query: &[u8], answer: &mut [u8]) -> Result<usize>;
}

/// Picks the upstream server for one send attempt. The round-robin counter
/// is shared by every client so consecutive queries fan out across the
/// configured servers; random mode draws a fresh index per attempt.
pub struct UpstreamSelector {
    servers: Vec<SocketAddr>,
    mode: SelectionMode,
    rr: AtomicUsize,
}

impl UpstreamSelector {
    pub fn new(servers: Vec<SocketAddr>, mode: SelectionMode) -> Self {
        debug_assert!(!servers.is_empty());
        Self {
            servers,
            mode,
            rr: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &DnsConfig) -> Self {
        let servers = config
            .nameservers
            .iter()
            .map(|&ip| SocketAddr::new(IpAddr::V4(ip), config.upstream_port))
            .collect();
        Self::new(servers, config.selection_mode)
    }

    /// The server to use for the next attempt.
    pub fn next(&self) -> SocketAddr {
        let idx = match self.mode {
            SelectionMode::RoundRobin => self.rr.fetch_add(1, Ordering::Relaxed),
            SelectionMode::Random => rand::random::<u64>() as usize,
        };
        self.servers[idx % self.servers.len()]
    }
}

/// A client talking to the upstream resolvers. Each worker slot owns one;
/// the single IPv4 socket is created once and reused for every query the
/// slot handles.
pub struct DNSClient {
    socket: UdpSocket,
    selector: Arc<UpstreamSelector>,
    timeout: Duration,
    resend_attempts: u16,
}

impl DNSClient {
    pub async fn new(
        selector: Arc<UpstreamSelector>,
        timeout: Duration,
        resend_attempts: u16,
    ) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            socket,
            selector,
            timeout,
            resend_attempts,
        })
    }
}

#[async_trait]
impl DnsSource for DNSClient {
    /// Try to get an answer, selecting an upstream per attempt so a resend
    /// lands on a different server, up to `resend_attempts + 1` attempts.
    /// Replies whose transaction ID does not match the query are ignored for
    /// the rest of the attempt's window. Exhausting every attempt yields
    /// `Timeout`; a failed send is fatal for the whole call.
    async fn send_query(&mut self, query: &[u8], answer: &mut [u8]) -> Result<usize> {
        for attempt in 0..=self.resend_attempts {
            let server = self.selector.next();
            trace!("Attempt {}: sending {} bytes to {}", attempt + 1, query.len(), server);
            self.socket.send_to(query, server).await?;

            let deadline = Instant::now() + self.timeout;
            loop {
                let received = match timeout_at(deadline, self.socket.recv_from(answer)).await {
                    Err(_) => break, // attempt timed out
                    Ok(Err(e)) => {
                        debug!("Receive from {} failed: {}", server, e);
                        break;
                    }
                    Ok(Ok((n, _))) => n,
                };
                if received == 0 {
                    break;
                }
                if received >= 2 && query.len() >= 2 && answer[..2] == query[..2] {
                    return Ok(received);
                }
                trace!("Ignoring reply with unexpected transaction id from {}", server);
            }
        }
        Err(DnsError::Timeout)
    }
}

/// The set of upstream clients shared by the worker pool. One client is
/// checked out per in-flight datagram, so a client's socket never has more
/// than one outstanding query.
pub struct ClientPool {
    clients: Mutex<Vec<DNSClient>>,
    selector: Arc<UpstreamSelector>,
    timeout: Duration,
    resend_attempts: u16,
    max_clients: usize,
}

impl ClientPool {
    pub fn new(config: &DnsConfig, selector: Arc<UpstreamSelector>) -> Self {
        Self {
            clients: Mutex::new(Vec::with_capacity(config.num_threads)),
            selector,
            timeout: config.timeout,
            resend_attempts: config.resend_attempts,
            max_clients: config.num_threads,
        }
    }

    pub async fn checkout(&self) -> Result<DNSClient> {
        if let Some(client) = self.clients.lock().await.pop() {
            return Ok(client);
        }
        DNSClient::new(
            Arc::clone(&self.selector),
            self.timeout,
            self.resend_attempts,
        )
        .await
    }

    pub async fn put_back(&self, client: DNSClient) {
        let mut clients = self.clients.lock().await;
        if clients.len() < self.max_clients {
            clients.push(client);
        }
    }
}
