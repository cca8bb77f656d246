use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::DnsConfig;
use crate::error::{DnsError, Result};
use crate::handler::handle_query;
use crate::pool::{BufferPool, PooledBuffer};
use crate::upstream::{ClientPool, UpstreamSelector};

/// How long shutdown waits for in-flight handlers before giving up on them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The DNS64 resolver: one IPv6 listener socket feeding a pool of
/// `num_threads` worker slots. Each datagram is handled by a task holding
/// one worker permit and one upstream client for its whole lifetime, so at
/// most `num_threads` datagrams are in flight and each upstream socket has a
/// single outstanding query.
pub struct Server {
    socket: Arc<UdpSocket>,
    config: Arc<DnsConfig>,
    clients: Arc<ClientPool>,
    buffers: BufferPool,
    workers: Arc<Semaphore>,
    stopped: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the listener and set up the worker pool. Socket errors here are
    /// fatal startup errors.
    pub async fn new(config: DnsConfig) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(("::", config.port)).await?;
        info!("Listening on [::]:{}", config.port);

        let selector = Arc::new(UpstreamSelector::from_config(&config));
        let clients = Arc::new(ClientPool::new(&config, selector));
        let buffers = BufferPool::new(config.response_maxlength, config.num_threads * 2 + 1);
        let workers = Arc::new(Semaphore::new(config.num_threads));
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Arc::new(Self {
            socket: Arc::new(socket),
            config: Arc::new(config),
            clients,
            buffers,
            workers,
            stopped: AtomicBool::new(false),
            shutdown_tx,
        }))
    }

    /// Request a cooperative stop: flip the flag and wake the accept loop.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Accept datagrams until a stop is requested, then wait for in-flight
    /// handlers to finish.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        while !self.is_stopped() {
            let mut buf = self.buffers.get();
            let (len, sender) = tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("recvfrom() failure: {}", e);
                        continue;
                    }
                },
                _ = shutdown_rx.recv() => break,
            };

            if self.config.debug {
                info!("Received packet from {}, length {}", sender, len);
            } else {
                debug!("Received packet from {}, length {}", sender, len);
            }

            // The worker pool is full when no permit is free; newest
            // datagrams are dropped under overload.
            let permit = match Arc::clone(&self.workers).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Worker pool saturated, dropping query from {}", sender);
                    continue;
                }
            };

            let server = Arc::clone(&self);
            tokio::spawn(async move {
                let _permit = permit;
                server.handle_datagram(buf, len, sender).await;
            });
        }

        self.drain().await;
        info!("Server stopped");
        Ok(())
    }

    async fn handle_datagram(&self, mut buf: PooledBuffer, len: usize, sender: SocketAddr) {
        let mut client = match self.clients.checkout().await {
            Ok(client) => client,
            Err(e) => {
                error!("Cannot create upstream client socket: {}", e);
                return;
            }
        };
        let mut answer = self.buffers.get();

        let outcome = handle_query(
            &mut client,
            &self.config.prefix,
            &mut buf[..len],
            &mut answer,
        )
        .await;
        self.clients.put_back(client).await;

        match outcome {
            Ok(Some(n)) => {
                if let Err(e) = self.socket.send_to(&answer[..n], sender).await {
                    error!("Cannot send response to {}: {}", sender, e);
                }
            }
            Ok(None) => debug!("Ignoring non-query packet from {}", sender),
            Err(DnsError::Timeout) => {
                info!("Didn't receive answer from the nameservers for {}", sender)
            }
            Err(DnsError::ResponseTooLarge { need, have }) => warn!(
                "Dropping response to {}: rewritten packet needs {} bytes, buffer holds {}",
                sender, need, have
            ),
            Err(e) => warn!("Dropping query from {}: {}", sender, e),
        }
    }

    /// Wait until every worker permit is back, bounded by the grace period.
    async fn drain(&self) {
        let permits = self.config.num_threads as u32;
        if permits == 0 {
            return;
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, self.workers.acquire_many(permits)).await {
            Ok(Ok(_)) => debug!("All workers idle"),
            Ok(Err(_)) => {}
            Err(_) => warn!("Shutdown grace period expired with handlers still in flight"),
        }
    }
}
