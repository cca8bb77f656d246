use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use socket2::{Domain, Protocol, Type};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::{AaaaMode, FakeConfig};
use crate::dns::enums::{DNSOpcode, DNSRcode, DNSResourceClass, DNSResourceType};
use crate::dns::header::DNSHeader;
use crate::dns::{DNSPacket, HEADER_LEN, MAX_PACKET_LEN};
use crate::error::{DnsError, Result};
use crate::synth::Dns64Prefix;

/// Extract the IPv4 address from a load-test name of the exact form
/// `A-B-C-D.dns64perf.test.` with four decimal octets.
pub fn parse_target(name: &str) -> Option<[u8; 4]> {
    let name = name.strip_suffix('.').unwrap_or(name);
    let mut labels = name.split('.');
    let octets = labels.next()?;
    if labels.next()? != "dns64perf" || labels.next()? != "test" || labels.next().is_some() {
        return None;
    }

    let mut v4 = [0u8; 4];
    let mut parts = octets.split('-');
    for slot in &mut v4 {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(v4)
}

fn wants_aaaa(mode: AaaaMode) -> bool {
    match mode {
        AaaaMode::Yes => true,
        AaaaMode::No => false,
        AaaaMode::Probability(p) => rand::random::<f64>() <= p,
    }
}

/// Answer one query authoritatively. The response is assembled from scratch:
/// the query's ID and question are copied over, and the answer record (when
/// there is one) names the question through the usual `0xC00C` compression
/// pointer. A records carry the four octets from the name; AAAA records
/// carry the prefix-embedded address, subject to the `have-AAAA` mode; every
/// other qtype gets a NOERROR with an empty answer section. Returns `None`
/// for packets that are not standard queries or whose name does not match
/// the load-test pattern.
pub fn build_response(
    query: &mut [u8],
    mode: AaaaMode,
    prefix: &Dns64Prefix,
    out: &mut [u8],
) -> Result<Option<usize>> {
    let header = DNSHeader::parse(query).map_err(DnsError::MalformedPacket)?;
    if header.qr || DNSOpcode::from(header.opcode) != DNSOpcode::Query {
        return Ok(None);
    }

    let query_len = query.len();
    let (name, question) = {
        let packet = DNSPacket::parse(query, query_len)?;
        (packet.question_name(0)?, packet.questions[0])
    };

    let Some(v4) = parse_target(&name) else {
        info!("Received unparsable query: {}", name);
        return Ok(None);
    };

    let answer_rdata: Option<(DNSResourceType, Vec<u8>)> = match question.qtype {
        DNSResourceType::A => Some((DNSResourceType::A, v4.to_vec())),
        DNSResourceType::AAAA if wants_aaaa(mode) => {
            Some((DNSResourceType::AAAA, prefix.embed(v4).to_vec()))
        }
        _ => None,
    };

    let response_header = DNSHeader {
        id: header.id,
        qr: true,
        opcode: DNSOpcode::Query.into(),
        rd: true,
        rcode: DNSRcode::NoError.into(),
        qdcount: 1,
        ancount: if answer_rdata.is_some() { 1 } else { 0 },
        ..DNSHeader::default()
    };

    let needed = HEADER_LEN
        + question.wire_len()
        + answer_rdata.as_ref().map_or(0, |(_, data)| 12 + data.len());
    if needed > out.len() {
        return Err(DnsError::ResponseTooLarge {
            need: needed,
            have: out.len(),
        });
    }

    out[..HEADER_LEN]
        .copy_from_slice(&response_header.to_bytes().map_err(DnsError::MalformedPacket)?);
    let mut off = HEADER_LEN;

    out[off..off + question.wire_len()]
        .copy_from_slice(&query[question.start..question.end()]);
    off += question.wire_len();

    if let Some((rtype, data)) = answer_rdata {
        out[off..off + 2].copy_from_slice(&(0xC000u16 | question.start as u16).to_be_bytes());
        off += 2;
        out[off..off + 2].copy_from_slice(&u16::from(rtype).to_be_bytes());
        off += 2;
        out[off..off + 2].copy_from_slice(&u16::from(DNSResourceClass::IN).to_be_bytes());
        off += 2;
        out[off..off + 4].copy_from_slice(&0u32.to_be_bytes());
        off += 4;
        out[off..off + 2].copy_from_slice(&(data.len() as u16).to_be_bytes());
        off += 2;
        out[off..off + data.len()].copy_from_slice(&data);
        off += data.len();
    }

    Ok(Some(off))
}

/// The load-test authoritative server: `num_threads` workers, each owning
/// its own socket bound to the same port with address and port reuse so the
/// kernel spreads the datagrams across them. No shared queue.
pub struct FakeServer {
    config: Arc<FakeConfig>,
    stopped: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl FakeServer {
    pub fn new(config: FakeConfig) -> Arc<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            config: Arc::new(config),
            stopped: AtomicBool::new(false),
            shutdown_tx,
        })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub async fn run(self: Arc<Self>) -> Result<()> {
        let mut workers = Vec::with_capacity(self.config.num_threads);
        for worker in 0..self.config.num_threads {
            let socket = UdpSocket::from_std(worker_socket(self.config.port)?)?;
            let server = Arc::clone(&self);
            workers.push(tokio::spawn(async move {
                server.worker_loop(worker, socket).await;
            }));
        }
        info!(
            "fakeDNS listening on [::]:{} with {} workers",
            self.config.port, self.config.num_threads
        );
        for worker in workers {
            let _ = worker.await;
        }
        info!("fakeDNS stopped");
        Ok(())
    }

    async fn worker_loop(&self, worker: usize, socket: UdpSocket) {
        let mut buf = vec![0u8; MAX_PACKET_LEN];
        let mut out = vec![0u8; MAX_PACKET_LEN];
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        while !self.is_stopped() {
            let (len, sender) = tokio::select! {
                received = socket.recv_from(&mut buf) => match received {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("recvfrom() failure on worker {}: {}", worker, e);
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

            match build_response(
                &mut buf[..len],
                self.config.aaaa_mode,
                &self.config.prefix,
                &mut out,
            ) {
                Ok(Some(n)) => {
                    if let Err(e) = socket.send_to(&out[..n], sender).await {
                        error!("Can't send response to {}: {}", sender, e);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping query from {}: {}", sender, e),
            }
        }
    }
}

/// One worker's listening socket: IPv6 dual-stack, address and port reuse so
/// every worker can bind the same port.
fn worker_socket(port: u16) -> std::io::Result<std::net::UdpSocket> {
    let socket = socket2::Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_only_v6(false)?;
    socket.set_reuse_address(true)?;
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
