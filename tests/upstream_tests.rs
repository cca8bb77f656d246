mod common;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bifrost::config::SelectionMode;
use bifrost::error::DnsError;
use bifrost::upstream::{DNSClient, DnsSource, UpstreamSelector};
use common::*;
use tokio::net::UdpSocket;

fn fake_addrs(n: usize) -> Vec<SocketAddr> {
    (0..n)
        .map(|i| format!("192.0.2.{}:53", i + 1).parse().unwrap())
        .collect()
}

#[test]
fn round_robin_visits_every_server_equally() {
    let n = 3;
    let k = 7;
    let selector = UpstreamSelector::new(fake_addrs(n), SelectionMode::RoundRobin);

    let mut counts: HashMap<SocketAddr, usize> = HashMap::new();
    for _ in 0..k * n {
        *counts.entry(selector.next()).or_default() += 1;
    }
    assert_eq!(counts.len(), n);
    for (_, count) in counts {
        assert_eq!(count, k);
    }
}

#[test]
fn random_selection_stays_in_range() {
    let selector = UpstreamSelector::new(fake_addrs(4), SelectionMode::Random);
    let servers: Vec<SocketAddr> = fake_addrs(4);
    for _ in 0..100 {
        assert!(servers.contains(&selector.next()));
    }
}

#[tokio::test]
async fn silent_upstream_gets_exactly_resend_attempts_plus_one_sends() {
    let mock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = mock.local_addr().unwrap();

    // Count the datagrams that arrive; never answer any of them.
    let counter = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let mut received = 0usize;
        while let Ok(Ok(_)) =
            tokio::time::timeout(Duration::from_millis(500), mock.recv_from(&mut buf)).await
        {
            received += 1;
        }
        received
    });

    let selector = Arc::new(UpstreamSelector::new(vec![addr], SelectionMode::RoundRobin));
    let mut client = DNSClient::new(selector, Duration::from_millis(50), 2)
        .await
        .unwrap();

    let query = build_query(0x0707, "www.example.com.", QTYPE_AAAA);
    let mut answer = [0u8; 512];
    let outcome = client.send_query(&query, &mut answer).await;
    assert!(matches!(outcome, Err(DnsError::Timeout)));

    assert_eq!(counter.await.unwrap(), 3);
}

#[tokio::test]
async fn resends_try_other_servers() {
    // Two upstreams under round-robin; the first never answers, the second
    // does. The second attempt must reach the second server.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let answering = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap();
    let answering_addr = answering.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        if let Ok((n, from)) = answering.recv_from(&mut buf).await {
            let mut reply = buf[..n].to_vec();
            reply[2] |= 0x80; // mark as response
            let _ = answering.send_to(&reply, from).await;
        }
        // Keep the silent socket alive so nothing answers on it.
        let _ = silent;
    });

    let selector = Arc::new(UpstreamSelector::new(
        vec![silent_addr, answering_addr],
        SelectionMode::RoundRobin,
    ));
    let mut client = DNSClient::new(selector, Duration::from_millis(100), 2)
        .await
        .unwrap();

    let query = build_query(0x0901, "www.example.com.", QTYPE_A);
    let mut answer = [0u8; 512];
    let n = client.send_query(&query, &mut answer).await.unwrap();
    assert_eq!(&answer[..2], &query[..2]);
    assert!(n >= 12);
}

#[tokio::test]
async fn replies_with_wrong_transaction_id_are_ignored() {
    let mock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = mock.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        if let Ok((n, from)) = mock.recv_from(&mut buf).await {
            // First a reply with a mangled ID, then the real one.
            let mut bogus = buf[..n].to_vec();
            bogus[0] ^= 0xFF;
            bogus[2] |= 0x80;
            let _ = mock.send_to(&bogus, from).await;
            let mut real = buf[..n].to_vec();
            real[2] |= 0x80;
            let _ = mock.send_to(&real, from).await;
        }
    });

    let selector = Arc::new(UpstreamSelector::new(vec![addr], SelectionMode::RoundRobin));
    let mut client = DNSClient::new(selector, Duration::from_millis(500), 0)
        .await
        .unwrap();

    let query = build_query(0x1234, "www.example.com.", QTYPE_A);
    let mut answer = [0u8; 512];
    let n = client.send_query(&query, &mut answer).await.unwrap();
    assert_eq!(&answer[..2], &query[..2]);
    assert!(n >= 12);
}
