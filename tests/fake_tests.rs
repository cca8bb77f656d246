mod common;

use std::sync::Arc;
use std::time::Duration;

use bifrost::config::{AaaaMode, FakeConfig};
use bifrost::dns::enums::{DNSResourceClass, DNSResourceType};
use bifrost::dns::DNSPacket;
use bifrost::fake::{build_response, parse_target, FakeServer};
use bifrost::synth::Dns64Prefix;
use common::*;
use tokio::net::UdpSocket;

fn well_known_prefix() -> Dns64Prefix {
    "64:ff9b::/96".parse().unwrap()
}

#[test]
fn parses_load_test_names() {
    assert_eq!(
        parse_target("192-0-2-33.dns64perf.test."),
        Some([192, 0, 2, 33])
    );
    assert_eq!(parse_target("0-0-0-0.dns64perf.test."), Some([0, 0, 0, 0]));
    assert_eq!(
        parse_target("255-255-255-255.dns64perf.test."),
        Some([255, 255, 255, 255])
    );

    assert_eq!(parse_target("foo.example."), None);
    assert_eq!(parse_target("1-2-3.dns64perf.test."), None);
    assert_eq!(parse_target("1-2-3-4-5.dns64perf.test."), None);
    assert_eq!(parse_target("1-2-3-256.dns64perf.test."), None);
    assert_eq!(parse_target("1-2-3-4.dns64perf.test.example."), None);
    assert_eq!(parse_target("1-2-3-4.other.zone."), None);
    assert_eq!(parse_target("."), None);
}

#[test]
fn answers_a_questions_with_the_embedded_octets() {
    let mut query = build_query(0x0BAD, "192-0-2-33.dns64perf.test.", QTYPE_A);
    let mut out = [0u8; 512];
    let n = build_response(&mut query, AaaaMode::Yes, &well_known_prefix(), &mut out)
        .unwrap()
        .expect("expected an answer");

    let packet = DNSPacket::parse(&mut out, n).unwrap();
    assert_eq!(packet.header.id, 0x0BAD);
    assert!(packet.header.qr);
    assert!(packet.header.rd);
    assert!(!packet.header.aa);
    assert!(!packet.header.ra);
    assert_eq!(packet.header.rcode, 0);
    assert_eq!(packet.header.ancount, 1);
    assert_eq!(packet.question_name(0).unwrap(), "192-0-2-33.dns64perf.test.");

    let answer = packet.answers[0];
    assert_eq!(answer.rtype, DNSResourceType::A);
    assert_eq!(answer.rclass, DNSResourceClass::IN);
    assert_eq!(answer.ttl, 0);
    assert_eq!(packet.answer_rdata(0).unwrap(), &[192, 0, 2, 33]);
    // The answer names the question through the standard pointer.
    assert_eq!(&out[answer.start..answer.start + 2], &[0xC0, 0x0C]);
}

#[test]
fn answers_aaaa_questions_when_enabled() {
    let mut query = build_query(0x0E0E, "192-0-2-33.dns64perf.test.", QTYPE_AAAA);
    let mut out = [0u8; 512];
    let n = build_response(&mut query, AaaaMode::Yes, &well_known_prefix(), &mut out)
        .unwrap()
        .expect("expected an answer");

    let packet = DNSPacket::parse(&mut out, n).unwrap();
    assert_eq!(packet.answers.len(), 1);
    assert_eq!(packet.answers[0].rtype, DNSResourceType::AAAA);
    let expected: [u8; 16] = "64:ff9b::c000:221"
        .parse::<std::net::Ipv6Addr>()
        .unwrap()
        .octets();
    assert_eq!(packet.answer_rdata(0).unwrap(), &expected);
}

#[test]
fn aaaa_questions_get_an_empty_noerror_when_disabled() {
    let mut query = build_query(0x0F0F, "192-0-2-33.dns64perf.test.", QTYPE_AAAA);
    let mut out = [0u8; 512];
    let n = build_response(&mut query, AaaaMode::No, &well_known_prefix(), &mut out)
        .unwrap()
        .expect("expected an answer");

    let packet = DNSPacket::parse(&mut out, n).unwrap();
    assert_eq!(packet.header.rcode, 0);
    assert_eq!(packet.header.ancount, 0);
    assert!(packet.answers.is_empty());

    // A questions still get their record.
    let mut query = build_query(0x0F10, "192-0-2-33.dns64perf.test.", QTYPE_A);
    let n = build_response(&mut query, AaaaMode::No, &well_known_prefix(), &mut out)
        .unwrap()
        .expect("expected an answer");
    let packet = DNSPacket::parse(&mut out, n).unwrap();
    assert_eq!(packet.header.ancount, 1);
    assert_eq!(packet.answer_rdata(0).unwrap(), &[192, 0, 2, 33]);
}

#[test]
fn certain_probability_always_answers() {
    let mut out = [0u8; 512];
    for id in 0..32 {
        let mut query = build_query(id, "10-0-0-1.dns64perf.test.", QTYPE_AAAA);
        let n = build_response(
            &mut query,
            AaaaMode::Probability(1.0),
            &well_known_prefix(),
            &mut out,
        )
        .unwrap()
        .expect("expected an answer");
        let packet = DNSPacket::parse(&mut out, n).unwrap();
        assert_eq!(packet.header.ancount, 1);
    }
}

#[test]
fn other_qtypes_get_an_empty_noerror() {
    let mut query = build_query(0x1111, "192-0-2-33.dns64perf.test.", 16); // TXT
    let mut out = [0u8; 512];
    let n = build_response(&mut query, AaaaMode::Yes, &well_known_prefix(), &mut out)
        .unwrap()
        .expect("expected an answer");
    let packet = DNSPacket::parse(&mut out, n).unwrap();
    assert_eq!(packet.header.rcode, 0);
    assert_eq!(packet.header.ancount, 0);
}

#[test]
fn unparsable_names_are_dropped() {
    let mut query = build_query(0x2222, "foo.example.", QTYPE_AAAA);
    let mut out = [0u8; 512];
    let outcome = build_response(&mut query, AaaaMode::Yes, &well_known_prefix(), &mut out)
        .unwrap();
    assert!(outcome.is_none());
}

#[test]
fn non_queries_are_dropped() {
    let mut response = build_message(
        0x3333,
        FLAGS_RESPONSE,
        "192-0-2-33.dns64perf.test.",
        QTYPE_A,
        &[],
    );
    let mut out = [0u8; 512];
    let outcome = build_response(
        &mut response,
        AaaaMode::Yes,
        &well_known_prefix(),
        &mut out,
    )
    .unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn serves_queries_over_the_wire_and_stops() {
    let port = {
        let probe = UdpSocket::bind("[::1]:0").await.unwrap();
        probe.local_addr().unwrap().port()
    };
    let config = FakeConfig {
        port,
        num_threads: 2,
        aaaa_mode: AaaaMode::Yes,
        prefix: well_known_prefix(),
        debug: false,
    };

    let server = FakeServer::new(config);
    let run = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = UdpSocket::bind("[::1]:0").await.unwrap();
    let query = build_query(0x4242, "192-0-2-33.dns64perf.test.", QTYPE_AAAA);
    client.send_to(&query, ("::1", port)).await.unwrap();

    let mut buf = [0u8; 512];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .expect("no reply within two seconds")
        .unwrap();
    let packet = DNSPacket::parse(&mut buf, n).unwrap();
    assert_eq!(packet.header.id, 0x4242);
    assert_eq!(packet.header.ancount, 1);
    assert_eq!(packet.answers[0].rtype, DNSResourceType::AAAA);

    server.stop();
    tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("fake server did not stop in time")
        .unwrap()
        .unwrap();
}
