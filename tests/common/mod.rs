#![allow(dead_code)]

use async_trait::async_trait;
use bifrost::dns::name::encode_name;
use bifrost::error::{DnsError, Result};
use bifrost::upstream::DnsSource;

pub const QTYPE_A: u16 = 1;
pub const QTYPE_AAAA: u16 = 28;

pub const FLAGS_QUERY_RD: u16 = 0x0100;
pub const FLAGS_RESPONSE: u16 = 0x8180;
pub const FLAGS_RESPONSE_NXDOMAIN: u16 = 0x8183;

/// A resource record for `build_message`: type, ttl, rdata. The record name
/// is the usual 0xC00C pointer back to the question.
pub type TestRecord = (u16, u32, Vec<u8>);

/// Assemble a single-question DNS message with optional answer records.
pub fn build_message(id: u16, flags: u16, name: &str, qtype: u16, answers: &[TestRecord]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    encode_name(name, &mut buf).expect("test name encodes");
    buf.extend_from_slice(&qtype.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    for (rtype, ttl, rdata) in answers {
        buf.extend_from_slice(&0xC00Cu16.to_be_bytes());
        buf.extend_from_slice(&rtype.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&ttl.to_be_bytes());
        buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(rdata);
    }
    buf
}

pub fn build_query(id: u16, name: &str, qtype: u16) -> Vec<u8> {
    build_message(id, FLAGS_QUERY_RD, name, qtype, &[])
}

/// The qtype of a single-question message, read off the wire.
pub fn query_qtype(buf: &[u8]) -> u16 {
    let mut off = 12;
    while buf[off] != 0 {
        off += 1 + buf[off] as usize;
    }
    u16::from_be_bytes([buf[off + 1], buf[off + 2]])
}

/// An upstream scripted in advance: hands out canned replies in order and
/// records every query it was asked.
pub struct ScriptedSource {
    pub replies: Vec<Vec<u8>>,
    pub queries: Vec<Vec<u8>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Vec<u8>>) -> Self {
        Self {
            replies,
            queries: Vec::new(),
        }
    }
}

#[async_trait]
impl DnsSource for ScriptedSource {
    async fn send_query(&mut self, query: &[u8], answer: &mut [u8]) -> Result<usize> {
        self.queries.push(query.to_vec());
        if self.replies.is_empty() {
            return Err(DnsError::Timeout);
        }
        let reply = self.replies.remove(0);
        answer[..reply.len()].copy_from_slice(&reply);
        Ok(reply.len())
    }
}
