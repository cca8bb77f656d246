use tracing::debug;

use crate::dns::enums::{DNSOpcode, DNSResourceType};
use crate::dns::header::DNSHeader;
use crate::dns::DNSPacket;
use crate::error::{DnsError, Result};
use crate::synth::Dns64Prefix;
use crate::upstream::DnsSource;

/// Run one datagram through the DNS64 pipeline.
///
/// `query` is exactly the received datagram (and gets its qtype rewritten in
/// place when synthesis kicks in); `answer` is a buffer of the configured
/// maximum response length. Returns the number of answer bytes to send back,
/// or `None` when the datagram is dropped without a reply.
///
/// The synthesis rule: a AAAA question whose reply carries no AAAA record in
/// the answer section - whether that reply is NXDOMAIN or a NoError with an
/// empty answer count - is retried as an A question, and each A record of the
/// second reply is rewritten into a AAAA record with the address embedded in
/// the translation prefix. A reply that already has a AAAA record is
/// forwarded byte-for-byte.
pub async fn handle_query<S: DnsSource + ?Sized>(
    source: &mut S,
    prefix: &Dns64Prefix,
    query: &mut [u8],
    answer: &mut [u8],
) -> Result<Option<usize>> {
    let header = DNSHeader::parse(query).map_err(DnsError::MalformedPacket)?;
    if header.qr || DNSOpcode::from(header.opcode) != DNSOpcode::Query {
        return Ok(None);
    }

    let reply_len = source.send_query(query, answer).await?;

    let needs_synthesis = {
        let reply = DNSPacket::parse(answer, reply_len)?;
        reply.questions[0].qtype == DNSResourceType::AAAA
            && !reply.has_answer_of_type(DNSResourceType::AAAA)
    };
    if !needs_synthesis {
        return Ok(Some(reply_len));
    }

    debug!("Empty AAAA answer, retrying the query as A");
    {
        let query_len = query.len();
        let mut question = DNSPacket::parse(query, query_len)?;
        question.set_question_qtype(DNSResourceType::A);
    }

    let reply_len = source.send_query(query, answer).await?;
    let mut reply = DNSPacket::parse(answer, reply_len)?;
    reply.set_question_qtype(DNSResourceType::AAAA);

    for idx in 0..reply.answers.len() {
        if reply.answers[idx].rtype != DNSResourceType::A {
            continue;
        }
        let v4: [u8; 4] = reply
            .answer_rdata(idx)?
            .try_into()
            .map_err(|_| DnsError::MalformedPacket(crate::dns::ParseError::InvalidAnswerSection))?;
        let v6 = prefix.embed(v4);
        reply.rewrite_answer(idx, DNSResourceType::AAAA, &v6)?;
    }

    Ok(Some(reply.len()))
}
