pub mod enums;
pub mod header;
pub mod name;
pub mod question;
pub mod resource;

use enums::DNSResourceType;
use header::DNSHeader;
use question::DNSQuestion;
use resource::DNSResource;

pub const HEADER_LEN: usize = 12;

/// The classical DNS-over-UDP payload limit. Larger replies are a
/// configuration concern (`response-maxlength`), not a protocol one.
pub const MAX_PACKET_LEN: usize = 512;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidHeader,
    InvalidLabel,
    InvalidQuestionSection,
    InvalidAnswerSection,
    BufferTooSmall { need: usize, have: usize },
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidHeader => write!(f, "Invalid DNS header"),
            ParseError::InvalidLabel => write!(f, "Invalid DNS label"),
            ParseError::InvalidQuestionSection => write!(f, "Invalid question section"),
            ParseError::InvalidAnswerSection => write!(f, "Invalid resource record section"),
            ParseError::BufferTooSmall { need, have } => {
                write!(f, "Buffer too small: need {} bytes, have {}", need, have)
            }
            ParseError::InvalidBitStream(e) => write!(f, "Invalid bit stream: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

/// A parsed DNS packet: one mutable byte buffer plus offset views over it.
/// The buffer slice is the full working capacity; the packet proper occupies
/// the first `len` bytes. Nothing is copied out of the buffer on the
/// pass-through path, and the two supported in-place edits (question qtype
/// rewrite, answer rdata splice) keep every recorded offset valid.
#[derive(Debug)]
pub struct DNSPacket<'a> {
    buf: &'a mut [u8],
    len: usize,
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authority: Vec<DNSResource>,
    pub additional: Vec<DNSResource>,
    /// Offsets of every compression pointer met while walking names, kept so
    /// a resize can relocate both the pointers and their targets.
    pointers: Vec<usize>,
}

impl<'a> DNSPacket<'a> {
    /// Parse `buf[..len]`; the rest of `buf` is spare capacity for in-place
    /// growth. Rejects packets with a short header, zero questions, or any
    /// section that would read past `len`.
    pub fn parse(buf: &'a mut [u8], len: usize) -> Result<Self, ParseError> {
        if len < HEADER_LEN || len > buf.len() {
            return Err(ParseError::InvalidHeader);
        }
        let header = DNSHeader::parse(&buf[..len])?;
        if header.qdcount == 0 {
            return Err(ParseError::InvalidQuestionSection);
        }

        let mut pointers = Vec::new();
        let mut offset = HEADER_LEN;

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            let q = DNSQuestion::parse(buf, len, offset, &mut pointers)?;
            offset = q.end();
            questions.push(q);
        }

        let parse_records = |count: u16,
                                 offset: &mut usize,
                                 pointers: &mut Vec<usize>|
         -> Result<Vec<DNSResource>, ParseError> {
            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let r = DNSResource::parse(buf, len, *offset, pointers)?;
                *offset = r.end();
                records.push(r);
            }
            Ok(records)
        };

        let answers = parse_records(header.ancount, &mut offset, &mut pointers)?;
        let authority = parse_records(header.nscount, &mut offset, &mut pointers)?;
        let additional = parse_records(header.arcount, &mut offset, &mut pointers)?;

        Ok(DNSPacket {
            buf,
            len,
            header,
            questions,
            answers,
            authority,
            additional,
            pointers,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Decode the name of question `idx` into dotted form.
    pub fn question_name(&self, idx: usize) -> Result<String, ParseError> {
        let q = self
            .questions
            .get(idx)
            .ok_or(ParseError::InvalidQuestionSection)?;
        name::decode_name(self.buf, self.len, q.start)
    }

    /// The rdata slice of answer record `idx`.
    pub fn answer_rdata(&self, idx: usize) -> Result<&[u8], ParseError> {
        let r = self.answers.get(idx).ok_or(ParseError::InvalidAnswerSection)?;
        Ok(&self.buf[r.rdata_offset()..r.rdata_offset() + r.rdlength as usize])
    }

    /// Whether the answer section carries at least one record of `rtype`.
    pub fn has_answer_of_type(&self, rtype: DNSResourceType) -> bool {
        self.answers.iter().any(|r| r.rtype == rtype)
    }

    /// Overwrite the qtype of the first question in place.
    pub fn set_question_qtype(&mut self, qtype: DNSResourceType) {
        let q = &mut self.questions[0];
        let off = q.qtype_offset();
        self.buf[off..off + 2].copy_from_slice(&u16::from(qtype).to_be_bytes());
        q.qtype = qtype;
    }

    /// Replace answer record `idx` with a record of `rtype` carrying
    /// `rdata`, shifting the packet tail and fixing every recorded offset.
    /// The record's name, class and TTL are untouched. Fails with
    /// `BufferTooSmall` when the grown packet would not fit the buffer.
    pub fn rewrite_answer(
        &mut self,
        idx: usize,
        rtype: DNSResourceType,
        rdata: &[u8],
    ) -> Result<(), ParseError> {
        let record = *self.answers.get(idx).ok_or(ParseError::InvalidAnswerSection)?;
        self.resize(record.rdata_offset(), record.rdlength as usize, rdata.len())?;

        let record = &mut self.answers[idx];
        record.rtype = rtype;
        record.rdlength = rdata.len() as u16;

        let type_off = record.type_offset();
        let rdlength_off = record.rdlength_offset();
        let rdata_off = record.rdata_offset();
        self.buf[type_off..type_off + 2].copy_from_slice(&u16::from(rtype).to_be_bytes());
        self.buf[rdlength_off..rdlength_off + 2]
            .copy_from_slice(&(rdata.len() as u16).to_be_bytes());
        self.buf[rdata_off..rdata_off + rdata.len()].copy_from_slice(rdata);
        Ok(())
    }

    /// Grow or shrink a `oldsize`-byte field at `at` to `newsize` bytes:
    /// move the tail, then shift every offset view and every compression
    /// pointer (position and target alike) that sits past the field start.
    fn resize(&mut self, at: usize, oldsize: usize, newsize: usize) -> Result<(), ParseError> {
        if newsize > oldsize {
            let need = self.len + (newsize - oldsize);
            if need > self.buf.len() {
                return Err(ParseError::BufferTooSmall {
                    need,
                    have: self.buf.len(),
                });
            }
        }
        let delta = newsize as isize - oldsize as isize;
        let tail = at + oldsize;
        self.buf.copy_within(tail..self.len, (tail as isize + delta) as usize);
        self.len = (self.len as isize + delta) as usize;

        let shift = |off: usize| -> usize {
            if off > at {
                (off as isize + delta) as usize
            } else {
                off
            }
        };
        for q in &mut self.questions {
            q.start = shift(q.start);
        }
        for r in self
            .answers
            .iter_mut()
            .chain(self.authority.iter_mut())
            .chain(self.additional.iter_mut())
        {
            r.start = shift(r.start);
        }
        for p in &mut self.pointers {
            *p = shift(*p);
            let pos = *p;
            let target =
                u16::from_be_bytes([self.buf[pos] & 0x3F, self.buf[pos + 1]]) as usize;
            if target > at {
                let moved = 0xC000 | (target as isize + delta) as u16;
                self.buf[pos..pos + 2].copy_from_slice(&moved.to_be_bytes());
            }
        }
        Ok(())
    }
}
