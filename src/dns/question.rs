use super::enums::{DNSResourceClass, DNSResourceType};
use super::name::walk_name;
use super::ParseError;

/// View of one question entry. The name and fixed fields stay in the packet
/// buffer; this records where they are plus decoded copies of the two
/// fixed fields.
#[derive(Clone, Copy, Debug)]
pub struct DNSQuestion {
    /// Offset of the question's name within the packet buffer.
    pub start: usize,
    /// Bytes the name occupies in situ (compression pointer included).
    pub name_len: usize,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    pub(super) fn parse(
        buf: &[u8],
        len: usize,
        start: usize,
        pointers: &mut Vec<usize>,
    ) -> Result<Self, ParseError> {
        let name_len = walk_name(buf, len, start, pointers)?;
        let fixed = start + name_len;
        if fixed + 4 > len {
            return Err(ParseError::InvalidQuestionSection);
        }
        let qtype = u16::from_be_bytes([buf[fixed], buf[fixed + 1]]).into();
        let qclass = u16::from_be_bytes([buf[fixed + 2], buf[fixed + 3]]).into();
        Ok(DNSQuestion {
            start,
            name_len,
            qtype,
            qclass,
        })
    }

    /// Offset of the two-byte qtype field.
    pub fn qtype_offset(&self) -> usize {
        self.start + self.name_len
    }

    /// Size of the whole question entry on the wire.
    pub fn wire_len(&self) -> usize {
        self.name_len + 4
    }

    pub fn end(&self) -> usize {
        self.start + self.wire_len()
    }
}
