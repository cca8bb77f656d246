use super::enums::{DNSResourceClass, DNSResourceType};
use super::name::walk_name;
use super::ParseError;

/// View of one resource record. Like the question view, it locates the record
/// inside the single packet buffer and keeps decoded copies of the fixed
/// fields; rdata stays in place and is reached through the offsets.
#[derive(Clone, Copy, Debug)]
pub struct DNSResource {
    /// Offset of the record's name within the packet buffer.
    pub start: usize,
    /// Bytes the name occupies in situ.
    pub name_len: usize,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdlength: u16,
}

impl DNSResource {
    pub(super) fn parse(
        buf: &[u8],
        len: usize,
        start: usize,
        pointers: &mut Vec<usize>,
    ) -> Result<Self, ParseError> {
        let name_len = walk_name(buf, len, start, pointers)?;
        let fixed = start + name_len;
        // type(2) class(2) ttl(4) rdlength(2)
        if fixed + 10 > len {
            return Err(ParseError::InvalidAnswerSection);
        }
        let rtype = u16::from_be_bytes([buf[fixed], buf[fixed + 1]]).into();
        let rclass = u16::from_be_bytes([buf[fixed + 2], buf[fixed + 3]]).into();
        let ttl = u32::from_be_bytes([buf[fixed + 4], buf[fixed + 5], buf[fixed + 6], buf[fixed + 7]]);
        let rdlength = u16::from_be_bytes([buf[fixed + 8], buf[fixed + 9]]);
        if fixed + 10 + rdlength as usize > len {
            return Err(ParseError::InvalidAnswerSection);
        }
        Ok(DNSResource {
            start,
            name_len,
            rtype,
            rclass,
            ttl,
            rdlength,
        })
    }

    /// Offset of the two-byte type field.
    pub fn type_offset(&self) -> usize {
        self.start + self.name_len
    }

    /// Offset of the two-byte rdlength field.
    pub fn rdlength_offset(&self) -> usize {
        self.type_offset() + 8
    }

    /// Offset of the first rdata byte.
    pub fn rdata_offset(&self) -> usize {
        self.type_offset() + 10
    }

    /// Size of the whole record on the wire.
    pub fn wire_len(&self) -> usize {
        self.name_len + 10 + self.rdlength as usize
    }

    pub fn end(&self) -> usize {
        self.start + self.wire_len()
    }
}
