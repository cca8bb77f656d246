use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{ParseError, HEADER_LEN};

/// The fixed 12-byte DNS message header, RFC 1035 §4.1.1. Reading and writing
/// through the bit-level codec round-trips exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DNSHeader {
    pub fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        writer.write::<u16>(16, self.id)?;
        writer.write::<u8>(1, self.qr as u8)?;
        writer.write::<u8>(4, self.opcode)?;
        writer.write::<u8>(1, self.aa as u8)?;
        writer.write::<u8>(1, self.tc as u8)?;
        writer.write::<u8>(1, self.rd as u8)?;
        writer.write::<u8>(1, self.ra as u8)?;
        writer.write::<u8>(3, self.z)?;
        writer.write::<u8>(4, self.rcode)?;
        writer.write::<u16>(16, self.qdcount)?;
        writer.write::<u16>(16, self.ancount)?;
        writer.write::<u16>(16, self.nscount)?;
        writer.write::<u16>(16, self.arcount)?;
        Ok(())
    }

    pub fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        self.id = reader.read::<u16>(16)?;
        self.qr = reader.read::<u8>(1)? == 1;
        self.opcode = reader.read::<u8>(4)?;
        self.aa = reader.read::<u8>(1)? == 1;
        self.tc = reader.read::<u8>(1)? == 1;
        self.rd = reader.read::<u8>(1)? == 1;
        self.ra = reader.read::<u8>(1)? == 1;
        self.z = reader.read::<u8>(3)?;
        self.rcode = reader.read::<u8>(4)?;
        self.qdcount = reader.read::<u16>(16)?;
        self.ancount = reader.read::<u16>(16)?;
        self.nscount = reader.read::<u16>(16)?;
        self.arcount = reader.read::<u16>(16)?;
        Ok(())
    }

    /// Decode the header from the first 12 bytes of a packet buffer.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() < HEADER_LEN {
            return Err(ParseError::InvalidHeader);
        }
        let mut reader = BitReader::<_, BigEndian>::new(&buf[..HEADER_LEN]);
        let mut header = DNSHeader::default();
        header.read(&mut reader)?;
        Ok(header)
    }

    /// Encode the header into its 12-byte wire form.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN], ParseError> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);
        self.write(&mut writer)?;
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(&buf);
        Ok(out)
    }
}
