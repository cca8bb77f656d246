use super::ParseError;

/// Upper bound on compression-pointer jumps while decoding one name. Real
/// names stay far below this; anything deeper is a crafted packet.
pub const MAX_POINTER_JUMPS: usize = 16;

const POINTER_MASK: u8 = 0xC0;

/// Measure how many bytes a name occupies in situ, without following
/// compression pointers. A pointer terminates the name and counts as two
/// bytes; a zero length byte terminates it and counts as one. Every pointer
/// position encountered is recorded so that a later in-place resize can fix
/// the stored offsets up.
pub fn walk_name(
    buf: &[u8],
    len: usize,
    start: usize,
    pointers: &mut Vec<usize>,
) -> Result<usize, ParseError> {
    let mut off = start;
    loop {
        if off >= len {
            return Err(ParseError::InvalidLabel);
        }
        let b = buf[off];
        if b == 0 {
            return Ok(off + 1 - start);
        }
        if b & POINTER_MASK == POINTER_MASK {
            if off + 1 >= len {
                return Err(ParseError::InvalidLabel);
            }
            pointers.push(off);
            return Ok(off + 2 - start);
        }
        if b > 63 {
            return Err(ParseError::InvalidLabel);
        }
        off += 1 + b as usize;
    }
}

/// Decode a name into its canonical dotted form, following compression
/// pointers. Pointers must target an offset strictly before the pointer
/// itself, which rules out cycles; the jump counter bounds pathological
/// chains. The root name decodes as ".".
pub fn decode_name(buf: &[u8], len: usize, start: usize) -> Result<String, ParseError> {
    let mut name = String::new();
    let mut off = start;
    let mut jumps = 0;

    loop {
        if off >= len {
            return Err(ParseError::InvalidLabel);
        }
        let b = buf[off];
        if b == 0 {
            break;
        }
        if b & POINTER_MASK == POINTER_MASK {
            if off + 1 >= len {
                return Err(ParseError::InvalidLabel);
            }
            let target = u16::from_be_bytes([b & 0x3F, buf[off + 1]]) as usize;
            if target >= off {
                return Err(ParseError::InvalidLabel);
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(ParseError::InvalidLabel);
            }
            off = target;
            continue;
        }
        if b > 63 {
            return Err(ParseError::InvalidLabel);
        }
        let end = off + 1 + b as usize;
        if end > len {
            return Err(ParseError::InvalidLabel);
        }
        let label =
            std::str::from_utf8(&buf[off + 1..end]).map_err(|_| ParseError::InvalidLabel)?;
        name.push_str(label);
        name.push('.');
        off = end;
    }

    if name.is_empty() {
        name.push('.');
    }
    Ok(name)
}

/// Encode a dotted name into uncompressed wire form, appending to `out`.
/// Accepts names with or without the trailing dot.
pub fn encode_name(name: &str, out: &mut Vec<u8>) -> Result<(), ParseError> {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        if label.len() > 63 {
            return Err(ParseError::InvalidLabel);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}
