//! Framing for filenames sent to the board and directory listings read back.
//!
//! A packet is `<` name `|` crc `>`, the CRC-8 covering `<` and the name
//! only. A listing is `<` entry `|` entry ... `>`.
//!
//! Names are kept as raw bytes: the board's filesystem does not promise
//! UTF-8, and a name must go back out exactly as it was listed.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    codec::{crc8, BEGIN, DELIMITER, END},
    error::ProtocolError,
};

/// Entries starting with this name are the script the board generated from
/// the one in use, and are never offered for selection.
pub const IN_USE_SCRIPT_NAME: &str = "schedule";

pub fn pack_filename(name: impl AsRef<[u8]>) -> Result<Bytes, ProtocolError> {
    let name = name.as_ref();
    if name.is_empty() {
        return Err(ProtocolError::EmptyFilename);
    }
    if let Some(&byte) = name.iter().find(|&&b| [BEGIN, DELIMITER, END].contains(&b)) {
        return Err(ProtocolError::FramingByte { byte: byte as char });
    }

    let mut buf = BytesMut::with_capacity(name.len() + 4);
    buf.put_u8(BEGIN);
    buf.put_slice(name);
    let crc = crc8(&buf);
    buf.put_u8(DELIMITER);
    buf.put_u8(crc);
    buf.put_u8(END);

    Ok(buf.freeze())
}

/// Inverse of [`pack_filename`]. A trailing NUL after the end marker is
/// tolerated.
pub fn unpack_filename(packet: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let packet = packet.strip_suffix(&[0]).unwrap_or(packet);

    let body = packet.strip_prefix(&[BEGIN]).ok_or(ProtocolError::MissingBegin)?;
    let body = body.strip_suffix(&[END]).ok_or(ProtocolError::MissingEnd)?;

    let (name, carried) = match body {
        [name @ .., delimiter, crc] if *delimiter == DELIMITER => (name, *crc),
        _ => return Err(ProtocolError::MissingDelimiter),
    };

    if name.is_empty() {
        return Err(ProtocolError::EmptyFilename);
    }

    let computed = crc8(&packet[..1 + name.len()]);
    if computed != carried {
        return Err(ProtocolError::CrcMismatch { carried, computed });
    }

    Ok(name.to_vec())
}

/// Selectable entries of a directory listing, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<Bytes>,
}

impl Listing {
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        let body = raw.strip_prefix(&[BEGIN]).ok_or(ProtocolError::MissingBegin)?;
        let end = body
            .iter()
            .position(|&b| b == END)
            .ok_or(ProtocolError::Unterminated { len: raw.len() })?;

        let entries = body[..end]
            .split(|&b| b == DELIMITER)
            .filter(|entry| !entry.is_empty())
            .filter(|entry| !entry.starts_with(IN_USE_SCRIPT_NAME.as_bytes()))
            .map(Bytes::copy_from_slice)
            .collect();

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-indexed, as displayed. Index 0 selects nothing.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|entry| &entry[..])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|entry| &entry[..])
    }
}
