//! Tuya 3.1 wire framing.
//!
//! Request: `header(16) ++ payload ++ suffix(8)`, where the header is the
//! fixed prefix template with the command byte at offset 11 and the
//! big-endian body length (`payload + 8`) at offsets 12..16.
//!
//! Response: `prefix(11) ++ cmd(1) ++ len(4) ++ reserved(4) ++ payload ++ suffix(8)`,
//! with `len` covering the reserved word, payload and suffix.

use crate::error::{Result, TuyaError};
use byteorder::{BigEndian, ByteOrder};

pub const PREFIX_LENGTH: usize = 16;
pub const SUFFIX_LENGTH: usize = 8;

/// Bytes of the prefix that are fixed; the command and length follow.
pub const PREFIX_FIXED_LENGTH: usize = 11;

/// Bytes of the declared response length that are not payload
/// (reserved word + suffix).
pub const RESPONSE_OVERHEAD: usize = 12;

/// Upper bound on a response body; anything larger is a framing error.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

pub const PREFIX: [u8; PREFIX_LENGTH] = [0, 0, 0x55, 0xAA, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
pub const SUFFIX: [u8; SUFFIX_LENGTH] = [0, 0, 0, 0, 0, 0, 0xAA, 0x55];

define_command_type! {
    Control = 0x07,
    DpQuery = 0x0a,
}

/// Parsed response header. Only [`parse_header`] builds one, so the
/// declared length is already within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    cmd: u8,
    /// Declared length (reserved + payload + suffix)
    length: u32,
}

impl FrameHeader {
    /// Echoed command byte.
    pub fn cmd(&self) -> u8 {
        self.cmd
    }

    /// Declared length as sent by the device.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Caller-visible payload length.
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(RESPONSE_OVERHEAD)
    }

    /// Bytes that follow the header on the wire.
    pub fn body_len(&self) -> usize {
        self.length as usize
    }

    /// Whole frame size including the header.
    pub fn total_length(&self) -> usize {
        PREFIX_LENGTH + self.body_len()
    }
}

/// Packs a payload into a request frame.
pub fn pack_frame(cmd: CommandType, payload: &[u8]) -> Vec<u8> {
    let body_len = (payload.len() + SUFFIX_LENGTH) as u32;

    let mut data = Vec::with_capacity(PREFIX_LENGTH + payload.len() + SUFFIX_LENGTH);
    data.extend_from_slice(&PREFIX[..PREFIX_FIXED_LENGTH]);
    data.push(cmd.as_u8());
    let mut len = [0u8; 4];
    BigEndian::write_u32(&mut len, body_len);
    data.extend_from_slice(&len);
    data.extend_from_slice(payload);
    data.extend_from_slice(&SUFFIX);
    data
}

/// Parses and validates a 16-byte response header.
pub fn parse_header(data: &[u8]) -> Result<FrameHeader> {
    if data.len() < PREFIX_LENGTH {
        return Err(TuyaError::LengthMismatch);
    }

    if data[..PREFIX_FIXED_LENGTH] != PREFIX[..PREFIX_FIXED_LENGTH] {
        return Err(TuyaError::PrefixMismatch);
    }

    let cmd = data[PREFIX_FIXED_LENGTH];
    let length = BigEndian::read_u32(&data[12..PREFIX_LENGTH]);

    if (length as usize) < RESPONSE_OVERHEAD || length as usize > MAX_FRAME_SIZE {
        return Err(TuyaError::LengthMismatch);
    }

    Ok(FrameHeader { cmd, length })
}

/// Validates a complete response frame and returns its payload.
///
/// Only the last four suffix bytes are compared; the first four are not
/// checked on receipt. Bytes beyond the declared length are a length mismatch.
pub fn unpack_frame(data: &[u8]) -> Result<Vec<u8>> {
    let header = parse_header(data)?;
    let total = header.total_length();

    if data.len() < total {
        return Err(TuyaError::LengthMismatch);
    }

    let suffix = &data[total - SUFFIX_LENGTH..total];
    if suffix[4..] != SUFFIX[4..] {
        return Err(TuyaError::SuffixMismatch);
    }

    if data.len() > total {
        return Err(TuyaError::LengthMismatch);
    }

    let payload_start = PREFIX_LENGTH + 4;
    Ok(data[payload_start..payload_start + header.payload_len()].to_vec())
}

#[cfg(test)]
pub(crate) fn response_frame(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = PREFIX[..PREFIX_FIXED_LENGTH].to_vec();
    data.push(cmd);
    data.extend_from_slice(&((payload.len() + RESPONSE_OVERHEAD) as u32).to_be_bytes());
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(payload);
    data.extend_from_slice(&SUFFIX);
    data
}
