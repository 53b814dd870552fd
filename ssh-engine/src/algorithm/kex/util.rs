//! Shared wire-encoding helpers for key-exchange methods that don't
//! delegate their exchange-hash construction to [`ssh_packet::crypto::exchange`]
//! (currently only [`super::dhgroup14`]) and for producing the
//! mpint-encoded `K` every method feeds to [`crate::stream::derive`] (§7.2
//! says `K` enters the derivation hash "encoded as mpint").

use ssh_packet::binrw::BinWrite;

use crate::Result;

/// Appends `data` as an SSH `string` (uint32 big-endian length, then
/// the raw bytes).
pub(super) fn encode_string(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

/// Appends `raw` (a big-endian, non-negative integer, leading zeroes
/// allowed) as an SSH `mpint`: the shortest two's-complement
/// representation, with a leading `0x00` inserted when the high bit of
/// the first significant byte is set (§6's primitive encodings).
pub(super) fn encode_mpint(buf: &mut Vec<u8>, raw: &[u8]) {
    let mut bytes = raw;
    while bytes.len() > 1 && bytes[0] == 0 {
        bytes = &bytes[1..];
    }

    if bytes == [0] {
        buf.extend_from_slice(&0u32.to_be_bytes());
    } else if bytes[0] & 0x80 != 0 {
        buf.extend_from_slice(&((bytes.len() + 1) as u32).to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(bytes);
    } else {
        buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(bytes);
    }
}

/// Encodes `raw` as a standalone mpint (length-prefix included) — this
/// is the `K` fed to [`crate::stream::derive`], shared by every
/// key-exchange method regardless of how it computes its own exchange
/// hash.
pub(crate) fn mpint(raw: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_mpint(&mut buf, raw);
    buf
}

/// Serializes a `KexInit` (or any other outbound message type) to its
/// raw on-wire payload bytes, magic byte included — the `I_C`/`I_S`
/// inputs to the legacy Diffie-Hellman exchange hash (§7/RFC 4253 §8).
pub(super) fn message_bytes<'a, T>(message: &T) -> Result<Vec<u8>>
where
    T: BinWrite<Args<'a> = ()>,
{
    let mut buffer = Vec::new();
    message.write(&mut std::io::Cursor::new(&mut buffer))?;

    Ok(buffer)
}
