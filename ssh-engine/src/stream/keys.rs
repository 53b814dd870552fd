//! RFC 4253 §7.2 key derivation: `HASH(K || H || letter || session_id)`,
//! extended by repeated hashing when more bytes are needed than one
//! digest's output provides.

use digest::{Digest, OutputSizeUser};
use generic_array::typenum::Unsigned;

/// Derives `len` bytes of key material tagged `letter` (`b'A'..=b'F'`,
/// per §7.2: IV client-to-server, IV server-to-client, encryption key
/// client-to-server, encryption key server-to-client, integrity key
/// client-to-server, integrity key server-to-client).
pub(crate) fn derive<D: Digest + Clone>(k: &[u8], h: &[u8], session_id: &[u8], letter: u8, len: usize) -> Vec<u8> {
    let mut digest = D::new();
    digest.update(k);
    digest.update(h);
    digest.update([letter]);
    digest.update(session_id);

    let mut out = digest.finalize().to_vec();

    while out.len() < len {
        let mut digest = D::new();
        digest.update(k);
        digest.update(h);
        digest.update(&out);
        out.extend_from_slice(&digest.finalize());
    }

    out.truncate(len);
    out
}

/// The number of bytes a digest `D` produces, for sizing key material.
pub(crate) fn digest_size<D: OutputSizeUser>() -> usize {
    D::OutputSize::to_usize()
}
